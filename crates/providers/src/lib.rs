//! Model invocation for Waypoint.
//!
//! Every call an orchestrator makes goes through [`RetryingCachingCaller`],
//! which wraps a `waypoint_core::Provider` with a global rate limiter, a
//! fingerprint-keyed response cache, and bounded exponential-backoff
//! retry. Two providers ship here: an OpenAI-compatible runner and a
//! scripted one for offline use.

pub mod cache;
pub mod caller;
pub mod fingerprint;
pub mod openai_compat;
pub mod rate_limit;
pub mod scripted;

pub use cache::ResponseCache;
pub use caller::{CallPolicy, CallResult, FALLBACK_MESSAGE, FallbackResult, RetryingCachingCaller};
pub use fingerprint::fingerprint;
pub use openai_compat::{OpenAiCompatProvider, handoff_tool_name};
pub use rate_limit::RateLimiter;
pub use scripted::{ScriptStep, ScriptedProvider};
