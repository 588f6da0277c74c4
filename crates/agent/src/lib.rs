//! Turn orchestration for Waypoint.
//!
//! A turn flows through three pieces:
//!
//! 1. **Orchestrator** loads conversation state, routes the message to
//!    the current agent, and follows a handoff with one more call
//! 2. **EventStreamBuilder** classifies what the model run produced into
//!    user-visible messages and a typed event trace
//! 3. The orchestrator diffs the context and persists the canonical
//!    transcript
//!
//! Model calls go through the `RetryingCachingCaller` from
//! `waypoint-providers`, so failures degrade to a fallback apology
//! instead of an error.

pub mod airline;
pub mod orchestrator;
pub mod stream;

pub use airline::{
    AirlineContextInitializer, FAQ_AGENT, TRIAGE_AGENT, TRIP_AGENT, airline_orchestrator,
    airline_registry, offline_provider,
};
pub use orchestrator::{ContextInitializer, Orchestrator, TurnRequest, TurnResponse};
pub use stream::{EventStreamBuilder, TurnTrace, UI_SENTINEL};
