//! Deterministic request fingerprints for the response cache.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use waypoint_core::{ConversationContext, TranscriptEntry};

#[derive(Serialize)]
struct FingerprintInput<'a> {
    agent: &'a str,
    model: &'a str,
    transcript: &'a [TranscriptEntry],
    context: &'a ConversationContext,
}

/// SHA-256 hex digest over the (already trimmed) call inputs.
///
/// Object keys are sorted before hashing, so two contexts with the same
/// fields produce the same key regardless of insertion order.
pub fn fingerprint(
    agent_name: &str,
    model_id: &str,
    transcript: &[TranscriptEntry],
    context: &ConversationContext,
) -> String {
    let input = FingerprintInput {
        agent: agent_name,
        model: model_id,
        transcript,
        context,
    };
    let value = serde_json::to_value(&input).unwrap_or(Value::Null);
    let canonical = canonicalize(value);

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
