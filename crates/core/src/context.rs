//! Conversation context: the mutable domain fields that accompany a
//! conversation (account and booking identifiers and the like).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name to new value, for every field a turn changed.
pub type ContextChanges = Map<String, Value>;

/// Key/value domain state carried alongside a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationContext(Map<String, Value>);

impl ConversationContext {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String view of a field; `None` when absent, null or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy holding only the allow-listed fields that are present.
    pub fn subset(&self, allow_list: &[String]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| allow_list.iter().any(|a| a == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Write every field of `other` into `self`, overwriting existing values.
    pub fn merge(&mut self, other: &ConversationContext) {
        for (k, v) in other.fields() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Fields of `after` whose value differs from `before` (or is new),
    /// mapped to their value in `after`.
    pub fn diff(before: &ConversationContext, after: &ConversationContext) -> ContextChanges {
        after
            .0
            .iter()
            .filter(|(k, v)| before.0.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for ConversationContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
