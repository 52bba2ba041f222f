use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier of the post or thread an update is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Creates a typed subject identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns `None` for blank identifiers, which the selection store uses to mean "nothing".
    pub fn non_empty(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of incremental update pushed for a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// Streamed message content for a bot post.
    PostUpdate,
    /// Progress of a tool call attached to a bot post.
    ToolCallStatusUpdate,
}

impl UpdateKind {
    /// Suffix appended to `custom_<plugin>_` to form the transport event name.
    pub const fn event_suffix(self) -> &'static str {
        match self {
            Self::PostUpdate => "postupdate",
            Self::ToolCallStatusUpdate => "tool_call_status_updated",
        }
    }
}

/// One pushed update for a single subject. The payload is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub subject_id: SubjectId,
    pub kind: UpdateKind,
    pub payload: Value,
}

impl UpdateEvent {
    pub fn new(subject_id: impl Into<SubjectId>, kind: UpdateKind, payload: Value) -> Self {
        Self {
            subject_id: subject_id.into(),
            kind,
            payload,
        }
    }

    pub fn post_update(subject_id: impl Into<SubjectId>, payload: Value) -> Self {
        Self::new(subject_id, UpdateKind::PostUpdate, payload)
    }

    pub fn tool_call_status(subject_id: impl Into<SubjectId>, payload: Value) -> Self {
        Self::new(subject_id, UpdateKind::ToolCallStatusUpdate, payload)
    }
}
