//! Decoding of raw websocket frames into routable updates.
//!
//! The transport delivers JSON objects shaped like `{"event": "...", "data": {...}}`. Only the
//! plugin's two post events and the server's `config_changed` broadcast matter here; every other
//! event is reported as [`PushSignal::Ignored`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{OptionExt, ResultExt};

use crate::error::{FrameResult, MissingSubjectSnafu, ParseFrameSnafu};
use crate::event::{SubjectId, UpdateEvent, UpdateKind};

pub const DEFAULT_PLUGIN_ID: &str = "mattermost-ai";
pub const CONFIG_CHANGED_EVENT: &str = "config_changed";

const SUBJECT_FIELD: &str = "post_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl PushFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn parse(text: &str) -> FrameResult<Self> {
        serde_json::from_str(text).context(ParseFrameSnafu {
            stage: "parse-push-frame",
        })
    }
}

/// What a decoded frame means for the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub enum PushSignal {
    Update(UpdateEvent),
    /// Server configuration changed; cached bot data is no longer trustworthy.
    ConfigChanged,
    Ignored(String),
}

/// Transport event names the plugin listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
    post_update: String,
    tool_call_status: String,
}

impl Default for EventNames {
    fn default() -> Self {
        Self::for_plugin(DEFAULT_PLUGIN_ID)
    }
}

impl EventNames {
    pub fn for_plugin(plugin_id: &str) -> Self {
        Self {
            post_update: Self::event_name(plugin_id, UpdateKind::PostUpdate),
            tool_call_status: Self::event_name(plugin_id, UpdateKind::ToolCallStatusUpdate),
        }
    }

    pub fn event_name(plugin_id: &str, kind: UpdateKind) -> String {
        format!("custom_{}_{}", plugin_id.trim(), kind.event_suffix())
    }

    pub fn kind_of(&self, event: &str) -> Option<UpdateKind> {
        if event == self.post_update {
            Some(UpdateKind::PostUpdate)
        } else if event == self.tool_call_status {
            Some(UpdateKind::ToolCallStatusUpdate)
        } else {
            None
        }
    }

    pub fn decode(&self, frame: PushFrame) -> FrameResult<PushSignal> {
        if frame.event == CONFIG_CHANGED_EVENT {
            return Ok(PushSignal::ConfigChanged);
        }

        let Some(kind) = self.kind_of(&frame.event) else {
            return Ok(PushSignal::Ignored(frame.event));
        };

        let subject_id = frame
            .data
            .get(SUBJECT_FIELD)
            .and_then(Value::as_str)
            .and_then(SubjectId::non_empty)
            .context(MissingSubjectSnafu {
                stage: "decode-push-subject",
                event: frame.event.clone(),
            })?;

        Ok(PushSignal::Update(UpdateEvent::new(
            subject_id, kind, frame.data,
        )))
    }

    pub fn decode_text(&self, text: &str) -> FrameResult<PushSignal> {
        self.decode(PushFrame::parse(text)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::FrameError;

    #[test]
    fn post_update_frame_becomes_routable_event() {
        let names = EventNames::default();
        let signal = names
            .decode_text(
                r#"{"event":"custom_mattermost-ai_postupdate","data":{"post_id":"post1","next":"Hel"}}"#,
            )
            .unwrap();

        let PushSignal::Update(event) = signal else {
            panic!("expected update, got {signal:?}");
        };
        assert_eq!(event.subject_id, SubjectId::from("post1"));
        assert_eq!(event.kind, UpdateKind::PostUpdate);
        assert_eq!(event.payload["next"], json!("Hel"));
    }

    #[test]
    fn tool_call_frame_uses_configured_plugin_id() {
        let names = EventNames::for_plugin("copilot");
        let frame = PushFrame::new(
            "custom_copilot_tool_call_status_updated",
            json!({"post_id": "p9", "status": "running"}),
        );

        let PushSignal::Update(event) = names.decode(frame).unwrap() else {
            panic!("expected update");
        };
        assert_eq!(event.kind, UpdateKind::ToolCallStatusUpdate);
        assert_eq!(event.subject_id.as_str(), "p9");

        let foreign = PushFrame::new("custom_mattermost-ai_postupdate", json!({"post_id": "p9"}));
        assert_eq!(
            names.decode(foreign).unwrap(),
            PushSignal::Ignored("custom_mattermost-ai_postupdate".to_string())
        );
    }

    #[test]
    fn config_changed_and_unknown_events_are_not_errors() {
        let names = EventNames::default();
        assert_eq!(
            names.decode(PushFrame::new(CONFIG_CHANGED_EVENT, Value::Null)).unwrap(),
            PushSignal::ConfigChanged
        );
        assert_eq!(
            names.decode(PushFrame::new("typing", json!({}))).unwrap(),
            PushSignal::Ignored("typing".to_string())
        );
    }

    #[test]
    fn post_event_without_subject_is_rejected() {
        let names = EventNames::default();
        let error = names
            .decode(PushFrame::new(
                "custom_mattermost-ai_postupdate",
                json!({"post_id": ""}),
            ))
            .unwrap_err();
        assert!(matches!(error, FrameError::MissingSubject { .. }));

        let error = names.decode_text("{not json").unwrap_err();
        assert!(matches!(error, FrameError::ParseFrame { .. }));
    }
}
