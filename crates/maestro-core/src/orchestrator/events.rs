//! Stream protocol frames.
//!
//! One JSON object per line on the live response stream. Every frame
//! carries a `sender`; the remaining fields depend on the frame kind and
//! are omitted when unset, so each serialized frame matches the wire
//! taxonomy exactly.

use serde::{Deserialize, Serialize};

use crate::session::StoredMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_supervisor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_decision: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_chunk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_end: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl StreamEvent {
    fn base(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: None,
            tool_id: None,
            for_agent: None,
            via_supervisor: None,
            routing_decision: None,
            chosen_agent: None,
            supervisor_type: None,
            stream_start: None,
            stream_chunk: None,
            stream_end: None,
            error: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        let mut ev = Self::base("user");
        ev.text = Some(text.into());
        ev
    }

    pub fn stream_start(agent_id: impl Into<String>) -> Self {
        let mut ev = Self::base(agent_id);
        ev.stream_start = Some(true);
        ev
    }

    pub fn stream_chunk(agent_id: impl Into<String>, delta: impl Into<String>) -> Self {
        let mut ev = Self::base(agent_id);
        ev.stream_chunk = Some(true);
        ev.text = Some(delta.into());
        ev
    }

    pub fn stream_end(agent_id: impl Into<String>, text: impl Into<String>, is_error: bool) -> Self {
        let mut ev = Self::base(agent_id);
        ev.stream_end = Some(true);
        ev.text = Some(text.into());
        ev.error = is_error.then_some(true);
        ev
    }

    pub fn system_error(text: impl Into<String>) -> Self {
        let mut ev = Self::base("system");
        ev.error = Some(true);
        ev.text = Some(text.into());
        ev
    }

    /// The frame mirroring a committed history message (tool, supervisor,
    /// system warning).
    pub fn from_message(msg: &StoredMessage) -> Self {
        Self {
            sender: msg.sender.clone(),
            text: Some(msg.text.clone()),
            tool_id: msg.tool_id.clone(),
            for_agent: msg.for_agent.clone(),
            via_supervisor: msg.via_supervisor,
            routing_decision: msg.routing_decision,
            chosen_agent: msg.chosen_agent.clone(),
            supervisor_type: msg
                .routing_decision
                .is_some()
                .then(|| "enhanced".to_string()),
            stream_start: None,
            stream_chunk: None,
            stream_end: None,
            error: msg.error,
        }
    }

    /// Newline-delimited JSON encoding of this frame.
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self).expect("stream event serializes");
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_match_wire_shapes() {
        let json = serde_json::to_string(&StreamEvent::user("hi")).unwrap();
        assert_eq!(json, r#"{"sender":"user","text":"hi"}"#);

        let json = serde_json::to_string(&StreamEvent::stream_start("granny")).unwrap();
        assert_eq!(json, r#"{"sender":"granny","stream_start":true}"#);

        let json = serde_json::to_string(&StreamEvent::stream_chunk("granny", "dra")).unwrap();
        assert_eq!(json, r#"{"sender":"granny","text":"dra","stream_chunk":true}"#);

        let json = serde_json::to_string(&StreamEvent::stream_end("granny", "draga mea", false))
            .unwrap();
        assert_eq!(json, r#"{"sender":"granny","text":"draga mea","stream_end":true}"#);

        let json = serde_json::to_string(&StreamEvent::system_error("boom")).unwrap();
        assert_eq!(json, r#"{"sender":"system","text":"boom","error":true}"#);
    }

    #[test]
    fn tool_message_maps_to_tool_frame() {
        let msg = StoredMessage::tool("web_search", "results", "granny", true, false);
        let ev = StreamEvent::from_message(&msg);
        assert_eq!(ev.sender, "tool");
        assert_eq!(ev.tool_id.as_deref(), Some("web_search"));
        assert_eq!(ev.for_agent.as_deref(), Some("granny"));
        assert_eq!(ev.via_supervisor, Some(true));
        assert!(ev.error.is_none());
    }

    #[test]
    fn ndjson_lines_end_with_newline() {
        let line = StreamEvent::user("x").to_ndjson();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }
}
