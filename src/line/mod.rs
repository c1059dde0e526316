//! LINE Messaging API plumbing: webhook payloads, signature checks and the
//! reply endpoint.

pub mod client;
pub mod signature;

use serde::{Deserialize, Serialize};

pub use client::{LineClient, ReplySender};

/// Header carrying the base64 HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

// ─── Webhook payload ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Message,
    Follow,
    Unfollow,
    Join,
    Leave,
    Postback,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text {
        #[serde(default)]
        id: String,
        text: String,
    },
    #[serde(other)]
    Unsupported,
}

impl Event {
    /// Body of a text message event, if this is one.
    pub fn text(&self) -> Option<&str> {
        match (&self.kind, &self.message) {
            (EventType::Message, Some(Message::Text { text, .. })) => Some(text.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn text_event(reply_token: &str, text: &str) -> Event {
    Event {
        kind: EventType::Message,
        reply_token: Some(reply_token.into()),
        timestamp: Some(1_700_000_000_000),
        source: Some(serde_json::json!({ "type": "user", "userId": "U123" })),
        message: Some(Message::Text { id: "1".into(), text: text.into() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_message_payload() {
        let raw = r#"{
            "destination": "Uxxxxxxxx",
            "events": [{
                "type": "message",
                "replyToken": "nHuyWiB7yP5Zw52FIkcQobQuGDXCTA",
                "timestamp": 1462629479859,
                "source": { "type": "user", "userId": "U4af4980629" },
                "message": { "id": "325708", "type": "text", "text": "S foo bar" }
            }]
        }"#;

        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.events.len(), 1);

        let event = &payload.events[0];
        assert_eq!(event.kind, EventType::Message);
        assert_eq!(event.reply_token.as_deref(), Some("nHuyWiB7yP5Zw52FIkcQobQuGDXCTA"));
        assert_eq!(event.text(), Some("S foo bar"));
    }

    #[test]
    fn tolerates_unknown_event_and_message_types() {
        let raw = r#"{
            "events": [
                { "type": "message", "replyToken": "t", "message": { "id": "1", "type": "sticker", "packageId": "1" } },
                { "type": "beacon", "replyToken": "t2" },
                { "type": "follow", "replyToken": "t3" }
            ]
        }"#;

        let payload: WebhookPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.events[0].message, Some(Message::Unsupported));
        assert_eq!(payload.events[0].text(), None);
        assert_eq!(payload.events[1].kind, EventType::Other);
        assert_eq!(payload.events[2].kind, EventType::Follow);
        assert_eq!(payload.events[2].text(), None);
    }

    #[test]
    fn empty_event_list_is_valid() {
        let payload: WebhookPayload = serde_json::from_str(r#"{"destination":"U1","events":[]}"#).unwrap();
        assert!(payload.events.is_empty());
    }
}
