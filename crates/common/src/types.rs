//! Inbound event shape and platform metadata shared by the router and the
//! platform clients.
//!
//! Field names on the wire follow the platform's camel-case `*ID` spelling
//! (`senderID`, `threadID`, `messageID`).

use serde::{Deserialize, Serialize};

/// Kind of inbound platform event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A plain chat message.
    Message,
    /// A message that quotes an earlier message.
    MessageReply,
    /// Typing indicator.
    #[serde(rename = "typ")]
    Typing,
    /// Online/offline presence update.
    Presence,
}

/// Reference to an earlier message quoted by a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    #[serde(rename = "messageID")]
    pub message_id: String,
}

/// A single inbound chat event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "senderID", default)]
    pub sender_id: String,
    #[serde(rename = "threadID", default)]
    pub thread_id: String,
    #[serde(rename = "messageID", default)]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(
        rename = "messageReply",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub message_reply: Option<MessageRef>,
}

impl InboundEvent {
    /// Build a plain message event.
    pub fn message(
        thread_id: impl Into<String>,
        sender_id: impl Into<String>,
        message_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Message,
            sender_id: sender_id.into(),
            thread_id: thread_id.into(),
            message_id: message_id.into(),
            body: Some(body.into()),
            message_reply: None,
        }
    }

    /// Turn this event into a reply quoting `message_id`.
    #[must_use]
    pub fn replying_to(mut self, message_id: impl Into<String>) -> Self {
        self.kind = EventKind::MessageReply;
        self.message_reply = Some(MessageRef {
            message_id: message_id.into(),
        });
        self
    }

    /// Message body with surrounding whitespace removed; empty when absent.
    pub fn text(&self) -> &str {
        self.body.as_deref().map(str::trim).unwrap_or("")
    }

    /// Identifier of the message this event replies to, if any.
    pub fn replied_to(&self) -> Option<&str> {
        match self.kind {
            EventKind::MessageReply => self.message_reply.as_ref().map(|r| r.message_id.as_str()),
            _ => None,
        }
    }

    /// Typing indicators and presence updates carry no content.
    pub fn is_ambient(&self) -> bool {
        matches!(self.kind, EventKind::Typing | EventKind::Presence)
    }
}

/// Handle returned by the platform for a message it delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    #[serde(rename = "messageID")]
    pub message_id: String,
}

/// Platform profile of a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
}

/// Platform metadata of a thread (group chat or DM).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "participantIDs", default)]
    pub participant_ids: Vec<String>,
    #[serde(rename = "adminIDs", default)]
    pub admin_ids: Vec<AdminRef>,
}

/// Entry of a thread's admin list, sent as `{ "id": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRef {
    pub id: String,
}

impl From<&str> for AdminRef {
    fn from(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl From<String> for AdminRef {
    fn from(id: String) -> Self {
        Self { id }
    }
}

impl ThreadInfo {
    /// The user is still in the thread and holds admin rights there.
    pub fn is_admin_participant(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|id| id == user_id)
            && self.admin_ids.iter().any(|admin| admin.id == user_id)
    }
}
