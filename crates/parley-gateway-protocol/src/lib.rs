//! Transport-neutral message types shared by Parley and its chat gateways.
//!
//! A gateway turns platform updates into [`InboundEvent`]s and hands them to
//! the core. Replies travel back through the core's transport trait, addressed
//! with a [`ReplyTarget`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Inbound
// ============================================================================

/// One unit of inbound work from a chat platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Identifier that stays stable when the platform redelivers the event.
    pub event_id: String,
    /// Who sent the event.
    pub user: Sender,
    /// Chat the event arrived in.
    pub chat_id: String,
    /// Platform message id, when the event is a message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub received_at: DateTime<Utc>,
    pub content: EventContent,
}

impl InboundEvent {
    /// Where replies to this event should go.
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            chat_id: self.chat_id.clone(),
            reply_to: self.message_id.clone(),
        }
    }
}

/// The sender of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Payload of an inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventContent {
    /// Plain text, including slash-commands.
    Text { text: String },
    /// Voice note.
    Voice(MediaPayload),
    /// File attachment.
    Document(MediaPayload),
    /// Inline keyboard button press.
    Selection {
        selection_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    /// Anything the gateway does not model (stickers, photos, ...).
    Other { kind: String },
}

/// Reference to a media file held by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

// ============================================================================
// Outbound
// ============================================================================

/// Address of an outbound reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub chat_id: String,
    /// Message to quote, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// A button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub label: String,
    /// Payload echoed back in [`EventContent::Selection`].
    pub data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}
