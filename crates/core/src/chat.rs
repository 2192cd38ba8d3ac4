//! Chat sessions and their stored messages.

use crate::engine::{ChatTurn, MessageType};
use chrono::{DateTime, Utc};
use healthbot_uuid::{RecordId, TimestampId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: RecordId,
    pub user_id: RecordId,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_active: bool,
}

impl ChatSession {
    pub(crate) fn open(user_id: RecordId, now: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new(),
            user_id,
            created_at: now,
            last_activity: now,
            is_active: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: TimestampId,
    pub session_id: RecordId,
    pub message_type: MessageType,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn to_turn(&self) -> ChatTurn {
        ChatTurn {
            role: self.message_type,
            content: self.content.clone(),
        }
    }
}

/// Converts stored messages into the engine's view of a conversation.
pub fn history(messages: &[ChatMessage]) -> Vec<ChatTurn> {
    messages.iter().map(ChatMessage::to_turn).collect()
}

/// The two messages stored by one `send_message` call, with the engine reply behind them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatExchange {
    pub user_message: ChatMessage,
    pub ai_message: ChatMessage,
    pub reply: crate::engine::AIResponse,
}

/// A prescription stored as an AI message in its session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionReply {
    pub ai_message: ChatMessage,
    pub reply: crate::engine::AIResponse,
}
