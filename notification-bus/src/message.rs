//! Notification envelope

use crate::types::NotificationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Notification ID (UUIDv7 for ordering)
    pub id: Uuid,

    /// User the event is addressed to
    pub recipient_id: Uuid,

    /// What happened
    pub kind: NotificationKind,

    /// Title of the book the event concerns
    pub book_title: String,

    /// Rendered message for the recipient
    pub message: String,

    /// Timestamp
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a new notification
    pub fn new(
        recipient_id: Uuid,
        kind: NotificationKind,
        book_title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            recipient_id,
            kind,
            book_title: book_title.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Get the routing subject for this notification
    pub fn subject(&self) -> String {
        format!("{}.{}", self.kind.subject_prefix(), self.recipient_id)
    }
}
