//! Message board.
//!
//! A flat, append-only list of short messages. A message may reply to an
//! earlier one by id. Messages are listed oldest first.

pub mod message;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::storage::{SnapshotStore, StoreError};

pub use message::{Message, NewMessage, DEFAULT_SENDER};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Message text is required")]
    EmptyText,

    #[error("Message text exceeds {0} characters")]
    TooLong(usize),

    #[error("Replied-to message {0} does not exist")]
    UnknownReply(Uuid),
}

impl From<BoardError> for GatewayError {
    fn from(err: BoardError) -> Self {
        GatewayError::Validation(err.to_string())
    }
}

pub struct MessageBoard {
    messages: RwLock<Vec<Message>>,
    max_text_len: usize,
    backend: Arc<dyn SnapshotStore<Vec<Message>>>,
}

impl MessageBoard {
    pub async fn load(
        backend: Arc<dyn SnapshotStore<Vec<Message>>>,
        max_text_len: usize,
    ) -> Result<Self, StoreError> {
        let mut messages = backend.load().await?.unwrap_or_default();
        messages.sort_by_key(|m| m.timestamp);
        tracing::info!(
            messages = messages.len(),
            location = %backend.describe(),
            "Loaded message board"
        );
        Ok(Self {
            messages: RwLock::new(messages),
            max_text_len,
            backend,
        })
    }

    /// All messages, oldest first.
    pub async fn list(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Validate and append a message.
    ///
    /// The write lock is held through the save so the persisted list never
    /// lags behind a later post.
    pub async fn post(&self, new: NewMessage) -> Result<Message, BoardError> {
        let text = new.text.trim();
        if text.is_empty() {
            return Err(BoardError::EmptyText);
        }
        if text.chars().count() > self.max_text_len {
            return Err(BoardError::TooLong(self.max_text_len));
        }

        let mut messages = self.messages.write().await;
        if let Some(parent) = new.reply_to {
            if !messages.iter().any(|m| m.id == parent) {
                return Err(BoardError::UnknownReply(parent));
            }
        }

        let message = Message::new(text, new.sender, new.reply_to);
        messages.push(message.clone());

        if let Err(e) = self.backend.save(&messages).await {
            metrics::record_persistence_failure("board");
            tracing::error!(
                error = %e,
                location = %self.backend.describe(),
                "Failed to persist message board"
            );
        }

        Ok(message)
    }
}
