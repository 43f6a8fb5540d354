use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SENDER: &str = "other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
}

impl Message {
    pub fn new(text: &str, sender: Option<String>, reply_to: Option<Uuid>) -> Self {
        let sender = sender
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SENDER.to_string());

        Self {
            id: Uuid::new_v4(),
            text: text.to_string(),
            sender,
            timestamp: unix_millis(),
            reply_to,
        }
    }
}

/// Body of `POST /api/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
