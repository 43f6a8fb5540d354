//! Out-of-band admin channel.
//!
//! Transport-agnostic: a transport (HTTP admin listener, a chat bot, the CLI)
//! hands over `(identity, text)` and relays the reply. The privilege check runs
//! before any command touches the key store or counters.

use std::sync::Arc;

use crate::admin::commands::{AdminCommand, HELP_TEXT};
use crate::admin::policy::PrivilegePolicy;
use crate::keys::{KeyIssuer, KeyStore};
use crate::usage::UsageCounters;

pub const REFUSAL: &str = "Sorry, this command is only available to the administrator.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Done,
    Refused,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminReply {
    pub kind: ReplyKind,
    pub text: String,
}

impl AdminReply {
    fn done(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Done,
            text: text.into(),
        }
    }

    fn invalid(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Invalid,
            text: text.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.kind == ReplyKind::Done
    }
}

pub struct AdminChannel {
    issuer: KeyIssuer,
    usage: Arc<UsageCounters>,
    policy: Arc<dyn PrivilegePolicy>,
}

impl AdminChannel {
    pub fn new(
        issuer: KeyIssuer,
        usage: Arc<UsageCounters>,
        policy: Arc<dyn PrivilegePolicy>,
    ) -> Self {
        Self {
            issuer,
            usage,
            policy,
        }
    }

    fn store(&self) -> &KeyStore {
        self.issuer.store()
    }

    /// Run one text command on behalf of `identity`.
    pub async fn handle(&self, identity: &str, text: &str) -> AdminReply {
        let command = match AdminCommand::parse(text) {
            Ok(c) => c,
            Err(e) => return AdminReply::invalid(e.to_string()),
        };

        if command.is_privileged() && !self.policy.is_privileged(identity) {
            tracing::warn!(identity = %identity, command = ?command, "Refused admin command");
            return AdminReply {
                kind: ReplyKind::Refused,
                text: REFUSAL.to_string(),
            };
        }

        tracing::info!(identity = %identity, command = ?command, "Running admin command");
        self.execute(command).await
    }

    async fn execute(&self, command: AdminCommand) -> AdminReply {
        match command {
            AdminCommand::Help => AdminReply::done(HELP_TEXT),
            AdminCommand::Stats => {
                let snap = self.usage.snapshot();
                AdminReply::done(format!(
                    "Statistics\nTotal requests: {}\nTotal visitors: {}\nAccounts with keys: {}",
                    snap.total_requests,
                    snap.total_visitors,
                    self.store().len()
                ))
            }
            AdminCommand::Key(id) => match self.store().get(&id) {
                Some(record) => AdminReply::done(format!("API key for {}: {}", id, record.key)),
                None => AdminReply::done(format!("No API key found for {}.", id)),
            },
            AdminCommand::Issue(id) => match self.issuer.issue(&id).await {
                Ok(outcome) if outcome.is_new => AdminReply::done(format!(
                    "Issued API key for {}: {}",
                    outcome.record.account_id, outcome.record.key
                )),
                Ok(outcome) => AdminReply::done(format!(
                    "API key already exists for {}: {}",
                    outcome.record.account_id, outcome.record.key
                )),
                Err(e) => AdminReply::invalid(e.to_string()),
            },
            AdminCommand::Rotate(id) => match self.issuer.rotate(&id).await {
                Ok(record) => AdminReply::done(format!(
                    "Rotated API key for {}: {}",
                    record.account_id, record.key
                )),
                Err(e) => AdminReply::invalid(e.to_string()),
            },
            AdminCommand::History(id) => {
                let history = self.store().history(&id);
                if history.is_empty() {
                    return AdminReply::done(format!("No API key found for {}.", id));
                }
                let mut text = format!("Keys issued to {}:", id);
                for record in history {
                    let status = match record.revoked_at {
                        Some(at) => format!("revoked {}", at),
                        None => "(live)".to_string(),
                    };
                    text.push_str(&format!(
                        "\n{} created {} {}",
                        record.key, record.created_at, status
                    ));
                }
                AdminReply::done(text)
            }
            AdminCommand::Delete(id) => {
                if self.store().delete(&id).await {
                    tracing::info!(account = %id, "Deleted API key");
                    AdminReply::done(format!("Deleted API key for {}.", id))
                } else {
                    AdminReply::done(format!("No API key found for {}.", id))
                }
            }
            AdminCommand::DeleteAll => {
                let count = self.store().delete_all().await;
                tracing::info!(count, "Deleted all API keys");
                AdminReply::done(format!("Deleted {} API key(s).", count))
            }
        }
    }
}
