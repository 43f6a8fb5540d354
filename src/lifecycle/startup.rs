//! Startup orchestration.
//!
//! Stores are opened before any listener is bound, and any failure here is
//! fatal: a gateway that cannot read its credential file must not start with
//! an empty one.

use std::sync::Arc;

use thiserror::Error;

use crate::board::MessageBoard;
use crate::config::GatewayConfig;
use crate::keys::KeyStore;
use crate::storage::{self, StoreError};
use crate::upstream::UpstreamError;
use crate::usage::UsageCounters;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open {store} store: {source}")]
    Store {
        store: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("failed to build upstream client: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// The persisted subsystems, restored from their backends.
pub struct Stores {
    pub keys: Arc<KeyStore>,
    pub usage: Arc<UsageCounters>,
    pub board: Arc<MessageBoard>,
}

pub async fn open_stores(config: &GatewayConfig) -> Result<Stores, StartupError> {
    let keys = KeyStore::load(storage::open(config.keys.store_path.as_deref()))
        .await
        .map_err(|source| StartupError::Store { store: "keys", source })?;

    let usage = UsageCounters::load(
        storage::open(config.usage.store_path.as_deref()),
        config.usage.visitor_window_secs,
    )
    .await
    .map_err(|source| StartupError::Store { store: "usage", source })?;

    let board = MessageBoard::load(
        storage::open(config.board.store_path.as_deref()),
        config.board.max_text_len,
    )
    .await
    .map_err(|source| StartupError::Store { store: "board", source })?;

    Ok(Stores {
        keys: Arc::new(keys),
        usage: Arc::new(usage),
        board: Arc::new(board),
    })
}
