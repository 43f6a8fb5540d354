//! Configuration file watcher for hot reload.
//!
//! Only the parts of the config that are safe to swap at runtime (upstream
//! catalogue, admin identities) are applied by the server; listener and storage
//! changes are logged and wait for a restart.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::GatewayConfig;

/// Watches the config file and forwards every valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver the server's reload loop drains.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let mut reloader = Reloader::new(self.path.clone(), self.update_tx);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches_contents(&event.kind) => {
                    reloader.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn touches_contents(kind: &EventKind) -> bool {
    kind.is_modify() || kind.is_create()
}

/// Reads the file on each event and forwards it when the text changed.
///
/// Editors often emit several events for one save; identical contents are
/// forwarded once.
struct Reloader {
    path: PathBuf,
    tx: mpsc::UnboundedSender<GatewayConfig>,
    last: Option<String>,
}

impl Reloader {
    fn new(path: PathBuf, tx: mpsc::UnboundedSender<GatewayConfig>) -> Self {
        Self { path, tx, last: None }
    }

    /// Returns whether a new config was forwarded.
    fn reload(&mut self) -> bool {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Failed to read config file");
                return false;
            }
        };
        if self.last.as_deref() == Some(content.as_str()) {
            tracing::debug!(path = ?self.path, "Config file unchanged, skipping reload");
            return false;
        }

        match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = ?self.path, "Config file changed, reloading");
                self.last = Some(content);
                self.tx.send(config).is_ok()
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTE: &str = r#"
[[upstream.routes]]
path = "/api/echo"
target = "http://127.0.0.1:9/echo"
"#;

    #[test]
    fn test_reload_forwards_changes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reloader = Reloader::new(path.clone(), tx);

        fs::write(&path, ROUTE).unwrap();
        assert!(reloader.reload());
        assert_eq!(rx.try_recv().unwrap().upstream.routes.len(), 1);

        // Same text again: nothing forwarded.
        assert!(!reloader.reload());
        assert!(rx.try_recv().is_err());

        fs::write(&path, "").unwrap();
        assert!(reloader.reload());
        assert!(rx.try_recv().unwrap().upstream.routes.is_empty());
    }

    #[test]
    fn test_invalid_file_keeps_current_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reloader = Reloader::new(path.clone(), tx);

        assert!(!reloader.reload());

        fs::write(&path, "[keys]\nkey_length = 1\n").unwrap();
        assert!(!reloader.reload());
        fs::write(&path, "not = [toml").unwrap();
        assert!(!reloader.reload());
        assert!(rx.try_recv().is_err());

        fs::write(&path, ROUTE).unwrap();
        assert!(reloader.reload());
    }
}
