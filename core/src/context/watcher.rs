//! Settings file hot reload.
//!
//! Watches the directory containing the settings file (editors commonly
//! replace files rather than writing in place), debounces bursts of events,
//! and yields freshly loaded, validated settings.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver};

use super::{ConfigError, OverlaySettingsExt, WatcherError};
use sysoverlay_types::OverlaySettings;

const DEBOUNCE: Duration = Duration::from_millis(200);

pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    path: PathBuf,
}

impl SettingsWatcher {
    pub fn new(path: &Path) -> Result<Self, WatcherError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| WatcherError::NoParent {
                path: path.to_path_buf(),
            })?;

        let (tx, rx) = mpsc::channel(100);
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            Config::default(),
        )
        .map_err(WatcherError::InitWatcher)?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatcherError::WatchPath {
                path: dir.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "Watching settings file");
        Ok(Self {
            _watcher: watcher,
            rx,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the settings file to change and reload it.
    ///
    /// Returns `None` once the watcher shuts down. Load and validation
    /// failures are returned so the caller can keep its current settings.
    pub async fn next_settings(&mut self) -> Option<Result<OverlaySettings, ConfigError>> {
        loop {
            match self.rx.recv().await? {
                Ok(event) if self.is_relevant(&event) => break,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Settings watcher error");
                    continue;
                }
            }
        }

        // Absorb the rest of the burst
        while let Ok(Some(_)) = tokio::time::timeout(DEBOUNCE, self.rx.recv()).await {}

        tracing::info!(path = %self.path.display(), "Settings file changed, reloading");
        Some(OverlaySettings::load_from(&self.path))
    }

    fn is_relevant(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == self.path.file_name())
    }
}
