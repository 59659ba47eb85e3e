mod config;
mod error;
pub mod watcher;

pub use config::OverlaySettingsExt;
pub use error::{ConfigError, TelemetryError, WatcherError};
pub use watcher::SettingsWatcher;
