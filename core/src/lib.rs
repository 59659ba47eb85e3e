//! Metrics backend for the sysoverlay desktop overlay.
//!
//! Provides metric collection (`metrics`), moving-average smoothing
//! (`smoothing`) and settings persistence and hot reload (`context`).

pub mod context;
pub mod metrics;
pub mod smoothing;

pub use context::{ConfigError, OverlaySettingsExt, SettingsWatcher, TelemetryError};
pub use metrics::{
    AcceleratorSample, BoundedSampler, Capabilities, MetricsProvider, MetricsSnapshot,
    SystemMetrics,
};
pub use smoothing::{MetricSmoother, Series, SmoothingBuffer};
pub use sysoverlay_types::{MetricId, OverlaySettings, Rgb};
