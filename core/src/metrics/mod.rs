//! Metric telemetry: provider trait, snapshot types and the bounded sampler.

mod accelerator;
mod sampler;
mod system;

pub use accelerator::AcceleratorSource;
pub use sampler::BoundedSampler;
pub use system::SystemMetrics;

use std::time::Instant;

/// Accelerator readings from a single query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceleratorSample {
    pub usage_percent: f64,
    pub temp_celsius: f64,
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// One pull from the metrics provider. A `None` field was unavailable for
/// this query only.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub accelerator: Option<AcceleratorSample>,
    pub taken_at: Instant,
}

impl MetricsSnapshot {
    /// Snapshot with every field unavailable
    pub fn empty() -> Self {
        Self {
            cpu_percent: None,
            memory_percent: None,
            accelerator: None,
            taken_at: Instant::now(),
        }
    }
}

/// Telemetry sources present on this host, detected once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub accelerator: bool,
}

/// Source of raw metric readings.
///
/// `sample` may block; callers run it off the render loop. Implementations
/// report per-field failures as `None` instead of erroring the whole query.
pub trait MetricsProvider: Send + 'static {
    fn sample(&mut self) -> MetricsSnapshot;

    /// Fixed for the provider's lifetime
    fn capabilities(&self) -> Capabilities;
}
