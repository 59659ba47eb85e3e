//! Time-bounded metric queries for the render loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::{Capabilities, MetricsProvider, MetricsSnapshot};
use crate::context::TelemetryError;

/// Runs provider queries on the blocking pool with a deadline.
///
/// A query that overruns keeps running in the background and holds the
/// provider lock; until it finishes, later ticks report the busy provider as
/// unavailable instead of queueing behind it.
pub struct BoundedSampler {
    provider: Arc<Mutex<Box<dyn MetricsProvider>>>,
    capabilities: Capabilities,
}

impl BoundedSampler {
    pub fn new(provider: Box<dyn MetricsProvider>) -> Self {
        let capabilities = provider.capabilities();
        Self {
            provider: Arc::new(Mutex::new(provider)),
            capabilities,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub async fn sample(&self, budget: Duration) -> Result<MetricsSnapshot, TelemetryError> {
        let mut guard = self
            .provider
            .clone()
            .try_lock_owned()
            .map_err(|_| TelemetryError::Busy)?;

        let task = tokio::task::spawn_blocking(move || guard.sample());
        match tokio::time::timeout(budget, task).await {
            Ok(joined) => Ok(joined?),
            Err(_) => Err(TelemetryError::Timeout {
                budget_ms: budget.as_millis() as u64,
            }),
        }
    }

    /// Like [`sample`](Self::sample), but failures become an all-unavailable
    /// snapshot.
    pub async fn sample_or_empty(&self, budget: Duration) -> MetricsSnapshot {
        match self.sample(budget).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::debug!(error = %e, "Metrics unavailable this tick");
                MetricsSnapshot::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AcceleratorSample;
    use std::time::Instant;

    struct FixedProvider {
        delay: Duration,
    }

    impl MetricsProvider for FixedProvider {
        fn sample(&mut self) -> MetricsSnapshot {
            std::thread::sleep(self.delay);
            MetricsSnapshot {
                cpu_percent: Some(42.0),
                memory_percent: Some(10.0),
                accelerator: Some(AcceleratorSample {
                    usage_percent: 5.0,
                    temp_celsius: 50.0,
                    used_bytes: 1,
                    total_bytes: 2,
                }),
                taken_at: Instant::now(),
            }
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities { accelerator: true }
        }
    }

    #[tokio::test]
    async fn fast_provider_returns_snapshot() {
        let sampler = BoundedSampler::new(Box::new(FixedProvider {
            delay: Duration::ZERO,
        }));
        assert!(sampler.capabilities().accelerator);

        let snapshot = sampler.sample(Duration::from_secs(5)).await.unwrap();
        assert_eq!(snapshot.cpu_percent, Some(42.0));
    }

    #[tokio::test]
    async fn slow_provider_times_out_then_reports_busy() {
        let sampler = BoundedSampler::new(Box::new(FixedProvider {
            delay: Duration::from_millis(300),
        }));

        let first = sampler.sample(Duration::from_millis(10)).await;
        assert!(matches!(first, Err(TelemetryError::Timeout { .. })));

        let second = sampler.sample(Duration::from_millis(10)).await;
        assert!(matches!(second, Err(TelemetryError::Busy)));

        let fallback = sampler.sample_or_empty(Duration::from_millis(10)).await;
        assert_eq!(fallback.cpu_percent, None);
        assert_eq!(fallback.accelerator, None);
    }
}
