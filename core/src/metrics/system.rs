//! Host metrics via sysinfo, with optional accelerator telemetry.

use std::time::Instant;

use sysinfo::System;

use super::{AcceleratorSource, Capabilities, MetricsProvider, MetricsSnapshot};

/// Default provider: processor and memory from sysinfo, accelerator from
/// [`AcceleratorSource`] when one initialised.
pub struct SystemMetrics {
    system: System,
    accelerator: Option<AcceleratorSource>,
}

impl SystemMetrics {
    /// Create the provider, probing for an accelerator when `probe_accelerator`
    /// is set. A failed probe disables accelerator metrics for the process
    /// lifetime.
    pub fn new(probe_accelerator: bool) -> Self {
        let mut system = System::new();
        // CPU usage is a delta between refreshes; prime the first reading
        system.refresh_cpu_all();

        let accelerator = if probe_accelerator {
            match AcceleratorSource::init() {
                Ok(source) => {
                    tracing::info!(name = %source.name(), "Accelerator telemetry available");
                    Some(source)
                }
                Err(e) => {
                    tracing::info!(error = %e, "Accelerator telemetry unavailable");
                    None
                }
            }
        } else {
            tracing::debug!("Accelerator probe disabled");
            None
        };

        Self {
            system,
            accelerator,
        }
    }
}

impl MetricsProvider for SystemMetrics {
    fn sample(&mut self) -> MetricsSnapshot {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();

        let cpu = self.system.global_cpu_usage() as f64;
        let total = self.system.total_memory();
        let memory_percent = if total > 0 {
            Some(self.system.used_memory() as f64 / total as f64 * 100.0)
        } else {
            None
        };

        let accelerator = self.accelerator.as_ref().and_then(|source| {
            source
                .read()
                .inspect_err(|e| tracing::debug!(error = %e, "Accelerator query failed"))
                .ok()
        });

        MetricsSnapshot {
            cpu_percent: cpu.is_finite().then_some(cpu),
            memory_percent,
            accelerator,
            taken_at: Instant::now(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accelerator: self.accelerator.is_some(),
        }
    }
}
