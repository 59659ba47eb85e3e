//! Moving-average smoothing for raw metric samples.
//!
//! Each series keeps a ring of its most recent raw values and reports their
//! arithmetic mean. Buffers are cleared when the window length changes and are
//! otherwise never reset, so a failed sample simply leaves them untouched.

use std::collections::{HashMap, VecDeque};

use sysoverlay_types::MetricId;

/// A smoothed input series.
///
/// Most metrics map one-to-one onto a series. Accelerator memory is smoothed
/// as two independent series (used and total) and the percentage is derived
/// from the smoothed pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    Cpu,
    Memory,
    AcceleratorUsage,
    AcceleratorTemp,
    AcceleratorMemoryUsed,
    AcceleratorMemoryTotal,
}

impl Series {
    /// Series backing a single-valued metric. Accelerator memory has none.
    pub fn for_metric(metric: MetricId) -> Option<Self> {
        match metric {
            MetricId::Cpu => Some(Series::Cpu),
            MetricId::Memory => Some(Series::Memory),
            MetricId::AcceleratorUsage => Some(Series::AcceleratorUsage),
            MetricId::AcceleratorTemp => Some(Series::AcceleratorTemp),
            MetricId::AcceleratorMemory => None,
        }
    }
}

/// Bounded FIFO of raw values for one series
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SmoothingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest when full, and return the new mean.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.mean().unwrap_or(value)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Smoothing state for every series the overlay displays.
#[derive(Debug, Clone)]
pub struct MetricSmoother {
    window: usize,
    buffers: HashMap<Series, SmoothingBuffer>,
}

impl MetricSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            buffers: HashMap::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Change the window length. Existing buffers are discarded rather than
    /// resampled; an unchanged length is a no-op.
    pub fn set_window(&mut self, window: usize) {
        let window = window.max(1);
        if window == self.window {
            return;
        }
        tracing::debug!(old = self.window, new = window, "Smoothing window changed, clearing buffers");
        self.window = window;
        self.buffers.clear();
    }

    /// Record a raw sample and return the smoothed value.
    ///
    /// Non-finite input is dropped; the current mean is returned if the series
    /// has history, otherwise the input is passed through unchanged.
    pub fn push(&mut self, series: Series, raw: f64) -> f64 {
        if !raw.is_finite() {
            tracing::debug!(?series, raw, "Dropping non-finite sample");
            return self.smoothed(series).unwrap_or(raw);
        }
        let window = self.window;
        self.buffers
            .entry(series)
            .or_insert_with(|| SmoothingBuffer::new(window))
            .push(raw)
    }

    /// Current smoothed value without recording anything
    pub fn smoothed(&self, series: Series) -> Option<f64> {
        self.buffers.get(&series).and_then(SmoothingBuffer::mean)
    }

    /// Accelerator memory usage in percent, derived from the smoothed used
    /// and total series.
    pub fn accelerator_memory_percent(&self) -> Option<f64> {
        let used = self.smoothed(Series::AcceleratorMemoryUsed)?;
        let total = self.smoothed(Series::AcceleratorMemoryTotal)?;
        if total <= 0.0 {
            return None;
        }
        Some(used / total * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn mean_covers_last_window_values() {
        let mut smoother = MetricSmoother::new(3);
        let inputs = [10.0, 20.0, 30.0, 40.0, 50.0];
        let mut last = 0.0;
        for value in inputs {
            last = smoother.push(Series::Cpu, value);
        }
        assert!(approx(last, 40.0));
    }

    #[test]
    fn short_history_averages_what_it_has() {
        let mut smoother = MetricSmoother::new(5);
        assert!(approx(smoother.push(Series::Memory, 10.0), 10.0));
        assert!(approx(smoother.push(Series::Memory, 20.0), 15.0));
    }

    #[test]
    fn window_of_one_passes_values_through() {
        let mut smoother = MetricSmoother::new(1);
        assert!(approx(smoother.push(Series::Cpu, 10.0), 10.0));
        assert!(approx(smoother.push(Series::Cpu, 90.0), 90.0));
    }

    #[test]
    fn series_are_independent() {
        let mut smoother = MetricSmoother::new(2);
        smoother.push(Series::Cpu, 100.0);
        assert!(approx(smoother.push(Series::Memory, 0.0), 0.0));
        assert!(approx(smoother.smoothed(Series::Cpu).unwrap(), 100.0));
    }

    #[test]
    fn changing_window_clears_buffers() {
        let mut smoother = MetricSmoother::new(5);
        smoother.push(Series::Cpu, 100.0);
        smoother.set_window(2);
        assert_eq!(smoother.smoothed(Series::Cpu), None);
        assert!(approx(smoother.push(Series::Cpu, 10.0), 10.0));
    }

    #[test]
    fn same_window_keeps_buffers() {
        let mut smoother = MetricSmoother::new(3);
        smoother.push(Series::Cpu, 30.0);
        smoother.set_window(3);
        assert!(approx(smoother.smoothed(Series::Cpu).unwrap(), 30.0));
    }

    #[test]
    fn non_finite_samples_are_ignored() {
        let mut smoother = MetricSmoother::new(3);
        smoother.push(Series::Cpu, 50.0);
        assert!(approx(smoother.push(Series::Cpu, f64::NAN), 50.0));
        assert!(approx(smoother.push(Series::Cpu, 70.0), 60.0));
    }

    #[test]
    fn accelerator_memory_derives_from_smoothed_pair() {
        let mut smoother = MetricSmoother::new(2);
        smoother.push(Series::AcceleratorMemoryUsed, 2.0);
        smoother.push(Series::AcceleratorMemoryTotal, 8.0);
        smoother.push(Series::AcceleratorMemoryUsed, 4.0);
        smoother.push(Series::AcceleratorMemoryTotal, 8.0);
        assert!(approx(smoother.accelerator_memory_percent().unwrap(), 37.5));
    }

    #[test]
    fn accelerator_memory_needs_positive_total() {
        let mut smoother = MetricSmoother::new(2);
        smoother.push(Series::AcceleratorMemoryUsed, 2.0);
        assert_eq!(smoother.accelerator_memory_percent(), None);
        smoother.push(Series::AcceleratorMemoryTotal, 0.0);
        assert_eq!(smoother.accelerator_memory_percent(), None);
    }

    #[test]
    fn zero_capacity_is_treated_as_one() {
        let mut buffer = SmoothingBuffer::new(0);
        buffer.push(1.0);
        buffer.push(2.0);
        assert_eq!(buffer.len(), 1);
    }
}
