//! The running overlay
//!
//! `OverlayApp` owns the settings, the frame and the content renderer and
//! drives them from one `select!` loop: the metrics ticker, pointer polling,
//! settings updates and shutdown. Everything runs on the calling task, so the
//! platform window never leaves the thread that created it.

use std::future::Future;
use std::time::Duration;

use sysoverlay_core::BoundedSampler;
use sysoverlay_types::OverlaySettings;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

use crate::frame::OverlayFrame;
use crate::overlays::OverlayRenderer;
use crate::platform::{NativeOverlay, OverlayPlatform};

/// Pointer polling period while the window is on screen
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Why the run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Shutdown,
    CloseRequested,
    WindowClosed,
}

pub struct OverlayApp<P: OverlayPlatform = NativeOverlay> {
    settings: OverlaySettings,
    frame: OverlayFrame<P>,
    content: OverlayRenderer,
    sampler: BoundedSampler,
}

fn metrics_interval(period_ms: u64) -> Interval {
    let mut interval = tokio::time::interval(Duration::from_millis(period_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl<P: OverlayPlatform> OverlayApp<P> {
    pub fn new(frame: OverlayFrame<P>, settings: OverlaySettings, sampler: BoundedSampler) -> Self {
        let capabilities = sampler.capabilities();
        if !capabilities.accelerator {
            tracing::info!("No accelerator telemetry, accelerator rows disabled");
        }
        let content = OverlayRenderer::new(&settings, capabilities);
        Self {
            settings,
            frame,
            content,
            sampler,
        }
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn frame(&self) -> &OverlayFrame<P> {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut OverlayFrame<P> {
        &mut self.frame
    }

    pub fn content(&self) -> &OverlayRenderer {
        &self.content
    }

    /// Settings with the window placement replaced by the current bounds
    pub fn current_settings(&self) -> OverlaySettings {
        let bounds = self.frame.bounds();
        let mut settings = self.settings.clone();
        settings.window.x = bounds.x;
        settings.window.y = bounds.y;
        settings.window.width = bounds.width;
        settings.window.height = bounds.height;
        settings
    }

    /// Replace the settings and re-derive every dependent component.
    /// The caller rebuilds the metrics ticker if the interval changed.
    pub fn apply_settings(&mut self, settings: OverlaySettings) {
        tracing::info!("Applying settings");
        self.content.apply_settings(&settings);
        self.frame.apply_settings(&settings);
        self.settings = settings;
        self.relayout();
    }

    /// Pull one snapshot, update the content and present it
    pub async fn tick(&mut self) {
        let budget = Duration::from_millis(self.settings.sample_timeout_ms);
        let snapshot = self.sampler.sample_or_empty(budget).await;
        self.content
            .tick(&snapshot, self.frame.width(), self.frame.height());
        self.redraw();
    }

    /// Lay out again for the current window size without sampling
    pub fn relayout(&mut self) {
        self.content.layout(self.frame.width(), self.frame.height());
        self.redraw();
    }

    fn redraw(&mut self) {
        let policy = self.frame.content_policy();
        if let Some((mut pixmap, renderer)) = self.frame.begin_frame() {
            self.content.paint(&mut pixmap, renderer, policy);
        }
        self.frame.end_frame();
    }

    /// Run until `shutdown` resolves or the window is closed.
    ///
    /// Validated settings arriving on `settings_rx` are applied between ticks.
    pub async fn run_until<F>(
        &mut self,
        mut settings_rx: Option<mpsc::Receiver<OverlaySettings>>,
        shutdown: F,
    ) -> ExitReason
    where
        F: Future<Output = ()>,
    {
        let mut ticker = metrics_interval(self.settings.update_interval_ms);
        let mut input = tokio::time::interval(INPUT_POLL_INTERVAL);
        input.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(
            interval_ms = self.settings.update_interval_ms,
            "Overlay running"
        );

        let reason = loop {
            tokio::select! {
                _ = &mut shutdown => break ExitReason::Shutdown,
                _ = ticker.tick() => self.tick().await,
                _ = input.tick() => {
                    let polled = self.frame.poll_input();
                    if !polled.running {
                        break ExitReason::WindowClosed;
                    }
                    if polled.close_requested {
                        break ExitReason::CloseRequested;
                    }
                    if polled.resized {
                        self.relayout();
                    }
                }
                update = next_settings(&mut settings_rx) => match update {
                    Some(settings) => {
                        let interval_changed =
                            settings.update_interval_ms != self.settings.update_interval_ms;
                        self.apply_settings(settings);
                        if interval_changed {
                            ticker = metrics_interval(self.settings.update_interval_ms);
                        }
                    }
                    None => {
                        tracing::debug!("Settings channel closed");
                        settings_rx = None;
                    }
                },
            }
        };

        tracing::info!(?reason, bounds = ?self.frame.bounds(), "Overlay stopped");
        reason
    }
}

/// Next settings update, or pending forever without a channel
async fn next_settings(
    rx: &mut Option<mpsc::Receiver<OverlaySettings>>,
) -> Option<OverlaySettings> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests;
