//! System metrics overlay content
//!
//! Displays processor, memory and accelerator usage as one bar per row.

use std::collections::BTreeSet;

use chrono::{DateTime, Local};
use sysoverlay_core::{Capabilities, MetricSmoother, MetricsSnapshot, Series};
use sysoverlay_types::{BarColors, MetricId, OverlaySettings, Rgb};
use tiny_skia::PixmapMut;

use super::BarSpec;
use crate::compositor::ContentPolicy;
use crate::layout::{LayoutBase, LayoutScaler, ScaledLayout, bar_pixel_width, row_offset};
use crate::renderer::Renderer;
use crate::scene::{LabelSpec, Primitive, PrimitiveHandle, PrimitiveKey, Scene};
use crate::utils::{
    color_from_rgb, format_last_update, format_memory, format_percent, format_temperature,
};
use crate::widgets::ProgressBar;

/// Current display value of one metric
struct Reading {
    percent: f64,
    label: String,
}

pub struct OverlayRenderer {
    smoother: MetricSmoother,
    scaler: LayoutScaler,
    /// Fixed at startup; accelerator rows never appear when off
    capabilities: Capabilities,
    enabled: BTreeSet<MetricId>,
    bar_colors: BarColors,
    text_color: Rgb,
    padding: f32,
    show_timestamp: bool,
    scene: Scene,
    /// Visible rows of the last layout, top to bottom
    rows: Vec<PrimitiveHandle>,
    last_update: Option<DateTime<Local>>,
}

impl OverlayRenderer {
    pub fn new(settings: &OverlaySettings, capabilities: Capabilities) -> Self {
        let mut renderer = Self {
            smoother: MetricSmoother::new(settings.smoothing_window),
            scaler: LayoutScaler::new(LayoutBase::from_settings(settings)),
            capabilities,
            enabled: BTreeSet::new(),
            bar_colors: settings.bar_colors,
            text_color: settings.text_color,
            padding: settings.layout.padding,
            show_timestamp: settings.show_timestamp,
            scene: Scene::new(),
            rows: Vec::new(),
            last_update: None,
        };
        renderer.apply_settings(settings);
        renderer
    }

    /// Re-derive smoothing, layout and display options from settings.
    /// Takes effect at the next layout.
    pub fn apply_settings(&mut self, settings: &OverlaySettings) {
        self.smoother.set_window(settings.smoothing_window);
        self.scaler = LayoutScaler::new(LayoutBase::from_settings(settings));
        self.enabled = settings.enabled_metrics.clone();
        self.bar_colors = settings.bar_colors;
        self.text_color = settings.text_color;
        self.padding = settings.layout.padding;
        self.show_timestamp = settings.show_timestamp;
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn smoother(&self) -> &MetricSmoother {
        &self.smoother
    }

    /// Metrics that are both enabled and backed by an available source, in
    /// display order
    pub fn visible_metrics(&self) -> impl Iterator<Item = MetricId> + '_ {
        MetricId::ALL.into_iter().filter(|m| {
            self.enabled.contains(m) && (!m.is_accelerator() || self.capabilities.accelerator)
        })
    }

    /// Feed a snapshot into the smoothing buffers. Unavailable fields leave
    /// their buffers untouched.
    pub fn ingest(&mut self, snapshot: &MetricsSnapshot) {
        if let Some(cpu) = snapshot.cpu_percent {
            self.smoother.push(Series::Cpu, cpu);
        }
        if let Some(memory) = snapshot.memory_percent {
            self.smoother.push(Series::Memory, memory);
        }
        if !self.capabilities.accelerator {
            return;
        }
        if let Some(acc) = &snapshot.accelerator {
            self.smoother.push(Series::AcceleratorUsage, acc.usage_percent);
            self.smoother.push(Series::AcceleratorTemp, acc.temp_celsius);
            self.smoother
                .push(Series::AcceleratorMemoryUsed, acc.used_bytes as f64);
            self.smoother
                .push(Series::AcceleratorMemoryTotal, acc.total_bytes as f64);
        }
    }

    fn reading(&self, metric: MetricId) -> Option<Reading> {
        let single = |series: Series| self.smoother.smoothed(series);
        match metric {
            MetricId::Cpu => single(Series::Cpu).map(|v| Reading {
                percent: v,
                label: format_percent("CPU", v),
            }),
            MetricId::Memory => single(Series::Memory).map(|v| Reading {
                percent: v,
                label: format_percent("RAM", v),
            }),
            MetricId::AcceleratorUsage => single(Series::AcceleratorUsage).map(|v| Reading {
                percent: v,
                label: format_percent("GPU", v),
            }),
            // 0-100 °C maps onto the bar
            MetricId::AcceleratorTemp => single(Series::AcceleratorTemp).map(|v| Reading {
                percent: v,
                label: format_temperature("GPU Temp", v),
            }),
            MetricId::AcceleratorMemory => {
                let percent = self.smoother.accelerator_memory_percent()?;
                let used = single(Series::AcceleratorMemoryUsed)?;
                let total = single(Series::AcceleratorMemoryTotal)?;
                Some(Reading {
                    percent,
                    label: format_memory("VRAM", used, total),
                })
            }
        }
    }

    /// Rebuild the scene for a window of `width`×`height` from the current
    /// smoothed values. Rows are packed densely in display order.
    pub fn layout(&mut self, width: u32, height: u32) -> ScaledLayout {
        let scaled = self.scaler.compute(width, height);
        let available = (width as f32 - 2.0 * self.padding).max(1.0);

        self.scene.begin_update();
        self.rows.clear();

        let metrics: Vec<MetricId> = self.visible_metrics().collect();
        for metric in metrics {
            let Some(reading) = self.reading(metric) else {
                continue;
            };
            let bar = BarSpec {
                metric,
                x: self.padding,
                y_offset: row_offset(self.rows.len(), self.padding, scaled.row_spacing),
                bar_pixel_width: bar_pixel_width(reading.percent, width, self.padding),
                bar_pixel_height: scaled.bar_height,
                corner_radius: scaled.bar_corner_radius,
                available_width: available,
                label_text: reading.label,
                label_font_size: scaled.font_size,
                fill_color: self.bar_colors.get(metric),
            };
            let handle = self
                .scene
                .upsert(PrimitiveKey::Metric(metric), Primitive::Bar(bar));
            self.rows.push(handle);
        }

        if self.show_timestamp
            && let Some(at) = self.last_update
        {
            let label = LabelSpec {
                text: format_last_update(&at),
                x: self.padding,
                y_offset: row_offset(self.rows.len(), self.padding, scaled.row_spacing),
                row_height: scaled.bar_height,
                font_size: scaled.font_size,
            };
            let handle = self
                .scene
                .upsert(PrimitiveKey::Timestamp, Primitive::Label(label));
            self.rows.push(handle);
        }

        scaled
    }

    /// One update: record the snapshot, then lay out for the window size
    pub fn tick(&mut self, snapshot: &MetricsSnapshot, width: u32, height: u32) -> ScaledLayout {
        self.ingest(snapshot);
        self.last_update = Some(Local::now());
        self.layout(width, height)
    }

    /// Bars of the last layout, top to bottom
    pub fn bars(&self) -> Vec<&BarSpec> {
        self.rows
            .iter()
            .filter_map(|h| match self.scene.get(*h) {
                Some(Primitive::Bar(bar)) => Some(bar),
                _ => None,
            })
            .collect()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Draw the visible rows over the already painted background. Colors
    /// equal to an active color key are shifted off it.
    pub fn paint(&self, pixmap: &mut PixmapMut, renderer: &mut Renderer, policy: ContentPolicy) {
        let text_color = color_from_rgb(policy.color(self.text_color));

        for handle in &self.rows {
            match self.scene.get(*handle) {
                Some(Primitive::Bar(bar)) => {
                    ProgressBar::new(bar.label_text.as_str())
                        .with_fill_color(color_from_rgb(policy.color(bar.fill_color)))
                        .with_text_color(text_color)
                        .with_anti_alias(policy.anti_alias)
                        .render(
                            pixmap,
                            renderer,
                            bar.x,
                            bar.y_offset,
                            bar.bar_pixel_width,
                            bar.available_width,
                            bar.bar_pixel_height,
                            bar.corner_radius,
                            bar.label_font_size,
                        );
                }
                Some(Primitive::Label(label)) => {
                    let text_y = label.y_offset + label.row_height / 2.0 + label.font_size / 3.0;
                    renderer.draw_text(
                        pixmap,
                        &label.text,
                        label.x + 4.0,
                        text_y,
                        label.font_size,
                        text_color,
                    );
                }
                None => {}
            }
        }
    }
}
