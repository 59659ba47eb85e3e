//! Shared configuration types for sysoverlay
//!
//! This crate contains the serializable settings shared between the metrics
//! backend (sysoverlay-core) and the overlay engine (sysoverlay-overlay).
//! Every field carries a serde default so partial settings files load.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// RGB color as `[r, g, b]`. Stored in settings files as `#rrggbb`.
pub type Rgb = [u8; 3];

// ─────────────────────────────────────────────────────────────────────────────
// Colors
// ─────────────────────────────────────────────────────────────────────────────

/// `#rrggbb` representation of [`Rgb`] settings fields, for use with
/// `#[serde(with = "hex_color")]`. Malformed strings fail deserialization.
pub mod hex_color {
    use super::Rgb;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    /// Parse `#rrggbb` (leading `#` optional)
    pub fn parse(value: &str) -> Option<Rgb> {
        let trimmed = value.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some([channel(0)?, channel(2)?, channel(4)?])
    }

    pub fn format(color: Rgb) -> String {
        let [r, g, b] = color;
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    pub fn serialize<S: Serializer>(color: &Rgb, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rgb, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid color '{value}', expected #rrggbb")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metrics
// ─────────────────────────────────────────────────────────────────────────────

/// A displayable metric. Declaration order is the fixed display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Cpu,
    Memory,
    AcceleratorUsage,
    AcceleratorTemp,
    AcceleratorMemory,
}

impl MetricId {
    /// All metrics in display order
    pub const ALL: [MetricId; 5] = [
        MetricId::Cpu,
        MetricId::Memory,
        MetricId::AcceleratorUsage,
        MetricId::AcceleratorTemp,
        MetricId::AcceleratorMemory,
    ];

    /// Returns true if this metric is read from the accelerator source
    pub fn is_accelerator(&self) -> bool {
        matches!(
            self,
            MetricId::AcceleratorUsage | MetricId::AcceleratorTemp | MetricId::AcceleratorMemory
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Overlay Settings
// ─────────────────────────────────────────────────────────────────────────────

/// How the background's transparent region is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransparencyMode {
    /// Per-pixel alpha when the host supports it, chroma key otherwise
    #[default]
    Auto,
    NativeAlpha,
    ChromaKey,
}

/// Window placement and resize limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    #[serde(default = "default_window_x")]
    pub x: i32,
    #[serde(default = "default_window_y")]
    pub y: i32,
    #[serde(default = "default_window_width")]
    pub width: u32,
    #[serde(default = "default_window_height")]
    pub height: u32,
    #[serde(default = "default_true")]
    pub lock_aspect_ratio: bool,
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    #[serde(default = "default_min_height")]
    pub min_height: u32,
}

fn default_true() -> bool {
    true
}
fn default_window_x() -> i32 {
    100
}
fn default_window_y() -> i32 {
    100
}
fn default_window_width() -> u32 {
    210
}
fn default_window_height() -> u32 {
    175
}
fn default_min_width() -> u32 {
    200
}
fn default_min_height() -> u32 {
    150
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            x: default_window_x(),
            y: default_window_y(),
            width: default_window_width(),
            height: default_window_height(),
            lock_aspect_ratio: true,
            min_width: default_min_width(),
            min_height: default_min_height(),
        }
    }
}

/// Base dimensions the layout scales from. The base values apply when the
/// window has exactly the reference size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(default = "default_bar_height")]
    pub bar_height: f32,
    #[serde(default = "default_row_spacing")]
    pub row_spacing: f32,
    #[serde(default = "default_padding")]
    pub padding: f32,
    #[serde(default = "default_reference_width")]
    pub reference_width: f32,
    #[serde(default = "default_reference_height")]
    pub reference_height: f32,
    #[serde(default = "default_min_font_size")]
    pub min_font_size: u32,
}

fn default_bar_height() -> f32 {
    30.0
}
fn default_row_spacing() -> f32 {
    43.0
}
fn default_padding() -> f32 {
    10.0
}
fn default_reference_width() -> f32 {
    250.0
}
fn default_reference_height() -> f32 {
    220.0
}
fn default_min_font_size() -> u32 {
    8
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            bar_height: default_bar_height(),
            row_spacing: default_row_spacing(),
            padding: default_padding(),
            reference_width: default_reference_width(),
            reference_height: default_reference_height(),
            min_font_size: default_min_font_size(),
        }
    }
}

/// Per-metric bar fill colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarColors {
    #[serde(default = "default_bar_color", with = "hex_color")]
    pub cpu: Rgb,
    #[serde(default = "default_bar_color", with = "hex_color")]
    pub memory: Rgb,
    #[serde(default = "default_bar_color", with = "hex_color")]
    pub accelerator_usage: Rgb,
    #[serde(default = "default_bar_color", with = "hex_color")]
    pub accelerator_temp: Rgb,
    #[serde(default = "default_bar_color", with = "hex_color")]
    pub accelerator_memory: Rgb,
}

fn default_bar_color() -> Rgb {
    [0x50, 0x50, 0x50]
}

impl Default for BarColors {
    fn default() -> Self {
        Self {
            cpu: default_bar_color(),
            memory: default_bar_color(),
            accelerator_usage: default_bar_color(),
            accelerator_temp: default_bar_color(),
            accelerator_memory: default_bar_color(),
        }
    }
}

impl BarColors {
    pub fn get(&self, metric: MetricId) -> Rgb {
        match metric {
            MetricId::Cpu => self.cpu,
            MetricId::Memory => self.memory,
            MetricId::AcceleratorUsage => self.accelerator_usage,
            MetricId::AcceleratorTemp => self.accelerator_temp,
            MetricId::AcceleratorMemory => self.accelerator_memory,
        }
    }
}

/// Complete overlay configuration.
///
/// Owned by the running application; replaced wholesale through
/// `apply_settings` rather than mutated field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySettings {
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default = "default_background_color", with = "hex_color")]
    pub background_color: Rgb,
    #[serde(default = "default_text_color", with = "hex_color")]
    pub text_color: Rgb,
    /// 0.0 (invisible) to 1.0 (opaque)
    #[serde(default = "default_background_opacity")]
    pub background_opacity: f32,
    #[serde(default)]
    pub bar_colors: BarColors,
    #[serde(default = "default_base_font_size")]
    pub base_font_size: u32,
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Upper bound on a single metrics query
    #[serde(default = "default_sample_timeout_ms")]
    pub sample_timeout_ms: u64,
    #[serde(default = "default_window_corner_radius")]
    pub window_corner_radius: u32,
    #[serde(default = "default_bar_corner_radius")]
    pub bar_corner_radius: u32,
    #[serde(default = "default_enabled_metrics")]
    pub enabled_metrics: BTreeSet<MetricId>,
    #[serde(default)]
    pub show_timestamp: bool,
    #[serde(default)]
    pub transparency: TransparencyMode,
}

fn default_background_color() -> Rgb {
    [0, 0, 0]
}
fn default_text_color() -> Rgb {
    [255, 255, 255]
}
fn default_background_opacity() -> f32 {
    0.9
}
fn default_base_font_size() -> u32 {
    18
}
fn default_smoothing_window() -> usize {
    5
}
fn default_update_interval_ms() -> u64 {
    500
}
fn default_sample_timeout_ms() -> u64 {
    250
}
fn default_window_corner_radius() -> u32 {
    10
}
fn default_bar_corner_radius() -> u32 {
    4
}
fn default_enabled_metrics() -> BTreeSet<MetricId> {
    MetricId::ALL.into_iter().collect()
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            layout: LayoutSettings::default(),
            background_color: default_background_color(),
            text_color: default_text_color(),
            background_opacity: default_background_opacity(),
            bar_colors: BarColors::default(),
            base_font_size: default_base_font_size(),
            smoothing_window: default_smoothing_window(),
            update_interval_ms: default_update_interval_ms(),
            sample_timeout_ms: default_sample_timeout_ms(),
            window_corner_radius: default_window_corner_radius(),
            bar_corner_radius: default_bar_corner_radius(),
            enabled_metrics: default_enabled_metrics(),
            show_timestamp: false,
            transparency: TransparencyMode::Auto,
        }
    }
}

impl OverlaySettings {
    pub fn is_enabled(&self, metric: MetricId) -> bool {
        self.enabled_metrics.contains(&metric)
    }
}
