//! Overlay content
//!
//! [`OverlayRenderer`] turns metric snapshots into a [`Scene`](crate::scene::Scene)
//! of bar rows laid out for the current window size, and paints that scene
//! with the [`ProgressBar`](crate::widgets::ProgressBar) widget.

mod system;

pub use system::OverlayRenderer;

use sysoverlay_types::{MetricId, Rgb};

/// Geometry and text of one metric row, rebuilt every tick
#[derive(Debug, Clone, PartialEq)]
pub struct BarSpec {
    pub metric: MetricId,
    /// Left edge of the bar (the window padding)
    pub x: f32,
    pub y_offset: f32,
    pub bar_pixel_width: f32,
    pub bar_pixel_height: f32,
    pub corner_radius: f32,
    /// Width the bar would have at 100%
    pub available_width: f32,
    pub label_text: String,
    pub label_font_size: f32,
    pub fill_color: Rgb,
}
