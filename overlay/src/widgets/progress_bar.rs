//! Progress bar widget for displaying metrics
#![allow(clippy::too_many_arguments)]
use tiny_skia::{Color, PixmapMut};

use crate::renderer::Renderer;

/// Horizontal space between the bar's left edge and its label
const TEXT_PADDING: f32 = 4.0;

/// A horizontal bar with a left-aligned label drawn over it
///
/// The label is laid over the full row, not just the filled part, so short
/// bars stay readable: `|█████ CPU: 12.3%        |`
#[derive(Debug, Clone)]
pub struct ProgressBar {
    pub label: String,
    pub fill_color: Color,
    pub text_color: Color,
    /// Off when edge pixels must not blend into a color key
    pub anti_alias: bool,
}

impl ProgressBar {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fill_color: Color::from_rgba8(80, 80, 80, 255),
            text_color: Color::WHITE,
            anti_alias: true,
        }
    }

    pub fn with_fill_color(mut self, color: Color) -> Self {
        self.fill_color = color;
        self
    }

    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = color;
        self
    }

    pub fn with_anti_alias(mut self, anti_alias: bool) -> Self {
        self.anti_alias = anti_alias;
        self
    }

    /// Truncate label to fit within max_width, adding "..." if truncated
    /// Uses estimation + single verification instead of binary search to reduce measure_text calls
    fn truncate_label_to_width(
        &self,
        renderer: &mut Renderer,
        max_width: f32,
        font_size: f32,
    ) -> String {
        let (label_width, _) = renderer.measure_text(&self.label, font_size);
        if label_width <= max_width {
            return self.label.clone();
        }

        let chars: Vec<char> = self.label.chars().collect();
        if chars.is_empty() {
            return "...".to_string();
        }

        let (ellipsis_width, _) = renderer.measure_text("...", font_size);
        let available_width = max_width - ellipsis_width;
        if available_width <= 0.0 {
            return "...".to_string();
        }

        // Estimate assuming roughly uniform character width, slightly conservative
        let avg_char_width = label_width / chars.len() as f32;
        let estimated_fit = ((available_width / avg_char_width) * 0.9) as usize;
        let mut fit_count = estimated_fit.min(chars.len()).max(1);

        loop {
            let truncated: String = chars[..fit_count].iter().collect();
            let test = format!("{}...", truncated);
            let (test_width, _) = renderer.measure_text(&test, font_size);

            if test_width <= max_width || fit_count <= 1 {
                return test;
            }
            fit_count -= 1;
        }
    }

    /// Render the bar at `(x, y)`. `fill_width` is the bar length; the label
    /// may use up to `row_width`.
    pub fn render(
        &self,
        pixmap: &mut PixmapMut,
        renderer: &mut Renderer,
        x: f32,
        y: f32,
        fill_width: f32,
        row_width: f32,
        height: f32,
        radius: f32,
        font_size: f32,
    ) {
        if fill_width > 0.0 {
            renderer.fill_rounded_rect(
                pixmap,
                x,
                y,
                fill_width,
                height,
                radius,
                self.fill_color,
                self.anti_alias,
            );
        }

        let text_y = y + height / 2.0 + font_size / 3.0;
        let display_label =
            self.truncate_label_to_width(renderer, row_width - TEXT_PADDING * 2.0, font_size);
        renderer.draw_text(
            pixmap,
            &display_label,
            x + TEXT_PADDING,
            text_y,
            font_size,
            self.text_color,
        );
    }
}
