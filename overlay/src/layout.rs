//! Window-size driven layout scaling
//!
//! Font size follows the window *area* so text grows in both dimensions,
//! while bar height and row spacing follow window *height* only so rows keep
//! filling the window vertically. All values are recomputed from scratch on
//! every call; there is no interpolation between sizes.

use sysoverlay_types::OverlaySettings;

/// Exponent applied to the area ratio for font size
pub const FONT_AREA_EXPONENT: f64 = 0.55;
/// Exponent applied to the height ratio for bar height and bar corner radius
pub const BAR_HEIGHT_EXPONENT: f64 = 1.06;
/// Exponent applied to the height ratio for vertical row spacing
pub const ROW_SPACING_EXPONENT: f64 = 1.05;

/// Dimensions at the reference window size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutBase {
    pub font_size: f64,
    pub min_font_size: f64,
    pub bar_height: f64,
    pub bar_corner_radius: f64,
    pub row_spacing: f64,
    pub reference_width: f64,
    pub reference_height: f64,
}

impl LayoutBase {
    pub fn from_settings(settings: &OverlaySettings) -> Self {
        let layout = &settings.layout;
        Self {
            font_size: settings.base_font_size as f64,
            min_font_size: layout.min_font_size as f64,
            bar_height: layout.bar_height as f64,
            bar_corner_radius: settings.bar_corner_radius as f64,
            row_spacing: layout.row_spacing as f64,
            reference_width: layout.reference_width as f64,
            reference_height: layout.reference_height as f64,
        }
    }
}

impl Default for LayoutBase {
    fn default() -> Self {
        Self::from_settings(&OverlaySettings::default())
    }
}

/// Dimensions for one window size. Every field is a whole number of pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledLayout {
    pub font_size: f32,
    pub bar_height: f32,
    pub bar_corner_radius: f32,
    pub row_spacing: f32,
}

/// Maps a window size onto [`ScaledLayout`] dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutScaler {
    base: LayoutBase,
}

impl LayoutScaler {
    pub fn new(base: LayoutBase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &LayoutBase {
        &self.base
    }

    pub fn compute(&self, window_width: u32, window_height: u32) -> ScaledLayout {
        let base = &self.base;
        let width = window_width.max(1) as f64;
        let height = window_height.max(1) as f64;

        let area_ratio = (width * height) / (base.reference_width * base.reference_height);
        let height_ratio = height / base.reference_height;

        let font_size = (base.font_size * area_ratio.powf(FONT_AREA_EXPONENT))
            .round()
            .max(base.min_font_size);
        let bar_height = (base.bar_height * height_ratio.powf(BAR_HEIGHT_EXPONENT))
            .round()
            .max(1.0);
        let bar_corner_radius = (base.bar_corner_radius
            * height_ratio.powf(BAR_HEIGHT_EXPONENT))
        .round()
        .min((bar_height / 2.0).floor());
        let row_spacing = (base.row_spacing * height_ratio.powf(ROW_SPACING_EXPONENT)).round();

        ScaledLayout {
            font_size: font_size as f32,
            bar_height: bar_height as f32,
            bar_corner_radius: bar_corner_radius as f32,
            row_spacing: row_spacing as f32,
        }
    }
}

/// Width of a bar showing `percent`, inside a window of `window_width` with
/// `padding` on both sides. Never narrower than one pixel or wider than the
/// padded area.
pub fn bar_pixel_width(percent: f64, window_width: u32, padding: f32) -> f32 {
    let available = (window_width as f32 - 2.0 * padding).max(1.0);
    let fraction = (percent / 100.0).clamp(0.0, 1.0) as f32;
    (fraction * available).clamp(1.0, available)
}

/// Vertical offset of the `row`th visible row
#[inline]
pub fn row_offset(row: usize, padding: f32, row_spacing: f32) -> f32 {
    padding + row as f32 * row_spacing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler() -> LayoutScaler {
        LayoutScaler::new(LayoutBase::default())
    }

    #[test]
    fn reference_size_yields_base_values() {
        let layout = scaler().compute(250, 220);
        assert_eq!(layout.font_size, 18.0);
        assert_eq!(layout.bar_height, 30.0);
        assert_eq!(layout.row_spacing, 43.0);
        assert_eq!(layout.bar_corner_radius, 4.0);
    }

    #[test]
    fn known_size_matches_formula() {
        // area ratio 60000/55000, height ratio 200/220
        let layout = scaler().compute(300, 200);
        assert_eq!(layout.font_size, 19.0);
        assert_eq!(layout.bar_height, 27.0);
        assert_eq!(layout.row_spacing, 39.0);
    }

    #[test]
    fn compute_is_deterministic() {
        let s = scaler();
        assert_eq!(s.compute(333, 271), s.compute(333, 271));
    }

    #[test]
    fn font_size_never_shrinks_as_area_grows() {
        let s = scaler();
        let mut previous = 0.0;
        for step in 0..200 {
            let width = 50 + step * 7;
            let height = 40 + step * 5;
            let font = s.compute(width, height).font_size;
            assert!(font >= previous, "font shrank at {width}x{height}");
            previous = font;
        }
    }

    #[test]
    fn tiny_windows_hit_floors() {
        let layout = scaler().compute(10, 5);
        assert_eq!(layout.font_size, 8.0);
        assert_eq!(layout.bar_height, 1.0);
        assert_eq!(layout.bar_corner_radius, 0.0);
    }

    #[test]
    fn zero_size_is_treated_as_one_pixel() {
        let layout = scaler().compute(0, 0);
        assert!(layout.font_size.is_finite());
        assert_eq!(layout.bar_height, 1.0);
    }

    #[test]
    fn corner_radius_never_exceeds_half_bar() {
        let base = LayoutBase {
            bar_corner_radius: 100.0,
            ..LayoutBase::default()
        };
        let layout = LayoutScaler::new(base).compute(250, 220);
        assert_eq!(layout.bar_corner_radius, 15.0);
    }

    #[test]
    fn bar_width_scales_with_percent() {
        assert_eq!(bar_pixel_width(50.0, 300, 10.0), 140.0);
        assert_eq!(bar_pixel_width(100.0, 300, 10.0), 280.0);
    }

    #[test]
    fn bar_width_is_clamped() {
        assert_eq!(bar_pixel_width(0.0, 300, 10.0), 1.0);
        assert_eq!(bar_pixel_width(250.0, 300, 10.0), 280.0);
        assert_eq!(bar_pixel_width(-5.0, 300, 10.0), 1.0);
        assert_eq!(bar_pixel_width(50.0, 10, 10.0), 1.0);
    }

    #[test]
    fn rows_are_evenly_spaced() {
        assert_eq!(row_offset(0, 10.0, 43.0), 10.0);
        assert_eq!(row_offset(2, 10.0, 43.0), 96.0);
    }
}
