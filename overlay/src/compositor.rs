//! Window background rendering
//!
//! The background is a rounded rectangle inscribed in the window. Pixels
//! outside it must disappear on screen, which hosts support in one of two
//! ways, each a [`TransparencyStrategy`]:
//!
//! - [`NativeAlpha`]: per-pixel alpha, corners at alpha 0 and the body at the
//!   configured opacity.
//! - [`ChromaKey`]: corners painted with a sentinel color the host keys out,
//!   the body opaque, and opacity applied by the host to the whole window.
//!
//! [`BackgroundCompositor`] caches the last image and only re-renders when the
//! window size changes or after [`invalidate`](BackgroundCompositor::invalidate).

use sysoverlay_types::{OverlaySettings, Rgb, TransparencyMode};
use tiny_skia::{Color, FillRule, Paint, Pixmap, Transform};

use crate::renderer::rounded_rect_path;

/// Sentinel used for chroma-key transparency
pub const DEFAULT_COLOR_KEY: Rgb = [255, 0, 255];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundStyle {
    pub color: Rgb,
    pub opacity: f32,
    pub corner_radius: f32,
}

impl BackgroundStyle {
    pub fn from_settings(settings: &OverlaySettings) -> Self {
        Self {
            color: settings.background_color,
            opacity: settings.background_opacity.clamp(0.0, 1.0),
            corner_radius: settings.window_corner_radius as f32,
        }
    }
}

/// How transparent pixels are expressed to the window host
pub trait TransparencyStrategy: Send {
    fn mode(&self) -> TransparencyMode;

    /// Color the whole raster starts from (what lies outside the rounded rect)
    fn outside_color(&self) -> Color;

    /// Color of the rounded rect body
    fn body_color(&self, style: &BackgroundStyle) -> Color;

    /// Whether shape edges may be blended
    fn anti_alias(&self) -> bool;

    /// Color the host must key out, if any
    fn color_key(&self) -> Option<Rgb>;

    /// Opacity the host applies uniformly to the window
    fn window_opacity(&self, style: &BackgroundStyle) -> f32;

    /// Constraints on content drawn over this strategy's background
    fn content_policy(&self) -> ContentPolicy {
        ContentPolicy {
            color_key: self.color_key(),
            anti_alias: self.anti_alias(),
        }
    }

    /// Raster a background image. Returns `None` for an empty size.
    fn render(&self, width: u32, height: u32, style: &BackgroundStyle) -> Option<BackgroundImage> {
        let mut pixmap = Pixmap::new(width, height)?;
        pixmap.fill(self.outside_color());

        if let Some(path) = rounded_rect_path(
            0.0,
            0.0,
            width as f32,
            height as f32,
            style.corner_radius,
        ) {
            let mut paint = Paint::default();
            paint.set_color(self.body_color(style));
            paint.anti_alias = self.anti_alias();
            pixmap.fill_path(
                &path,
                &paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }

        Some(BackgroundImage {
            pixmap,
            color_key: self.color_key(),
            window_opacity: self.window_opacity(style),
        })
    }
}

/// How bars and text must be painted so only the corners are keyed out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentPolicy {
    pub color_key: Option<Rgb>,
    pub anti_alias: bool,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            color_key: None,
            anti_alias: true,
        }
    }
}

impl ContentPolicy {
    /// `color`, shifted off the color key when one is active
    pub fn color(&self, color: Rgb) -> Rgb {
        match self.color_key {
            Some(key) => ChromaKey { key }.avoid_key(color),
            None => color,
        }
    }
}

/// Per-pixel alpha compositing
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeAlpha;

impl TransparencyStrategy for NativeAlpha {
    fn mode(&self) -> TransparencyMode {
        TransparencyMode::NativeAlpha
    }

    fn outside_color(&self) -> Color {
        Color::TRANSPARENT
    }

    fn body_color(&self, style: &BackgroundStyle) -> Color {
        let [r, g, b] = style.color;
        let mut color = Color::from_rgba8(r, g, b, 255);
        color.set_alpha(style.opacity.clamp(0.0, 1.0));
        color
    }

    fn anti_alias(&self) -> bool {
        true
    }

    fn color_key(&self) -> Option<Rgb> {
        None
    }

    fn window_opacity(&self, _style: &BackgroundStyle) -> f32 {
        1.0
    }
}

/// Sentinel-color compositing for hosts without per-pixel alpha
#[derive(Debug, Clone, Copy)]
pub struct ChromaKey {
    pub key: Rgb,
}

impl Default for ChromaKey {
    fn default() -> Self {
        Self {
            key: DEFAULT_COLOR_KEY,
        }
    }
}

impl ChromaKey {
    /// Shift a color off the key so it is never keyed out
    pub fn avoid_key(&self, color: Rgb) -> Rgb {
        if color != self.key {
            return color;
        }
        let [r, g, b] = color;
        let r = if r > 0 { r - 1 } else { r + 1 };
        [r, g, b]
    }
}

impl TransparencyStrategy for ChromaKey {
    fn mode(&self) -> TransparencyMode {
        TransparencyMode::ChromaKey
    }

    fn outside_color(&self) -> Color {
        let [r, g, b] = self.key;
        Color::from_rgba8(r, g, b, 255)
    }

    fn body_color(&self, style: &BackgroundStyle) -> Color {
        let [r, g, b] = self.avoid_key(style.color);
        Color::from_rgba8(r, g, b, 255)
    }

    fn anti_alias(&self) -> bool {
        false
    }

    fn color_key(&self) -> Option<Rgb> {
        Some(self.key)
    }

    fn window_opacity(&self, style: &BackgroundStyle) -> f32 {
        style.opacity.clamp(0.0, 1.0)
    }
}

/// Pick the strategy for a configured mode and host capability.
///
/// `Auto` prefers native alpha. A forced `NativeAlpha` on a host that cannot
/// composite it falls back to the chroma key.
pub fn select_strategy(
    mode: TransparencyMode,
    host_supports_alpha: bool,
) -> Box<dyn TransparencyStrategy> {
    match (mode, host_supports_alpha) {
        (TransparencyMode::ChromaKey, _) => Box::new(ChromaKey::default()),
        (TransparencyMode::Auto | TransparencyMode::NativeAlpha, true) => Box::new(NativeAlpha),
        (TransparencyMode::NativeAlpha, false) => {
            tracing::warn!("Native alpha requested but host lacks per-pixel alpha, using chroma key");
            Box::new(ChromaKey::default())
        }
        (TransparencyMode::Auto, false) => {
            tracing::debug!("Host lacks per-pixel alpha, using chroma key");
            Box::new(ChromaKey::default())
        }
    }
}

/// A rendered background plus the host settings it was rendered for
pub struct BackgroundImage {
    pub pixmap: Pixmap,
    pub color_key: Option<Rgb>,
    pub window_opacity: f32,
}

impl BackgroundImage {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Premultiplied RGBA bytes
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let p = self.pixmap.pixel(x, y)?;
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }

    /// Whether the pixel at (x, y) will be invisible on screen
    pub fn is_transparent_at(&self, x: u32, y: u32) -> bool {
        let Some(px) = self.pixel(x, y) else {
            return true;
        };
        match self.color_key {
            Some(key) => px[..3] == key,
            None => px[3] == 0,
        }
    }
}

/// Caches the window background across frames
pub struct BackgroundCompositor {
    strategy: Box<dyn TransparencyStrategy>,
    style: BackgroundStyle,
    image: Option<BackgroundImage>,
    dirty: bool,
    renders: usize,
}

impl BackgroundCompositor {
    pub fn new(strategy: Box<dyn TransparencyStrategy>, style: BackgroundStyle) -> Self {
        Self {
            strategy,
            style,
            image: None,
            dirty: true,
            renders: 0,
        }
    }

    pub fn strategy(&self) -> &dyn TransparencyStrategy {
        self.strategy.as_ref()
    }

    pub fn style(&self) -> &BackgroundStyle {
        &self.style
    }

    pub fn content_policy(&self) -> ContentPolicy {
        self.strategy.content_policy()
    }

    pub fn set_strategy(&mut self, strategy: Box<dyn TransparencyStrategy>) {
        self.strategy = strategy;
        self.invalidate();
    }

    pub fn set_style(&mut self, style: BackgroundStyle) {
        if style != self.style {
            self.style = style;
            self.invalidate();
        }
    }

    /// Force the next refresh to re-render
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Make sure the cached image matches `width`×`height`.
    /// Returns true if a new image was rendered.
    pub fn refresh(&mut self, width: u32, height: u32) -> bool {
        let same_size = self
            .image
            .as_ref()
            .is_some_and(|img| img.width() == width && img.height() == height);
        if same_size && !self.dirty {
            return false;
        }

        match self.strategy.render(width, height, &self.style) {
            Some(image) => {
                tracing::debug!(
                    width,
                    height,
                    mode = ?self.strategy.mode(),
                    "Rendered background"
                );
                self.image = Some(image);
                self.dirty = false;
                self.renders += 1;
                true
            }
            None => {
                tracing::warn!(width, height, "Cannot render background for empty size");
                false
            }
        }
    }

    pub fn image(&self) -> Option<&BackgroundImage> {
        self.image.as_ref()
    }

    /// Number of times the background has been rendered
    pub fn render_count(&self) -> usize {
        self.renders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(radius: f32) -> BackgroundStyle {
        BackgroundStyle {
            color: [0, 0, 0],
            opacity: 0.9,
            corner_radius: radius,
        }
    }

    fn corners(w: u32, h: u32) -> [(u32, u32); 4] {
        [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)]
    }

    #[test]
    fn native_alpha_corners_transparent_body_at_opacity() {
        let image = NativeAlpha.render(210, 175, &style(10.0)).unwrap();
        for (x, y) in corners(210, 175) {
            assert!(image.is_transparent_at(x, y), "corner ({x}, {y})");
        }
        let body = image.pixel(105, 87).unwrap();
        assert!((229..=230).contains(&body[3]), "alpha {}", body[3]);
        assert!(!image.is_transparent_at(105, 87));
        assert_eq!(image.color_key, None);
        assert_eq!(image.window_opacity, 1.0);
    }

    #[test]
    fn chroma_key_corners_keyed_body_opaque() {
        let strategy = ChromaKey::default();
        let image = strategy.render(210, 175, &style(10.0)).unwrap();
        for (x, y) in corners(210, 175) {
            assert_eq!(image.pixel(x, y), Some([255, 0, 255, 255]));
            assert!(image.is_transparent_at(x, y));
        }
        assert_eq!(image.pixel(105, 87), Some([0, 0, 0, 255]));
        assert_eq!(image.color_key, Some(DEFAULT_COLOR_KEY));
        assert!((image.window_opacity - 0.9).abs() < 1e-6);
    }

    #[test]
    fn chroma_key_has_no_blended_edges() {
        let strategy = ChromaKey::default();
        let image = strategy.render(60, 40, &style(12.0)).unwrap();
        for px in image.data().chunks_exact(4) {
            let rgb = [px[0], px[1], px[2]];
            assert!(rgb == DEFAULT_COLOR_KEY || rgb == [0, 0, 0], "fringe {rgb:?}");
        }
    }

    #[test]
    fn background_equal_to_key_is_nudged() {
        let strategy = ChromaKey::default();
        let mut s = style(0.0);
        s.color = DEFAULT_COLOR_KEY;
        let image = strategy.render(10, 10, &s).unwrap();
        assert_eq!(image.pixel(5, 5), Some([254, 0, 255, 255]));
        assert!(!image.is_transparent_at(5, 5));
    }

    #[test]
    fn content_policy_follows_strategy() {
        let keyed = ChromaKey::default().content_policy();
        assert!(!keyed.anti_alias);
        assert_eq!(keyed.color(DEFAULT_COLOR_KEY), [254, 0, 255]);
        assert_eq!(keyed.color([10, 20, 30]), [10, 20, 30]);

        let native = NativeAlpha.content_policy();
        assert_eq!(native, ContentPolicy::default());
        assert_eq!(native.color(DEFAULT_COLOR_KEY), DEFAULT_COLOR_KEY);
    }

    #[test]
    fn zero_radius_fills_whole_window() {
        let image = NativeAlpha.render(20, 20, &style(0.0)).unwrap();
        for (x, y) in corners(20, 20) {
            assert!(!image.is_transparent_at(x, y));
        }
    }

    #[test]
    fn compositor_renders_only_on_size_change() {
        let mut compositor = BackgroundCompositor::new(Box::new(NativeAlpha), style(10.0));
        assert!(compositor.refresh(210, 175));
        assert!(!compositor.refresh(210, 175));
        assert_eq!(compositor.render_count(), 1);

        assert!(compositor.refresh(300, 250));
        assert_eq!(compositor.render_count(), 2);
        assert_eq!(compositor.image().map(|i| i.width()), Some(300));
    }

    #[test]
    fn compositor_rerenders_after_invalidate_or_style_change() {
        let mut compositor = BackgroundCompositor::new(Box::new(NativeAlpha), style(10.0));
        compositor.refresh(100, 100);

        compositor.invalidate();
        assert!(compositor.refresh(100, 100));

        compositor.set_style(style(10.0));
        assert!(!compositor.refresh(100, 100));

        compositor.set_style(style(4.0));
        assert!(compositor.refresh(100, 100));
        assert_eq!(compositor.render_count(), 3);
    }

    #[test]
    fn compositor_skips_empty_size() {
        let mut compositor = BackgroundCompositor::new(Box::new(NativeAlpha), style(10.0));
        assert!(!compositor.refresh(0, 100));
        assert!(compositor.image().is_none());
    }

    #[test]
    fn strategy_selection() {
        use TransparencyMode as Mode;
        assert_eq!(select_strategy(Mode::Auto, true).mode(), Mode::NativeAlpha);
        assert_eq!(select_strategy(Mode::Auto, false).mode(), Mode::ChromaKey);
        assert_eq!(select_strategy(Mode::NativeAlpha, false).mode(), Mode::ChromaKey);
        assert_eq!(select_strategy(Mode::ChromaKey, true).mode(), Mode::ChromaKey);
    }
}
