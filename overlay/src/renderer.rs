//! Software renderer using tiny-skia and cosmic-text
//!
//! All drawing targets a borrowed [`PixmapMut`] over the window's RGBA buffer,
//! so the same renderer paints into platform buffers and offscreen pixmaps.
#![allow(clippy::too_many_arguments)]
use std::collections::HashMap;

use cosmic_text::{
    Attrs, Buffer, Color as CosmicColor, Family, FontSystem, LayoutGlyph, Metrics, Shaping,
    SwashCache,
};
use tiny_skia::{Color, FillRule, Paint, Path, PathBuilder, PixmapMut, Transform};

/// Maximum entries in the text shaping cache (LRU eviction when exceeded)
const TEXT_CACHE_MAX_ENTRIES: usize = 256;

/// Cached result of text shaping
struct CachedText {
    glyphs: Vec<LayoutGlyph>,
    width: f32,
    height: f32,
    /// LRU tracking: incremented on each access
    last_used: u64,
}

/// Key for text cache: (text content, font size rounded to tenths)
type TextCacheKey = (String, u32);

/// A software renderer for overlay content
pub struct Renderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    /// Shaped labels; metric labels change every tick but repeat often
    text_cache: HashMap<TextCacheKey, CachedText>,
    cache_access_counter: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            text_cache: HashMap::with_capacity(64),
            cache_access_counter: 0,
        }
    }

    /// Evict least recently used entries if cache is too large
    fn evict_lru_if_needed(&mut self) {
        if self.text_cache.len() <= TEXT_CACHE_MAX_ENTRIES {
            return;
        }

        let target_size = TEXT_CACHE_MAX_ENTRIES * 3 / 4;
        let mut entries: Vec<_> = self
            .text_cache
            .iter()
            .map(|(k, v)| (k.clone(), v.last_used))
            .collect();
        entries.sort_by_key(|(_, last_used)| *last_used);

        for (key, _) in entries
            .into_iter()
            .take(self.text_cache.len() - target_size)
        {
            self.text_cache.remove(&key);
        }
    }

    fn find_cached(&mut self, text: &str, font_size_key: u32) -> Option<&mut CachedText> {
        self.text_cache
            .iter_mut()
            .find(|(k, _)| k.0 == text && k.1 == font_size_key)
            .map(|(_, v)| v)
    }

    /// Ensure text is cached, shaping if needed. Returns (width, height).
    fn ensure_cached(&mut self, text: &str, font_size: f32) -> (f32, f32) {
        let font_size_key = (font_size * 10.0).round() as u32;

        self.cache_access_counter += 1;
        let current_access = self.cache_access_counter;

        if let Some(cached) = self.find_cached(text, font_size_key) {
            cached.last_used = current_access;
            return (cached.width, cached.height);
        }

        let metrics = Metrics::new(font_size, font_size * 1.2);
        let mut text_buffer = Buffer::new(&mut self.font_system, metrics);

        let attrs = Attrs::new().family(Family::SansSerif);
        text_buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        text_buffer.shape_until_scroll(&mut self.font_system, false);

        let mut glyphs = Vec::new();
        let mut width = 0.0f32;
        let mut height = 0.0f32;

        for run in text_buffer.layout_runs() {
            width = width.max(run.line_w);
            height += run.line_height;
            glyphs.extend(run.glyphs.iter().cloned());
        }

        self.text_cache.insert(
            (text.to_string(), font_size_key),
            CachedText {
                glyphs,
                width,
                height,
                last_used: current_access,
            },
        );
        self.evict_lru_if_needed();

        (width, height)
    }

    fn get_cached_glyphs(&mut self, text: &str, font_size: f32) -> Vec<LayoutGlyph> {
        let font_size_key = (font_size * 10.0).round() as u32;
        self.find_cached(text, font_size_key)
            .map(|c| c.glyphs.clone())
            .unwrap_or_default()
    }

    /// Fill a rounded rectangle. Anti-aliasing is turned off for chroma-key
    /// output, where blended edge pixels would show as fringes.
    pub fn fill_rounded_rect(
        &self,
        pixmap: &mut PixmapMut,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        radius: f32,
        color: Color,
        anti_alias: bool,
    ) {
        let Some(path) = rounded_rect_path(x, y, w, h, radius) else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = anti_alias;

        pixmap.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    /// Draw text with its baseline at `y` (uses shaping cache)
    pub fn draw_text(
        &mut self,
        pixmap: &mut PixmapMut,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
    ) {
        let _ = self.ensure_cached(text, font_size);
        let glyphs = self.get_cached_glyphs(text, font_size);

        let text_color = CosmicColor::rgba(
            (color.red() * 255.0) as u8,
            (color.green() * 255.0) as u8,
            (color.blue() * 255.0) as u8,
            (color.alpha() * 255.0) as u8,
        );

        for glyph in &glyphs {
            let physical_glyph = glyph.physical((x, y), 1.0);

            if let Some(image) = self
                .swash_cache
                .get_image(&mut self.font_system, physical_glyph.cache_key)
            {
                let glyph_x = physical_glyph.x + image.placement.left;
                let glyph_y = physical_glyph.y - image.placement.top;

                draw_glyph_to_pixmap(
                    pixmap,
                    &image.data,
                    image.placement.width,
                    image.placement.height,
                    glyph_x,
                    glyph_y,
                    text_color,
                );
            }
        }
    }

    /// Measure text dimensions (uses shaping cache, no glyph clone)
    pub fn measure_text(&mut self, text: &str, font_size: f32) -> (f32, f32) {
        self.ensure_cached(text, font_size)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a rounded rectangle path. The radius is limited to half the
/// shorter side; a radius of zero gives a plain rectangle.
pub(crate) fn rounded_rect_path(x: f32, y: f32, w: f32, h: f32, r: f32) -> Option<Path> {
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let r = r.max(0.0).min(w / 2.0).min(h / 2.0);

    let mut pb = PathBuilder::new();

    pb.move_to(x + r, y);

    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);

    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);

    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);

    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);

    pb.close();
    pb.finish()
}

/// Draw a glyph coverage mask onto a pixmap with alpha blending
fn draw_glyph_to_pixmap(
    pixmap: &mut PixmapMut,
    glyph_data: &[u8],
    glyph_width: u32,
    glyph_height: u32,
    dest_x: i32,
    dest_y: i32,
    color: CosmicColor,
) {
    let pixmap_width = pixmap.width() as i32;
    let pixmap_height = pixmap.height() as i32;
    let data = pixmap.data_mut();

    for gy in 0..glyph_height as i32 {
        let py = dest_y + gy;
        if py < 0 || py >= pixmap_height {
            continue;
        }

        for gx in 0..glyph_width as i32 {
            let px = dest_x + gx;
            if px < 0 || px >= pixmap_width {
                continue;
            }

            let glyph_idx = (gy as u32 * glyph_width + gx as u32) as usize;
            let Some(&alpha) = glyph_data.get(glyph_idx) else {
                continue;
            };
            if alpha == 0 {
                continue;
            }

            let pixel_idx = ((py as u32 * pixmap_width as u32 + px as u32) * 4) as usize;
            if pixel_idx + 3 >= data.len() {
                continue;
            }

            let src_a = (alpha as u32 * color.a() as u32) / 255;
            let inv_a = 255 - src_a;

            data[pixel_idx] =
                ((color.r() as u32 * src_a + data[pixel_idx] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 1] =
                ((color.g() as u32 * src_a + data[pixel_idx + 1] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 2] =
                ((color.b() as u32 * src_a + data[pixel_idx + 2] as u32 * inv_a) / 255) as u8;
            data[pixel_idx + 3] = (src_a + (data[pixel_idx + 3] as u32 * inv_a) / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Pixmap;

    #[test]
    fn rounded_rect_path_rejects_empty_size() {
        assert!(rounded_rect_path(0.0, 0.0, 0.0, 10.0, 2.0).is_none());
        assert!(rounded_rect_path(0.0, 0.0, 10.0, 0.0, 2.0).is_none());
        assert!(rounded_rect_path(0.0, 0.0, 10.0, 10.0, 2.0).is_some());
    }

    #[test]
    fn rounded_rect_radius_zero_fills_corners() {
        let corner_alpha = |radius: f32| {
            let mut pixmap = Pixmap::new(20, 20).unwrap();
            let path = rounded_rect_path(0.0, 0.0, 20.0, 20.0, radius).unwrap();
            let mut paint = Paint::default();
            paint.set_color_rgba8(255, 255, 255, 255);
            paint.anti_alias = false;
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            pixmap.pixel(0, 0).unwrap().alpha()
        };
        assert_eq!(corner_alpha(0.0), 255);
        assert_eq!(corner_alpha(8.0), 0);
    }

    #[test]
    fn glyph_blend_respects_bounds_and_coverage() {
        let mut pixmap = Pixmap::new(4, 4).unwrap();
        let mask = [255u8, 0, 0, 255];
        {
            let mut view = pixmap.as_mut();
            // Placed partially outside; only in-bounds pixels are touched
            draw_glyph_to_pixmap(&mut view, &mask, 2, 2, 3, 3, CosmicColor::rgba(255, 0, 0, 255));
        }
        let px = pixmap.pixel(3, 3).unwrap();
        assert_eq!((px.red(), px.alpha()), (255, 255));
        assert_eq!(pixmap.pixel(2, 2).unwrap().alpha(), 0);
    }
}
