//! A platform window paired with its software renderer

use tiny_skia::PixmapMut;

use crate::platform::{NativeOverlay, OverlayConfig, OverlayPlatform, PlatformError, PointerEvent};
use crate::renderer::Renderer;
use sysoverlay_types::Rgb;

/// A managed overlay window with its own renderer
pub struct OverlayWindow<P: OverlayPlatform = NativeOverlay> {
    platform: P,
    renderer: Renderer,
}

impl OverlayWindow<NativeOverlay> {
    /// Create a window on the native backend
    pub fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
        Ok(Self::from_platform(NativeOverlay::new(config)?))
    }
}

impl<P: OverlayPlatform> OverlayWindow<P> {
    pub fn from_platform(platform: P) -> Self {
        Self {
            platform,
            renderer: Renderer::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.platform.width()
    }

    pub fn height(&self) -> u32 {
        self.platform.height()
    }

    pub fn x(&self) -> i32 {
        self.platform.x()
    }

    pub fn y(&self) -> i32 {
        self.platform.y()
    }

    pub fn set_bounds(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.platform.set_bounds(x, y, width, height);
    }

    pub fn supports_per_pixel_alpha(&self) -> bool {
        self.platform.supports_per_pixel_alpha()
    }

    pub fn set_color_key(&mut self, key: Option<Rgb>) {
        self.platform.set_color_key(key);
    }

    pub fn set_window_opacity(&mut self, opacity: f32) {
        self.platform.set_window_opacity(opacity);
    }

    /// Borrow the pixel buffer as a pixmap together with the renderer
    pub fn canvas(&mut self) -> Option<(PixmapMut<'_>, &mut Renderer)> {
        let width = self.platform.width();
        let height = self.platform.height();
        let buffer = self.platform.pixel_buffer()?;
        let pixmap = PixmapMut::from_bytes(buffer, width, height)?;
        Some((pixmap, &mut self.renderer))
    }

    /// Commit the pixel buffer to the screen
    pub fn commit(&mut self) {
        self.platform.commit();
    }

    /// Drain pointer input; false once the host closed the window
    pub fn poll_events(&mut self, events: &mut Vec<PointerEvent>) -> bool {
        self.platform.poll_events(events)
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}
