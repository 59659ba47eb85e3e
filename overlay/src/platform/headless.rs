//! Offscreen overlay backend
//!
//! Keeps the pixel buffer in memory and takes pointer input from a queue.
//! Used on hosts without a supported window system and to drive the engine
//! end to end in tests.

use std::collections::VecDeque;

use sysoverlay_types::Rgb;

use super::{OverlayConfig, OverlayPlatform, PlatformError, PointerEvent};

pub struct HeadlessOverlay {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    pixel_data: Vec<u8>,
    /// Copy of the buffer at the last commit
    presented: Vec<u8>,
    per_pixel_alpha: bool,
    color_key: Option<Rgb>,
    window_opacity: f32,
    events: VecDeque<PointerEvent>,
    commits: usize,
    running: bool,
}

impl HeadlessOverlay {
    /// Create a backend that reports no per-pixel alpha, forcing the
    /// chroma-key path
    pub fn without_per_pixel_alpha(config: OverlayConfig) -> Self {
        Self {
            per_pixel_alpha: false,
            ..Self::create(config)
        }
    }

    fn create(config: OverlayConfig) -> Self {
        Self {
            x: config.x,
            y: config.y,
            width: config.width,
            height: config.height,
            pixel_data: vec![0u8; (config.width * config.height * 4) as usize],
            presented: Vec::new(),
            per_pixel_alpha: true,
            color_key: None,
            window_opacity: 1.0,
            events: VecDeque::new(),
            commits: 0,
            running: true,
        }
    }

    /// Queue a pointer event for the next poll
    pub fn push_event(&mut self, event: PointerEvent) {
        self.events.push_back(event);
    }

    /// Simulate the host closing the window
    pub fn close(&mut self) {
        self.running = false;
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn presented(&self) -> &[u8] {
        &self.presented
    }

    /// RGBA of a presented pixel
    pub fn presented_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        self.presented
            .get(idx..idx + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    pub fn color_key(&self) -> Option<Rgb> {
        self.color_key
    }

    pub fn window_opacity(&self) -> f32 {
        self.window_opacity
    }
}

impl OverlayPlatform for HeadlessOverlay {
    fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
        if config.width == 0 || config.height == 0 {
            return Err(PlatformError::BufferError(format!(
                "invalid size {}x{}",
                config.width, config.height
            )));
        }
        tracing::debug!(namespace = %config.namespace, "Creating headless overlay");
        Ok(Self::create(config))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn x(&self) -> i32 {
        self.x
    }

    fn y(&self) -> i32 {
        self.y
    }

    fn set_bounds(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.x = x;
        self.y = y;
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.pixel_data = vec![0u8; (width * height * 4) as usize];
        }
    }

    fn supports_per_pixel_alpha(&self) -> bool {
        self.per_pixel_alpha
    }

    fn set_color_key(&mut self, key: Option<Rgb>) {
        self.color_key = key;
    }

    fn set_window_opacity(&mut self, opacity: f32) {
        self.window_opacity = opacity.clamp(0.0, 1.0);
    }

    fn pixel_buffer(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.pixel_data)
    }

    fn commit(&mut self) {
        self.presented.clear();
        self.presented.extend_from_slice(&self.pixel_data);
        self.commits += 1;
    }

    fn poll_events(&mut self, events: &mut Vec<PointerEvent>) -> bool {
        events.extend(self.events.drain(..));
        self.running
    }
}
