//! Platform abstraction for overlay windows
//!
//! This module defines the trait that all platform backends must implement,
//! allowing the overlay rendering code to be platform-agnostic. Backends only
//! report raw pointer events and display pixels; all move/resize decisions are
//! made by [`GeometryController`](crate::geometry::GeometryController).

use sysoverlay_types::Rgb;

pub mod headless;

#[cfg(all(unix, not(target_os = "macos")))]
pub mod x11;

#[cfg(target_os = "windows")]
pub mod windows;

/// Configuration for creating an overlay window
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Initial X position (from left edge of screen)
    pub x: i32,
    /// Initial Y position (from top edge of screen)
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Window title / class name used by window rules
    pub namespace: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 210,
            height: 175,
            namespace: "sysoverlay".to_string(),
        }
    }
}

/// Errors that can occur in platform operations
#[derive(Debug)]
pub enum PlatformError {
    /// Failed to connect to display server
    ConnectionFailed(String),
    /// Required protocol/feature not available
    UnsupportedFeature(String),
    /// Buffer/memory allocation failed
    BufferError(String),
    /// Generic platform error
    Other(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::ConnectionFailed(s) => write!(f, "Connection failed: {}", s),
            PlatformError::UnsupportedFeature(s) => write!(f, "Unsupported feature: {}", s),
            PlatformError::BufferError(s) => write!(f, "Buffer error: {}", s),
            PlatformError::Other(s) => write!(f, "Platform error: {}", s),
        }
    }
}

impl std::error::Error for PlatformError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Pointer input in both window-local and screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Pressed {
        button: PointerButton,
        local: (i32, i32),
        screen: (i32, i32),
    },
    Released {
        button: PointerButton,
        local: (i32, i32),
        screen: (i32, i32),
    },
    Moved {
        local: (i32, i32),
        screen: (i32, i32),
    },
}

/// Trait that all platform backends must implement
pub trait OverlayPlatform: Sized {
    /// Create a borderless, always-on-top overlay window
    fn new(config: OverlayConfig) -> Result<Self, PlatformError>;

    /// Get the current width of the overlay
    fn width(&self) -> u32;

    /// Get the current height of the overlay
    fn height(&self) -> u32;

    /// Get the current X position
    fn x(&self) -> i32;

    /// Get the current Y position
    fn y(&self) -> i32;

    /// Move and resize in one request. The pixel buffer is reallocated when
    /// the size changes.
    fn set_bounds(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Whether the host composites per-pixel alpha
    fn supports_per_pixel_alpha(&self) -> bool;

    /// Color the host should treat as fully transparent, or `None` to use the
    /// buffer's alpha channel
    fn set_color_key(&mut self, key: Option<Rgb>);

    /// Uniform opacity applied to the whole window (0.0 to 1.0)
    fn set_window_opacity(&mut self, opacity: f32);

    /// Get mutable access to the premultiplied RGBA pixel buffer
    fn pixel_buffer(&mut self) -> Option<&mut [u8]>;

    /// Present the pixel buffer
    fn commit(&mut self);

    /// Drain pending pointer events into `events` (non-blocking).
    /// Returns false once the window has been closed by the host.
    fn poll_events(&mut self, events: &mut Vec<PointerEvent>) -> bool;
}

#[cfg(all(unix, not(target_os = "macos")))]
pub use x11::X11Overlay as NativeOverlay;

#[cfg(target_os = "windows")]
pub use windows::WindowsOverlay as NativeOverlay;

#[cfg(not(any(all(unix, not(target_os = "macos")), target_os = "windows")))]
pub use headless::HeadlessOverlay as NativeOverlay;
