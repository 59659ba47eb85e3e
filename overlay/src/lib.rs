//! Sysoverlay Overlay Library
//!
//! Adaptive layout and interaction engine for a desktop system-metrics overlay.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                       app                           │
//! │     OverlayApp: ticker, input, settings, shutdown   │
//! ├─────────────────────────────────────────────────────┤
//! │              overlays/ + scene + widgets/           │
//! │   OverlayRenderer, retained BarSpec rows, ProgressBar│
//! ├─────────────────────────────────────────────────────┤
//! │          layout            │        geometry        │
//! │  LayoutScaler (font, bars) │  drag / corner resize  │
//! ├─────────────────────────────────────────────────────┤
//! │                 frame + compositor                  │
//! │  OverlayFrame, rounded background, transparency     │
//! ├─────────────────────────────────────────────────────┤
//! │                manager + renderer                   │
//! │       OverlayWindow, tiny-skia + cosmic-text        │
//! ├─────────────────────────────────────────────────────┤
//! │                    platform/                        │
//! │              x11, windows, headless                 │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod compositor;
pub mod frame;
pub mod geometry;
pub mod layout;
pub mod manager;
pub mod overlays;
pub mod platform;
pub mod renderer;
pub mod scene;
pub mod utils;
pub mod widgets;

// Re-export commonly used types
pub use app::{ExitReason, OverlayApp};
pub use compositor::{
    BackgroundCompositor, BackgroundImage, BackgroundStyle, ChromaKey, NativeAlpha,
    TransparencyStrategy,
};
pub use frame::OverlayFrame;
pub use geometry::{GeometryController, GeometryLimits, WindowBounds};
pub use layout::{LayoutBase, LayoutScaler, ScaledLayout};
pub use manager::OverlayWindow;
pub use overlays::{BarSpec, OverlayRenderer};
pub use platform::{NativeOverlay, OverlayConfig, OverlayPlatform, PlatformError};
pub use renderer::Renderer;
