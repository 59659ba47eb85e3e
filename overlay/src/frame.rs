//! Overlay frame abstraction
//!
//! `OverlayFrame` owns everything around the overlay content:
//! - the platform window and its renderer
//! - window geometry under drag and corner resize
//! - the cached rounded background and the host transparency settings
//!
//! Content code only paints between `begin_frame()` and `end_frame()`.

use sysoverlay_types::{OverlaySettings, TransparencyMode, WindowSettings};
use tiny_skia::{Color, PixmapMut};

use crate::compositor::{BackgroundCompositor, BackgroundStyle, ContentPolicy, select_strategy};
use crate::geometry::{GeometryController, GeometryLimits, GeometryUpdate, WindowBounds};
use crate::manager::OverlayWindow;
use crate::platform::{NativeOverlay, OverlayConfig, OverlayPlatform, PlatformError, PointerEvent};
use crate::renderer::Renderer;

/// What happened during one input poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// False once the host closed the window
    pub running: bool,
    pub moved: bool,
    pub resized: bool,
    pub close_requested: bool,
}

impl FrameInput {
    pub fn geometry_changed(&self) -> bool {
        self.moved || self.resized
    }
}

pub struct OverlayFrame<P: OverlayPlatform = NativeOverlay> {
    window: OverlayWindow<P>,
    geometry: GeometryController,
    compositor: BackgroundCompositor,
    transparency: TransparencyMode,
    /// Window section of the last applied settings
    applied_window: WindowSettings,
    events: Vec<PointerEvent>,
}

impl OverlayFrame<NativeOverlay> {
    /// Open a native window placed as the settings describe
    pub fn new(settings: &OverlaySettings) -> Result<Self, PlatformError> {
        let window = OverlayWindow::new(config_from_settings(&settings.window))?;
        Ok(Self::from_window(window, settings))
    }
}

/// Platform window configuration for the settings' placement
pub fn config_from_settings(window: &WindowSettings) -> OverlayConfig {
    OverlayConfig {
        x: window.x,
        y: window.y,
        width: window.width.max(window.min_width).max(1),
        height: window.height.max(window.min_height).max(1),
        ..Default::default()
    }
}

impl<P: OverlayPlatform> OverlayFrame<P> {
    pub fn from_window(mut window: OverlayWindow<P>, settings: &OverlaySettings) -> Self {
        let geometry = GeometryController::new(
            WindowBounds::new(window.x(), window.y(), window.width(), window.height()),
            GeometryLimits::from_settings(&settings.window),
        );
        let bounds = geometry.bounds();
        if bounds.size() != (window.width(), window.height()) {
            window.set_bounds(bounds.x, bounds.y, bounds.width, bounds.height);
        }

        let strategy = select_strategy(settings.transparency, window.supports_per_pixel_alpha());
        tracing::info!(mode = ?strategy.mode(), "Background transparency selected");
        let compositor = BackgroundCompositor::new(strategy, BackgroundStyle::from_settings(settings));

        let mut frame = Self {
            window,
            geometry,
            compositor,
            transparency: settings.transparency,
            applied_window: settings.window,
            events: Vec::new(),
        };
        frame.sync_host_transparency();
        frame
    }

    /// Pass the strategy's color key and window opacity to the host
    fn sync_host_transparency(&mut self) {
        let strategy = self.compositor.strategy();
        let key = strategy.color_key();
        let opacity = strategy.window_opacity(self.compositor.style());
        self.window.set_color_key(key);
        self.window.set_window_opacity(opacity);
    }

    /// Re-derive geometry limits, placement and background from settings
    pub fn apply_settings(&mut self, settings: &OverlaySettings) {
        self.geometry
            .set_limits(GeometryLimits::from_settings(&settings.window));

        let placement = &settings.window;
        let previous = &self.applied_window;
        if (placement.x, placement.y, placement.width, placement.height)
            != (previous.x, previous.y, previous.width, previous.height)
        {
            self.geometry.set_bounds(WindowBounds::new(
                placement.x,
                placement.y,
                placement.width,
                placement.height,
            ));
        }
        self.applied_window = settings.window;
        self.sync_window_bounds();

        if settings.transparency != self.transparency {
            self.transparency = settings.transparency;
            self.compositor.set_strategy(select_strategy(
                settings.transparency,
                self.window.supports_per_pixel_alpha(),
            ));
        }
        self.compositor
            .set_style(BackgroundStyle::from_settings(settings));
        self.compositor.invalidate();
        self.sync_host_transparency();
    }

    fn sync_window_bounds(&mut self) {
        let b = self.geometry.bounds();
        if (b.x, b.y, b.width, b.height)
            != (
                self.window.x(),
                self.window.y(),
                self.window.width(),
                self.window.height(),
            )
        {
            self.window.set_bounds(b.x, b.y, b.width, b.height);
        }
    }

    /// Drain pointer input through the geometry controller and apply the
    /// resulting bounds to the window
    pub fn poll_input(&mut self) -> FrameInput {
        let mut input = FrameInput {
            running: self.window.poll_events(&mut self.events),
            ..Default::default()
        };

        for event in self.events.drain(..) {
            match self.geometry.handle_event(event) {
                GeometryUpdate::Unchanged => {}
                GeometryUpdate::Moved => input.moved = true,
                GeometryUpdate::Resized => input.resized = true,
                GeometryUpdate::CloseRequested => input.close_requested = true,
            }
        }

        if input.geometry_changed() {
            self.sync_window_bounds();
        }
        input
    }

    /// Start a frame: refresh the background for the current size, copy it
    /// into the window buffer and hand out a canvas for the content
    pub fn begin_frame(&mut self) -> Option<(PixmapMut<'_>, &mut Renderer)> {
        let (width, height) = (self.window.width(), self.window.height());
        self.compositor.refresh(width, height);

        let (mut pixmap, renderer) = self.window.canvas()?;
        match self.compositor.image() {
            Some(image) if image.data().len() == pixmap.data_mut().len() => {
                pixmap.data_mut().copy_from_slice(image.data());
            }
            _ => pixmap.fill(Color::TRANSPARENT),
        }
        Some((pixmap, renderer))
    }

    /// How content must be painted over the current background
    pub fn content_policy(&self) -> ContentPolicy {
        self.compositor.content_policy()
    }

    /// Present the frame
    pub fn end_frame(&mut self) {
        self.window.commit();
    }

    pub fn bounds(&self) -> WindowBounds {
        self.geometry.bounds()
    }

    pub fn geometry(&self) -> &GeometryController {
        &self.geometry
    }

    pub fn compositor(&self) -> &BackgroundCompositor {
        &self.compositor
    }

    pub fn width(&self) -> u32 {
        self.window.width()
    }

    pub fn height(&self) -> u32 {
        self.window.height()
    }

    pub fn window(&self) -> &OverlayWindow<P> {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut OverlayWindow<P> {
        &mut self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::DEFAULT_COLOR_KEY;
    use crate::platform::PointerButton;
    use crate::platform::headless::HeadlessOverlay;

    fn headless_frame(settings: &OverlaySettings, alpha: bool) -> OverlayFrame<HeadlessOverlay> {
        let config = config_from_settings(&settings.window);
        let platform = if alpha {
            HeadlessOverlay::new(config).unwrap()
        } else {
            HeadlessOverlay::without_per_pixel_alpha(config)
        };
        OverlayFrame::from_window(OverlayWindow::from_platform(platform), settings)
    }

    fn push(frame: &mut OverlayFrame<HeadlessOverlay>, event: PointerEvent) {
        frame.window_mut().platform_mut().push_event(event);
    }

    #[test]
    fn native_alpha_host_gets_no_key() {
        let frame = headless_frame(&OverlaySettings::default(), true);
        let platform = frame.window().platform();
        assert_eq!(platform.color_key(), None);
        assert_eq!(platform.window_opacity(), 1.0);
        assert_eq!(
            frame.compositor().strategy().mode(),
            TransparencyMode::NativeAlpha
        );
    }

    #[test]
    fn host_without_alpha_falls_back_to_chroma_key() {
        let frame = headless_frame(&OverlaySettings::default(), false);
        let platform = frame.window().platform();
        assert_eq!(platform.color_key(), Some(DEFAULT_COLOR_KEY));
        assert!((platform.window_opacity() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn frame_presents_rounded_background() {
        let mut frame = headless_frame(&OverlaySettings::default(), true);
        assert!(frame.begin_frame().is_some());
        frame.end_frame();

        let platform = frame.window().platform();
        assert_eq!(platform.commit_count(), 1);
        assert_eq!(platform.presented_pixel(0, 0).map(|p| p[3]), Some(0));
        assert!(platform.presented_pixel(105, 87).is_some_and(|p| p[3] > 200));
    }

    #[test]
    fn drag_moves_window() {
        let mut frame = headless_frame(&OverlaySettings::default(), true);
        push(
            &mut frame,
            PointerEvent::Pressed {
                button: PointerButton::Primary,
                local: (100, 80),
                screen: (200, 180),
            },
        );
        push(
            &mut frame,
            PointerEvent::Moved {
                local: (130, 70),
                screen: (230, 170),
            },
        );

        let input = frame.poll_input();
        assert!(input.running && input.moved && !input.resized);
        let platform = frame.window().platform();
        assert_eq!((platform.x(), platform.y()), (130, 90));
        assert_eq!((platform.width(), platform.height()), (210, 175));
    }

    #[test]
    fn corner_resize_rerenders_background() {
        let mut frame = headless_frame(&OverlaySettings::default(), true);
        frame.begin_frame();
        frame.end_frame();

        push(
            &mut frame,
            PointerEvent::Pressed {
                button: PointerButton::Primary,
                local: (205, 170),
                screen: (305, 270),
            },
        );
        push(
            &mut frame,
            PointerEvent::Moved {
                local: (245, 180),
                screen: (345, 280),
            },
        );
        let input = frame.poll_input();
        assert!(input.resized);
        assert_eq!((frame.width(), frame.height()), (250, 208));

        frame.begin_frame();
        frame.end_frame();
        assert_eq!(frame.compositor().render_count(), 2);
        assert_eq!(frame.compositor().image().map(|i| i.width()), Some(250));
    }

    #[test]
    fn secondary_press_requests_close() {
        let mut frame = headless_frame(&OverlaySettings::default(), true);
        push(
            &mut frame,
            PointerEvent::Pressed {
                button: PointerButton::Secondary,
                local: (50, 50),
                screen: (150, 150),
            },
        );
        assert!(frame.poll_input().close_requested);
    }

    #[test]
    fn settings_change_moves_window_and_switches_strategy() {
        let mut settings = OverlaySettings::default();
        let mut frame = headless_frame(&settings, true);

        settings.window.x = 400;
        settings.window.width = 300;
        settings.window.height = 250;
        settings.transparency = TransparencyMode::ChromaKey;
        settings.background_opacity = 0.5;
        frame.apply_settings(&settings);

        let platform = frame.window().platform();
        assert_eq!((platform.x(), platform.width(), platform.height()), (400, 300, 250));
        assert_eq!(platform.color_key(), Some(DEFAULT_COLOR_KEY));
        assert!((platform.window_opacity() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn settings_without_placement_change_keep_dragged_position() {
        let settings = OverlaySettings::default();
        let mut frame = headless_frame(&settings, true);
        push(
            &mut frame,
            PointerEvent::Pressed {
                button: PointerButton::Primary,
                local: (100, 80),
                screen: (200, 180),
            },
        );
        push(
            &mut frame,
            PointerEvent::Moved {
                local: (100, 80),
                screen: (250, 180),
            },
        );
        frame.poll_input();

        frame.apply_settings(&settings);
        assert_eq!(frame.bounds().x, 150);
        assert_eq!(frame.window().platform().x(), 150);
    }
}
