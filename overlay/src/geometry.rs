//! Pointer-driven window geometry
//!
//! `GeometryController` owns the window bounds and turns pointer events into
//! moves and resizes. Dragging the body moves the window; dragging one of the
//! four corner handles resizes it, optionally holding the aspect ratio from
//! the start of the gesture. The edge opposite the grabbed corner stays put.

use crate::platform::{PointerButton, PointerEvent};
use sysoverlay_types::WindowSettings;

/// Side length of the square resize handle at each window corner
pub const RESIZE_HANDLE_SIZE: i32 = 12;

/// Window position and size in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowBounds {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn is_left(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    pub fn is_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }
}

/// Resize constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryLimits {
    pub min_width: u32,
    pub min_height: u32,
    pub lock_aspect_ratio: bool,
    pub handle_size: i32,
}

impl GeometryLimits {
    pub fn from_settings(window: &WindowSettings) -> Self {
        Self {
            min_width: window.min_width.max(1),
            min_height: window.min_height.max(1),
            lock_aspect_ratio: window.lock_aspect_ratio,
            handle_size: RESIZE_HANDLE_SIZE,
        }
    }
}

impl Default for GeometryLimits {
    fn default() -> Self {
        Self::from_settings(&WindowSettings::default())
    }
}

/// An in-progress body drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    /// Where the pointer grabbed the window, in window coordinates
    pub pointer_anchor_local: (i32, i32),
    /// Screen position at the previous move; deltas are taken from here
    pub last_pointer_screen: (i32, i32),
}

/// An in-progress corner resize. Deltas are cumulative from `pointer_anchor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeSession {
    pub pointer_anchor: (i32, i32),
    pub start_size: (u32, u32),
    pub start_position: (i32, i32),
    pub aspect_ratio: f64,
    pub corner: Corner,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging(DragSession),
    Resizing(ResizeSession),
}

/// Outcome of feeding one pointer event to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryUpdate {
    Unchanged,
    Moved,
    Resized,
    CloseRequested,
}

#[derive(Debug, Clone)]
pub struct GeometryController {
    bounds: WindowBounds,
    limits: GeometryLimits,
    state: GestureState,
}

impl GeometryController {
    pub fn new(bounds: WindowBounds, limits: GeometryLimits) -> Self {
        let mut controller = Self {
            bounds,
            limits,
            state: GestureState::Idle,
        };
        controller.bounds = controller.clamped(bounds);
        controller
    }

    pub fn bounds(&self) -> WindowBounds {
        self.bounds
    }

    pub fn limits(&self) -> GeometryLimits {
        self.limits
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GestureState::Idle)
    }

    /// Replace the bounds from outside a gesture (settings change).
    /// Any gesture in progress is abandoned.
    pub fn set_bounds(&mut self, bounds: WindowBounds) {
        self.state = GestureState::Idle;
        self.bounds = self.clamped(bounds);
    }

    pub fn set_limits(&mut self, limits: GeometryLimits) {
        self.limits = limits;
        self.bounds = self.clamped(self.bounds);
    }

    /// Corner handle under a point in window coordinates, if any
    pub fn handle_at(&self, local: (i32, i32)) -> Option<Corner> {
        let (x, y) = local;
        let size = self.limits.handle_size;
        let width = self.bounds.width as i32;
        let height = self.bounds.height as i32;

        let left = x < size;
        let right = x >= width - size;
        let top = y < size;
        let bottom = y >= height - size;

        match (left, right, top, bottom) {
            (true, _, true, _) => Some(Corner::TopLeft),
            (_, true, true, _) => Some(Corner::TopRight),
            (true, _, _, true) => Some(Corner::BottomLeft),
            (_, true, _, true) => Some(Corner::BottomRight),
            _ => None,
        }
    }

    pub fn handle_event(&mut self, event: PointerEvent) -> GeometryUpdate {
        match event {
            PointerEvent::Pressed {
                button,
                local,
                screen,
            } => self.pointer_down(button, local, screen),
            PointerEvent::Moved { screen, .. } => self.pointer_move(screen),
            PointerEvent::Released { button, .. } => self.pointer_up(button),
        }
    }

    pub fn pointer_down(
        &mut self,
        button: PointerButton,
        local: (i32, i32),
        screen: (i32, i32),
    ) -> GeometryUpdate {
        if button == PointerButton::Secondary {
            self.state = GestureState::Idle;
            return GeometryUpdate::CloseRequested;
        }
        if !self.is_idle() {
            return GeometryUpdate::Unchanged;
        }

        self.state = match self.handle_at(local) {
            Some(corner) => {
                tracing::debug!(?corner, "Resize started");
                GestureState::Resizing(ResizeSession {
                    pointer_anchor: screen,
                    start_size: self.bounds.size(),
                    start_position: (self.bounds.x, self.bounds.y),
                    aspect_ratio: self.bounds.width as f64 / self.bounds.height.max(1) as f64,
                    corner,
                })
            }
            None => GestureState::Dragging(DragSession {
                pointer_anchor_local: local,
                last_pointer_screen: screen,
            }),
        };
        GeometryUpdate::Unchanged
    }

    pub fn pointer_move(&mut self, screen: (i32, i32)) -> GeometryUpdate {
        match &mut self.state {
            GestureState::Idle => GeometryUpdate::Unchanged,
            GestureState::Dragging(drag) => {
                let dx = screen.0 - drag.last_pointer_screen.0;
                let dy = screen.1 - drag.last_pointer_screen.1;
                drag.last_pointer_screen = screen;
                if dx == 0 && dy == 0 {
                    return GeometryUpdate::Unchanged;
                }
                self.bounds.x += dx;
                self.bounds.y += dy;
                GeometryUpdate::Moved
            }
            GestureState::Resizing(session) => {
                let session = *session;
                let next = self.resized(&session, screen);
                if next == self.bounds {
                    return GeometryUpdate::Unchanged;
                }
                self.bounds = next;
                GeometryUpdate::Resized
            }
        }
    }

    pub fn pointer_up(&mut self, button: PointerButton) -> GeometryUpdate {
        if button == PointerButton::Primary && !self.is_idle() {
            tracing::debug!(bounds = ?self.bounds, "Gesture ended");
            self.state = GestureState::Idle;
        }
        GeometryUpdate::Unchanged
    }

    /// Bounds for a resize gesture with the pointer at `screen`
    fn resized(&self, session: &ResizeSession, screen: (i32, i32)) -> WindowBounds {
        let dx = (screen.0 - session.pointer_anchor.0) as f64;
        let dy = (screen.1 - session.pointer_anchor.1) as f64;
        // Dragging a left/top handle outward is a negative delta but a growth
        let grow_x = if session.corner.is_left() { -dx } else { dx };
        let grow_y = if session.corner.is_top() { -dy } else { dy };

        let start_w = session.start_size.0 as f64;
        let start_h = session.start_size.1 as f64;
        let min_w = self.limits.min_width as f64;
        let min_h = self.limits.min_height as f64;

        let (width, height) = if self.limits.lock_aspect_ratio {
            let aspect = session.aspect_ratio;
            if dx.abs() > dy.abs() {
                let width = (start_w + grow_x).max(min_w).max(min_h * aspect);
                (width, width / aspect)
            } else {
                let height = (start_h + grow_y).max(min_h).max(min_w / aspect);
                (height * aspect, height)
            }
        } else {
            ((start_w + grow_x).max(min_w), (start_h + grow_y).max(min_h))
        };

        let width = (width.round() as u32).max(self.limits.min_width);
        let height = (height.round() as u32).max(self.limits.min_height);

        let (start_x, start_y) = session.start_position;
        let x = if session.corner.is_left() {
            start_x + session.start_size.0 as i32 - width as i32
        } else {
            start_x
        };
        let y = if session.corner.is_top() {
            start_y + session.start_size.1 as i32 - height as i32
        } else {
            start_y
        };

        WindowBounds::new(x, y, width, height)
    }

    fn clamped(&self, bounds: WindowBounds) -> WindowBounds {
        WindowBounds {
            width: bounds.width.max(self.limits.min_width),
            height: bounds.height.max(self.limits.min_height),
            ..bounds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> GeometryController {
        GeometryController::new(
            WindowBounds::new(100, 100, 210, 175),
            GeometryLimits::default(),
        )
    }

    fn press(c: &mut GeometryController, local: (i32, i32), screen: (i32, i32)) {
        c.pointer_down(PointerButton::Primary, local, screen);
    }

    /// Press a corner handle at its outermost pixel and return its screen position
    fn grab(c: &mut GeometryController, corner: Corner) -> (i32, i32) {
        let b = c.bounds();
        let local = (
            if corner.is_left() { 0 } else { b.width as i32 - 1 },
            if corner.is_top() { 0 } else { b.height as i32 - 1 },
        );
        let screen = (b.x + local.0, b.y + local.1);
        press(c, local, screen);
        assert!(matches!(c.state(), GestureState::Resizing(s) if s.corner == corner));
        screen
    }

    #[test]
    fn handles_cover_the_four_corners() {
        let c = controller();
        assert_eq!(c.handle_at((0, 0)), Some(Corner::TopLeft));
        assert_eq!(c.handle_at((209, 0)), Some(Corner::TopRight));
        assert_eq!(c.handle_at((0, 174)), Some(Corner::BottomLeft));
        assert_eq!(c.handle_at((209, 174)), Some(Corner::BottomRight));
        assert_eq!(c.handle_at((100, 80)), None);
        assert_eq!(c.handle_at((100, 0)), None);
    }

    #[test]
    fn drag_translates_by_exact_pointer_delta() {
        let mut c = controller();
        press(&mut c, (50, 50), (150, 150));
        assert!(matches!(c.state(), GestureState::Dragging(_)));

        assert_eq!(c.pointer_move((170, 140)), GeometryUpdate::Moved);
        assert_eq!(c.pointer_move((180, 160)), GeometryUpdate::Moved);
        c.pointer_up(PointerButton::Primary);

        assert_eq!(c.bounds(), WindowBounds::new(130, 110, 210, 175));
        assert!(c.is_idle());
    }

    #[test]
    fn drag_without_motion_is_unchanged() {
        let mut c = controller();
        press(&mut c, (50, 50), (150, 150));
        assert_eq!(c.pointer_move((150, 150)), GeometryUpdate::Unchanged);
    }

    #[test]
    fn moves_while_idle_are_ignored() {
        let mut c = controller();
        assert_eq!(c.pointer_move((500, 500)), GeometryUpdate::Unchanged);
        assert_eq!(c.bounds(), WindowBounds::new(100, 100, 210, 175));
    }

    #[test]
    fn bottom_right_width_driven_keeps_aspect_and_origin() {
        let mut c = controller();
        let start = grab(&mut c, Corner::BottomRight);

        assert_eq!(
            c.pointer_move((start.0 + 90, start.1 + 20)),
            GeometryUpdate::Resized
        );
        let b = c.bounds();
        assert_eq!((b.x, b.y), (100, 100));
        assert_eq!(b.width, 300);
        assert_eq!(b.height, 250);
        let aspect = b.width as f64 / b.height as f64;
        assert!((aspect - 210.0 / 175.0).abs() < 0.01);
    }

    #[test]
    fn top_left_keeps_bottom_right_pinned() {
        let mut c = controller();
        let start = grab(&mut c, Corner::TopLeft);

        c.pointer_move((start.0 - 90, start.1 - 10));
        let b = c.bounds();
        assert_eq!((b.width, b.height), (300, 250));
        assert_eq!((b.right(), b.bottom()), (310, 275));
        assert_eq!((b.x, b.y), (10, 25));
    }

    #[test]
    fn top_right_pins_left_and_bottom_edges() {
        let mut c = controller();
        let start = grab(&mut c, Corner::TopRight);

        // Height drives: |dy| > |dx|
        c.pointer_move((start.0 + 5, start.1 - 50));
        let b = c.bounds();
        assert_eq!(b.height, 225);
        assert_eq!(b.width, 270);
        assert_eq!(b.x, 100);
        assert_eq!(b.bottom(), 275);
    }

    #[test]
    fn bottom_left_pins_right_and_top_edges() {
        let mut c = controller();
        let start = grab(&mut c, Corner::BottomLeft);

        c.pointer_move((start.0 - 60, start.1 + 10));
        let b = c.bounds();
        assert_eq!(b.width, 270);
        assert_eq!(b.right(), 310);
        assert_eq!(b.y, 100);
    }

    #[test]
    fn equal_deltas_let_height_drive() {
        let mut c = controller();
        let start = grab(&mut c, Corner::BottomRight);

        c.pointer_move((start.0 + 35, start.1 + 35));
        let b = c.bounds();
        assert_eq!(b.height, 210);
        assert_eq!(b.width, 252);
    }

    #[test]
    fn resize_is_cumulative_from_gesture_start() {
        let mut c = controller();
        let start = grab(&mut c, Corner::BottomRight);

        c.pointer_move((start.0 + 40, start.1));
        c.pointer_move((start.0 + 90, start.1));
        c.pointer_move((start.0 + 90, start.1 + 1));
        assert_eq!(c.bounds().width, 300);
    }

    #[test]
    fn shrinking_stops_at_minimums() {
        let mut c = controller();
        let start = grab(&mut c, Corner::BottomRight);

        c.pointer_move((start.0 - 500, start.1 - 10));
        let b = c.bounds();
        assert!(b.width >= 200);
        assert!(b.height >= 150);
    }

    #[test]
    fn shrinking_from_top_left_still_pins_opposite_edge() {
        let mut c = controller();
        let start = grab(&mut c, Corner::TopLeft);

        c.pointer_move((start.0 + 400, start.1 + 400));
        let b = c.bounds();
        assert!(b.width >= 200 && b.height >= 150);
        assert_eq!((b.right(), b.bottom()), (310, 275));
    }

    #[test]
    fn unlocked_aspect_follows_each_axis() {
        let limits = GeometryLimits {
            lock_aspect_ratio: false,
            ..GeometryLimits::default()
        };
        let mut c = GeometryController::new(WindowBounds::new(0, 0, 210, 175), limits);
        let start = grab(&mut c, Corner::BottomRight);

        c.pointer_move((start.0 + 40, start.1 + 5));
        assert_eq!(c.bounds().size(), (250, 180));
    }

    #[test]
    fn release_ends_resize_session() {
        let mut c = controller();
        let start = grab(&mut c, Corner::BottomRight);
        c.pointer_move((start.0 + 30, start.1));
        c.pointer_up(PointerButton::Primary);
        assert!(c.is_idle());

        let before = c.bounds();
        assert_eq!(c.pointer_move((start.0 + 100, start.1)), GeometryUpdate::Unchanged);
        assert_eq!(c.bounds(), before);
    }

    #[test]
    fn secondary_press_requests_close() {
        let mut c = controller();
        let update = c.handle_event(PointerEvent::Pressed {
            button: PointerButton::Secondary,
            local: (50, 50),
            screen: (150, 150),
        });
        assert_eq!(update, GeometryUpdate::CloseRequested);
        assert!(c.is_idle());
    }

    #[test]
    fn initial_and_external_bounds_are_clamped() {
        let mut c = GeometryController::new(
            WindowBounds::new(0, 0, 50, 50),
            GeometryLimits::default(),
        );
        assert_eq!(c.bounds().size(), (200, 150));

        c.set_bounds(WindowBounds::new(5, 5, 400, 100));
        assert_eq!(c.bounds(), WindowBounds::new(5, 5, 400, 150));
    }
}
