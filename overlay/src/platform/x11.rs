//! X11 platform implementation for overlay windows
//!
//! Uses XCB via x11rb for borderless, always-on-top overlay windows. With a
//! compositing manager running the window gets a 32-bit ARGB visual and
//! per-pixel alpha. Without one it falls back to the root visual, and a color
//! key is emulated with a Shape bounding mask built from the non-key pixels.

use std::fs::File;
use std::os::fd::AsFd;

use rustix::fs::{MemfdFlags, memfd_create};
use rustix::mm::{MapFlags, ProtFlags, mmap};
use sysoverlay_types::Rgb;
use x11rb::atom_manager;
use x11rb::connection::Connection;
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::shm::{self, ConnectionExt as _};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::{OverlayConfig, OverlayPlatform, PlatformError, PointerButton, PointerEvent};

// Atoms needed for EWMH hints
atom_manager! {
    pub AtomCollection: AtomCollectionCookie {
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_STATE,
        _NET_WM_STATE_ABOVE,
        _NET_WM_STATE_SKIP_TASKBAR,
        _NET_WM_STATE_SKIP_PAGER,
        _NET_WM_WINDOW_OPACITY,
        ATOM,
        CARDINAL,
    }
}

/// SHM buffer for efficient pixel transfer
struct ShmBuffer {
    seg_id: shm::Seg,
    ptr: *mut u8,
    size: usize,
}

// SAFETY: We only access shm_data from the main thread
unsafe impl Send for ShmBuffer {}

pub struct X11Overlay {
    conn: RustConnection,
    window: Window,
    gc: Gcontext,
    atoms: AtomCollection,
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    depth: u8,
    per_pixel_alpha: bool,

    // Pixel buffers
    pixel_data: Vec<u8>, // RGBA from renderer
    shm_buffer: ShmBuffer,

    color_key: Option<Rgb>,
    /// Bounding runs last sent to the server, to skip redundant updates
    shape_runs: Vec<PixelRun>,

    running: bool,
}

impl X11Overlay {
    /// Find a 32-bit ARGB visual for transparency
    fn find_argb_visual(screen: &Screen) -> Option<(Visualid, u8)> {
        for depth in &screen.allowed_depths {
            if depth.depth == 32 {
                for visual in &depth.visuals {
                    if visual.class == VisualClass::TRUE_COLOR {
                        return Some((visual.visual_id, depth.depth));
                    }
                }
            }
        }
        None
    }

    /// A compositing manager owns the `_NET_WM_CM_Sn` selection
    fn compositor_running(conn: &RustConnection, screen_num: usize) -> bool {
        let name = format!("_NET_WM_CM_S{}", screen_num);
        let owner = conn
            .intern_atom(false, name.as_bytes())
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| conn.get_selection_owner(reply.atom).ok())
            .and_then(|cookie| cookie.reply().ok())
            .map(|reply| reply.owner);
        matches!(owner, Some(owner) if owner != x11rb::NONE)
    }

    /// Create a shared memory buffer for efficient pixel transfer
    fn create_shm_buffer(
        conn: &RustConnection,
        width: u32,
        height: u32,
    ) -> Result<ShmBuffer, PlatformError> {
        let size = (width * height * 4) as usize;

        // Create anonymous shared memory
        let fd = memfd_create(c"sysoverlay-x11-buffer", MemfdFlags::CLOEXEC)
            .map_err(|e| PlatformError::BufferError(format!("memfd_create failed: {}", e)))?;

        rustix::fs::ftruncate(&fd, size as u64)
            .map_err(|e| PlatformError::BufferError(format!("ftruncate failed: {}", e)))?;

        // Memory map it
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                fd.as_fd(),
                0,
            )
            .map_err(|e| PlatformError::BufferError(format!("mmap failed: {}", e)))?
        };

        let seg_id = conn
            .generate_id()
            .map_err(|e| PlatformError::BufferError(e.to_string()))?;

        // x11rb shm_attach_fd takes ownership of the fd
        let file = File::from(fd);
        conn.shm_attach_fd(seg_id, file, false)
            .map_err(|e| PlatformError::BufferError(format!("shm_attach_fd failed: {}", e)))?;

        Ok(ShmBuffer {
            seg_id,
            ptr: ptr as *mut u8,
            size,
        })
    }

    fn release_shm_buffer(&self) {
        let _ = self.conn.shm_detach(self.shm_buffer.seg_id);
        unsafe {
            rustix::mm::munmap(self.shm_buffer.ptr as *mut _, self.shm_buffer.size).ok();
        }
    }

    /// Recreate SHM buffer after resize
    fn recreate_shm_buffer(&mut self) -> Result<(), PlatformError> {
        self.release_shm_buffer();
        self.shm_buffer = Self::create_shm_buffer(&self.conn, self.width, self.height)?;
        self.pixel_data
            .resize((self.width * self.height * 4) as usize, 0);
        Ok(())
    }

    /// Set EWMH hints for overlay behavior
    fn setup_window_hints(&self) -> Result<(), PlatformError> {
        // Window type: dock (stays on top, no decorations)
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.atoms._NET_WM_WINDOW_TYPE,
                self.atoms.ATOM,
                &[self.atoms._NET_WM_WINDOW_TYPE_DOCK],
            )
            .map_err(|e| PlatformError::Other(e.to_string()))?;

        // Window state: above, skip taskbar/pager
        self.conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.atoms._NET_WM_STATE,
                self.atoms.ATOM,
                &[
                    self.atoms._NET_WM_STATE_ABOVE,
                    self.atoms._NET_WM_STATE_SKIP_TASKBAR,
                    self.atoms._NET_WM_STATE_SKIP_PAGER,
                ],
            )
            .map_err(|e| PlatformError::Other(e.to_string()))?;

        Ok(())
    }

    /// Rebuild the bounding shape from every pixel that isn't the key color
    fn update_bounding_shape(&mut self, key: Rgb) {
        let runs = opaque_runs(&self.pixel_data, self.width, self.height, key);
        if runs == self.shape_runs {
            return;
        }
        let rects: Vec<Rectangle> = runs
            .iter()
            .map(|&(x, y, width)| Rectangle {
                x,
                y,
                width,
                height: 1,
            })
            .collect();
        let _ = self.conn.shape_rectangles(
            shape::SO::SET,
            shape::SK::BOUNDING,
            ClipOrdering::YX_SORTED,
            self.window,
            0,
            0,
            &rects,
        );
        self.shape_runs = runs;
    }

    fn clear_bounding_shape(&mut self) {
        let _ = self.conn.shape_mask(
            shape::SO::SET,
            shape::SK::BOUNDING,
            self.window,
            0,
            0,
            x11rb::NONE,
        );
        self.shape_runs.clear();
        let _ = self.conn.flush();
    }
}

/// `(x, y, width)` of a one-pixel-high horizontal span
type PixelRun = (i16, i16, u16);

/// Horizontal runs of non-key pixels in row order
fn opaque_runs(rgba: &[u8], width: u32, height: u32, key: Rgb) -> Vec<PixelRun> {
    let mut runs = Vec::new();
    for y in 0..height {
        let mut run_start: Option<u32> = None;
        for x in 0..=width {
            let keyed = if x == width {
                true
            } else {
                let i = ((y * width + x) * 4) as usize;
                rgba.get(i..i + 3).is_none_or(|p| p == key)
            };
            match (keyed, run_start) {
                (false, None) => run_start = Some(x),
                (true, Some(start)) => {
                    runs.push((start as i16, y as i16, (x - start) as u16));
                    run_start = None;
                }
                _ => {}
            }
        }
    }
    runs
}

impl OverlayPlatform for X11Overlay {
    fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| PlatformError::ConnectionFailed(e.to_string()))?;

        // Intern atoms
        let atoms = AtomCollection::new(&conn)
            .map_err(|e| PlatformError::Other(e.to_string()))?
            .reply()
            .map_err(|e| PlatformError::Other(e.to_string()))?;

        // Check for required extensions
        conn.shape_query_version()
            .map_err(|_| PlatformError::UnsupportedFeature("Shape extension".into()))?
            .reply()
            .map_err(|_| PlatformError::UnsupportedFeature("Shape extension".into()))?;

        conn.shm_query_version()
            .map_err(|_| PlatformError::UnsupportedFeature("SHM extension".into()))?
            .reply()
            .map_err(|_| PlatformError::UnsupportedFeature("SHM extension".into()))?;

        let compositor = Self::compositor_running(&conn, screen_num);

        let setup = conn.setup();
        let screen = &setup.roots[screen_num];
        let root = screen.root;

        let argb = if compositor {
            Self::find_argb_visual(screen)
        } else {
            None
        };
        let per_pixel_alpha = argb.is_some();
        let (visual, depth) = argb.unwrap_or((screen.root_visual, screen.root_depth));
        tracing::info!(compositor, per_pixel_alpha, depth, "X11 visual selected");

        let colormap = if per_pixel_alpha {
            let colormap = conn
                .generate_id()
                .map_err(|e| PlatformError::Other(e.to_string()))?;
            conn.create_colormap(ColormapAlloc::NONE, colormap, root, visual)
                .map_err(|e| PlatformError::Other(e.to_string()))?;
            colormap
        } else {
            screen.default_colormap
        };

        let window = conn
            .generate_id()
            .map_err(|e| PlatformError::Other(e.to_string()))?;

        let win_aux = CreateWindowAux::new()
            .background_pixel(0)
            .border_pixel(0)
            .colormap(colormap)
            .event_mask(
                EventMask::EXPOSURE
                    | EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::POINTER_MOTION
                    | EventMask::STRUCTURE_NOTIFY,
            )
            .override_redirect(1);

        conn.create_window(
            depth,
            window,
            root,
            config.x as i16,
            config.y as i16,
            config.width as u16,
            config.height as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &win_aux,
        )
        .map_err(|e| PlatformError::Other(e.to_string()))?;

        let gc = conn
            .generate_id()
            .map_err(|e| PlatformError::Other(e.to_string()))?;
        conn.create_gc(gc, window, &CreateGCAux::new())
            .map_err(|e| PlatformError::Other(e.to_string()))?;

        let shm_buffer = Self::create_shm_buffer(&conn, config.width, config.height)?;

        let overlay = Self {
            conn,
            window,
            gc,
            atoms,
            width: config.width,
            height: config.height,
            x: config.x,
            y: config.y,
            depth,
            per_pixel_alpha,
            pixel_data: vec![0u8; (config.width * config.height * 4) as usize],
            shm_buffer,
            color_key: None,
            shape_runs: Vec::new(),
            running: true,
        };

        overlay.setup_window_hints()?;

        overlay
            .conn
            .map_window(window)
            .map_err(|e| PlatformError::Other(e.to_string()))?;
        overlay
            .conn
            .flush()
            .map_err(|e| PlatformError::Other(e.to_string()))?;

        tracing::debug!(namespace = %config.namespace, window, "X11 overlay created");
        Ok(overlay)
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
        let resized = width != self.width || height != self.height;
        if !resized && x == self.x && y == self.y {
            return;
        }

        self.x = x;
        self.y = y;
        let mut aux = ConfigureWindowAux::new().x(x).y(y);
        if resized {
            self.width = width;
            self.height = height;
            if let Err(e) = self.recreate_shm_buffer() {
                tracing::error!(error = %e, "Failed to resize SHM buffer");
            }
            aux = aux.width(width).height(height);
        }

        let _ = self.conn.configure_window(self.window, &aux);
        let _ = self.conn.flush();
    }

    fn supports_per_pixel_alpha(&self) -> bool {
        self.per_pixel_alpha
    }

    fn set_color_key(&mut self, key: Option<Rgb>) {
        if self.color_key == key {
            return;
        }
        self.color_key = key;
        if key.is_none() {
            self.clear_bounding_shape();
        }
    }

    fn set_window_opacity(&mut self, opacity: f32) {
        let value = (opacity.clamp(0.0, 1.0) as f64 * u32::MAX as f64) as u32;
        let _ = self.conn.change_property32(
            PropMode::REPLACE,
            self.window,
            self.atoms._NET_WM_WINDOW_OPACITY,
            self.atoms.CARDINAL,
            &[value],
        );
        let _ = self.conn.flush();
    }

    fn pixel_buffer(&mut self) -> Option<&mut [u8]> {
        Some(&mut self.pixel_data)
    }

    fn commit(&mut self) {
        if let Some(key) = self.color_key {
            self.update_bounding_shape(key);
        }

        // Convert RGBA to BGRA directly into SHM buffer
        let shm_slice =
            unsafe { std::slice::from_raw_parts_mut(self.shm_buffer.ptr, self.shm_buffer.size) };

        for (src, dst) in self.pixel_data.chunks_exact(4).zip(shm_slice.chunks_exact_mut(4)) {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            dst[3] = src[3];
        }

        let _ = self.conn.shm_put_image(
            self.window,
            self.gc,
            self.width as u16,
            self.height as u16,
            0,
            0,
            self.width as u16,
            self.height as u16,
            0,
            0,
            self.depth,
            ImageFormat::Z_PIXMAP.into(),
            false,
            self.shm_buffer.seg_id,
            0,
        );
        let _ = self.conn.flush();
    }

    fn poll_events(&mut self, events: &mut Vec<PointerEvent>) -> bool {
        while let Ok(Some(event)) = self.conn.poll_for_event() {
            match event {
                x11rb::protocol::Event::ButtonPress(e) => {
                    if let Some(button) = pointer_button(e.detail) {
                        events.push(PointerEvent::Pressed {
                            button,
                            local: (e.event_x as i32, e.event_y as i32),
                            screen: (e.root_x as i32, e.root_y as i32),
                        });
                    }
                }
                x11rb::protocol::Event::ButtonRelease(e) => {
                    if let Some(button) = pointer_button(e.detail) {
                        events.push(PointerEvent::Released {
                            button,
                            local: (e.event_x as i32, e.event_y as i32),
                            screen: (e.root_x as i32, e.root_y as i32),
                        });
                    }
                }
                x11rb::protocol::Event::MotionNotify(e) => {
                    events.push(PointerEvent::Moved {
                        local: (e.event_x as i32, e.event_y as i32),
                        screen: (e.root_x as i32, e.root_y as i32),
                    });
                }
                x11rb::protocol::Event::DestroyNotify(e) if e.window == self.window => {
                    tracing::info!("Overlay window destroyed");
                    self.running = false;
                    return false;
                }
                _ => {}
            }
        }
        self.running
    }
}

fn pointer_button(detail: u8) -> Option<PointerButton> {
    match detail {
        1 => Some(PointerButton::Primary),
        3 => Some(PointerButton::Secondary),
        _ => None,
    }
}

impl Drop for X11Overlay {
    fn drop(&mut self) {
        self.release_shm_buffer();
        let _ = self.conn.destroy_window(self.window);
        let _ = self.conn.free_gc(self.gc);
        let _ = self.conn.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: Rgb = [255, 0, 255];

    fn image(width: u32, height: u32, opaque: &[(u32, u32)]) -> Vec<u8> {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if opaque.contains(&(x, y)) {
                    data.extend_from_slice(&[0, 0, 0, 255]);
                } else {
                    data.extend_from_slice(&[KEY[0], KEY[1], KEY[2], 255]);
                }
            }
        }
        data
    }

    #[test]
    fn runs_cover_non_key_pixels() {
        let data = image(4, 2, &[(1, 0), (2, 0), (0, 1), (3, 1)]);
        assert_eq!(
            opaque_runs(&data, 4, 2, KEY),
            vec![(1, 0, 2), (0, 1, 1), (3, 1, 1)]
        );
    }

    #[test]
    fn fully_keyed_image_has_no_runs() {
        let data = image(3, 3, &[]);
        assert!(opaque_runs(&data, 3, 3, KEY).is_empty());
    }

    #[test]
    fn button_mapping() {
        assert_eq!(pointer_button(1), Some(PointerButton::Primary));
        assert_eq!(pointer_button(3), Some(PointerButton::Secondary));
        assert_eq!(pointer_button(4), None);
    }
}
