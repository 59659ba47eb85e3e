//! Windows platform implementation for overlay windows
//!
//! Uses a Win32 layered window updated through `UpdateLayeredWindow`, either
//! with per-pixel alpha or with a color key plus uniform window opacity.
#![allow(clippy::too_many_arguments)]

use std::mem;
use std::ptr;

use sysoverlay_types::Rgb;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, POINT, SIZE, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BLENDFUNCTION, CreateCompatibleDC, CreateDIBSection,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, HBITMAP, HDC, HGDIOBJ, ReleaseDC,
    SelectObject, SetDIBits,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{ReleaseCapture, SetCapture};
use windows::Win32::UI::WindowsAndMessaging::{
    CS_HREDRAW, CS_VREDRAW, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
    GetCursorPos, HTCLIENT, HWND_TOPMOST, IDC_ARROW, LoadCursorW, MSG, PM_REMOVE, PeekMessageW,
    RegisterClassExW, SW_SHOWNOACTIVATE, SWP_NOACTIVATE, SetWindowPos, ShowWindow,
    TranslateMessage, ULW_ALPHA, ULW_COLORKEY, UpdateLayeredWindow, WM_DESTROY, WM_ERASEBKGND,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE, WM_NCHITTEST, WM_QUIT, WM_RBUTTONDOWN,
    WM_RBUTTONUP, WNDCLASSEXW, WS_EX_LAYERED, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
};
use windows::core::PCWSTR;

use super::{OverlayConfig, OverlayPlatform, PlatformError, PointerButton, PointerEvent};

const CLASS_NAME: &str = "SysOverlayClass";

/// Windows overlay implementation
pub struct WindowsOverlay {
    hwnd: HWND,
    hdc_mem: HDC,
    hbitmap: HBITMAP,
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    pixel_data: Vec<u8>,
    bgra_buffer: Vec<u8>, // Pre-allocated buffer for RGBA->BGRA conversion
    content_dirty: bool,  // Track if pixel content changed
    color_key: Option<Rgb>,
    /// Uniform opacity used together with the color key
    window_alpha: u8,
    running: bool,
}

// NOTE: WindowsOverlay does not implement Send. The HWND and its message
// queue belong to the creating thread, so the overlay must be created on the
// thread that polls it.

impl WindowsOverlay {
    fn register_class() -> Result<(), PlatformError> {
        unsafe {
            let class_name = wide_string(CLASS_NAME);
            let hinstance = GetModuleHandleW(None)
                .map_err(|e| PlatformError::Other(format!("GetModuleHandleW failed: {}", e)))?;

            let wc = WNDCLASSEXW {
                cbSize: mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(window_proc),
                hInstance: hinstance.into(),
                hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
                lpszClassName: PCWSTR(class_name.as_ptr()),
                ..Default::default()
            };

            if RegisterClassExW(&wc) == 0 {
                let err = std::io::Error::last_os_error();
                // ERROR_CLASS_ALREADY_EXISTS
                if err.raw_os_error() != Some(1410) {
                    return Err(PlatformError::Other(format!(
                        "RegisterClassExW failed: {}",
                        err
                    )));
                }
            }
        }
        Ok(())
    }

    fn bitmap_info(&self) -> BITMAPINFO {
        BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: self.width as i32,
                biHeight: -(self.height as i32), // Top-down DIB
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn create_dib_section(&mut self) -> Result<(), PlatformError> {
        unsafe {
            let hdc_screen = GetDC(HWND::default());

            if !self.hdc_mem.is_invalid() {
                let _ = DeleteDC(self.hdc_mem);
            }
            if !self.hbitmap.is_invalid() {
                let _ = DeleteObject(HGDIOBJ(self.hbitmap.0));
            }

            self.hdc_mem = CreateCompatibleDC(hdc_screen);
            if self.hdc_mem.is_invalid() {
                ReleaseDC(HWND::default(), hdc_screen);
                return Err(PlatformError::BufferError(
                    "CreateCompatibleDC failed".to_string(),
                ));
            }

            let bmi = self.bitmap_info();
            let mut bits: *mut std::ffi::c_void = ptr::null_mut();
            let created = CreateDIBSection(hdc_screen, &bmi, DIB_RGB_COLORS, &mut bits, None, 0);
            ReleaseDC(HWND::default(), hdc_screen);
            self.hbitmap = created.map_err(|e| {
                PlatformError::BufferError(format!("CreateDIBSection failed: {}", e))
            })?;
            SelectObject(self.hdc_mem, HGDIOBJ(self.hbitmap.0));

            let size = (self.width * self.height * 4) as usize;
            self.pixel_data.resize(size, 0);
            self.bgra_buffer.resize(size, 0);
            self.content_dirty = true;
        }
        Ok(())
    }

    fn update_layered_window(&mut self) {
        if !self.content_dirty {
            return;
        }
        self.content_dirty = false;

        for (src, dst) in self
            .pixel_data
            .chunks_exact(4)
            .zip(self.bgra_buffer.chunks_exact_mut(4))
        {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            dst[3] = src[3];
        }

        let (key, blend, flags) = match self.color_key {
            Some([r, g, b]) => (
                COLORREF((r as u32) | ((g as u32) << 8) | ((b as u32) << 16)),
                BLENDFUNCTION {
                    BlendOp: 0, // AC_SRC_OVER
                    BlendFlags: 0,
                    SourceConstantAlpha: self.window_alpha,
                    AlphaFormat: 0,
                },
                ULW_COLORKEY | ULW_ALPHA,
            ),
            None => (
                COLORREF(0),
                BLENDFUNCTION {
                    BlendOp: 0,
                    BlendFlags: 0,
                    SourceConstantAlpha: 255,
                    AlphaFormat: 1, // AC_SRC_ALPHA
                },
                ULW_ALPHA,
            ),
        };

        unsafe {
            let hdc_screen = GetDC(HWND::default());
            let bmi = self.bitmap_info();
            SetDIBits(
                self.hdc_mem,
                self.hbitmap,
                0,
                self.height,
                self.bgra_buffer.as_ptr() as *const _,
                &bmi,
                DIB_RGB_COLORS,
            );

            let pt_src = POINT { x: 0, y: 0 };
            let pt_dst = POINT {
                x: self.x,
                y: self.y,
            };
            let size = SIZE {
                cx: self.width as i32,
                cy: self.height as i32,
            };

            if let Err(e) = UpdateLayeredWindow(
                self.hwnd,
                hdc_screen,
                Some(&pt_dst),
                Some(&size),
                self.hdc_mem,
                Some(&pt_src),
                key,
                Some(&blend),
                flags,
            ) {
                tracing::warn!(error = %e, "UpdateLayeredWindow failed");
            }

            ReleaseDC(HWND::default(), hdc_screen);
        }
    }

    fn cursor_pos() -> (i32, i32) {
        let mut pt = POINT::default();
        unsafe {
            let _ = GetCursorPos(&mut pt);
        }
        (pt.x, pt.y)
    }
}

impl OverlayPlatform for WindowsOverlay {
    fn new(config: OverlayConfig) -> Result<Self, PlatformError> {
        tracing::debug!(
            namespace = %config.namespace,
            x = config.x,
            y = config.y,
            width = config.width,
            height = config.height,
            "Creating Windows overlay"
        );

        Self::register_class()?;

        let hwnd = unsafe {
            let class_name = wide_string(CLASS_NAME);
            let window_name = wide_string(&config.namespace);
            let hinstance = GetModuleHandleW(None)
                .map_err(|e| PlatformError::Other(format!("GetModuleHandleW failed: {}", e)))?;

            CreateWindowExW(
                WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                PCWSTR(class_name.as_ptr()),
                PCWSTR(window_name.as_ptr()),
                WS_POPUP,
                config.x,
                config.y,
                config.width as i32,
                config.height as i32,
                None,
                None,
                hinstance,
                None,
            )
            .map_err(|e| PlatformError::Other(format!("CreateWindowExW failed: {}", e)))?
        };

        let size = (config.width * config.height * 4) as usize;
        let mut overlay = Self {
            hwnd,
            hdc_mem: HDC::default(),
            hbitmap: HBITMAP::default(),
            width: config.width,
            height: config.height,
            x: config.x,
            y: config.y,
            pixel_data: vec![0u8; size],
            bgra_buffer: vec![0u8; size],
            content_dirty: true,
            color_key: None,
            window_alpha: 255,
            running: true,
        };

        overlay.create_dib_section()?;

        unsafe {
            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
        }
        tracing::debug!(?hwnd, "Windows overlay created");

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
        if resized {
            self.width = width;
            self.height = height;
            if let Err(e) = self.create_dib_section() {
                tracing::error!(error = %e, "Failed to resize DIB section");
            }
        }
        unsafe {
            let _ = SetWindowPos(
                self.hwnd,
                HWND_TOPMOST,
                x,
                y,
                width as i32,
                height as i32,
                SWP_NOACTIVATE,
            );
        }
    }

    fn supports_per_pixel_alpha(&self) -> bool {
        true
    }

    fn set_color_key(&mut self, key: Option<Rgb>) {
        self.color_key = key;
        self.content_dirty = true;
    }

    fn set_window_opacity(&mut self, opacity: f32) {
        self.window_alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.content_dirty = true;
    }

    fn pixel_buffer(&mut self) -> Option<&mut [u8]> {
        self.content_dirty = true; // Assume caller will modify the buffer
        Some(&mut self.pixel_data)
    }

    fn commit(&mut self) {
        self.update_layered_window();
    }

    fn poll_events(&mut self, events: &mut Vec<PointerEvent>) -> bool {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE).as_bool() {
                let local = (
                    (msg.lParam.0 & 0xFFFF) as i16 as i32,
                    ((msg.lParam.0 >> 16) & 0xFFFF) as i16 as i32,
                );
                match msg.message {
                    WM_QUIT | WM_DESTROY => {
                        tracing::info!("Overlay window closed");
                        self.running = false;
                        return false;
                    }
                    WM_LBUTTONDOWN | WM_RBUTTONDOWN => {
                        let button = if msg.message == WM_LBUTTONDOWN {
                            // Keep receiving moves while the pointer leaves the window
                            let _ = SetCapture(self.hwnd);
                            PointerButton::Primary
                        } else {
                            PointerButton::Secondary
                        };
                        events.push(PointerEvent::Pressed {
                            button,
                            local,
                            screen: Self::cursor_pos(),
                        });
                    }
                    WM_LBUTTONUP | WM_RBUTTONUP => {
                        let button = if msg.message == WM_LBUTTONUP {
                            let _ = ReleaseCapture();
                            PointerButton::Primary
                        } else {
                            PointerButton::Secondary
                        };
                        events.push(PointerEvent::Released {
                            button,
                            local,
                            screen: Self::cursor_pos(),
                        });
                    }
                    WM_MOUSEMOVE => {
                        events.push(PointerEvent::Moved {
                            local,
                            screen: Self::cursor_pos(),
                        });
                    }
                    _ => {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    }
                }
            }
        }
        self.running
    }
}

impl Drop for WindowsOverlay {
    fn drop(&mut self) {
        unsafe {
            if !self.hdc_mem.is_invalid() {
                let _ = DeleteDC(self.hdc_mem);
            }
            if !self.hbitmap.is_invalid() {
                let _ = DeleteObject(HGDIOBJ(self.hbitmap.0));
            }
            if !self.hwnd.is_invalid() {
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}

/// Window procedure for overlay windows
unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_NCHITTEST => LRESULT(HTCLIENT as isize),
        WM_ERASEBKGND => LRESULT(1), // Don't erase background
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

/// Convert a &str to a null-terminated wide string
fn wide_string(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
