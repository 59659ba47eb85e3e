use super::*;
use std::collections::VecDeque;

use sysoverlay_core::{Capabilities, MetricsProvider, MetricsSnapshot};
use sysoverlay_types::MetricId;

use crate::frame::config_from_settings;
use crate::manager::OverlayWindow;
use crate::platform::headless::HeadlessOverlay;
use crate::platform::{PointerButton, PointerEvent};

/// Replays a fixed CPU stream, repeating the last value once exhausted
struct ScriptedProvider {
    cpu: VecDeque<f64>,
    last: Option<f64>,
}

impl ScriptedProvider {
    fn new(cpu: &[f64]) -> Self {
        Self {
            cpu: cpu.iter().copied().collect(),
            last: None,
        }
    }
}

impl MetricsProvider for ScriptedProvider {
    fn sample(&mut self) -> MetricsSnapshot {
        if let Some(next) = self.cpu.pop_front() {
            self.last = Some(next);
        }
        MetricsSnapshot {
            cpu_percent: self.last,
            ..MetricsSnapshot::empty()
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

fn settings() -> OverlaySettings {
    let mut settings = OverlaySettings::default();
    settings.window.width = 300;
    settings.window.height = 200;
    settings.smoothing_window = 1;
    settings.update_interval_ms = 20;
    settings.enabled_metrics = [MetricId::Cpu].into_iter().collect();
    settings
}

fn app(settings: OverlaySettings, cpu: &[f64]) -> OverlayApp<HeadlessOverlay> {
    let platform = HeadlessOverlay::new(config_from_settings(&settings.window)).unwrap();
    let frame = OverlayFrame::from_window(OverlayWindow::from_platform(platform), &settings);
    let sampler = BoundedSampler::new(Box::new(ScriptedProvider::new(cpu)));
    OverlayApp::new(frame, settings, sampler)
}

fn push(app: &mut OverlayApp<HeadlessOverlay>, event: PointerEvent) {
    app.frame_mut()
        .window_mut()
        .platform_mut()
        .push_event(event);
}

#[tokio::test]
async fn test_ticks_track_stream_without_lag() {
    let mut app = app(settings(), &[10.0, 90.0]);

    app.tick().await;
    assert!((app.content().bars()[0].bar_pixel_width - 28.0).abs() < 1e-3);

    app.tick().await;
    assert!((app.content().bars()[0].bar_pixel_width - 252.0).abs() < 1e-3);
    assert_eq!(app.frame().window().platform().commit_count(), 2);
}

#[tokio::test]
async fn test_run_until_shutdown_keeps_rendering() {
    let mut app = app(settings(), &[50.0]);

    let reason = app
        .run_until(None, tokio::time::sleep(Duration::from_millis(150)))
        .await;

    assert_eq!(reason, ExitReason::Shutdown);
    assert!(app.frame().window().platform().commit_count() >= 2);
    assert_eq!(app.content().bars()[0].label_text, "CPU: 50.0%");
}

#[tokio::test]
async fn test_secondary_click_stops_loop() {
    let mut app = app(settings(), &[50.0]);
    push(
        &mut app,
        PointerEvent::Pressed {
            button: PointerButton::Secondary,
            local: (20, 20),
            screen: (120, 120),
        },
    );

    let reason = tokio::time::timeout(
        Duration::from_secs(5),
        app.run_until(None, std::future::pending()),
    )
    .await
    .expect("loop should stop on close request");
    assert_eq!(reason, ExitReason::CloseRequested);
}

#[tokio::test]
async fn test_host_close_stops_loop() {
    let mut app = app(settings(), &[50.0]);
    app.frame_mut().window_mut().platform_mut().close();

    let reason = tokio::time::timeout(
        Duration::from_secs(5),
        app.run_until(None, std::future::pending()),
    )
    .await
    .expect("loop should stop when the window closes");
    assert_eq!(reason, ExitReason::WindowClosed);
}

#[tokio::test]
async fn test_final_settings_carry_dragged_bounds() {
    let mut app = app(settings(), &[50.0]);
    push(
        &mut app,
        PointerEvent::Pressed {
            button: PointerButton::Primary,
            local: (150, 100),
            screen: (250, 200),
        },
    );
    push(
        &mut app,
        PointerEvent::Moved {
            local: (150, 100),
            screen: (275, 240),
        },
    );
    push(
        &mut app,
        PointerEvent::Released {
            button: PointerButton::Primary,
            local: (150, 100),
            screen: (275, 240),
        },
    );

    app.run_until(None, tokio::time::sleep(Duration::from_millis(100)))
        .await;

    let saved = app.current_settings();
    assert_eq!((saved.window.x, saved.window.y), (125, 140));
    assert_eq!((saved.window.width, saved.window.height), (300, 200));
}

#[tokio::test]
async fn test_settings_channel_applies_update() {
    let mut app = app(settings(), &[50.0]);
    let (tx, rx) = mpsc::channel(4);

    let mut updated = settings();
    updated.enabled_metrics.insert(MetricId::Memory);
    updated.show_timestamp = true;
    updated.update_interval_ms = 30;
    tx.send(updated.clone()).await.unwrap();
    drop(tx);

    app.run_until(Some(rx), tokio::time::sleep(Duration::from_millis(100)))
        .await;

    assert_eq!(app.settings(), &updated);
    assert!(app
        .content()
        .scene()
        .is_visible(crate::scene::PrimitiveKey::Timestamp));
}

#[tokio::test]
async fn test_resize_relayouts_immediately() {
    let mut app = app(settings(), &[50.0]);
    app.tick().await;
    let before = app.content().bars()[0].bar_pixel_height;

    // Bottom-right handle of a 300x200 window at (100, 100)
    push(
        &mut app,
        PointerEvent::Pressed {
            button: PointerButton::Primary,
            local: (295, 195),
            screen: (395, 295),
        },
    );
    push(
        &mut app,
        PointerEvent::Moved {
            local: (395, 230),
            screen: (495, 330),
        },
    );

    let polled = app.frame_mut().poll_input();
    assert!(polled.resized);
    app.relayout();

    assert_eq!(app.frame().width(), 400);
    let bar = app.content().bars()[0];
    assert!(bar.bar_pixel_height > before);
    // Same smoothed value, wider window: 50% of 380
    assert!((bar.bar_pixel_width - 190.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_key_colored_content_stays_visible_under_chroma_key() {
    let key = crate::compositor::DEFAULT_COLOR_KEY;
    let mut settings = settings();
    settings.background_color = key;
    settings.text_color = key;
    settings.bar_colors.cpu = key;

    let platform =
        HeadlessOverlay::without_per_pixel_alpha(config_from_settings(&settings.window));
    let frame = OverlayFrame::from_window(OverlayWindow::from_platform(platform), &settings);
    let sampler = BoundedSampler::new(Box::new(ScriptedProvider::new(&[100.0])));
    let mut app = OverlayApp::new(frame, settings, sampler);
    app.tick().await;

    let platform = app.frame().window().platform();
    assert_eq!(platform.color_key(), Some(key));
    let keyed = [key[0], key[1], key[2], 255];
    assert_eq!(platform.presented_pixel(0, 0), Some(keyed));
    // Full bar row and the background below it
    assert_eq!(platform.presented_pixel(280, 25), Some([254, 0, 255, 255]));
    assert_eq!(platform.presented_pixel(150, 150), Some([254, 0, 255, 255]));
    // Nothing inside the rounded body is keyed out
    for y in 0..200 {
        for x in 10..290 {
            assert_ne!(platform.presented_pixel(x, y), Some(keyed), "keyed at ({x}, {y})");
        }
    }
}
