//! Common utility functions for overlay rendering

use chrono::{DateTime, TimeZone};
use sysoverlay_types::Rgb;
use tiny_skia::Color;

/// Memory labels say "GB" but count binary gigabytes (1024³ bytes), the unit
/// GPU tools report VRAM in
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Convert an RGB triple to an opaque tiny_skia Color
#[inline]
pub fn color_from_rgb(rgb: Rgb) -> Color {
    Color::from_rgba8(rgb[0], rgb[1], rgb[2], 255)
}

/// Label for a percentage metric, e.g. `CPU: 12.3%`
pub fn format_percent(name: &str, percent: f64) -> String {
    format!("{}: {:.1}%", name, percent)
}

/// Label for a temperature in degrees Celsius
pub fn format_temperature(name: &str, celsius: f64) -> String {
    format!("{}: {:.1}°C", name, celsius)
}

/// Label for a used/total byte pair, e.g. `VRAM: 3.2/8.0 GB` (1 GB = 1024³ bytes)
pub fn format_memory(name: &str, used_bytes: f64, total_bytes: f64) -> String {
    format!(
        "{}: {:.1}/{:.1} GB",
        name,
        used_bytes / BYTES_PER_GB,
        total_bytes / BYTES_PER_GB
    )
}

/// Timestamp row text
pub fn format_last_update<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Last Update: {}", at.format("%H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent("CPU", 12.34), "CPU: 12.3%");
        assert_eq!(format_percent("GPU", 7.0), "GPU: 7.0%");
        assert_eq!(format_percent("RAM", 100.0), "RAM: 100.0%");
    }

    #[test]
    fn test_format_temperature() {
        assert_eq!(format_temperature("GPU Temp", 61.0), "GPU Temp: 61.0°C");
    }

    #[test]
    fn test_format_memory() {
        let gb = BYTES_PER_GB;
        assert_eq!(format_memory("VRAM", 3.2 * gb, 8.0 * gb), "VRAM: 3.2/8.0 GB");
        assert_eq!(format_memory("VRAM", 0.0, 0.0), "VRAM: 0.0/0.0 GB");
    }

    #[test]
    fn test_format_memory_counts_binary_gigabytes() {
        // An 8 GiB card reads 8.0, not 8.6; 8e9 bytes reads 7.5
        assert_eq!(
            format_memory("VRAM", 0.0, 8.0 * 1024.0 * 1024.0 * 1024.0),
            "VRAM: 0.0/8.0 GB"
        );
        assert_eq!(format_memory("VRAM", 0.0, 8.0e9), "VRAM: 0.0/7.5 GB");
    }

    #[test]
    fn test_format_last_update() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 3, 7).unwrap();
        assert_eq!(format_last_update(&at), "Last Update: 09:03:07");
    }
}
