//! Overlay settings persistence and validation
//!
//! Settings types live in sysoverlay-types; this module adds loading and
//! storing through confy plus the validation applied at the settings
//! boundary. Invalid settings are rejected here and never reach the engine.

use std::path::Path;

pub use sysoverlay_types::OverlaySettings;

use super::ConfigError;

const APP_NAME: &str = "sysoverlay";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// OverlaySettings Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for OverlaySettings persistence and validation
pub trait OverlaySettingsExt: Sized {
    /// Load from the default location, falling back to defaults on any error
    fn load() -> Self;
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn save_to(&self, path: &Path) -> Result<(), ConfigError>;
    fn validate(&self) -> Result<(), ConfigError>;
    /// Render as the TOML written to the settings file
    fn to_toml(&self) -> Result<String, ConfigError>;
    fn default_path() -> Option<std::path::PathBuf>;
}

impl OverlaySettingsExt for OverlaySettings {
    fn load() -> Self {
        match confy::load::<OverlaySettings>(APP_NAME, CONFIG_NAME) {
            Ok(settings) => match settings.validate() {
                Ok(()) => settings,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored settings invalid, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load settings, using defaults");
                Self::default()
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings: OverlaySettings = confy::load_path(path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self.clone()).map_err(ConfigError::Save)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        confy::store_path(path, self.clone()).map_err(ConfigError::Save)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let opacity = self.background_opacity;
        if !opacity.is_finite() || !(0.0..=1.0).contains(&opacity) {
            return Err(ConfigError::out_of_range("background_opacity", opacity));
        }
        if self.smoothing_window == 0 {
            return Err(ConfigError::out_of_range("smoothing_window", 0));
        }
        if self.update_interval_ms == 0 {
            return Err(ConfigError::out_of_range("update_interval_ms", 0));
        }
        if self.sample_timeout_ms == 0 {
            return Err(ConfigError::out_of_range("sample_timeout_ms", 0));
        }
        if self.base_font_size == 0 {
            return Err(ConfigError::out_of_range("base_font_size", 0));
        }

        let window = &self.window;
        if window.width == 0 || window.height == 0 {
            return Err(ConfigError::out_of_range(
                "window size",
                format!("{}x{}", window.width, window.height),
            ));
        }
        if window.min_width == 0 || window.min_height == 0 {
            return Err(ConfigError::out_of_range(
                "window minimum size",
                format!("{}x{}", window.min_width, window.min_height),
            ));
        }

        let layout = &self.layout;
        for (field, value) in [
            ("layout.bar_height", layout.bar_height),
            ("layout.row_spacing", layout.row_spacing),
            ("layout.reference_width", layout.reference_width),
            ("layout.reference_height", layout.reference_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::out_of_range(field, value));
            }
        }
        if !layout.padding.is_finite() || layout.padding < 0.0 {
            return Err(ConfigError::out_of_range("layout.padding", layout.padding));
        }

        Ok(())
    }

    fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn default_path() -> Option<std::path::PathBuf> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME).ok()
    }
}
