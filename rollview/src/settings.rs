//! Host-facing configuration of rendering.
//!
//! The library never reads files itself. A host that keeps a `render.toml` next to its other
//! preferences passes the text to [`RenderSettings::from_toml_str`].

use rollview_core::{color::Color, fonts::FontCatalog, windowed::FuzzyCmp};

use crate::renderer::{ClipMode, Renderer};

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("malformed settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to write settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("`{field}` must be {requirement}")]
    Invalid {
        field: &'static str,
        requirement: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Size of the background render pool. Zero is treated as one.
    pub worker_threads: usize,
    pub clip_mode: ClipMode,
    /// Thinnest stroke or dash drawn, in device pixels.
    pub min_stroke_px: f32,
    /// Margin past half a stroke's width that trimmed ends are pushed out by, in device pixels.
    pub bleed_px: f32,
    /// Straight RGBA, each in `[0, 1]`.
    pub background: Color,
    /// Substituted for font families that are not installed.
    pub default_family: String,
    /// Time values closer than this compare equal in windowed queries.
    pub window_threshold: f64,
}
impl Default for RenderSettings {
    fn default() -> Self {
        let renderer = Renderer::default();
        Self {
            worker_threads: std::thread::available_parallelism()
                .map_or(1, |n| n.get().saturating_sub(1).max(1)),
            clip_mode: renderer.clip_mode,
            min_stroke_px: renderer.min_stroke_px,
            bleed_px: renderer.bleed_px,
            background: renderer.background,
            default_family: FontCatalog::DEFAULT_FAMILY.to_owned(),
            window_threshold: FuzzyCmp::DEFAULT_THRESHOLD,
        }
    }
}
impl RenderSettings {
    /// Parse settings, taking defaults for every absent key.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }
    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::ser::to_string_pretty(self)?)
    }
    pub fn validate(&self) -> Result<(), SettingsError> {
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;
        if !non_negative(self.min_stroke_px) {
            return Err(SettingsError::Invalid {
                field: "min_stroke_px",
                requirement: "a non-negative number",
            });
        }
        if !non_negative(self.bleed_px) {
            return Err(SettingsError::Invalid {
                field: "bleed_px",
                requirement: "a non-negative number",
            });
        }
        if !(self.window_threshold.is_finite() && self.window_threshold >= 0.0) {
            return Err(SettingsError::Invalid {
                field: "window_threshold",
                requirement: "a non-negative number",
            });
        }
        if self.default_family.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "default_family",
                requirement: "a font family name",
            });
        }
        Ok(())
    }
    #[must_use]
    pub fn renderer(&self) -> Renderer {
        Renderer::from_settings(self)
    }
    #[must_use]
    pub fn fuzzy_cmp(&self) -> FuzzyCmp {
        FuzzyCmp::new(self.window_threshold)
    }
    /// Apply the configured fallback family to a catalog.
    #[must_use]
    pub fn configure_fonts(&self, catalog: FontCatalog) -> FontCatalog {
        catalog.with_default_family(self.default_family.clone())
    }
}
