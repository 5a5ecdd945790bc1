//! Centralized configuration: rendering constants, the default color theme,
//! and the persisted `Settings` store (§6.1's "Settings store" collaborator).
//!
//! Grounded on `original_source/wavescout/config.py` for the constants and on
//! `anantnrg-pinnacle`'s `toml`-backed config file pattern for the on-disk
//! `Settings` shape. Per §9 "Global state": there is exactly one `Theme`
//! value and one `Settings` handle, passed into constructors rather than
//! held as process-wide singletons.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{InputError, WaveScoutError, WaveScoutResult};

/// Rendering constants, ported from `config.py::RenderingConfig`.
pub mod rendering {
    pub const SIGNAL_MARGIN_TOP: u16 = 3;
    pub const SIGNAL_MARGIN_BOTTOM: u16 = 3;
    pub const BUS_TRANSITION_MAX_WIDTH: f64 = 4.0;
    pub const BUS_TRANSITION_SLOPE_FACTOR: f64 = 0.125;
    pub const MIN_BUS_TEXT_WIDTH: f64 = 30.0;
    pub const DEFAULT_ROW_HEIGHT: u16 = 20;
    pub const DEFAULT_HEADER_HEIGHT: u16 = 35;
    /// Multiplier on canvas width for the sampling pipeline's iteration cap.
    pub const MAX_ITERATIONS_SAFETY: usize = 10;
    pub const TRANSITION_CACHE_MAX_ENTRIES: usize = 1000;
    pub const MAX_MARKERS: usize = 9;
    pub const MARKER_LABELS: [&str; 9] = ["A", "B", "C", "D", "E", "F", "G", "H", "I"];
    /// Default zoom-to-fit edge space (§3.1 Viewport).
    pub const DEFAULT_EDGE_SPACE: f64 = 0.2;
    /// Analog range query sample cap (§4.7.3 "up to 10 000 points").
    pub const ANALOG_RANGE_SAMPLE_CAP: usize = 10_000;
    /// Analog range padding fraction (§4.7.3 "Expand range by 10%").
    pub const ANALOG_RANGE_PADDING: f64 = 0.10;
    /// Aliasing-hint overlay alpha on analog plots (§4.7.3).
    pub const ANALOG_ALIAS_DOT_ALPHA: u8 = 40;
}

/// Default color theme, ported from `config.py::ColorScheme`.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub background: &'static str,
    pub background_invalid: &'static str,
    pub grid: &'static str,
    pub ruler_line: &'static str,
    pub boundary_line: &'static str,
    pub text: &'static str,
    pub text_muted: &'static str,
    pub selection: &'static str,
    pub cursor: &'static str,
    pub marker_default_color: &'static str,
    pub default_signal: &'static str,
}

pub const DEFAULT_THEME: Theme = Theme {
    background: "#1e1e1e",
    background_invalid: "#1a1a1a",
    grid: "#3e3e42",
    ruler_line: "#808080",
    boundary_line: "#606060",
    text: "#cccccc",
    text_muted: "#808080",
    selection: "#094771",
    cursor: "#ff0000",
    marker_default_color: "#00ff00",
    default_signal: "#33C3F0",
};

/// Which backend implementation of [`crate::db::WaveformBackend`] a session
/// prefers (§6.1: "Two implementations coexist ... selectable per session").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendChoice {
    Vcd,
}

impl Default for BackendChoice {
    fn default() -> Self {
        BackendChoice::Vcd
    }
}

/// Hierarchy path display depth: 0 = full path, N = last N components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyLevels(pub u32);

impl Default for HierarchyLevels {
    fn default() -> Self {
        HierarchyLevels(0)
    }
}

/// Persisted, typed user preferences (§6.1 Settings store). Replaces
/// QSettings' implicit global key/value store with an explicit schema that
/// defaults every field when absent, so old settings files never fail to
/// load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hierarchy_levels: HierarchyLevels,
    pub ui_scale: f32,
    pub backend: BackendChoice,
    pub value_tooltips_enabled: bool,
    pub highlight_selected: bool,
    pub panel_sizes: Vec<u16>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hierarchy_levels: HierarchyLevels::default(),
            ui_scale: 1.0,
            backend: BackendChoice::default(),
            value_tooltips_enabled: true,
            highlight_selected: true,
            panel_sizes: vec![200, 100, 600],
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file, defaulting missing fields and
    /// falling back to [`Settings::default`] entirely if the file does not
    /// exist (first run).
    pub fn load(path: &Path) -> WaveScoutResult<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let text = fs::read_to_string(path).map_err(|e| {
            WaveScoutError::Input(InputError::MalformedDocument(format!(
                "cannot read settings file {}: {e}",
                path.display()
            )))
        })?;
        toml::from_str(&text).map_err(|e| {
            WaveScoutError::Input(InputError::MalformedDocument(format!(
                "invalid settings toml: {e}"
            )))
        })
    }

    pub fn save(&self, path: &Path) -> WaveScoutResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| {
            WaveScoutError::Input(InputError::MalformedDocument(format!(
                "cannot serialize settings: {e}"
            )))
        })?;
        fs::write(path, text).map_err(|e| WaveScoutError::Resource(e.into()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_file_yields_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/wavescout.toml")).unwrap();
        assert_eq!(settings.ui_scale, 1.0);
        assert!(settings.value_tooltips_enabled);
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut settings = Settings::default();
        settings.ui_scale = 1.5;
        settings.hierarchy_levels = HierarchyLevels(2);
        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.ui_scale, 1.5);
        assert_eq!(loaded.hierarchy_levels, HierarchyLevels(2));
    }
}
