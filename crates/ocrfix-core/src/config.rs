//! Editor configuration.
//!
//! Every field has a default, so a config file only needs to name what
//! it overrides.

use crate::model::{DEFAULT_LABEL, MIN_SIZE};
use serde::Deserialize;
use std::time::Duration;

/// The eight-color group palette, cycled by group sequence position.
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#E4572E", "#17BEBB", "#FFC914", "#2E282A", "#76B041", "#7E5A9B", "#3F88C5", "#F49D37",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Minimum width/height of a committed box, in image units.
    pub min_size: f64,
    /// Delay after the last edit before an autosave is issued.
    pub autosave_debounce_ms: u64,
    /// Rubber-band drags smaller than this on both axes are clicks.
    pub marquee_threshold: f64,
    /// Hex colors assigned to groups by sequence position.
    pub palette: Vec<String>,
    /// Label for annotations that arrive without one.
    pub default_label: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_size: MIN_SIZE,
            autosave_debounce_ms: 1200,
            marquee_threshold: 2.0,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            default_label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: EditorConfig = serde_json::from_str(json)?;
        config.sanitize();
        Ok(config)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Replace unusable values with defaults instead of failing.
    fn sanitize(&mut self) {
        let defaults = Self::default();
        if !self.min_size.is_finite() || self.min_size <= 0.0 {
            log::warn!("ignoring invalid min_size {}", self.min_size);
            self.min_size = defaults.min_size;
        }
        if !self.marquee_threshold.is_finite() || self.marquee_threshold < 0.0 {
            self.marquee_threshold = defaults.marquee_threshold;
        }
        if self.palette.is_empty() {
            self.palette = defaults.palette;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{ "min_size": 8 }"#).unwrap();
        assert_eq!(config.min_size, 8.0);
        assert_eq!(config.autosave_debounce(), Duration::from_millis(1200));
        assert_eq!(config.palette.len(), DEFAULT_PALETTE.len());
    }

    #[test]
    fn empty_palette_falls_back() {
        let config = EditorConfig::from_json(r#"{ "palette": [], "min_size": -1 }"#).unwrap();
        assert_eq!(config.palette.len(), DEFAULT_PALETTE.len());
        assert_eq!(config.min_size, MIN_SIZE);
    }
}
