//! Viewer configuration
//!
//! Tunables for the scheduler and viewport, loadable from a YAML file with
//! per-field defaults so partial configs and older versions keep working.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u32 = 1;
const CONFIG_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pageflow";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Page render cache capacity, entries
    #[serde(default = "default_page_cache_capacity")]
    pub page_cache_capacity: usize,

    /// Thumbnail render cache capacity, entries
    #[serde(default = "default_thumbnail_cache_capacity")]
    pub thumbnail_cache_capacity: usize,

    /// Queue boost window around the focus page, in pages
    #[serde(default = "default_boost_distance")]
    pub boost_distance: u32,

    /// Pages prerendered on each side of the current page in paged mode
    #[serde(default = "default_prerender_radius")]
    pub prerender_radius: u32,

    /// Extra spreads kept mounted beyond the visible range
    #[serde(default = "default_visible_buffer_spreads")]
    pub visible_buffer_spreads: usize,

    /// Quiet period after the last resize before renders resume, ms
    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,

    /// Minimum gap between wheel-driven spread steps in paged mode, ms
    #[serde(default = "default_wheel_cooldown_ms")]
    pub wheel_cooldown_ms: u64,

    /// Delay before overlay (annotation/text) loads for visible pages, ms
    #[serde(default = "default_overlay_delay_ms")]
    pub overlay_delay_ms: u64,

    /// Gap between the two pages of a spread, CSS px
    #[serde(default = "default_page_spacing")]
    pub page_spacing: f32,

    /// Gap between consecutive spreads, CSS px
    #[serde(default = "default_spread_spacing")]
    pub spread_spacing: f32,

    /// Width reserved for a predicted vertical scrollbar, CSS px
    #[serde(default = "default_scrollbar_width")]
    pub scrollbar_width: f32,

    /// DPI used for the document point to pixel conversion
    #[serde(default = "default_render_dpi")]
    pub render_dpi: f32,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}
fn default_page_cache_capacity() -> usize {
    100
}
fn default_thumbnail_cache_capacity() -> usize {
    500
}
fn default_boost_distance() -> u32 {
    5
}
fn default_prerender_radius() -> u32 {
    2
}
fn default_visible_buffer_spreads() -> usize {
    1
}
fn default_resize_debounce_ms() -> u64 {
    50
}
fn default_wheel_cooldown_ms() -> u64 {
    150
}
fn default_overlay_delay_ms() -> u64 {
    120
}
fn default_page_spacing() -> f32 {
    8.0
}
fn default_spread_spacing() -> f32 {
    16.0
}
fn default_scrollbar_width() -> f32 {
    15.0
}
fn default_render_dpi() -> f32 {
    96.0
}

impl Default for ViewerConfig {
    fn default() -> Self {
        serde_yaml::from_str("{}").expect("defaults always deserialize")
    }
}

impl ViewerConfig {
    /// Load from the user's config directory, falling back to defaults on
    /// any error (missing file, bad YAML).
    #[must_use]
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path, falling back to defaults on any error.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, yaml)
    }

    /// Default config file location under the platform config directory.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILENAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_capacities() {
        let config = ViewerConfig::default();
        assert_eq!(config.page_cache_capacity, 100);
        assert_eq!(config.thumbnail_cache_capacity, 500);
        assert_eq!(config.boost_distance, 5);
        assert_eq!(config.prerender_radius, 2);
        assert_eq!(config.version, CURRENT_VERSION);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: ViewerConfig =
            serde_yaml::from_str("page_cache_capacity: 10").expect("valid partial config");
        assert_eq!(config.page_cache_capacity, 10);
        assert_eq!(config.thumbnail_cache_capacity, 500);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = ViewerConfig::default();
        config.boost_distance = 9;
        config.save_to(&path).expect("save");

        let loaded = ViewerConfig::load_from(&path);
        assert_eq!(loaded.boost_distance, 9);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, ": not yaml : [").expect("write");

        let config = ViewerConfig::load_from(&path);
        assert_eq!(config.page_cache_capacity, 100);
    }
}
