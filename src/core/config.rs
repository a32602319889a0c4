//! Configuration system for map behavior tuning
//!
//! This module provides a hierarchical configuration that can be built in code,
//! picked from a preset, or deserialized from JSON.

use crate::core::constants::*;
use crate::core::geo::Position;
use crate::core::projection::ScaleMode;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub initial_position: Position,
    /// URL template with `{z}`, `{x}` and `{y}` placeholders. `None` uses the
    /// OpenStreetMap convention against [`OSM_BASE_URL`].
    pub tile_url_template: Option<String>,
    pub tiles: TileLoadingConfig,
    pub animation: AnimationConfig,
    pub interaction: InteractionConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            initial_position: Position::new(DEFAULT_ZOOM, DEFAULT_CENTER.0, DEFAULT_CENTER.1),
            tile_url_template: None,
            tiles: TileLoadingConfig::default(),
            animation: AnimationConfig::default(),
            interaction: InteractionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoadingConfig {
    pub tile_size: u32,
    pub cache_capacity: usize,
    /// Extra tiles computed in each direction beyond what covers the viewport
    pub margin: u32,
    pub scale_mode: ScaleMode,
    pub user_agent: String,
    pub request_timeout_ms: u64,
}

impl Default for TileLoadingConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            margin: DEFAULT_TILE_MARGIN,
            scale_mode: ScaleMode::default(),
            user_agent: concat!("tileview/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Degrees moved per step
    pub step: f64,
    pub interval_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_PAN_STEP,
            interval_ms: DEFAULT_ANIMATION_INTERVAL_MS,
        }
    }
}

impl AnimationConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub zoom_step: f64,
    pub key_pan_delta: f64,
    pub pinch_pixels_per_zoom: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            zoom_step: DEFAULT_ZOOM_STEP,
            key_pan_delta: DEFAULT_KEY_PAN_DELTA,
            pinch_pixels_per_zoom: PINCH_PIXELS_PER_ZOOM,
        }
    }
}

/// Unified configuration presets
impl MapConfig {
    pub fn low_resource() -> Self {
        Self {
            tiles: TileLoadingConfig {
                cache_capacity: 64,
                margin: 1,
                ..TileLoadingConfig::default()
            },
            animation: AnimationConfig {
                step: 0.002,
                interval_ms: 100,
            },
            ..Self::default()
        }
    }

    pub fn high_capacity() -> Self {
        Self {
            tiles: TileLoadingConfig {
                cache_capacity: 1000,
                margin: 3,
                ..TileLoadingConfig::default()
            },
            animation: AnimationConfig {
                step: 0.0005,
                interval_ms: 10,
            },
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loading map config from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_zoom >= 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(MapError::Config(format!(
                "zoom bounds [{}, {}] are not an ordered non-negative range",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.max_zoom > MAX_TILE_LEVEL as f64 {
            return Err(MapError::Config(format!(
                "max_zoom {} exceeds the highest supported level {}",
                self.max_zoom, MAX_TILE_LEVEL
            )));
        }
        let zoom = self.initial_position.zoom;
        if zoom < self.min_zoom || zoom > self.max_zoom {
            return Err(MapError::Config(format!(
                "initial zoom {} is outside [{}, {}]",
                zoom, self.min_zoom, self.max_zoom
            )));
        }
        if self.tiles.tile_size == 0 {
            return Err(MapError::Config("tile_size must be positive".into()));
        }
        if self.tiles.cache_capacity == 0 {
            return Err(MapError::Config("cache_capacity must be positive".into()));
        }
        if !(self.animation.step > 0.0) {
            return Err(MapError::Config("animation step must be positive".into()));
        }
        if let Some(template) = &self.tile_url_template {
            for placeholder in ["{z}", "{x}", "{y}"] {
                if !template.contains(placeholder) {
                    return Err(MapError::Config(format!(
                        "tile url template {template:?} is missing {placeholder}"
                    )));
                }
            }
        }
        Ok(())
    }
}
