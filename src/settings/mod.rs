//! Engine settings, defaults and validation.
//!
//! Settings are stored as a RON file under `data/settings/` and are
//! hot-reloadable through the watcher in `loader.rs`. Every field carries a
//! serde default so partial files parse cleanly; out-of-range values are
//! rejected at construction by [`Settings::validate`].

use crate::render::TILE_MODEL_DEPTH;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod loader;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    /// A configuration value was out of range at construction time.
    #[error("bad config: {0}")]
    BadConfig(String),
}

/// World-wide constants fixed for the whole session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    #[serde(default = "WorldSettings::default_chunk_rings")]
    pub chunk_rings: u32, // Chunk radius R in hex rings; world-wide constant.
    #[serde(default = "WorldSettings::default_hex_size")]
    pub hex_size: f64, // Distance center-to-vertex, world units.
}

impl WorldSettings {
    fn default_chunk_rings() -> u32 {
        10
    }
    fn default_hex_size() -> f64 {
        TILE_MODEL_DEPTH / 3.0
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            chunk_rings: Self::default_chunk_rings(),
            hex_size: Self::default_hex_size(),
        }
    }
}

/// Streaming cadence and radii for the proximity policy and the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingSettings {
    #[serde(default = "StreamingSettings::default_queue_frame_budget_ms")]
    pub queue_frame_budget_ms: f64, // Cooperative queue budget per frame.
    #[serde(default = "StreamingSettings::default_check_interval_frames")]
    pub check_interval_frames: u64, // Proximity cadence, relaxed.
    #[serde(default = "StreamingSettings::default_border_check_interval_frames")]
    pub border_check_interval_frames: u64, // Proximity cadence near chunk borders.
    #[serde(default = "StreamingSettings::default_disable_radius_chunks")]
    pub disable_radius_chunks: f64, // Disable beyond k*R chunk-distance.
    #[serde(default = "StreamingSettings::default_preload_radius_chunks")]
    pub preload_radius_chunks: f64, // Preload within k*R*s*1.5 world-distance.
}

impl StreamingSettings {
    fn default_queue_frame_budget_ms() -> f64 {
        5.0
    }
    fn default_check_interval_frames() -> u64 {
        20
    }
    fn default_border_check_interval_frames() -> u64 {
        5
    }
    fn default_disable_radius_chunks() -> f64 {
        4.0
    }
    fn default_preload_radius_chunks() -> f64 {
        2.5
    }
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            queue_frame_budget_ms: Self::default_queue_frame_budget_ms(),
            check_interval_frames: Self::default_check_interval_frames(),
            border_check_interval_frames: Self::default_border_check_interval_frames(),
            disable_radius_chunks: Self::default_disable_radius_chunks(),
            preload_radius_chunks: Self::default_preload_radius_chunks(),
        }
    }
}

/// Floating-origin rebase threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginSettings {
    #[serde(default = "OriginSettings::default_rebase_threshold")]
    pub rebase_threshold: f32, // World distance the avatar may drift before rebasing.
}

impl OriginSettings {
    fn default_rebase_threshold() -> f32 {
        1000.0
    }
}

impl Default for OriginSettings {
    fn default() -> Self {
        Self {
            rebase_threshold: Self::default_rebase_threshold(),
        }
    }
}

/// Layout-generation tuning: seed counts, densities, PRNG seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(default = "LayoutSettings::default_seed")]
    pub seed: u64, // Base PRNG seed; the only source of world variation.
    #[serde(default = "LayoutSettings::default_forest_seeds")]
    pub voronoi_forest_seeds: usize,
    #[serde(default = "LayoutSettings::default_water_seeds")]
    pub voronoi_water_seeds: usize,
    #[serde(default = "LayoutSettings::default_grass_seeds")]
    pub voronoi_grass_seeds: usize,
    #[serde(default = "LayoutSettings::default_road_density_ratio")]
    pub road_density_ratio: f64, // Road target as a fraction of passable hexes.
    #[serde(default = "LayoutSettings::default_road_seed_ratio")]
    pub road_seed_ratio: f64, // Road seed count as a fraction of the road target.
    #[serde(default = "LayoutSettings::default_building_density_sparse")]
    pub building_density_sparse: f64,
    #[serde(default = "LayoutSettings::default_building_density_medium")]
    pub building_density_medium: f64,
    #[serde(default = "LayoutSettings::default_building_density_dense")]
    pub building_density_dense: f64,
}

impl LayoutSettings {
    fn default_seed() -> u64 {
        0x00C0_FFEE_5EED
    }
    fn default_forest_seeds() -> usize {
        4
    }
    fn default_water_seeds() -> usize {
        3
    }
    fn default_grass_seeds() -> usize {
        6
    }
    fn default_road_density_ratio() -> f64 {
        0.10
    }
    fn default_road_seed_ratio() -> f64 {
        0.25
    }
    fn default_building_density_sparse() -> f64 {
        0.05
    }
    fn default_building_density_medium() -> f64 {
        0.10
    }
    fn default_building_density_dense() -> f64 {
        0.15
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            seed: Self::default_seed(),
            voronoi_forest_seeds: Self::default_forest_seeds(),
            voronoi_water_seeds: Self::default_water_seeds(),
            voronoi_grass_seeds: Self::default_grass_seeds(),
            road_density_ratio: Self::default_road_density_ratio(),
            road_seed_ratio: Self::default_road_seed_ratio(),
            building_density_sparse: Self::default_building_density_sparse(),
            building_density_medium: Self::default_building_density_medium(),
            building_density_dense: Self::default_building_density_dense(),
        }
    }
}

/// Top-level settings resource.
#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub streaming: StreamingSettings,
    #[serde(default)]
    pub origin: OriginSettings,
    #[serde(default)]
    pub layout: LayoutSettings,
}

impl Settings {
    #[must_use]
    pub fn defaults() -> Self {
        Settings::default()
    }

    /// Reject out-of-range values at construction time.
    ///
    /// # Errors
    /// Returns [`SettingsError::BadConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        fn bad(field: &str, detail: &str) -> SettingsError {
            SettingsError::BadConfig(format!("{field}: {detail}"))
        }

        if !(self.world.hex_size.is_finite() && self.world.hex_size > 0.0) {
            return Err(bad("world.hex_size", "must be finite and positive"));
        }
        if !(self.streaming.queue_frame_budget_ms.is_finite()
            && self.streaming.queue_frame_budget_ms > 0.0)
        {
            return Err(bad("streaming.queue_frame_budget_ms", "must be positive"));
        }
        if self.streaming.check_interval_frames == 0 {
            return Err(bad("streaming.check_interval_frames", "must be at least 1"));
        }
        if self.streaming.border_check_interval_frames == 0 {
            return Err(bad(
                "streaming.border_check_interval_frames",
                "must be at least 1",
            ));
        }
        if !(self.streaming.disable_radius_chunks.is_finite()
            && self.streaming.disable_radius_chunks > 0.0)
        {
            return Err(bad("streaming.disable_radius_chunks", "must be positive"));
        }
        if !(self.streaming.preload_radius_chunks.is_finite()
            && self.streaming.preload_radius_chunks > 0.0)
        {
            return Err(bad("streaming.preload_radius_chunks", "must be positive"));
        }
        if !(self.origin.rebase_threshold.is_finite() && self.origin.rebase_threshold > 0.0) {
            return Err(bad("origin.rebase_threshold", "must be positive"));
        }

        let ratios = [
            ("layout.road_density_ratio", self.layout.road_density_ratio),
            ("layout.road_seed_ratio", self.layout.road_seed_ratio),
            (
                "layout.building_density_sparse",
                self.layout.building_density_sparse,
            ),
            (
                "layout.building_density_medium",
                self.layout.building_density_medium,
            ),
            (
                "layout.building_density_dense",
                self.layout.building_density_dense,
            ),
        ];
        for (name, value) in ratios {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(bad(name, "must lie in [0, 1]"));
            }
        }
        Ok(())
    }
}
