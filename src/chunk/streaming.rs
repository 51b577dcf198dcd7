//! Proximity-driven chunk streaming policy.
//!
//! Each tick (on a relaxed cadence, tightened near chunk borders) the
//! controller resolves the chunk under the avatar's current tile, disables
//! chunks beyond the configured chunk-distance, re-enables ones that came
//! back in range, and preloads the nearest packing neighbor before the
//! avatar crosses into it. The asymmetric preload/disable radii give the
//! hysteresis that prevents pop-in at borders without flapping.
//!
//! The controller never removes chunks; disabling hides them and keeps
//! their tiles resident.

use crate::chunk::GenerationQueue;
use crate::hex::{self, AxialHex};
use crate::render::TileInstancer;
use crate::world::WorldMap;
use bevy::prelude::*;

/// Priority used for preload and current-chunk materialization requests.
pub const PRELOAD_PRIORITY: i32 = 100;

/// Runtime streaming configuration, synced from `Settings` while running.
#[derive(Resource, Clone, Debug)]
pub struct StreamingConfig {
    pub chunk_rings: u32,
    pub hex_size: f64,
    pub check_interval_frames: u64,
    pub border_check_interval_frames: u64,
    pub disable_radius_chunks: f64,
    pub preload_radius_chunks: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        let s = crate::settings::Settings::defaults();
        StreamingConfig {
            chunk_rings: s.world.chunk_rings,
            hex_size: s.world.hex_size,
            check_interval_frames: s.streaming.check_interval_frames,
            border_check_interval_frames: s.streaming.border_check_interval_frames,
            disable_radius_chunks: s.streaming.disable_radius_chunks,
            preload_radius_chunks: s.streaming.preload_radius_chunks,
        }
    }
}

/// Cache key for the disable pass: while the current chunk, radius and the
/// number of present chunks are unchanged, the pass is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DisableCacheKey {
    current_chunk: AxialHex,
    radius: u32,
    chunk_count: usize,
}

/// What a tick did, for render-sync and logging decisions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A chunk flipped enabled/disabled, or the current chunk changed.
    pub changed: bool,
    pub current_chunk: Option<AxialHex>,
    pub ticked: bool,
}

#[derive(Resource, Default)]
pub struct ProximityController {
    frames: u64,
    last_tile: Option<AxialHex>,
    current_chunk: Option<AxialHex>,
    near_border: bool,
    disable_cache: Option<DisableCacheKey>,
}

impl ProximityController {
    /// Advance one frame and, when the cadence fires, evaluate the full
    /// proximity policy.
    ///
    /// # Arguments
    /// * `current_tile` - the avatar's true tile hex
    /// * `avatar_planar` - the avatar's true planar position in hex space
    /// * `world`, `queue` - engine state to inspect and mutate
    /// * `cfg` - streaming configuration
    /// * `instancer` - renderer callback for enable/disable toggles
    pub fn tick(
        &mut self,
        current_tile: AxialHex,
        avatar_planar: (f64, f64),
        world: &mut WorldMap,
        queue: &mut GenerationQueue,
        cfg: &StreamingConfig,
        instancer: &mut dyn TileInstancer,
    ) -> TickReport {
        self.frames = self.frames.wrapping_add(1);
        let interval = if self.near_border && self.last_tile.is_some() {
            cfg.border_check_interval_frames
        } else {
            cfg.check_interval_frames
        };
        if self.frames % interval.max(1) != 0 {
            return TickReport::default();
        }

        let mut report = TickReport {
            ticked: true,
            ..TickReport::default()
        };

        // Resolve the chunk under the avatar: index first, then linear
        // scan, then the packing lattice for fresh frontier.
        let radius = cfg.chunk_rings;
        let resolved = world
            .chunk_for_tile_fast(current_tile, radius)
            .or_else(|| world.chunk_for_tile_scan(current_tile, radius))
            .unwrap_or_else(|| {
                let center = hex::nearest_packing_center(current_tile, radius);
                if !world.contains(center) {
                    drop(queue.enqueue(center, PRELOAD_PRIORITY, world));
                }
                center
            });

        if self.current_chunk != Some(resolved) {
            info!(
                "current chunk changed: {} -> {resolved}",
                self.current_chunk
                    .map_or_else(|| "none".to_string(), |c| c.to_string())
            );
            self.current_chunk = Some(resolved);
            report.changed = true;
        }
        report.current_chunk = Some(resolved);

        self.near_border = current_tile.distance(resolved) + 1 >= radius;
        self.last_tile = Some(current_tile);

        // Disable chunks beyond the configured chunk distance, re-enable
        // ones back inside. Skipped entirely while the cache key is
        // unchanged.
        let cache_key = DisableCacheKey {
            current_chunk: resolved,
            radius,
            chunk_count: world.chunk_count(),
        };
        if self.disable_cache != Some(cache_key) {
            let limit = cfg.disable_radius_chunks * f64::from(radius);
            let centers: Vec<AxialHex> = world.centers().collect();
            for center in centers {
                let distant = f64::from(center.distance(resolved)) > limit;
                let Some(chunk) = world.get_mut(center) else {
                    continue;
                };
                if distant && chunk.enabled {
                    chunk.set_enabled(false, instancer);
                    report.changed = true;
                } else if !distant && !chunk.enabled {
                    chunk.set_enabled(true, instancer);
                    report.changed = true;
                }
            }
            self.disable_cache = Some(cache_key);
        }

        // Preload the packing neighbor nearest to the avatar before the
        // avatar reaches it.
        let neighbors = hex::packing_neighbors(resolved, radius);
        let nearest = neighbors.iter().copied().min_by(|a, b| {
            let da = planar_distance_sq(*a, avatar_planar, cfg.hex_size);
            let db = planar_distance_sq(*b, avatar_planar, cfg.hex_size);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(nearest) = nearest {
            let dist = planar_distance_sq(nearest, avatar_planar, cfg.hex_size).sqrt();
            let threshold = cfg.preload_radius_chunks * f64::from(radius) * cfg.hex_size * 1.5;
            if dist < threshold {
                let state = world.get(nearest).map(|c| (c.initialized, c.enabled));
                match state {
                    None => {
                        drop(queue.enqueue(nearest, PRELOAD_PRIORITY, world));
                    }
                    Some((false, _)) => {
                        if !queue.is_queued(nearest) {
                            drop(queue.enqueue(nearest, PRELOAD_PRIORITY, world));
                        }
                    }
                    Some((true, false)) => {
                        if let Some(chunk) = world.get_mut(nearest) {
                            chunk.set_enabled(true, instancer);
                            report.changed = true;
                        }
                    }
                    Some((true, true)) => {}
                }
            }
        }

        report
    }

    #[must_use]
    pub fn current_chunk(&self) -> Option<AxialHex> {
        self.current_chunk
    }

    #[must_use]
    pub fn near_border(&self) -> bool {
        self.near_border
    }
}

fn planar_distance_sq(center: AxialHex, point: (f64, f64), hex_size: f64) -> f64 {
    let (cx, cz) = hex::hex_to_world(center, hex_size);
    let dx = cx - point.0;
    let dz = cz - point.1;
    dx * dx + dz * dz
}

/// Per-frame streaming system: reads the avatar, runs the proximity policy,
/// requests a render re-sync when anything changed, and emits a throttled
/// diagnostics line.
#[allow(clippy::needless_pass_by_value, clippy::too_many_arguments)]
pub fn stream_chunks(
    mut commands: Commands,
    mut controller: ResMut<ProximityController>,
    mut world: ResMut<WorldMap>,
    mut queue: ResMut<GenerationQueue>,
    cfg: Res<StreamingConfig>,
    origin: Res<crate::origin::FloatingOrigin>,
    assets: Option<Res<crate::render::instancing::HexTileAssets>>,
    avatar_query: Query<&Transform, With<crate::player::Avatar>>,
    mut sync: EventWriter<crate::render::RenderSync>,
    time: Res<Time>,
    mut diag: ResMut<crate::diag::StreamingDiag>,
) {
    let Ok(avatar) = avatar_query.get_single() else {
        return;
    };
    let local = avatar.translation;
    let tile = origin.true_hex(local, cfg.hex_size);
    let planar = origin.true_planar(local, cfg.hex_size);

    let mut instancer = crate::render::instancing::BevyInstancer {
        commands: &mut commands,
        assets: assets.as_deref(),
        hex_size: cfg.hex_size,
        origin_world: origin.origin_world,
    };
    let report = controller.tick(tile, planar, &mut world, &mut queue, &cfg, &mut instancer);
    if report.changed {
        sync.send(crate::render::RenderSync);
    }

    let now = time.elapsed_seconds_f64();
    if now - diag.last_log_seconds > 1.0 {
        diag.last_log_seconds = now;
        info!(
            "StreamingDiag: chunks={} enabled={} queue_depth={} current={}",
            world.chunk_count(),
            world.enabled_count(),
            queue.depth(),
            controller
                .current_chunk()
                .map_or_else(|| "none".to_string(), |c| c.to_string())
        );
    }
}
