//! Constraint-based layout generation over unions of enabled chunks.
//!
//! A layout run takes every enabled, initialized chunk that has not been
//! generated yet, collects the union of their tile hexes, and applies the
//! pipeline: Voronoi biomes -> passable mask -> growing-tree road network ->
//! building placement -> grass fill -> commit through the spatial index.
//! Kinds are written exactly once per pass; afterwards `tiles_generated` is
//! set and the chunk's contents are immutable. `force_recompute` clears the
//! flag across all enabled chunks and re-runs the pipeline; it is the only
//! legal mutation of generated tiles.
//!
//! Every run reseeds its RNG from the base seed and the sorted target set,
//! so re-running over the same chunks reproduces the same biomes and roads
//! (constraints only affect the building step).

use crate::chunk::stats::TileTally;
use crate::chunk::TileKind;
use crate::hex::AxialHex;
use crate::world::WorldMap;
use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

pub mod constraints;
pub mod roads;
pub mod voronoi;

pub use constraints::{BuildingDensity, BuildingSize, ClusteringMode, LayoutConstraints};

use crate::settings::LayoutSettings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The union contained no passable hex; the whole run is a no-op and
    /// every targeted chunk stays ungenerated.
    #[error("layout union has no passable hex")]
    NoPassableTerrain,
}

/// Summary of one layout run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutReport {
    pub chunks: usize,
    pub tiles: usize,
    pub road_tiles: usize,
    pub building_tiles: usize,
    pub dropped_road_seeds: usize,
}

#[derive(Resource)]
pub struct LayoutGenerator {
    base_seed: u64,
    cfg: LayoutSettings,
    pub constraints: LayoutConstraints,
}

impl LayoutGenerator {
    #[must_use]
    pub fn new(cfg: LayoutSettings, constraints: LayoutConstraints) -> Self {
        LayoutGenerator {
            base_seed: cfg.seed,
            cfg,
            constraints,
        }
    }

    /// Generate tile kinds for the given chunk centers.
    ///
    /// Targets that are absent, uninitialized, disabled or already generated
    /// are skipped. An empty effective target set is a successful no-op.
    ///
    /// # Errors
    /// [`LayoutError::NoPassableTerrain`] when the union holds no passable
    /// hex; no chunk is mutated in that case.
    pub fn generate(
        &mut self,
        world: &mut WorldMap,
        targets: &[AxialHex],
    ) -> Result<LayoutReport, LayoutError> {
        let mut targets: Vec<AxialHex> = targets
            .iter()
            .copied()
            .filter(|c| {
                world
                    .get(*c)
                    .is_some_and(|ch| ch.initialized && ch.enabled && !ch.tiles_generated)
            })
            .collect();
        targets.sort();
        targets.dedup();
        if targets.is_empty() {
            return Ok(LayoutReport::default());
        }

        // Union of tile hexes, in deterministic order.
        let mut union: Vec<AxialHex> = Vec::new();
        let mut union_set: HashSet<AxialHex> = HashSet::new();
        for center in &targets {
            let chunk = world.get(*center).expect("target filtered as present");
            for tile in &chunk.tiles {
                if union_set.insert(tile.hex) {
                    union.push(tile.hex);
                }
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.run_seed(&targets));

        // Step A: Voronoi biomes.
        let seeds = voronoi::scatter_seeds(
            &union,
            &mut rng,
            self.cfg.voronoi_forest_seeds,
            self.cfg.voronoi_water_seeds,
            self.cfg.voronoi_grass_seeds,
        );
        let kinds = voronoi::assign_biomes(&union, &seeds);
        let mut plan: HashMap<AxialHex, TileKind> = HashMap::with_capacity(union.len());
        for (hex, kind) in union.iter().zip(kinds.iter()) {
            if let Some(kind) = kind {
                plan.insert(*hex, *kind);
            }
        }

        // Step B: passable terrain. Water is impassable; roads and buildings
        // may overwrite grass or forest but never water.
        let passable_ordered: Vec<AxialHex> = union
            .iter()
            .copied()
            .filter(|h| is_passable(plan.get(h)))
            .collect();
        if passable_ordered.is_empty() {
            return Err(LayoutError::NoPassableTerrain);
        }
        let passable: HashSet<AxialHex> = passable_ordered.iter().copied().collect();

        // Step C: road network.
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let road_target = (self.cfg.road_density_ratio * passable_ordered.len() as f64) as usize;
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let road_seeds = (self.cfg.road_seed_ratio * road_target as f64).ceil() as usize;
        let network =
            roads::grow_network(&passable_ordered, &passable, &mut rng, road_target, road_seeds);
        let road_set: HashSet<AxialHex> = network.hexes.iter().copied().collect();
        let mut occupied: HashSet<AxialHex> = road_set.clone();
        for hex in &network.hexes {
            plan.insert(*hex, TileKind::Road);
        }

        // Step D: buildings next to roads, density from the constraints.
        let mut candidates: Vec<AxialHex> = union
            .iter()
            .copied()
            .filter(|h| {
                is_passable(plan.get(h))
                    && !occupied.contains(h)
                    && h.neighbors().iter().any(|n| road_set.contains(n))
            })
            .collect();
        candidates.shuffle(&mut rng);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let building_target =
            (self.building_ratio() * candidates.len() as f64) as usize;
        let mut buildings = 0usize;
        for hex in candidates {
            if buildings >= building_target {
                break;
            }
            // Re-verify road adjacency at placement time.
            if !hex.neighbors().iter().any(|n| road_set.contains(n)) {
                continue;
            }
            plan.insert(hex, TileKind::Building);
            occupied.insert(hex);
            buildings += 1;
        }

        // Step E: any hex the Voronoi pass left unassigned becomes grass.
        for hex in &union {
            plan.entry(*hex).or_insert(TileKind::Grass);
        }

        // Step F: commit through the spatial index and flip the flags.
        let target_set: HashSet<AxialHex> = targets.iter().copied().collect();
        let mut resolved: Vec<(AxialHex, Vec<TileKind>)> = Vec::with_capacity(targets.len());
        for center in &targets {
            let chunk = world.get(*center).expect("target present");
            let kinds: Vec<TileKind> = chunk
                .tiles
                .iter()
                .map(|tile| {
                    let owner = world.index_owner(tile.hex);
                    match owner {
                        // A boundary hex owned by an already-generated chunk
                        // outside this run keeps the owner's kind.
                        Some(o) if o != *center && !target_set.contains(&o) => world
                            .get(o)
                            .and_then(|oc| oc.tile(tile.hex))
                            .and_then(|t| t.kind)
                            .unwrap_or(plan[&tile.hex]),
                        _ => plan[&tile.hex],
                    }
                })
                .collect();
            resolved.push((*center, kinds));
        }

        let report = LayoutReport {
            chunks: targets.len(),
            tiles: union.len(),
            road_tiles: network.hexes.len(),
            building_tiles: buildings,
            dropped_road_seeds: network.dropped_seeds,
        };

        for (center, kinds) in resolved {
            let chunk = world.get_mut(center).expect("target present");
            for (tile_idx, kind) in kinds.into_iter().enumerate() {
                chunk.tiles[tile_idx].kind = Some(kind);
            }
            chunk.tiles_generated = true;
        }

        info!(
            "layout generated {} chunks ({} tiles, {} roads, {} buildings)",
            report.chunks, report.tiles, report.road_tiles, report.building_tiles
        );
        if network.dropped_seeds > 0 {
            warn!("{} road seeds dropped as unreachable", network.dropped_seeds);
        }
        Ok(report)
    }

    /// Clear `tiles_generated` across all enabled chunks and re-run the
    /// pipeline over them. The only legal mutation of generated tiles.
    pub fn force_recompute(&mut self, world: &mut WorldMap) -> Result<LayoutReport, LayoutError> {
        let targets: Vec<AxialHex> = world
            .chunks()
            .filter(|c| c.enabled && c.initialized)
            .map(|c| c.center)
            .collect();
        for center in &targets {
            if let Some(chunk) = world.get_mut(*center) {
                chunk.tiles_generated = false;
            }
        }
        self.generate(world, &targets)
    }

    /// Per-chunk tile tallies for a completed run, for stats tracking.
    #[must_use]
    pub fn tally_chunks(world: &WorldMap, targets: &[AxialHex]) -> Vec<(AxialHex, TileTally)> {
        let mut out = Vec::new();
        for center in targets {
            let Some(chunk) = world.get(*center) else {
                continue;
            };
            let mut tally = TileTally::default();
            for tile in &chunk.tiles {
                if let Some(kind) = tile.kind {
                    tally.bump(kind);
                }
            }
            out.push((*center, tally));
        }
        out
    }

    fn building_ratio(&self) -> f64 {
        match self.constraints.building_density {
            BuildingDensity::Sparse => self.cfg.building_density_sparse,
            BuildingDensity::Medium => self.cfg.building_density_medium,
            BuildingDensity::Dense => self.cfg.building_density_dense,
        }
    }

    /// Seed for one run: base seed mixed with the sorted target centers, so
    /// identical target sets replay identically while different unions get
    /// independent streams.
    fn run_seed(&self, targets: &[AxialHex]) -> u64 {
        let mut h = self.base_seed ^ 0x9E37_79B9_7F4A_7C15;
        for c in targets {
            h = h
                .rotate_left(13)
                .wrapping_add((c.q as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            h = h
                .rotate_left(17)
                .wrapping_add((c.r as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F));
        }
        h
    }
}

fn is_passable(kind: Option<&TileKind>) -> bool {
    matches!(kind, Some(TileKind::Grass) | Some(TileKind::Forest))
}

/// After the queue finishes chunks, run a layout pass over every enabled
/// chunk that still lacks tile kinds.
#[allow(clippy::needless_pass_by_value)]
pub fn run_layout_passes(
    mut generator: ResMut<LayoutGenerator>,
    mut world: ResMut<WorldMap>,
    mut queue: ResMut<crate::chunk::GenerationQueue>,
    mut stats: ResMut<crate::chunk::LayoutStats>,
    mut sync: EventWriter<crate::render::RenderSync>,
) {
    if queue.take_completed().is_empty() {
        return;
    }
    let targets: Vec<AxialHex> = world
        .enabled_chunks()
        .filter(|c| c.initialized && !c.tiles_generated)
        .map(|c| c.center)
        .collect();
    match generator.generate(&mut world, &targets) {
        Ok(report) if report.chunks > 0 => {
            for (center, tally) in LayoutGenerator::tally_chunks(&world, &targets) {
                stats.update_chunk(center, tally);
            }
            sync.send(crate::render::RenderSync);
        }
        Ok(_) => {}
        Err(e) => {
            // A fatal layout error leaves the world untouched; the chunks
            // stay ungenerated and a later pass may succeed.
            error!("layout generation failed: {e}");
        }
    }
}

/// F4: clear every enabled chunk's generated flag and re-run the pipeline.
#[allow(clippy::needless_pass_by_value)]
pub fn force_recompute_on_key(
    keys: Res<ButtonInput<KeyCode>>,
    mut generator: ResMut<LayoutGenerator>,
    mut world: ResMut<WorldMap>,
    mut stats: ResMut<crate::chunk::LayoutStats>,
    mut sync: EventWriter<crate::render::RenderSync>,
) {
    if !keys.just_pressed(KeyCode::F4) {
        return;
    }
    let targets: Vec<AxialHex> = world
        .enabled_chunks()
        .filter(|c| c.initialized)
        .map(|c| c.center)
        .collect();
    match generator.force_recompute(&mut world) {
        Ok(report) => {
            for (center, tally) in LayoutGenerator::tally_chunks(&world, &targets) {
                stats.update_chunk(center, tally);
            }
            info!(
                "force recompute: {} chunks, {} roads, {} buildings",
                report.chunks, report.road_tiles, report.building_tiles
            );
            sync.send(crate::render::RenderSync);
        }
        Err(e) => error!("force recompute failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, StepProgress};
    use crate::hex;
    use crate::settings::LayoutSettings;
    use std::collections::HashSet;

    const RADIUS: u32 = 4;

    fn world_with_chunks(centers: &[AxialHex]) -> WorldMap {
        let mut world = WorldMap::new();
        for center in centers {
            let mut chunk = Chunk::placeholder(*center, 1.0);
            let mut cursor = 0;
            while let StepProgress::More(next) = chunk.grid_step(RADIUS, cursor) {
                cursor = next;
            }
            chunk.neighbors_step(RADIUS);
            chunk.initialized = true;
            let tiles: Vec<AxialHex> = chunk.tiles.iter().map(|t| t.hex).collect();
            world.add_placeholder(chunk);
            for hex in tiles {
                world.publish_tile(hex, *center);
            }
        }
        world
    }

    fn generator() -> LayoutGenerator {
        LayoutGenerator::new(LayoutSettings::default(), LayoutConstraints::default())
    }

    #[test]
    fn generation_assigns_every_tile_a_kind() {
        let mut world = world_with_chunks(&[AxialHex::ZERO]);
        let mut layout = generator();
        let report = layout.generate(&mut world, &[AxialHex::ZERO]).unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(report.tiles, hex::grid_len(RADIUS));

        let chunk = world.get(AxialHex::ZERO).unwrap();
        assert!(chunk.tiles_generated);
        assert!(chunk.has_all_kinds_assigned());
    }

    #[test]
    fn roads_form_one_connected_component() {
        let centers = [AxialHex::ZERO, hex::packing_neighbors(AxialHex::ZERO, RADIUS)[0]];
        let mut world = world_with_chunks(&centers);
        let mut layout = generator();
        layout.generate(&mut world, &centers).unwrap();

        let mut roads: Vec<AxialHex> = Vec::new();
        let mut seen = HashSet::new();
        for chunk in world.chunks() {
            for tile in &chunk.tiles {
                if tile.kind == Some(TileKind::Road) && seen.insert(tile.hex) {
                    roads.push(tile.hex);
                }
            }
        }
        assert!(!roads.is_empty());

        // BFS over the collected road hexes.
        let set: HashSet<AxialHex> = roads.iter().copied().collect();
        let mut visited = HashSet::from([roads[0]]);
        let mut stack = vec![roads[0]];
        while let Some(hex) = stack.pop() {
            for next in hex.neighbors() {
                if set.contains(&next) && visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        assert_eq!(visited.len(), set.len(), "road network disconnected");
    }

    #[test]
    fn no_road_or_building_on_water() {
        let centers = [AxialHex::ZERO];
        let mut world = world_with_chunks(&centers);
        let mut layout = generator();
        layout.generate(&mut world, &centers).unwrap();

        // Water cells are never passable, so roads/buildings can only have
        // displaced grass or forest: the water cells survive the pass intact
        // (each water seed keeps at least its own hex).
        let chunk = world.get(AxialHex::ZERO).unwrap();
        let water = chunk
            .tiles
            .iter()
            .filter(|t| t.kind == Some(TileKind::Water))
            .count();
        assert!(water > 0, "default seed counts yield water cells");
        for tile in &chunk.tiles {
            if tile.kind == Some(TileKind::Building) {
                assert!(
                    tile.hex
                        .neighbors()
                        .iter()
                        .any(|n| chunk.tile(*n).is_some_and(|t| t.kind == Some(TileKind::Road))),
                    "building at {} lost its road adjacency",
                    tile.hex
                );
            }
        }
    }

    #[test]
    fn generation_is_idempotent_without_force() {
        let mut world = world_with_chunks(&[AxialHex::ZERO]);
        let mut layout = generator();
        layout.generate(&mut world, &[AxialHex::ZERO]).unwrap();
        let before: Vec<Option<TileKind>> = world
            .get(AxialHex::ZERO)
            .unwrap()
            .tiles
            .iter()
            .map(|t| t.kind)
            .collect();

        // Second run skips the generated chunk entirely.
        let report = layout.generate(&mut world, &[AxialHex::ZERO]).unwrap();
        assert_eq!(report.chunks, 0);
        let after: Vec<Option<TileKind>> = world
            .get(AxialHex::ZERO)
            .unwrap()
            .tiles
            .iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn force_recompute_keeps_roads_rescales_buildings() {
        let centers = [AxialHex::ZERO, hex::packing_neighbors(AxialHex::ZERO, RADIUS)[0]];
        let mut world = world_with_chunks(&centers);

        let mut layout = LayoutGenerator::new(
            LayoutSettings::default(),
            LayoutConstraints {
                building_density: BuildingDensity::Sparse,
                ..LayoutConstraints::default()
            },
        );
        let sparse = layout.generate(&mut world, &centers).unwrap();

        layout.constraints.building_density = BuildingDensity::Dense;
        let dense = layout.force_recompute(&mut world).unwrap();

        // Same seed, same union: biomes and roads replay identically; only
        // the building count scales with the density ratio.
        assert_eq!(sparse.road_tiles, dense.road_tiles);
        assert!(dense.building_tiles >= sparse.building_tiles);
        assert!(sparse.road_tiles > 0);
        assert!(world.get(AxialHex::ZERO).unwrap().tiles_generated);
    }

    #[test]
    fn all_water_union_fails_cleanly() {
        let mut world = world_with_chunks(&[AxialHex::ZERO]);
        // Force an all-water world: zero forest/grass seeds, many water.
        let cfg = LayoutSettings {
            voronoi_forest_seeds: 0,
            voronoi_grass_seeds: 0,
            voronoi_water_seeds: 5,
            ..LayoutSettings::default()
        };
        let mut layout = LayoutGenerator::new(cfg, LayoutConstraints::default());
        let err = layout.generate(&mut world, &[AxialHex::ZERO]).unwrap_err();
        assert_eq!(err, LayoutError::NoPassableTerrain);

        // Nothing was committed: the chunk stays ungenerated and blank.
        let chunk = world.get(AxialHex::ZERO).unwrap();
        assert!(!chunk.tiles_generated);
        assert!(chunk.tiles.iter().all(|t| t.kind.is_none()));
    }

    #[test]
    fn disabled_and_generated_targets_are_skipped() {
        let mut world = world_with_chunks(&[AxialHex::ZERO]);
        let mut instancer = crate::render::NullInstancer::default();
        world
            .get_mut(AxialHex::ZERO)
            .unwrap()
            .set_enabled(false, &mut instancer);

        let mut layout = generator();
        let report = layout.generate(&mut world, &[AxialHex::ZERO]).unwrap();
        assert_eq!(report.chunks, 0);
        assert!(!world.get(AxialHex::ZERO).unwrap().tiles_generated);
    }

    #[test]
    fn building_density_ratios_order() {
        // Dense >= Medium >= Sparse on the same union and seed.
        let centers = [AxialHex::ZERO];
        let mut counts = Vec::new();
        for density in [
            BuildingDensity::Sparse,
            BuildingDensity::Medium,
            BuildingDensity::Dense,
        ] {
            let mut world = world_with_chunks(&centers);
            let mut layout = LayoutGenerator::new(
                LayoutSettings::default(),
                LayoutConstraints {
                    building_density: density,
                    ..LayoutConstraints::default()
                },
            );
            let report = layout.generate(&mut world, &centers).unwrap();
            counts.push(report.building_tiles);
        }
        assert!(counts[0] <= counts[1] && counts[1] <= counts[2], "{counts:?}");
    }

    #[test]
    fn tallies_match_committed_tiles() {
        let mut world = world_with_chunks(&[AxialHex::ZERO]);
        let mut layout = generator();
        layout.generate(&mut world, &[AxialHex::ZERO]).unwrap();
        let tallies = LayoutGenerator::tally_chunks(&world, &[AxialHex::ZERO]);
        assert_eq!(tallies.len(), 1);
        assert_eq!(tallies[0].1.total(), hex::grid_len(RADIUS));
    }
}
