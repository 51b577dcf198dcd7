//! World map: every chunk in the session, plus the tile -> chunk spatial
//! index.
//!
//! The map is exclusively owned by the frame thread. A chunk is *present*
//! once it has been enqueued at least once (the queue inserts a placeholder
//! immediately), and is only ever removed by an explicit reset. The spatial
//! index is first-writer-wins on shared boundary hexes: exactly one chunk
//! owns each indexed hex even when two chunks enumerate it.

use crate::chunk::Chunk;
use crate::hex::AxialHex;
use crate::render::TileInstancer;
use bevy::prelude::*;
use std::collections::HashMap;

#[derive(Resource, Default)]
pub struct WorldMap {
    chunks: HashMap<AxialHex, Chunk>,
    tile_index: HashMap<AxialHex, AxialHex>,
}

impl WorldMap {
    #[must_use]
    pub fn new() -> Self {
        WorldMap::default()
    }

    #[must_use]
    pub fn get(&self, center: AxialHex) -> Option<&Chunk> {
        self.chunks.get(&center)
    }

    #[must_use]
    pub fn get_mut(&mut self, center: AxialHex) -> Option<&mut Chunk> {
        self.chunks.get_mut(&center)
    }

    #[must_use]
    pub fn contains(&self, center: AxialHex) -> bool {
        self.chunks.contains_key(&center)
    }

    /// Insert a freshly created placeholder chunk. The queue calls this
    /// before driving any construction phase so proximity checks already see
    /// the chunk as present.
    pub fn add_placeholder(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.center, chunk);
    }

    /// Publish a tile into the spatial index unless some chunk already owns
    /// that hex (first-writer wins on shared boundary hexes).
    pub fn publish_tile(&mut self, hex: AxialHex, owner: AxialHex) {
        self.tile_index.entry(hex).or_insert(owner);
    }

    /// O(1) owning-chunk lookup through the spatial index.
    ///
    /// The mapped center is verified against the chunk radius; a stale entry
    /// (outside the chunk's boundary, or pointing at a chunk that no longer
    /// exists) is evicted and `None` is returned so the caller can fall back
    /// to [`WorldMap::chunk_for_tile_scan`].
    pub fn chunk_for_tile_fast(&mut self, tile: AxialHex, radius: u32) -> Option<AxialHex> {
        let center = *self.tile_index.get(&tile)?;
        let valid = self
            .chunks
            .get(&center)
            .is_some_and(|c| tile.distance(c.center) <= radius);
        if !valid {
            self.tile_index.remove(&tile);
            return None;
        }
        Some(center)
    }

    /// Linear fallback lookup for a cold or evicted index entry.
    ///
    /// When several chunks contain the hex, the chunk whose center is at the
    /// smaller cube distance wins; an exact center match wins outright.
    #[must_use]
    pub fn chunk_for_tile_scan(&self, tile: AxialHex, radius: u32) -> Option<AxialHex> {
        if self.chunks.contains_key(&tile) {
            return Some(tile);
        }
        self.chunks
            .values()
            .filter(|c| tile.distance(c.center) <= radius)
            .min_by_key(|c| (tile.distance(c.center), c.center))
            .map(|c| c.center)
    }

    /// Remove a chunk and every spatial-index entry it owns, atomically from
    /// the caller's perspective. Instances are disposed through the renderer.
    pub fn remove(&mut self, center: AxialHex, instancer: &mut dyn TileInstancer) -> bool {
        let Some(mut chunk) = self.chunks.remove(&center) else {
            return false;
        };
        chunk.dispose_instances(instancer);
        self.tile_index.retain(|_, owner| *owner != center);
        true
    }

    /// Drop every chunk and index entry. Reserved for explicit reset; the
    /// streaming policy never removes chunks on its own.
    pub fn reset(&mut self, instancer: &mut dyn TileInstancer) {
        let centers: Vec<AxialHex> = self.chunks.keys().copied().collect();
        for center in centers {
            self.remove(center, instancer);
        }
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn chunks_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut()
    }

    pub fn centers(&self) -> impl Iterator<Item = AxialHex> + '_ {
        self.chunks.keys().copied()
    }

    pub fn enabled_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values().filter(|c| c.enabled)
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.chunks.values().filter(|c| c.enabled).count()
    }

    #[must_use]
    pub fn indexed_tile_count(&self) -> usize {
        self.tile_index.len()
    }

    #[must_use]
    pub fn index_owner(&self, hex: AxialHex) -> Option<AxialHex> {
        self.tile_index.get(&hex).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::StepProgress;
    use crate::render::NullInstancer;

    fn insert_built(world: &mut WorldMap, center: AxialHex, radius: u32) {
        let mut chunk = Chunk::placeholder(center, 1.0);
        let mut cursor = 0;
        while let StepProgress::More(next) = chunk.grid_step(radius, cursor) {
            cursor = next;
        }
        chunk.neighbors_step(radius);
        chunk.initialized = true;
        let tiles: Vec<AxialHex> = chunk.tiles.iter().map(|t| t.hex).collect();
        world.add_placeholder(chunk);
        for hex in tiles {
            world.publish_tile(hex, center);
        }
    }

    #[test]
    fn fast_lookup_hits_and_verifies() {
        let mut world = WorldMap::new();
        insert_built(&mut world, AxialHex::ZERO, 2);
        assert_eq!(
            world.chunk_for_tile_fast(AxialHex::new(1, 1), 2),
            Some(AxialHex::ZERO)
        );
        assert_eq!(world.chunk_for_tile_fast(AxialHex::new(9, 9), 2), None);
    }

    #[test]
    fn stale_index_entries_are_evicted() {
        let mut world = WorldMap::new();
        insert_built(&mut world, AxialHex::ZERO, 2);
        // Forge an entry pointing outside the chunk's boundary.
        world.publish_tile(AxialHex::new(50, 50), AxialHex::ZERO);
        assert_eq!(world.chunk_for_tile_fast(AxialHex::new(50, 50), 2), None);
        // Evicted, not just skipped.
        assert_eq!(world.index_owner(AxialHex::new(50, 50)), None);
    }

    #[test]
    fn first_writer_wins_on_shared_hexes() {
        let mut world = WorldMap::new();
        insert_built(&mut world, AxialHex::ZERO, 2);
        let boundary = AxialHex::new(0, 2);
        assert_eq!(world.index_owner(boundary), Some(AxialHex::ZERO));
        // A later chunk publishing the same hex does not steal ownership.
        world.publish_tile(boundary, AxialHex::new(2, 3));
        assert_eq!(world.index_owner(boundary), Some(AxialHex::ZERO));
    }

    #[test]
    fn scan_prefers_closer_center_and_exact_match() {
        let mut world = WorldMap::new();
        insert_built(&mut world, AxialHex::ZERO, 2);
        insert_built(&mut world, AxialHex::new(2, 3), 2);
        // Tile at distance 1 from origin, distance 4 from (2,3).
        assert_eq!(
            world.chunk_for_tile_scan(AxialHex::new(0, 1), 2),
            Some(AxialHex::ZERO)
        );
        // A chunk-center hex resolves to itself outright.
        assert_eq!(
            world.chunk_for_tile_scan(AxialHex::new(2, 3), 2),
            Some(AxialHex::new(2, 3))
        );
        assert_eq!(world.chunk_for_tile_scan(AxialHex::new(40, 0), 2), None);
    }

    #[test]
    fn remove_deletes_owned_index_entries_only() {
        let mut world = WorldMap::new();
        insert_built(&mut world, AxialHex::ZERO, 2);
        insert_built(&mut world, AxialHex::new(2, 3), 2);
        let shared = AxialHex::new(0, 2); // owned by the origin chunk
        assert_eq!(world.index_owner(shared), Some(AxialHex::ZERO));

        let mut instancer = NullInstancer::default();
        assert!(world.remove(AxialHex::ZERO, &mut instancer));
        assert!(world.get(AxialHex::ZERO).is_none());
        assert_eq!(world.index_owner(shared), None);
        // The neighbor's owned entries survive.
        assert_eq!(world.index_owner(AxialHex::new(2, 3)), Some(AxialHex::new(2, 3)));
    }

    #[test]
    fn reset_clears_everything_and_disposes_instances() {
        let mut world = WorldMap::new();
        insert_built(&mut world, AxialHex::ZERO, 1);
        insert_built(&mut world, AxialHex::new(1, 2), 1);
        let mut instancer = NullInstancer::default();
        for chunk in world.chunks_mut() {
            for tile in &mut chunk.tiles {
                tile.instance_handle =
                    instancer.create_instance(tile.hex, crate::chunk::TileKind::Grass, true);
            }
        }

        world.reset(&mut instancer);
        assert_eq!(world.chunk_count(), 0);
        assert_eq!(world.indexed_tile_count(), 0);
        assert_eq!(instancer.disposed, 14);
    }

    #[test]
    fn enabled_iteration_respects_flags() {
        let mut world = WorldMap::new();
        insert_built(&mut world, AxialHex::ZERO, 1);
        insert_built(&mut world, AxialHex::new(1, 2), 1);
        let mut instancer = NullInstancer::default();
        world
            .get_mut(AxialHex::new(1, 2))
            .unwrap()
            .set_enabled(false, &mut instancer);
        assert_eq!(world.chunk_count(), 2);
        assert_eq!(world.enabled_count(), 1);
        let enabled: Vec<AxialHex> = world.enabled_chunks().map(|c| c.center).collect();
        assert_eq!(enabled, vec![AxialHex::ZERO]);
    }
}
