//! Per-chunk tile tallies produced by layout passes.
//!
//! `LayoutStats` tracks how many tiles of each kind every generated chunk
//! holds plus the aggregate totals. The debug overlay (F1) and the debug
//! dump (F3) read from here.

use crate::chunk::TileKind;
use crate::hex::AxialHex;
use bevy::prelude::*;
use std::collections::HashMap;

/// Tile counts by kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileTally {
    pub grass: usize,
    pub building: usize,
    pub road: usize,
    pub forest: usize,
    pub water: usize,
}

impl TileTally {
    pub fn bump(&mut self, kind: TileKind) {
        match kind {
            TileKind::Grass => self.grass += 1,
            TileKind::Building => self.building += 1,
            TileKind::Road => self.road += 1,
            TileKind::Forest => self.forest += 1,
            TileKind::Water => self.water += 1,
        }
    }

    #[must_use]
    pub fn count(&self, kind: TileKind) -> usize {
        match kind {
            TileKind::Grass => self.grass,
            TileKind::Building => self.building,
            TileKind::Road => self.road,
            TileKind::Forest => self.forest,
            TileKind::Water => self.water,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.grass + self.building + self.road + self.forest + self.water
    }
}

#[derive(Resource, Default)]
pub struct LayoutStats {
    per_chunk: HashMap<AxialHex, TileTally>,
}

impl LayoutStats {
    /// Replace the tally for a chunk after a (re)generation pass.
    pub fn update_chunk(&mut self, center: AxialHex, tally: TileTally) {
        self.per_chunk.insert(center, tally);
    }

    pub fn remove_chunk(&mut self, center: AxialHex) {
        self.per_chunk.remove(&center);
    }

    #[must_use]
    pub fn chunk_tally(&self, center: AxialHex) -> Option<TileTally> {
        self.per_chunk.get(&center).copied()
    }

    /// Aggregate tallies across every tracked chunk.
    #[must_use]
    pub fn totals(&self) -> TileTally {
        let mut out = TileTally::default();
        for t in self.per_chunk.values() {
            out.grass += t.grass;
            out.building += t.building;
            out.road += t.road;
            out.forest += t.forest;
            out.water += t.water;
        }
        out
    }

    #[must_use]
    pub fn tracked_chunks(&self) -> usize {
        self.per_chunk.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_aggregate_and_replace() {
        let mut stats = LayoutStats::default();
        let mut a = TileTally::default();
        a.bump(TileKind::Grass);
        a.bump(TileKind::Road);
        stats.update_chunk(AxialHex::ZERO, a);

        let mut b = TileTally::default();
        b.bump(TileKind::Water);
        stats.update_chunk(AxialHex::new(2, 3), b);

        let t = stats.totals();
        assert_eq!((t.grass, t.road, t.water), (1, 1, 1));
        assert_eq!(t.total(), 3);

        // A regeneration replaces, never accumulates.
        let mut a2 = TileTally::default();
        a2.bump(TileKind::Building);
        stats.update_chunk(AxialHex::ZERO, a2);
        let t = stats.totals();
        assert_eq!((t.grass, t.road, t.building, t.water), (0, 0, 1, 1));

        stats.remove_chunk(AxialHex::new(2, 3));
        assert_eq!(stats.totals().water, 0);
        assert_eq!(stats.tracked_chunks(), 1);
    }
}
