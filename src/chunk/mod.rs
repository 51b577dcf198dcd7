//! Chunk data structures and the phased construction pipeline.
//!
//! A chunk is the hexagonal patch of tiles within `radius` rings of its
//! center. Construction is split into three incremental phases driven by the
//! generation queue (`queue.rs`): the grid phase appends tiles in batches,
//! the neighbors phase computes the six packing-neighbor centers, and the
//! index phase publishes tile ownership into the world map's spatial index.
//! Tile kinds stay `None` until a layout pass runs over the chunk; once
//! `tiles_generated` flips to `true` the kinds are immutable (only a
//! force-recompute may clear the flag and rewrite them).

use crate::hex::{self, AxialHex};
use crate::render::{RenderHandle, TileInstancer};
use std::collections::HashMap;

pub mod queue;
pub mod stats;
pub mod streaming;

pub use queue::{FrameOutcome, GenerationQueue, QueueError};
pub use stats::LayoutStats;
pub use streaming::{ProximityController, StreamingConfig};

/// Tiles appended per grid-phase batch before yielding to the scheduler.
pub const GRID_BATCH: usize = 150;
/// Tiles published per index-phase batch before yielding to the scheduler.
pub const INDEX_BATCH: usize = 200;

/// Closed set of tile kinds. Rendering, layout and tests all match on this
/// exhaustively; there is deliberately no open extension point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileKind {
    Grass,
    Building,
    Road,
    Forest,
    Water,
}

impl TileKind {
    pub const ALL: [TileKind; 5] = [
        TileKind::Grass,
        TileKind::Building,
        TileKind::Road,
        TileKind::Forest,
        TileKind::Water,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            TileKind::Grass => "grass",
            TileKind::Building => "building",
            TileKind::Road => "road",
            TileKind::Forest => "forest",
            TileKind::Water => "water",
        }
    }
}

/// One tile of a chunk. `hex` is the world coordinate, never chunk-local.
#[derive(Clone, Debug)]
pub struct Tile {
    pub hex: AxialHex,
    pub kind: Option<TileKind>,
    pub enabled: bool,
    pub instance_handle: Option<RenderHandle>,
}

impl Tile {
    #[must_use]
    fn blank(hex: AxialHex) -> Self {
        Tile {
            hex,
            kind: None,
            enabled: true,
            instance_handle: None,
        }
    }
}

/// Progress marker returned by the batched phase steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepProgress {
    /// The phase has more batches left; call again with the returned cursor.
    More(usize),
    /// The phase is finished.
    Done,
}

/// A hexagonal patch of tiles centered on a packing-lattice point.
#[derive(Debug)]
pub struct Chunk {
    pub center: AxialHex,
    pub center_world: (f64, f64),
    pub tiles: Vec<Tile>,
    pub neighbors: [AxialHex; 6],
    pub enabled: bool,
    /// Monotonic: once `true`, tile kinds are immutable until an explicit
    /// force-recompute clears it.
    pub tiles_generated: bool,
    /// `true` once tiles and neighbors are fully populated and indexed.
    pub initialized: bool,
    lookup: HashMap<AxialHex, usize>,
}

impl Chunk {
    /// Create an empty placeholder. The queue inserts placeholders into the
    /// world map before driving the phases so concurrent proximity checks
    /// observe the chunk as present.
    #[must_use]
    pub fn placeholder(center: AxialHex, hex_size: f64) -> Self {
        Chunk {
            center,
            center_world: hex::hex_to_world(center, hex_size),
            tiles: Vec::new(),
            neighbors: [AxialHex::ZERO; 6],
            enabled: true,
            tiles_generated: false,
            initialized: false,
            lookup: HashMap::new(),
        }
    }

    /// Grid phase: append up to [`GRID_BATCH`] blank tiles from the chunk's
    /// ring enumeration, starting at `cursor`.
    pub fn grid_step(&mut self, radius: u32, cursor: usize) -> StepProgress {
        let grid = hex::chunk_grid(self.center, radius);
        let end = (cursor + GRID_BATCH).min(grid.len());
        self.tiles.reserve(end.saturating_sub(self.tiles.len()));
        for (i, h) in grid[cursor..end].iter().enumerate() {
            self.lookup.insert(*h, cursor + i);
            self.tiles.push(Tile::blank(*h));
        }
        if end == grid.len() {
            StepProgress::Done
        } else {
            StepProgress::More(end)
        }
    }

    /// Neighbors phase: compute the six packing-neighbor centers. Atomic.
    pub fn neighbors_step(&mut self, radius: u32) {
        self.neighbors = hex::packing_neighbors(self.center, radius);
    }

    #[must_use]
    pub fn tile(&self, hex: AxialHex) -> Option<&Tile> {
        self.lookup.get(&hex).map(|i| &self.tiles[*i])
    }

    #[must_use]
    pub fn tile_mut(&mut self, hex: AxialHex) -> Option<&mut Tile> {
        let i = *self.lookup.get(&hex)?;
        Some(&mut self.tiles[i])
    }

    /// Assign a tile kind. Legal while `tiles_generated` is `false`;
    /// afterwards only idempotent writes are accepted.
    ///
    /// # Return
    /// * `true` if the kind was written (or already held the same value)
    /// * `false` if the tile is unknown or the write would mutate a
    ///   generated chunk
    pub fn set_tile_kind(&mut self, hex: AxialHex, kind: TileKind) -> bool {
        let generated = self.tiles_generated;
        match self.tile_mut(hex) {
            Some(tile) if !generated => {
                tile.kind = Some(kind);
                true
            }
            Some(tile) => tile.kind == Some(kind),
            None => false,
        }
    }

    /// Flip the chunk's enabled flag, mirror it onto every tile, and ask the
    /// renderer to toggle each existing instance.
    pub fn set_enabled(&mut self, enabled: bool, instancer: &mut dyn TileInstancer) {
        self.enabled = enabled;
        for tile in &mut self.tiles {
            tile.enabled = enabled;
            if let Some(handle) = tile.instance_handle {
                instancer.set_instance_enabled(handle, enabled);
            }
        }
    }

    /// Dispose every tile instance and clear the stored handles.
    pub fn dispose_instances(&mut self, instancer: &mut dyn TileInstancer) {
        for tile in &mut self.tiles {
            if let Some(handle) = tile.instance_handle.take() {
                instancer.dispose_instance(handle);
            }
        }
    }

    #[must_use]
    pub fn has_all_kinds_assigned(&self) -> bool {
        !self.tiles.is_empty() && self.tiles.iter().all(|t| t.kind.is_some())
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}
