//! Voronoi biome assignment (layout step A).
//!
//! Seeds are scattered uniformly over the generation union, then every hex
//! adopts the kind of its cube-distance-nearest seed. Ties break by seed
//! declaration order: forest seeds first, then water, then grass. The
//! per-hex assignment is a pure function of the seed list, so it fans out
//! over rayon and is collected back on the control thread.

use crate::chunk::TileKind;
use crate::hex::AxialHex;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;

/// Scatter biome seeds over the union without replacement.
///
/// The returned list preserves declaration order (forest, water, grass),
/// which is what the nearest-seed tie-break keys on. If the union is smaller
/// than the requested seed total, later categories get fewer seeds.
pub fn scatter_seeds<R: Rng>(
    union: &[AxialHex],
    rng: &mut R,
    forest: usize,
    water: usize,
    grass: usize,
) -> Vec<(AxialHex, TileKind)> {
    let mut pool: Vec<AxialHex> = union.to_vec();
    pool.shuffle(rng);

    let mut seeds = Vec::with_capacity(forest + water + grass);
    let mut cursor = 0;
    for (count, kind) in [
        (forest, TileKind::Forest),
        (water, TileKind::Water),
        (grass, TileKind::Grass),
    ] {
        let end = (cursor + count).min(pool.len());
        for hex in &pool[cursor..end] {
            seeds.push((*hex, kind));
        }
        cursor = end;
    }
    seeds
}

/// Assign every union hex the kind of its nearest seed.
///
/// Returns a vector aligned with `union`; entries are `None` only when the
/// seed list is empty (the grass fill catches those later).
#[must_use]
pub fn assign_biomes(
    union: &[AxialHex],
    seeds: &[(AxialHex, TileKind)],
) -> Vec<Option<TileKind>> {
    if seeds.is_empty() {
        return vec![None; union.len()];
    }
    union
        .par_iter()
        .map(|hex| {
            let mut best: Option<(u32, usize)> = None;
            for (i, (seed, _)) in seeds.iter().enumerate() {
                let d = hex.distance(*seed);
                // Strict less-than keeps the earliest seed on ties.
                if best.is_none_or(|(bd, _)| d < bd) {
                    best = Some((d, i));
                }
            }
            best.map(|(_, i)| seeds[i].1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn union() -> Vec<AxialHex> {
        hex::chunk_grid(AxialHex::ZERO, 4)
    }

    #[test]
    fn seed_counts_and_order() {
        let union = union();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let seeds = scatter_seeds(&union, &mut rng, 4, 3, 6);
        assert_eq!(seeds.len(), 13);
        assert!(seeds[..4].iter().all(|(_, k)| *k == TileKind::Forest));
        assert!(seeds[4..7].iter().all(|(_, k)| *k == TileKind::Water));
        assert!(seeds[7..].iter().all(|(_, k)| *k == TileKind::Grass));
        // Without replacement: all seed hexes distinct.
        let set: std::collections::HashSet<_> = seeds.iter().map(|(h, _)| *h).collect();
        assert_eq!(set.len(), 13);
    }

    #[test]
    fn small_union_truncates_later_categories() {
        let union = vec![AxialHex::ZERO, AxialHex::new(1, 0), AxialHex::new(0, 1)];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let seeds = scatter_seeds(&union, &mut rng, 2, 2, 2);
        assert_eq!(seeds.len(), 3);
        assert_eq!(
            seeds.iter().filter(|(_, k)| *k == TileKind::Forest).count(),
            2
        );
        assert_eq!(
            seeds.iter().filter(|(_, k)| *k == TileKind::Water).count(),
            1
        );
    }

    #[test]
    fn every_hex_adopts_nearest_seed() {
        let union = union();
        let seeds = vec![
            (AxialHex::new(-3, 0), TileKind::Forest),
            (AxialHex::new(3, 0), TileKind::Water),
        ];
        let kinds = assign_biomes(&union, &seeds);
        for (hex, kind) in union.iter().zip(kinds.iter()) {
            let df = hex.distance(AxialHex::new(-3, 0));
            let dw = hex.distance(AxialHex::new(3, 0));
            // Forest is declared first, so ties go to forest.
            let expected = if df <= dw {
                TileKind::Forest
            } else {
                TileKind::Water
            };
            assert_eq!(*kind, Some(expected), "at {hex}");
        }
    }

    #[test]
    fn empty_seed_list_assigns_nothing() {
        let union = union();
        let kinds = assign_biomes(&union, &[]);
        assert!(kinds.iter().all(Option::is_none));
    }

    #[test]
    fn assignment_is_deterministic() {
        let union = union();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let seeds = scatter_seeds(&union, &mut rng, 4, 3, 6);
        let a = assign_biomes(&union, &seeds);
        let b = assign_biomes(&union, &seeds);
        assert_eq!(a, b);
    }
}
