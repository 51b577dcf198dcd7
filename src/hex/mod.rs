//! Axial/cube hex coordinate algebra used by every other module.
//!
//! The layout is pointy-top. World conversions take the hex size `s`
//! (center-to-vertex distance) and map axial `(q, r)` to a planar `(x, z)`
//! pair. Ring enumeration and chunk-packing neighbor generation both work in
//! cube space; everything stored long-term is axial.

use std::ops::{Add, Sub};

pub const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// The six cube unit directions, in the fixed order the ring walker and the
/// neighbor queries rely on.
pub const CUBE_DIRECTIONS: [CubeHex; 6] = [
    CubeHex { q: 1, r: 0, s: -1 },
    CubeHex { q: 1, r: -1, s: 0 },
    CubeHex { q: 0, r: -1, s: 1 },
    CubeHex { q: -1, r: 0, s: 1 },
    CubeHex { q: -1, r: 1, s: 0 },
    CubeHex { q: 0, r: 1, s: -1 },
];

/// Axial hex coordinate. The implicit third component is `s = -q - r`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AxialHex {
    pub q: i32,
    pub r: i32,
}

impl AxialHex {
    pub const ZERO: AxialHex = AxialHex { q: 0, r: 0 };

    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        AxialHex { q, r }
    }

    #[must_use]
    pub const fn to_cube(self) -> CubeHex {
        CubeHex {
            q: self.q,
            r: self.r,
            s: -self.q - self.r,
        }
    }

    /// Hex (cube) distance to `other`.
    #[must_use]
    pub fn distance(self, other: AxialHex) -> u32 {
        let dq = (self.q - other.q).abs();
        let ds = (self.q + self.r - other.q - other.r).abs();
        let dr = (self.r - other.r).abs();
        ((dq + ds + dr) / 2) as u32
    }

    /// The six adjacent hexes, ordered like `CUBE_DIRECTIONS`.
    #[must_use]
    pub fn neighbors(self) -> [AxialHex; 6] {
        let mut out = [AxialHex::ZERO; 6];
        for (slot, dir) in out.iter_mut().zip(CUBE_DIRECTIONS.iter()) {
            *slot = self + dir.to_axial();
        }
        out
    }

    /// Rotate 60 degrees clockwise around the origin: `(q, r) -> (q + r, -q)`.
    #[must_use]
    pub const fn rotate_cw(self) -> AxialHex {
        AxialHex {
            q: self.q + self.r,
            r: -self.q,
        }
    }
}

impl Add for AxialHex {
    type Output = AxialHex;
    fn add(self, rhs: AxialHex) -> AxialHex {
        AxialHex::new(self.q + rhs.q, self.r + rhs.r)
    }
}

impl Sub for AxialHex {
    type Output = AxialHex;
    fn sub(self, rhs: AxialHex) -> AxialHex {
        AxialHex::new(self.q - rhs.q, self.r - rhs.r)
    }
}

impl std::fmt::Display for AxialHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// Cube hex coordinate with the invariant `q + r + s = 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CubeHex {
    pub q: i32,
    pub r: i32,
    pub s: i32,
}

impl CubeHex {
    #[must_use]
    pub const fn to_axial(self) -> AxialHex {
        AxialHex {
            q: self.q,
            r: self.r,
        }
    }

    #[must_use]
    pub fn scaled(self, k: i32) -> CubeHex {
        CubeHex {
            q: self.q * k,
            r: self.r * k,
            s: self.s * k,
        }
    }
}

impl Add for CubeHex {
    type Output = CubeHex;
    fn add(self, rhs: CubeHex) -> CubeHex {
        CubeHex {
            q: self.q + rhs.q,
            r: self.r + rhs.r,
            s: self.s + rhs.s,
        }
    }
}

/// Convert an axial hex to its world-space `(x, z)` center.
///
/// # Arguments
/// * `hex` - the axial coordinate to convert
/// * `size` - hex size `s` (center-to-vertex distance) in world units
#[must_use]
pub fn hex_to_world(hex: AxialHex, size: f64) -> (f64, f64) {
    let x = size * (SQRT_3 * f64::from(hex.q) + SQRT_3 / 2.0 * f64::from(hex.r));
    let z = size * (3.0 / 2.0) * f64::from(hex.r);
    (x, z)
}

/// Convert a world-space `(x, z)` point to the hex containing it.
///
/// Computes fractional axial coordinates, rounds each cube component to the
/// nearest integer, then resets the component with the largest rounding
/// error so that `q + r + s = 0` holds again.
#[must_use]
pub fn world_to_hex(x: f64, z: f64, size: f64) -> AxialHex {
    let qf = (SQRT_3 / 3.0 * x - z / 3.0) / size;
    let rf = (2.0 * z / 3.0) / size;
    let sf = -qf - rf;

    let mut q = qf.round();
    let mut r = rf.round();
    let s = sf.round();

    let dq = (q - qf).abs();
    let dr = (r - rf).abs();
    let ds = (s - sf).abs();

    if dq > dr && dq > ds {
        q = -r - s;
    } else if dr > ds {
        r = -q - s;
    }
    // s is implicit in axial form, so resetting s needs no write-back.

    #[allow(clippy::cast_possible_truncation)]
    let (qi, ri) = (q as i32, r as i32);
    AxialHex::new(qi, ri)
}

/// Number of hexes in a full chunk grid of the given ring radius.
#[must_use]
pub const fn grid_len(radius: u32) -> usize {
    (3 * radius * (radius + 1) + 1) as usize
}

/// Enumerate the ring at exact distance `radius` around `center`.
///
/// `radius = 0` yields just the center. Otherwise the walk starts at
/// `center + radius * CUBE_DIRECTIONS[4]` and takes `radius` steps along each
/// of the six directions in order, appending each visited hex; the walk
/// closes back on its starting hex, which is appended last.
#[must_use]
pub fn ring(center: AxialHex, radius: u32) -> Vec<AxialHex> {
    if radius == 0 {
        return vec![center];
    }
    let r = radius as i32;
    let mut out = Vec::with_capacity((6 * radius) as usize);
    let mut cursor = center.to_cube() + CUBE_DIRECTIONS[4].scaled(r);
    for dir in CUBE_DIRECTIONS {
        for _ in 0..radius {
            cursor = cursor + dir;
            out.push(cursor.to_axial());
        }
    }
    out
}

/// Enumerate the full grid of a chunk: the union of rings `0..=radius`,
/// innermost first. Length is always `grid_len(radius)`.
#[must_use]
pub fn chunk_grid(center: AxialHex, radius: u32) -> Vec<AxialHex> {
    let mut out = Vec::with_capacity(grid_len(radius));
    for k in 0..=radius {
        out.extend(ring(center, k));
    }
    out
}

/// The six packing-neighbor chunk centers for a chunk of ring radius
/// `radius` centered at `center`.
///
/// The base offset is `(1, 0)` for single-tile chunks and `(R, R + 1)`
/// otherwise. The base is pre-rotated by four clockwise 60-degree steps to
/// align with the chunk orientation, then six successive clockwise rotations
/// emit the neighbor offsets. Every emitted center sits at hex distance
/// `2R + 1` from `center` (`1` when `R = 0`), so adjacent chunk boundaries
/// touch without gaps and overlap only on shared boundary hexes.
#[must_use]
pub fn packing_neighbors(center: AxialHex, radius: u32) -> [AxialHex; 6] {
    let r = radius as i32;
    let mut offset = if radius == 0 {
        AxialHex::new(1, 0)
    } else {
        AxialHex::new(r, r + 1)
    };
    for _ in 0..4 {
        offset = offset.rotate_cw();
    }

    let mut out = [AxialHex::ZERO; 6];
    for slot in &mut out {
        *slot = center + offset;
        offset = offset.rotate_cw();
    }
    out
}

/// Nearest point of the chunk-packing lattice to an arbitrary hex.
///
/// The lattice is spanned by the base offset `(R, R + 1)` and its first
/// clockwise rotation `(2R + 1, -R)`; the determinant of that basis is
/// `-(3R^2 + 3R + 1)`, i.e. minus the chunk tile count. The fractional
/// lattice coordinates of `hex` are rounded and a 3x3 neighborhood is
/// searched for the closest center, so teleporting avatars resolve onto the
/// packing grid even with no chunk present nearby.
#[must_use]
pub fn nearest_packing_center(hex: AxialHex, radius: u32) -> AxialHex {
    if radius == 0 {
        return hex;
    }
    let r = radius as i32;
    let v1 = AxialHex::new(r, r + 1);
    let v2 = v1.rotate_cw();
    let det = f64::from(v1.q * v2.r - v1.r * v2.q);

    let af = (f64::from(hex.q * v2.r - hex.r * v2.q)) / det;
    let bf = (f64::from(v1.q * hex.r - v1.r * hex.q)) / det;

    #[allow(clippy::cast_possible_truncation)]
    let (a0, b0) = (af.round() as i32, bf.round() as i32);

    let mut best = AxialHex::ZERO;
    let mut best_dist = u32::MAX;
    for da in -1..=1 {
        for db in -1..=1 {
            let a = a0 + da;
            let b = b0 + db;
            let center = AxialHex::new(a * v1.q + b * v2.q, a * v1.r + b * v2.r);
            let d = center.distance(hex);
            if d < best_dist || (d == best_dist && center < best) {
                best = center;
                best_dist = d;
            }
        }
    }
    best
}
