//! Floating origin: keeps renderer-space coordinates bounded while the
//! avatar walks arbitrarily far from the nominal origin.
//!
//! `origin_world` tracks the absolute position of the current local frame's
//! origin, so the avatar's local position *is* its drift from the origin.
//! When the drift exceeds the threshold, the rebase computes the hex delta
//! of the drift, snaps the applied shift to the exact world extent of that
//! delta, subtracts it from every registered scene position and accumulates
//! the delta into `world_hex_offset`. Because the shift is an exact lattice
//! vector, the identity
//!
//! `true_hex = world_to_hex(-local_x, local_z, s) + world_hex_offset`
//!
//! holds exactly across any number of rebases. The negated x is the
//! renderer's handedness convention and must match `tile_render_position`.

use crate::hex::{self, AxialHex};
use crate::render::TileInstancer;
use bevy::prelude::*;

/// Result of a rebase: the renderer-space shift that was subtracted from
/// every registered scene position, and the hex delta that was accumulated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OriginShift {
    pub shift: Vec3,
    pub hex_delta: AxialHex,
}

#[derive(Resource, Debug)]
pub struct FloatingOrigin {
    pub origin_world: Vec3,
    pub world_hex_offset: AxialHex,
    pub threshold: f32,
}

impl FloatingOrigin {
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        FloatingOrigin {
            origin_world: Vec3::ZERO,
            world_hex_offset: AxialHex::ZERO,
            threshold,
        }
    }

    /// Check the avatar's drift and rebase if it exceeds the threshold.
    ///
    /// # Arguments
    /// * `avatar_local` - the avatar's position in the current local frame
    /// * `hex_size` - world-wide hex size
    ///
    /// # Return
    /// The applied [`OriginShift`], or `None` when no rebase was needed (or
    /// the drift was too small to span a whole hex).
    pub fn maybe_rebase(&mut self, avatar_local: Vec3, hex_size: f64) -> Option<OriginShift> {
        let drift = Vec3::new(avatar_local.x, 0.0, avatar_local.z);
        if drift.length() <= self.threshold {
            return None;
        }

        let hex_delta = hex::world_to_hex(
            -f64::from(drift.x),
            f64::from(drift.z),
            hex_size,
        );
        if hex_delta == AxialHex::ZERO {
            return None;
        }

        let (dx, dz) = hex::hex_to_world(hex_delta, hex_size);
        #[allow(clippy::cast_possible_truncation)]
        let shift = Vec3::new(-dx as f32, 0.0, dz as f32);

        self.world_hex_offset = self.world_hex_offset + hex_delta;
        self.origin_world += shift;
        info!(
            "floating origin rebased by {shift}; hex offset now {}",
            self.world_hex_offset
        );
        Some(OriginShift { shift, hex_delta })
    }

    /// The avatar's true world hex for a local position.
    #[must_use]
    pub fn true_hex(&self, local: Vec3, hex_size: f64) -> AxialHex {
        hex::world_to_hex(-f64::from(local.x), f64::from(local.z), hex_size)
            + self.world_hex_offset
    }

    /// The avatar's true planar position in hex space, comparable with
    /// `hex::hex_to_world` of chunk centers.
    #[must_use]
    pub fn true_planar(&self, local: Vec3, hex_size: f64) -> (f64, f64) {
        let (ox, oz) = hex::hex_to_world(self.world_hex_offset, hex_size);
        (-f64::from(local.x) + ox, f64::from(local.z) + oz)
    }
}

/// Per-frame rebase system. Runs last in the frame so the deferred
/// translation commands apply before the next frame's policy reads any
/// position.
#[allow(clippy::needless_pass_by_value)]
pub fn rebase_origin(
    mut commands: Commands,
    mut origin: ResMut<FloatingOrigin>,
    registry: Res<crate::render::SceneRegistry>,
    cfg: Res<crate::chunk::StreamingConfig>,
    avatar_query: Query<&Transform, With<crate::player::Avatar>>,
) {
    let Ok(avatar) = avatar_query.get_single() else {
        return;
    };
    let Some(rebase) = origin.maybe_rebase(avatar.translation, cfg.hex_size) else {
        return;
    };
    let mut instancer = crate::render::instancing::BevyInstancer {
        commands: &mut commands,
        assets: None,
        hex_size: cfg.hex_size,
        origin_world: origin.origin_world,
    };
    for handle in registry.handles() {
        instancer.move_instance(*handle, -rebase.shift);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: f64 = 20.0 / 3.0;

    #[test]
    fn no_rebase_inside_threshold() {
        let mut origin = FloatingOrigin::new(1000.0);
        assert_eq!(origin.maybe_rebase(Vec3::new(999.0, 0.0, 0.0), SIZE), None);
        assert_eq!(origin.world_hex_offset, AxialHex::ZERO);
        assert_eq!(origin.origin_world, Vec3::ZERO);
    }

    #[test]
    fn walk_past_threshold_rebases_once() {
        let mut origin = FloatingOrigin::new(1000.0);
        let local = Vec3::new(1500.0, 0.0, 0.0);
        let before = origin.true_hex(local, SIZE);

        let shift = origin
            .maybe_rebase(local, SIZE)
            .expect("drift beyond threshold rebases");

        // The shift is within one hex of the raw drift and the hex offset
        // took up the difference.
        assert!((shift.shift.x - 1500.0).abs() < (SIZE * 2.0) as f32);
        assert_eq!(shift.shift.z, 0.0);
        assert_eq!(origin.origin_world, shift.shift);
        assert_eq!(origin.world_hex_offset, shift.hex_delta);

        // The rebased local position resolves to the same true hex.
        let local_after = local - shift.shift;
        assert_eq!(origin.true_hex(local_after, SIZE), before);
    }

    #[test]
    fn true_hex_identity_holds_across_many_rebases() {
        let mut origin = FloatingOrigin::new(100.0);
        let mut local = Vec3::ZERO;
        let mut expected_true: Option<AxialHex> = None;

        // Walk a jagged path; rebase whenever the threshold trips.
        let legs = [
            Vec3::new(160.0, 0.0, 40.0),
            Vec3::new(-30.0, 0.0, 170.0),
            Vec3::new(220.0, 0.0, -90.0),
            Vec3::new(-400.0, 0.0, -10.0),
        ];
        for leg in legs {
            local += leg;
            let truth = origin.true_hex(local, SIZE);
            if let Some(shift) = origin.maybe_rebase(local, SIZE) {
                local -= shift.shift;
            }
            assert_eq!(origin.true_hex(local, SIZE), truth, "identity broken");
            expected_true = Some(truth);
        }
        assert!(expected_true.is_some());
        // Local coordinates stayed bounded while true position kept growing.
        assert!(local.length() < 100.0 + (SIZE * 2.0) as f32);
    }

    #[test]
    fn true_planar_matches_true_hex() {
        let mut origin = FloatingOrigin::new(50.0);
        let local = Vec3::new(80.0, 0.0, -20.0);
        let truth = origin.true_hex(local, SIZE);
        let shifted = origin.maybe_rebase(local, SIZE).unwrap();
        let local_after = local - shifted.shift;

        let (px, pz) = origin.true_planar(local_after, SIZE);
        assert_eq!(hex::world_to_hex(px, pz, SIZE), truth);
    }

    #[test]
    fn x_axis_is_negated_for_true_hex() {
        let origin = FloatingOrigin::new(1000.0);
        // Positive local x maps to negative hex-space x.
        let h = origin.true_hex(Vec3::new(20.0, 0.0, 0.0), 1.0);
        assert!(h.q < 0, "renderer +x must map to hex -x, got {h}");
    }
}
