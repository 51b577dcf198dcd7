//! Renderer integration seam.
//!
//! The engine core never talks to a rendering backend directly; it goes
//! through the four-operation [`TileInstancer`] interface and stores only the
//! opaque [`RenderHandle`] a backend hands back. The Bevy-backed
//! implementation lives in `instancing.rs`; tests use [`NullInstancer`].

use crate::hex::{self, AxialHex};
use bevy::prelude::*;

pub mod instancing;

/// Depth of the hex tile model in world units. The default hex size is
/// derived from this so tile meshes touch edge to edge.
pub const TILE_MODEL_DEPTH: f64 = 20.0;

/// Opaque per-tile instance handle. Owned by the renderer; the core only
/// stores and clears it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

/// The four operations a rendering backend implements, once per backend.
pub trait TileInstancer {
    /// Create an instance for a tile and hand back its opaque handle.
    /// Returns `None` when the backend declines (e.g. headless runs).
    fn create_instance(
        &mut self,
        hex: AxialHex,
        kind: crate::chunk::TileKind,
        enabled: bool,
    ) -> Option<RenderHandle>;

    /// Translate an existing instance by `delta` (renderer space).
    fn move_instance(&mut self, handle: RenderHandle, delta: Vec3);

    /// Show or hide an existing instance.
    fn set_instance_enabled(&mut self, handle: RenderHandle, enabled: bool);

    /// Destroy an instance. The handle is invalid afterwards.
    fn dispose_instance(&mut self, handle: RenderHandle);
}

/// Event requesting the renderer to re-sync instances with the world map.
#[derive(Event, Default)]
pub struct RenderSync;

/// Scene positions registered with the core so floating-origin rebases can
/// shift them. Tile instances, lights, the avatar and the camera all end up
/// here.
#[derive(Resource, Default)]
pub struct SceneRegistry {
    handles: Vec<RenderHandle>,
}

impl SceneRegistry {
    pub fn register(&mut self, handle: RenderHandle) {
        self.handles.push(handle);
    }

    pub fn unregister(&mut self, handle: RenderHandle) {
        self.handles.retain(|h| *h != handle);
    }

    #[must_use]
    pub fn handles(&self) -> &[RenderHandle] {
        &self.handles
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }
}

/// Renderer-space position of a tile's center. The renderer's x axis is the
/// mirror of the hex-space x axis; this sign convention has to match
/// `FloatingOrigin::true_hex` or streamed chunks drift away from the avatar.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn tile_render_position(hex: AxialHex, hex_size: f64) -> Vec3 {
    let (x, z) = hex::hex_to_world(hex, hex_size);
    Vec3::new(-x as f32, 0.0, z as f32)
}

/// Instancer that accepts every call and records nothing but counts.
/// Used by headless paths and unit tests.
#[derive(Default)]
pub struct NullInstancer {
    pub created: usize,
    pub moved: usize,
    pub toggled: usize,
    pub disposed: usize,
    next_id: u64,
}

impl TileInstancer for NullInstancer {
    fn create_instance(
        &mut self,
        _hex: AxialHex,
        _kind: crate::chunk::TileKind,
        _enabled: bool,
    ) -> Option<RenderHandle> {
        self.created += 1;
        self.next_id += 1;
        Some(RenderHandle(self.next_id))
    }

    fn move_instance(&mut self, _handle: RenderHandle, _delta: Vec3) {
        self.moved += 1;
    }

    fn set_instance_enabled(&mut self, _handle: RenderHandle, _enabled: bool) {
        self.toggled += 1;
    }

    fn dispose_instance(&mut self, _handle: RenderHandle) {
        self.disposed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_position_mirrors_x() {
        let p = tile_render_position(AxialHex::new(1, 0), 1.0);
        let (wx, wz) = hex::hex_to_world(AxialHex::new(1, 0), 1.0);
        assert!((f64::from(p.x) + wx).abs() < 1e-6);
        assert!((f64::from(p.z) - wz).abs() < 1e-6);
    }

    #[test]
    fn scene_registry_register_unregister() {
        let mut reg = SceneRegistry::default();
        reg.register(RenderHandle(1));
        reg.register(RenderHandle(2));
        reg.unregister(RenderHandle(1));
        assert_eq!(reg.handles(), &[RenderHandle(2)]);
    }
}
