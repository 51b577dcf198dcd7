//! Bevy implementation of the tile instancing interface.
//!
//! One shared hex-prism mesh, one material per tile kind, one entity per
//! tile keyed by its `(q, r)` hex. The sync system reconciles instances with
//! the world map whenever a [`RenderSync`] event fires; enable/disable
//! toggles and disposal go through [`BevyInstancer`] wherever the core asks
//! for them.

use crate::chunk::TileKind;
use crate::hex::AxialHex;
use crate::origin::FloatingOrigin;
use crate::render::{
    tile_render_position, RenderHandle, RenderSync, SceneRegistry, TileInstancer,
};
use crate::settings::Settings;
use crate::world::WorldMap;
use bevy::prelude::*;

/// Visual height of a tile prism, world units.
const TILE_THICKNESS: f32 = 0.6;

/// Shared mesh and per-kind materials for tile instances.
#[derive(Resource)]
pub struct HexTileAssets {
    pub mesh: Handle<Mesh>,
    pub grass: Handle<StandardMaterial>,
    pub building: Handle<StandardMaterial>,
    pub road: Handle<StandardMaterial>,
    pub forest: Handle<StandardMaterial>,
    pub water: Handle<StandardMaterial>,
}

impl HexTileAssets {
    #[must_use]
    pub fn material_for(&self, kind: TileKind) -> Handle<StandardMaterial> {
        match kind {
            TileKind::Grass => self.grass.clone(),
            TileKind::Building => self.building.clone(),
            TileKind::Road => self.road.clone(),
            TileKind::Forest => self.forest.clone(),
            TileKind::Water => self.water.clone(),
        }
    }
}

/// Marker component carried by every tile instance entity.
#[derive(Component)]
pub struct TileInstance {
    pub hex: AxialHex,
}

/// Build the shared tile mesh and the per-kind materials.
#[allow(clippy::needless_pass_by_value)]
pub fn setup_tile_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<Settings>,
) {
    #[allow(clippy::cast_possible_truncation)]
    let radius = settings.world.hex_size as f32;
    let mesh = meshes.add(Cylinder::new(radius, TILE_THICKNESS).mesh().resolution(6));

    let mut flat = |color: Color| {
        materials.add(StandardMaterial {
            base_color: color,
            perceptual_roughness: 0.9,
            ..default()
        })
    };

    let assets = HexTileAssets {
        mesh,
        grass: flat(Color::srgb(0.38, 0.62, 0.26)),
        building: flat(Color::srgb(0.62, 0.58, 0.54)),
        road: flat(Color::srgb(0.28, 0.26, 0.24)),
        forest: flat(Color::srgb(0.16, 0.42, 0.20)),
        water: flat(Color::srgb(0.18, 0.38, 0.66)),
    };
    commands.insert_resource(assets);
}

/// Commands-backed instancer handed to the engine core.
pub struct BevyInstancer<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub assets: Option<&'a HexTileAssets>,
    pub hex_size: f64,
    /// Accumulated origin shift; converts absolute tile positions into the
    /// current local frame.
    pub origin_world: Vec3,
}

impl TileInstancer for BevyInstancer<'_, '_, '_> {
    fn create_instance(
        &mut self,
        hex: AxialHex,
        kind: TileKind,
        enabled: bool,
    ) -> Option<RenderHandle> {
        let assets = self.assets?;
        let position = tile_render_position(hex, self.hex_size) - self.origin_world;
        let entity = self
            .commands
            .spawn((
                PbrBundle {
                    mesh: assets.mesh.clone(),
                    material: assets.material_for(kind),
                    transform: Transform::from_translation(position),
                    visibility: if enabled {
                        Visibility::Inherited
                    } else {
                        Visibility::Hidden
                    },
                    ..default()
                },
                TileInstance { hex },
            ))
            .id();
        Some(RenderHandle(entity.to_bits()))
    }

    fn move_instance(&mut self, handle: RenderHandle, delta: Vec3) {
        let entity = Entity::from_bits(handle.0);
        self.commands.entity(entity).add(move |mut e: EntityWorldMut| {
            if let Some(mut tf) = e.get_mut::<Transform>() {
                tf.translation += delta;
            }
        });
    }

    fn set_instance_enabled(&mut self, handle: RenderHandle, enabled: bool) {
        let entity = Entity::from_bits(handle.0);
        self.commands.entity(entity).insert(if enabled {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        });
    }

    fn dispose_instance(&mut self, handle: RenderHandle) {
        let entity = Entity::from_bits(handle.0);
        self.commands.entity(entity).despawn();
    }
}

/// Create instances for tiles that gained a kind since the last sync.
///
/// Runs only when a [`RenderSync`] event fired this frame. Mesh
/// instantiation is keyed by the tile hex; a tile gets exactly one instance
/// for its lifetime, and visibility tracks the chunk's enabled flag through
/// `Chunk::set_enabled`.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_tile_instances(
    mut events: EventReader<RenderSync>,
    mut commands: Commands,
    assets: Option<Res<HexTileAssets>>,
    mut world: ResMut<WorldMap>,
    origin: Res<FloatingOrigin>,
    settings: Res<Settings>,
    mut registry: ResMut<SceneRegistry>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();
    let Some(assets) = assets.as_ref() else {
        return;
    };

    let mut instancer = BevyInstancer {
        commands: &mut commands,
        assets: Some(assets),
        hex_size: settings.world.hex_size,
        origin_world: origin.origin_world,
    };

    let mut spawned = 0usize;
    for chunk in world.chunks_mut() {
        if !chunk.tiles_generated {
            continue;
        }
        let enabled = chunk.enabled;
        for tile in &mut chunk.tiles {
            if tile.instance_handle.is_some() {
                continue;
            }
            let Some(kind) = tile.kind else {
                continue;
            };
            if let Some(handle) = instancer.create_instance(tile.hex, kind, enabled) {
                tile.instance_handle = Some(handle);
                registry.register(handle);
                spawned += 1;
            }
        }
    }
    if spawned > 0 {
        debug!("instanced {spawned} tiles");
    }
}
