//! Scene setup: avatar, camera, lighting, scene-registry registration.

use bevy::prelude::*;
use hexworld::player::{Avatar, AvatarCamera};
use hexworld::render::{RenderHandle, SceneRegistry};

/// Spawn the avatar, the follow camera and the lights, and register every
/// spawned scene position with the floating-origin registry.
pub fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut registry: ResMut<SceneRegistry>,
) {
    let avatar = commands
        .spawn((
            PbrBundle {
                mesh: meshes.add(Capsule3d::new(1.2, 2.4)),
                material: materials.add(StandardMaterial {
                    base_color: Color::srgb(0.85, 0.3, 0.2),
                    ..default()
                }),
                transform: Transform::from_xyz(0.0, 1.8, 0.0),
                ..default()
            },
            Avatar,
        ))
        .id();
    registry.register(RenderHandle(avatar.to_bits()));

    let camera = commands
        .spawn((
            Camera3dBundle {
                transform: Transform::from_xyz(0.0, 90.0, 70.0)
                    .looking_at(Vec3::ZERO, Vec3::Y),
                ..default()
            },
            AvatarCamera {
                offset: Vec3::new(0.0, 90.0, 70.0),
            },
        ))
        .id();
    registry.register(RenderHandle(camera.to_bits()));

    let sun = commands
        .spawn(DirectionalLightBundle {
            directional_light: DirectionalLight {
                illuminance: 12_000.0,
                shadows_enabled: true,
                ..default()
            },
            transform: Transform::from_xyz(40.0, 120.0, 40.0)
                .looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        })
        .id();
    registry.register(RenderHandle(sun.to_bits()));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 220.0,
    });
}
