//! Avatar movement and the follow camera.
//!
//! Motion is planar: WASD moves the avatar on the ground plane, shift
//! sprints. The camera trails the avatar from a fixed offset. Both entities
//! are registered with the scene registry so floating-origin rebases shift
//! them together with the world.

use bevy::prelude::*;

const WALK_SPEED: f32 = 24.0;
const SPRINT_MULTIPLIER: f32 = 4.0;

/// The player-controlled avatar.
#[derive(Component)]
pub struct Avatar;

/// Camera trailing the avatar at a fixed offset.
#[derive(Component)]
pub struct AvatarCamera {
    pub offset: Vec3,
}

/// Planar WASD movement, scaled by delta time.
#[allow(clippy::needless_pass_by_value)]
pub fn avatar_movement(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut query: Query<&mut Transform, With<Avatar>>,
) {
    let Ok(mut transform) = query.get_single_mut() else {
        return;
    };

    let mut dir = Vec3::ZERO;
    if keyboard.pressed(KeyCode::KeyW) {
        dir.z -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyS) {
        dir.z += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyA) {
        dir.x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) {
        dir.x += 1.0;
    }
    if dir.length_squared() < 1e-6 {
        return;
    }

    let mut speed = WALK_SPEED;
    if keyboard.pressed(KeyCode::ShiftLeft) {
        speed *= SPRINT_MULTIPLIER;
    }
    transform.translation += dir.normalize() * speed * time.delta_seconds();
}

/// Keep the camera at its offset behind the avatar, looking at it.
#[allow(clippy::needless_pass_by_value)]
pub fn camera_follow(
    avatar: Query<&Transform, (With<Avatar>, Without<AvatarCamera>)>,
    mut cameras: Query<(&mut Transform, &AvatarCamera)>,
) {
    let Ok(target) = avatar.get_single() else {
        return;
    };
    for (mut transform, camera) in &mut cameras {
        transform.translation = target.translation + camera.offset;
        transform.look_at(target.translation, Vec3::Y);
    }
}
