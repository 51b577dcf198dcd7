//! Debug overlay (F1): streaming state at a glance.
//!
//! The overlay refreshes on a half-second timer to keep diagnostics queries
//! off the per-frame path. It shows FPS, the avatar's true hex and current
//! chunk, chunk lifecycle counters, queue depth and the layout tile totals.

use crate::chunk::{GenerationQueue, LayoutStats, ProximityController, StreamingConfig};
use crate::origin::FloatingOrigin;
use crate::player::Avatar;
use crate::world::WorldMap;
use bevy::diagnostic::{Diagnostic, DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;

/// Overlay visibility state.
#[derive(Resource, Default)]
pub struct DebugOverlayState {
    pub visible: bool,
}

#[derive(Resource, Default)]
pub struct DebugOverlayTimer(pub Timer);

/// Marker for the overlay's text node.
#[derive(Component)]
pub struct DebugOverlayText;

pub fn setup_debug_overlay(mut commands: Commands) {
    commands.insert_resource(DebugOverlayTimer(Timer::from_seconds(
        0.5,
        TimerMode::Repeating,
    )));
    commands.insert_resource(DebugOverlayState::default());
}

pub fn spawn_debug_overlay(mut commands: Commands) {
    commands.spawn((
        TextBundle::from_section(
            "",
            TextStyle {
                font_size: 16.0,
                color: Color::srgb(0.9, 0.9, 0.8),
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            top: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        }),
        DebugOverlayText,
    ));
}

/// Toggle the overlay when F1 is pressed.
#[allow(clippy::needless_pass_by_value)]
pub fn toggle_debug_overlay(
    mut state: ResMut<DebugOverlayState>,
    input: Res<ButtonInput<KeyCode>>,
) {
    if input.just_pressed(KeyCode::F1) {
        state.visible = !state.visible;
    }
}

#[derive(bevy::ecs::system::SystemParam)]
pub struct DebugOverlayCtx<'w, 's> {
    pub diagnostics: Res<'w, DiagnosticsStore>,
    pub state: Res<'w, DebugOverlayState>,
    pub world: Option<Res<'w, WorldMap>>,
    pub queue: Option<Res<'w, GenerationQueue>>,
    pub controller: Option<Res<'w, ProximityController>>,
    pub stats: Option<Res<'w, LayoutStats>>,
    pub origin: Res<'w, FloatingOrigin>,
    pub cfg: Res<'w, StreamingConfig>,
    pub time: Res<'w, Time>,
    pub timer: ResMut<'w, DebugOverlayTimer>,
    pub query: Query<'w, 's, &'static mut Text, With<DebugOverlayText>>,
    pub avatar_query: Query<'w, 's, &'static Transform, With<Avatar>>,
}

/// Refresh the overlay text on its interval.
pub fn update_debug_overlay(mut ctx: DebugOverlayCtx<'_, '_>) {
    if !ctx.timer.0.tick(ctx.time.delta()).just_finished() {
        return;
    }
    let Ok(mut text) = ctx.query.get_single_mut() else {
        return;
    };
    if !ctx.state.visible {
        text.sections[0].value.clear();
        return;
    }

    let fps = ctx
        .diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(Diagnostic::smoothed)
        .unwrap_or(0.0);

    let mut out = format!("FPS: {fps:.0}\n");
    if let Ok(avatar) = ctx.avatar_query.get_single() {
        let tile = ctx.origin.true_hex(avatar.translation, ctx.cfg.hex_size);
        out.push_str(&format!(
            "tile: {tile}  offset: {}\n",
            ctx.origin.world_hex_offset
        ));
    }
    if let Some(controller) = ctx.controller.as_ref() {
        out.push_str(&format!(
            "chunk: {}{}\n",
            controller
                .current_chunk()
                .map_or_else(|| "none".to_string(), |c| c.to_string()),
            if controller.near_border() { " (border)" } else { "" }
        ));
    }
    if let Some(world) = ctx.world.as_ref() {
        let generated = world.chunks().filter(|c| c.tiles_generated).count();
        out.push_str(&format!(
            "chunks: {} present, {} enabled, {} generated\n",
            world.chunk_count(),
            world.enabled_count(),
            generated
        ));
    }
    if let Some(queue) = ctx.queue.as_ref() {
        out.push_str(&format!("queue: {}\n", queue.depth()));
    }
    if let Some(stats) = ctx.stats.as_ref() {
        let t = stats.totals();
        out.push_str(&format!(
            "tiles: {} grass, {} forest, {} water, {} road, {} building\n",
            t.grass, t.forest, t.water, t.road, t.building
        ));
    }
    text.sections[0].value = out;
}
