use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy::window::{PresentMode, Window, WindowPlugin};

use hexworld::chunk::queue::process_generation_queue;
use hexworld::chunk::streaming::stream_chunks;
use hexworld::chunk::{GenerationQueue, LayoutStats, ProximityController, StreamingConfig};
use hexworld::diag::{DebugDumpPlugin, StreamingDiag, WallClock};
use hexworld::layout::{self, constraints, LayoutGenerator};
use hexworld::origin::{rebase_origin, FloatingOrigin};
use hexworld::player::{avatar_movement, camera_follow};
use hexworld::render::instancing::{setup_tile_assets, sync_tile_instances};
use hexworld::render::{RenderSync, SceneRegistry};
use hexworld::settings::loader as settings_loader;
use hexworld::ui::{
    setup_debug_overlay, spawn_debug_overlay, toggle_debug_overlay, update_debug_overlay,
};
use hexworld::world::WorldMap;

mod app;
use app::{setup, sync_streaming_settings};

fn main() {
    let settings = settings_loader::load_settings_from_dir("data/settings");
    let settings_watcher = settings_loader::setup_settings_watcher("data/settings")
        .unwrap_or_else(|_| settings_loader::SettingsWatcher::stub());

    // Free-text layout constraints, if a prompt file is present; the
    // defaults preset otherwise.
    let layout_constraints = std::fs::read_to_string("data/constraints.txt")
        .map(|prompt| constraints::parse(&prompt))
        .unwrap_or_default();

    let streaming_config = StreamingConfig {
        chunk_rings: settings.world.chunk_rings,
        hex_size: settings.world.hex_size,
        check_interval_frames: settings.streaming.check_interval_frames,
        border_check_interval_frames: settings.streaming.border_check_interval_frames,
        disable_radius_chunks: settings.streaming.disable_radius_chunks,
        preload_radius_chunks: settings.streaming.preload_radius_chunks,
    };
    let queue = GenerationQueue::new(
        settings.world.chunk_rings,
        settings.world.hex_size,
        settings.streaming.queue_frame_budget_ms,
        Box::new(WallClock::new()),
    );
    let generator = LayoutGenerator::new(settings.layout.clone(), layout_constraints);
    let origin = FloatingOrigin::new(settings.origin.rebase_threshold);

    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "hexworld".to_string(),
            present_mode: PresentMode::AutoNoVsync,
            ..default()
        }),
        ..default()
    }))
    .add_plugins(FrameTimeDiagnosticsPlugin)
    .add_plugins(DebugDumpPlugin);

    app.insert_resource(settings);
    app.insert_resource(settings_watcher);
    app.insert_resource(streaming_config);
    app.insert_resource(WorldMap::new());
    app.insert_resource(queue);
    app.insert_resource(ProximityController::default());
    app.insert_resource(generator);
    app.insert_resource(origin);
    app.insert_resource(LayoutStats::default());
    app.insert_resource(SceneRegistry::default());
    app.insert_resource(StreamingDiag::default());
    app.add_event::<RenderSync>();

    app.add_systems(Startup, setup);
    app.add_systems(Startup, setup_tile_assets);
    app.add_systems(Startup, setup_debug_overlay);
    app.add_systems(Startup, spawn_debug_overlay);

    // The engine pipeline runs in a fixed order each frame: move, stream,
    // generate, lay out, sync instances, then rebase last so its deferred
    // shifts apply before the next frame reads positions.
    app.add_systems(
        Update,
        (
            avatar_movement,
            camera_follow,
            stream_chunks,
            process_generation_queue,
            layout::run_layout_passes,
            sync_tile_instances,
            rebase_origin,
        )
            .chain(),
    );

    app.add_systems(Update, layout::force_recompute_on_key);
    app.add_systems(Update, sync_streaming_settings);
    app.add_systems(Update, settings_loader::check_settings_changes);
    app.add_systems(Update, toggle_debug_overlay);
    app.add_systems(Update, update_debug_overlay);

    app.run();
}
