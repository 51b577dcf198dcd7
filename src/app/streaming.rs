//! Runtime sync of settings into the live streaming configuration.
//!
//! Cadences, radii and the queue budget may change on a settings hot
//! reload. The chunk radius and hex size are world-wide constants for the
//! session and are deliberately not synced.

use bevy::prelude::*;
use hexworld::chunk::{GenerationQueue, StreamingConfig};
use hexworld::settings::Settings;

/// Apply tunable streaming settings to the running config and queue.
#[allow(clippy::needless_pass_by_value)]
pub fn sync_streaming_settings(
    settings: Res<Settings>,
    mut cfg: ResMut<StreamingConfig>,
    mut queue: ResMut<GenerationQueue>,
    mut last: Local<Option<(u64, u64, f64, f64, f64)>>,
) {
    let key = (
        settings.streaming.check_interval_frames,
        settings.streaming.border_check_interval_frames,
        settings.streaming.disable_radius_chunks,
        settings.streaming.preload_radius_chunks,
        settings.streaming.queue_frame_budget_ms,
    );
    if *last == Some(key) {
        return;
    }

    cfg.check_interval_frames = settings.streaming.check_interval_frames;
    cfg.border_check_interval_frames = settings.streaming.border_check_interval_frames;
    cfg.disable_radius_chunks = settings.streaming.disable_radius_chunks;
    cfg.preload_radius_chunks = settings.streaming.preload_radius_chunks;
    queue.set_budget_ms(settings.streaming.queue_frame_budget_ms);

    *last = Some(key);
}
