//! Diagnostics: the injected engine clock and an F3 state dump.
//!
//! The clock is the engine's only time source for scheduling decisions, so
//! the frame-budget logic in the generation queue can be driven by a manual
//! clock in tests. The F3 dump writes a timestamped snapshot of streaming
//! and layout state to `./debug-dumps/` for quick inspection without a
//! profiler.

use crate::chunk::{GenerationQueue, LayoutStats};
use crate::world::WorldMap;
use bevy::prelude::*;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use sysinfo::{PidExt, ProcessExt, SystemExt};

/// Monotonic time source injected into the scheduler.
pub trait Clock {
    /// Elapsed time since the clock was created.
    fn now(&self) -> Duration;
}

/// Wall clock backed by `Instant`. The production time source.
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    #[must_use]
    pub fn new() -> Self {
        WallClock {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Hand-advanced clock for tests. Cloned handles share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
    tick_micros: u64,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        ManualClock::default()
    }

    /// Clock that also advances itself by `tick` on every read, so a budget
    /// check observes elapsed time without explicit `advance` calls.
    #[must_use]
    pub fn with_autotick(tick: Duration) -> Self {
        ManualClock {
            micros: Arc::new(AtomicU64::new(0)),
            tick_micros: u64::try_from(tick.as_micros()).unwrap_or(u64::MAX),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(u64::try_from(by.as_micros()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let t = self.micros.fetch_add(self.tick_micros, Ordering::SeqCst);
        Duration::from_micros(t)
    }
}

/// Throttle state for the periodic streaming diagnostics log line.
#[derive(Resource, Default)]
pub struct StreamingDiag {
    pub last_log_seconds: f64,
}

pub struct DebugDumpPlugin;

impl Plugin for DebugDumpPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, debug_dump_system);
    }
}

fn kb_to_mb(kb: u64) -> String {
    format!("{:.2} MB", (kb as f64) / 1024.0)
}

/// Dump streaming/layout/queue state to a timestamped text file when F3 is
/// pressed.
#[allow(clippy::needless_pass_by_value)]
fn debug_dump_system(
    keys: Res<ButtonInput<KeyCode>>,
    world: Option<Res<WorldMap>>,
    queue: Option<Res<GenerationQueue>>,
    stats: Option<Res<LayoutStats>>,
) {
    if !keys.just_pressed(KeyCode::F3) {
        return;
    }

    let now = SystemTime::now();
    let ts_secs = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let dt: DateTime<Utc> = DateTime::from(now);
    let dir = "debug-dumps";
    let fname = format!("{}/debug-{}.txt", dir, ts_secs);

    let mut out = String::new();
    writeln!(out, "hexworld debug dump").ok();
    writeln!(out, "Timestamp: {} (epoch secs: {})", dt.format("%Y-%m-%d %H:%M:%S"), ts_secs).ok();

    if let Some(world) = world.as_ref() {
        writeln!(
            out,
            "Chunks: present={} enabled={} indexed_tiles={}",
            world.chunk_count(),
            world.enabled_count(),
            world.indexed_tile_count()
        )
        .ok();
        let generated = world.chunks().filter(|c| c.tiles_generated).count();
        let initialized = world.chunks().filter(|c| c.initialized).count();
        writeln!(out, "Lifecycle: initialized={} generated={}", initialized, generated).ok();
    }
    if let Some(queue) = queue.as_ref() {
        writeln!(out, "Queue: depth={}", queue.depth()).ok();
    }
    if let Some(stats) = stats.as_ref() {
        let totals = stats.totals();
        let mut line = String::from("Tiles:");
        for kind in crate::chunk::TileKind::ALL {
            line.push_str(&format!(" {}={}", kind.label(), totals.count(kind)));
        }
        writeln!(out, "{line}").ok();
    }

    // Process / system memory snapshot.
    let mut sys = sysinfo::System::new_all();
    sys.refresh_all();
    let pid = sysinfo::Pid::from_u32(std::process::id());
    if let Some(process) = sys.process(pid) {
        writeln!(
            out,
            "Process memory: {} (virtual {})",
            kb_to_mb(process.memory()),
            kb_to_mb(process.virtual_memory())
        )
        .ok();
    }
    writeln!(
        out,
        "System memory: total={} used={}",
        kb_to_mb(sys.total_memory()),
        kb_to_mb(sys.used_memory())
    )
    .ok();

    if let Err(e) = fs::create_dir_all(dir) {
        error!("debug dump: failed to create dir '{}': {}", dir, e);
        return;
    }
    if let Err(e) = fs::write(&fname, out) {
        error!("debug dump: failed to write {}: {}", fname, e);
    } else {
        info!("wrote debug dump: {}", fname);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_shared_handles() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        assert_eq!(clock.now(), Duration::ZERO);
        handle.advance(Duration::from_millis(7));
        assert_eq!(clock.now(), Duration::from_millis(7));
    }

    #[test]
    fn wall_clock_is_monotonic() {
        let clock = WallClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
