//! Settings loading and hot reloading.
//!
//! Settings live in `data/settings/` as RON. If the directory holds several
//! `.ron` files the first one that parses *and* validates wins; otherwise
//! defaults are used. A filesystem watcher flips a shared flag on
//! modification so the reload system can re-read the directory at runtime.

use crate::settings::Settings;
use bevy::prelude::{Res, ResMut, Resource};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// File-watcher resource for settings hot reload.
#[derive(Resource)]
pub struct SettingsWatcher {
    pub changed: Arc<Mutex<bool>>, // Set to true when a watched file changes.
    _watcher: Option<RecommendedWatcher>, // Kept alive to keep the OS watch registered.
}

impl SettingsWatcher {
    /// Watcher with no OS backing; used when watcher creation fails.
    #[must_use]
    pub fn stub() -> Self {
        SettingsWatcher {
            changed: Arc::new(Mutex::new(false)),
            _watcher: None,
        }
    }
}

/// Load settings from a directory of RON files.
///
/// Files are tried in directory order; the first one that parses and passes
/// validation is returned. A file that parses but fails validation is
/// rejected with an error log (bad config never reaches the engine).
///
/// # Return
/// The first valid `Settings`, or defaults when none qualify.
#[must_use]
pub fn load_settings_from_dir(path: &str) -> Settings {
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.extension().is_none_or(|ext| ext != "ron") {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&p) else {
                continue;
            };
            match ron::from_str::<Settings>(&content) {
                Ok(settings) => match settings.validate() {
                    Ok(()) => return settings,
                    Err(e) => {
                        eprintln!("rejected settings file {}: {e}", p.display());
                    }
                },
                Err(e) => {
                    eprintln!("failed to parse {}: {e:?}", p.display());
                }
            }
        }
    }
    Settings::defaults()
}

/// Create a watcher on the settings directory.
///
/// # Errors
/// Returns a `notify::Error` if the underlying OS watcher cannot be created
/// or registered for `path`.
pub fn setup_settings_watcher(path: &str) -> Result<SettingsWatcher, notify::Error> {
    let changed = Arc::new(Mutex::new(false));
    let changed_clone = changed.clone();
    let watched_path: PathBuf = std::fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path));

    let mut watcher: RecommendedWatcher = Watcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, notify::EventKind::Modify(_)) {
                    let relevant = event.paths.iter().any(|p| {
                        std::fs::canonicalize(p)
                            .unwrap_or_else(|_| p.clone())
                            .starts_with(&watched_path)
                    });
                    if relevant {
                        if let Ok(mut flag) = changed_clone.lock() {
                            *flag = true;
                        }
                    }
                }
            }
            Err(e) => eprintln!("settings watch error: {e:?}"),
        },
        Config::default(),
    )?;

    watcher.watch(Path::new(path), RecursiveMode::NonRecursive)?;
    Ok(SettingsWatcher {
        changed,
        _watcher: Some(watcher),
    })
}

/// Reload the settings resource when the watcher reports a change.
#[allow(clippy::needless_pass_by_value)]
pub fn check_settings_changes(watcher: Res<SettingsWatcher>, mut settings: ResMut<Settings>) {
    let mut reload = false;
    match watcher.changed.lock() {
        Ok(mut flag) => {
            if *flag {
                reload = true;
                *flag = false;
            }
        }
        Err(poisoned) => {
            eprintln!("warning: settings watcher mutex poisoned, recovering");
            let mut flag = poisoned.into_inner();
            if *flag {
                reload = true;
                *flag = false;
            }
        }
    }
    if reload {
        println!("Settings changed, reloading...");
        *settings = load_settings_from_dir("data/settings");
    }
}
