//! Settings persistence: one TOML file under the user config directory,
//! `[alarm]` and `[timer]` tables. Load never fails — a missing or
//! malformed file falls back to defaults with a warning; save reports
//! errors so the shell can surface them while the engine keeps its
//! in-memory copy.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use oscalarm_types::{AlarmSettings, PersistenceError, TimerPolicy};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    alarm: AlarmSettings,
    #[serde(default)]
    timer: TimerPolicy,
}

/// Default on-disk location: `<config dir>/oscalarm/settings.toml`.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oscalarm")
        .join("settings.toml")
}

/// Handle on the settings file. Synchronous; durable once `save` returns.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn at_default_path() -> Self {
        Self::new(default_settings_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read settings and policy, falling back to defaults on any problem.
    /// Out-of-range values from a hand-edited file are normalized rather
    /// than trusted.
    pub fn load(&self) -> (AlarmSettings, TimerPolicy) {
        let file = match fs::read_to_string(&self.path) {
            Ok(contents) => match toml::from_str::<SettingsFile>(&contents) {
                Ok(file) => {
                    info!(target: "config", "loaded settings from {}", self.path.display());
                    file
                }
                Err(e) => {
                    warn!(target: "config", "ignoring malformed settings {}: {}", self.path.display(), e);
                    SettingsFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(target: "config", "no settings file at {}, using defaults", self.path.display());
                SettingsFile::default()
            }
            Err(e) => {
                warn!(target: "config", "could not read settings {}: {}", self.path.display(), e);
                SettingsFile::default()
            }
        };

        let alarm = if file.alarm.validate().is_ok() {
            file.alarm
        } else {
            warn!(target: "config", "settings out of range, using defaults");
            AlarmSettings::default()
        };
        (alarm, file.timer.normalized())
    }

    /// Write both tables atomically with respect to the in-memory snapshot
    /// (the whole file is rewritten).
    pub fn save(
        &self,
        settings: &AlarmSettings,
        policy: &TimerPolicy,
    ) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = SettingsFile {
            alarm: *settings,
            timer: *policy,
        };
        let contents = toml::to_string_pretty(&file)
            .map_err(|e| PersistenceError::Format(e.to_string()))?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}
