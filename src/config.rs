use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) tick_secs: u64,
    pub(crate) catchup_step_secs: u64,
    pub(crate) catchup_max_steps: u32,
    pub(crate) notice_secs: u64,
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_secs: 5,
            catchup_step_secs: 60,
            catchup_max_steps: 60,
            notice_secs: 3,
            fps_cap: 20,
            enable_color: true,
        }
    }
}

const MAX_TICK_SECS: u64 = 3600;
const MAX_CATCHUP_STEP_SECS: u64 = 24 * 3600;
const MAX_CATCHUP_STEPS: u32 = 10_000;
const MAX_NOTICE_SECS: u64 = 60;

impl Settings {
    /// Replaces zero periods with their defaults and caps hand-edited values.
    pub(crate) fn sanitized(mut self) -> Self {
        let d = Settings::default();
        if self.tick_secs == 0 {
            self.tick_secs = d.tick_secs;
        }
        if self.catchup_step_secs == 0 {
            self.catchup_step_secs = d.catchup_step_secs;
        }
        if self.notice_secs == 0 {
            self.notice_secs = d.notice_secs;
        }
        self.tick_secs = self.tick_secs.min(MAX_TICK_SECS);
        self.catchup_step_secs = self.catchup_step_secs.min(MAX_CATCHUP_STEP_SECS);
        self.catchup_max_steps = self.catchup_max_steps.min(MAX_CATCHUP_STEPS);
        self.notice_secs = self.notice_secs.min(MAX_NOTICE_SECS);
        self.fps_cap = self.fps_cap.clamp(5, 120);
        self
    }

    pub(crate) fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub(crate) fn catchup_step(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.catchup_step_secs as i64)
    }

    pub(crate) fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_secs)
    }
}

pub(crate) struct Paths {
    pub(crate) save_path: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "pocketpet", "PocketPet")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir)
        .with_context(|| format!("could not create data directory {}", dir.display()))?;
    Ok(Paths {
        save_path: dir.join("pet.json"),
        settings_path: dir.join("settings.json"),
        log_path: dir.join("pocketpet.log"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    if let Ok(s) = fs::read_to_string(path) {
        match serde_json::from_str::<Settings>(&s) {
            Ok(v) => return v.sanitized(),
            Err(err) => tracing::warn!(%err, path = %path.display(), "ignoring unreadable settings"),
        }
    }
    Settings::default()
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> std::io::Result<()> {
    // rename-over-existing is not atomic on Windows
    if cfg!(windows) && to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pocketpet-config-{tag}-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = scratch_dir("missing");
        assert_eq!(load_settings(&dir.join("nope.json")), Settings::default());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = scratch_dir("roundtrip");
        let path = dir.join("settings.json");
        let s = Settings {
            tick_secs: 2,
            enable_color: false,
            ..Settings::default()
        };
        save_settings_atomic(&path, &s).unwrap();
        assert_eq!(load_settings(&path), s);
        assert!(!path.with_extension("json.tmp").exists());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn partial_and_zero_values_fall_back() {
        let dir = scratch_dir("partial");
        let path = dir.join("settings.json");
        fs::write(&path, r#"{"tick_secs": 0, "catchup_max_steps": 10}"#).unwrap();
        let s = load_settings(&path);
        assert_eq!(s.tick_secs, 5);
        assert_eq!(s.catchup_max_steps, 10);
        assert_eq!(s.catchup_step_secs, 60);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn oversized_values_are_capped() {
        let dir = scratch_dir("oversized");
        let path = dir.join("settings.json");
        let raw = format!(
            r#"{{"tick_secs": {max}, "catchup_step_secs": {max}, "catchup_max_steps": 4000000000, "notice_secs": {max}}}"#,
            max = u64::MAX
        );
        fs::write(&path, raw).unwrap();
        let s = load_settings(&path);
        assert_eq!(s.tick_secs, MAX_TICK_SECS);
        assert_eq!(s.catchup_step_secs, MAX_CATCHUP_STEP_SECS);
        assert_eq!(s.catchup_max_steps, MAX_CATCHUP_STEPS);
        assert_eq!(s.notice_secs, MAX_NOTICE_SECS);

        // the derived durations are usable
        assert_eq!(s.catchup_step(), chrono::Duration::hours(24));
        let mut sched = crate::scheduler::Scheduler::new(s.tick_period());
        sched.start(std::time::Instant::now());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn garbage_gives_defaults() {
        let dir = scratch_dir("garbage");
        let path = dir.join("settings.json");
        fs::write(&path, "tick_secs = 3").unwrap();
        assert_eq!(load_settings(&path), Settings::default());
        fs::remove_dir_all(dir).ok();
    }
}
