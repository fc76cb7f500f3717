use crate::config::{atomic_rename, Settings};
use crate::model::{Vitals, STAT_MAX, STAT_MIN};
use crate::sim::{catch_up, CatchUp};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum StoreError {
    #[error("snapshot io: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot encode: {0}")]
    Encode(serde_json::Error),

    #[error("snapshot decode: {0}")]
    Decode(serde_json::Error),
}

/// Where the pet lives between sessions. The snapshot format is opaque to
/// the simulation; `load` hands back raw JSON for `reconcile`.
pub(crate) trait SnapshotStore {
    fn load(&self) -> Result<Option<Value>, StoreError>;
    fn save(&mut self, vitals: &Vitals) -> Result<(), StoreError>;
    fn discard(&mut self) -> Result<(), StoreError>;
}

pub(crate) struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Value>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(StoreError::Decode)
    }

    fn save(&mut self, vitals: &Vitals) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(vitals).map_err(StoreError::Encode)?;
        fs::write(&tmp, data)?;
        atomic_rename(&tmp, &self.path)?;
        Ok(())
    }

    fn discard(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Builds vitals from a raw snapshot, field by field over fresh defaults.
/// Fields that are missing or of the wrong type keep their default.
/// Returns `None` when the snapshot is not a JSON object at all.
pub(crate) fn reconcile(raw: &Value, now: DateTime<Utc>) -> Option<Vitals> {
    let obj = raw.as_object()?;
    let mut v = Vitals::fresh(now);

    if let Some(x) = stat(obj, "health") {
        v.health = x;
    }
    if let Some(x) = stat(obj, "hunger") {
        v.hunger = x;
    }
    if let Some(x) = stat(obj, "energy") {
        v.energy = x;
    }
    if let Some(x) = stat(obj, "clean") {
        v.clean = x;
    }
    if let Some(x) = obj.get("isSleeping").and_then(Value::as_bool) {
        v.is_sleeping = x;
    }
    if let Some(x) = obj.get("paused").and_then(Value::as_bool) {
        v.paused = x;
    }
    if let Some(x) = timestamp(obj, "createdAt") {
        v.created_at = x;
    }
    if let Some(x) = timestamp(obj, "lastTickAt") {
        v.last_tick_at = x;
    }

    Some(v)
}

fn stat(obj: &Map<String, Value>, key: &str) -> Option<u8> {
    let n = obj.get(key)?.as_f64()?;
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(STAT_MIN as f64, STAT_MAX as f64) as u8)
}

fn timestamp(obj: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let ms = obj.get(key)?.as_i64()?;
    Utc.timestamp_millis_opt(ms).single()
}

/// The pet as it stands after resuming a session.
pub(crate) struct Resumed {
    pub(crate) vitals: Vitals,
    pub(crate) replayed: CatchUp,
    pub(crate) restored: bool,
}

/// Loads the stored pet and simulates the time it missed. Absent or
/// malformed snapshots fall back to a fresh pet.
pub(crate) fn resume(store: &dyn SnapshotStore, now: DateTime<Utc>, settings: &Settings) -> Resumed {
    let loaded = match store.load() {
        Ok(Some(raw)) => {
            let v = reconcile(&raw, now);
            if v.is_none() {
                tracing::warn!("snapshot is not a record, starting a fresh pet");
            }
            v
        }
        Ok(None) => {
            tracing::info!("no snapshot found, starting a fresh pet");
            None
        }
        Err(err) => {
            tracing::warn!(%err, "snapshot unreadable, starting a fresh pet");
            None
        }
    };

    let Some(mut vitals) = loaded else {
        return Resumed {
            vitals: Vitals::fresh(now),
            replayed: CatchUp::default(),
            restored: false,
        };
    };

    let replayed = catch_up(
        &mut vitals,
        now,
        settings.catchup_step(),
        settings.catchup_max_steps,
    );
    tracing::info!(
        steps = replayed.steps,
        died = replayed.died,
        "resumed pet from snapshot"
    );
    Resumed {
        vitals,
        replayed,
        restored: true,
    }
}

/// Best-effort save; a failure is logged and the session carries on.
pub(crate) fn persist(store: &mut dyn SnapshotStore, vitals: &Vitals) {
    if let Err(err) = store.save(vitals) {
        tracing::warn!(%err, "could not save pet");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[derive(Default)]
    struct MemoryStore {
        raw: Option<Value>,
        fail_load: bool,
        fail_save: bool,
        saves: usize,
    }

    impl SnapshotStore for MemoryStore {
        fn load(&self) -> Result<Option<Value>, StoreError> {
            if self.fail_load {
                let err = serde_json::from_str::<Value>("{").unwrap_err();
                return Err(StoreError::Decode(err));
            }
            Ok(self.raw.clone())
        }

        fn save(&mut self, vitals: &Vitals) -> Result<(), StoreError> {
            if self.fail_save {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into());
            }
            self.raw = Some(serde_json::to_value(vitals).map_err(StoreError::Encode)?);
            self.saves += 1;
            Ok(())
        }

        fn discard(&mut self) -> Result<(), StoreError> {
            self.raw = None;
            Ok(())
        }
    }

    fn scratch_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pocketpet-store-{tag}-{}-{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir.join("pet.json")
    }

    #[test]
    fn reconcile_rejects_non_records() {
        for raw in [json!(null), json!(42), json!("pet"), json!([1, 2, 3])] {
            assert!(reconcile(&raw, t0()).is_none());
        }
    }

    #[test]
    fn reconcile_fills_missing_fields_from_defaults() {
        let then = t0() - Duration::hours(3);
        let raw = json!({ "health": 40, "isSleeping": true, "createdAt": then.timestamp_millis() });
        let v = reconcile(&raw, t0()).unwrap();
        assert_eq!(v.health, 40);
        assert!(v.is_sleeping);
        assert_eq!(v.created_at, then);
        assert_eq!((v.hunger, v.energy, v.clean), (0, 80, 80));
        assert!(!v.paused);
        assert_eq!(v.last_tick_at, t0());
    }

    #[test]
    fn reconcile_ignores_wrong_types_and_clamps() {
        let raw = json!({
            "health": "full",
            "hunger": 250,
            "energy": -4,
            "clean": 33.6,
            "paused": "yes",
            "lastTickAt": "yesterday",
        });
        let v = reconcile(&raw, t0()).unwrap();
        assert_eq!((v.health, v.hunger, v.energy, v.clean), (100, 100, 0, 34));
        assert!(!v.paused);
        assert_eq!(v.last_tick_at, t0());
    }

    #[test]
    fn resume_without_snapshot_is_fresh() {
        let store = MemoryStore::default();
        let r = resume(&store, t0(), &Settings::default());
        assert!(!r.restored);
        assert_eq!(r.vitals, Vitals::fresh(t0()));
        assert_eq!(r.replayed.steps, 0);
    }

    #[test]
    fn resume_with_undecodable_snapshot_is_fresh() {
        let store = MemoryStore {
            fail_load: true,
            ..MemoryStore::default()
        };
        let r = resume(&store, t0(), &Settings::default());
        assert!(!r.restored);
        assert_eq!(r.vitals, Vitals::fresh(t0()));
    }

    #[test]
    fn resume_replays_missed_minutes() {
        let then = t0() - Duration::minutes(10);
        let mut store = MemoryStore::default();
        store.save(&Vitals::fresh(then)).unwrap();

        let r = resume(&store, t0(), &Settings::default());
        assert!(r.restored);
        assert_eq!(r.replayed.steps, 10);
        assert_eq!(r.vitals.hunger, 30);
        assert_eq!(r.vitals.created_at, then);
        assert_eq!(r.vitals.last_tick_at, t0());
    }

    #[test]
    fn resume_honours_configured_cap() {
        let then = t0() - Duration::days(2);
        let mut store = MemoryStore::default();
        store.save(&Vitals::fresh(then)).unwrap();
        let settings = Settings {
            catchup_max_steps: 5,
            ..Settings::default()
        };
        let r = resume(&store, t0(), &settings);
        assert_eq!(r.replayed.steps, 5);
        assert_eq!(r.vitals.hunger, 15);
    }

    #[test]
    fn persist_swallows_failures() {
        let mut store = MemoryStore {
            fail_save: true,
            ..MemoryStore::default()
        };
        persist(&mut store, &Vitals::fresh(t0()));
        assert_eq!(store.saves, 0);
        assert!(store.raw.is_none());
    }

    #[test]
    fn file_store_round_trip_and_discard() {
        let path = scratch_path("roundtrip");
        let mut store = JsonFileStore::new(path.clone());
        assert!(store.load().unwrap().is_none());

        let mut v = Vitals::fresh(t0());
        v.hunger = 42;
        v.is_sleeping = true;
        store.save(&v).unwrap();

        let raw = store.load().unwrap().unwrap();
        assert_eq!(reconcile(&raw, t0() + Duration::hours(1)), Some(v));

        store.discard().unwrap();
        assert!(!path.exists());
        store.discard().unwrap();
        if let Some(dir) = path.parent() {
            fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn file_store_reports_garbage_as_decode_error() {
        let path = scratch_path("garbage");
        fs::write(&path, b"not json at all").unwrap();
        let store = JsonFileStore::new(path.clone());
        assert!(matches!(store.load(), Err(StoreError::Decode(_))));
        let r = resume(&store, t0(), &Settings::default());
        assert!(!r.restored);
        if let Some(dir) = path.parent() {
            fs::remove_dir_all(dir).ok();
        }
    }
}
