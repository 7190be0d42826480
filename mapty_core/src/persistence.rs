//! Saving and reviving the workout store.
//!
//! The whole store is written as one JSON blob under a fixed key:
//!
//! ```json
//! {"version": 1, "workouts": [{"id": "...", "variant": "running", ...}]}
//! ```
//!
//! A bare JSON array is read as version 0, the layout written by the
//! browser widget (`type` discriminator, derived fields included).
//!
//! Plain records carry no behavior, so `load` revives each one into a typed
//! `Workout`, recomputing derived metrics and the description. Records that
//! cannot be revived are skipped and reported; they never abort the load.

use crate::storage::KeyValueStore;
use crate::{Coords, Error, Result, Variant, VariantInput, Workout, WorkoutId, WorkoutInput, WorkoutStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current blob layout version
pub const STORAGE_VERSION: u32 = 1;

/// Key the store is saved under unless configured otherwise
pub const DEFAULT_KEY: &str = "workouts";

/// One workout as persisted
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredWorkout {
    pub id: String,
    pub date: String,
    pub coords: Coords,
    pub distance: f64,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(default)]
    pub clicks: u32,
    #[serde(alias = "type")]
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&Workout> for StoredWorkout {
    fn from(workout: &Workout) -> Self {
        StoredWorkout {
            id: workout.id().to_string(),
            date: workout.date().to_rfc3339(),
            coords: workout.coords(),
            distance: workout.distance(),
            duration: workout.duration(),
            location: workout.location().map(str::to_string),
            flag: workout.flag().map(str::to_string),
            clicks: workout.clicks(),
            variant: workout.variant().as_str().to_string(),
            cadence: workout.cadence(),
            pace: workout.pace(),
            elevation: workout.elevation(),
            speed: workout.speed(),
            description: Some(workout.description().to_string()),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    workouts: &'a [StoredWorkout],
}

/// Turn a plain record back into a typed workout
///
/// The discriminator picks the variant and only that variant's input field
/// is read; stored derived values are ignored and recomputed.
pub fn revive(record: StoredWorkout) -> Result<Workout> {
    if record.id.trim().is_empty() {
        return Err(Error::CorruptStorage("record has an empty id".into()));
    }

    let variant = match record.variant.as_str() {
        "running" => Variant::Running,
        "cycling" => Variant::Cycling,
        other => {
            return Err(Error::CorruptStorage(format!(
                "unrecognized variant '{}'",
                other
            )))
        }
    };

    let detail = match variant {
        Variant::Running => VariantInput::Running {
            cadence: record
                .cadence
                .ok_or_else(|| Error::CorruptStorage("running record has no cadence".into()))?,
        },
        Variant::Cycling => VariantInput::Cycling {
            elevation: record
                .elevation
                .ok_or_else(|| Error::CorruptStorage("cycling record has no elevation".into()))?,
        },
    };

    let date = DateTime::parse_from_rfc3339(&record.date)
        .map_err(|e| Error::CorruptStorage(format!("invalid date '{}': {}", record.date, e)))?
        .with_timezone(&Utc);

    let input = WorkoutInput {
        distance: record.distance,
        duration: record.duration,
        detail,
    };

    Workout::from_parts(
        WorkoutId::from(record.id),
        date,
        record.coords,
        input,
        record.location.filter(|s| !s.is_empty()),
        record.flag.filter(|s| !s.is_empty()),
        record.clicks,
    )
    .map_err(|e| match e {
        Error::Validation(msg) => Error::CorruptStorage(msg),
        other => other,
    })
}

/// A record that was left out during load
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedRecord {
    /// Position in the stored sequence
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

/// Outcome of loading the store
#[derive(Debug, Default)]
pub struct LoadReport {
    pub store: WorkoutStore,
    /// Layout version of the blob; `None` if nothing was stored
    pub version: Option<u32>,
    pub skipped: Vec<SkippedRecord>,
    /// Set when the blob as a whole could not be read
    pub corrupt_blob: Option<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.corrupt_blob.is_none()
    }

    /// Human readable warnings for anything that was not loaded
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(reason) = &self.corrupt_blob {
            warnings.push(format!("Stored workouts could not be read: {}", reason));
        }
        for skipped in &self.skipped {
            warnings.push(format!(
                "Skipped stored workout #{} ({}): {}",
                skipped.index + 1,
                skipped.id.as_deref().unwrap_or("no id"),
                skipped.reason
            ));
        }
        warnings
    }
}

/// Serializes the store to a key-value backend and revives it again
#[derive(Debug)]
pub struct PersistenceAdapter<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Write every workout, derived fields included, over any prior blob
    pub fn save(&mut self, store: &WorkoutStore) -> Result<()> {
        let records: Vec<StoredWorkout> = store.all().map(StoredWorkout::from).collect();
        let blob = serde_json::to_string(&Envelope {
            version: STORAGE_VERSION,
            workouts: &records,
        })?;
        self.storage.set(&self.key, &blob)?;
        tracing::debug!("Saved {} workouts under '{}'", records.len(), self.key);
        Ok(())
    }

    /// Read the blob and revive every record that can be revived
    ///
    /// A missing blob is a first run and yields an empty store. A blob that
    /// is not readable at all yields an empty store with `corrupt_blob` set.
    pub fn load(&self) -> Result<LoadReport> {
        let Some(blob) = self.storage.get(&self.key)? else {
            tracing::info!("No stored workouts under '{}', starting empty", self.key);
            return Ok(LoadReport::default());
        };

        let (version, records) = match parse_blob(&blob) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Ignoring unreadable workout blob: {}", e);
                return Ok(LoadReport {
                    corrupt_blob: Some(e.to_string()),
                    ..LoadReport::default()
                });
            }
        };

        let mut report = LoadReport {
            version: Some(version),
            ..LoadReport::default()
        };

        for (index, value) in records.into_iter().enumerate() {
            let id = value
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string);

            let revived = serde_json::from_value::<StoredWorkout>(value)
                .map_err(|e| Error::CorruptStorage(e.to_string()))
                .and_then(revive)
                .and_then(|workout| report.store.add(workout));

            if let Err(e) = revived {
                tracing::warn!("Skipping stored workout at index {}: {}", index, e);
                report.skipped.push(SkippedRecord {
                    index,
                    id,
                    reason: e.to_string(),
                });
            }
        }

        tracing::info!(
            "Loaded {} workouts (version {}, {} skipped)",
            report.store.len(),
            version,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Remove the blob
    pub fn clear(&mut self) -> Result<()> {
        self.storage.remove(&self.key)?;
        tracing::info!("Cleared stored workouts under '{}'", self.key);
        Ok(())
    }
}

/// Split a blob into its version and raw records
fn parse_blob(blob: &str) -> Result<(u32, Vec<Value>)> {
    let value: Value = serde_json::from_str(blob)?;

    match value {
        Value::Array(records) => Ok((0, records)),
        Value::Object(mut map) => {
            let version = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or_else(|| Error::CorruptStorage("missing version".into()))?;
            let version = u32::try_from(version)
                .map_err(|_| Error::CorruptStorage(format!("invalid version {}", version)))?;
            if version > STORAGE_VERSION {
                return Err(Error::CorruptStorage(format!(
                    "version {} is newer than supported version {}",
                    version, STORAGE_VERSION
                )));
            }
            match map.remove("workouts") {
                Some(Value::Array(records)) => Ok((version, records)),
                Some(Value::Null) | None => Ok((version, Vec::new())),
                Some(_) => Err(Error::CorruptStorage("'workouts' is not a list".into())),
            }
        }
        _ => Err(Error::CorruptStorage("expected a list of workouts".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn sample_store() -> WorkoutStore {
        let mut store = WorkoutStore::new();
        store
            .add(
                Workout::create(
                    Coords::new(51.5, -0.12),
                    WorkoutInput::running(5.2, 24.0, 178.0),
                    Some("London".into()),
                    Some("https://flagcdn.com/w320/gb.png".into()),
                )
                .unwrap(),
            )
            .unwrap();
        store
            .add(
                Workout::create(
                    Coords::new(48.85, 2.35),
                    WorkoutInput::cycling(27.0, 95.0, -40.0),
                    None,
                    None,
                )
                .unwrap(),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_empty_storage_loads_empty_store() {
        let adapter = PersistenceAdapter::new(MemoryStore::new());
        let report = adapter.load().unwrap();
        assert!(report.store.is_empty());
        assert!(report.is_clean());
        assert_eq!(report.version, None);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let store = sample_store();
        let mut adapter = PersistenceAdapter::new(MemoryStore::new());
        adapter.save(&store).unwrap();

        let report = adapter.load().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.version, Some(STORAGE_VERSION));
        assert_eq!(report.store.len(), store.len());

        for original in store.all() {
            let loaded = report.store.find_by_id(original.id()).unwrap();
            assert_eq!(loaded.variant(), original.variant());
            assert_eq!(loaded.distance(), original.distance());
            assert_eq!(loaded.duration(), original.duration());
            assert_eq!(loaded.pace(), original.pace());
            assert_eq!(loaded.speed(), original.speed());
            assert_eq!(loaded.location(), original.location());
            assert_eq!(loaded.description(), original.description());
            assert_eq!(
                loaded.date().timestamp_micros(),
                original.date().timestamp_micros()
            );
        }
    }

    #[test]
    fn test_unknown_variant_is_skipped() {
        let blob = r#"{"version":1,"workouts":[
            {"id":"a","date":"2024-04-14T09:30:00Z","coords":[1.0,2.0],"distance":5.0,"duration":30.0,"clicks":0,"variant":"running","cadence":150.0},
            {"id":"b","date":"2024-04-15T09:30:00Z","coords":[1.0,2.0],"distance":1.0,"duration":40.0,"clicks":0,"variant":"swimming"},
            {"id":"c","date":"2024-04-16T09:30:00Z","coords":[1.0,2.0],"distance":20.0,"duration":60.0,"clicks":3,"variant":"cycling","elevation":120.0}
        ]}"#;
        let mut storage = MemoryStore::new();
        storage.set(DEFAULT_KEY, blob).unwrap();
        let adapter = PersistenceAdapter::new(storage);

        let report = adapter.load().unwrap();
        let ids: Vec<_> = report.store.ids().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.skipped[0].id.as_deref(), Some("b"));
        assert!(report.skipped[0].reason.contains("swimming"));
    }

    #[test]
    fn test_missing_fields_and_duplicates_are_skipped() {
        let blob = r#"{"version":1,"workouts":[
            {"id":"a","date":"2024-04-14T09:30:00Z","coords":[1.0,2.0],"distance":5.0,"duration":30.0,"variant":"running","cadence":150.0},
            {"id":"b","date":"2024-04-14T09:30:00Z","coords":[1.0,2.0],"duration":30.0,"variant":"running","cadence":150.0},
            {"id":"c","date":"not a date","coords":[1.0,2.0],"distance":5.0,"duration":30.0,"variant":"running","cadence":150.0},
            {"id":"d","date":"2024-04-14T09:30:00Z","coords":[1.0,2.0],"distance":5.0,"duration":30.0,"variant":"cycling"},
            {"id":"a","date":"2024-04-14T09:30:00Z","coords":[1.0,2.0],"distance":5.0,"duration":30.0,"variant":"running","cadence":150.0},
            {"id":"e","date":"2024-04-14T09:30:00Z","coords":[1.0,2.0],"distance":-5.0,"duration":30.0,"variant":"running","cadence":150.0}
        ]}"#;
        let mut storage = MemoryStore::new();
        storage.set(DEFAULT_KEY, blob).unwrap();
        let adapter = PersistenceAdapter::new(storage);

        let report = adapter.load().unwrap();
        assert_eq!(report.store.len(), 1);
        let skipped: Vec<_> = report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2, 3, 4, 5]);
        assert!(report.skipped[3].reason.contains("Duplicate"));
    }

    #[test]
    fn test_legacy_array_format() {
        // Layout written by the browser widget, including stale fields left
        // behind by its in-place type switch
        let blob = r#"[
            {"date":"2023-06-02T17:04:11.512Z","id":"5721051512","clicks":2,"coords":[39.7,-104.9],
             "distance":5,"duration":27,"location":"Denver","flag":"https://flagcdn.com/w320/us.png",
             "type":"running","cadence":176,"pace":5.4,"description":"Running <br> June 2"},
            {"date":"2023-06-03T08:00:00.000Z","id":"5721099999","clicks":0,"coords":[39.7,-104.9],
             "distance":30,"duration":90,"type":"cycling","cadence":150,"pace":3,"elevation":350,"speed":20}
        ]"#;
        let mut storage = MemoryStore::new();
        storage.set(DEFAULT_KEY, blob).unwrap();
        let adapter = PersistenceAdapter::new(storage);

        let report = adapter.load().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.version, Some(0));

        let run = report.store.find_by_id(&WorkoutId::from("5721051512")).unwrap();
        assert_eq!(run.variant(), Variant::Running);
        assert_eq!(run.pace(), Some(27.0 / 5.0));
        assert_eq!(run.clicks(), 2);
        assert_eq!(run.location(), Some("Denver"));
        assert_eq!(run.description(), "Running on June 2");
        assert_eq!(
            run.date(),
            Utc.with_ymd_and_hms(2023, 6, 2, 17, 4, 11).unwrap()
                + chrono::Duration::milliseconds(512)
        );

        let ride = report.store.find_by_id(&WorkoutId::from("5721099999")).unwrap();
        assert_eq!(ride.variant(), Variant::Cycling);
        assert_eq!(ride.speed(), Some(20.0));
        assert_eq!(ride.cadence(), None);
        assert_eq!(ride.location(), None);
    }

    #[test]
    fn test_unreadable_blob_yields_empty_store() {
        let mut storage = MemoryStore::new();
        storage.set(DEFAULT_KEY, "{ not json").unwrap();
        let adapter = PersistenceAdapter::new(storage);

        let report = adapter.load().unwrap();
        assert!(report.store.is_empty());
        assert!(report.corrupt_blob.is_some());
        assert_eq!(report.warnings().len(), 1);
    }

    #[test]
    fn test_newer_version_is_not_misparsed() {
        let mut storage = MemoryStore::new();
        storage
            .set(DEFAULT_KEY, r#"{"version":99,"workouts":[]}"#)
            .unwrap();
        let adapter = PersistenceAdapter::new(storage);

        let report = adapter.load().unwrap();
        assert!(report.corrupt_blob.unwrap().contains("99"));
    }

    #[test]
    fn test_clear_removes_blob() {
        let mut adapter = PersistenceAdapter::new(MemoryStore::new());
        adapter.save(&sample_store()).unwrap();
        adapter.clear().unwrap();

        assert_eq!(adapter.storage().get(DEFAULT_KEY).unwrap(), None);
        assert!(adapter.load().unwrap().store.is_empty());
    }

    #[test]
    fn test_saved_blob_carries_derived_fields() {
        let mut adapter = PersistenceAdapter::new(MemoryStore::new());
        adapter.save(&sample_store()).unwrap();

        let blob = adapter.storage().get(DEFAULT_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value["version"], 1);
        let first = &value["workouts"][0];
        assert_eq!(first["variant"], "running");
        assert!(first["pace"].is_number());
        assert!(first.get("speed").is_none());
        assert_eq!(value["workouts"][1]["coords"][1], 2.35);
    }
}
