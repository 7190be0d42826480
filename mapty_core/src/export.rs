//! CSV export of the workout list.

use crate::{Result, Workout};
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    variant: &'static str,
    date: String,
    lat: f64,
    lng: f64,
    distance_km: f64,
    duration_min: f64,
    pace_min_per_km: Option<f64>,
    speed_kmh: Option<f64>,
    cadence_spm: Option<f64>,
    elevation_m: Option<f64>,
    location: Option<&'a str>,
    clicks: u32,
}

impl<'a> From<&'a Workout> for CsvRow<'a> {
    fn from(workout: &'a Workout) -> Self {
        let coords = workout.coords();
        CsvRow {
            id: workout.id().as_str(),
            variant: workout.variant().as_str(),
            date: workout.date().to_rfc3339(),
            lat: coords.lat,
            lng: coords.lng,
            distance_km: workout.distance(),
            duration_min: workout.duration(),
            pace_min_per_km: workout.pace(),
            speed_kmh: workout.speed(),
            cadence_spm: workout.cadence(),
            elevation_m: workout.elevation(),
            location: workout.location(),
            clicks: workout.clicks(),
        }
    }
}

/// Write workouts to `path`, replacing any existing file. Returns the row count.
pub fn export_csv<'a>(workouts: impl IntoIterator<Item = &'a Workout>, path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    let mut count = 0;
    for workout in workouts {
        writer.serialize(CsvRow::from(workout))?;
        count += 1;
    }
    writer.flush()?;

    tracing::info!("Exported {} workouts to {:?}", count, path);
    Ok(count)
}
