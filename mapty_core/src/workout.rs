//! The workout entity and its two variants.
//!
//! A `Workout` is a shared base record plus a `Metrics` sum type holding
//! the variant-specific input and its derived metric. Changing a workout's
//! variant never mutates the discriminator in place: `Workout::rebuild`
//! constructs a fresh entity of the target variant instead.

use crate::{Coords, Error, Result, Variant, VariantInput, WorkoutId, WorkoutInput};
use chrono::{DateTime, Datelike, Utc};

/// Variant-specific fields. Exactly one pair exists per workout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Metrics {
    Running {
        /// Steps per minute
        cadence: f64,
        /// Minutes per kilometer (derived)
        pace: f64,
    },
    Cycling {
        /// Meters
        elevation: f64,
        /// Kilometers per hour (derived)
        speed: f64,
    },
}

impl Metrics {
    pub fn variant(&self) -> Variant {
        match self {
            Metrics::Running { .. } => Variant::Running,
            Metrics::Cycling { .. } => Variant::Cycling,
        }
    }
}

/// A recorded running or cycling workout
#[derive(Clone, Debug, PartialEq)]
pub struct Workout {
    id: WorkoutId,
    date: DateTime<Utc>,
    coords: Coords,
    distance: f64,
    duration: f64,
    location: Option<String>,
    flag: Option<String>,
    clicks: u32,
    description: String,
    metrics: Metrics,
}

/// Check form values before they reach an entity
///
/// Distance and duration must be finite and positive. Cadence must be
/// finite and positive; elevation only has to be finite.
pub fn validate_input(input: &WorkoutInput) -> Result<()> {
    require_positive("distance", input.distance)?;
    require_positive("duration", input.duration)?;

    match input.detail {
        VariantInput::Running { cadence } => require_positive("cadence", cadence),
        VariantInput::Cycling { elevation } => {
            if elevation.is_finite() {
                Ok(())
            } else {
                Err(Error::Validation(format!(
                    "elevation must be a finite number (got {})",
                    elevation
                )))
            }
        }
    }
}

fn require_positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} must be a finite positive number (got {})",
            field, value
        )))
    }
}

/// Minutes per kilometer
pub fn pace(distance: f64, duration: f64) -> f64 {
    duration / distance
}

/// Kilometers per hour
pub fn speed(distance: f64, duration: f64) -> f64 {
    distance / (duration / 60.0)
}

/// `"<Type> on <Month> <day>"`, e.g. `"Running on April 14"`
pub fn describe(variant: Variant, date: DateTime<Utc>) -> String {
    format!("{} on {} {}", variant.label(), date.format("%B"), date.day())
}

impl Workout {
    /// Create a new workout with a fresh id and the current timestamp
    pub fn create(
        coords: Coords,
        input: WorkoutInput,
        location: Option<String>,
        flag: Option<String>,
    ) -> Result<Self> {
        let workout = Self::from_parts(
            WorkoutId::generate(),
            Utc::now(),
            coords,
            input,
            location,
            flag,
            0,
        )?;
        tracing::debug!("Created {} workout {}", workout.variant(), workout.id);
        Ok(workout)
    }

    /// Assemble a workout from known identity and timestamp
    ///
    /// Used when reviving persisted records and when rebuilding an entity
    /// during an edit. Validates input exactly like `create`.
    pub(crate) fn from_parts(
        id: WorkoutId,
        date: DateTime<Utc>,
        coords: Coords,
        input: WorkoutInput,
        location: Option<String>,
        flag: Option<String>,
        clicks: u32,
    ) -> Result<Self> {
        validate_input(&input)?;

        let metrics = match input.detail {
            VariantInput::Running { cadence } => Metrics::Running { cadence, pace: 0.0 },
            VariantInput::Cycling { elevation } => Metrics::Cycling {
                elevation,
                speed: 0.0,
            },
        };

        let mut workout = Self {
            id,
            date,
            coords,
            distance: input.distance,
            duration: input.duration,
            location,
            flag,
            clicks,
            description: String::new(),
            metrics,
        };
        workout.recompute_derived();
        workout.recompute_description();
        Ok(workout)
    }

    /// Build a new entity of the input's variant that keeps this workout's
    /// identity, date, position, place and click count
    pub fn rebuild(&self, input: &WorkoutInput) -> Result<Self> {
        Self::from_parts(
            self.id.clone(),
            self.date,
            self.coords,
            *input,
            self.location.clone(),
            self.flag.clone(),
            self.clicks,
        )
    }

    /// Recalculate pace (running) or speed (cycling) from distance and duration
    pub fn recompute_derived(&mut self) {
        match &mut self.metrics {
            Metrics::Running { pace: p, .. } => *p = pace(self.distance, self.duration),
            Metrics::Cycling { speed: s, .. } => *s = speed(self.distance, self.duration),
        }
    }

    /// Regenerate the description from the current variant and date
    pub fn recompute_description(&mut self) {
        self.description = describe(self.variant(), self.date);
    }

    /// Count a marker or list interaction
    pub fn register_interaction(&mut self) {
        self.clicks += 1;
    }

    /// Take over another entity's identity; used when replacing in the store
    pub(crate) fn assume_identity(&mut self, id: WorkoutId, date: DateTime<Utc>) {
        self.id = id;
        self.date = date;
        self.recompute_description();
    }

    /// Fill in the place name and flag after a geocoding lookup
    pub(crate) fn set_place(&mut self, location: Option<String>, flag: Option<String>) {
        if location.is_some() {
            self.location = location;
        }
        if flag.is_some() {
            self.flag = flag;
        }
    }

    /// The input that would recreate this workout
    pub fn input(&self) -> WorkoutInput {
        let detail = match self.metrics {
            Metrics::Running { cadence, .. } => VariantInput::Running { cadence },
            Metrics::Cycling { elevation, .. } => VariantInput::Cycling { elevation },
        };
        WorkoutInput {
            distance: self.distance,
            duration: self.duration,
            detail,
        }
    }

    pub fn id(&self) -> &WorkoutId {
        &self.id
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn coords(&self) -> Coords {
        self.coords
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn flag(&self) -> Option<&str> {
        self.flag.as_deref()
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn variant(&self) -> Variant {
        self.metrics.variant()
    }

    pub fn pace(&self) -> Option<f64> {
        match self.metrics {
            Metrics::Running { pace, .. } => Some(pace),
            Metrics::Cycling { .. } => None,
        }
    }

    pub fn cadence(&self) -> Option<f64> {
        match self.metrics {
            Metrics::Running { cadence, .. } => Some(cadence),
            Metrics::Cycling { .. } => None,
        }
    }

    pub fn speed(&self) -> Option<f64> {
        match self.metrics {
            Metrics::Cycling { speed, .. } => Some(speed),
            Metrics::Running { .. } => None,
        }
    }

    pub fn elevation(&self) -> Option<f64> {
        match self.metrics {
            Metrics::Cycling { elevation, .. } => Some(elevation),
            Metrics::Running { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn here() -> Coords {
        Coords::new(39.7392, -104.9903)
    }

    #[test]
    fn test_running_pace() {
        let w = Workout::create(here(), WorkoutInput::running(5.2, 24.0, 178.0), None, None)
            .unwrap();
        assert_eq!(w.variant(), Variant::Running);
        assert_eq!(w.pace(), Some(24.0 / 5.2));
        assert_eq!(w.cadence(), Some(178.0));
        assert_eq!(w.speed(), None);
        assert_eq!(w.clicks(), 0);
    }

    #[test]
    fn test_cycling_speed() {
        let w = Workout::create(here(), WorkoutInput::cycling(27.0, 95.0, 523.0), None, None)
            .unwrap();
        assert_eq!(w.speed(), Some(27.0 / (95.0 / 60.0)));
        assert_eq!(w.elevation(), Some(523.0));
        assert_eq!(w.pace(), None);
    }

    #[test]
    fn test_validation_rejects_bad_numbers() {
        let bad = [
            WorkoutInput::running(0.0, 30.0, 150.0),
            WorkoutInput::running(5.0, -1.0, 150.0),
            WorkoutInput::running(5.0, 30.0, 0.0),
            WorkoutInput::running(f64::NAN, 30.0, 150.0),
            WorkoutInput::cycling(5.0, f64::INFINITY, 10.0),
            WorkoutInput::cycling(5.0, 30.0, f64::NAN),
        ];
        for input in bad {
            let err = Workout::create(here(), input, None, None).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{:?}", input);
        }
    }

    #[test]
    fn test_cycling_allows_descent() {
        let w = Workout::create(here(), WorkoutInput::cycling(12.0, 30.0, -140.0), None, None)
            .unwrap();
        assert_eq!(w.elevation(), Some(-140.0));
    }

    #[test]
    fn test_description_format() {
        let date = Utc.with_ymd_and_hms(2024, 4, 14, 9, 30, 0).unwrap();
        assert_eq!(describe(Variant::Running, date), "Running on April 14");
        assert_eq!(describe(Variant::Cycling, date), "Cycling on April 14");
    }

    #[test]
    fn test_recompute_derived_is_idempotent() {
        let mut w = Workout::create(here(), WorkoutInput::running(7.0, 41.0, 160.0), None, None)
            .unwrap();
        w.recompute_derived();
        let first = w.pace();
        w.recompute_derived();
        assert_eq!(first, w.pace());
    }

    #[test]
    fn test_rebuild_switches_variant_and_keeps_identity() {
        let mut original =
            Workout::create(here(), WorkoutInput::running(5.0, 30.0, 150.0), None, None).unwrap();
        original.register_interaction();

        let edited = original
            .rebuild(&WorkoutInput::cycling(5.0, 30.0, 200.0))
            .unwrap();

        assert_eq!(edited.id(), original.id());
        assert_eq!(edited.date(), original.date());
        assert_eq!(edited.clicks(), 1);
        assert_eq!(edited.speed(), Some(10.0));
        assert_eq!(edited.cadence(), None);
        assert_eq!(edited.pace(), None);
        assert!(edited.description().starts_with("Cycling on "));
    }

    #[test]
    fn test_register_interaction() {
        let mut w = Workout::create(here(), WorkoutInput::cycling(10.0, 20.0, 0.0), None, None)
            .unwrap();
        w.register_interaction();
        w.register_interaction();
        assert_eq!(w.clicks(), 2);
    }
}
