//! Text rendering of workouts for lists and marker popups.

use crate::{Metrics, Variant, Workout};

pub fn emoji(variant: Variant) -> &'static str {
    match variant {
        Variant::Running => "🏃‍♂️",
        Variant::Cycling => "🚴‍♀️",
    }
}

/// Marker popup text, e.g. `"🏃‍♂️ Running on April 14"`
pub fn popup_label(workout: &Workout) -> String {
    format!("{} {}", emoji(workout.variant()), workout.description())
}

/// One list entry: place, description, then the workout's numbers
pub fn summary_line(workout: &Workout) -> String {
    let title = match workout.location() {
        Some(location) => format!("{}: {}", location, workout.description()),
        None => workout.description().to_string(),
    };

    let details = match *workout.metrics() {
        Metrics::Running { cadence, pace } => {
            format!("⚡️ {:.1} min/km  🦶🏼 {} spm", pace, cadence)
        }
        Metrics::Cycling { elevation, speed } => {
            format!("⚡️ {:.1} km/h  ⛰ {} m", speed, elevation)
        }
    };

    format!(
        "{} {}  |  {} km  ⏱ {} min  {}",
        emoji(workout.variant()),
        title,
        workout.distance(),
        workout.duration(),
        details
    )
}
