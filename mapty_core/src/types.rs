//! Core domain types shared across the workout model.
//!
//! This module defines the small value types the rest of the crate is
//! built from:
//! - Workout identity and map coordinates
//! - The workout variant discriminator
//! - User-supplied input for creating or editing a workout

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identity and Location
// ============================================================================

/// Stable identity of a workout. Never changes once assigned.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(String);

impl WorkoutId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WorkoutId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for WorkoutId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A point on the map, serialized as `[lat, lng]`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for Coords {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(coords: Coords) -> Self {
        [coords.lat, coords.lng]
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

// ============================================================================
// Variant Discriminator
// ============================================================================

/// The kind of workout; decides which derived metric applies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Running,
    Cycling,
}

impl Variant {
    /// Lowercase name, as persisted
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Running => "running",
            Variant::Cycling => "cycling",
        }
    }

    /// Capitalized name, as shown in descriptions
    pub fn label(&self) -> &'static str {
        match self {
            Variant::Running => "Running",
            Variant::Cycling => "Cycling",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "running" => Ok(Variant::Running),
            "cycling" => Ok(Variant::Cycling),
            other => Err(crate::Error::InvalidArgument(format!(
                "unknown workout type '{}' (expected running or cycling)",
                other
            ))),
        }
    }
}

// ============================================================================
// User Input
// ============================================================================

/// The variant-specific part of a workout form
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VariantInput {
    /// Steps per minute
    Running { cadence: f64 },
    /// Meters climbed; negative for descent
    Cycling { elevation: f64 },
}

impl VariantInput {
    pub fn variant(&self) -> Variant {
        match self {
            VariantInput::Running { .. } => Variant::Running,
            VariantInput::Cycling { .. } => Variant::Cycling,
        }
    }
}

/// Raw values submitted from a create or edit form
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkoutInput {
    /// Kilometers
    pub distance: f64,
    /// Minutes
    pub duration: f64,
    pub detail: VariantInput,
}

impl WorkoutInput {
    pub fn running(distance: f64, duration: f64, cadence: f64) -> Self {
        Self {
            distance,
            duration,
            detail: VariantInput::Running { cadence },
        }
    }

    pub fn cycling(distance: f64, duration: f64, elevation: f64) -> Self {
        Self {
            distance,
            duration,
            detail: VariantInput::Cycling { elevation },
        }
    }

    pub fn variant(&self) -> Variant {
        self.detail.variant()
    }
}
