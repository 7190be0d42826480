#![forbid(unsafe_code)]

//! Core domain model and business logic for Mapty, a map-based workout log.
//!
//! This crate provides:
//! - Workout entities (running and cycling) with derived metrics
//! - The ordered workout store and edit sessions
//! - Persistence to a flat key-value store, with revive on load
//! - Marker bookkeeping, geocoding enrichment and the application controller

pub mod types;
pub mod error;
pub mod workout;
pub mod store;
pub mod markers;
pub mod storage;
pub mod persistence;
pub mod edit;
pub mod geocode;
pub mod tracker;
pub mod render;
pub mod export;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use workout::{validate_input, Metrics, Workout};
pub use store::WorkoutStore;
pub use markers::{HeadlessMap, MapSurface, MarkerHandle, MarkerRegistry};
pub use storage::{FileStore, KeyValueStore, LockMode, MemoryStore, StoreLock};
pub use persistence::{LoadReport, PersistenceAdapter, SkippedRecord};
pub use edit::{EditCoordinator, EditState};
pub use geocode::{Geocoder, HttpGeocoder};
pub use tracker::{Tracker, UiAction, UiEvent};
pub use config::Config;
