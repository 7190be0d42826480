//! The application controller.
//!
//! `Tracker` owns the workout store, the marker registry, the persistence
//! adapter, the edit coordinator and the map surface. Every mutation is
//! followed by a save; if the save fails the mutation is rolled back and
//! the markers are left untouched, so memory never runs ahead of storage.
//!
//! A stored blob that could not be read at all (malformed, or written by a
//! newer version) is never overwritten: saves are refused until `reset`.

use crate::edit::EditCoordinator;
use crate::geocode::{self, Geocoder};
use crate::markers::{MapSurface, MarkerRegistry};
use crate::persistence::{LoadReport, PersistenceAdapter, STORAGE_VERSION};
use crate::render::popup_label;
use crate::storage::KeyValueStore;
use crate::{Coords, Error, Result, Workout, WorkoutId, WorkoutInput, WorkoutStore};

/// What a rendered list entry asked for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiAction {
    Delete,
    Edit,
    SelectOnMap,
}

/// An event coming back from the rendered workout list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiEvent {
    pub id: WorkoutId,
    pub action: UiAction,
}

pub struct Tracker<S, M> {
    store: WorkoutStore,
    markers: MarkerRegistry,
    persistence: PersistenceAdapter<S>,
    editor: EditCoordinator,
    map: M,
    /// In-memory state that has not reached storage yet
    unsaved: bool,
    /// Why the stored blob must not be overwritten
    protected: Option<String>,
}

impl<S: KeyValueStore, M: MapSurface> Tracker<S, M> {
    /// Load stored workouts and place a marker for each
    ///
    /// Records that could not be revived are reported in the returned
    /// `LoadReport` (its `store` is moved into the tracker and left empty).
    pub fn open(persistence: PersistenceAdapter<S>, map: M) -> Result<(Self, LoadReport)> {
        let mut report = persistence.load()?;
        let store = std::mem::take(&mut report.store);
        // Older layouts are rewritten on close
        let unsaved = report.version.is_some_and(|v| v < STORAGE_VERSION);
        let protected = report.corrupt_blob.clone();

        let mut tracker = Self {
            store,
            markers: MarkerRegistry::new(),
            persistence,
            editor: EditCoordinator::new(),
            map,
            unsaved,
            protected,
        };

        let Self {
            store,
            markers,
            map,
            ..
        } = &mut tracker;
        for workout in store.all() {
            markers.attach(map, workout.id(), workout.coords(), &popup_label(workout));
        }

        for warning in report.warnings() {
            tracing::warn!("{}", warning);
        }
        tracing::info!("Tracker opened with {} workouts", tracker.store.len());
        Ok((tracker, report))
    }

    pub fn store(&self) -> &WorkoutStore {
        &self.store
    }

    pub fn workouts(&self) -> std::slice::Iter<'_, Workout> {
        self.store.all()
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn editor(&self) -> &EditCoordinator {
        &self.editor
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    /// False while an unreadable blob is being preserved
    pub fn is_writable(&self) -> bool {
        self.protected.is_none()
    }

    fn persist(&mut self) -> Result<()> {
        if let Some(reason) = &self.protected {
            return Err(Error::CorruptStorage(format!(
                "stored workouts could not be read ({}); refusing to overwrite them, \
                 reset to discard",
                reason
            )));
        }
        self.persistence.save(&self.store)?;
        self.unsaved = false;
        Ok(())
    }

    /// Record a new workout at `coords`
    ///
    /// Purely local: place name and flag are filled in later by `enrich`.
    pub fn create(&mut self, coords: Coords, input: &WorkoutInput) -> Result<WorkoutId> {
        let workout = Workout::create(coords, *input, None, None)?;
        let id = workout.id().clone();
        let label = popup_label(&workout);

        self.store.add(workout)?;
        if let Err(e) = self.persist() {
            tracing::error!("Failed to save new workout {}, discarding it: {}", id, e);
            if let Err(undo) = self.store.remove_by_id(&id) {
                tracing::error!("Failed to discard unsaved workout {}: {}", id, undo);
            }
            return Err(e);
        }

        self.markers.attach(&mut self.map, &id, coords, &label);
        tracing::info!("Recorded {} workout {}", input.variant(), id);
        Ok(id)
    }

    /// Best-effort lookup of place name and flag for a workout
    ///
    /// Lookup failures leave the fields empty and are not errors. Returns
    /// true if anything was filled in.
    pub fn enrich(&mut self, id: &WorkoutId, geocoder: &dyn Geocoder) -> Result<bool> {
        let coords = self.store.find_by_id(id)?.coords();
        let enrichment = geocode::enrich(geocoder, coords);
        if enrichment.is_empty() {
            return Ok(false);
        }

        let workout = self.store.find_by_id_mut(id)?;
        let before = workout.clone();
        workout.set_place(enrichment.location, enrichment.flag);

        if let Err(e) = self.persist() {
            tracing::error!("Failed to save place for {}, reverting: {}", id, e);
            *self.store.find_by_id_mut(id)? = before;
            return Err(e);
        }
        tracing::info!("Enriched workout {}", id);
        Ok(true)
    }

    /// Delete a workout and its marker
    pub fn delete(&mut self, id: &WorkoutId) -> Result<Workout> {
        let (index, workout) = self.store.take(id)?;

        if let Err(e) = self.persist() {
            tracing::error!("Failed to save deletion of {}, restoring: {}", id, e);
            self.store.restore(index, workout)?;
            return Err(e);
        }

        self.markers.detach(&mut self.map, id);
        if self.editor.target() == Some(id) {
            self.editor.cancel();
        }
        tracing::info!("Deleted workout {}", id);
        Ok(workout)
    }

    /// Count an interaction with a workout and move the map to it
    pub fn select(&mut self, id: &WorkoutId) -> Result<&Workout> {
        let workout = self.store.find_by_id_mut(id)?;
        workout.register_interaction();
        let coords = workout.coords();

        if let Err(e) = self.persist() {
            // The click count is cosmetic; keep it in memory
            tracing::warn!("Failed to save click for {}: {}", id, e);
            self.unsaved = true;
        }

        self.map.focus(coords);
        self.store.find_by_id(id)
    }

    pub fn begin_edit(&mut self, id: &WorkoutId) -> Result<&Workout> {
        self.editor.begin(&self.store, id)
    }

    /// Apply the pending edit and refresh the workout's marker
    pub fn submit_edit(&mut self, input: &WorkoutInput) -> Result<WorkoutId> {
        let id = self
            .editor
            .submit(&mut self.store, &mut self.persistence, input)?;
        self.unsaved = false;

        let workout = self.store.find_by_id(&id)?;
        self.markers
            .attach(&mut self.map, &id, workout.coords(), &popup_label(workout));
        Ok(id)
    }

    pub fn cancel_edit(&mut self) -> bool {
        self.editor.cancel()
    }

    /// Dispatch an event from the rendered list
    pub fn handle(&mut self, event: &UiEvent) -> Result<()> {
        match event.action {
            UiAction::Delete => self.delete(&event.id).map(|_| ()),
            UiAction::Edit => self.begin_edit(&event.id).map(|_| ()),
            UiAction::SelectOnMap => self.select(&event.id).map(|_| ()),
        }
    }

    /// Drop every workout, marker and the stored blob
    pub fn reset(&mut self) -> Result<()> {
        self.persistence.clear()?;
        self.editor.cancel();
        self.markers.clear(&mut self.map);
        self.store.clear();
        self.unsaved = false;
        self.protected = None;
        tracing::info!("Reset all workouts");
        Ok(())
    }

    /// Flush anything not yet stored before shutdown; hands back the storage
    pub fn close(mut self) -> Result<S> {
        if self.unsaved {
            self.persist()?;
        }
        tracing::debug!("Tracker closed with {} workouts", self.store.len());
        Ok(self.persistence.into_inner())
    }

    /// Hand back the storage without writing anything
    ///
    /// For read-only sessions: pending state such as a legacy layout upgrade
    /// is left for the next writer.
    pub fn release(self) -> S {
        if self.unsaved {
            tracing::debug!("Releasing tracker with unsaved state");
        }
        self.persistence.into_inner()
    }
}
