//! Edit sessions over existing workouts.
//!
//! One edit can be in flight at a time:
//!
//! ```text
//! Idle -> Editing -> (submit ok) -> Idle
//!            |  ^
//!   (invalid)|  |(resume / resubmit)
//!            v  |
//!          Rejected
//! ```
//!
//! A successful submit builds a new entity of the target variant that keeps
//! the original id and date, swaps it into the store, and saves. If the
//! save fails the swap is undone so memory and storage stay in step.

use crate::persistence::PersistenceAdapter;
use crate::storage::KeyValueStore;
use crate::{Error, Result, Workout, WorkoutId, WorkoutInput, WorkoutStore};

#[derive(Clone, Debug, PartialEq)]
pub enum EditState {
    Idle,
    Editing { id: WorkoutId },
    /// Last submission was invalid; the form stays open
    Rejected { id: WorkoutId, reason: String },
}

#[derive(Debug)]
pub struct EditCoordinator {
    state: EditState,
}

impl Default for EditCoordinator {
    fn default() -> Self {
        Self {
            state: EditState::Idle,
        }
    }
}

impl EditCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// The workout being edited, if any
    pub fn target(&self) -> Option<&WorkoutId> {
        match &self.state {
            EditState::Idle => None,
            EditState::Editing { id } | EditState::Rejected { id, .. } => Some(id),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == EditState::Idle
    }

    /// Open an edit session for `id`
    ///
    /// Selecting another workout while a session is open retargets the
    /// session; pending input for the old target is dropped.
    pub fn begin<'a>(&mut self, store: &'a WorkoutStore, id: &WorkoutId) -> Result<&'a Workout> {
        let workout = store.find_by_id(id)?;
        if let Some(previous) = self.target() {
            if previous != id {
                tracing::debug!("Retargeting edit from {} to {}", previous, id);
            }
        }
        self.state = EditState::Editing { id: id.clone() };
        tracing::info!("Editing workout {}", id);
        Ok(workout)
    }

    /// Go back to editing after a rejected submission
    pub fn resume(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, EditState::Idle) {
            EditState::Rejected { id, .. } | EditState::Editing { id } => {
                self.state = EditState::Editing { id };
                Ok(())
            }
            EditState::Idle => Err(Error::State("no edit in progress".into())),
        }
    }

    /// Apply new values to the workout being edited
    ///
    /// The input may name a different variant than the original. On success
    /// the session returns to `Idle` and the edited id is returned.
    pub fn submit<S: KeyValueStore>(
        &mut self,
        store: &mut WorkoutStore,
        persistence: &mut PersistenceAdapter<S>,
        input: &WorkoutInput,
    ) -> Result<WorkoutId> {
        let id = self
            .target()
            .cloned()
            .ok_or_else(|| Error::State("no edit in progress".into()))?;

        let original = match store.find_by_id(&id) {
            Ok(workout) => workout,
            Err(e) => {
                tracing::error!("Workout {} vanished during edit: {}", id, e);
                self.state = EditState::Idle;
                return Err(e);
            }
        };

        let replacement = match original.rebuild(input) {
            Ok(workout) => workout,
            Err(e) => {
                tracing::info!("Rejected edit of {}: {}", id, e);
                self.state = EditState::Rejected {
                    id,
                    reason: e.to_string(),
                };
                return Err(e);
            }
        };

        let previous = store.replace(&id, replacement)?;

        if let Err(e) = persistence.save(store) {
            tracing::error!("Failed to save edit of {}, rolling back: {}", id, e);
            store.replace(&id, previous)?;
            self.state = EditState::Editing { id };
            return Err(e);
        }

        tracing::info!(
            "Saved edit of {} ({} -> {})",
            id,
            previous.variant(),
            input.variant()
        );
        self.state = EditState::Idle;
        Ok(id)
    }

    /// Abandon the session without touching the store. Returns true if a
    /// session was open.
    pub fn cancel(&mut self) -> bool {
        let was_open = !self.is_idle();
        if let Some(id) = self.target() {
            tracing::debug!("Cancelled edit of {}", id);
        }
        self.state = EditState::Idle;
        was_open
    }
}
