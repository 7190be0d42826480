//! In-memory ordered collection of workouts.
//!
//! The store is the single owner of workout entities. Insertion order is
//! preserved because it drives both list rendering and storage order.

use crate::{Error, Result, Workout, WorkoutId};

#[derive(Clone, Debug, Default)]
pub struct WorkoutStore {
    workouts: Vec<Workout>,
}

impl WorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a workout. Fails if its id is already present.
    pub fn add(&mut self, workout: Workout) -> Result<()> {
        if self.contains(workout.id()) {
            return Err(Error::DuplicateId(workout.id().to_string()));
        }
        tracing::debug!("Added workout {} to store", workout.id());
        self.workouts.push(workout);
        Ok(())
    }

    pub fn find_by_id(&self, id: &WorkoutId) -> Result<&Workout> {
        self.workouts
            .iter()
            .find(|w| w.id() == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn find_by_id_mut(&mut self, id: &WorkoutId) -> Result<&mut Workout> {
        self.workouts
            .iter_mut()
            .find(|w| w.id() == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &WorkoutId) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: &WorkoutId) -> Option<usize> {
        self.workouts.iter().position(|w| w.id() == id)
    }

    /// Remove a workout and hand it back
    pub fn remove_by_id(&mut self, id: &WorkoutId) -> Result<Workout> {
        self.take(id).map(|(_, workout)| workout)
    }

    /// Remove a workout and report where it was, so it can be put back
    pub(crate) fn take(&mut self, id: &WorkoutId) -> Result<(usize, Workout)> {
        let index = self
            .position(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let workout = self.workouts.remove(index);
        tracing::debug!("Removed workout {} from store", id);
        Ok((index, workout))
    }

    /// Put a previously taken workout back at its old position
    pub(crate) fn restore(&mut self, index: usize, workout: Workout) -> Result<()> {
        if self.contains(workout.id()) {
            return Err(Error::DuplicateId(workout.id().to_string()));
        }
        let index = index.min(self.workouts.len());
        self.workouts.insert(index, workout);
        Ok(())
    }

    /// Swap in a new entity for `id` at the same position
    ///
    /// The replacement takes over the original id and date whatever it
    /// carried before; edits never change identity. Returns the entity that
    /// was replaced.
    pub fn replace(&mut self, id: &WorkoutId, mut replacement: Workout) -> Result<Workout> {
        let index = self
            .position(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let original = &self.workouts[index];
        replacement.assume_identity(original.id().clone(), original.date());

        let previous = std::mem::replace(&mut self.workouts[index], replacement);
        tracing::debug!("Replaced workout {} at position {}", id, index);
        Ok(previous)
    }

    /// Current workouts in insertion order
    ///
    /// The iterator is `Clone`, so a consumer can restart it without
    /// touching the store again.
    pub fn all(&self) -> std::slice::Iter<'_, Workout> {
        self.workouts.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &WorkoutId> + '_ {
        self.workouts.iter().map(|w| w.id())
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }

    pub fn clear(&mut self) {
        self.workouts.clear();
    }
}

impl<'a> IntoIterator for &'a WorkoutStore {
    type Item = &'a Workout;
    type IntoIter = std::slice::Iter<'a, Workout>;

    fn into_iter(self) -> Self::IntoIter {
        self.all()
    }
}
