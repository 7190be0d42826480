//! Map marker bookkeeping.
//!
//! The map itself is an external collaborator behind `MapSurface`. The
//! registry only remembers which marker belongs to which workout so that
//! deleting a workout also removes its marker.

use crate::{Coords, WorkoutId};
use std::collections::{BTreeMap, HashMap};

/// Opaque handle returned by the map when a marker is placed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

/// Something that can draw markers at coordinates
pub trait MapSurface {
    fn place_marker(&mut self, coords: Coords, label: &str) -> MarkerHandle;
    fn remove_marker(&mut self, handle: MarkerHandle);
    /// Center the view on a point
    fn focus(&mut self, coords: Coords);
}

/// Back-references from workouts to their markers
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    handles: HashMap<WorkoutId, MarkerHandle>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a marker for a workout, replacing any marker it already had
    pub fn attach<M: MapSurface>(
        &mut self,
        map: &mut M,
        id: &WorkoutId,
        coords: Coords,
        label: &str,
    ) -> MarkerHandle {
        if let Some(old) = self.handles.remove(id) {
            map.remove_marker(old);
        }
        let handle = map.place_marker(coords, label);
        self.handles.insert(id.clone(), handle);
        handle
    }

    /// Remove a workout's marker from the map. Returns false if it had none.
    pub fn detach<M: MapSurface>(&mut self, map: &mut M, id: &WorkoutId) -> bool {
        match self.handles.remove(id) {
            Some(handle) => {
                map.remove_marker(handle);
                true
            }
            None => false,
        }
    }

    pub fn handle_for(&self, id: &WorkoutId) -> Option<MarkerHandle> {
        self.handles.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Remove every marker from the map
    pub fn clear<M: MapSurface>(&mut self, map: &mut M) {
        for (_, handle) in self.handles.drain() {
            map.remove_marker(handle);
        }
    }
}

/// A map with no display; tracks live markers and the focus point
#[derive(Debug, Default)]
pub struct HeadlessMap {
    next: u64,
    markers: BTreeMap<MarkerHandle, (Coords, String)>,
    focus: Option<Coords>,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn has_marker(&self, handle: MarkerHandle) -> bool {
        self.markers.contains_key(&handle)
    }

    pub fn label(&self, handle: MarkerHandle) -> Option<&str> {
        self.markers.get(&handle).map(|(_, label)| label.as_str())
    }

    pub fn focused(&self) -> Option<Coords> {
        self.focus
    }
}

impl MapSurface for HeadlessMap {
    fn place_marker(&mut self, coords: Coords, label: &str) -> MarkerHandle {
        self.next += 1;
        let handle = MarkerHandle(self.next);
        self.markers.insert(handle, (coords, label.to_string()));
        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        self.markers.remove(&handle);
    }

    fn focus(&mut self, coords: Coords) {
        self.focus = Some(coords);
    }
}
