//! # Entity Store
//!
//! The `EntityStore` trait is the contract between the resolver and the
//! database holding the analysis results. It only offers point lookups by
//! public ID, child loading by parent ID and time-range queries.
//!
//! Point lookups return bare entities: origins come without arrivals,
//! magnitudes, station magnitudes or comments, focal mechanisms without
//! moment tensors. Children and comments are loaded with the child calls.
//!
//! `MemoryStore` is the deterministic `BTreeMap` implementation used by
//! tests and by callers that already hold their objects in memory.

use crate::graph::EventGraph;
use crate::{
    Amplitude, Arrival, Comment, Event, FocalMechanism, Magnitude, MomentTensor, Origin, Pick,
    PublicId, QuakeError, StationMagnitude,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// ENTITYSTORE TRAIT
// =============================================================================

/// Lazily-queryable source of seismological entities.
///
/// `Ok(None)` / an empty `Vec` means "not found"; `Err` is a storage failure
/// and is propagated by the resolver. The store may change between two calls.
pub trait EntityStore {
    /// Load an event with its descriptions and association lists.
    fn load_event(&self, id: &PublicId) -> Result<Option<Event>, QuakeError>;

    /// Load a bare origin.
    fn load_origin(&self, id: &PublicId) -> Result<Option<Origin>, QuakeError>;

    /// Load a magnitude by ID.
    fn load_magnitude(&self, id: &PublicId) -> Result<Option<Magnitude>, QuakeError>;

    /// Load a bare focal mechanism.
    fn load_focal_mechanism(&self, id: &PublicId) -> Result<Option<FocalMechanism>, QuakeError>;

    /// Load a pick by ID.
    fn load_pick(&self, id: &PublicId) -> Result<Option<Pick>, QuakeError>;

    /// Load an amplitude by ID.
    fn load_amplitude(&self, id: &PublicId) -> Result<Option<Amplitude>, QuakeError>;

    /// Amplitudes measured on a pick, whatever their reference time.
    fn amplitudes_of_pick(&self, pick_id: &PublicId) -> Result<Vec<Amplitude>, QuakeError>;

    /// Arrivals of an origin, in stored order.
    fn load_arrivals_of(&self, origin_id: &PublicId) -> Result<Vec<Arrival>, QuakeError>;

    /// Magnitudes of an origin, in stored order.
    fn load_magnitudes_of(&self, origin_id: &PublicId) -> Result<Vec<Magnitude>, QuakeError>;

    /// Station magnitudes of an origin, in stored order.
    fn load_station_magnitudes_of(
        &self,
        origin_id: &PublicId,
    ) -> Result<Vec<StationMagnitude>, QuakeError>;

    /// Comments attached to any object.
    fn load_comments_of(&self, id: &PublicId) -> Result<Vec<Comment>, QuakeError>;

    /// Moment tensors of a focal mechanism.
    fn load_moment_tensors_of(
        &self,
        focal_mechanism_id: &PublicId,
    ) -> Result<Vec<MomentTensor>, QuakeError>;

    /// Picks with `start <= time <= end`.
    fn picks_in_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Pick>, QuakeError>;

    /// Amplitudes whose reference time lies in `[start, end]`.
    fn amplitudes_in_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Amplitude>, QuakeError>;

    /// Bare origins associated with an event.
    fn origins_of_event(&self, event_id: &PublicId) -> Result<Vec<Origin>, QuakeError>;

    /// Bare focal mechanisms associated with an event.
    fn focal_mechanisms_of_event(
        &self,
        event_id: &PublicId,
    ) -> Result<Vec<FocalMechanism>, QuakeError>;
}

/// Number of stored objects per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub events: usize,
    pub origins: usize,
    pub magnitudes: usize,
    pub focal_mechanisms: usize,
    pub picks: usize,
    pub amplitudes: usize,
}

pub(crate) fn in_range(time: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start <= time && time <= end
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory store with the same bare/child split as a database.
///
/// Uses `BTreeMap` exclusively so query results are deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    events: BTreeMap<PublicId, Event>,
    origins: BTreeMap<PublicId, Origin>,
    arrivals: BTreeMap<PublicId, Vec<Arrival>>,
    station_magnitudes: BTreeMap<PublicId, Vec<StationMagnitude>>,
    magnitudes: BTreeMap<PublicId, Magnitude>,
    /// Origin ID -> magnitude IDs in insertion order.
    origin_magnitudes: BTreeMap<PublicId, Vec<PublicId>>,
    focal_mechanisms: BTreeMap<PublicId, FocalMechanism>,
    moment_tensors: BTreeMap<PublicId, Vec<MomentTensor>>,
    picks: BTreeMap<PublicId, Pick>,
    amplitudes: BTreeMap<PublicId, Amplitude>,
    comments: BTreeMap<PublicId, Vec<Comment>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding every object of a resolved graph.
    #[must_use]
    pub fn from_graph(graph: &EventGraph) -> Self {
        let mut store = Self::new();
        store.ingest_graph(graph);
        store
    }

    fn keep_comments(&mut self, id: &PublicId, comments: Vec<Comment>) {
        if comments.is_empty() {
            self.comments.remove(id);
        } else {
            self.comments.insert(id.clone(), comments);
        }
    }

    /// Insert or replace an event. Comments are stored separately.
    pub fn insert_event(&mut self, mut event: Event) {
        let comments = std::mem::take(&mut event.comments);
        self.keep_comments(&event.public_id, comments);
        self.events.insert(event.public_id.clone(), event);
    }

    /// Insert or replace an origin together with all of its children.
    pub fn insert_origin(&mut self, mut origin: Origin) {
        let id = origin.public_id.clone();
        let comments = std::mem::take(&mut origin.comments);
        self.keep_comments(&id, comments);
        self.arrivals
            .insert(id.clone(), std::mem::take(&mut origin.arrivals));
        self.station_magnitudes
            .insert(id.clone(), std::mem::take(&mut origin.station_magnitudes));
        for mut magnitude in std::mem::take(&mut origin.magnitudes) {
            magnitude.origin_id.get_or_insert_with(|| id.clone());
            self.insert_magnitude(magnitude);
        }
        self.origins.insert(id, origin);
    }

    /// Insert or replace a magnitude; it is listed under its `origin_id`.
    pub fn insert_magnitude(&mut self, mut magnitude: Magnitude) {
        let id = magnitude.public_id.clone();
        let comments = std::mem::take(&mut magnitude.comments);
        self.keep_comments(&id, comments);
        if let Some(origin_id) = &magnitude.origin_id {
            let ids = self.origin_magnitudes.entry(origin_id.clone()).or_default();
            if !ids.contains(&id) {
                ids.push(id.clone());
            }
        }
        self.magnitudes.insert(id, magnitude);
    }

    /// Insert or replace a focal mechanism together with its moment tensors.
    pub fn insert_focal_mechanism(&mut self, mut focal_mechanism: FocalMechanism) {
        let id = focal_mechanism.public_id.clone();
        let comments = std::mem::take(&mut focal_mechanism.comments);
        self.keep_comments(&id, comments);
        let mut tensors = std::mem::take(&mut focal_mechanism.moment_tensors);
        for tensor in &mut tensors {
            let comments = std::mem::take(&mut tensor.comments);
            let tensor_id = tensor.public_id.clone();
            self.keep_comments(&tensor_id, comments);
        }
        self.moment_tensors.insert(id.clone(), tensors);
        self.focal_mechanisms.insert(id, focal_mechanism);
    }

    pub fn insert_pick(&mut self, pick: Pick) {
        self.picks.insert(pick.public_id.clone(), pick);
    }

    pub fn insert_amplitude(&mut self, amplitude: Amplitude) {
        self.amplitudes.insert(amplitude.public_id.clone(), amplitude);
    }

    /// Attach an additional comment to any object.
    pub fn add_comment(&mut self, id: &PublicId, comment: Comment) {
        self.comments.entry(id.clone()).or_default().push(comment);
    }

    /// Remove an event. Returns `true` if it existed.
    pub fn remove_event(&mut self, id: &PublicId) -> bool {
        self.events.remove(id).is_some()
    }

    /// Remove an origin and its children. Returns `true` if it existed.
    ///
    /// Event association lists are left untouched, like a concurrent
    /// deletion in a database would.
    pub fn remove_origin(&mut self, id: &PublicId) -> bool {
        self.arrivals.remove(id);
        self.station_magnitudes.remove(id);
        if let Some(ids) = self.origin_magnitudes.remove(id) {
            for magnitude_id in ids {
                self.magnitudes.remove(&magnitude_id);
            }
        }
        self.origins.remove(id).is_some()
    }

    /// Remove a magnitude. Returns `true` if it existed.
    pub fn remove_magnitude(&mut self, id: &PublicId) -> bool {
        for ids in self.origin_magnitudes.values_mut() {
            ids.retain(|m| m != id);
        }
        self.magnitudes.remove(id).is_some()
    }

    /// Insert every object of a graph, keeping its association lists.
    pub fn ingest_graph(&mut self, graph: &EventGraph) {
        self.insert_event(graph.event().clone());
        for origin in graph.origins() {
            self.insert_origin(origin.clone());
        }
        for magnitude in graph.detached_magnitudes() {
            self.insert_magnitude(magnitude.clone());
        }
        for focal_mechanism in graph.focal_mechanisms() {
            self.insert_focal_mechanism(focal_mechanism.clone());
        }
        for pick in graph.picks() {
            self.insert_pick(pick.clone());
        }
        for amplitude in graph.amplitudes() {
            self.insert_amplitude(amplitude.clone());
        }
    }

    #[must_use]
    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            events: self.events.len(),
            origins: self.origins.len(),
            magnitudes: self.magnitudes.len(),
            focal_mechanisms: self.focal_mechanisms.len(),
            picks: self.picks.len(),
            amplitudes: self.amplitudes.len(),
        }
    }
}

impl EntityStore for MemoryStore {
    fn load_event(&self, id: &PublicId) -> Result<Option<Event>, QuakeError> {
        Ok(self.events.get(id).cloned())
    }

    fn load_origin(&self, id: &PublicId) -> Result<Option<Origin>, QuakeError> {
        Ok(self.origins.get(id).cloned())
    }

    fn load_magnitude(&self, id: &PublicId) -> Result<Option<Magnitude>, QuakeError> {
        Ok(self.magnitudes.get(id).cloned())
    }

    fn load_focal_mechanism(&self, id: &PublicId) -> Result<Option<FocalMechanism>, QuakeError> {
        Ok(self.focal_mechanisms.get(id).cloned())
    }

    fn load_pick(&self, id: &PublicId) -> Result<Option<Pick>, QuakeError> {
        Ok(self.picks.get(id).cloned())
    }

    fn load_amplitude(&self, id: &PublicId) -> Result<Option<Amplitude>, QuakeError> {
        Ok(self.amplitudes.get(id).cloned())
    }

    fn amplitudes_of_pick(&self, pick_id: &PublicId) -> Result<Vec<Amplitude>, QuakeError> {
        Ok(self
            .amplitudes
            .values()
            .filter(|a| a.pick_id.as_ref() == Some(pick_id))
            .cloned()
            .collect())
    }

    fn load_arrivals_of(&self, origin_id: &PublicId) -> Result<Vec<Arrival>, QuakeError> {
        Ok(self.arrivals.get(origin_id).cloned().unwrap_or_default())
    }

    fn load_magnitudes_of(&self, origin_id: &PublicId) -> Result<Vec<Magnitude>, QuakeError> {
        let Some(ids) = self.origin_magnitudes.get(origin_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.magnitudes.get(id).cloned())
            .collect())
    }

    fn load_station_magnitudes_of(
        &self,
        origin_id: &PublicId,
    ) -> Result<Vec<StationMagnitude>, QuakeError> {
        Ok(self
            .station_magnitudes
            .get(origin_id)
            .cloned()
            .unwrap_or_default())
    }

    fn load_comments_of(&self, id: &PublicId) -> Result<Vec<Comment>, QuakeError> {
        Ok(self.comments.get(id).cloned().unwrap_or_default())
    }

    fn load_moment_tensors_of(
        &self,
        focal_mechanism_id: &PublicId,
    ) -> Result<Vec<MomentTensor>, QuakeError> {
        Ok(self
            .moment_tensors
            .get(focal_mechanism_id)
            .cloned()
            .unwrap_or_default())
    }

    fn picks_in_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Pick>, QuakeError> {
        Ok(self
            .picks
            .values()
            .filter(|p| in_range(p.time.value, start, end))
            .cloned()
            .collect())
    }

    fn amplitudes_in_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Amplitude>, QuakeError> {
        Ok(self
            .amplitudes
            .values()
            .filter(|a| a.reference_time.is_some_and(|t| in_range(t, start, end)))
            .cloned()
            .collect())
    }

    fn origins_of_event(&self, event_id: &PublicId) -> Result<Vec<Origin>, QuakeError> {
        let Some(event) = self.events.get(event_id) else {
            return Ok(Vec::new());
        };
        Ok(event
            .origin_refs
            .iter()
            .filter_map(|id| self.origins.get(id).cloned())
            .collect())
    }

    fn focal_mechanisms_of_event(
        &self,
        event_id: &PublicId,
    ) -> Result<Vec<FocalMechanism>, QuakeError> {
        let Some(event) = self.events.get(event_id) else {
            return Ok(Vec::new());
        };
        Ok(event
            .focal_mechanism_refs
            .iter()
            .filter_map(|id| self.focal_mechanisms.get(id).cloned())
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
