//! # Event Graph
//!
//! The resolved, self-consistent snapshot of one event.
//!
//! Entities are held in ID-keyed arenas (`BTreeMap`s), so every public
//! object exists exactly once and every cross reference is an ID resolved
//! through the graph. Magnitudes live under their owning origin; a
//! magnitude whose origin is not part of the graph is kept detached.

use crate::registry::ObjectLookup;
use crate::{
    Amplitude, Diagnostic, Event, FocalMechanism, Magnitude, Origin, Pick, PublicId, QuakeError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// EVENT GRAPH
// =============================================================================

/// An event with every object the renderers need.
#[derive(Debug, Clone, PartialEq)]
pub struct EventGraph {
    pub(crate) event: Event,
    pub(crate) origins: BTreeMap<PublicId, Origin>,
    pub(crate) focal_mechanisms: BTreeMap<PublicId, FocalMechanism>,
    /// Magnitudes whose origin is not included.
    pub(crate) detached_magnitudes: BTreeMap<PublicId, Magnitude>,
    pub(crate) picks: BTreeMap<PublicId, Pick>,
    pub(crate) amplitudes: BTreeMap<PublicId, Amplitude>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl EventGraph {
    /// A graph holding only the event.
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self {
            event,
            origins: BTreeMap::new(),
            focal_mechanisms: BTreeMap::new(),
            detached_magnitudes: BTreeMap::new(),
            picks: BTreeMap::new(),
            amplitudes: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Included origins, ordered by ID.
    pub fn origins(&self) -> impl Iterator<Item = &Origin> {
        self.origins.values()
    }

    #[must_use]
    pub fn origin(&self, id: &str) -> Option<&Origin> {
        self.origins.get(id)
    }

    #[must_use]
    pub fn contains_origin(&self, id: &str) -> bool {
        self.origins.contains_key(id)
    }

    /// Insert an origin unless one with the same ID exists (first wins).
    ///
    /// Magnitudes carried by the origin are attached through
    /// [`attach_magnitude`](Self::attach_magnitude) so IDs stay unique.
    pub fn insert_origin(&mut self, mut origin: Origin) -> bool {
        if self.origins.contains_key(&origin.public_id) {
            return false;
        }
        let magnitudes = std::mem::take(&mut origin.magnitudes);
        let id = origin.public_id.clone();
        self.origins.insert(id.clone(), origin);
        for mut magnitude in magnitudes {
            magnitude.origin_id.get_or_insert_with(|| id.clone());
            self.attach_magnitude(magnitude);
        }
        true
    }

    pub(crate) fn origin_mut(&mut self, id: &str) -> Option<&mut Origin> {
        self.origins.get_mut(id)
    }

    pub fn focal_mechanisms(&self) -> impl Iterator<Item = &FocalMechanism> {
        self.focal_mechanisms.values()
    }

    #[must_use]
    pub fn focal_mechanism(&self, id: &str) -> Option<&FocalMechanism> {
        self.focal_mechanisms.get(id)
    }

    /// Insert a focal mechanism unless one with the same ID exists.
    pub fn insert_focal_mechanism(&mut self, focal_mechanism: FocalMechanism) -> bool {
        if self
            .focal_mechanisms
            .contains_key(&focal_mechanism.public_id)
        {
            return false;
        }
        self.focal_mechanisms
            .insert(focal_mechanism.public_id.clone(), focal_mechanism);
        true
    }

    pub fn detached_magnitudes(&self) -> impl Iterator<Item = &Magnitude> {
        self.detached_magnitudes.values()
    }

    /// Every magnitude in the graph: origin children first, then detached.
    pub fn magnitudes(&self) -> impl Iterator<Item = &Magnitude> {
        self.origins
            .values()
            .flat_map(|o| o.magnitudes.iter())
            .chain(self.detached_magnitudes.values())
    }

    /// Find a magnitude anywhere in the graph.
    #[must_use]
    pub fn magnitude(&self, id: &str) -> Option<&Magnitude> {
        self.origins
            .values()
            .find_map(|o| o.magnitude(id))
            .or_else(|| self.detached_magnitudes.get(id))
    }

    /// Attach a magnitude to its origin, or keep it detached when the origin
    /// is not included. Returns `false` if the ID is already present.
    pub fn attach_magnitude(&mut self, magnitude: Magnitude) -> bool {
        if self.magnitude(magnitude.public_id.as_str()).is_some() {
            return false;
        }
        let owner = match &magnitude.origin_id {
            Some(id) => self.origins.get_mut(id.as_str()),
            None => None,
        };
        match owner {
            Some(origin) => origin.magnitudes.push(magnitude),
            None => {
                self.detached_magnitudes
                    .insert(magnitude.public_id.clone(), magnitude);
            }
        }
        true
    }

    pub fn picks(&self) -> impl Iterator<Item = &Pick> {
        self.picks.values()
    }

    #[must_use]
    pub fn pick(&self, id: &str) -> Option<&Pick> {
        self.picks.get(id)
    }

    pub fn insert_pick(&mut self, pick: Pick) -> bool {
        if self.picks.contains_key(&pick.public_id) {
            return false;
        }
        self.picks.insert(pick.public_id.clone(), pick);
        true
    }

    pub fn amplitudes(&self) -> impl Iterator<Item = &Amplitude> {
        self.amplitudes.values()
    }

    #[must_use]
    pub fn amplitude(&self, id: &str) -> Option<&Amplitude> {
        self.amplitudes.get(id)
    }

    pub fn insert_amplitude(&mut self, amplitude: Amplitude) -> bool {
        if self.amplitudes.contains_key(&amplitude.public_id) {
            return false;
        }
        self.amplitudes
            .insert(amplitude.public_id.clone(), amplitude);
        true
    }

    // -------------------------------------------------------------------------
    // Preferred selections
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn preferred_origin(&self) -> Option<&Origin> {
        let id = self.event.preferred_origin_id.as_ref()?;
        self.origin(id.as_str())
    }

    #[must_use]
    pub fn preferred_magnitude(&self) -> Option<&Magnitude> {
        let id = self.event.preferred_magnitude_id.as_ref()?;
        self.magnitude(id.as_str())
    }

    #[must_use]
    pub fn preferred_focal_mechanism(&self) -> Option<&FocalMechanism> {
        let id = self.event.preferred_focal_mechanism_id.as_ref()?;
        self.focal_mechanism(id.as_str())
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    /// Soft failures recorded while the graph was assembled.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    // -------------------------------------------------------------------------
    // Invariants
    // -------------------------------------------------------------------------

    /// Check reference bijection, ID uniqueness and the preferred origin.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first broken invariant.
    pub fn verify(&self) -> Result<(), QuakeError> {
        check_refs(
            "origin",
            &self.event.origin_refs,
            self.origins.keys(),
        )?;
        check_refs(
            "focal mechanism",
            &self.event.focal_mechanism_refs,
            self.focal_mechanisms.keys(),
        )?;

        let mut magnitude_ids = BTreeSet::new();
        for magnitude in self.magnitudes() {
            if !magnitude_ids.insert(magnitude.public_id.as_str()) {
                return Err(QuakeError::InvariantViolation(format!(
                    "duplicate magnitude '{}'",
                    magnitude.public_id
                )));
            }
        }

        let mut station_magnitude_ids = BTreeSet::new();
        for origin in self.origins.values() {
            for station_magnitude in &origin.station_magnitudes {
                if !station_magnitude_ids.insert(station_magnitude.public_id.as_str()) {
                    return Err(QuakeError::InvariantViolation(format!(
                        "duplicate station magnitude '{}'",
                        station_magnitude.public_id
                    )));
                }
            }
        }

        let mut tensor_ids = BTreeSet::new();
        for focal_mechanism in self.focal_mechanisms.values() {
            for tensor in &focal_mechanism.moment_tensors {
                if !tensor_ids.insert(tensor.public_id.as_str()) {
                    return Err(QuakeError::InvariantViolation(format!(
                        "duplicate moment tensor '{}'",
                        tensor.public_id
                    )));
                }
            }
        }

        if self.preferred_origin().is_none() {
            return Err(QuakeError::InvariantViolation(format!(
                "preferred origin of event '{}' is not included",
                self.event.public_id
            )));
        }
        Ok(())
    }
}

fn check_refs<'a>(
    what: &str,
    refs: &[PublicId],
    included: impl Iterator<Item = &'a PublicId>,
) -> Result<(), QuakeError> {
    let mut seen = BTreeSet::new();
    for id in refs {
        if !seen.insert(id) {
            return Err(QuakeError::InvariantViolation(format!(
                "duplicate {what} reference '{id}'"
            )));
        }
    }
    let included: BTreeSet<&PublicId> = included.collect();
    if let Some(dangling) = seen.difference(&included).next() {
        return Err(QuakeError::InvariantViolation(format!(
            "dangling {what} reference '{dangling}'"
        )));
    }
    if let Some(missing) = included.difference(&seen).next() {
        return Err(QuakeError::InvariantViolation(format!(
            "{what} '{missing}' is not referenced by the event"
        )));
    }
    Ok(())
}

impl ObjectLookup for EventGraph {
    fn find_magnitude(&self, id: &str) -> Option<&Magnitude> {
        self.magnitude(id)
    }

    fn find_pick(&self, id: &str) -> Option<&Pick> {
        self.pick(id)
    }

    fn find_amplitude(&self, id: &str) -> Option<&Amplitude> {
        self.amplitude(id)
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Flat, ordered form of an [`EventGraph`] used by both document formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableEventGraph {
    pub event: Event,
    #[serde(default)]
    pub origins: Vec<Origin>,
    #[serde(default)]
    pub focal_mechanisms: Vec<FocalMechanism>,
    /// Detached magnitudes only; origin magnitudes travel inside origins.
    #[serde(default)]
    pub magnitudes: Vec<Magnitude>,
    #[serde(default)]
    pub picks: Vec<Pick>,
    #[serde(default)]
    pub amplitudes: Vec<Amplitude>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl From<&EventGraph> for SerializableEventGraph {
    fn from(graph: &EventGraph) -> Self {
        Self {
            event: graph.event.clone(),
            origins: graph.origins.values().cloned().collect(),
            focal_mechanisms: graph.focal_mechanisms.values().cloned().collect(),
            magnitudes: graph.detached_magnitudes.values().cloned().collect(),
            picks: graph.picks.values().cloned().collect(),
            amplitudes: graph.amplitudes.values().cloned().collect(),
            diagnostics: graph.diagnostics.clone(),
        }
    }
}

impl TryFrom<SerializableEventGraph> for EventGraph {
    type Error = QuakeError;

    /// Rebuild the arenas; any repeated ID or broken reference is rejected.
    fn try_from(sg: SerializableEventGraph) -> Result<Self, Self::Error> {
        let mut graph = Self::new(sg.event);
        graph.diagnostics = sg.diagnostics;

        for origin in sg.origins {
            let id = origin.public_id.clone();
            let magnitude_count = origin.magnitudes.len();
            if !graph.insert_origin(origin) {
                return Err(duplicate("origin", &id));
            }
            let attached = graph.origins.get(&id).map_or(0, |o| o.magnitudes.len());
            if attached != magnitude_count {
                return Err(QuakeError::InvariantViolation(format!(
                    "origin '{id}' repeats a magnitude ID"
                )));
            }
        }
        for focal_mechanism in sg.focal_mechanisms {
            let id = focal_mechanism.public_id.clone();
            if !graph.insert_focal_mechanism(focal_mechanism) {
                return Err(duplicate("focal mechanism", &id));
            }
        }
        for magnitude in sg.magnitudes {
            let id = magnitude.public_id.clone();
            if !graph.attach_magnitude(magnitude) {
                return Err(duplicate("magnitude", &id));
            }
        }
        for pick in sg.picks {
            let id = pick.public_id.clone();
            if !graph.insert_pick(pick) {
                return Err(duplicate("pick", &id));
            }
        }
        for amplitude in sg.amplitudes {
            let id = amplitude.public_id.clone();
            if !graph.insert_amplitude(amplitude) {
                return Err(duplicate("amplitude", &id));
            }
        }

        graph.verify()?;
        Ok(graph)
    }
}

fn duplicate(what: &str, id: &PublicId) -> QuakeError {
    QuakeError::InvariantViolation(format!("duplicate {what} '{id}'"))
}

// =============================================================================
// TESTS
// =============================================================================
