//! # Subgraph Resolver
//!
//! Builds an [`EventGraph`] from an [`EntityStore`] in linear load phases:
//!
//! 1. Event header (fatal if missing), with preferred-ID overrides applied
//! 2. Focal mechanisms and their moment tensors
//! 3. Origins from the event, derived origins and triggering origins
//! 4. Origin children (magnitudes, arrivals, station magnitudes, comments)
//! 5. Preferred magnitude: graph pool, then registry, then point load
//! 6. Moment magnitude, reusing the preferred magnitude when IDs match
//! 7. Picks and amplitudes
//! 8. Redaction and reference rebuild
//!
//! Only a missing event or preferred origin aborts. Every other missing
//! object is logged, recorded as a [`Diagnostic`] and left out.

use crate::consistency;
use crate::graph::EventGraph;
use crate::primitives::{DEFAULT_PICK_WINDOW_AFTER_SECS, DEFAULT_PICK_WINDOW_BEFORE_SECS};
use crate::registry::{ObjectLookup, ObjectRegistry};
use crate::store::EntityStore;
use crate::{
    Amplitude, Diagnostic, EntityKind, Event, FocalMechanism, Magnitude, Origin, Pick, PublicId,
    QuakeError,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// OPTIONS
// =============================================================================

/// What to include in a resolved graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Load every magnitude of every included origin, not just the preferred.
    pub include_all_magnitudes: bool,
    pub include_comments: bool,
    pub include_picks_and_amplitudes: bool,
    /// Keep author names; agency IDs are always kept.
    pub include_full_creation_info: bool,
    /// Keep green's function and station/phase setup of moment tensors.
    pub include_moment_tensor_contributions: bool,
    pub preferred_origin_id: Option<PublicId>,
    pub preferred_magnitude_id: Option<PublicId>,
    pub preferred_focal_mechanism_id: Option<PublicId>,
    pub pick_window_before_secs: i64,
    pub pick_window_after_secs: i64,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            include_all_magnitudes: false,
            include_comments: false,
            include_picks_and_amplitudes: false,
            include_full_creation_info: false,
            include_moment_tensor_contributions: false,
            preferred_origin_id: None,
            preferred_magnitude_id: None,
            preferred_focal_mechanism_id: None,
            pick_window_before_secs: DEFAULT_PICK_WINDOW_BEFORE_SECS,
            pick_window_after_secs: DEFAULT_PICK_WINDOW_AFTER_SECS,
        }
    }
}

impl ResolveOptions {
    /// Everything included, nothing redacted.
    #[must_use]
    pub fn full() -> Self {
        Self {
            include_all_magnitudes: true,
            include_comments: true,
            include_picks_and_amplitudes: true,
            include_full_creation_info: true,
            include_moment_tensor_contributions: true,
            ..Self::default()
        }
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Resolve an event without a registry.
///
/// # Errors
///
/// `NotFound` for a missing event or preferred origin, any store error.
pub fn resolve<S: EntityStore + ?Sized>(
    store: &S,
    event_id: &PublicId,
    options: &ResolveOptions,
) -> Result<EventGraph, QuakeError> {
    Resolver::new(store, options).resolve(event_id)
}

/// Resolve an event, consulting `registry` before point loads.
///
/// # Errors
///
/// Same as [`resolve`].
pub fn resolve_with_registry<S: EntityStore + ?Sized>(
    store: &S,
    event_id: &PublicId,
    options: &ResolveOptions,
    registry: &ObjectRegistry,
) -> Result<EventGraph, QuakeError> {
    Resolver::new(store, options)
        .with_registry(registry)
        .resolve(event_id)
}

/// Picks of a time span, optionally with their amplitudes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickSet {
    pub picks: Vec<Pick>,
    pub amplitudes: Vec<Amplitude>,
}

/// Load all picks in `[start, end]`.
///
/// With a non-empty `authors` whitelist, picks whose author is not listed
/// (or unknown) are skipped. Amplitudes are those referencing a kept pick.
///
/// # Errors
///
/// Propagates store errors.
pub fn picks_for_timespan<S: EntityStore + ?Sized>(
    store: &S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    with_amplitudes: bool,
    authors: &[String],
) -> Result<PickSet, QuakeError> {
    let picks: Vec<Pick> = store
        .picks_in_time_range(start, end)?
        .into_iter()
        .filter(|pick| {
            authors.is_empty()
                || pick
                    .author()
                    .is_some_and(|author| authors.iter().any(|a| a == author))
        })
        .collect();

    let amplitudes = if with_amplitudes {
        let pick_ids: BTreeSet<&PublicId> = picks.iter().map(|p| &p.public_id).collect();
        store
            .amplitudes_in_time_range(start, end)?
            .into_iter()
            .filter(|a| a.pick_id.as_ref().is_some_and(|id| pick_ids.contains(id)))
            .collect()
    } else {
        Vec::new()
    };

    tracing::debug!(
        "{} picks and {} amplitudes between {} and {}",
        picks.len(),
        amplitudes.len(),
        start,
        end
    );
    Ok(PickSet { picks, amplitudes })
}

// =============================================================================
// RESOLVER
// =============================================================================

/// One resolution run over a store.
pub struct Resolver<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    options: &'a ResolveOptions,
    registry: Option<&'a ObjectRegistry>,
}

impl<'a, S: EntityStore + ?Sized> Resolver<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, options: &'a ResolveOptions) -> Self {
        Self {
            store,
            options,
            registry: None,
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: &'a ObjectRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Run all load phases for `event_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing event or preferred origin, `InvalidFormat`
    /// for an event without preferred origin ID, any store error.
    pub fn resolve(&self, event_id: &PublicId) -> Result<EventGraph, QuakeError> {
        let mut event = self
            .store
            .load_event(event_id)?
            .ok_or_else(|| QuakeError::not_found(EntityKind::Event, event_id))?;
        self.apply_overrides(&mut event);
        if self.options.include_comments && event.comments.is_empty() {
            event.comments = self.store.load_comments_of(event_id)?;
        }

        let mut graph = EventGraph::new(event);
        self.load_focal_mechanisms(&mut graph)?;
        self.collect_origins(&mut graph)?;
        Self::require_preferred_origin(&graph)?;
        self.load_origin_children(&mut graph)?;
        self.resolve_preferred_magnitude(&mut graph)?;
        self.resolve_moment_magnitude(&mut graph)?;
        if self.options.include_picks_and_amplitudes {
            self.load_picks_and_amplitudes(&mut graph)?;
        }

        if !self.options.include_moment_tensor_contributions {
            Self::strip_preferred_contributions(&mut graph);
        }
        if !self.options.include_full_creation_info {
            consistency::strip_authors(&mut graph);
        }
        if !self.options.include_comments {
            consistency::strip_comments(&mut graph);
        }
        consistency::rebuild_references(&mut graph);

        tracing::debug!(
            "Resolved event {}: {} origins, {} focal mechanisms, {} picks, {} diagnostics",
            event_id,
            graph.origins.len(),
            graph.focal_mechanisms.len(),
            graph.picks.len(),
            graph.diagnostics.len()
        );
        Ok(graph)
    }

    fn apply_overrides(&self, event: &mut Event) {
        if let Some(id) = &self.options.preferred_origin_id {
            event.preferred_origin_id = Some(id.clone());
        }
        if let Some(id) = &self.options.preferred_magnitude_id {
            event.preferred_magnitude_id = Some(id.clone());
        }
        if let Some(id) = &self.options.preferred_focal_mechanism_id {
            event.preferred_focal_mechanism_id = Some(id.clone());
        }
    }

    // -------------------------------------------------------------------------
    // Focal mechanisms
    // -------------------------------------------------------------------------

    fn load_focal_mechanisms(&self, graph: &mut EventGraph) -> Result<(), QuakeError> {
        let event_id = graph.event.public_id.clone();
        for mut focal_mechanism in self.store.focal_mechanisms_of_event(&event_id)? {
            if graph.focal_mechanism(focal_mechanism.public_id.as_str()).is_some() {
                continue;
            }
            self.complete_focal_mechanism(&mut focal_mechanism)?;
            graph.insert_focal_mechanism(focal_mechanism);
        }

        let Some(preferred_id) = graph.event.preferred_focal_mechanism_id.clone() else {
            return Ok(());
        };
        if graph.focal_mechanism(preferred_id.as_str()).is_some() {
            return Ok(());
        }
        match self.store.load_focal_mechanism(&preferred_id)? {
            Some(mut focal_mechanism) => {
                self.complete_focal_mechanism(&mut focal_mechanism)?;
                graph.insert_focal_mechanism(focal_mechanism);
            }
            None => {
                tracing::warn!("Preferred focal mechanism {} not found", preferred_id);
                graph.push_diagnostic(Diagnostic::warning(
                    EntityKind::FocalMechanism,
                    &preferred_id,
                    "preferred focal mechanism not found",
                ));
            }
        }
        Ok(())
    }

    fn complete_focal_mechanism(
        &self,
        focal_mechanism: &mut FocalMechanism,
    ) -> Result<(), QuakeError> {
        if focal_mechanism.moment_tensors.is_empty() {
            focal_mechanism.moment_tensors = self
                .store
                .load_moment_tensors_of(&focal_mechanism.public_id)?;
        }
        if self.options.include_comments {
            if focal_mechanism.comments.is_empty() {
                focal_mechanism.comments =
                    self.store.load_comments_of(&focal_mechanism.public_id)?;
            }
            for tensor in &mut focal_mechanism.moment_tensors {
                if tensor.comments.is_empty() {
                    tensor.comments = self.store.load_comments_of(&tensor.public_id)?;
                }
            }
        }
        Ok(())
    }

    fn strip_preferred_contributions(graph: &mut EventGraph) {
        let Some(id) = graph.event.preferred_focal_mechanism_id.clone() else {
            return;
        };
        if let Some(focal_mechanism) = graph.focal_mechanisms.get_mut(id.as_str()) {
            focal_mechanism
                .moment_tensors
                .iter_mut()
                .for_each(consistency::strip_moment_tensor_contributions);
        }
    }

    // -------------------------------------------------------------------------
    // Origins
    // -------------------------------------------------------------------------

    fn collect_origins(&self, graph: &mut EventGraph) -> Result<(), QuakeError> {
        let event_id = graph.event.public_id.clone();
        for origin in self.store.origins_of_event(&event_id)? {
            if !graph.insert_origin(origin) {
                tracing::debug!("Origin returned twice for event {}", event_id);
            }
        }

        // References the association query did not return.
        let refs: Vec<PublicId> = graph
            .event
            .origin_refs
            .iter()
            .filter(|id| !graph.contains_origin(id.as_str()))
            .cloned()
            .collect();
        for id in refs {
            match self.store.load_origin(&id)? {
                Some(origin) => {
                    graph.insert_origin(origin);
                }
                None => tracing::debug!("Dropping stale origin reference {}", id),
            }
        }

        let derived: Vec<PublicId> = graph
            .focal_mechanisms
            .values()
            .flat_map(|fm| fm.moment_tensors.iter())
            .filter_map(|mt| mt.derived_origin_id.clone())
            .collect();
        for id in derived {
            self.load_secondary_origin(graph, &id, "Derived")?;
        }

        let triggering: Vec<PublicId> = graph
            .focal_mechanisms
            .values()
            .filter_map(|fm| fm.triggering_origin_id.clone())
            .collect();
        for id in triggering {
            self.load_secondary_origin(graph, &id, "Triggering")?;
        }
        Ok(())
    }

    fn load_secondary_origin(
        &self,
        graph: &mut EventGraph,
        id: &PublicId,
        role: &str,
    ) -> Result<(), QuakeError> {
        if graph.contains_origin(id.as_str()) {
            return Ok(());
        }
        let origin: Option<Origin> = match self.store.load_origin(id)? {
            Some(origin) => Some(origin),
            None => self
                .registry
                .and_then(|r| r.origin(id.as_str()))
                .cloned(),
        };
        match origin {
            Some(origin) => {
                tracing::debug!("{} origin {} loaded outside the event", role, id);
                graph.insert_origin(origin);
            }
            None => {
                tracing::warn!("{} origin {} not found", role, id);
                graph.push_diagnostic(Diagnostic::warning(
                    EntityKind::Origin,
                    id,
                    format!("{} origin not found", role.to_lowercase()),
                ));
            }
        }
        Ok(())
    }

    fn require_preferred_origin(graph: &EventGraph) -> Result<(), QuakeError> {
        let event = graph.event();
        let Some(id) = &event.preferred_origin_id else {
            return Err(QuakeError::InvalidFormat(format!(
                "event '{}' has no preferred origin ID",
                event.public_id
            )));
        };
        if graph.contains_origin(id.as_str()) {
            Ok(())
        } else {
            tracing::error!("Preferred origin {} of event {} not found", id, event.public_id);
            Err(QuakeError::not_found(EntityKind::Origin, id))
        }
    }

    fn load_origin_children(&self, graph: &mut EventGraph) -> Result<(), QuakeError> {
        let with_station_magnitudes =
            self.options.include_all_magnitudes || self.options.include_picks_and_amplitudes;
        let ids: Vec<PublicId> = graph.origins.keys().cloned().collect();

        for id in &ids {
            let arrivals = if self.options.include_picks_and_amplitudes {
                self.store.load_arrivals_of(id)?
            } else {
                Vec::new()
            };
            let station_magnitudes = if with_station_magnitudes {
                self.store.load_station_magnitudes_of(id)?
            } else {
                Vec::new()
            };
            let comments = if self.options.include_comments {
                self.store.load_comments_of(id)?
            } else {
                Vec::new()
            };
            if let Some(origin) = graph.origin_mut(id.as_str()) {
                if origin.arrivals.is_empty() {
                    origin.arrivals = arrivals;
                }
                if origin.station_magnitudes.is_empty() {
                    origin.station_magnitudes = station_magnitudes;
                }
                if origin.comments.is_empty() {
                    origin.comments = comments;
                }
            }

            if !self.options.include_all_magnitudes {
                continue;
            }
            for mut magnitude in self.store.load_magnitudes_of(id)? {
                magnitude.origin_id = Some(id.clone());
                self.load_magnitude_comments(&mut magnitude)?;
                if !graph.attach_magnitude(magnitude) {
                    tracing::debug!("Magnitude of origin {} already included", id);
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Magnitudes
    // -------------------------------------------------------------------------

    fn resolve_preferred_magnitude(&self, graph: &mut EventGraph) -> Result<(), QuakeError> {
        let Some(id) = graph.event.preferred_magnitude_id.clone() else {
            return Ok(());
        };
        self.resolve_magnitude(graph, &id, None, "Preferred")
    }

    fn resolve_moment_magnitude(&self, graph: &mut EventGraph) -> Result<(), QuakeError> {
        let Some(tensor) = graph
            .preferred_focal_mechanism()
            .and_then(FocalMechanism::moment_tensor)
        else {
            return Ok(());
        };
        let Some(id) = tensor.moment_magnitude_id.clone() else {
            return Ok(());
        };
        let derived_origin_id = tensor.derived_origin_id.clone();

        if graph.event.preferred_magnitude_id.as_ref() == Some(&id) {
            tracing::debug!("Moment magnitude {} is the preferred magnitude", id);
            return Ok(());
        }
        self.resolve_magnitude(graph, &id, derived_origin_id.as_ref(), "Moment")
    }

    /// Pool, then registry, then point load. Unresolved is a soft failure.
    fn resolve_magnitude(
        &self,
        graph: &mut EventGraph,
        id: &PublicId,
        owner: Option<&PublicId>,
        role: &str,
    ) -> Result<(), QuakeError> {
        if graph.magnitude(id.as_str()).is_some() {
            return Ok(());
        }

        let registered = self
            .registry
            .and_then(|r| r.find_magnitude(id.as_str()))
            .cloned();
        let found = match registered {
            Some(magnitude) => Some(magnitude),
            None => {
                tracing::debug!("{} magnitude {} not in registry, loading", role, id);
                self.store.load_magnitude(id)?
            }
        };

        let Some(mut magnitude) = found else {
            tracing::warn!("{} magnitude {} not found", role, id);
            graph.push_diagnostic(Diagnostic::warning(
                EntityKind::Magnitude,
                id,
                format!("{} magnitude not found", role.to_lowercase()),
            ));
            return Ok(());
        };
        if magnitude.origin_id.is_none() {
            magnitude.origin_id = owner.cloned();
        }
        self.load_magnitude_comments(&mut magnitude)?;
        graph.attach_magnitude(magnitude);
        Ok(())
    }

    fn load_magnitude_comments(&self, magnitude: &mut Magnitude) -> Result<(), QuakeError> {
        if self.options.include_comments && magnitude.comments.is_empty() {
            magnitude.comments = self.store.load_comments_of(&magnitude.public_id)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Picks and amplitudes
    // -------------------------------------------------------------------------

    fn pick_window(
        &self,
        time: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), QuakeError> {
        let start = TimeDelta::try_seconds(self.options.pick_window_before_secs)
            .and_then(|d| time.checked_sub_signed(d));
        let end = TimeDelta::try_seconds(self.options.pick_window_after_secs)
            .and_then(|d| time.checked_add_signed(d));
        match (start, end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(QuakeError::InvalidFormat(format!(
                "pick window around {time} is out of range"
            ))),
        }
    }

    fn load_picks_and_amplitudes(&self, graph: &mut EventGraph) -> Result<(), QuakeError> {
        let wanted: BTreeSet<PublicId> = graph
            .origins
            .values()
            .flat_map(|o| o.arrivals.iter())
            .map(|a| a.pick_id.clone())
            .collect();
        let station_amplitudes: BTreeSet<PublicId> = graph
            .origins
            .values()
            .flat_map(|o| o.station_magnitudes.iter())
            .filter_map(|s| s.amplitude_id.clone())
            .collect();
        let mut windows = Vec::new();
        for origin in graph.origins.values() {
            if !origin.arrivals.is_empty() {
                windows.push(self.pick_window(origin.time.value)?);
            }
        }

        for (start, end) in &windows {
            for pick in self.store.picks_in_time_range(*start, *end)? {
                if wanted.contains(&pick.public_id) {
                    graph.insert_pick(pick);
                }
            }
        }
        for id in &wanted {
            if graph.pick(id.as_str()).is_some() {
                continue;
            }
            match self.store.load_pick(id)? {
                Some(pick) => {
                    tracing::debug!("Pick {} outside the search window, loaded by ID", id);
                    graph.insert_pick(pick);
                }
                None => {
                    tracing::debug!("Pick {} not found", id);
                    graph.push_diagnostic(Diagnostic::notice(
                        EntityKind::Pick,
                        id,
                        "pick not found",
                    ));
                }
            }
        }

        let pick_ids: Vec<PublicId> = graph.picks.keys().cloned().collect();
        for pick_id in &pick_ids {
            for amplitude in self.store.amplitudes_of_pick(pick_id)? {
                graph.insert_amplitude(amplitude);
            }
        }
        for id in &station_amplitudes {
            if graph.amplitude(id.as_str()).is_some() {
                continue;
            }
            match self.store.load_amplitude(id)? {
                Some(amplitude) => {
                    graph.insert_amplitude(amplitude);
                }
                None => {
                    tracing::debug!("Amplitude {} not found", id);
                    graph.push_diagnostic(Diagnostic::notice(
                        EntityKind::Amplitude,
                        id,
                        "amplitude not found",
                    ));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
