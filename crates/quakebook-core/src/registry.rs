//! # Object Registry
//!
//! An explicit index of objects that were already resolved, owned by the
//! caller. The resolver consults it between the magnitude pool and a
//! direct store load; the bulletin uses it for out-of-band lookups.
//!
//! Nothing here is global: a registry lives as long as its owner decides,
//! typically one [`Session`](crate::Session).

use crate::graph::EventGraph;
use crate::{Amplitude, Magnitude, Origin, Pick, PublicId};
use std::collections::BTreeMap;

// =============================================================================
// OBJECT LOOKUP
// =============================================================================

/// Read-only lookup of resolved objects by public ID.
pub trait ObjectLookup {
    fn find_magnitude(&self, id: &str) -> Option<&Magnitude>;

    fn find_pick(&self, id: &str) -> Option<&Pick>;

    fn find_amplitude(&self, id: &str) -> Option<&Amplitude>;
}

/// Two lookups consulted in order.
#[derive(Clone, Copy)]
pub struct LookupChain<'a> {
    primary: &'a dyn ObjectLookup,
    fallback: &'a dyn ObjectLookup,
}

impl<'a> LookupChain<'a> {
    #[must_use]
    pub fn new(primary: &'a dyn ObjectLookup, fallback: &'a dyn ObjectLookup) -> Self {
        Self { primary, fallback }
    }
}

impl ObjectLookup for LookupChain<'_> {
    fn find_magnitude(&self, id: &str) -> Option<&Magnitude> {
        self.primary
            .find_magnitude(id)
            .or_else(|| self.fallback.find_magnitude(id))
    }

    fn find_pick(&self, id: &str) -> Option<&Pick> {
        self.primary
            .find_pick(id)
            .or_else(|| self.fallback.find_pick(id))
    }

    fn find_amplitude(&self, id: &str) -> Option<&Amplitude> {
        self.primary
            .find_amplitude(id)
            .or_else(|| self.fallback.find_amplitude(id))
    }
}

// =============================================================================
// OBJECT REGISTRY
// =============================================================================

/// ID-keyed cache of already-resolved objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    magnitudes: BTreeMap<PublicId, Magnitude>,
    origins: BTreeMap<PublicId, Origin>,
    picks: BTreeMap<PublicId, Pick>,
    amplitudes: BTreeMap<PublicId, Amplitude>,
}

impl ObjectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_magnitude(&mut self, magnitude: Magnitude) {
        self.magnitudes
            .insert(magnitude.public_id.clone(), magnitude);
    }

    /// Register a bare copy of an origin.
    pub fn register_origin(&mut self, origin: &Origin) {
        self.origins
            .insert(origin.public_id.clone(), origin.bare());
    }

    pub fn register_pick(&mut self, pick: Pick) {
        self.picks.insert(pick.public_id.clone(), pick);
    }

    pub fn register_amplitude(&mut self, amplitude: Amplitude) {
        self.amplitudes
            .insert(amplitude.public_id.clone(), amplitude);
    }

    /// Register every origin, magnitude, pick and amplitude of a graph.
    pub fn register_graph(&mut self, graph: &EventGraph) {
        for origin in graph.origins() {
            self.register_origin(origin);
        }
        for magnitude in graph.magnitudes() {
            self.register_magnitude(magnitude.clone());
        }
        for pick in graph.picks() {
            self.register_pick(pick.clone());
        }
        for amplitude in graph.amplitudes() {
            self.register_amplitude(amplitude.clone());
        }
    }

    #[must_use]
    pub fn origin(&self, id: &str) -> Option<&Origin> {
        self.origins.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.magnitudes.len() + self.origins.len() + self.picks.len() + self.amplitudes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.magnitudes.clear();
        self.origins.clear();
        self.picks.clear();
        self.amplitudes.clear();
    }
}

impl ObjectLookup for ObjectRegistry {
    fn find_magnitude(&self, id: &str) -> Option<&Magnitude> {
        self.magnitudes.get(id)
    }

    fn find_pick(&self, id: &str) -> Option<&Pick> {
        self.picks.get(id)
    }

    fn find_amplitude(&self, id: &str) -> Option<&Amplitude> {
        self.amplitudes.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Event;

    #[test]
    fn chain_prefers_primary() {
        let mut first = ObjectRegistry::new();
        first.register_magnitude(Magnitude::new("mag/1", "mb", 5.0));
        let mut second = ObjectRegistry::new();
        second.register_magnitude(Magnitude::new("mag/1", "mb", 6.0));
        second.register_magnitude(Magnitude::new("mag/2", "Mw", 6.1));

        let chain = LookupChain::new(&first, &second);
        let value = chain.find_magnitude("mag/1").map(|m| m.magnitude.value);
        assert_eq!(value, Some(5.0));
        assert!(chain.find_magnitude("mag/2").is_some());
        assert!(chain.find_magnitude("mag/3").is_none());
    }

    #[test]
    fn register_graph_indexes_detached_magnitudes() {
        let mut graph = EventGraph::new(Event::new("event/1"));
        graph.attach_magnitude(Magnitude::new("mag/detached", "Mw", 5.4));

        let mut registry = ObjectRegistry::new();
        registry.register_graph(&graph);
        assert!(registry.find_magnitude("mag/detached").is_some());
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert!(registry.is_empty());
    }
}
