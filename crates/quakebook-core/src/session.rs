//! # Session Module
//!
//! A session couples an entity store with an [`ObjectRegistry`] so that
//! successive resolutions can reuse objects already resolved.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` for disk-backed ACID storage

use crate::graph::EventGraph;
use crate::registry::ObjectRegistry;
use crate::resolver::{ResolveOptions, resolve_with_registry};
use crate::storage::RedbStore;
use crate::store::{EntityStore, MemoryStore, StoreCounts};
use crate::{PublicId, QuakeError};
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StoreBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

#[derive(Debug, Default)]
pub struct Session {
    backend: StoreBackend,
    registry: ObjectRegistry,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            backend: StoreBackend::InMemory(store),
            registry: ObjectRegistry::new(),
        }
    }

    /// Open or create a redb store at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, QuakeError> {
        let store = RedbStore::open(path)?;
        Ok(Self {
            backend: StoreBackend::Persistent(store),
            registry: ObjectRegistry::new(),
        })
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StoreBackend::Persistent(_))
    }

    #[must_use]
    pub fn store(&self) -> &dyn EntityStore {
        match &self.backend {
            StoreBackend::InMemory(store) => store,
            StoreBackend::Persistent(store) => store,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Forget every registered object.
    pub fn clear_registry(&mut self) {
        self.registry.clear();
    }

    /// Resolve an event and register its objects for later resolutions.
    pub fn resolve(
        &mut self,
        event_id: &PublicId,
        options: &ResolveOptions,
    ) -> Result<EventGraph, QuakeError> {
        let graph = resolve_with_registry(self.store(), event_id, options, &self.registry)?;
        self.registry.register_graph(&graph);
        tracing::debug!(
            "Resolved {} ({} origins, {} registered objects)",
            event_id,
            graph.origins().count(),
            self.registry.len()
        );
        Ok(graph)
    }

    /// Store every object of a graph.
    pub fn import_graph(&mut self, graph: &EventGraph) -> Result<(), QuakeError> {
        match &mut self.backend {
            StoreBackend::InMemory(store) => {
                store.ingest_graph(graph);
                Ok(())
            }
            StoreBackend::Persistent(store) => store.import_graph(graph),
        }
    }

    pub fn counts(&self) -> Result<StoreCounts, QuakeError> {
        match &self.backend {
            StoreBackend::InMemory(store) => Ok(store.counts()),
            StoreBackend::Persistent(store) => store.counts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, Magnitude, Origin};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn graph() -> EventGraph {
        let mut event = Event::new("gfz2021gmyq");
        event.preferred_origin_id = Some(PublicId::new("origin/1"));
        event.preferred_magnitude_id = Some(PublicId::new("mag/1"));
        event.origin_refs = vec![PublicId::new("origin/1")];
        let time = Utc
            .with_ymd_and_hms(2021, 4, 3, 1, 16, 40)
            .single()
            .expect("valid time");
        let mut origin = Origin::new("origin/1", time, -58.05, -7.88, 17.9);
        origin.magnitudes.push(Magnitude::new("mag/1", "Mw", 6.61));
        let mut graph = EventGraph::new(event);
        graph.insert_origin(origin);
        graph
    }

    #[test]
    fn resolution_fills_registry() {
        let mut session = Session::with_store(MemoryStore::from_graph(&graph()));
        assert!(session.registry().is_empty());

        let resolved = session
            .resolve(&PublicId::new("gfz2021gmyq"), &ResolveOptions::default())
            .expect("resolve");
        assert!(resolved.preferred_magnitude().is_some());
        assert!(!session.registry().is_empty());

        session.clear_registry();
        assert!(session.registry().is_empty());
    }

    #[test]
    fn persistent_import_and_resolve() {
        let temp = tempdir().expect("temp dir");
        let mut session = Session::with_redb(temp.path().join("events.redb")).expect("open");
        assert!(session.is_persistent());
        session.import_graph(&graph()).expect("import");
        assert_eq!(session.counts().expect("counts").origins, 1);

        let resolved = session
            .resolve(&PublicId::new("gfz2021gmyq"), &ResolveOptions::default())
            .expect("resolve");
        assert_eq!(resolved.origins().count(), 1);
    }
}
