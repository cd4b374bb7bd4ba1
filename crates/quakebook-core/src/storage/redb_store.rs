//! # redb-backed Entity Store
//!
//! A disk-backed entity store using the redb embedded database, providing:
//! - ACID transactions (a whole graph is imported in one)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Every table maps a public ID to a `postcard` blob. Rows are laid out
//! like the relational source they model: origins carry their arrivals and
//! station magnitudes, magnitudes live in their own table with a per-origin
//! index, focal mechanisms carry their moment tensors, and comments of
//! events, origins, magnitudes, focal mechanisms and moment tensors are kept
//! apart so point loads stay bare.

use crate::graph::EventGraph;
use crate::store::{EntityStore, StoreCounts, in_range};
use crate::{
    Amplitude, Arrival, Comment, Event, FocalMechanism, Magnitude, MomentTensor, Origin, Pick,
    PublicId, QuakeError, StationMagnitude,
};
use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

type BlobTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Event ID -> Event without comments.
const EVENTS: BlobTable = TableDefinition::new("events");

/// Origin ID -> Origin with arrivals and station magnitudes.
const ORIGINS: BlobTable = TableDefinition::new("origins");

/// Magnitude ID -> Magnitude without comments.
const MAGNITUDES: BlobTable = TableDefinition::new("magnitudes");

/// Origin ID -> ordered magnitude IDs.
const ORIGIN_MAGNITUDES: BlobTable = TableDefinition::new("origin_magnitudes");

/// Focal mechanism ID -> FocalMechanism with moment tensors.
const FOCAL_MECHANISMS: BlobTable = TableDefinition::new("focal_mechanisms");

const PICKS: BlobTable = TableDefinition::new("picks");

const AMPLITUDES: BlobTable = TableDefinition::new("amplitudes");

/// Object ID -> comments.
const COMMENTS: BlobTable = TableDefinition::new("comments");

const ALL_TABLES: [BlobTable; 8] = [
    EVENTS,
    ORIGINS,
    MAGNITUDES,
    ORIGIN_MAGNITUDES,
    FOCAL_MECHANISMS,
    PICKS,
    AMPLITUDES,
    COMMENTS,
];

fn storage_error(e: impl std::fmt::Display) -> QuakeError {
    QuakeError::IoError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, QuakeError> {
    postcard::to_allocvec(value).map_err(|e| QuakeError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, QuakeError> {
    postcard::from_bytes(bytes).map_err(|e| QuakeError::DeserializationError(e.to_string()))
}

/// A persistent entity store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QuakeError> {
        let db = Database::create(path.as_ref()).map_err(storage_error)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage_error)?;
            for table in ALL_TABLES {
                let _ = write_txn.open_table(table).map_err(storage_error)?;
            }
            write_txn.commit().map_err(storage_error)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), QuakeError> {
        self.db.compact().map_err(storage_error)?;
        Ok(())
    }

    fn write<F>(&mut self, apply: F) -> Result<(), QuakeError>
    where
        F: FnOnce(&WriteTransaction) -> Result<(), QuakeError>,
    {
        let write_txn = self.db.begin_write().map_err(storage_error)?;
        apply(&write_txn)?;
        write_txn.commit().map_err(storage_error)
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    pub fn insert_event(&mut self, event: Event) -> Result<(), QuakeError> {
        self.write(|txn| put_event(txn, event))
    }

    /// Insert or replace an origin together with all of its children.
    pub fn insert_origin(&mut self, origin: Origin) -> Result<(), QuakeError> {
        self.write(|txn| put_origin(txn, origin))
    }

    /// Insert or replace a magnitude; it is indexed under its `origin_id`.
    pub fn insert_magnitude(&mut self, magnitude: Magnitude) -> Result<(), QuakeError> {
        self.write(|txn| put_magnitude(txn, magnitude))
    }

    pub fn insert_focal_mechanism(
        &mut self,
        focal_mechanism: FocalMechanism,
    ) -> Result<(), QuakeError> {
        self.write(|txn| put_focal_mechanism(txn, focal_mechanism))
    }

    pub fn insert_pick(&mut self, pick: Pick) -> Result<(), QuakeError> {
        self.write(|txn| put(txn, PICKS, pick.public_id.as_str(), &pick))
    }

    pub fn insert_amplitude(&mut self, amplitude: Amplitude) -> Result<(), QuakeError> {
        self.write(|txn| put(txn, AMPLITUDES, amplitude.public_id.as_str(), &amplitude))
    }

    /// Import every object of a graph in a single ACID transaction.
    pub fn import_graph(&mut self, graph: &EventGraph) -> Result<(), QuakeError> {
        self.write(|txn| {
            put_event(txn, graph.event().clone())?;
            for origin in graph.origins() {
                put_origin(txn, origin.clone())?;
            }
            for magnitude in graph.detached_magnitudes() {
                put_magnitude(txn, magnitude.clone())?;
            }
            for focal_mechanism in graph.focal_mechanisms() {
                put_focal_mechanism(txn, focal_mechanism.clone())?;
            }
            for pick in graph.picks() {
                put(txn, PICKS, pick.public_id.as_str(), pick)?;
            }
            for amplitude in graph.amplitudes() {
                put(txn, AMPLITUDES, amplitude.public_id.as_str(), amplitude)?;
            }
            Ok(())
        })?;
        tracing::info!("Imported event {}", graph.event().public_id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    fn get<T: DeserializeOwned>(&self, table: BlobTable, key: &str) -> Result<Option<T>, QuakeError> {
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let table = read_txn.open_table(table).map_err(storage_error)?;
        let value = match table.get(key).map_err(storage_error)? {
            Some(guard) => Some(decode(guard.value())?),
            None => None,
        };
        Ok(value)
    }

    fn scan<T: DeserializeOwned>(&self, table: BlobTable) -> Result<Vec<T>, QuakeError> {
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let table = read_txn.open_table(table).map_err(storage_error)?;

        let mut items = Vec::new();
        for entry in table.iter().map_err(storage_error)? {
            let (_, value) = entry.map_err(storage_error)?;
            items.push(decode(value.value())?);
        }
        Ok(items)
    }

    /// Number of stored objects per table.
    pub fn counts(&self) -> Result<StoreCounts, QuakeError> {
        let read_txn = self.db.begin_read().map_err(storage_error)?;
        let len = |table: BlobTable| -> Result<usize, QuakeError> {
            let table = read_txn.open_table(table).map_err(storage_error)?;
            Ok(table.len().map_err(storage_error)? as usize)
        };
        Ok(StoreCounts {
            events: len(EVENTS)?,
            origins: len(ORIGINS)?,
            magnitudes: len(MAGNITUDES)?,
            focal_mechanisms: len(FOCAL_MECHANISMS)?,
            picks: len(PICKS)?,
            amplitudes: len(AMPLITUDES)?,
        })
    }
}

// =============================================================================
// ROW WRITERS
// =============================================================================

fn put<T: Serialize>(
    txn: &WriteTransaction,
    table: BlobTable,
    key: &str,
    value: &T,
) -> Result<(), QuakeError> {
    let bytes = encode(value)?;
    let mut table = txn.open_table(table).map_err(storage_error)?;
    table
        .insert(key, bytes.as_slice())
        .map_err(storage_error)?;
    Ok(())
}

fn load<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: BlobTable,
    key: &str,
) -> Result<Option<T>, QuakeError> {
    let table = txn.open_table(table).map_err(storage_error)?;
    let value = match table.get(key).map_err(storage_error)? {
        Some(guard) => Some(decode(guard.value())?),
        None => None,
    };
    Ok(value)
}

fn put_comments(
    txn: &WriteTransaction,
    id: &PublicId,
    comments: Vec<Comment>,
) -> Result<(), QuakeError> {
    if comments.is_empty() {
        let mut table = txn.open_table(COMMENTS).map_err(storage_error)?;
        table.remove(id.as_str()).map_err(storage_error)?;
        return Ok(());
    }
    put(txn, COMMENTS, id.as_str(), &comments)
}

fn put_event(txn: &WriteTransaction, mut event: Event) -> Result<(), QuakeError> {
    put_comments(txn, &event.public_id, std::mem::take(&mut event.comments))?;
    put(txn, EVENTS, event.public_id.as_str(), &event)
}

fn put_origin(txn: &WriteTransaction, mut origin: Origin) -> Result<(), QuakeError> {
    let id = origin.public_id.clone();
    put_comments(txn, &id, std::mem::take(&mut origin.comments))?;
    for mut magnitude in std::mem::take(&mut origin.magnitudes) {
        magnitude.origin_id.get_or_insert_with(|| id.clone());
        put_magnitude(txn, magnitude)?;
    }
    put(txn, ORIGINS, id.as_str(), &origin)
}

fn put_magnitude(txn: &WriteTransaction, mut magnitude: Magnitude) -> Result<(), QuakeError> {
    let id = magnitude.public_id.clone();
    put_comments(txn, &id, std::mem::take(&mut magnitude.comments))?;
    if let Some(origin_id) = &magnitude.origin_id {
        let mut ids: Vec<PublicId> =
            load(txn, ORIGIN_MAGNITUDES, origin_id.as_str())?.unwrap_or_default();
        if !ids.contains(&id) {
            ids.push(id.clone());
            put(txn, ORIGIN_MAGNITUDES, origin_id.as_str(), &ids)?;
        }
    }
    put(txn, MAGNITUDES, id.as_str(), &magnitude)
}

fn put_focal_mechanism(
    txn: &WriteTransaction,
    mut focal_mechanism: FocalMechanism,
) -> Result<(), QuakeError> {
    let id = focal_mechanism.public_id.clone();
    put_comments(txn, &id, std::mem::take(&mut focal_mechanism.comments))?;
    for tensor in &mut focal_mechanism.moment_tensors {
        put_comments(txn, &tensor.public_id, std::mem::take(&mut tensor.comments))?;
    }
    put(txn, FOCAL_MECHANISMS, id.as_str(), &focal_mechanism)
}

// =============================================================================
// ENTITYSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl EntityStore for RedbStore {
    fn load_event(&self, id: &PublicId) -> Result<Option<Event>, QuakeError> {
        self.get(EVENTS, id.as_str())
    }

    fn load_origin(&self, id: &PublicId) -> Result<Option<Origin>, QuakeError> {
        let origin: Option<Origin> = self.get(ORIGINS, id.as_str())?;
        Ok(origin.map(|o| o.bare()))
    }

    fn load_magnitude(&self, id: &PublicId) -> Result<Option<Magnitude>, QuakeError> {
        self.get(MAGNITUDES, id.as_str())
    }

    fn load_focal_mechanism(&self, id: &PublicId) -> Result<Option<FocalMechanism>, QuakeError> {
        let focal_mechanism: Option<FocalMechanism> = self.get(FOCAL_MECHANISMS, id.as_str())?;
        Ok(focal_mechanism.map(|fm| fm.bare()))
    }

    fn load_pick(&self, id: &PublicId) -> Result<Option<Pick>, QuakeError> {
        self.get(PICKS, id.as_str())
    }

    fn load_amplitude(&self, id: &PublicId) -> Result<Option<Amplitude>, QuakeError> {
        self.get(AMPLITUDES, id.as_str())
    }

    fn amplitudes_of_pick(&self, pick_id: &PublicId) -> Result<Vec<Amplitude>, QuakeError> {
        let amplitudes: Vec<Amplitude> = self.scan(AMPLITUDES)?;
        Ok(amplitudes
            .into_iter()
            .filter(|a| a.pick_id.as_ref() == Some(pick_id))
            .collect())
    }

    fn load_arrivals_of(&self, origin_id: &PublicId) -> Result<Vec<Arrival>, QuakeError> {
        let origin: Option<Origin> = self.get(ORIGINS, origin_id.as_str())?;
        Ok(origin.map(|o| o.arrivals).unwrap_or_default())
    }

    fn load_magnitudes_of(&self, origin_id: &PublicId) -> Result<Vec<Magnitude>, QuakeError> {
        let ids: Vec<PublicId> = self
            .get(ORIGIN_MAGNITUDES, origin_id.as_str())?
            .unwrap_or_default();
        let mut magnitudes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(magnitude) = self.load_magnitude(&id)? {
                magnitudes.push(magnitude);
            }
        }
        Ok(magnitudes)
    }

    fn load_station_magnitudes_of(
        &self,
        origin_id: &PublicId,
    ) -> Result<Vec<StationMagnitude>, QuakeError> {
        let origin: Option<Origin> = self.get(ORIGINS, origin_id.as_str())?;
        Ok(origin.map(|o| o.station_magnitudes).unwrap_or_default())
    }

    fn load_comments_of(&self, id: &PublicId) -> Result<Vec<Comment>, QuakeError> {
        Ok(self.get(COMMENTS, id.as_str())?.unwrap_or_default())
    }

    fn load_moment_tensors_of(
        &self,
        focal_mechanism_id: &PublicId,
    ) -> Result<Vec<MomentTensor>, QuakeError> {
        let focal_mechanism: Option<FocalMechanism> =
            self.get(FOCAL_MECHANISMS, focal_mechanism_id.as_str())?;
        Ok(focal_mechanism
            .map(|fm| fm.moment_tensors)
            .unwrap_or_default())
    }

    fn picks_in_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Pick>, QuakeError> {
        let picks: Vec<Pick> = self.scan(PICKS)?;
        Ok(picks
            .into_iter()
            .filter(|p| in_range(p.time.value, start, end))
            .collect())
    }

    fn amplitudes_in_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Amplitude>, QuakeError> {
        let amplitudes: Vec<Amplitude> = self.scan(AMPLITUDES)?;
        Ok(amplitudes
            .into_iter()
            .filter(|a| a.reference_time.is_some_and(|t| in_range(t, start, end)))
            .collect())
    }

    fn origins_of_event(&self, event_id: &PublicId) -> Result<Vec<Origin>, QuakeError> {
        let Some(event) = self.load_event(event_id)? else {
            return Ok(Vec::new());
        };
        let mut origins = Vec::with_capacity(event.origin_refs.len());
        for id in &event.origin_refs {
            if let Some(origin) = self.load_origin(id)? {
                origins.push(origin);
            }
        }
        Ok(origins)
    }

    fn focal_mechanisms_of_event(
        &self,
        event_id: &PublicId,
    ) -> Result<Vec<FocalMechanism>, QuakeError> {
        let Some(event) = self.load_event(event_id)? else {
            return Ok(Vec::new());
        };
        let mut focal_mechanisms = Vec::with_capacity(event.focal_mechanism_refs.len());
        for id in &event.focal_mechanism_refs {
            if let Some(focal_mechanism) = self.load_focal_mechanism(id)? {
                focal_mechanisms.push(focal_mechanism);
            }
        }
        Ok(focal_mechanisms)
    }
}

// =============================================================================
// TESTS
// =============================================================================
