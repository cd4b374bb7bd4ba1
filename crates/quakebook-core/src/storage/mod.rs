//! # Persistent Storage
//!
//! `redb`-backed implementation of the [`EntityStore`](crate::EntityStore)
//! contract.

mod redb_store;

pub use redb_store::RedbStore;
