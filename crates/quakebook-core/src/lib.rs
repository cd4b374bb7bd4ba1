//! # quakebook-core
//!
//! Event graph resolution and fixed-format rendering for seismic event
//! parameters.
//!
//! An event graph is the consistent subset of a store reachable from one
//! event: its origins with arrivals and magnitudes, its focal mechanisms
//! with moment tensors, and optionally the picks and amplitudes those
//! objects reference. Graphs are assembled by the [`Resolver`] and consumed
//! by the renderers:
//!
//! - `bulletin`: plain-text event bulletin
//! - `mt`: moment tensor sheet with an ASCII beachball
//! - `cube`: CUBE event line and one-line summary
//! - `sacpz`: SAC pole-zero response files
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - Deterministic: BTreeMap only, ID-keyed identity maps
//! - Every store read goes through the [`EntityStore`] trait
//! - Renderers never mutate the graph they are given

// =============================================================================
// MODULES
// =============================================================================

pub mod bulletin;
pub mod consistency;
pub mod cube;
pub mod formats;
pub mod graph;
pub mod mt;
pub mod primitives;
pub mod radiation;
pub mod registry;
pub mod resolver;
pub mod sacpz;
pub mod session;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Data Model (from types module)
// =============================================================================

pub use types::*;

// =============================================================================
// RE-EXPORTS: Graph Assembly
// =============================================================================

pub use consistency::{
    Redact, rebuild_references, strip_authors, strip_comments, strip_moment_tensor_contributions,
};
pub use graph::{EventGraph, SerializableEventGraph};
pub use registry::{LookupChain, ObjectLookup, ObjectRegistry};
pub use resolver::{
    PickSet, ResolveOptions, Resolver, picks_for_timespan, resolve, resolve_with_registry,
};
pub use session::{Session, StoreBackend};
pub use storage::RedbStore;
pub use store::{EntityStore, MemoryStore, StoreCounts};

// =============================================================================
// RE-EXPORTS: Renderers
// =============================================================================

pub use bulletin::{Bulletin, BulletinMode, BulletinOptions, format_g};
pub use cube::{CubeOptions, cube_format, menlo_check_char, summary};
pub use mt::{EventRegion, MomentTensorSheet, RegionLookup, fm2txt};
pub use radiation::{CartesianTensor, Radiation, beachball, radiation_pattern, render_beachball};
pub use sacpz::{
    ChannelExport, ChannelResponse, Complex, GroundMotionUnit, export_responses, to_sac_pz,
};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    GraphDocument, graph_from_bytes, graph_from_json, graph_to_bytes, graph_to_json, is_binary,
};
