//! # Graph Document Formats
//!
//! Pure byte/string transformations of an [`EventGraph`](crate::EventGraph).
//! File I/O lives in the app layer.
//!
//! - `document`: self-describing JSON document
//! - `persistence`: length-prefixed `postcard` binary payload
//!
//! Both decoders run `EventGraph::verify` before returning.

pub mod document;
pub mod persistence;

pub use document::{GraphDocument, graph_from_json, graph_to_json};
pub use persistence::{graph_from_bytes, graph_to_bytes, is_binary};
