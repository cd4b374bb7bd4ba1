//! JSON document: `{ "format": "quakebook-event-graph", "version": 1, "graph": {...} }`.

use crate::graph::{EventGraph, SerializableEventGraph};
use crate::primitives::{DOCUMENT_FORMAT, DOCUMENT_VERSION};
use crate::QuakeError;
use serde::{Deserialize, Serialize};

/// Self-describing envelope around a serializable graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub format: String,
    pub version: u32,
    pub graph: SerializableEventGraph,
}

impl From<&EventGraph> for GraphDocument {
    fn from(graph: &EventGraph) -> Self {
        Self {
            format: DOCUMENT_FORMAT.to_string(),
            version: DOCUMENT_VERSION,
            graph: SerializableEventGraph::from(graph),
        }
    }
}

impl GraphDocument {
    pub fn validate(&self) -> Result<(), QuakeError> {
        if self.format != DOCUMENT_FORMAT {
            return Err(QuakeError::DeserializationError(format!(
                "Unknown document format '{}'",
                self.format
            )));
        }
        if self.version != DOCUMENT_VERSION {
            return Err(QuakeError::DeserializationError(format!(
                "Unsupported document version: {} (expected {})",
                self.version, DOCUMENT_VERSION
            )));
        }
        Ok(())
    }
}

/// Pretty-printed JSON document of `graph`.
pub fn graph_to_json(graph: &EventGraph) -> Result<String, QuakeError> {
    serde_json::to_string_pretty(&GraphDocument::from(graph))
        .map_err(|e| QuakeError::SerializationError(e.to_string()))
}

/// Parse, validate and verify a JSON document.
pub fn graph_from_json(text: &str) -> Result<EventGraph, QuakeError> {
    let document: GraphDocument = serde_json::from_str(text)
        .map_err(|e| QuakeError::DeserializationError(e.to_string()))?;
    document.validate()?;
    EventGraph::try_from(document.graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, FocalMechanism, PublicId};

    fn graph() -> EventGraph {
        let mut event = Event::new("gfz2021gmyq");
        event.focal_mechanism_refs = vec![PublicId::new("fm/1")];
        let mut graph = EventGraph::new(event);
        graph.insert_focal_mechanism(FocalMechanism::new("fm/1"));
        graph
    }

    #[test]
    fn document_is_tagged() {
        let text = graph_to_json(&graph()).expect("json");
        let value: serde_json::Value = serde_json::from_str(&text).expect("parse");
        assert_eq!(value["format"], DOCUMENT_FORMAT);
        assert_eq!(value["version"], DOCUMENT_VERSION);
        assert_eq!(value["graph"]["event"]["public_id"], "gfz2021gmyq");
    }

    #[test]
    fn reload_preserves_graph() {
        let original = graph();
        let restored = graph_from_json(&graph_to_json(&original).expect("json")).expect("load");
        assert_eq!(
            SerializableEventGraph::from(&restored),
            SerializableEventGraph::from(&original)
        );
    }

    #[test]
    fn foreign_format_rejected() {
        let mut document = GraphDocument::from(&graph());
        document.format = "something-else".to_string();
        let text = serde_json::to_string(&document).expect("json");
        assert!(matches!(
            graph_from_json(&text),
            Err(QuakeError::DeserializationError(_))
        ));
    }

    #[test]
    fn dangling_reference_rejected() {
        let mut document = GraphDocument::from(&graph());
        document
            .graph
            .event
            .focal_mechanism_refs
            .push(PublicId::new("fm/1"));
        let text = serde_json::to_string(&document).expect("json");
        assert!(matches!(
            graph_from_json(&text),
            Err(QuakeError::InvariantViolation(_))
        ));
    }
}
