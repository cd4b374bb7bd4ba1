//! # Persistence Format
//!
//! Binary serialization for event graphs.
//!
//! Layout: `QBEG` magic (4 bytes), format version (1 byte), payload length
//! (u32, little endian), then the `postcard`-encoded graph. The declared
//! length must match what follows, so truncated or padded files are
//! rejected before decoding.

use crate::graph::{EventGraph, SerializableEventGraph};
use crate::{QuakeError, primitives};

/// Magic, version and payload length.
const HEADER_LEN: usize = 9;

/// True if `bytes` start with the binary magic.
#[must_use]
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.starts_with(primitives::MAGIC_BYTES)
}

/// Serialize a graph to bytes (header + payload).
pub fn graph_to_bytes(graph: &EventGraph) -> Result<Vec<u8>, QuakeError> {
    let serializable = SerializableEventGraph::from(graph);
    let payload = postcard::to_allocvec(&serializable)
        .map_err(|e| QuakeError::SerializationError(e.to_string()))?;
    if payload.len() > primitives::MAX_PAYLOAD_SIZE {
        return Err(QuakeError::SerializationError(format!(
            "Graph of event {} encodes to {} bytes, limit is {}",
            graph.event().public_id,
            payload.len(),
            primitives::MAX_PAYLOAD_SIZE
        )));
    }
    let declared = u32::try_from(payload.len())
        .map_err(|_| QuakeError::SerializationError("Payload length overflow".to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(primitives::MAGIC_BYTES);
    result.push(primitives::FORMAT_VERSION);
    result.extend_from_slice(&declared.to_le_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Payload slice after checking magic, version and declared length.
fn graph_payload(bytes: &[u8]) -> Result<&[u8], QuakeError> {
    let Some((header, payload)) = bytes.split_first_chunk::<HEADER_LEN>() else {
        return Err(QuakeError::DeserializationError(format!(
            "Data too short: {} bytes, header needs {}",
            bytes.len(),
            HEADER_LEN
        )));
    };
    if !is_binary(header) {
        return Err(QuakeError::DeserializationError(
            "Invalid magic bytes".to_string(),
        ));
    }
    if header[4] != primitives::FORMAT_VERSION {
        return Err(QuakeError::DeserializationError(format!(
            "Unsupported version: {} (expected {})",
            header[4],
            primitives::FORMAT_VERSION
        )));
    }

    let declared = u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
    if declared > primitives::MAX_PAYLOAD_SIZE {
        return Err(QuakeError::DeserializationError(format!(
            "Declared payload of {} bytes exceeds maximum allowed {} bytes",
            declared,
            primitives::MAX_PAYLOAD_SIZE
        )));
    }
    if declared != payload.len() {
        return Err(QuakeError::DeserializationError(format!(
            "Payload is {} bytes, header declares {}",
            payload.len(),
            declared
        )));
    }
    Ok(payload)
}

/// Deserialize and verify a graph.
///
/// Rejects, before decoding:
/// 1. data shorter than the header
/// 2. wrong magic bytes or version
/// 3. a declared length above `MAX_PAYLOAD_SIZE` or different from the payload
pub fn graph_from_bytes(bytes: &[u8]) -> Result<EventGraph, QuakeError> {
    let payload = graph_payload(bytes)?;
    let serializable: SerializableEventGraph = postcard::from_bytes(payload).map_err(|e| {
        QuakeError::DeserializationError(format!("Failed to deserialize graph data: {}", e))
    })?;

    EventGraph::try_from(serializable)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, Magnitude, Origin, PublicId};
    use chrono::{TimeZone, Utc};

    fn graph() -> EventGraph {
        let mut event = Event::new("gfz2021gmyq");
        event.preferred_origin_id = Some(PublicId::new("origin/1"));
        event.origin_refs = vec![PublicId::new("origin/1")];
        let time = Utc
            .with_ymd_and_hms(2021, 4, 3, 1, 16, 40)
            .single()
            .expect("valid time");
        let mut origin = Origin::new("origin/1", time, -58.0512, -7.8812, 17.9);
        origin.magnitudes.push(Magnitude::new("mag/1", "Mw", 6.61));
        let mut graph = EventGraph::new(event);
        graph.insert_origin(origin);
        graph
    }

    #[test]
    fn header_declares_payload_length() {
        let bytes = graph_to_bytes(&graph()).expect("serialize");
        assert_eq!(&bytes[..4], primitives::MAGIC_BYTES);
        assert_eq!(bytes[4], primitives::FORMAT_VERSION);
        let declared = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;
        assert_eq!(declared, bytes.len() - HEADER_LEN);
    }

    #[test]
    fn truncated_or_padded_payload_rejected() {
        let bytes = graph_to_bytes(&graph()).expect("serialize");

        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            graph_from_bytes(truncated),
            Err(QuakeError::DeserializationError(_))
        ));

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(
            graph_from_bytes(&padded),
            Err(QuakeError::DeserializationError(_))
        ));

        assert!(graph_from_bytes(&bytes[..HEADER_LEN - 1]).is_err());
    }

    #[test]
    fn unknown_version_rejected() {
        let mut bytes = graph_to_bytes(&graph()).expect("serialize");
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(is_binary(&bytes));
        assert!(matches!(
            graph_from_bytes(&bytes),
            Err(QuakeError::DeserializationError(_))
        ));
    }

    #[test]
    fn bytes_are_stable_across_reload() {
        let bytes1 = graph_to_bytes(&graph()).expect("first serialize");
        assert!(is_binary(&bytes1));

        let restored = graph_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = graph_to_bytes(&restored).expect("second serialize");

        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");

        assert!(!is_binary(&bytes));
        assert!(matches!(
            graph_from_bytes(&bytes),
            Err(QuakeError::DeserializationError(_))
        ));
    }

    #[test]
    fn inconsistent_graph_rejected() {
        let mut graph = graph();
        graph.event.origin_refs.push(PublicId::new("origin/gone"));
        let bytes = graph_to_bytes(&graph).expect("serialize");
        assert!(matches!(
            graph_from_bytes(&bytes),
            Err(QuakeError::InvariantViolation(_))
        ));
    }
}
