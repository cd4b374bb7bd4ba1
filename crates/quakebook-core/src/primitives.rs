//! # Primitives
//!
//! Fixed constants shared by the resolver, the renderers and the
//! persistence layer. Thresholds that operators may tune have a runtime
//! counterpart in the option structs; the values here are the defaults.

/// Minimum depth-phase count before the bulletin annotates a depth
/// uncertainty with the number of depth phases.
pub const MIN_DEPTH_PHASE_COUNT: u32 = 3;

/// Minimum arrival weight for an arrival to count as a depth phase.
pub const MIN_ARRIVAL_WEIGHT: f64 = 0.5;

/// Minimum contribution weight for a station magnitude to be listed.
pub const MIN_STATION_MAGNITUDE_WEIGHT: f64 = 0.5;

/// Arrivals with a weight at or below this are flagged with `X`.
pub const ARRIVAL_FLAG_WEIGHT: f64 = 0.1;

/// Kilometres per degree of great-circle arc (mean Earth radius 6371 km).
pub const KM_PER_DEGREE: f64 = 111.194_926_644_558_73;

/// Kilometres per degree used by the CUBE minimum-distance field.
pub const CUBE_KM_PER_DEGREE: f64 = 111.195;

/// Magnitude types whose station amplitudes carry a period column.
pub const PERIOD_MAGNITUDE_TYPES: [&str; 3] = ["mb", "Ms", "Ms(BB)"];

// =============================================================================
// MOMENT TENSOR SHEET
// =============================================================================

/// Beachball width in characters.
pub const BEACHBALL_COLUMNS: usize = 33;

/// Beachball height in lines.
pub const BEACHBALL_ROWS: usize = 19;

/// Agency printed on a moment tensor sheet when the focal mechanism has none.
pub const DEFAULT_MT_AGENCY: &str = "GFZ";

// =============================================================================
// CUBE
// =============================================================================

/// Length of a CUBE event line including its check character.
pub const CUBE_LINE_LENGTH: usize = 80;

/// Default network code of the CUBE source field.
pub const DEFAULT_CUBE_NETWORK: &str = "GE";

/// Default event version letter.
pub const DEFAULT_CUBE_VERSION: char = 'A';

/// Magnitude uncertainty assumed for `Mw*` magnitudes without one.
pub const DEFAULT_MW_UNCERTAINTY: f64 = 0.15;

/// Magnitude uncertainty assumed for other magnitudes without one.
pub const DEFAULT_MAGNITUDE_UNCERTAINTY: f64 = 0.3;

// =============================================================================
// RESOLUTION
// =============================================================================

/// Seconds before origin time searched for associated picks.
pub const DEFAULT_PICK_WINDOW_BEFORE_SECS: i64 = 60;

/// Seconds after origin time searched for associated picks.
pub const DEFAULT_PICK_WINDOW_AFTER_SECS: i64 = 7200;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Magic bytes of the binary event-graph format.
///
/// - File Header = Magic Bytes ("QBEG") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"QBEG";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum binary payload accepted on decode (64 MB).
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// `format` tag of the JSON graph document.
pub const DOCUMENT_FORMAT: &str = "quakebook-event-graph";

/// Current JSON document version.
pub const DOCUMENT_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_are_four_ascii_chars() {
        assert_eq!(MAGIC_BYTES.len(), 4);
        assert!(MAGIC_BYTES.iter().all(u8::is_ascii_uppercase));
    }

    #[test]
    fn pick_window_covers_origin_time() {
        assert!(DEFAULT_PICK_WINDOW_BEFORE_SECS > 0);
        assert!(DEFAULT_PICK_WINDOW_AFTER_SECS > DEFAULT_PICK_WINDOW_BEFORE_SECS);
    }
}
