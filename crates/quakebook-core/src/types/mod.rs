//! # Core Type Definitions
//!
//! This module contains the shared value types of the event data model:
//! - Public identifiers (`PublicId`) and entity kinds (`EntityKind`)
//! - Quantities with optional uncertainties (`RealQuantity`, `TimeQuantity`)
//! - Creation metadata, comments and stream identifiers
//! - Enumerations with their canonical QuakeML-style names
//! - Error types (`QuakeError`) and soft-failure records (`Diagnostic`)
//!
//! The entities themselves (Event, Origin, Pick, ...) live in `entities`.

mod entities;

pub use entities::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

// =============================================================================
// PUBLIC IDENTIFIERS
// =============================================================================

/// Globally unique identifier of a public object (`publicID`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicId(pub String);

impl PublicId {
    /// Create a new identifier from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The last `n` characters of the identifier (the whole ID if shorter).
    #[must_use]
    pub fn suffix(&self, n: usize) -> &str {
        let count = self.0.chars().count();
        if count <= n {
            return &self.0;
        }
        let skip = count - n;
        let start = self
            .0
            .char_indices()
            .nth(skip)
            .map_or(0, |(index, _)| index);
        &self.0[start..]
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PublicId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PublicId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PublicId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The kind of a public object, used in errors and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Event,
    Origin,
    Magnitude,
    StationMagnitude,
    FocalMechanism,
    MomentTensor,
    Pick,
    Amplitude,
}

impl EntityKind {
    /// Human readable name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Event => "Event",
            Self::Origin => "Origin",
            Self::Magnitude => "Magnitude",
            Self::StationMagnitude => "StationMagnitude",
            Self::FocalMechanism => "FocalMechanism",
            Self::MomentTensor => "MomentTensor",
            Self::Pick => "Pick",
            Self::Amplitude => "Amplitude",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// QUANTITIES
// =============================================================================

/// Symmetric and/or asymmetric uncertainty attached to a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Uncertainty {
    pub symmetric: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Uncertainty {
    /// A symmetric uncertainty.
    #[must_use]
    pub const fn symmetric(value: f64) -> Self {
        Self {
            symmetric: Some(value),
            lower: None,
            upper: None,
        }
    }

    /// An asymmetric uncertainty.
    #[must_use]
    pub const fn asymmetric(lower: f64, upper: f64) -> Self {
        Self {
            symmetric: None,
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// The resolvable uncertainty value.
    ///
    /// The average of the asymmetric bounds wins when both are present,
    /// otherwise the symmetric value is used.
    #[must_use]
    pub fn resolve(&self) -> Option<f64> {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => Some(0.5 * (lower + upper)),
            _ => self.symmetric,
        }
    }
}

/// A real-valued quantity with optional uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RealQuantity {
    pub value: f64,
    #[serde(default)]
    pub uncertainty: Uncertainty,
}

impl RealQuantity {
    /// A quantity without uncertainty.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self {
            value,
            uncertainty: Uncertainty {
                symmetric: None,
                lower: None,
                upper: None,
            },
        }
    }

    /// A quantity with a symmetric uncertainty.
    #[must_use]
    pub const fn with_uncertainty(value: f64, uncertainty: f64) -> Self {
        Self {
            value,
            uncertainty: Uncertainty::symmetric(uncertainty),
        }
    }

    /// Resolved uncertainty, see [`Uncertainty::resolve`].
    #[must_use]
    pub fn uncertainty(&self) -> Option<f64> {
        self.uncertainty.resolve()
    }
}

/// A point in time with optional uncertainty in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeQuantity {
    pub value: DateTime<Utc>,
    #[serde(default)]
    pub uncertainty: Uncertainty,
}

impl TimeQuantity {
    /// A time without uncertainty.
    #[must_use]
    pub const fn new(value: DateTime<Utc>) -> Self {
        Self {
            value,
            uncertainty: Uncertainty {
                symmetric: None,
                lower: None,
                upper: None,
            },
        }
    }

    /// Resolved uncertainty in seconds.
    #[must_use]
    pub fn uncertainty(&self) -> Option<f64> {
        self.uncertainty.resolve()
    }
}

// =============================================================================
// METADATA
// =============================================================================

/// Creation metadata of a public object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreationInfo {
    pub agency_id: Option<String>,
    pub author: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
}

impl CreationInfo {
    /// Creation info carrying only an agency.
    #[must_use]
    pub fn agency(agency_id: impl Into<String>) -> Self {
        Self {
            agency_id: Some(agency_id.into()),
            ..Self::default()
        }
    }
}

/// Free-text comment attached to a public object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: Option<String>,
    pub text: String,
    pub creation_info: Option<CreationInfo>,
}

impl Comment {
    /// A comment with the given text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Network/station/location/channel code of a data stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformStreamId {
    pub network_code: String,
    pub station_code: String,
    pub location_code: String,
    pub channel_code: String,
}

impl WaveformStreamId {
    /// Create a stream ID from its four codes.
    #[must_use]
    pub fn new(network: &str, station: &str, location: &str, channel: &str) -> Self {
        Self {
            network_code: network.to_string(),
            station_code: station.to_string(),
            location_code: location.to_string(),
            channel_code: channel.to_string(),
        }
    }

    /// Dot-separated `NET.STA.LOC.CHA`.
    #[must_use]
    pub fn dotted(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.network_code, self.station_code, self.location_code, self.channel_code
        )
    }

    /// Fixed-width, space-separated codes; an empty location prints as `--`.
    #[must_use]
    pub fn spaced(&self) -> String {
        let location = if self.location_code.is_empty() {
            "--"
        } else {
            self.location_code.as_str()
        };
        format!(
            "{:<2} {:>5} {:>2} {:>3}",
            self.network_code, self.station_code, location, self.channel_code
        )
    }

    /// `NET_STA` key used to join arrivals with station magnitudes.
    #[must_use]
    pub fn station_key(&self) -> String {
        format!("{}_{}", self.network_code, self.station_code)
    }
}

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// Evaluation mode of a pick, origin or magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    Manual,
    Automatic,
}

impl EvaluationMode {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }

    /// Single upper-case status letter (`M` or `A`).
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Manual => 'M',
            Self::Automatic => 'A',
        }
    }
}

/// Evaluation status of an origin or magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Preliminary,
    Confirmed,
    Reviewed,
    Final,
    Rejected,
    Reported,
}

impl EvaluationStatus {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Preliminary => "preliminary",
            Self::Confirmed => "confirmed",
            Self::Reviewed => "reviewed",
            Self::Final => "final",
            Self::Rejected => "rejected",
            Self::Reported => "reported",
        }
    }
}

/// First-motion polarity of a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickPolarity {
    Positive,
    Negative,
    Undecidable,
}

impl PickPolarity {
    /// Bulletin letter: `u` (up), `d` (down), `x` (undecidable).
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Positive => 'u',
            Self::Negative => 'd',
            Self::Undecidable => 'x',
        }
    }
}

/// Kind of location an origin describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginType {
    Hypocenter,
    Centroid,
    Amplitude,
    Macroseismic,
    RuptureStart,
    RuptureEnd,
}

/// Event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    Earthquake,
    InducedEarthquake,
    Explosion,
    QuarryBlast,
    NuclearExplosion,
    Landslide,
    VolcanicEruption,
    NotExisting,
    NotLocatable,
    OutsideOfNetworkInterest,
    Other,
}

impl EventType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Earthquake => "earthquake",
            Self::InducedEarthquake => "induced earthquake",
            Self::Explosion => "explosion",
            Self::QuarryBlast => "quarry blast",
            Self::NuclearExplosion => "nuclear explosion",
            Self::Landslide => "landslide",
            Self::VolcanicEruption => "volcanic eruption",
            Self::NotExisting => "not existing",
            Self::NotLocatable => "not locatable",
            Self::OutsideOfNetworkInterest => "outside of network interest",
            Self::Other => "other",
        }
    }
}

/// Type tag of an event description string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventDescriptionType {
    RegionName,
    FlinnEngdahlRegion,
    EarthquakeName,
    NearestCities,
    FeltReport,
    LocalTime,
    TectonicSummary,
    Other,
}

impl EventDescriptionType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RegionName => "region name",
            Self::FlinnEngdahlRegion => "Flinn-Engdahl region",
            Self::EarthquakeName => "earthquake name",
            Self::NearestCities => "nearest cities",
            Self::FeltReport => "felt report",
            Self::LocalTime => "local time",
            Self::TectonicSummary => "tectonic summary",
            Self::Other => "other",
        }
    }
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Severity of a recorded soft failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Notice,
    Warning,
}

/// A non-fatal failure recorded while assembling a graph.
///
/// The graph stays usable; the affected field is simply left empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: EntityKind,
    pub id: PublicId,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn warning(kind: EntityKind, id: &PublicId, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            id: id.clone(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn notice(kind: EntityKind, id: &PublicId, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Notice,
            kind,
            id: id.clone(),
            message: message.into(),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while resolving, rendering or persisting events.
///
/// - Only a missing Event or preferred Origin is fatal to graph construction
/// - Everything the renderers cannot format is reported, never panicked on
#[derive(Debug, Error)]
pub enum QuakeError {
    /// A required public object could not be found.
    #[error("{kind} not found: '{id}'")]
    NotFound { kind: EntityKind, id: PublicId },

    /// Mandatory data for a rendering or encoding step is missing or malformed.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A ground-motion unit string that cannot be converted.
    #[error("Unsupported unit: {0}")]
    UnsupportedUnit(String),

    /// The graph violates a reference or identity invariant.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl QuakeError {
    /// Shorthand for a `NotFound` error.
    #[must_use]
    pub fn not_found(kind: EntityKind, id: &PublicId) -> Self {
        Self::NotFound {
            kind,
            id: id.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asymmetric_uncertainty_is_averaged() {
        let u = Uncertainty::asymmetric(2.0, 4.0);
        assert_eq!(u.resolve(), Some(3.0));
    }

    #[test]
    fn asymmetric_bounds_win_over_symmetric() {
        let u = Uncertainty {
            symmetric: Some(10.0),
            lower: Some(1.0),
            upper: Some(3.0),
        };
        assert_eq!(u.resolve(), Some(2.0));
    }

    #[test]
    fn single_bound_falls_back_to_symmetric() {
        let u = Uncertainty {
            symmetric: Some(1.5),
            lower: Some(1.0),
            upper: None,
        };
        assert_eq!(u.resolve(), Some(1.5));
        assert_eq!(Uncertainty::default().resolve(), None);
    }

    #[test]
    fn public_id_suffix() {
        let id = PublicId::new("gfz2021gmyq");
        assert_eq!(id.suffix(8), "2021gmyq");
        assert_eq!(PublicId::new("meav").suffix(8), "meav");
    }

    #[test]
    fn stream_id_formats() {
        let wfid = WaveformStreamId::new("GE", "APE", "", "BHZ");
        assert_eq!(wfid.dotted(), "GE.APE..BHZ");
        assert_eq!(wfid.spaced(), "GE   APE -- BHZ");
        assert_eq!(wfid.station_key(), "GE_APE");
    }

    #[test]
    fn not_found_display() {
        let err = QuakeError::not_found(EntityKind::Event, &PublicId::new("gfz2021abcd"));
        assert_eq!(err.to_string(), "Event not found: 'gfz2021abcd'");
    }
}
