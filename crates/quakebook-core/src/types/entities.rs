//! Seismological entities: events, origins, picks, amplitudes, magnitudes
//! and focal mechanisms.
//!
//! Parent/child ownership follows the data model: an origin owns its
//! arrivals, magnitudes and station magnitudes; a focal mechanism owns its
//! moment tensors. Cross references (preferred IDs, pick IDs, derived
//! origins) are plain `PublicId`s resolved through the graph.

use super::{
    Comment, CreationInfo, EvaluationMode, EvaluationStatus, EventDescriptionType, EventType,
    OriginType, PickPolarity, PublicId, RealQuantity, TimeQuantity, WaveformStreamId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// EVENT
// =============================================================================

/// Typed free-text description of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescription {
    pub text: String,
    pub description_type: Option<EventDescriptionType>,
}

impl EventDescription {
    #[must_use]
    pub fn region(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            description_type: Some(EventDescriptionType::RegionName),
        }
    }
}

/// A seismic event and its preferred selections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub public_id: PublicId,
    pub event_type: Option<EventType>,
    pub descriptions: Vec<EventDescription>,
    pub preferred_origin_id: Option<PublicId>,
    pub preferred_magnitude_id: Option<PublicId>,
    pub preferred_focal_mechanism_id: Option<PublicId>,
    pub creation_info: Option<CreationInfo>,
    pub comments: Vec<Comment>,
    /// Origins associated with the event.
    pub origin_refs: Vec<PublicId>,
    /// Focal mechanisms associated with the event.
    pub focal_mechanism_refs: Vec<PublicId>,
}

impl Event {
    #[must_use]
    pub fn new(public_id: impl Into<PublicId>) -> Self {
        Self {
            public_id: public_id.into(),
            ..Self::default()
        }
    }

    /// Text of the first description typed as region name.
    #[must_use]
    pub fn region_name(&self) -> Option<&str> {
        self.descriptions
            .iter()
            .find(|d| d.description_type == Some(EventDescriptionType::RegionName))
            .map(|d| d.text.as_str())
    }
}

// =============================================================================
// ORIGIN
// =============================================================================

/// Location quality metrics of an origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginQuality {
    pub associated_phase_count: Option<u32>,
    pub used_phase_count: Option<u32>,
    pub associated_station_count: Option<u32>,
    pub used_station_count: Option<u32>,
    pub depth_phase_count: Option<u32>,
    pub standard_error: Option<f64>,
    pub azimuthal_gap: Option<f64>,
    pub minimum_distance: Option<f64>,
    pub maximum_distance: Option<f64>,
}

/// Horizontal location uncertainty of an origin in km.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginUncertainty {
    pub horizontal_uncertainty: Option<f64>,
    pub min_horizontal_uncertainty: Option<f64>,
    pub max_horizontal_uncertainty: Option<f64>,
}

/// Association of a pick with an origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    pub pick_id: PublicId,
    pub phase: String,
    /// Epicentral distance in degrees.
    pub distance: f64,
    pub azimuth: Option<f64>,
    pub time_residual: Option<f64>,
    /// Weight in `[0, 1]`.
    pub weight: f64,
}

/// Station contribution to a network magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMagnitudeContribution {
    pub station_magnitude_id: PublicId,
    pub weight: Option<f64>,
    pub residual: Option<f64>,
}

/// A network magnitude.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Magnitude {
    pub public_id: PublicId,
    pub magnitude: RealQuantity,
    pub magnitude_type: String,
    /// Origin the magnitude was computed for.
    pub origin_id: Option<PublicId>,
    pub method_id: Option<String>,
    pub station_count: Option<u32>,
    pub evaluation_mode: Option<EvaluationMode>,
    pub evaluation_status: Option<EvaluationStatus>,
    pub creation_info: Option<CreationInfo>,
    pub station_magnitude_contributions: Vec<StationMagnitudeContribution>,
    pub comments: Vec<Comment>,
}

impl Magnitude {
    #[must_use]
    pub fn new(public_id: impl Into<PublicId>, magnitude_type: &str, value: f64) -> Self {
        Self {
            public_id: public_id.into(),
            magnitude: RealQuantity::new(value),
            magnitude_type: magnitude_type.to_string(),
            ..Self::default()
        }
    }

    /// Agency of the magnitude, if recorded.
    #[must_use]
    pub fn agency_id(&self) -> Option<&str> {
        self.creation_info.as_ref()?.agency_id.as_deref()
    }
}

/// A single-station magnitude.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationMagnitude {
    pub public_id: PublicId,
    pub magnitude: RealQuantity,
    pub magnitude_type: String,
    pub amplitude_id: Option<PublicId>,
    pub waveform_id: WaveformStreamId,
    pub creation_info: Option<CreationInfo>,
    pub comments: Vec<Comment>,
}

/// A hypocenter or centroid solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub public_id: PublicId,
    pub time: TimeQuantity,
    pub latitude: RealQuantity,
    pub longitude: RealQuantity,
    /// Depth in km.
    pub depth: RealQuantity,
    #[serde(default)]
    pub origin_type: Option<OriginType>,
    #[serde(default)]
    pub method_id: Option<String>,
    #[serde(default)]
    pub evaluation_mode: Option<EvaluationMode>,
    #[serde(default)]
    pub evaluation_status: Option<EvaluationStatus>,
    #[serde(default)]
    pub quality: Option<OriginQuality>,
    #[serde(default)]
    pub uncertainty: Option<OriginUncertainty>,
    #[serde(default)]
    pub creation_info: Option<CreationInfo>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub arrivals: Vec<Arrival>,
    #[serde(default)]
    pub magnitudes: Vec<Magnitude>,
    #[serde(default)]
    pub station_magnitudes: Vec<StationMagnitude>,
}

impl Origin {
    /// An origin with location and time only.
    #[must_use]
    pub fn new(
        public_id: impl Into<PublicId>,
        time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        depth: f64,
    ) -> Self {
        Self {
            public_id: public_id.into(),
            time: TimeQuantity::new(time),
            latitude: RealQuantity::new(latitude),
            longitude: RealQuantity::new(longitude),
            depth: RealQuantity::new(depth),
            origin_type: None,
            method_id: None,
            evaluation_mode: None,
            evaluation_status: None,
            quality: None,
            uncertainty: None,
            creation_info: None,
            comments: Vec::new(),
            arrivals: Vec::new(),
            magnitudes: Vec::new(),
            station_magnitudes: Vec::new(),
        }
    }

    /// A copy without arrivals, magnitudes, station magnitudes or comments.
    #[must_use]
    pub fn bare(&self) -> Self {
        Self {
            comments: Vec::new(),
            arrivals: Vec::new(),
            magnitudes: Vec::new(),
            station_magnitudes: Vec::new(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn agency_id(&self) -> Option<&str> {
        self.creation_info.as_ref()?.agency_id.as_deref()
    }

    #[must_use]
    pub fn magnitude(&self, id: &str) -> Option<&Magnitude> {
        self.magnitudes.iter().find(|m| m.public_id.as_str() == id)
    }

    #[must_use]
    pub fn is_centroid(&self) -> bool {
        self.origin_type == Some(OriginType::Centroid)
    }
}

// =============================================================================
// PICKS & AMPLITUDES
// =============================================================================

/// A phase onset measured on a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub public_id: PublicId,
    pub time: TimeQuantity,
    pub waveform_id: WaveformStreamId,
    #[serde(default)]
    pub phase_hint: Option<String>,
    #[serde(default)]
    pub evaluation_mode: Option<EvaluationMode>,
    #[serde(default)]
    pub polarity: Option<PickPolarity>,
    #[serde(default)]
    pub creation_info: Option<CreationInfo>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Pick {
    #[must_use]
    pub fn new(
        public_id: impl Into<PublicId>,
        time: DateTime<Utc>,
        waveform_id: WaveformStreamId,
    ) -> Self {
        Self {
            public_id: public_id.into(),
            time: TimeQuantity::new(time),
            waveform_id,
            phase_hint: None,
            evaluation_mode: None,
            polarity: None,
            creation_info: None,
            comments: Vec::new(),
        }
    }

    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.creation_info.as_ref()?.author.as_deref()
    }
}

/// A waveform amplitude measurement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Amplitude {
    pub public_id: PublicId,
    pub amplitude_type: String,
    pub amplitude: Option<RealQuantity>,
    /// Dominant period in seconds.
    pub period: Option<RealQuantity>,
    pub pick_id: Option<PublicId>,
    pub waveform_id: Option<WaveformStreamId>,
    /// Time the measurement refers to; used for range queries.
    pub reference_time: Option<DateTime<Utc>>,
    pub creation_info: Option<CreationInfo>,
    pub comments: Vec<Comment>,
}

// =============================================================================
// FOCAL MECHANISMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodalPlane {
    pub strike: f64,
    pub dip: f64,
    pub rake: f64,
}

impl NodalPlane {
    #[must_use]
    pub const fn new(strike: f64, dip: f64, rake: f64) -> Self {
        Self { strike, dip, rake }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodalPlanes {
    pub nodal_plane1: Option<NodalPlane>,
    pub nodal_plane2: Option<NodalPlane>,
    pub preferred_plane: Option<u8>,
}

/// A principal axis: eigenvalue (`length`) with plunge and azimuth in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub azimuth: f64,
    pub plunge: f64,
    pub length: f64,
}

impl Axis {
    #[must_use]
    pub const fn new(length: f64, plunge: f64, azimuth: f64) -> Self {
        Self {
            azimuth,
            plunge,
            length,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrincipalAxes {
    pub t_axis: Axis,
    pub n_axis: Axis,
    pub p_axis: Axis,
}

/// Moment tensor components in spherical coordinates (r, theta, phi), Nm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub mrr: f64,
    pub mtt: f64,
    pub mpp: f64,
    pub mrt: f64,
    pub mrp: f64,
    pub mtp: f64,
}

impl Tensor {
    /// Components in `Mrr, Mtt, Mpp, Mrt, Mrp, Mtp` order.
    #[must_use]
    pub const fn components(&self) -> [f64; 6] {
        [self.mrr, self.mtt, self.mpp, self.mrt, self.mrp, self.mtp]
    }
}

/// Per-station inversion setup of a moment tensor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentTensorStationContribution {
    pub waveform_id: Option<WaveformStreamId>,
    pub active: bool,
    pub weight: Option<f64>,
    pub time_shift: Option<f64>,
}

/// Per-phase inversion setup of a moment tensor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentTensorPhaseSetting {
    pub code: String,
    pub lower_period: Option<f64>,
    pub upper_period: Option<f64>,
    pub minimum_snr: Option<f64>,
    pub maximum_time_shift: Option<f64>,
}

/// Moment tensor solution of a focal mechanism.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentTensor {
    pub public_id: PublicId,
    pub derived_origin_id: Option<PublicId>,
    pub moment_magnitude_id: Option<PublicId>,
    /// Scalar moment in Nm.
    pub scalar_moment: Option<f64>,
    pub tensor: Option<Tensor>,
    pub variance_reduction: Option<f64>,
    pub double_couple: Option<f64>,
    pub method_id: Option<String>,
    pub greens_function_id: Option<String>,
    pub station_contributions: Vec<MomentTensorStationContribution>,
    pub phase_settings: Vec<MomentTensorPhaseSetting>,
    pub creation_info: Option<CreationInfo>,
    pub comments: Vec<Comment>,
}

/// A focal mechanism with optional moment tensor solutions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FocalMechanism {
    pub public_id: PublicId,
    pub triggering_origin_id: Option<PublicId>,
    pub nodal_planes: Option<NodalPlanes>,
    pub principal_axes: Option<PrincipalAxes>,
    pub method_id: Option<String>,
    pub evaluation_mode: Option<EvaluationMode>,
    pub evaluation_status: Option<EvaluationStatus>,
    pub creation_info: Option<CreationInfo>,
    pub comments: Vec<Comment>,
    pub moment_tensors: Vec<MomentTensor>,
}

impl FocalMechanism {
    #[must_use]
    pub fn new(public_id: impl Into<PublicId>) -> Self {
        Self {
            public_id: public_id.into(),
            ..Self::default()
        }
    }

    /// A copy without moment tensors or comments.
    #[must_use]
    pub fn bare(&self) -> Self {
        Self {
            comments: Vec::new(),
            moment_tensors: Vec::new(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn agency_id(&self) -> Option<&str> {
        self.creation_info.as_ref()?.agency_id.as_deref()
    }

    /// The first moment tensor, which is the one every consumer uses.
    #[must_use]
    pub fn moment_tensor(&self) -> Option<&MomentTensor> {
        self.moment_tensors.first()
    }
}
