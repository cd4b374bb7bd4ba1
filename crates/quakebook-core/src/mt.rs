//! # Moment Tensor Sheet
//!
//! Text rendering of a focal mechanism in the layout of public moment
//! tensor solution pages: triggering origin header, solution title, depth,
//! scaled tensor, principal axes, best double couple and a beachball.
//!
//! Integer fields truncate toward zero. The tensor block shares one power
//! of ten (never below 0) across the six components and the three
//! principal axis values; the scalar moment has its own.

use crate::graph::EventGraph;
use crate::primitives::DEFAULT_MT_AGENCY;
use crate::radiation::{CartesianTensor, beachball};
use crate::{EntityKind, FocalMechanism, PublicId, QuakeError};
use chrono::{DateTime, Utc};

// =============================================================================
// REGION LOOKUP
// =============================================================================

/// Source of the region name printed under the origin time.
pub trait RegionLookup {
    fn region_name(&self, graph: &EventGraph, latitude: f64, longitude: f64) -> Option<String>;
}

/// Uses the event's `region name` description.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventRegion;

impl RegionLookup for EventRegion {
    fn region_name(&self, graph: &EventGraph, _latitude: f64, _longitude: f64) -> Option<String> {
        graph.event().region_name().map(str::to_string)
    }
}

// =============================================================================
// SHEET
// =============================================================================

/// Renderer for moment tensor solution sheets.
pub struct MomentTensorSheet {
    regions: Box<dyn RegionLookup>,
    fallback_agency_id: String,
}

impl Default for MomentTensorSheet {
    fn default() -> Self {
        Self {
            regions: Box::new(EventRegion),
            fallback_agency_id: DEFAULT_MT_AGENCY.to_string(),
        }
    }
}

impl MomentTensorSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_regions(mut self, regions: impl RegionLookup + 'static) -> Self {
        self.regions = Box::new(regions);
        self
    }

    /// Agency printed when the focal mechanism carries none.
    #[must_use]
    pub fn with_fallback_agency(mut self, agency_id: impl Into<String>) -> Self {
        self.fallback_agency_id = agency_id.into();
        self
    }

    /// Render the sheet for `fm`; referenced objects come from `graph`.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` when nodal planes, principal axes, the moment
    /// tensor or its values are missing; `NotFound` when the moment
    /// magnitude, triggering or derived origin is not in the graph.
    pub fn render(&self, graph: &EventGraph, fm: &FocalMechanism) -> Result<String, QuakeError> {
        let planes = fm.nodal_planes.as_ref();
        let np1 = planes
            .and_then(|p| p.nodal_plane1)
            .ok_or_else(|| incomplete(fm, "nodal planes"))?;
        let np2 = planes
            .and_then(|p| p.nodal_plane2)
            .ok_or_else(|| incomplete(fm, "nodal planes"))?;
        let mt = fm
            .moment_tensor()
            .ok_or_else(|| incomplete(fm, "moment tensor"))?;

        let magnitude_id = reference(mt.moment_magnitude_id.as_ref());
        let magnitude = graph
            .magnitude(magnitude_id.as_str())
            .ok_or_else(|| missing(EntityKind::Magnitude, &magnitude_id))?;
        let triggering_id = reference(fm.triggering_origin_id.as_ref());
        let triggering = graph
            .origin(triggering_id.as_str())
            .ok_or_else(|| missing(EntityKind::Origin, &triggering_id))?;
        let derived_id = reference(mt.derived_origin_id.as_ref());
        let derived = graph
            .origin(derived_id.as_str())
            .ok_or_else(|| missing(EntityKind::Origin, &derived_id))?;

        let tensor = mt.tensor.ok_or_else(|| incomplete(fm, "tensor"))?;
        let moment = mt
            .scalar_moment
            .ok_or_else(|| incomplete(fm, "scalar moment"))?;
        let axes = fm
            .principal_axes
            .ok_or_else(|| incomplete(fm, "principal axes"))?;

        let lat = triggering.latitude.value;
        let lon = triggering.longitude.value;
        let region = self
            .regions
            .region_name(graph, lat, lon)
            .unwrap_or_default();
        let agency = fm.agency_id().unwrap_or(self.fallback_agency_id.as_str());

        let mut lines = vec![
            sheet_time(triggering.time.value),
            region,
            format!("Epicenter: {lat:.2} {lon:.2}"),
            format!("MW {:.1}", magnitude.magnitude.value),
            String::new(),
        ];

        if derived.is_centroid() {
            lines.push(format!("{agency} CENTROID MOMENT TENSOR SOLUTION"));
            lines.push(format!(
                "Centroid:  {:.2} {:.2}",
                derived.latitude.value, derived.longitude.value
            ));
            lines.push(sheet_time(derived.time.value));
        } else {
            lines.push(format!("{agency} MOMENT TENSOR SOLUTION"));
        }

        let depth = (derived.depth.value + 0.5) as i64;
        let station_count = derived
            .quality
            .and_then(|q| q.used_station_count)
            .or_else(|| derived.magnitudes.first().and_then(|m| m.station_count))
            .map_or(-1, i64::from);
        lines.push(format!(
            "Depth {depth:3}  {:>21}",
            format!("No. of sta: {station_count}")
        ));

        let (t, n, p) = (axes.t_axis, axes.n_axis, axes.p_axis);
        let expo = tensor
            .components()
            .into_iter()
            .chain([t.length, n.length, p.length])
            .fold(0.0_f64, |acc, v| acc.max(v.abs().log10())) as i32;
        let q = 10.0_f64.powi(expo);

        lines.push(format!("Moment Tensor;   Scale 10**{expo} Nm"));
        lines.push(format!(
            "  Mrr={:5.2}       Mtt={:5.2}",
            tensor.mrr / q,
            tensor.mtt / q
        ));
        lines.push(format!(
            "  Mpp={:5.2}       Mrt={:5.2}",
            tensor.mpp / q,
            tensor.mrt / q
        ));
        lines.push(format!(
            "  Mrp={:5.2}       Mtp={:5.2}",
            tensor.mrp / q,
            tensor.mtp / q
        ));

        lines.push("Principal axes:".to_string());
        lines.push(format!(
            "  T  Val= {:5.2}  Plg={:2}  Azm={:3}",
            t.length / q,
            t.plunge as i64,
            t.azimuth as i64
        ));
        lines.push(format!(
            "  N       {:5.2}      {:2}      {:3}",
            n.length / q,
            n.plunge as i64,
            n.azimuth as i64
        ));
        lines.push(format!(
            "  P       {:5.2}      {:2}      {:3}",
            p.length / q,
            p.plunge as i64,
            p.azimuth as i64
        ));

        lines.push(String::new());
        let moment_expo = moment.log10() as i32;
        let scaled_moment = moment * 10.0_f64.powf(f64::from(-moment_expo));
        lines.push(format!(
            "Best Double Couple:Mo={scaled_moment:3.1}*10**{moment_expo}"
        ));
        lines.push(format!(
            " NP1:Strike={:3} Dip={:2} Slip={:4}",
            np1.strike as i64, np1.dip as i64, np1.rake as i64
        ));
        lines.push(format!(
            " NP2:       {:3}     {:2}      {:4}",
            np2.strike as i64, np2.dip as i64, np2.rake as i64
        ));

        lines.push(beachball(&CartesianTensor::from(&tensor)));
        Ok(lines.join("\n"))
    }
}

/// Render `fm` with the event region and the default agency.
///
/// # Errors
///
/// See [`MomentTensorSheet::render`].
pub fn fm2txt(graph: &EventGraph, fm: &FocalMechanism) -> Result<String, QuakeError> {
    MomentTensorSheet::default().render(graph, fm)
}

/// `YY/MM/DD HH:MM:SS.cc` with truncated centiseconds.
fn sheet_time(time: DateTime<Utc>) -> String {
    format!(
        "{}.{:02}",
        time.format("%y/%m/%d %H:%M:%S"),
        time.timestamp_subsec_millis() / 10
    )
}

fn reference(id: Option<&PublicId>) -> PublicId {
    id.cloned().unwrap_or_default()
}

fn incomplete(fm: &FocalMechanism, what: &str) -> QuakeError {
    tracing::error!("Focal mechanism {} lacks {}", fm.public_id, what);
    QuakeError::InvalidFormat(format!(
        "focal mechanism '{}' lacks {what}",
        fm.public_id
    ))
}

fn missing(kind: EntityKind, id: &PublicId) -> QuakeError {
    tracing::error!("{} {} not found", kind, id);
    QuakeError::not_found(kind, id)
}
