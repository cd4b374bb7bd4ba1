//! # Bulletin Formatter
//!
//! Fixed-width origin bulletin (`autoloc3` layout): event block, origin
//! block, network magnitudes, phase arrivals and station magnitudes.
//!
//! Two independent switches control the output:
//! - [`BulletinMode`]: `Extra` adds public IDs, authors and creation times
//! - `enhanced`: 5-decimal degrees, millisecond times, 3-decimal km errors

use crate::graph::EventGraph;
use crate::primitives::{
    ARRIVAL_FLAG_WEIGHT, KM_PER_DEGREE, MIN_ARRIVAL_WEIGHT, MIN_DEPTH_PHASE_COUNT,
    MIN_STATION_MAGNITUDE_WEIGHT, PERIOD_MAGNITUDE_TYPES,
};
use crate::registry::{LookupChain, ObjectLookup, ObjectRegistry};
use crate::{
    Arrival, EntityKind, EvaluationMode, EvaluationStatus, Event, Magnitude, Origin, PublicId,
    QuakeError, StationMagnitude, StationMagnitudeContribution,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// OPTIONS
// =============================================================================

/// Verbosity of the bulletin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulletinMode {
    #[default]
    Standard,
    Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletinOptions {
    pub mode: BulletinMode,
    pub enhanced: bool,
    pub polarities: bool,
    pub dist_in_km: bool,
    /// Print the event's agency instead of the origin's.
    pub use_event_agency_id: bool,
    /// Print the phase and station magnitude tables.
    pub phase_tables: bool,
    pub min_depth_phase_count: u32,
    pub min_arrival_weight: f64,
    pub min_station_magnitude_weight: f64,
}

impl Default for BulletinOptions {
    fn default() -> Self {
        Self {
            mode: BulletinMode::Standard,
            enhanced: false,
            polarities: false,
            dist_in_km: false,
            use_event_agency_id: false,
            phase_tables: true,
            min_depth_phase_count: MIN_DEPTH_PHASE_COUNT,
            min_arrival_weight: MIN_ARRIVAL_WEIGHT,
            min_station_magnitude_weight: MIN_STATION_MAGNITUDE_WEIGHT,
        }
    }
}

// =============================================================================
// BULLETIN
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Bulletin {
    options: BulletinOptions,
}

/// Station key -> (distance, formatted azimuth) collected from the phase table.
type DistanceTable = BTreeMap<String, (f64, String)>;

impl Bulletin {
    #[must_use]
    pub fn new(options: BulletinOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &BulletinOptions {
        &self.options
    }

    /// Bulletin of the event's preferred origin.
    ///
    /// # Errors
    ///
    /// `NotFound` if the preferred origin is not in the graph.
    pub fn format_event(&self, graph: &EventGraph) -> Result<String, QuakeError> {
        let origin = preferred_origin(graph)?;
        Ok(self.format_origin(origin, Some(graph.event()), graph))
    }

    /// Like [`format_event`](Self::format_event), with `registry` as the
    /// out-of-band source for magnitudes, picks and amplitudes.
    ///
    /// # Errors
    ///
    /// `NotFound` if the preferred origin is not in the graph.
    pub fn format_event_with_registry(
        &self,
        graph: &EventGraph,
        registry: &ObjectRegistry,
    ) -> Result<String, QuakeError> {
        let origin = preferred_origin(graph)?;
        let lookup = LookupChain::new(graph, registry);
        Ok(self.format_origin(origin, Some(graph.event()), &lookup))
    }

    /// Bulletin of any origin. Without an event the event block is omitted.
    #[must_use]
    pub fn format_origin(
        &self,
        origin: &Origin,
        event: Option<&Event>,
        lookup: &dyn ObjectLookup,
    ) -> String {
        let mut txt = String::new();
        if let Some(event) = event {
            txt.push_str(&self.event_block(event));
        }
        txt.push_str(&self.origin_block(origin, event));

        let (magnitude_txt, network_magnitudes, contributions) =
            self.network_magnitude_block(origin, event, lookup);
        txt.push_str(&magnitude_txt);
        if !self.options.phase_tables {
            return txt;
        }

        let (phase_txt, distances) = self.phase_block(origin, lookup);
        txt.push_str(&phase_txt);
        txt.push_str(&self.station_magnitude_block(
            origin,
            &network_magnitudes,
            &contributions,
            &distances,
            lookup,
        ));
        txt
    }

    // -------------------------------------------------------------------------
    // Event and origin
    // -------------------------------------------------------------------------

    fn extra(&self) -> bool {
        self.options.mode == BulletinMode::Extra
    }

    fn event_block(&self, event: &Event) -> String {
        let mut txt = String::from("Event:\n");
        txt.push_str(&format!("    Public ID              {}\n", event.public_id));
        if self.extra() {
            txt.push_str(&format!(
                "    Preferred Origin ID    {}\n",
                id_or_empty(event.preferred_origin_id.as_ref())
            ));
            txt.push_str(&format!(
                "    Preferred Magnitude ID {}\n",
                id_or_empty(event.preferred_magnitude_id.as_ref())
            ));
        }
        if let Some(event_type) = event.event_type {
            txt.push_str(&format!("    Type                   {}\n", event_type.name()));
        }
        txt.push_str("    Description\n");
        for description in &event.descriptions {
            let kind = description.description_type.map_or("", |t| t.name());
            txt.push_str(&format!("      {}: {}\n", kind, description.text));
        }
        if self.extra() {
            let created = event
                .creation_info
                .as_ref()
                .and_then(|ci| ci.creation_time);
            if let Some(created) = created {
                txt.push_str(&format!(
                    "    Creation time          {}\n\n",
                    created.format("%Y-%m-%d %H:%M:%S")
                ));
            }
        }
        txt
    }

    fn clock(&self, time: DateTime<Utc>) -> String {
        let tstr = time_str(time);
        if self.options.enhanced {
            tstr[11..].to_string()
        } else {
            tstr[11..21].to_string()
        }
    }

    fn origin_block(&self, origin: &Origin, event: Option<&Event>) -> String {
        let enhanced = self.options.enhanced;
        let not_preferred = event.is_some_and(|e| {
            e.preferred_origin_id.as_ref() != Some(&origin.public_id)
        });
        let mut txt = if not_preferred {
            String::from("Origin (NOT the preferred origin of this event):\n")
        } else {
            String::from("Origin:\n")
        };
        if self.extra() {
            txt.push_str(&format!("    Public ID              {}\n", origin.public_id));
        }

        let tstr = time_str(origin.time.value);
        txt.push_str(&format!("    Date                   {}\n", &tstr[..10]));
        let clock = self.clock(origin.time.value);
        match nonzero(origin.time.uncertainty()) {
            Some(err) if enhanced => txt.push_str(&format!(
                "    Time                   {clock}   +/- {err:8.3} s\n"
            )),
            Some(err) => txt.push_str(&format!(
                "    Time                   {clock}  +/- {err:6.1} s\n"
            )),
            None => txt.push_str(&format!("    Time                   {clock}\n")),
        }

        txt.push_str(&coordinate_line(
            "Latitude ",
            origin.latitude.value,
            nonzero(origin.latitude.uncertainty()),
            enhanced,
        ));
        txt.push_str(&coordinate_line(
            "Longitude",
            origin.longitude.value,
            nonzero(origin.longitude.uncertainty()),
            enhanced,
        ));
        txt.push_str(&self.depth_line(origin));

        let agency = if self.options.use_event_agency_id {
            event
                .and_then(|e| e.creation_info.as_ref())
                .and_then(|ci| ci.agency_id.as_deref())
        } else {
            origin.agency_id()
        };
        txt.push_str(&format!(
            "    Agency                 {}\n",
            agency.unwrap_or_default()
        ));
        if self.extra() {
            let author = origin
                .creation_info
                .as_ref()
                .and_then(|ci| ci.author.as_deref())
                .unwrap_or("NOT SET");
            txt.push_str(&format!("    Author                 {author}\n"));
        }
        txt.push_str(&format!(
            "    Mode                   {}\n",
            origin.evaluation_mode.map_or("NOT SET", EvaluationMode::name)
        ));
        txt.push_str(&format!(
            "    Status                 {}\n",
            origin
                .evaluation_status
                .map_or("NOT SET", EvaluationStatus::name)
        ));
        if self.extra() {
            let created = origin
                .creation_info
                .as_ref()
                .and_then(|ci| ci.creation_time)
                .map_or_else(
                    || "NOT SET".to_string(),
                    |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
                );
            txt.push_str(&format!("    Creation time          {created}\n"));
        }
        if let Some(rms) = origin.quality.and_then(|q| q.standard_error) {
            if enhanced {
                txt.push_str(&format!("    Residual RMS           {rms:9.3} s\n"));
            } else {
                txt.push_str(&format!("    Residual RMS           {rms:6.2} s\n"));
            }
        }
        if let Some(gap) = origin.quality.and_then(|q| q.azimuthal_gap) {
            if enhanced {
                txt.push_str(&format!("    Azimuthal gap           {gap:8.1} deg\n"));
            } else {
                txt.push_str(&format!("    Azimuthal gap           {gap:5.0} deg\n"));
            }
        }
        txt.push('\n');
        txt
    }

    /// Depth phases from the quality block, else counted from arrivals.
    fn depth_phase_count(&self, origin: &Origin) -> u32 {
        if let Some(count) = origin.quality.and_then(|q| q.depth_phase_count) {
            return count;
        }
        let count = origin
            .arrivals
            .iter()
            .filter(|a| a.phase.starts_with(['p', 's']))
            .filter(|a| a.weight >= self.options.min_arrival_weight)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn depth_line(&self, origin: &Origin) -> String {
        let depth = origin.depth.value;
        let mut txt = if self.options.enhanced {
            format!("    Depth                {depth:11.3} km")
        } else {
            format!("    Depth                 {depth:7.0} km")
        };
        match origin.depth.uncertainty() {
            None => txt.push('\n'),
            Some(err) if err == 0.0 => txt.push_str("   (fixed)\n"),
            Some(err) => {
                let count = self.depth_phase_count(origin);
                let err = if self.options.enhanced {
                    format!("{err:8.3}")
                } else {
                    format!("{err:4.0}")
                };
                if count >= self.options.min_depth_phase_count {
                    txt.push_str(&format!("   +/- {err} km  ({count} depth phases)\n"));
                } else {
                    txt.push_str(&format!("   +/- {err} km\n"));
                }
            }
        }
        txt
    }

    // -------------------------------------------------------------------------
    // Network magnitudes
    // -------------------------------------------------------------------------

    #[allow(clippy::type_complexity)]
    fn network_magnitude_block<'a>(
        &self,
        origin: &'a Origin,
        event: Option<&Event>,
        lookup: &'a dyn ObjectLookup,
    ) -> (
        String,
        BTreeMap<&'a str, &'a Magnitude>,
        BTreeMap<&'a str, &'a StationMagnitudeContribution>,
    ) {
        let preferred_id = event
            .and_then(|e| e.preferred_magnitude_id.as_ref())
            .map_or("", PublicId::as_str);
        let mut network_magnitudes = BTreeMap::new();
        let mut contributions = BTreeMap::new();
        let mut rows = String::new();
        let mut found_preferred = false;

        for magnitude in &origin.magnitudes {
            network_magnitudes.insert(magnitude.magnitude_type.as_str(), magnitude);
            for contribution in &magnitude.station_magnitude_contributions {
                contributions.insert(contribution.station_magnitude_id.as_str(), contribution);
            }
            let preferred = magnitude.public_id.as_str() == preferred_id;
            found_preferred |= preferred;
            rows.push_str(&self.magnitude_row(magnitude, preferred));
        }

        if !found_preferred && !preferred_id.is_empty() {
            if let Some(magnitude) = lookup.find_magnitude(preferred_id) {
                network_magnitudes.insert(magnitude.magnitude_type.as_str(), magnitude);
                rows.push_str(&self.magnitude_row(magnitude, true));
            }
        }

        let txt = format!("{} Network magnitudes:\n{rows}", origin.magnitudes.len());
        (txt, network_magnitudes, contributions)
    }

    fn magnitude_row(&self, magnitude: &Magnitude, preferred: bool) -> String {
        let err = magnitude
            .magnitude
            .uncertainty()
            .map_or_else(String::new, |e| format!("+/- {e:.2}"));
        let marker = if preferred { "preferred" } else { "         " };
        let agency = if self.extra() {
            magnitude.agency_id().unwrap_or_default()
        } else {
            ""
        };
        format!(
            "    {:<8} {:5.2} {:>8} {:3} {}  {}\n",
            magnitude.magnitude_type,
            magnitude.magnitude.value,
            err,
            magnitude.station_count.unwrap_or(0),
            marker,
            agency
        )
    }

    // -------------------------------------------------------------------------
    // Phase arrivals
    // -------------------------------------------------------------------------

    fn distance(&self, degrees: f64) -> f64 {
        if self.options.dist_in_km {
            degrees * KM_PER_DEGREE
        } else {
            degrees
        }
    }

    fn distance_column(&self, distance: f64) -> String {
        match (self.options.enhanced, self.options.dist_in_km) {
            (true, true) => format!("{distance:9.3}"),
            (true, false) => format!("{distance:9.5}"),
            (false, true) => format!("{distance:5.0}"),
            (false, false) => format!("{distance:5.1}"),
        }
    }

    fn missing_azimuth(&self) -> String {
        if self.options.enhanced { "  N/A" } else { "N/A" }.to_string()
    }

    /// Station key, azimuth column, distance and the rendered row.
    fn phase_row(
        &self,
        arrival: &Arrival,
        lookup: &dyn ObjectLookup,
    ) -> Option<(String, String, f64, String)> {
        let pick = lookup.find_pick(arrival.pick_id.as_str())?;
        let enhanced = self.options.enhanced;
        let distance = self.distance(arrival.distance);
        let net = pick.waveform_id.network_code.as_str();
        let sta = pick.waveform_id.station_code.as_str();

        let azi = match arrival.azimuth {
            Some(az) if enhanced => format!("{az:5.1}"),
            Some(az) => format!("{az:3.0}"),
            None => self.missing_azimuth(),
        };
        let res = match arrival.time_residual {
            Some(r) if enhanced => format!("{r:7.3}"),
            Some(r) => format!("{r:5.1}"),
            None if enhanced => "    N/A".to_string(),
            None => "  N/A".to_string(),
        };
        let tstr = self.clock(pick.time.value);
        let status = pick.evaluation_mode.map_or('-', EvaluationMode::letter);
        let flag = if arrival.weight > ARRIVAL_FLAG_WEIGHT { ' ' } else { 'X' };
        let polarity = if self.options.polarities {
            format!("{} ", pick.polarity.map_or('.', |p| p.letter()))
        } else {
            String::new()
        };

        let line = format!(
            "    {:<5} {:<2}  {} {}  {:<7} {} {} {}{} {:3.1}  {}{:<5}\n",
            sta,
            net,
            self.distance_column(distance),
            azi,
            arrival.phase,
            tstr,
            res,
            status,
            flag,
            arrival.weight,
            polarity,
            sta
        );
        Some((pick.waveform_id.station_key(), azi, distance, line))
    }

    fn phase_block(&self, origin: &Origin, lookup: &dyn ObjectLookup) -> (String, DistanceTable) {
        let mut arrivals: Vec<&Arrival> = origin.arrivals.iter().collect();
        arrivals.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let mut distances = DistanceTable::new();
        let mut rows: Vec<(f64, String)> = Vec::with_capacity(arrivals.len());
        for arrival in arrivals {
            match self.phase_row(arrival, lookup) {
                Some((key, azi, distance, line)) => {
                    distances.insert(key, (distance, azi));
                    rows.push((distance, line));
                }
                None => {
                    tracing::debug!("Missing pick {}", arrival.pick_id);
                    // Sorted past every real row, in degrees or km.
                    rows.push((
                        self.distance(180.0),
                        format!("    ## missing pick {}\n", arrival.pick_id),
                    ));
                }
            }
        }
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut txt = format!("\n{} Phase arrivals:\n", origin.arrivals.len());
        if self.options.enhanced {
            txt.push_str("    sta   net      dist   azi  phase   time             res     wt  ");
        } else {
            txt.push_str("    sta   net  dist azi  phase   time         res     wt  ");
        }
        if self.options.polarities {
            txt.push_str("  ");
        }
        txt.push_str("sta  \n");
        for (_, line) in rows {
            txt.push_str(&line);
        }
        txt.push('\n');
        (txt, distances)
    }

    // -------------------------------------------------------------------------
    // Station magnitudes
    // -------------------------------------------------------------------------

    fn station_magnitude_block(
        &self,
        origin: &Origin,
        network_magnitudes: &BTreeMap<&str, &Magnitude>,
        contributions: &BTreeMap<&str, &StationMagnitudeContribution>,
        distances: &DistanceTable,
        lookup: &dyn ObjectLookup,
    ) -> String {
        let active: Vec<&StationMagnitude> = origin
            .station_magnitudes
            .iter()
            .filter(|s| network_magnitudes.contains_key(s.magnitude_type.as_str()))
            .filter(|s| {
                contributions.get(s.public_id.as_str()).is_some_and(|c| {
                    c.weight.unwrap_or(self.options.min_station_magnitude_weight)
                        >= self.options.min_station_magnitude_weight
                })
            })
            .collect();

        if active.is_empty() {
            return "No station magnitudes\n".to_string();
        }

        // Grouped by type in first-seen order, then ordered by distance.
        let mut types: Vec<&str> = Vec::new();
        for station_magnitude in &active {
            if !types.contains(&station_magnitude.magnitude_type.as_str()) {
                types.push(station_magnitude.magnitude_type.as_str());
            }
        }
        let mut rows: Vec<(f64, String)> = Vec::with_capacity(active.len());
        for kind in types {
            for station_magnitude in active.iter().filter(|s| s.magnitude_type == kind) {
                if let Some(network) = network_magnitudes.get(kind) {
                    rows.push(self.station_magnitude_row(
                        station_magnitude,
                        network,
                        distances,
                        lookup,
                    ));
                }
            }
        }
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut txt = format!("{} Station magnitudes:\n", active.len());
        if self.options.enhanced {
            txt.push_str("    sta   net      dist   azi  type   value   res        amp  per\n");
        } else {
            txt.push_str("    sta   net  dist azi  type   value   res        amp  per\n");
        }
        for (_, line) in rows {
            txt.push_str(&line);
        }
        txt
    }

    fn station_magnitude_row(
        &self,
        station_magnitude: &StationMagnitude,
        network: &Magnitude,
        distances: &DistanceTable,
        lookup: &dyn ObjectLookup,
    ) -> (f64, String) {
        let kind = station_magnitude.magnitude_type.as_str();
        let amplitude = station_magnitude
            .amplitude_id
            .as_ref()
            .and_then(|id| lookup.find_amplitude(id.as_str()));
        if amplitude.is_none() && station_magnitude.amplitude_id.is_some() {
            tracing::debug!(
                "Missing station amplitude for {}",
                station_magnitude.public_id
            );
        }

        let (amp, period) = match amplitude {
            None => ("N/A".to_string(), String::new()),
            Some(amplitude) => {
                let amp = amplitude
                    .amplitude
                    .map_or_else(|| "N/A".to_string(), |a| format_g(a.value));
                let period = if PERIOD_MAGNITUDE_TYPES.contains(&kind) {
                    amplitude
                        .period
                        .map_or_else(|| "N/A".to_string(), |p| format!("{:.2}", p.value))
                } else {
                    String::new()
                };
                (amp, period)
            }
        };

        let wfid = &station_magnitude.waveform_id;
        let (distance, azi) = distances
            .get(&wfid.station_key())
            .cloned()
            .unwrap_or_else(|| (0.0, self.missing_azimuth()));
        let value = station_magnitude.magnitude.value;
        let residual = value - network.magnitude.value;

        let line = format!(
            "    {:<5} {:<2}  {} {}  {:<6} {:5.2} {:5.2}   {:>8} {:>4}\n",
            wfid.station_code,
            wfid.network_code,
            self.distance_column(distance),
            azi,
            kind,
            value,
            residual,
            amp,
            period
        );
        (distance, line)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn preferred_origin(graph: &EventGraph) -> Result<&Origin, QuakeError> {
    graph.preferred_origin().ok_or_else(|| {
        let id = graph
            .event()
            .preferred_origin_id
            .clone()
            .unwrap_or_default();
        QuakeError::not_found(EntityKind::Origin, &id)
    })
}

fn id_or_empty(id: Option<&PublicId>) -> &str {
    id.map_or("", PublicId::as_str)
}

fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// `YYYY-MM-DD HH:MM:SS.mmm` with truncated milliseconds.
fn time_str(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn coordinate_line(label: &str, value: f64, err: Option<f64>, enhanced: bool) -> String {
    match (err, enhanced) {
        (Some(err), true) => {
            format!("    {label}             {value:10.5} deg  +/- {err:8.3} km\n")
        }
        (Some(err), false) => {
            format!("    {label}             {value:7.2} deg  +/- {err:6.0} km\n")
        }
        (None, true) => format!("    {label}             {value:10.5} deg\n"),
        (None, false) => format!("    {label}             {value:7.2} deg\n"),
    }
}

/// C-style `%g`: six significant digits, trailing zeros removed.
#[must_use]
pub fn format_g(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let sci = format!("{value:.5e}");
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..6).contains(&exponent) {
        let decimals = usize::try_from(5 - exponent).unwrap_or(0);
        trim_zeros(&format!("{value:.decimals$}"))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    }
}

fn trim_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventDescription, RealQuantity};
    use chrono::TimeZone;

    fn origin() -> Origin {
        let time = Utc
            .with_ymd_and_hms(2021, 4, 3, 1, 16, 40)
            .single()
            .expect("valid time")
            + chrono::TimeDelta::milliseconds(87);
        Origin::new("origin/1", time, -58.0512, -7.8812, 17.9)
    }

    #[test]
    fn g_format_matches_printf() {
        assert_eq!(format_g(123.456), "123.456");
        assert_eq!(format_g(0.0001234), "0.0001234");
        assert_eq!(format_g(1234567.0), "1.23457e+06");
        assert_eq!(format_g(0.00001), "1e-05");
        assert_eq!(format_g(100.0), "100");
        assert_eq!(format_g(-2.5), "-2.5");
    }

    #[test]
    fn time_and_coordinates_without_uncertainty() {
        let bulletin = Bulletin::default();
        let txt = bulletin.origin_block(&origin(), None);
        assert!(txt.starts_with("Origin:\n    Date                   2021-04-03\n"));
        assert!(txt.contains("    Time                   01:16:40.0\n"));
        assert!(txt.contains("    Latitude               -58.05 deg\n"));
        assert!(txt.contains("    Longitude               -7.88 deg\n"));
        assert!(txt.contains("    Agency                 \n"));
        assert!(txt.contains("    Mode                   NOT SET\n"));
    }

    #[test]
    fn enhanced_precision() {
        let mut origin = origin();
        origin.time.uncertainty = crate::Uncertainty::symmetric(0.25);
        origin.latitude = RealQuantity::with_uncertainty(-58.0512, 3.5);
        let bulletin = Bulletin::new(BulletinOptions {
            enhanced: true,
            ..BulletinOptions::default()
        });
        let txt = bulletin.origin_block(&origin, None);
        assert!(txt.contains("    Time                   01:16:40.087   +/-    0.250 s\n"));
        assert!(txt.contains("    Latitude               -58.05120 deg  +/-    3.500 km\n"));
    }

    #[test]
    fn depth_suffixes() {
        let bulletin = Bulletin::default();
        let mut origin = origin();

        origin.depth = RealQuantity::with_uncertainty(10.0, 0.0);
        assert_eq!(
            bulletin.depth_line(&origin),
            "    Depth                      10 km   (fixed)\n"
        );

        origin.depth = RealQuantity::with_uncertainty(10.0, 4.0);
        assert_eq!(
            bulletin.depth_line(&origin),
            "    Depth                      10 km   +/-    4 km\n"
        );

        origin.quality = Some(crate::OriginQuality {
            depth_phase_count: Some(5),
            ..crate::OriginQuality::default()
        });
        assert_eq!(
            bulletin.depth_line(&origin),
            "    Depth                      10 km   +/-    4 km  (5 depth phases)\n"
        );

        origin.depth = RealQuantity::new(10.0);
        assert_eq!(
            bulletin.depth_line(&origin),
            "    Depth                      10 km\n"
        );
    }

    #[test]
    fn depth_phases_counted_from_arrivals() {
        let bulletin = Bulletin::default();
        let mut origin = origin();
        for (phase, weight) in [("pP", 1.0), ("sP", 0.6), ("pP", 0.2), ("P", 1.0)] {
            origin.arrivals.push(Arrival {
                pick_id: PublicId::new(format!("pick/{phase}/{weight}")),
                phase: phase.to_string(),
                distance: 30.0,
                azimuth: None,
                time_residual: None,
                weight,
            });
        }
        assert_eq!(bulletin.depth_phase_count(&origin), 2);
    }

    #[test]
    fn origin_header_marks_non_preferred() {
        let bulletin = Bulletin::default();
        let mut event = Event::new("event/1");
        event.preferred_origin_id = Some(PublicId::new("origin/other"));
        let txt = bulletin.origin_block(&origin(), Some(&event));
        assert!(txt.starts_with("Origin (NOT the preferred origin of this event):\n"));
    }

    #[test]
    fn event_block_lists_descriptions() {
        let bulletin = Bulletin::default();
        let mut event = Event::new("gfz2021gmyq");
        event.event_type = Some(crate::EventType::Earthquake);
        event
            .descriptions
            .push(EventDescription::region("East of South Sandwich Islands"));
        assert_eq!(
            bulletin.event_block(&event),
            "Event:\n    Public ID              gfz2021gmyq\n    Type                   earthquake\n    Description\n      region name: East of South Sandwich Islands\n"
        );
    }

    #[test]
    fn extra_event_block_separates_creation_time_only() {
        let bulletin = Bulletin::new(BulletinOptions {
            mode: BulletinMode::Extra,
            ..BulletinOptions::default()
        });
        let mut event = Event::new("gfz2021gmyq");
        assert_eq!(
            bulletin.event_block(&event),
            "Event:\n    Public ID              gfz2021gmyq\n    Preferred Origin ID    \n    Preferred Magnitude ID \n    Description\n"
        );

        event.creation_info = Some(crate::CreationInfo {
            creation_time: Utc.with_ymd_and_hms(2021, 4, 3, 1, 30, 0).single(),
            ..crate::CreationInfo::default()
        });
        assert!(
            bulletin
                .event_block(&event)
                .ends_with("    Description\n    Creation time          2021-04-03 01:30:00\n\n")
        );
    }

    #[test]
    fn missing_picks_sort_last_in_km() {
        let bulletin = Bulletin::new(BulletinOptions {
            dist_in_km: true,
            ..BulletinOptions::default()
        });
        let mut origin = origin();
        for (pick_id, distance) in [("pick/missing", 1.0), ("pick/far", 30.0)] {
            origin.arrivals.push(Arrival {
                pick_id: PublicId::new(pick_id),
                phase: "P".to_string(),
                distance,
                azimuth: Some(90.0),
                time_residual: Some(0.5),
                weight: 1.0,
            });
        }
        let mut registry = ObjectRegistry::new();
        registry.register_pick(crate::Pick::new(
            "pick/far",
            origin.time.value + chrono::TimeDelta::seconds(300),
            crate::WaveformStreamId::new("GE", "FAR", "", "BHZ"),
        ));

        let (txt, _) = bulletin.phase_block(&origin, &registry);
        let far = txt.find("    FAR   GE ").expect("far row");
        let missing = txt.find("    ## missing pick pick/missing").expect("missing row");
        assert!(far < missing, "{}", txt);
    }

    #[test]
    fn out_of_band_preferred_magnitude_is_marked() {
        let bulletin = Bulletin::default();
        let mut origin = origin();
        origin.magnitudes.push(Magnitude::new("mag/mb", "mb", 6.1));
        let mut event = Event::new("event/1");
        event.preferred_origin_id = Some(origin.public_id.clone());
        event.preferred_magnitude_id = Some(PublicId::new("mag/Mw"));
        let mut registry = ObjectRegistry::new();
        let mut mw = Magnitude::new("mag/Mw", "Mw", 6.61);
        mw.station_count = Some(42);
        registry.register_magnitude(mw);

        let (txt, network, _) = bulletin.network_magnitude_block(&origin, Some(&event), &registry);
        assert_eq!(
            txt,
            "1 Network magnitudes:\n    mb        6.10            0            \n    Mw        6.61           42 preferred  \n"
        );
        assert_eq!(network.len(), 2);
    }
}
