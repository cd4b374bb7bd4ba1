//! # CUBE Encoder
//!
//! Single-line, 80 column event digest (`E ` message) terminated by the
//! Menlo Park check character, plus the plain-text summary printed next to
//! it in verbose mode.

use crate::graph::EventGraph;
use crate::primitives::{
    CUBE_KM_PER_DEGREE, CUBE_LINE_LENGTH, DEFAULT_CUBE_NETWORK, DEFAULT_CUBE_VERSION,
    DEFAULT_MAGNITUDE_UNCERTAINTY, DEFAULT_MW_UNCERTAINTY,
};
use crate::{Magnitude, Origin, OriginQuality, QuakeError};
use chrono::Timelike;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeOptions {
    /// Two-letter data source code.
    pub network_code: String,
    pub event_version: char,
}

impl Default for CubeOptions {
    fn default() -> Self {
        Self {
            network_code: DEFAULT_CUBE_NETWORK.to_string(),
            event_version: DEFAULT_CUBE_VERSION,
        }
    }
}

/// Menlo Park check character of the first 79 columns of a CUBE line.
#[must_use]
pub fn menlo_check_char(line: &str) -> char {
    let mut sum: u32 = 0;
    for c in line.bytes() {
        sum = if sum & 1 != 0 {
            (sum >> 1) + 0x8000
        } else {
            sum >> 1
        };
        sum = (sum + u32::from(c)) & 0xFFFF;
    }
    char::from(36 + (sum % 91) as u8)
}

fn preferred(graph: &EventGraph) -> Result<(&Origin, &Magnitude), QuakeError> {
    let origin = graph.preferred_origin().ok_or_else(|| {
        tracing::error!("No preferred origin for event {}", graph.event().public_id);
        QuakeError::InvalidFormat("missing preferred origin".to_string())
    })?;
    let magnitude = graph.preferred_magnitude().ok_or_else(|| {
        tracing::error!("No preferred magnitude for event {}", graph.event().public_id);
        QuakeError::InvalidFormat("missing preferred magnitude".to_string())
    })?;
    Ok((origin, magnitude))
}

/// Right-aligned integer field, blank when the value is missing.
fn field(value: Option<i64>, width: usize) -> String {
    value.map_or_else(|| " ".repeat(width), |v| format!("{v:width$}"))
}

/// Encode the preferred origin and magnitude of `graph` as a CUBE line.
///
/// # Errors
///
/// `InvalidFormat` when the preferred origin, the preferred magnitude or
/// the origin quality block is missing, or when a value overflows its
/// field.
pub fn cube_format(graph: &EventGraph, options: &CubeOptions) -> Result<String, QuakeError> {
    let (origin, magnitude) = preferred(graph)?;
    let quality: &OriginQuality = origin.quality.as_ref().ok_or_else(|| {
        tracing::error!("Origin {} has no quality block", origin.public_id);
        QuakeError::InvalidFormat(format!("origin {} has no quality", origin.public_id))
    })?;

    let mut msg = String::with_capacity(CUBE_LINE_LENGTH);
    msg.push_str("E ");
    msg.push_str(&format!("{:<8}", graph.event().public_id.suffix(8)));
    let network: String = format!("{:<2}", options.network_code).chars().take(2).collect();
    msg.push_str(&network);
    msg.push(options.event_version);

    let time = origin.time.value;
    msg.push_str(&time.format("%Y%m%d%H%M%S").to_string());
    msg.push_str(&format!("{}", time.nanosecond() % 1_000_000_000 / 100_000_000));

    msg.push_str(&format!("{:+07}", (origin.latitude.value * 10000.0) as i64));
    msg.push_str(&format!("{:+08}", (origin.longitude.value * 10000.0) as i64));
    msg.push_str(&format!("{:4}", (origin.depth.value * 10.0) as i64));
    msg.push_str(&format!("{:2}", (magnitude.magnitude.value * 10.0 + 0.5) as i64));

    msg.push_str(&field(quality.used_station_count.map(i64::from), 3));
    msg.push_str(&field(quality.used_phase_count.map(i64::from), 3));
    let dmin = quality
        .minimum_distance
        .map(|d| ((d * CUBE_KM_PER_DEGREE * 10.0) as i64).min(9999));
    msg.push_str(&field(dmin, 4));
    msg.push_str(&field(
        quality.standard_error.map(|rms| (rms * 100.0) as i64),
        4,
    ));

    let xerr = origin
        .uncertainty
        .and_then(|u| u.max_horizontal_uncertainty)
        .unwrap_or(0.0);
    let zerr = origin.depth.uncertainty().unwrap_or(0.0);
    msg.push_str(&format!("{:4}", (xerr * 10.0) as i64));
    msg.push_str(&format!("{:4}", (zerr * 10.0) as i64));
    msg.push_str(&field(quality.azimuthal_gap.map(|g| (g / 3.6) as i64), 2));

    let kind = magnitude.magnitude_type.as_str();
    msg.push(if kind.starts_with("Mw") { 'O' } else { 'B' });
    msg.push_str(&field(
        magnitude.station_count.map(|n| i64::from(n.min(99))),
        2,
    ));
    let merr = magnitude.magnitude.uncertainty().unwrap_or(if kind == "Mw" {
        DEFAULT_MW_UNCERTAINTY
    } else {
        DEFAULT_MAGNITUDE_UNCERTAINTY
    });
    msg.push_str(&format!("{:2}", (merr * 10.0 + 0.5) as i64));
    msg.push('F');

    if msg.len() != CUBE_LINE_LENGTH - 1 {
        tracing::error!(
            "CUBE line for {} has {} columns",
            graph.event().public_id,
            msg.len() + 1
        );
        return Err(QuakeError::InvalidFormat(format!(
            "CUBE line has {} columns instead of {}",
            msg.len() + 1,
            CUBE_LINE_LENGTH
        )));
    }
    let check = menlo_check_char(&msg);
    msg.push(check);
    Ok(msg)
}

/// Human readable digest of the preferred origin and magnitude.
///
/// # Errors
///
/// `InvalidFormat` when the preferred origin or magnitude is missing.
pub fn summary(graph: &EventGraph) -> Result<String, QuakeError> {
    let (origin, magnitude) = preferred(graph)?;
    let event = graph.event();
    let mut msg = format!("Event ID        {}\n", event.public_id);
    if let Some(region) = event.region_name() {
        msg.push_str(&format!("Region          {region}\n"));
    }
    msg.push_str(&format!(
        "Origin Time     {}\n",
        origin.time.value.format("%Y-%m-%d %H:%M:%S")
    ));
    msg.push_str(&format!("Latitude      {:+8.3}\n", origin.latitude.value));
    msg.push_str(&format!("Longitude     {:+8.3}\n", origin.longitude.value));
    msg.push_str(&format!(
        "Depth         {:4} km\n",
        (origin.depth.value + 0.5) as i64
    ));
    msg.push_str(&format!("Magnitude      {:6.2}\n", magnitude.magnitude.value));
    Ok(msg)
}
