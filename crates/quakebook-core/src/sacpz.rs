//! # SAC Pole-Zero Export
//!
//! Renders channel responses as SAC pole-zero files. The ground-motion unit
//! of the sensor decides how many zeros at the origin are added so that the
//! response converts to displacement.

use crate::{QuakeError, WaveformStreamId};
use serde::{Deserialize, Serialize};

/// Physical unit a sensor responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroundMotionUnit {
    Displacement,
    Velocity,
    Acceleration,
}

impl GroundMotionUnit {
    /// Parse `M`, `M/S` or `M/S**2` (case-insensitive).
    ///
    /// # Errors
    ///
    /// `UnsupportedUnit` for any other unit string.
    pub fn parse(unit: &str) -> Result<Self, QuakeError> {
        match unit.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Self::Displacement),
            "M/S" => Ok(Self::Velocity),
            "M/S**2" => Ok(Self::Acceleration),
            _ => Err(QuakeError::UnsupportedUnit(unit.to_string())),
        }
    }

    /// Zeros at the origin needed to reach displacement.
    #[must_use]
    pub const fn extra_zeros(self) -> usize {
        match self {
            Self::Displacement => 0,
            Self::Velocity => 1,
            Self::Acceleration => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    #[must_use]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

/// Poles and zeros of one channel with its overall sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelResponse {
    pub stream: WaveformStreamId,
    /// Overall sensitivity in counts per `gain_unit`.
    pub gain: f64,
    pub gain_unit: String,
    /// Normalization factor (A0) of the analogue stage.
    pub normalization: f64,
    #[serde(default)]
    pub poles: Vec<Complex>,
    #[serde(default)]
    pub zeros: Vec<Complex>,
}

/// C-style `%+.6e`: explicit sign and an exponent of at least two digits.
fn sci(value: f64) -> String {
    let raw = format!("{:.6e}", value.abs());
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if value.is_sign_negative() { '-' } else { '+' };
    format!("{sign}{mantissa}e{exponent:+03}")
}

/// SAC PZ text of one channel.
///
/// # Errors
///
/// `UnsupportedUnit` if the gain unit is not a ground-motion unit.
pub fn to_sac_pz(response: &ChannelResponse) -> Result<String, QuakeError> {
    let unit = GroundMotionUnit::parse(&response.gain_unit)?;
    let stream = &response.stream;

    let mut txt = String::new();
    txt.push_str(&format!("* NETWORK   : {}\n", stream.network_code));
    txt.push_str(&format!("* STATION   : {}\n", stream.station_code));
    txt.push_str(&format!("* LOCATION  : {}\n", stream.location_code));
    txt.push_str(&format!("* CHANNEL   : {}\n", stream.channel_code));
    txt.push_str(&format!("* INPUT UNIT: {}\n", response.gain_unit));

    // Added zeros sit at the origin and are implied by the count.
    txt.push_str(&format!(
        "ZEROS   {}\n",
        response.zeros.len() + unit.extra_zeros()
    ));
    for zero in &response.zeros {
        txt.push_str(&format!("        {} {}\n", sci(zero.re), sci(zero.im)));
    }
    txt.push_str(&format!("POLES   {}\n", response.poles.len()));
    for pole in &response.poles {
        txt.push_str(&format!("        {} {}\n", sci(pole.re), sci(pole.im)));
    }
    txt.push_str(&format!(
        "CONSTANT        {}\n",
        sci(response.gain * response.normalization)
    ));
    Ok(txt)
}

/// Outcome of exporting one channel.
#[derive(Debug)]
pub struct ChannelExport {
    pub stream: WaveformStreamId,
    pub result: Result<String, QuakeError>,
}

impl ChannelExport {
    /// File name `NET.STA.LOC.CHA.sacpz`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.sacpz", self.stream.dotted())
    }
}

/// Render every response. A failing channel does not stop the others.
pub fn export_responses(responses: &[ChannelResponse]) -> Vec<ChannelExport> {
    responses
        .iter()
        .map(|response| {
            let result = to_sac_pz(response);
            if let Err(e) = &result {
                tracing::warn!("Skipping {}: {}", response.stream.dotted(), e);
            }
            ChannelExport {
                stream: response.stream.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sts2(unit: &str) -> ChannelResponse {
        ChannelResponse {
            stream: WaveformStreamId::new("GE", "APE", "", "BHZ"),
            gain: 6.0e8,
            gain_unit: unit.to_string(),
            normalization: 6.0077e7,
            poles: vec![
                Complex::new(-0.037004, 0.037016),
                Complex::new(-0.037004, -0.037016),
            ],
            zeros: vec![Complex::new(0.0, 0.0), Complex::new(0.0, 0.0)],
        }
    }

    #[test]
    fn c_style_exponent() {
        assert_eq!(sci(-0.037004), "-3.700400e-02");
        assert_eq!(sci(0.0), "+0.000000e+00");
        assert_eq!(sci(3.60462e16), "+3.604620e+16");
        assert_eq!(sci(1.5e123), "+1.500000e+123");
    }

    #[test]
    fn unit_sets_extra_zeros() {
        assert_eq!(GroundMotionUnit::parse("m/s").map(|u| u.extra_zeros()).ok(), Some(1));
        assert_eq!(GroundMotionUnit::parse("M").map(|u| u.extra_zeros()).ok(), Some(0));
        assert_eq!(
            GroundMotionUnit::parse("M/S**2").map(|u| u.extra_zeros()).ok(),
            Some(2)
        );
        assert!(matches!(
            GroundMotionUnit::parse("PA"),
            Err(QuakeError::UnsupportedUnit(_))
        ));
    }

    #[test]
    fn velocity_channel_layout() {
        let text = to_sac_pz(&sts2("M/S")).expect("sacpz");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "* NETWORK   : GE");
        assert_eq!(lines[5], "ZEROS   3");
        assert_eq!(lines[6], "        +0.000000e+00 +0.000000e+00");
        assert_eq!(lines[8], "POLES   2");
        assert_eq!(lines[9], "        -3.700400e-02 +3.701600e-02");
        assert_eq!(lines[11], "CONSTANT        +3.604620e+16");
    }

    #[test]
    fn unsupported_unit_only_fails_that_channel() {
        let exports = export_responses(&[sts2("M/S"), sts2("COUNTS"), sts2("M/S**2")]);
        assert_eq!(exports.len(), 3);
        assert!(exports[0].result.is_ok());
        assert!(matches!(
            exports[1].result,
            Err(QuakeError::UnsupportedUnit(_))
        ));
        assert!(exports[2].result.as_ref().is_ok_and(|t| t.contains("ZEROS   4")));
        assert_eq!(exports[0].file_name(), "GE.APE..BHZ.sacpz");
    }
}
