//! # Radiation Pattern
//!
//! Far-field P, SV and SH amplitudes of a moment tensor and the ASCII
//! beachball built from them.
//!
//! The tensor is given in local Cartesian coordinates (x north, y east,
//! z down). Angles are in degrees; the projection onto the character grid
//! is azimuthal equidistant with incidence `r * 90`.

use crate::primitives::{BEACHBALL_COLUMNS, BEACHBALL_ROWS};
use crate::Tensor;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Symmetric moment tensor in local Cartesian coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianTensor {
    pub mxx: f64,
    pub myy: f64,
    pub mzz: f64,
    pub mxy: f64,
    pub mxz: f64,
    pub myz: f64,
}

impl From<&Tensor> for CartesianTensor {
    /// `Mxx, Myy, Mzz, Mxy, Mxz, Myz = Mtt, Mpp, Mrr, -Mtp, Mrt, -Mrp`.
    fn from(t: &Tensor) -> Self {
        Self {
            mxx: t.mtt,
            myy: t.mpp,
            mzz: t.mrr,
            mxy: -t.mtp,
            mxz: t.mrt,
            myz: -t.mrp,
        }
    }
}

/// Radiation amplitudes along one ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radiation {
    pub p: f64,
    pub sv: f64,
    pub sh: f64,
}

type Vector = [f64; 3];

fn dot(a: Vector, b: Vector) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// P, SV and SH amplitude for a ray leaving at `azimuth`/`incidence`.
#[must_use]
pub fn radiation_pattern(m: &CartesianTensor, azimuth: f64, incidence: f64) -> Radiation {
    let a = azimuth * PI / 180.0;
    let i = incidence * PI / 180.0;
    let (sin_a, cos_a) = (a.sin(), a.cos());
    let (sin_i, cos_i) = (i.sin(), i.cos());

    let gamma = [sin_i * cos_a, sin_i * sin_a, cos_i];
    let theta = [cos_i * cos_a, cos_i * sin_a, -sin_i];
    let phi = [-sin_a, cos_a, 0.0];

    let m_gamma = [
        m.mxx * gamma[0] + m.mxy * gamma[1] + m.mxz * gamma[2],
        m.mxy * gamma[0] + m.myy * gamma[1] + m.myz * gamma[2],
        m.mxz * gamma[0] + m.myz * gamma[1] + m.mzz * gamma[2],
    ];

    Radiation {
        p: dot(gamma, m_gamma),
        sv: dot(theta, m_gamma),
        sh: dot(phi, m_gamma),
    }
}

/// Character of one beachball cell: `' '` outside the focal sphere, `'#'`
/// for compression, `'-'` otherwise.
fn cell(m: &CartesianTensor, x: f64, y: f64) -> char {
    let r = (x * x + y * y).sqrt();
    if r > 1.0 {
        return ' ';
    }
    let azimuth = x.atan2(y) * 180.0 / PI;
    let incidence = r * 90.0;
    if radiation_pattern(m, azimuth, incidence).p > 0.0 {
        '#'
    } else {
        '-'
    }
}

/// Render `ny` newline-terminated rows of `nx` characters.
#[must_use]
pub fn render_beachball(m: &CartesianTensor, nx: usize, ny: usize) -> String {
    let (fx, fy) = (nx as f64, ny as f64);
    let mut out = String::with_capacity((nx + 1) * ny);
    for iy in 0..ny {
        let y = 2.0 * ((fy - iy as f64 - 0.5) - fy / 2.0) / fy;
        for ix in 0..nx {
            let x = 2.0 * ((ix as f64 + 0.5) - fx / 2.0) / fx;
            out.push(cell(m, x, y));
        }
        out.push('\n');
    }
    out
}

/// The standard 33 x 19 beachball.
#[must_use]
pub fn beachball(m: &CartesianTensor) -> String {
    render_beachball(m, BEACHBALL_COLUMNS, BEACHBALL_ROWS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn strike_slip() -> CartesianTensor {
        CartesianTensor {
            mxx: 0.0,
            myy: 0.0,
            mzz: 0.0,
            mxy: 1.0,
            mxz: 0.0,
            myz: 0.0,
        }
    }

    #[test]
    fn isotropic_source_has_no_shear_waves() {
        let m = CartesianTensor {
            mxx: 1.0,
            myy: 1.0,
            mzz: 1.0,
            mxy: 0.0,
            mxz: 0.0,
            myz: 0.0,
        };
        for (az, inc) in [(0.0, 10.0), (123.0, 45.0), (300.0, 89.0)] {
            let r = radiation_pattern(&m, az, inc);
            assert!((r.p - 1.0).abs() < EPS);
            assert!(r.sv.abs() < EPS);
            assert!(r.sh.abs() < EPS);
        }
    }

    #[test]
    fn strike_slip_lobes() {
        let m = strike_slip();
        // Horizontal ray at 45 degrees: P = sin(2 * az).
        let r = radiation_pattern(&m, 45.0, 90.0);
        assert!((r.p - 1.0).abs() < EPS);
        let r = radiation_pattern(&m, 135.0, 90.0);
        assert!((r.p + 1.0).abs() < EPS);
        // Along the nodal planes only SH remains.
        let r = radiation_pattern(&m, 0.0, 90.0);
        assert!(r.p.abs() < EPS);
        assert!((r.sh - 1.0).abs() < EPS);
    }

    #[test]
    fn grid_has_requested_shape() {
        let text = render_beachball(&strike_slip(), 33, 19);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 19);
        assert!(rows.iter().all(|r| r.chars().count() == 33));
        assert!(text.ends_with('\n'));
        // Corners are outside the focal sphere.
        assert!(rows[0].starts_with(' ') && rows[0].ends_with(' '));
    }

    #[test]
    fn cartesian_remap() {
        let t = Tensor {
            mrr: 1.0,
            mtt: 2.0,
            mpp: 3.0,
            mrt: 4.0,
            mrp: 5.0,
            mtp: 6.0,
        };
        let c = CartesianTensor::from(&t);
        assert_eq!((c.mxx, c.myy, c.mzz), (2.0, 3.0, 1.0));
        assert_eq!((c.mxy, c.mxz, c.myz), (-6.0, 4.0, -5.0));
    }
}
