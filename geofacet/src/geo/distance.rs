//! Distance formulas between two points on the mean Earth sphere.
//!
//! Inputs are degrees and are not range-checked here; callers that need
//! validation go through [`GeoPoint::validate`](super::GeoPoint::validate).

use super::DistanceUnit;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Distance algorithm, fixed for the lifetime of one facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeoDistance {
    /// Great-circle distance using the haversine formula.
    #[default]
    Arc,
    /// Equirectangular approximation, accurate only over short distances.
    Plane,
    /// Haversine with a polynomial `asin`, absolute angular error below 1e-7 rad.
    SloppyArc,
}

impl GeoDistance {
    /// Distance between `(lat1, lon1)` and `(lat2, lon2)` in `unit`.
    #[inline]
    pub fn calculate(self, lat1: f64, lon1: f64, lat2: f64, lon2: f64, unit: DistanceUnit) -> f64 {
        match self {
            GeoDistance::Arc => arc_radians(lat1, lon1, lat2, lon2) * unit.earth_radius(),
            GeoDistance::Plane => plane_degrees(lat1, lon1, lat2, lon2) * unit.distance_per_degree(),
            GeoDistance::SloppyArc => {
                sloppy_arc_radians(lat1, lon1, lat2, lon2) * unit.earth_radius()
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GeoDistance::Arc => "arc",
            GeoDistance::Plane => "plane",
            GeoDistance::SloppyArc => "sloppy_arc",
        }
    }
}

#[inline]
fn haversin_term(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let half_dlat = (lat2 - lat1).to_radians() / 2.0;
    let half_dlon = (lon2 - lon1).to_radians() / 2.0;

    let h = half_dlat.sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * half_dlon.sin().powi(2);
    // rounding can push h marginally outside [0, 1]
    h.clamp(0.0, 1.0)
}

#[inline]
fn arc_radians(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    2.0 * haversin_term(lat1, lon1, lat2, lon2).sqrt().asin()
}

#[inline]
fn sloppy_arc_radians(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    2.0 * fast_asin(haversin_term(lat1, lon1, lat2, lon2).sqrt())
}

/// `asin` for `x` in `[0, 1]`: odd Taylor series below 0.1 (exact at zero),
/// Abramowitz & Stegun 4.4.46 above it, |error| <= 2e-8.
#[inline]
fn fast_asin(x: f64) -> f64 {
    if x < 0.1 {
        let x2 = x * x;
        return x * (1.0 + x2 * (1.0 / 6.0 + x2 * (3.0 / 40.0 + x2 * (5.0 / 112.0))));
    }
    const A: [f64; 8] = [
        1.570_796_305_0,
        -0.214_598_801_6,
        0.088_978_987_4,
        -0.050_174_304_6,
        0.030_891_881_0,
        -0.017_088_125_6,
        0.006_670_090_1,
        -0.001_262_491_1,
    ];
    let poly = A.iter().rev().fold(0.0, |acc, &a| acc * x + a);
    std::f64::consts::FRAC_PI_2 - (1.0 - x).sqrt() * poly
}

#[inline]
fn plane_degrees(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let mut dlon = lon2 - lon1;
    if dlon > 180.0 {
        dlon -= 360.0;
    } else if dlon < -180.0 {
        dlon += 360.0;
    }
    let mean_lat = ((lat1 + lat2) / 2.0).to_radians();
    let px = dlon * mean_lat.cos();
    let py = lat2 - lat1;
    (px * px + py * py).sqrt()
}

impl FromStr for GeoDistance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "arc" => Ok(GeoDistance::Arc),
            "plane" | "planar" => Ok(GeoDistance::Plane),
            "sloppy_arc" | "sloppy" => Ok(GeoDistance::SloppyArc),
            other => Err(Error::InvalidRequest(format!("unknown distance type: {}", other))),
        }
    }
}

impl fmt::Display for GeoDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for GeoDistance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for GeoDistance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
