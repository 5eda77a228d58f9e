//! Geographic primitives: points, distance units and distance formulas.

mod distance;
mod unit;

pub use distance::GeoDistance;
pub use unit::{DistanceUnit, EARTH_MEAN_RADIUS_METERS};

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// A point on the Earth's surface, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reject coordinates outside `[-90, 90]` x `[-180, 180]`.
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::InvalidRequest(format!(
                "latitude {} must be between -90 and 90",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(Error::InvalidRequest(format!(
                "longitude {} must be between -180 and 180",
                self.lon
            )));
        }
        Ok(())
    }

    /// Parse the `"lat,lon"` string form.
    pub fn parse(s: &str) -> Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidRequest(format!("expected \"lat,lon\", got {:?}", s)))?;
        let lat = lat
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidRequest(format!("invalid latitude in {:?}", s)))?;
        let lon = lon
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidRequest(format!("invalid longitude in {:?}", s)))?;
        Ok(Self { lat, lon })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GeoPointRepr {
    Object { lat: f64, lon: f64 },
    /// GeoJSON order: `[lon, lat]`
    Array([f64; 2]),
    Text(String),
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match GeoPointRepr::deserialize(deserializer)? {
            GeoPointRepr::Object { lat, lon } => Ok(GeoPoint { lat, lon }),
            GeoPointRepr::Array([lon, lat]) => Ok(GeoPoint { lat, lon }),
            GeoPointRepr::Text(s) => GeoPoint::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}
