use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// IUGG mean Earth radius
pub const EARTH_MEAN_RADIUS_METERS: f64 = 6_371_008.7714;

/// Unit in which distances and bucket bounds of one facet are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceUnit {
    #[default]
    Kilometers,
    Miles,
    Meters,
    NauticalMiles,
    Yards,
    Feet,
}

impl DistanceUnit {
    pub fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Kilometers => 1000.0,
            DistanceUnit::Miles => 1609.344,
            DistanceUnit::Meters => 1.0,
            DistanceUnit::NauticalMiles => 1852.0,
            DistanceUnit::Yards => 0.9144,
            DistanceUnit::Feet => 0.3048,
        }
    }

    pub fn from_meters(self, meters: f64) -> f64 {
        meters / self.meters_per_unit()
    }

    pub fn to_meters(self, value: f64) -> f64 {
        value * self.meters_per_unit()
    }

    /// Earth mean radius in this unit.
    pub fn earth_radius(self) -> f64 {
        self.from_meters(EARTH_MEAN_RADIUS_METERS)
    }

    /// Length of one degree of arc on the mean sphere, in this unit.
    pub fn distance_per_degree(self) -> f64 {
        self.earth_radius() * std::f64::consts::PI / 180.0
    }

    pub fn short_name(self) -> &'static str {
        match self {
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
            DistanceUnit::Meters => "m",
            DistanceUnit::NauticalMiles => "nmi",
            DistanceUnit::Yards => "yd",
            DistanceUnit::Feet => "ft",
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => {
                Ok(DistanceUnit::Kilometers)
            }
            "mi" | "mile" | "miles" => Ok(DistanceUnit::Miles),
            "m" | "meter" | "meters" | "metre" | "metres" => Ok(DistanceUnit::Meters),
            "nmi" | "nm" | "nauticalmile" | "nauticalmiles" | "nautical_miles" => {
                Ok(DistanceUnit::NauticalMiles)
            }
            "yd" | "yard" | "yards" => Ok(DistanceUnit::Yards),
            "ft" | "foot" | "feet" => Ok(DistanceUnit::Feet),
            other => Err(Error::InvalidRequest(format!("unknown distance unit: {}", other))),
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl Serialize for DistanceUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_name())
    }
}

impl<'de> Deserialize<'de> for DistanceUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit_names() {
        assert_eq!("km".parse::<DistanceUnit>().unwrap(), DistanceUnit::Kilometers);
        assert_eq!("Miles".parse::<DistanceUnit>().unwrap(), DistanceUnit::Miles);
        assert_eq!("nmi".parse::<DistanceUnit>().unwrap(), DistanceUnit::NauticalMiles);
        assert_eq!(" ft ".parse::<DistanceUnit>().unwrap(), DistanceUnit::Feet);
        assert!("parsecs".parse::<DistanceUnit>().is_err());
    }

    #[test]
    fn test_conversions() {
        assert!((DistanceUnit::Kilometers.from_meters(2500.0) - 2.5).abs() < 1e-12);
        assert!((DistanceUnit::Miles.to_meters(1.0) - 1609.344).abs() < 1e-9);
        assert!((DistanceUnit::Kilometers.earth_radius() - 6371.0087714).abs() < 1e-9);
    }

    #[test]
    fn test_serde_uses_short_name() {
        let json = serde_json::to_string(&DistanceUnit::Miles).unwrap();
        assert_eq!(json, "\"mi\"");
        let unit: DistanceUnit = serde_json::from_str("\"kilometers\"").unwrap();
        assert_eq!(unit, DistanceUnit::Kilometers);
    }
}
