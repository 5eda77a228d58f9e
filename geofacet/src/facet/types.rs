use crate::geo::{DistanceUnit, GeoDistance, GeoPoint};
use crate::script::ScriptParams;
use serde::{Deserialize, Serialize};

/// A `geo_distance` facet as it arrives in a search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoDistanceFacetRequest {
    pub name: String,
    /// Geo point field; read as `<field>.lat` / `<field>.lon` unless overridden.
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon_field: Option<String>,
    pub origin: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<DistanceUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_type: Option<GeoDistance>,
    pub ranges: Vec<RangeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "ScriptParams::is_empty")]
    pub params: ScriptParams,
}

/// One requested band; a missing bound is open-ended.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
}

impl RangeSpec {
    pub fn new(from: f64, to: f64) -> Self {
        Self {
            key: None,
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn lower(&self) -> f64 {
        self.from.unwrap_or(f64::NEG_INFINITY)
    }

    pub fn upper(&self) -> f64 {
        self.to.unwrap_or(f64::INFINITY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoDistanceFacetResult {
    pub name: String,
    #[serde(rename = "_type")]
    pub facet_type: String,
    pub unit: DistanceUnit,
    pub entries: Vec<EntryResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub from: Option<f64>,
    pub to: Option<f64>,
    pub count: u64,
    #[serde(with = "super::table::float_total")]
    pub total: f64,
    #[serde(with = "super::table::float_total")]
    pub mean: f64,
}
