//! The geo-distance range facet: request types, the prepared facet, the
//! per-shard collector and the shard merge.

mod collector;
mod table;
mod types;
mod value;

pub use collector::{CollectStats, CollectorState, GeoDistanceFacetCollector};
pub use table::{merge_tables, RangeBucketTable, RangeEntry};
pub use types::{EntryResult, GeoDistanceFacetRequest, GeoDistanceFacetResult, RangeSpec};
pub use value::{ValueSource, ValueSpec};

use crate::config::FacetConfig;
use crate::error::{Error, Result};
use crate::field::{DocId, FieldDataReader, GeoPointFieldNames, SegmentContext, SegmentOrdinal};
use crate::geo::{DistanceUnit, GeoDistance, GeoPoint};
use crate::script::{CompiledScript, ScriptParams, ScriptRegistry};
use std::sync::Arc;
use tracing::{debug, warn};

pub const FACET_TYPE: &str = "geo_distance";

/// A validated facet configuration, shared by every shard of one request.
#[derive(Debug, Clone)]
pub struct GeoDistanceFacet {
    name: String,
    fields: GeoPointFieldNames,
    origin: GeoPoint,
    unit: DistanceUnit,
    distance: GeoDistance,
    ranges: Vec<RangeSpec>,
    value: ValueSpec,
}

impl GeoDistanceFacet {
    pub fn new(name: impl Into<String>, fields: GeoPointFieldNames, origin: GeoPoint) -> Self {
        Self {
            name: name.into(),
            fields,
            origin,
            unit: DistanceUnit::default(),
            distance: GeoDistance::default(),
            ranges: Vec::new(),
            value: ValueSpec::Constant,
        }
    }

    pub fn with_unit(mut self, unit: DistanceUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_distance(mut self, distance: GeoDistance) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_range(mut self, range: RangeSpec) -> Self {
        self.ranges.push(range);
        self
    }

    pub fn with_value_field(mut self, field: impl Into<String>) -> Self {
        self.value = ValueSpec::Field(field.into());
        self
    }

    pub fn with_script(mut self, script: Arc<dyn CompiledScript>, params: ScriptParams) -> Self {
        self.value = ValueSpec::Script {
            script,
            params: Arc::new(params),
        };
        self
    }

    /// Validate `request`, fill in defaults and compile its script, if any.
    pub fn from_request(
        request: &GeoDistanceFacetRequest,
        defaults: &FacetConfig,
        scripts: &ScriptRegistry,
    ) -> Result<Self> {
        request.origin.validate()?;
        if request.ranges.is_empty() {
            return Err(Error::InvalidRequest(format!(
                "facet '{}' needs at least one range",
                request.name
            )));
        }
        for (i, range) in request.ranges.iter().enumerate() {
            if range.lower().is_nan() || range.upper().is_nan() {
                return Err(Error::InvalidRequest(format!(
                    "facet '{}': range {} has a NaN bound",
                    request.name, i
                )));
            }
        }

        let fields = match (&request.lat_field, &request.lon_field) {
            (None, None) => GeoPointFieldNames::for_field(&request.field),
            (Some(lat), Some(lon)) => GeoPointFieldNames::new(lat.clone(), lon.clone()),
            _ => {
                return Err(Error::InvalidRequest(format!(
                    "facet '{}': lat_field and lon_field must be given together",
                    request.name
                )))
            }
        };

        let value = match (&request.value_field, &request.value_script) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidRequest(format!(
                    "facet '{}': value_field and value_script are mutually exclusive",
                    request.name
                )))
            }
            (Some(field), None) => ValueSpec::Field(field.clone()),
            (None, Some(source)) => {
                let lang = request
                    .lang
                    .as_deref()
                    .unwrap_or(&defaults.default_script_lang);
                ValueSpec::Script {
                    script: scripts.compile(lang, source)?,
                    params: Arc::new(request.params.clone()),
                }
            }
            (None, None) => {
                if !request.params.is_empty() {
                    warn!(facet = %request.name, "params given without value_script; ignored");
                }
                ValueSpec::Constant
            }
        };

        let facet = Self {
            name: request.name.clone(),
            fields,
            origin: request.origin,
            unit: request.unit.unwrap_or(defaults.default_unit),
            distance: request.distance_type.unwrap_or(defaults.default_distance_type),
            ranges: request.ranges.clone(),
            value,
        };
        debug!(
            facet = %facet.name,
            unit = %facet.unit,
            distance = %facet.distance,
            ranges = facet.ranges.len(),
            value = facet.value.kind(),
            "prepared geo distance facet"
        );
        Ok(facet)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &GeoPointFieldNames {
        &self.fields
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub fn unit(&self) -> DistanceUnit {
        self.unit
    }

    pub fn distance(&self) -> GeoDistance {
        self.distance
    }

    pub fn ranges(&self) -> &[RangeSpec] {
        &self.ranges
    }

    pub fn value(&self) -> &ValueSpec {
        &self.value
    }

    /// Zeroed table in range order.
    pub fn empty_table(&self) -> RangeBucketTable {
        RangeBucketTable::new(self.ranges.iter().map(|r| (r.lower(), r.upper())))
    }

    /// A fresh collector for one shard execution.
    pub fn collector(&self) -> GeoDistanceFacetCollector {
        GeoDistanceFacetCollector::new(
            self.name.clone(),
            self.fields.clone(),
            self.origin,
            self.unit,
            self.distance,
            self.value.source(),
            self.empty_table(),
        )
    }

    /// Run one collector over every document of `segments`, in order.
    pub fn collect_shard<R: FieldDataReader>(&self, segments: &[R]) -> Result<RangeBucketTable> {
        let mut collector = self.collector();
        let mut doc_base: DocId = 0;
        for (ord, segment) in segments.iter().enumerate() {
            collector.bind_segment(&SegmentContext::new(ord as SegmentOrdinal, doc_base, segment))?;
            for doc in 0..segment.max_doc() {
                collector.collect(doc)?;
            }
            doc_base += segment.max_doc();
        }
        collector.finish()?;
        collector.into_table()
    }

    /// Merge shard tables; with no shards the result is all zeros.
    pub fn reduce<I>(&self, shards: I) -> Result<RangeBucketTable>
    where
        I: IntoIterator<Item = RangeBucketTable>,
    {
        let mut merged = self.empty_table();
        for shard in shards {
            merged.merge_from(&shard)?;
        }
        Ok(merged)
    }

    pub fn to_result(&self, table: &RangeBucketTable) -> Result<GeoDistanceFacetResult> {
        if !table.same_shape(&self.empty_table()) {
            return Err(Error::ShapeMismatch(format!(
                "table does not match the ranges of facet '{}'",
                self.name
            )));
        }
        let entries = table
            .entries()
            .iter()
            .zip(self.ranges.iter())
            .map(|(entry, range)| EntryResult {
                key: range.key.clone(),
                from: entry.from.is_finite().then_some(entry.from),
                to: entry.to.is_finite().then_some(entry.to),
                count: entry.count,
                total: entry.total,
                mean: entry.mean(),
            })
            .collect();
        Ok(GeoDistanceFacetResult {
            name: self.name.clone(),
            facet_type: FACET_TYPE.to_string(),
            unit: self.unit,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::MemoryShard;
    use serde_json::json;

    fn request(value: serde_json::Value) -> GeoDistanceFacetRequest {
        serde_json::from_value(value).unwrap()
    }

    fn base_request() -> serde_json::Value {
        json!({
            "name": "nearby",
            "field": "location",
            "origin": {"lat": 0.0, "lon": 0.0},
            "ranges": [{"to": 100}, {"from": 100, "to": 500}, {"from": 500}]
        })
    }

    fn prepare(value: serde_json::Value) -> Result<GeoDistanceFacet> {
        GeoDistanceFacet::from_request(
            &request(value),
            &FacetConfig::default(),
            &ScriptRegistry::default(),
        )
    }

    #[test]
    fn test_defaults_applied() {
        let facet = prepare(base_request()).unwrap();
        assert_eq!(facet.unit(), DistanceUnit::Kilometers);
        assert_eq!(facet.distance(), GeoDistance::Arc);
        assert_eq!(facet.fields(), &GeoPointFieldNames::for_field("location"));
        assert!(matches!(facet.value(), ValueSpec::Constant));
        assert_eq!(facet.empty_table().len(), 3);
    }

    #[test]
    fn test_rejects_empty_ranges() {
        let mut req = base_request();
        req["ranges"] = json!([]);
        assert!(matches!(prepare(req), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_invalid_origin() {
        let mut req = base_request();
        req["origin"] = json!({"lat": 95.0, "lon": 0.0});
        assert!(matches!(prepare(req), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_field_and_script() {
        let mut req = base_request();
        req["value_field"] = json!("price");
        req["value_script"] = json!("doc.price");
        assert!(matches!(prepare(req), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_half_field_override() {
        let mut req = base_request();
        req["lat_field"] = json!("y");
        assert!(matches!(prepare(req), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_unknown_script_lang() {
        let mut req = base_request();
        req["value_script"] = json!("doc.price");
        req["lang"] = json!("mvel");
        assert!(matches!(prepare(req), Err(Error::Script(_))));
    }

    #[test]
    fn test_scripted_facet_over_memory_shard() {
        let mut req = base_request();
        req["value_script"] = json!("doc.price * factor");
        req["params"] = json!({"factor": 10});
        let facet = prepare(req).unwrap();

        let shard = MemoryShard::from_json(&json!({
            "segments": [
                {"docs": [
                    {"location": {"lat": 0.0, "lon": 0.1}, "price": 1.0},
                    {"location": {"lat": 0.0, "lon": 2.0}, "price": 2.0}
                ]},
                {"docs": [
                    {"location": {"lat": 0.0, "lon": 9.0}},
                    {"price": 5.0}
                ]}
            ]
        }))
        .unwrap();

        let table = facet.collect_shard(&shard.segments).unwrap();
        let result = facet.to_result(&table).unwrap();
        assert_eq!(result.facet_type, "geo_distance");
        assert_eq!(result.entries[0].count, 1);
        assert_eq!(result.entries[0].total, 10.0);
        assert_eq!(result.entries[0].from, None);
        assert_eq!(result.entries[1].count, 1);
        assert_eq!(result.entries[1].total, 20.0);
        assert_eq!(result.entries[2].count, 1);
        assert_eq!(result.entries[2].total, 0.0);
        assert_eq!(result.entries[2].to, None);
    }

    #[test]
    fn test_reduce_zero_shards() {
        let facet = prepare(base_request()).unwrap();
        let merged = facet.reduce(Vec::new()).unwrap();
        assert!(merged.entries().iter().all(|e| e.count == 0));
    }

    #[test]
    fn test_reduce_rejects_foreign_table() {
        let facet = prepare(base_request()).unwrap();
        let foreign = RangeBucketTable::new([(0.0, 1.0)]);
        assert!(matches!(facet.reduce([foreign]), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn test_result_keys_and_mean() {
        let facet = GeoDistanceFacet::new(
            "keyed",
            GeoPointFieldNames::new("lat", "lon"),
            GeoPoint::new(0.0, 0.0),
        )
        .with_unit(DistanceUnit::Miles)
        .with_range(RangeSpec::new(0.0, 10.0).with_key("close"));

        let mut table = facet.empty_table();
        table.record_sample(1.0, 3.0);
        table.record_sample(2.0, 5.0);
        let result = facet.to_result(&table).unwrap();
        assert_eq!(result.unit, DistanceUnit::Miles);
        assert_eq!(result.entries[0].key.as_deref(), Some("close"));
        assert_eq!(result.entries[0].mean, 4.0);
    }
}
