//! Geo-distance range facets.
//!
//! Each matched document's distance from an origin point is bucketed into
//! caller-defined `[from, to)` ranges, counting documents and summing a
//! per-document weight. A collector runs once per shard; shard tables are
//! merged by index into the final facet result.

pub mod config;
pub mod error;
pub mod facet;
pub mod field;
pub mod geo;
pub mod script;
pub mod search;

pub use config::{Config, FacetConfig, ObservabilityConfig};
pub use error::{Error, Result};
pub use facet::{
    merge_tables, GeoDistanceFacet, GeoDistanceFacetCollector, GeoDistanceFacetRequest,
    GeoDistanceFacetResult, RangeBucketTable, RangeEntry, RangeSpec, ValueSpec,
};
pub use field::{FieldDataReader, GeoPointFieldNames, NumericFieldData, SegmentContext};
pub use geo::{DistanceUnit, GeoDistance, GeoPoint};
pub use script::{ScriptEngine, ScriptRegistry};
pub use search::GeoDistanceCollector;
