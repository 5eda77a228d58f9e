//! Segment-scoped access to per-document numeric field data.
//!
//! The column store owns the data; this module only fixes the contract the
//! facet collector reads through. A geo point is two independent numeric
//! fields (latitude and longitude) whose multi-valued sequences are parallel.

mod memory;

pub use memory::{MemoryColumn, MemorySegment, MemoryShard, SegmentDocs, ShardDocs, ShardSet};

use crate::error::Result;

pub type DocId = u32;
pub type SegmentOrdinal = u32;

/// Per-segment reader over one numeric field.
pub trait NumericFieldData: Send + Sync {
    fn has_value(&self, doc: DocId) -> bool;

    /// Fixed for a field/segment pair.
    fn is_multi_valued(&self) -> bool;

    /// First value of `doc`. Only meaningful when `has_value(doc)`.
    fn value(&self, doc: DocId) -> f64;

    /// Replace the contents of `out` with every value of `doc`, in storage order.
    fn values(&self, doc: DocId, out: &mut Vec<f64>);
}

/// A segment as seen by the facet: a source of named numeric fields.
pub trait FieldDataReader {
    /// `Ok(None)` when the segment carries no data for `name`.
    fn numeric_field(&self, name: &str) -> Result<Option<Box<dyn NumericFieldData>>>;

    fn max_doc(&self) -> DocId;
}

/// The segment currently being scanned, with its doc id offset in the shard.
#[derive(Clone, Copy)]
pub struct SegmentContext<'r> {
    pub segment_ord: SegmentOrdinal,
    pub doc_base: DocId,
    pub reader: &'r dyn FieldDataReader,
}

impl<'r> SegmentContext<'r> {
    pub fn new(segment_ord: SegmentOrdinal, doc_base: DocId, reader: &'r dyn FieldDataReader) -> Self {
        Self {
            segment_ord,
            doc_base,
            reader,
        }
    }
}

/// Names of the latitude and longitude fields backing one geo point field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoPointFieldNames {
    pub lat: String,
    pub lon: String,
}

impl GeoPointFieldNames {
    /// `location` is stored as `location.lat` and `location.lon`.
    pub fn for_field(field: &str) -> Self {
        Self {
            lat: format!("{}.lat", field),
            lon: format!("{}.lon", field),
        }
    }

    pub fn new(lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self {
            lat: lat.into(),
            lon: lon.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_from_geo_field() {
        let names = GeoPointFieldNames::for_field("pin.location");
        assert_eq!(names.lat, "pin.location.lat");
        assert_eq!(names.lon, "pin.location.lon");
    }
}
