//! Running geo-distance facets over a tantivy index.
//!
//! Geo fields are read from `f64` fast fields; `FieldDataReader` is
//! implemented for `SegmentReader` so both drivers share the facet collector.

mod collector;
mod segment;

pub use collector::{GeoDistanceCollector, GeoDistanceSegmentCollector};
pub use segment::ColumnFieldData;

use crate::error::Result;
use crate::facet::{GeoDistanceFacet, RangeBucketTable};
use crate::field::{DocId, SegmentContext};
use std::sync::Arc;
use tantivy::query::{EnableScoring, Query};
use tantivy::{DocSet, Searcher, TERMINATED};
use tracing::debug;

/// Run one facet collector over every live document of `searcher` that
/// matches `query`, scanning segments in order.
pub fn collect_shard(
    searcher: &Searcher,
    query: &dyn Query,
    facet: &GeoDistanceFacet,
) -> Result<RangeBucketTable> {
    let weight = query.weight(EnableScoring::disabled_from_searcher(searcher))?;
    let mut collector = facet.collector();
    let mut doc_base: DocId = 0;

    for (ord, segment_reader) in searcher.segment_readers().iter().enumerate() {
        collector.bind_segment(&SegmentContext::new(ord as u32, doc_base, segment_reader))?;
        let alive_bitset = segment_reader.alive_bitset();

        let mut scorer = weight.scorer(segment_reader, 1.0)?;
        let mut doc = scorer.doc();
        while doc != TERMINATED {
            if alive_bitset.map_or(true, |bitset| bitset.is_alive(doc)) {
                collector.collect(doc)?;
            }
            doc = scorer.advance();
        }
        doc_base += segment_reader.max_doc();
    }

    collector.finish()?;
    debug!(facet = facet.name(), stats = ?collector.stats(), "collected shard");
    collector.into_table()
}

/// Same as [`collect_shard`] through tantivy's collector machinery.
pub fn search_facet(
    searcher: &Searcher,
    query: &dyn Query,
    facet: Arc<GeoDistanceFacet>,
) -> Result<RangeBucketTable> {
    searcher.search(query, &GeoDistanceCollector::new(facet))?
}
