use crate::error::{Error, Result};
use crate::facet::{GeoDistanceFacet, GeoDistanceFacetCollector, RangeBucketTable};
use crate::field::{DocId, SegmentContext};
use std::sync::Arc;
use tantivy::collector::{Collector, SegmentCollector};
use tantivy::{Score, SegmentOrdinal, SegmentReader};

/// Tantivy collector computing a geo-distance facet over a searcher.
///
/// Segments are collected independently; their tables are summed in
/// `merge_fruits`. A weight error in any segment becomes the fruit's error.
pub struct GeoDistanceCollector {
    facet: Arc<GeoDistanceFacet>,
}

impl GeoDistanceCollector {
    pub fn new(facet: Arc<GeoDistanceFacet>) -> Self {
        Self { facet }
    }
}

impl Collector for GeoDistanceCollector {
    type Fruit = Result<RangeBucketTable>;
    type Child = GeoDistanceSegmentCollector;

    fn for_segment(
        &self,
        segment_local_id: SegmentOrdinal,
        segment_reader: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        let mut collector = self.facet.collector();
        // doc ids handed to a segment collector are segment-local
        let segment = SegmentContext::new(segment_local_id, 0, segment_reader);
        let error = collector.bind_segment(&segment).err();
        Ok(GeoDistanceSegmentCollector { collector, error })
    }

    fn requires_scoring(&self) -> bool {
        false
    }

    fn merge_fruits(
        &self,
        segment_fruits: Vec<Result<RangeBucketTable>>,
    ) -> tantivy::Result<Self::Fruit> {
        let tables: Result<Vec<RangeBucketTable>> = segment_fruits.into_iter().collect();
        Ok(tables.and_then(|tables| self.facet.reduce(tables)))
    }
}

pub struct GeoDistanceSegmentCollector {
    collector: GeoDistanceFacetCollector,
    error: Option<Error>,
}

impl SegmentCollector for GeoDistanceSegmentCollector {
    type Fruit = Result<RangeBucketTable>;

    fn collect(&mut self, doc: DocId, _score: Score) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.collector.collect(doc) {
            self.error = Some(e);
        }
    }

    fn harvest(mut self) -> Self::Fruit {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.collector.finish()?;
        self.collector.into_table()
    }
}
