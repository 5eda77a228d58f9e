//! Streaming collector for one shard's geo-distance facet.
//!
//! Driven by the query engine: `bind_segment` on every segment transition,
//! `collect` for every matching document of that segment, `finish` once.

use super::table::RangeBucketTable;
use super::value::ValueSource;
use crate::error::{Error, Result};
use crate::field::{DocId, GeoPointFieldNames, NumericFieldData, SegmentContext, SegmentOrdinal};
use crate::geo::{DistanceUnit, GeoDistance, GeoPoint};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// Constructed, no segment bound yet.
    Idle,
    SegmentBound {
        segment_ord: SegmentOrdinal,
        doc_base: DocId,
    },
    /// The table is the shard result.
    Finished,
    /// Aborted by a weight error or by cancellation; the table is unusable.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub segments: u64,
    /// Documents with both coordinates present
    pub collected: u64,
    /// Documents missing latitude or longitude
    pub skipped: u64,
    /// Coordinate samples measured (one per point of a multi-valued doc)
    pub samples: u64,
}

pub struct GeoDistanceFacetCollector {
    name: String,
    fields: GeoPointFieldNames,
    origin: GeoPoint,
    unit: DistanceUnit,
    distance: GeoDistance,
    value: ValueSource,
    table: RangeBucketTable,
    state: CollectorState,
    lat: Option<Box<dyn NumericFieldData>>,
    lon: Option<Box<dyn NumericFieldData>>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    stats: CollectStats,
}

impl GeoDistanceFacetCollector {
    pub fn new(
        name: impl Into<String>,
        fields: GeoPointFieldNames,
        origin: GeoPoint,
        unit: DistanceUnit,
        distance: GeoDistance,
        value: ValueSource,
        table: RangeBucketTable,
    ) -> Self {
        Self {
            name: name.into(),
            fields,
            origin,
            unit,
            distance,
            value,
            table,
            state: CollectorState::Idle,
            lat: None,
            lon: None,
            lats: Vec::new(),
            lons: Vec::new(),
            stats: CollectStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn stats(&self) -> CollectStats {
        self.stats
    }

    /// Rebind field data and the value source to `segment`.
    pub fn bind_segment(&mut self, segment: &SegmentContext<'_>) -> Result<()> {
        match self.state {
            CollectorState::Idle | CollectorState::SegmentBound { .. } => {}
            _ => return Err(self.misuse("bind_segment")),
        }

        if let Err(e) = self.rebind(segment) {
            self.fail(&e);
            return Err(e);
        }

        self.state = CollectorState::SegmentBound {
            segment_ord: segment.segment_ord,
            doc_base: segment.doc_base,
        };
        self.stats.segments += 1;
        debug!(
            facet = %self.name,
            segment_ord = segment.segment_ord,
            doc_base = segment.doc_base,
            lat_present = self.lat.is_some(),
            lon_present = self.lon.is_some(),
            "bound geo distance facet to segment"
        );
        Ok(())
    }

    fn rebind(&mut self, segment: &SegmentContext<'_>) -> Result<()> {
        self.lat = segment.reader.numeric_field(&self.fields.lat)?;
        self.lon = segment.reader.numeric_field(&self.fields.lon)?;
        self.value.bind_segment(segment)
    }

    /// Account for one matching document of the bound segment.
    ///
    /// Documents without a latitude or longitude are skipped silently. A
    /// weight error aborts the whole collection.
    pub fn collect(&mut self, doc: DocId) -> Result<()> {
        if !matches!(self.state, CollectorState::SegmentBound { .. }) {
            return Err(self.misuse("collect"));
        }

        let (lat, lon) = match (self.lat.as_deref(), self.lon.as_deref()) {
            (Some(lat), Some(lon)) if lat.has_value(doc) && lon.has_value(doc) => (lat, lon),
            _ => {
                self.stats.skipped += 1;
                return Ok(());
            }
        };

        // once per document, shared by all of its points
        let weight = match self.value.evaluate(doc) {
            Ok(weight) => weight,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let (origin_lat, origin_lon) = (self.origin.lat, self.origin.lon);
        if lat.is_multi_valued() || lon.is_multi_valued() {
            lat.values(doc, &mut self.lats);
            lon.values(doc, &mut self.lons);
            let points = self.lats.len().min(self.lons.len());
            for (&doc_lat, &doc_lon) in self.lats.iter().zip(self.lons.iter()) {
                let distance =
                    self.distance
                        .calculate(origin_lat, origin_lon, doc_lat, doc_lon, self.unit);
                self.table.record_sample(distance, weight);
            }
            self.stats.samples += points as u64;
        } else {
            let distance = self.distance.calculate(
                origin_lat,
                origin_lon,
                lat.value(doc),
                lon.value(doc),
                self.unit,
            );
            self.table.record_sample(distance, weight);
            self.stats.samples += 1;
        }

        self.stats.collected += 1;
        Ok(())
    }

    /// End of shard execution. The table is returned as-is.
    pub fn finish(&mut self) -> Result<&RangeBucketTable> {
        match self.state {
            CollectorState::Idle | CollectorState::SegmentBound { .. } => {}
            _ => return Err(self.misuse("finish")),
        }

        self.state = CollectorState::Finished;
        self.release_segment();

        debug!(
            facet = %self.name,
            segments = self.stats.segments,
            collected = self.stats.collected,
            skipped = self.stats.skipped,
            samples = self.stats.samples,
            "geo distance facet finished"
        );
        metrics::counter!("geofacet_docs_collected_total").increment(self.stats.collected);
        metrics::counter!("geofacet_docs_skipped_total").increment(self.stats.skipped);

        Ok(&self.table)
    }

    /// Hand the finished table over to the merge stage.
    pub fn into_table(self) -> Result<RangeBucketTable> {
        match self.state {
            CollectorState::Finished => Ok(self.table),
            CollectorState::Failed => Err(Error::CollectionAborted(format!(
                "facet '{}' was aborted; its partial table is discarded",
                self.name
            ))),
            _ => Err(Error::InvalidState(format!(
                "facet '{}': into_table called before finish",
                self.name
            ))),
        }
    }

    /// Cancel the collection; later calls fail with `CollectionAborted`.
    pub fn abort(&mut self) {
        if self.state == CollectorState::Failed {
            return;
        }
        warn!(facet = %self.name, "geo distance facet collection aborted");
        self.mark_failed();
    }

    fn fail(&mut self, cause: &Error) {
        warn!(facet = %self.name, error = %cause, "geo distance facet collection failed");
        self.mark_failed();
    }

    fn mark_failed(&mut self) {
        self.state = CollectorState::Failed;
        self.release_segment();
        metrics::counter!("geofacet_collections_failed_total").increment(1);
    }

    fn release_segment(&mut self) {
        self.lat = None;
        self.lon = None;
        self.value.unbind();
    }

    fn misuse(&self, op: &str) -> Error {
        match self.state {
            CollectorState::Failed => Error::CollectionAborted(format!(
                "facet '{}': {} called after the collection was aborted",
                self.name, op
            )),
            state => {
                error!(facet = %self.name, op, ?state, "geo distance facet collector misuse");
                Error::InvalidState(format!(
                    "facet '{}': {} is not valid in state {:?}",
                    self.name, op, state
                ))
            }
        }
    }
}
