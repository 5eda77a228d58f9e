//! Property-based tests for bucketing and the shard merge.
//!
//! Random point sets are faceted as one shard and split across several
//! shards; the merged result must not depend on the split or on the order
//! in which shard tables are merged.

use geofacet::field::{MemoryColumn, MemorySegment};
use geofacet::{
    merge_tables, DistanceUnit, GeoDistance, GeoDistanceFacet, GeoPoint, GeoPointFieldNames,
    RangeBucketTable, RangeSpec,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Doc {
    lat: f64,
    lon: f64,
    weight: f64,
}

fn doc() -> impl Strategy<Value = Doc> {
    (-89.0f64..89.0, -179.0f64..179.0, 0u32..100).prop_map(|(lat, lon, w)| Doc {
        lat,
        lon,
        weight: w as f64,
    })
}

fn distance_type() -> impl Strategy<Value = GeoDistance> {
    prop_oneof![
        Just(GeoDistance::Arc),
        Just(GeoDistance::Plane),
        Just(GeoDistance::SloppyArc),
    ]
}

fn facet(distance: GeoDistance) -> GeoDistanceFacet {
    GeoDistanceFacet::new(
        "prop",
        GeoPointFieldNames::new("lat", "lon"),
        GeoPoint::new(10.0, 20.0),
    )
    .with_distance(distance)
    .with_range(RangeSpec {
        key: None,
        from: None,
        to: Some(1_000.0),
    })
    .with_range(RangeSpec::new(500.0, 5_000.0))
    .with_range(RangeSpec::new(1_000.0, 10_000.0))
    .with_range(RangeSpec {
        key: None,
        from: Some(10_000.0),
        to: None,
    })
    .with_value_field("w")
}

fn segment(docs: &[Doc]) -> MemorySegment {
    let column = |f: fn(&Doc) -> f64| MemoryColumn::from_values(docs.iter().map(|d| vec![f(d)]).collect());
    MemorySegment::new(docs.len() as u32)
        .with_column("lat", column(|d| d.lat))
        .with_column("lon", column(|d| d.lon))
        .with_column("w", column(|d| d.weight))
}

fn shard_table(facet: &GeoDistanceFacet, docs: &[Doc]) -> RangeBucketTable {
    facet.collect_shard(&[segment(docs)]).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn test_split_does_not_change_result(
        docs in prop::collection::vec(doc(), 0..60),
        cuts in prop::collection::vec(0usize..60, 0..4),
        distance in distance_type(),
    ) {
        let facet = facet(distance);
        let whole = shard_table(&facet, &docs);

        let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c.min(docs.len())).collect();
        cuts.sort_unstable();
        let mut shards = Vec::new();
        let mut start = 0;
        for cut in cuts.into_iter().chain(std::iter::once(docs.len())) {
            shards.push(shard_table(&facet, &docs[start..cut]));
            start = cut;
        }

        let merged = facet.reduce(shards).unwrap();
        prop_assert_eq!(merged, whole);
    }

    #[test]
    fn test_merge_order_invariant(
        a in prop::collection::vec(doc(), 0..30),
        b in prop::collection::vec(doc(), 0..30),
        c in prop::collection::vec(doc(), 0..30),
    ) {
        let facet = facet(GeoDistance::Arc);
        let (ta, tb, tc) = (shard_table(&facet, &a), shard_table(&facet, &b), shard_table(&facet, &c));

        let abc = merge_tables([ta.clone(), tb.clone(), tc.clone()]).unwrap();
        let cba = merge_tables([tc.clone(), tb.clone(), ta.clone()]).unwrap();
        let bac = merge_tables([tb, ta, tc]).unwrap();
        prop_assert_eq!(&abc, &cba);
        prop_assert_eq!(&abc, &bac);
    }

    #[test]
    fn test_counts_match_direct_bucketing(
        docs in prop::collection::vec(doc(), 0..60),
        distance in distance_type(),
    ) {
        let facet = facet(distance);
        let table = shard_table(&facet, &docs);
        let origin = facet.origin();

        for (entry, range) in table.entries().iter().zip(facet.ranges()) {
            let inside: Vec<&Doc> = docs
                .iter()
                .filter(|d| {
                    let dist = distance.calculate(origin.lat, origin.lon, d.lat, d.lon, DistanceUnit::Kilometers);
                    dist >= range.lower() && dist < range.upper()
                })
                .collect();
            prop_assert_eq!(entry.count, inside.len() as u64);
            prop_assert_eq!(entry.total, inside.iter().map(|d| d.weight).sum::<f64>());
        }
    }

    #[test]
    fn test_distance_symmetric_and_non_negative(
        a in doc(),
        b in doc(),
        distance in distance_type(),
    ) {
        let ab = distance.calculate(a.lat, a.lon, b.lat, b.lon, DistanceUnit::Meters);
        let ba = distance.calculate(b.lat, b.lon, a.lat, a.lon, DistanceUnit::Meters);
        prop_assert!(ab >= 0.0);
        prop_assert!((ab - ba).abs() <= 1e-6 * ab.max(1.0));
    }

    #[test]
    fn test_sloppy_arc_tracks_arc(a in doc(), b in doc()) {
        let arc = GeoDistance::Arc.calculate(a.lat, a.lon, b.lat, b.lon, DistanceUnit::Meters);
        let sloppy = GeoDistance::SloppyArc.calculate(a.lat, a.lon, b.lat, b.lon, DistanceUnit::Meters);
        prop_assert!((arc - sloppy).abs() <= 1e-4 * arc.max(1.0), "arc {} sloppy {}", arc, sloppy);
    }
}
