//! Distance command implementation.

use anyhow::{Context, Result};
use geofacet::{Config, DistanceUnit, GeoDistance, GeoPoint};

pub fn run_distance(
    config: &Config,
    from: &str,
    to: &str,
    unit: Option<&str>,
    distance_type: Option<&str>,
) -> Result<()> {
    let from = GeoPoint::parse(from).context("invalid --from point")?;
    let to = GeoPoint::parse(to).context("invalid --to point")?;
    from.validate().context("invalid --from point")?;
    to.validate().context("invalid --to point")?;

    let unit = match unit {
        Some(u) => u.parse::<DistanceUnit>()?,
        None => config.facet.default_unit,
    };
    let distance = match distance_type {
        Some(d) => d.parse::<GeoDistance>()?,
        None => config.facet.default_distance_type,
    };

    let value = distance.calculate(from.lat, from.lon, to.lat, to.lon, unit);
    tracing::debug!(%distance, %unit, "computed distance");
    println!("{} {}", value, unit);
    Ok(())
}
