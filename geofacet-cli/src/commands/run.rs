//! Run command implementation.

use anyhow::{Context, Result};
use geofacet::field::{MemoryShard, ShardSet};
use geofacet::{Config, GeoDistanceFacet, GeoDistanceFacetRequest, ScriptRegistry};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Run the facet in `request_path` over every shard of `data_path`, one
/// blocking task per shard, and print the merged result.
pub async fn run_facet(config: &Config, request_path: &Path, data_path: &Path) -> Result<()> {
    let request: GeoDistanceFacetRequest = serde_json::from_str(
        &fs::read_to_string(request_path)
            .with_context(|| format!("failed to read {}", request_path.display()))?,
    )
    .with_context(|| format!("invalid facet request {}", request_path.display()))?;

    let facet = Arc::new(
        GeoDistanceFacet::from_request(&request, &config.facet, &ScriptRegistry::default())
            .context("failed to prepare facet")?,
    );

    let shards = load_shards(data_path)?;
    tracing::info!(facet = facet.name(), shards = shards.len(), "running facet");
    let start = Instant::now();

    let mut handles = Vec::with_capacity(shards.len());
    for shard in shards {
        let facet = Arc::clone(&facet);
        handles.push(tokio::task::spawn_blocking(move || {
            facet.collect_shard(&shard.segments)
        }));
    }

    let mut tables = Vec::with_capacity(handles.len());
    for (i, handle) in handles.into_iter().enumerate() {
        let table = handle
            .await
            .context("shard task panicked")?
            .with_context(|| format!("shard {} failed", i))?;
        tables.push(table);
    }

    let merged = facet.reduce(tables)?;
    let result = facet.to_result(&merged)?;
    tracing::info!(
        facet = facet.name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "facet complete"
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn load_shards(path: &Path) -> Result<Vec<MemoryShard>> {
    let set: ShardSet = serde_json::from_str(
        &fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?,
    )
    .with_context(|| format!("invalid shards file {}", path.display()))?;
    set.into_shards()
        .with_context(|| format!("malformed shard in {}", path.display()))
}
