mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geofacet::config::{Config, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "geofacet")]
#[command(about = "geofacet - geo-distance range facet tools")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "GEOFACET_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a facet request over JSON shard fixtures
    Run {
        /// Facet request (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Shards file: {"shards": [{"segments": [{"docs": [...]}]}]}
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Print the distance between two points
    Distance {
        /// Origin as "lat,lon"
        #[arg(long, allow_hyphen_values = true)]
        from: String,

        /// Target as "lat,lon"
        #[arg(long, allow_hyphen_values = true)]
        to: String,

        /// km, mi, m, nmi, yd or ft
        #[arg(short, long)]
        unit: Option<String>,

        /// arc, plane or sloppy_arc
        #[arg(long)]
        distance_type: Option<String>,
    },
}

fn init_tracing(config: &Config) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.observability.log_level.clone());
    let json = config.observability.log_format == "json";

    // stdout carries the command output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    if let Ok(format) = std::env::var("LOG_FORMAT") {
        config
            .override_log_format(&format)
            .context("invalid LOG_FORMAT")?;
    }
    init_tracing(&config);

    match cli.command {
        Commands::Run { request, data } => {
            commands::run::run_facet(&config, &request, &data).await?;
        }
        Commands::Distance {
            from,
            to,
            unit,
            distance_type,
        } => {
            commands::distance::run_distance(&config, &from, &to, unit.as_deref(), distance_type.as_deref())?;
        }
    }

    Ok(())
}
