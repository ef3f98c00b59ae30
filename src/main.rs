//! CLI entry point for Field Sentinel.
//!
//! Provides subcommands for capturing field boundaries (drawn polygons or
//! recorded GPS corners), running crop-health analyses and managing parcels
//! on the backend.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use field_sentinel::{
    config::Config,
    fetch::BasicClient,
    geometry::{Boundary, Point, parse_coordinate_list},
    infra::backend::BackendClient,
    location::{LocationProvider, TrackLog},
    models::{ParcelId, ParcelUpdate, RunOptions},
    notify::TracingNotifier,
    output::{print_json, print_pretty, write_overlay_geojson, write_zones_csv},
    parcels::ParcelManager,
    render::LayerStack,
    workflow::{CaptureCommand, CaptureWorkflow, ResultsWorkflow},
};
use geojson::GeoJson;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type Api = BackendClient<BasicClient>;

#[derive(Parser)]
#[command(name = "field_sentinel")]
#[command(about = "Capture field boundaries and monitor crop health", long_about = None)]
struct Cli {
    /// Backend base URL (overrides FIELD_SENTINEL_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a parcel from a drawn polygon
    Draw {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// GeoJSON file holding the drawn polygon
        #[arg(long, conflicts_with = "coords", required_unless_present = "coords")]
        geojson: Option<String>,

        /// Vertices as "lng,lat;lng,lat;..."
        #[arg(long)]
        coords: Option<String>,
    },
    /// Save a parcel by walking its corners, replayed from a GPS fix log
    Record {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// CSV file with lng,lat columns, one fix per corner
        #[arg(short, long)]
        track: String,

        /// Lost fixes tolerated in a row before giving up; each retry uses the next row
        #[arg(short, long, default_value_t = 0)]
        retries: usize,
    },
    /// Run a health analysis and display the heatmap summary
    Analyze {
        id: i64,

        /// Imagery reference date (YYYY-MM-DD)
        #[arg(long)]
        reference_date: Option<NaiveDate>,

        /// Write the displayed heatmap as GeoJSON
        #[arg(long)]
        heatmap_out: Option<String>,

        /// Write the zone table as CSV
        #[arg(long)]
        zones_csv: Option<String>,

        /// Also log the statistics panel as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the area of a parcel
    Area { id: i64 },
    /// List saved parcels
    List,
    /// Show one parcel
    Show { id: i64 },
    /// Rename or re-describe a parcel
    Update {
        id: i64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a parcel
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let mut config = Config::from_env()?;
    let cli = Cli::parse();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    let _log_guard = init_tracing(&config.log_file_path);
    info!(api_url = %config.api_url, "Using backend");

    let api = Arc::new(BackendClient::new(
        BasicClient::new(config.http_timeout)?,
        &config.api_url,
    )?);
    let notifier = Arc::new(TracingNotifier);

    match cli.command {
        Commands::Draw {
            name,
            description,
            geojson,
            coords,
        } => {
            let vertices = match (geojson, coords) {
                (Some(path), _) => load_drawn_vertices(&path)?,
                (None, Some(coords)) => parse_coordinate_list(&coords)?,
                (None, None) => anyhow::bail!("one of --geojson or --coords is required"),
            };

            // drawn boundaries never ask for a fix
            let location: Arc<dyn LocationProvider> = Arc::new(TrackLog::from_reader(
                "lng,lat\n".as_bytes(),
            )?);
            let mut workflow = CaptureWorkflow::new(
                api,
                location,
                LayerStack::default(),
                notifier,
                config.capture_options(),
            );

            workflow.handle(CaptureCommand::StartDraw).await?;
            workflow
                .handle(CaptureCommand::DrawCompleted(vertices))
                .await?;
            submit(&mut workflow, name, description).await?;
        }
        Commands::Record {
            name,
            description,
            track,
            retries,
        } => {
            let track = Arc::new(TrackLog::open(&track).with_context(|| format!("reading {track}"))?);
            let fixes = track.remaining();
            let mut workflow = CaptureWorkflow::new(
                api,
                track,
                LayerStack::default(),
                notifier,
                config.capture_options(),
            );

            let corners = workflow.record_corners(fixes, retries).await?;
            info!(corners, fixes, "Track replayed");

            workflow.handle(CaptureCommand::Finish).await?;
            submit(&mut workflow, name, description).await?;
        }
        Commands::Analyze {
            id,
            reference_date,
            heatmap_out,
            zones_csv,
            json,
        } => {
            let id = ParcelId(id);
            let mut workflow = ResultsWorkflow::new(api, LayerStack::default(), notifier);

            let canceller = workflow.canceller();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling analysis");
                    canceller.cancel();
                }
            });

            let view = workflow
                .analyze(id, RunOptions { reference_date })
                .await?
                .clone();
            print_pretty(&view);
            if json {
                print_json(&view)?;
            }
            println!("{view}");
            println!("Area: {}", workflow.area(id).await);

            if let Some(path) = heatmap_out {
                write_overlay_geojson(&path, workflow.view().surface())?;
                info!(path, "Heatmap written");
            }
            if let Some(path) = zones_csv {
                write_zones_csv(&path, workflow.view().surface())?;
                info!(path, "Zone table written");
            }
        }
        Commands::Area { id } => {
            let workflow = ResultsWorkflow::new(api, LayerStack::default(), notifier);
            println!("Area: {}", workflow.area(ParcelId(id)).await);
        }
        Commands::List => {
            let parcels = ParcelManager::new(api).list().await?;
            info!(total = parcels.len(), "Parcel list fetched");
            for parcel in &parcels {
                println!(
                    "{:>6}  {:<30}  created {}  last analysed {}",
                    parcel.id,
                    parcel.name,
                    parcel.created_at.format("%Y-%m-%d"),
                    parcel
                        .last_computed_at
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "never".to_string())
                );
            }
        }
        Commands::Show { id } => {
            let parcel = ParcelManager::new(api).get(ParcelId(id)).await?;
            println!("{} ({})", parcel.name, parcel.id);
            if let Some(description) = parcel.description.as_deref().filter(|d| !d.is_empty()) {
                println!("{description}");
            }
            match Boundary::from_geojson(&parcel.geometry) {
                Ok(boundary) => println!(
                    "{} corners, about {:.2} ha",
                    boundary.vertex_count(),
                    boundary.area_preview().area_hectares
                ),
                Err(e) => warn!(error = %e, "Stored geometry is not a simple polygon"),
            }
        }
        Commands::Update {
            id,
            name,
            description,
        } => {
            let update = ParcelUpdate {
                name,
                description,
                geometry: None,
            };
            ParcelManager::new(api).update(ParcelId(id), update).await?;
        }
        Commands::Delete { id } => {
            ParcelManager::new(api).delete(ParcelId(id)).await?;
        }
    }

    Ok(())
}

async fn submit(
    workflow: &mut CaptureWorkflow<Api, LayerStack>,
    name: String,
    description: Option<String>,
) -> Result<()> {
    let id = workflow
        .handle(CaptureCommand::Submit { name, description })
        .await?;
    if let Some(id) = id {
        println!("Created parcel {id}");
    }
    Ok(())
}

/// Reads the first polygon of a GeoJSON geometry, feature or collection.
fn load_drawn_vertices(path: &str) -> Result<Vec<Point>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let geometry = match text.parse::<GeoJson>()? {
        GeoJson::Geometry(geometry) => geometry,
        GeoJson::Feature(feature) => feature.geometry.context("feature has no geometry")?,
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .find_map(|f| f.geometry)
            .context("collection has no geometry")?,
    };
    let boundary = Boundary::from_geojson(&geometry)?;
    Ok(boundary.ring()[..boundary.vertex_count()].to_vec())
}

/// Colored stderr logs plus a JSON rolling log file.
fn init_tracing(log_file_path: &str) -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = Path::new(log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("field_sentinel.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}
