//! Output formatting and export of analysis results.
//!
//! Supports pretty-printing, JSON logging, a CSV zone table and GeoJSON
//! export of the displayed overlay.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::models::Severity;
use crate::render::{Bounds, LayerStack, StatsView};

/// Logs the statistics panel using Rust's debug pretty-print format.
pub fn print_pretty(view: &StatsView) {
    debug!("{:#?}", view);
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct ZoneRow<'a> {
    zone: usize,
    severity: Severity,
    health_score: f64,
    anomaly_score: f64,
    color: &'a str,
    parts: usize,
    center_lng: Option<f64>,
    center_lat: Option<f64>,
}

/// Writes one CSV row per displayed zone, replacing any existing file.
pub fn write_zones_csv(path: &str, surface: &LayerStack) -> Result<()> {
    debug!(path, zones = surface.polygons().count(), "Writing zone table");
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;

    for (i, zone) in surface.polygons().enumerate() {
        let center = Bounds::around(zone.rings.iter().flatten()).map(|b| {
            (
                (b.min.lng + b.max.lng) / 2.0,
                (b.min.lat + b.max.lat) / 2.0,
            )
        });
        writer.serialize(ZoneRow {
            zone: i + 1,
            severity: zone.severity,
            health_score: zone.health_score,
            anomaly_score: zone.anomaly_score,
            color: &zone.fill_color,
            parts: zone.rings.len(),
            center_lng: center.map(|c| c.0),
            center_lat: center.map(|c| c.1),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the overlay currently displayed on `surface` as GeoJSON.
pub fn write_overlay_geojson(path: &str, surface: &LayerStack) -> Result<()> {
    let collection = surface.to_feature_collection();
    debug!(path, features = collection.features.len(), "Writing overlay");
    std::fs::write(path, serde_json::to_string_pretty(&collection)?)?;
    Ok(())
}
