//! Display of analysis results: heatmap overlay and statistics panel.

pub mod stats;
pub mod surface;

pub use stats::{HealthBand, StatsView, render_stats};
pub use surface::{Bounds, LayerId, LayerStack, MapSurface, ZonePolygon};

use tracing::debug;

use crate::geometry::Point;
use crate::models::{AnalysisResult, HealthZone};

/// Popup text shown when a zone is selected.
pub fn zone_popup(zone: &HealthZone) -> String {
    format!(
        "Health: {:.1}%\nSeverity: {}\nAnomaly: {:.3}",
        zone.health_score * 100.0,
        zone.severity,
        zone.anomaly_score
    )
}

fn zone_polygon(zone: &HealthZone) -> ZonePolygon {
    ZonePolygon {
        rings: zone.rings.clone(),
        fill_color: zone.color.clone(),
        health_score: zone.health_score,
        severity: zone.severity,
        anomaly_score: zone.anomaly_score,
        popup: zone_popup(zone),
    }
}

/// Display context of the capture workflow: the outline being captured.
pub struct BoundaryView<S> {
    surface: S,
    outline: Option<LayerId>,
}

impl<S: MapSurface> BoundaryView<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            outline: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Replaces the displayed outline with `path`; an empty path only clears.
    pub fn show(&mut self, path: &[Point]) {
        if let Some(previous) = self.outline.take() {
            self.surface.remove_layer(previous);
        }
        if let Some(bounds) = Bounds::around(path) {
            self.outline = Some(self.surface.add_outline(path.to_vec()));
            self.surface.fit_bounds(bounds);
        }
    }
}

/// Display context of the results workflow; owns its map surface.
pub struct ResultView<S> {
    surface: S,
    heatmap: Option<LayerId>,
    stats: Option<StatsView>,
}

impl<S: MapSurface> ResultView<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            heatmap: None,
            stats: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn stats(&self) -> Option<&StatsView> {
        self.stats.as_ref()
    }

    /// Replaces the displayed heatmap with one polygon per zone of `result`.
    ///
    /// The previous overlay is removed before the new one is added.
    pub fn render_heatmap(&mut self, result: &AnalysisResult) -> LayerId {
        if let Some(previous) = self.heatmap.take() {
            self.surface.remove_layer(previous);
        }

        let polygons: Vec<ZonePolygon> = result.zones.iter().map(zone_polygon).collect();
        let bounds = Bounds::around(polygons.iter().flat_map(|p| p.rings.iter().flatten()));
        debug!(zones = polygons.len(), "Rendering heatmap");

        let layer = self.surface.add_polygons(polygons);
        if let Some(bounds) = bounds {
            self.surface.fit_bounds(bounds);
        }
        self.heatmap = Some(layer);
        layer
    }

    /// Computes and keeps the statistics panel for `result`.
    pub fn render_stats(&mut self, result: &AnalysisResult) -> &StatsView {
        self.stats.insert(render_stats(&result.stats))
    }

    /// Heatmap and statistics together; the new result supersedes the old.
    pub fn render(&mut self, result: &AnalysisResult) -> &StatsView {
        self.render_heatmap(result);
        self.render_stats(result)
    }
}
