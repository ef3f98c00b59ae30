//! Parcel and analysis records exchanged with the backend.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::geometry::{Boundary, Point};

/// Backend-assigned parcel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(pub i64);

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parcel as sent on creation.
#[derive(Debug, Clone)]
pub struct Parcel {
    pub name: String,
    pub description: Option<String>,
    pub boundary: Boundary,
}

#[derive(Serialize)]
pub(crate) struct CreateParcelBody<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub geojson: geojson::Geometry,
}

impl Parcel {
    pub(crate) fn to_body(&self) -> CreateParcelBody<'_> {
        CreateParcelBody {
            name: &self.name,
            description: self.description.as_deref().unwrap_or(""),
            geojson: self.boundary.to_geojson(),
        }
    }
}

/// Partial update; `None` fields are left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParcelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "geojson", skip_serializing_if = "Option::is_none")]
    pub geometry: Option<geojson::Geometry>,
}

impl ParcelUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.geometry.is_none()
    }
}

/// A parcel as stored by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ParcelRecord {
    pub id: ParcelId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "geojson")]
    pub geometry: geojson::Geometry,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub last_computed_at: Option<DateTime<Utc>>,
}

/// Crop-health classification of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Moderate,
    Warning,
    Critical,
}

impl Severity {
    /// Band for an anomaly score, higher meaning less healthy.
    pub fn from_anomaly_score(score: f64) -> Self {
        match score {
            s if s > 0.7 => Self::Critical,
            s if s > 0.5 => Self::Warning,
            s if s > 0.3 => Self::Moderate,
            _ => Self::Healthy,
        }
    }

    /// Fill colour used when a zone arrives without one.
    pub fn color(self) -> &'static str {
        match self {
            Self::Critical => "#d73027",
            Self::Warning => "#fc8d59",
            Self::Moderate => "#fee090",
            Self::Healthy => "#91cf60",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Moderate => "moderate",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A polygonal sub-region of a parcel with its health classification.
///
/// `rings` holds one exterior ring per polygon part.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthZone {
    pub rings: Vec<Vec<Point>>,
    pub health_score: f64,
    pub severity: Severity,
    pub anomaly_score: f64,
    pub color: String,
}

/// Summary counts over all analysed zones.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub total_zones: usize,
    pub healthy_count: usize,
    pub warning_count: usize,
    #[serde(default)]
    pub moderate_count: usize,
    pub critical_count: usize,
    pub avg_health: f64,
}

impl AnalysisStats {
    /// Checks that the per-severity counts add up and `avg_health` is a
    /// fraction.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let counted =
            self.healthy_count + self.warning_count + self.moderate_count + self.critical_count;
        if counted != self.total_zones {
            return Err(format!(
                "zone counts add up to {counted}, expected {}",
                self.total_zones
            ));
        }
        if !(0.0..=1.0).contains(&self.avg_health) {
            return Err(format!("avg_health {} outside [0, 1]", self.avg_health));
        }
        Ok(())
    }
}

/// Complete outcome of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub zones: Vec<HealthZone>,
    pub stats: AnalysisStats,
    pub computed_at: DateTime<Utc>,
    pub reference_date: Option<NaiveDate>,
}

/// Options for a compute request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Imagery reference date; the backend uses today when absent.
    pub reference_date: Option<NaiveDate>,
}

/// Always sent as JSON; `{}` when no option is set.
#[derive(Serialize)]
pub(crate) struct ComputeBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<String>,
}

impl RunOptions {
    pub(crate) fn to_body(self) -> ComputeBody {
        ComputeBody {
            reference_date: self
                .reference_date
                .map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Raw compute response, decoded leniently and then checked.
#[derive(Debug, Deserialize)]
pub struct ComputeResponse {
    heatmap: FeatureCollection,
    stats: AnalysisStats,
    computed_at: String,
    #[serde(default)]
    reference_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<WireGeometry>,
    properties: ZoneProperties,
}

#[derive(Debug, Deserialize)]
struct WireGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
    #[serde(default)]
    geometries: Vec<WireGeometry>,
}

#[derive(Debug, Deserialize)]
struct ZoneProperties {
    health_score: f64,
    severity: Severity,
    anomaly_score: f64,
    #[serde(default)]
    color: Option<String>,
}

fn position(value: &Value) -> Option<Point> {
    match value.as_array()?.as_slice() {
        [lng, lat, ..] => Some(Point::new(lng.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}

fn ring(value: &Value) -> Option<Vec<Point>> {
    value.as_array()?.iter().map(position).collect()
}

/// Exterior ring of a polygon given either as `[[lng,lat],...]` or as
/// `[[[lng,lat],...], holes...]`.
fn polygon_exterior(value: &Value) -> Option<Vec<Point>> {
    let items = value.as_array()?;
    if items.first().and_then(position).is_some() {
        ring(value)
    } else {
        ring(items.first()?)
    }
}

impl WireGeometry {
    /// Exterior rings of the areal parts. Grid cells that only touch the
    /// parcel come back as points or lines and have none.
    fn into_rings(self) -> std::result::Result<Vec<Vec<Point>>, String> {
        let rings = match self.kind.as_str() {
            "Polygon" => polygon_exterior(&self.coordinates).map(|r| vec![r]),
            "MultiPolygon" => self
                .coordinates
                .as_array()
                .and_then(|parts| parts.iter().map(polygon_exterior).collect()),
            "GeometryCollection" => {
                let mut rings = Vec::new();
                for part in self.geometries {
                    rings.extend(part.into_rings()?);
                }
                return Ok(rings);
            }
            "Point" | "MultiPoint" | "LineString" | "MultiLineString" => return Ok(Vec::new()),
            other => return Err(format!("unsupported zone geometry `{other}`")),
        };
        rings.ok_or_else(|| format!("malformed {} coordinates", self.kind))
    }
}

impl Feature {
    /// `None` for a zone without area.
    fn into_zone(self) -> std::result::Result<Option<HealthZone>, String> {
        let geometry = self
            .geometry
            .ok_or_else(|| "zone without geometry".to_string())?;
        let kind = geometry.kind.clone();
        let rings = geometry.into_rings()?;
        if rings.is_empty() {
            debug!(geometry = %kind, "Skipping zone without area");
            return Ok(None);
        }
        let props = self.properties;
        Ok(Some(HealthZone {
            rings,
            health_score: props.health_score,
            severity: props.severity,
            anomaly_score: props.anomaly_score,
            color: props
                .color
                .unwrap_or_else(|| props.severity.color().to_string()),
        }))
    }
}

impl TryFrom<ComputeResponse> for AnalysisResult {
    type Error = String;

    /// Either every part of the payload is usable or the whole result is
    /// rejected.
    fn try_from(resp: ComputeResponse) -> std::result::Result<Self, Self::Error> {
        resp.stats.validate()?;
        let zones = resp
            .heatmap
            .features
            .into_iter()
            .map(Feature::into_zone)
            .filter_map(std::result::Result::transpose)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let computed_at = parse_timestamp(&resp.computed_at)
            .map_err(|e| format!("bad computed_at `{}`: {e}", resp.computed_at))?;
        let reference_date = resp
            .reference_date
            .as_deref()
            .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .transpose()
            .map_err(|e| format!("bad reference_date: {e}"))?;

        Ok(Self {
            zones,
            stats: resp.stats,
            computed_at,
            reference_date,
        })
    }
}

/// Accepts RFC 3339 or the backend's naive ISO-8601 form (read as UTC).
pub fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| s.parse::<NaiveDateTime>().map(|n| n.and_utc()))
}

fn deserialize_timestamp<'de, D>(d: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    parse_timestamp(&s).map_err(serde::de::Error::custom)
}

fn deserialize_optional_timestamp<'de, D>(
    d: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d)?
        .map(|s| parse_timestamp(&s).map_err(serde::de::Error::custom))
        .transpose()
}
