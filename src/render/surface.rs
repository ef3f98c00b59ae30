//! Map display surface and its in-memory implementation.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

use crate::geometry::Point;
use crate::models::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(u64);

/// Axis-aligned extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Smallest bounds containing every point, `None` for no points.
    pub fn around<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self { min: *p, max: *p },
                Some(b) => Self {
                    min: Point::new(b.min.lng.min(p.lng), b.min.lat.min(p.lat)),
                    max: Point::new(b.max.lng.max(p.lng), b.max.lat.max(p.lat)),
                },
            })
        })
    }
}

/// A filled polygon with the annotation shown on selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePolygon {
    pub rings: Vec<Vec<Point>>,
    pub fill_color: String,
    pub health_score: f64,
    pub severity: Severity,
    pub anomaly_score: f64,
    pub popup: String,
}

/// Overlay layers on a map view.
pub trait MapSurface {
    fn add_polygons(&mut self, polygons: Vec<ZonePolygon>) -> LayerId;

    /// Unfilled boundary line through `path`, in order.
    fn add_outline(&mut self, path: Vec<Point>) -> LayerId;

    /// Returns `false` if the layer was not displayed.
    fn remove_layer(&mut self, id: LayerId) -> bool;

    fn fit_bounds(&mut self, bounds: Bounds);
}

#[derive(Debug)]
enum Layer {
    Zones(Vec<ZonePolygon>),
    Outline(Vec<Point>),
}

/// Surface that keeps its layers in memory, in insertion order.
#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<(LayerId, Layer)>,
    next_id: u64,
    view: Option<Bounds>,
}

impl LayerStack {
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Every displayed zone polygon across layers.
    pub fn polygons(&self) -> impl Iterator<Item = &ZonePolygon> {
        self.layers
            .iter()
            .filter_map(|(_, layer)| match layer {
                Layer::Zones(polygons) => Some(polygons),
                Layer::Outline(_) => None,
            })
            .flatten()
    }

    /// Every displayed boundary outline.
    pub fn outlines(&self) -> impl Iterator<Item = &[Point]> {
        self.layers.iter().filter_map(|(_, layer)| match layer {
            Layer::Outline(path) => Some(path.as_slice()),
            Layer::Zones(_) => None,
        })
    }

    fn push(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push((id, layer));
        id
    }

    pub fn view(&self) -> Option<Bounds> {
        self.view
    }

    /// The displayed zones, as a GeoJSON FeatureCollection.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .polygons()
            .map(|polygon| {
                let parts: Vec<Vec<Vec<Vec<f64>>>> = polygon
                    .rings
                    .iter()
                    .map(|ring| vec![ring.iter().map(|p| vec![p.lng, p.lat]).collect()])
                    .collect();
                let value = match <[_; 1]>::try_from(parts) {
                    Ok([single]) => Value::Polygon(single),
                    Err(parts) => Value::MultiPolygon(parts),
                };

                let mut properties = JsonObject::new();
                properties.insert("health_score".into(), polygon.health_score.into());
                properties.insert("severity".into(), polygon.severity.as_str().into());
                properties.insert("anomaly_score".into(), polygon.anomaly_score.into());
                properties.insert("color".into(), polygon.fill_color.clone().into());

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(value)),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

impl MapSurface for LayerStack {
    fn add_polygons(&mut self, polygons: Vec<ZonePolygon>) -> LayerId {
        self.push(Layer::Zones(polygons))
    }

    fn add_outline(&mut self, path: Vec<Point>) -> LayerId {
        self.push(Layer::Outline(path))
    }

    fn remove_layer(&mut self, id: LayerId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|(layer, _)| *layer != id);
        self.layers.len() != before
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.view = Some(bounds);
    }
}
