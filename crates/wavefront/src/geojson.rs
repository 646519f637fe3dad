//! GeoJSON interchange for map layers.
//!
//! Export writes a `FeatureCollection` of `Polygon` features with closed rings of
//! `[lng, lat]` pairs. Import accepts a collection, a single feature or a bare
//! geometry and keeps the outer ring of every polygon.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GeoResult;
use crate::geo::{Polygon, Position, Side};
use crate::wave::WavePolygons;

/// `[lng, lat]`
pub type Coordinate = [f64; 2];
pub type Ring = Vec<Coordinate>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
enum CollectionTag {
    #[default]
    FeatureCollection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureTag {
    Feature,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// Outer ring followed by holes.
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    tag: FeatureTag,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Map<String, Value>) -> Self {
        Self {
            tag: FeatureTag::Feature,
            geometry: Some(geometry),
            properties: Some(properties),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    tag: CollectionTag,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            tag: CollectionTag::FeatureCollection,
            features,
        }
    }

    /// One `Polygon` feature per ring; fragments carry their side and cut id.
    pub fn from_polygons<'a, I>(polygons: I) -> Self
    where
        I: IntoIterator<Item = &'a Polygon>,
    {
        Self::new(
            polygons
                .into_iter()
                .map(|p| Feature::new(polygon_geometry(p), side_properties(p.side())))
                .collect(),
        )
    }

    pub fn to_json(&self) -> GeoResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Any document the importer understands.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Document {
    Collection(FeatureCollection),
    Feature(Feature),
    Geometry(Geometry),
}

/// Closed `[lng, lat]` ring of `poly` (first vertex repeated at the end).
pub fn ring_coordinates(poly: &Polygon) -> Ring {
    let mut ring: Ring = poly.iter().map(|p| [p.lng, p.lat]).collect();
    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    ring
}

fn polygon_geometry(poly: &Polygon) -> Geometry {
    Geometry::Polygon {
        coordinates: vec![ring_coordinates(poly)],
    }
}

fn side_properties(side: Option<Side>) -> Map<String, Value> {
    let mut props = Map::new();
    if let Some(side) = side {
        let name = if side.is_left() { "left" } else { "right" };
        props.insert("side".into(), Value::from(name));
        props.insert("cut_id".into(), Value::from(side.cut_id().0));
    }
    props
}

/// `FeatureCollection` text for a list of rings.
pub fn polygons_to_geojson(polygons: &[Polygon]) -> GeoResult<String> {
    FeatureCollection::from_polygons(polygons).to_json()
}

/// Snapshot layer: every fragment tagged `"state": "traversed" | "remaining"`.
pub fn wave_polygons_to_geojson(snapshot: &WavePolygons) -> GeoResult<String> {
    let tagged = |polys: &[Polygon], state: &str| -> Vec<Feature> {
        polys
            .iter()
            .map(|p| {
                let mut props = side_properties(p.side());
                props.insert("state".into(), Value::from(state));
                Feature::new(polygon_geometry(p), props)
            })
            .collect()
    };
    let mut features = tagged(&snapshot.traversed_polygons, "traversed");
    features.extend(tagged(&snapshot.remaining_polygons, "remaining"));
    FeatureCollection::new(features).to_json()
}

/// Outer rings of every polygon in `text`; holes and empty geometries are skipped.
pub fn parse_polygons(text: &str) -> GeoResult<Vec<Polygon>> {
    let doc: Document = serde_json::from_str(text)?;
    let geometries: Vec<Geometry> = match doc {
        Document::Collection(fc) => fc.features.into_iter().filter_map(|f| f.geometry).collect(),
        Document::Feature(f) => f.geometry.into_iter().collect(),
        Document::Geometry(g) => vec![g],
    };
    let mut out = Vec::new();
    for g in geometries {
        match g {
            Geometry::Polygon { coordinates } => out.extend(outer_ring(coordinates)),
            Geometry::MultiPolygon { coordinates } => {
                out.extend(coordinates.into_iter().filter_map(outer_ring))
            }
        }
    }
    Ok(out)
}

fn outer_ring(rings: Vec<Ring>) -> Option<Polygon> {
    let outer = rings.into_iter().next()?;
    let mut poly =
        Polygon::from_positions(outer.into_iter().map(|[lng, lat]| Position::new(lat, lng)));
    if poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    (!poly.is_empty()).then_some(poly)
}
