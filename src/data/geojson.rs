//! GeoJSON reading
//!
//! The serde model mirrors RFC 7946. [`read_features`] flattens a document
//! into [`Feature`]s whose geometries are reprojected into map coordinates.

use crate::core::config::DataProjection;
use crate::core::geo::{Coordinate, LonLat};
use crate::data::feature::Feature;
use crate::{MapError, Result};
use geo_types::{
    Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GeoJSON position; extra ordinates (altitude) are ignored
pub type Position = Vec<f64>;

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: Position,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(default)]
    pub id: Option<Value>,
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// Root GeoJSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection { features: Vec<GeoJsonFeature> },
    #[serde(untagged)]
    Geometry(GeoJsonGeometry),
}

impl GeoJson {
    /// Parses a GeoJSON document
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| MapError::ParseError(format!("Invalid GeoJSON: {}", e)))
    }

    /// Parses a GeoJSON document from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| MapError::ParseError(format!("Invalid GeoJSON: {}", e)))
    }

    /// Converts every feature to map coordinates
    pub fn into_features(self, projection: DataProjection) -> Result<Vec<Feature>> {
        match self {
            GeoJson::Feature(feature) => Ok(vec![convert_feature(feature, projection)?]),
            GeoJson::FeatureCollection { features } => features
                .into_iter()
                .map(|feature| convert_feature(feature, projection))
                .collect(),
            GeoJson::Geometry(geometry) => Ok(vec![Feature::from_geometry(convert_geometry(
                &geometry, projection,
            )?)]),
        }
    }
}

/// Reads GeoJSON bytes into features in map coordinates
pub fn read_features(bytes: &[u8], projection: DataProjection) -> Result<Vec<Feature>> {
    GeoJson::from_slice(bytes)?.into_features(projection)
}

fn convert_feature(feature: GeoJsonFeature, projection: DataProjection) -> Result<Feature> {
    let geometry = feature
        .geometry
        .as_ref()
        .map(|geometry| convert_geometry(geometry, projection))
        .transpose()?;
    let converted = Feature::new(geometry, feature.properties.unwrap_or_default());
    Ok(match feature.id {
        Some(id) => converted.with_id(id),
        None => converted,
    })
}

fn project(position: &Position, projection: DataProjection) -> Result<geo_types::Coord<f64>> {
    let (x, y) = match position.as_slice() {
        [x, y, ..] => (*x, *y),
        _ => {
            return Err(MapError::InvalidGeometry(format!(
                "position needs at least two ordinates, got {}",
                position.len()
            )))
        }
    };
    let coord = match projection {
        DataProjection::Wgs84 => LonLat::new(x, y).to_mercator(),
        DataProjection::WebMercator => Coordinate::new(x, y),
    };
    Ok(coord.into())
}

fn line(positions: &[Position], projection: DataProjection) -> Result<LineString<f64>> {
    positions
        .iter()
        .map(|p| project(p, projection))
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>], projection: DataProjection) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| line(ring, projection));
    let exterior = rings.next().transpose()?.unwrap_or_else(|| LineString::new(Vec::new()));
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn convert_geometry(geometry: &GeoJsonGeometry, projection: DataProjection) -> Result<Geometry<f64>> {
    Ok(match geometry {
        GeoJsonGeometry::Point { coordinates } => {
            Geometry::Point(Point::from(project(coordinates, projection)?))
        }
        GeoJsonGeometry::LineString { coordinates } => {
            Geometry::LineString(line(coordinates, projection)?)
        }
        GeoJsonGeometry::Polygon { coordinates } => {
            Geometry::Polygon(polygon(coordinates, projection)?)
        }
        GeoJsonGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
            coordinates
                .iter()
                .map(|p| project(p, projection).map(Point::from))
                .collect::<Result<Vec<_>>>()?,
        )),
        GeoJsonGeometry::MultiLineString { coordinates } => {
            Geometry::MultiLineString(MultiLineString::new(
                coordinates
                    .iter()
                    .map(|l| line(l, projection))
                    .collect::<Result<Vec<_>>>()?,
            ))
        }
        GeoJsonGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon::new(
            coordinates
                .iter()
                .map(|p| polygon(p, projection))
                .collect::<Result<Vec<_>>>()?,
        )),
        GeoJsonGeometry::GeometryCollection { geometries } => {
            Geometry::GeometryCollection(GeometryCollection::new_from(
                geometries
                    .iter()
                    .map(|g| convert_geometry(g, projection))
                    .collect::<Result<Vec<_>>>()?,
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Classification;

    const COLLECTION: &str = r#"
    {
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 7,
                "properties": {"class": "built", "year": 1840},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.87, 46.42], [0.88, 46.42], [0.88, 46.43], [0.87, 46.42]]]
                }
            },
            {
                "type": "Feature",
                "properties": null,
                "geometry": null
            }
        ]
    }
    "#;

    #[test]
    fn test_collection_parsing() {
        let features = read_features(COLLECTION.as_bytes(), DataProjection::Wgs84).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].classification(), Classification::Built);
        assert_eq!(features[0].id, Some(serde_json::json!(7)));
        assert_eq!(features[1].classification(), Classification::Unclassified);
        assert!(features[1].geometry().is_none());
    }

    #[test]
    fn test_reprojection_to_web_mercator() {
        let features = read_features(COLLECTION.as_bytes(), DataProjection::Wgs84).unwrap();
        let extent = features[0].extent().unwrap();
        let sw = LonLat::new(0.87, 46.42).to_mercator();
        let ne = LonLat::new(0.88, 46.43).to_mercator();
        assert!((extent.min_x - sw.x).abs() < 1e-6);
        assert!((extent.min_y - sw.y).abs() < 1e-6);
        assert!((extent.max_x - ne.x).abs() < 1e-6);
        assert!((extent.max_y - ne.y).abs() < 1e-6);
    }

    #[test]
    fn test_projected_data_is_kept() {
        let text = r#"{"type": "Point", "coordinates": [96000.0, 5850000.0, 12.0]}"#;
        let features = read_features(text.as_bytes(), DataProjection::WebMercator).unwrap();
        assert_eq!(features.len(), 1);
        let extent = features[0].extent().unwrap();
        assert_eq!((extent.min_x, extent.min_y), (96000.0, 5850000.0));
    }

    #[test]
    fn test_short_position_is_rejected() {
        let text = r#"{"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1.0]}}"#;
        assert!(matches!(
            read_features(text.as_bytes(), DataProjection::Wgs84),
            Err(MapError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            GeoJson::parse("{\"type\": \"Nope\"}"),
            Err(MapError::ParseError(_))
        ));
    }

    #[test]
    fn test_empty_collection() {
        let features =
            read_features(br#"{"type":"FeatureCollection","features":[]}"#, DataProjection::Wgs84)
                .unwrap();
        assert!(features.is_empty());
    }
}
