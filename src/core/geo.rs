use crate::core::constants::{EARTH_RADIUS, HALF_WORLD, MAX_LATITUDE, MAX_RESOLUTION};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Represents a geographical coordinate with longitude and latitude (EPSG:4326)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    /// Creates a new LonLat coordinate
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lon >= -180.0 && self.lon <= 180.0
    }

    /// Clamps latitude to the range Web Mercator can represent
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }

    /// Converts to Web Mercator projection (EPSG:3857)
    pub fn to_mercator(&self) -> Coordinate {
        let lat = Self::clamp_lat(self.lat);
        let x = self.lon.to_radians() * EARTH_RADIUS;
        let y = ((PI / 4.0 + lat.to_radians() / 2.0).tan().ln()) * EARTH_RADIUS;
        Coordinate::new(x, y)
    }

    /// Creates LonLat from Web Mercator coordinates
    pub fn from_mercator(coord: Coordinate) -> Self {
        let lon = (coord.x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        Self::new(lon, lat)
    }

    /// Destination point reached after travelling `distance` metres along
    /// `bearing` (radians, clockwise from north) on the sphere.
    pub fn offset(&self, distance: f64, bearing: f64) -> LonLat {
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();
        let angular = distance / EARTH_RADIUS;

        let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
        let lon2 = lon1
            + (bearing.sin() * angular.sin() * lat1.cos())
                .atan2(angular.cos() - lat1.sin() * lat2.sin());

        LonLat::new(Self::wrap_lon(lon2.to_degrees()), lat2.to_degrees())
    }

    /// Wraps longitude to [-180, 180] range
    pub fn wrap_lon(lon: f64) -> f64 {
        let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
        if wrapped == -180.0 && lon > 0.0 {
            180.0
        } else {
            wrapped
        }
    }
}

impl Default for LonLat {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A point in projected map coordinates (EPSG:3857 metres) or screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Coordinate) -> Coordinate {
        Coordinate::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Coordinate) -> Coordinate {
        Coordinate::new(self.x - other.x, self.y - other.y)
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<geo_types::Coord<f64>> for Coordinate {
    fn from(value: geo_types::Coord<f64>) -> Self {
        Self::new(value.x, value.y)
    }
}

impl From<Coordinate> for geo_types::Coord<f64> {
    fn from(value: Coordinate) -> Self {
        geo_types::coord! { x: value.x, y: value.y }
    }
}

/// Size of the render target in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// Axis-aligned bounding box `[minX, minY, maxX, maxY]` in map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    /// Creates an extent from two opposite corners, normalising axis order
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Creates an extent from a `[minX, minY, maxX, maxY]` array
    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Creates an extent that contains exactly one coordinate
    pub fn from_coordinate(coord: Coordinate) -> Self {
        Self::new(coord.x, coord.y, coord.x, coord.y)
    }

    /// Smallest extent containing every coordinate, `None` when empty
    pub fn from_coordinates<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut extent = Self::from_coordinate(first);
        for coord in iter {
            extent.extend(&coord);
        }
        Some(extent)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Checks if the extent contains a coordinate (edges included)
    pub fn contains(&self, coord: &Coordinate) -> bool {
        coord.x >= self.min_x
            && coord.x <= self.max_x
            && coord.y >= self.min_y
            && coord.y <= self.max_y
    }

    /// Checks if `other` lies entirely within this extent
    pub fn contains_extent(&self, other: &Extent) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Checks if the extents share any point, touching edges included
    pub fn intersects(&self, other: &Extent) -> bool {
        !(other.max_x < self.min_x
            || other.min_x > self.max_x
            || other.max_y < self.min_y
            || other.min_y > self.max_y)
    }

    /// Checks if the extents share an area, touching edges excluded
    pub fn overlaps(&self, other: &Extent) -> bool {
        other.max_x > self.min_x
            && other.min_x < self.max_x
            && other.max_y > self.min_y
            && other.min_y < self.max_y
    }

    /// Gets the intersection of two extents
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        if !self.intersects(other) {
            return None;
        }

        Some(Extent::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        ))
    }

    /// Extends the extent to include a coordinate
    pub fn extend(&mut self, coord: &Coordinate) {
        self.min_x = self.min_x.min(coord.x);
        self.min_y = self.min_y.min(coord.y);
        self.max_x = self.max_x.max(coord.x);
        self.max_y = self.max_y.max(coord.y);
    }

    /// Returns the union of this extent with another extent
    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Returns a new extent grown by `dx` horizontally and `dy` vertically on each side
    pub fn buffered(&self, dx: f64, dy: f64) -> Extent {
        Extent::new(
            self.min_x - dx,
            self.min_y - dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 && self.height() <= 0.0
    }
}

impl From<[f64; 4]> for Extent {
    fn from(value: [f64; 4]) -> Self {
        Self::from_array(value)
    }
}

impl From<Extent> for [f64; 4] {
    fn from(value: Extent) -> Self {
        value.to_array()
    }
}

impl From<geo_types::Rect<f64>> for Extent {
    fn from(rect: geo_types::Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Represents a tile coordinate in the XYZ (slippy map) tile system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Edge length of a tile at zoom `z`, in metres
    pub fn span(z: u8) -> f64 {
        MAX_RESOLUTION * crate::core::constants::TILE_SIZE as f64 / 2_f64.powi(z as i32)
    }

    /// Extent covered by the tile in EPSG:3857 metres
    pub fn extent(&self) -> Extent {
        let span = Self::span(self.z);
        let min_x = -HALF_WORLD + self.x as f64 * span;
        let max_y = HALF_WORLD - self.y as f64 * span;
        Extent::new(min_x, max_y - span, min_x + span, max_y)
    }

    /// Creates the tile that contains a map coordinate at the given zoom
    pub fn from_coordinate(coord: &Coordinate, z: u8) -> Self {
        let span = Self::span(z);
        let max_index = (1u64 << z) as f64 - 1.0;
        let x = ((coord.x + HALF_WORLD) / span).floor().clamp(0.0, max_index);
        let y = ((HALF_WORLD - coord.y) / span).floor().clamp(0.0, max_index);
        Self::new(x as u32, y as u32, z)
    }

    /// Gets the parent tile at a lower zoom level
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            None
        } else {
            Some(TileCoord::new(self.x / 2, self.y / 2, self.z - 1))
        }
    }

    /// Checks if the tile is valid for its zoom level
    pub fn is_valid(&self) -> bool {
        let max_coord = 1u64 << self.z;
        (self.x as u64) < max_coord && (self.y as u64) < max_coord
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_normalises_swapped_corners() {
        let extent = Extent::from_array([300.0, 10.0, 100.0, 40.0]);
        assert_eq!(extent.min_x, 100.0);
        assert_eq!(extent.max_x, 300.0);
        assert_eq!(extent.min_y, 10.0);
        assert_eq!(extent.max_y, 40.0);
    }

    #[test]
    fn test_extent_overlap_excludes_touching_edges() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(10.0, 0.0, 20.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Extent::new(5.0, 5.0, 15.0, 15.0)));
    }

    #[test]
    fn test_mercator_round_trip() {
        let montmorillon = LonLat::new(0.8706, 46.4264);
        let back = LonLat::from_mercator(montmorillon.to_mercator());
        assert!((back.lon - montmorillon.lon).abs() < 1e-9);
        assert!((back.lat - montmorillon.lat).abs() < 1e-9);
    }

    #[test]
    fn test_tile_extent_matches_world_at_zoom_zero() {
        let extent = TileCoord::new(0, 0, 0).extent();
        assert!((extent.min_x + HALF_WORLD).abs() < 1e-6);
        assert!((extent.max_y - HALF_WORLD).abs() < 1e-6);
        assert!((extent.width() - 2.0 * HALF_WORLD).abs() < 1e-6);
    }

    #[test]
    fn test_tile_from_coordinate_is_inside_tile_extent() {
        let coord = LonLat::new(0.8706, 46.4264).to_mercator();
        let tile = TileCoord::from_coordinate(&coord, 14);
        assert!(tile.is_valid());
        assert!(tile.extent().contains(&coord));
        assert_eq!(tile.parent(), Some(TileCoord::new(tile.x / 2, tile.y / 2, 13)));
    }

    #[test]
    fn test_offset_moves_north() {
        let origin = LonLat::new(0.0, 0.0);
        let moved = origin.offset(111_195.0, 0.0);
        assert!((moved.lat - 1.0).abs() < 0.01);
        assert!(moved.lon.abs() < 1e-9);
    }
}
