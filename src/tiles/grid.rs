//! Web Mercator XYZ tile grid addressing

use crate::core::constants::HALF_WORLD;
use crate::core::geo::{Extent, TileCoord};

/// Tolerance, in tile units, absorbing rounding at tile boundaries
const EPSILON: f64 = 1e-9;

/// Extent of the whole tile grid
pub fn world_extent() -> Extent {
    Extent::new(-HALF_WORLD, -HALF_WORLD, HALF_WORLD, HALF_WORLD)
}

/// Inclusive range of tile columns and rows covering an extent at zoom `z`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub z: u8,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRange {
    /// Tiles whose area overlaps `extent`; `None` when the extent misses the grid
    pub fn for_extent(extent: &Extent, z: u8) -> Option<Self> {
        let clipped = extent.intersection(&world_extent())?;
        if clipped.width() <= 0.0 || clipped.height() <= 0.0 {
            return None;
        }

        let span = TileCoord::span(z);
        let max_index = ((1u64 << z) - 1) as f64;
        let column = |x: f64| ((x + HALF_WORLD) / span + EPSILON).floor().clamp(0.0, max_index) as u32;
        let row = |y: f64| ((HALF_WORLD - y) / span + EPSILON).floor().clamp(0.0, max_index) as u32;

        // The max edges are exclusive: an extent ending on a tile boundary
        // does not pull in the next column or row.
        let max_x = ((clipped.max_x + HALF_WORLD) / span - EPSILON).ceil() - 1.0;
        let max_y = ((HALF_WORLD - clipped.min_y) / span - EPSILON).ceil() - 1.0;

        Some(Self {
            z,
            min_x: column(clipped.min_x),
            min_y: row(clipped.max_y),
            max_x: max_x.clamp(0.0, max_index) as u32,
            max_y: max_y.clamp(0.0, max_index) as u32,
        })
    }

    pub fn len(&self) -> usize {
        (self.max_x - self.min_x + 1) as usize * (self.max_y - self.min_y + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        coord.z == self.z
            && (self.min_x..=self.max_x).contains(&coord.x)
            && (self.min_y..=self.max_y).contains(&coord.y)
    }

    /// Tile coordinates in row-major order
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_y..=self.max_y)
            .flat_map(move |y| (self.min_x..=self.max_x).map(move |x| TileCoord::new(x, y, self.z)))
    }
}

/// Tiles covering `extent` at zoom `z`, restricted to `envelope` when given
pub fn tiles_for_extent(extent: &Extent, z: u8, envelope: Option<&Extent>) -> Vec<TileCoord> {
    let area = match envelope {
        Some(envelope) if !extent.overlaps(envelope) => return Vec::new(),
        Some(envelope) => match extent.intersection(envelope) {
            Some(area) => area,
            None => return Vec::new(),
        },
        None => *extent,
    };

    TileRange::for_extent(&area, z)
        .map(|range| {
            range
                .iter()
                .filter(|coord| envelope.map_or(true, |e| e.overlaps(&coord.extent())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_at_zoom_one() {
        let range = TileRange::for_extent(&world_extent(), 1).unwrap();
        assert_eq!(range.len(), 4);
        let coords: Vec<_> = range.iter().collect();
        assert_eq!(coords[0], TileCoord::new(0, 0, 1));
        assert_eq!(coords[3], TileCoord::new(1, 1, 1));
    }

    #[test]
    fn test_tile_aligned_extent_takes_one_tile() {
        let tile = TileCoord::new(5, 9, 4);
        let tiles = tiles_for_extent(&tile.extent(), 4, None);
        assert_eq!(tiles, vec![tile]);
    }

    #[test]
    fn test_envelope_limits_tiles() {
        let envelope = TileCoord::new(100, 200, 10).extent().buffered(-10.0, -10.0);
        let view = world_extent();
        let tiles = tiles_for_extent(&view, 10, Some(&envelope));
        assert_eq!(tiles, vec![TileCoord::new(100, 200, 10)]);

        let far = TileCoord::new(0, 0, 10).extent();
        assert!(tiles_for_extent(&far, 10, Some(&envelope)).is_empty());
    }

    #[test]
    fn test_extent_outside_world() {
        let outside = Extent::new(3.0e7, 3.0e7, 4.0e7, 4.0e7);
        assert!(TileRange::for_extent(&outside, 3).is_none());
    }
}
