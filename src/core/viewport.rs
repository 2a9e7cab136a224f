use crate::core::constants::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, MAX_RESOLUTION};
use crate::core::geo::{Coordinate, Extent, Size};
use serde::{Deserialize, Serialize};

/// Pixel padding applied around an extent when fitting the view, in
/// `[top, right, bottom, left]` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Same padding on all four sides
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self::uniform(0.0)
    }
}

/// Manages the current view of the map: center, zoom, and render target size.
///
/// The view works in projected EPSG:3857 coordinates. Zoom is continuous;
/// the resolution at zoom `z` is `MAX_RESOLUTION / 2^z` metres per pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// The center of the map view in projected coordinates
    pub center: Coordinate,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the render target in pixels
    pub size: Size,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
}

impl View {
    /// Creates a new view
    pub fn new(center: Coordinate, zoom: f64, size: Size) -> Self {
        Self {
            center,
            zoom: zoom.clamp(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM),
            size,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }

    /// Sets the center of the view
    pub fn set_center(&mut self, center: Coordinate) {
        self.center = center;
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets the render target size
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Resolution in metres per pixel at an arbitrary zoom level
    pub fn resolution_for_zoom(zoom: f64) -> f64 {
        MAX_RESOLUTION / 2_f64.powf(zoom)
    }

    /// Zoom level matching a resolution in metres per pixel
    pub fn zoom_for_resolution(resolution: f64) -> f64 {
        (MAX_RESOLUTION / resolution).log2()
    }

    /// Gets the resolution in metres per pixel at the current zoom level
    pub fn resolution(&self) -> f64 {
        Self::resolution_for_zoom(self.zoom)
    }

    /// Converts a map coordinate to pixel coordinates relative to the top-left corner
    pub fn coordinate_to_pixel(&self, coord: &Coordinate) -> Coordinate {
        let resolution = self.resolution();
        Coordinate::new(
            (coord.x - self.center.x) / resolution + self.size.width / 2.0,
            (self.center.y - coord.y) / resolution + self.size.height / 2.0,
        )
    }

    /// Converts pixel coordinates back to a map coordinate
    pub fn pixel_to_coordinate(&self, pixel: &Coordinate) -> Coordinate {
        let resolution = self.resolution();
        Coordinate::new(
            self.center.x + (pixel.x - self.size.width / 2.0) * resolution,
            self.center.y - (pixel.y - self.size.height / 2.0) * resolution,
        )
    }

    /// Gets the extent currently visible in the render target
    pub fn calculate_extent(&self) -> Extent {
        let resolution = self.resolution();
        let half_width = self.size.width * resolution / 2.0;
        let half_height = self.size.height * resolution / 2.0;
        Extent::new(
            self.center.x - half_width,
            self.center.y - half_height,
            self.center.x + half_width,
            self.center.y + half_height,
        )
    }

    /// Pans the view by a pixel offset; positive `delta.x` drags the map to the right
    pub fn pan(&mut self, delta: Coordinate) {
        let resolution = self.resolution();
        self.center = Coordinate::new(
            self.center.x - delta.x * resolution,
            self.center.y + delta.y * resolution,
        );
    }

    /// Zooms to a level, keeping the map coordinate under `anchor` (pixels) fixed
    pub fn zoom_to(&mut self, zoom: f64, anchor: Option<Coordinate>) {
        let new_zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < 1e-9 {
            return;
        }

        match anchor {
            Some(pixel) => {
                let anchored = self.pixel_to_coordinate(&pixel);
                self.zoom = new_zoom;
                let drifted = self.pixel_to_coordinate(&pixel);
                self.center = self.center.add(&anchored.subtract(&drifted));
            }
            None => self.zoom = new_zoom,
        }
    }

    /// Fits the view to an extent, leaving `padding` pixels free on each side.
    ///
    /// The zoom is not snapped to integer levels. Returns `false` and leaves the
    /// view untouched when the padded render target has no room left.
    pub fn fit(&mut self, extent: &Extent, padding: Padding) -> bool {
        let available_width = self.size.width - padding.left - padding.right;
        let available_height = self.size.height - padding.top - padding.bottom;
        if available_width <= 0.0 || available_height <= 0.0 {
            return false;
        }

        let resolution = (extent.width() / available_width).max(extent.height() / available_height);
        let zoom = if resolution > 0.0 {
            Self::zoom_for_resolution(resolution)
        } else {
            self.max_zoom
        };
        self.set_zoom(zoom);

        // Shift the center so the extent sits in the middle of the padded area.
        let resolution = self.resolution();
        let offset_x = (padding.right - padding.left) / 2.0 * resolution;
        let offset_y = (padding.top - padding.bottom) / 2.0 * resolution;
        let center = extent.center();
        self.center = Coordinate::new(center.x + offset_x, center.y + offset_y);
        true
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new(Coordinate::new(0.0, 0.0), 0.0, Size::default())
    }
}
