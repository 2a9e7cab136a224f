//! Engine-wide constants and the built-in Montmorillon 1840 configuration.
//! Keeping them in a single place makes it easier to tweak the viewer defaults.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Half the width of the Web Mercator world, in metres.
pub const HALF_WORLD: f64 = 20_037_508.342_789_244;

/// Resolution (metres per pixel) of zoom level 0 with 256 px tiles.
pub const MAX_RESOLUTION: f64 = 2.0 * HALF_WORLD / TILE_SIZE as f64;

/// Radius of the Web Mercator sphere (EPSG:3857).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Zoom range a view may take.
pub const DEFAULT_MIN_ZOOM: f64 = 0.0;
pub const DEFAULT_MAX_ZOOM: f64 = 28.0;

/// Initial view center in EPSG:3857 metres.
pub const INITIAL_CENTER: [f64; 2] = [5_852_008.3243, 92_896.8792];

/// Initial view zoom.
pub const INITIAL_ZOOM: f64 = 12.0;

/// Padding, in pixels, applied on every side when fitting the view to the overlay.
pub const FIT_PADDING: f64 = 50.0;

/// Extent of the historical tileset, `[minX, minY, maxX, maxY]`.
///
/// The tileset metadata lists it as `[5852008.3243, 92896.8792, 5846640.1080, 99813.8944]`,
/// with x and y swapped; taken literally that box lies in the Indian Ocean.
/// These are the same bounds with the axes put back, covering Montmorillon.
pub const HISTORICAL_EXTENT: [f64; 4] = [92_896.8792, 5_846_640.1080, 99_813.8944, 5_852_008.3243];

pub const HISTORICAL_TILE_URL: &str =
    "https://geo-timemachine.epfl.ch/geoserver/www/tilesets/montmorillon-1840/{z}/{x}/{y}.png";

pub const HISTORICAL_MIN_ZOOM: u8 = 11;
pub const HISTORICAL_MAX_ZOOM: u8 = 21;

pub const HISTORICAL_ATTRIBUTION: &str =
    "© Archives départementales des Deux-Sèvres et Vienne";

pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_MAX_ZOOM: u8 = 19;
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// File name of the vector overlay, resolved against the base path.
pub const OVERLAY_FILE: &str = "merged.geojson";
pub const OVERLAY_ATTRIBUTION: &str = "© EPFL Time Machine Unit";
pub const OVERLAY_OPACITY: f32 = 0.5;

/// Environment variable holding the base path used to resolve static assets.
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const DEFAULT_BASE_URL: &str = "./";

/// Layer ids used by the composed viewer.
pub const OSM_LAYER_ID: &str = "osm";
pub const HISTORICAL_LAYER_ID: &str = "montmorillon-1840";
pub const OVERLAY_LAYER_ID: &str = "merged";
pub const POSITION_LAYER_ID: &str = "geolocation";

/// Number of vertices of the accuracy circle polygon.
pub const ACCURACY_CIRCLE_VERTICES: usize = 64;

/// HTTP User-Agent sent with every request so public tile servers accept it.
pub const USER_AGENT: &str = concat!("chronomap/", env!("CARGO_PKG_VERSION"));
