//! Device position tracking
//!
//! A [`PositionProvider`] pushes fixes (or sensor errors) over a crossbeam
//! channel; [`Geolocation`] keeps the latest projected position, the accuracy
//! and the accuracy polygon, and turns drained updates into map events.

use crate::core::config::GeolocationConfig;
use crate::core::constants::ACCURACY_CIRCLE_VERTICES;
use crate::core::geo::{Coordinate, LonLat};
use crate::input::events::MapEvent;
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use geo_types::{LineString, Polygon};
use std::f64::consts::PI;
use std::time::Duration;

/// Options passed to the position provider when tracking starts
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingOptions {
    pub enable_high_accuracy: bool,
    /// How long to wait for a fix; `None` waits forever
    pub timeout: Option<Duration>,
    /// Maximum age of a cached fix the provider may report
    pub maximum_age: Duration,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: false,
            timeout: None,
            maximum_age: Duration::ZERO,
        }
    }
}

/// A position reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    /// `None` when the sensor reports an update without coordinates
    pub lon_lat: Option<LonLat>,
    /// Accuracy radius in metres
    pub accuracy: Option<f64>,
}

impl PositionFix {
    pub fn new(lon_lat: LonLat, accuracy: f64) -> Self {
        Self {
            lon_lat: Some(lon_lat),
            accuracy: Some(accuracy),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("permission to read the device position was denied")]
    PermissionDenied,
    #[error("the device position is unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a position fix")]
    Timeout,
    #[error("geolocation is not supported on this platform")]
    Unsupported,
}

pub type PositionUpdate = std::result::Result<PositionFix, GeolocationError>;

/// Source of position updates
pub trait PositionProvider: Send {
    /// Starts reporting updates on `sender` until [`PositionProvider::stop`]
    fn start(&mut self, options: &TrackingOptions, sender: Sender<PositionUpdate>) -> Result<()>;

    fn stop(&mut self);
}

/// Reports a single configured fix
#[derive(Debug, Clone)]
pub struct StaticPositionProvider {
    fix: PositionFix,
}

impl StaticPositionProvider {
    pub fn new(fix: PositionFix) -> Self {
        Self { fix }
    }
}

impl PositionProvider for StaticPositionProvider {
    fn start(&mut self, _options: &TrackingOptions, sender: Sender<PositionUpdate>) -> Result<()> {
        // The receiver may already be gone if tracking was toggled off.
        let _ = sender.send(Ok(self.fix));
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Provider for hosts without a position sensor: reports `Unsupported` once
#[derive(Debug, Clone, Default)]
pub struct UnsupportedPositionProvider;

impl PositionProvider for UnsupportedPositionProvider {
    fn start(&mut self, _options: &TrackingOptions, sender: Sender<PositionUpdate>) -> Result<()> {
        let _ = sender.send(Err(GeolocationError::Unsupported));
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Tracking state and the latest reported position
pub struct Geolocation {
    provider: Box<dyn PositionProvider>,
    options: TrackingOptions,
    tracking: bool,
    receiver: Option<Receiver<PositionUpdate>>,
    position: Option<Coordinate>,
    accuracy: Option<f64>,
    accuracy_geometry: Option<Polygon<f64>>,
}

impl Geolocation {
    pub fn new(provider: Box<dyn PositionProvider>, options: TrackingOptions) -> Self {
        Self {
            provider,
            options,
            tracking: false,
            receiver: None,
            position: None,
            accuracy: None,
            accuracy_geometry: None,
        }
    }

    /// Builds the provider named by the configuration: a static fix when one
    /// is configured, otherwise the unsupported provider
    pub fn from_config(config: &GeolocationConfig) -> Self {
        let provider: Box<dyn PositionProvider> = match config.static_position {
            Some([lon, lat, accuracy]) => Box::new(StaticPositionProvider::new(PositionFix::new(
                LonLat::new(lon, lat),
                accuracy,
            ))),
            None => Box::new(UnsupportedPositionProvider),
        };
        let options = TrackingOptions {
            enable_high_accuracy: config.enable_high_accuracy,
            ..TrackingOptions::default()
        };
        Self::new(provider, options)
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn tracking_options(&self) -> &TrackingOptions {
        &self.options
    }

    /// Starts or stops the provider
    pub fn set_tracking(&mut self, tracking: bool) -> Result<()> {
        if tracking == self.tracking {
            return Ok(());
        }
        if tracking {
            let (tx, rx) = unbounded();
            self.provider.start(&self.options, tx)?;
            self.receiver = Some(rx);
        } else {
            self.provider.stop();
            self.receiver = None;
        }
        self.tracking = tracking;
        log::debug!("geolocation tracking {}", if tracking { "started" } else { "stopped" });
        Ok(())
    }

    /// Latest position in map coordinates
    pub fn position(&self) -> Option<Coordinate> {
        self.position
    }

    /// Accuracy radius of the latest fix, in metres
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    pub fn accuracy_geometry(&self) -> Option<&Polygon<f64>> {
        self.accuracy_geometry.as_ref()
    }

    /// Applies pending sensor updates and returns the events they produce.
    ///
    /// Errors are logged and reported as events; tracking stays enabled.
    pub fn poll(&mut self) -> Vec<MapEvent> {
        let updates: Vec<PositionUpdate> = match &self.receiver {
            Some(rx) => rx.try_iter().collect(),
            None => return Vec::new(),
        };

        let mut events = Vec::new();
        for update in updates {
            match update {
                Ok(fix) => events.extend(self.apply_fix(fix)),
                Err(error) => {
                    log::info!("geolocation error: {}", error);
                    events.push(MapEvent::GeolocationError {
                        message: error.to_string(),
                    });
                }
            }
        }
        events
    }

    fn apply_fix(&mut self, fix: PositionFix) -> Vec<MapEvent> {
        let mut events = Vec::new();

        let position = fix.lon_lat.map(|lon_lat| lon_lat.to_mercator());
        if position != self.position {
            self.position = position;
            events.push(MapEvent::PositionChange { position });
        }

        let geometry = match (fix.lon_lat, fix.accuracy) {
            (Some(center), Some(accuracy)) => Some(accuracy_circle(center, accuracy)),
            _ => None,
        };
        self.accuracy = fix.accuracy;
        if geometry != self.accuracy_geometry {
            self.accuracy_geometry = geometry;
            events.push(MapEvent::AccuracyGeometryChange);
        }
        events
    }
}

/// Circle of `radius` metres around `center`, computed on the sphere and
/// projected to map coordinates
pub fn accuracy_circle(center: LonLat, radius: f64) -> Polygon<f64> {
    let mut ring: Vec<geo_types::Coord<f64>> = (0..ACCURACY_CIRCLE_VERTICES)
        .map(|i| {
            let bearing = 2.0 * PI * i as f64 / ACCURACY_CIRCLE_VERTICES as f64;
            center.offset(radius, bearing).to_mercator().into()
        })
        .collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    Polygon::new(LineString::new(ring), Vec::new())
}
