//! Mapping collaborator.
//!
//! Addresses are plain "lat lng" strings. The engine only needs three things
//! from a map: turn an address into a point, check the point is inside the
//! operational area, and route between two points.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// WGS84 coordinate
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a point
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in metres
    #[must_use]
    pub fn haversine_m(self, other: Self) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;

        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// Parses exactly two whitespace-separated finite numbers.
#[must_use]
pub fn parse_address(address: &str) -> Option<GeoPoint> {
    let mut tokens = address.split_whitespace();
    let lat = tokens.next()?.parse::<f64>().ok()?;
    let lng = tokens.next()?.parse::<f64>().ok()?;
    if tokens.next().is_some() || !lat.is_finite() || !lng.is_finite() {
        return None;
    }
    Some(GeoPoint::new(lat, lng))
}

/// How the consumer travels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
    /// By road
    Car,
    /// Cycle paths and roads
    Bike,
    /// Walking
    Foot,
    /// Step-free routes
    Wheelchair,
}

impl TransportMode {
    /// Lower-case profile name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Bike => "bike",
            Self::Foot => "foot",
            Self::Wheelchair => "wheelchair",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "car" => Ok(Self::Car),
            "bike" => Ok(Self::Bike),
            "foot" => Ok(Self::Foot),
            "wheelchair" => Ok(Self::Wheelchair),
            other => Err(format!("unknown transport mode: {other}")),
        }
    }
}

/// One turn instruction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Length of this leg in metres
    pub distance_m: f64,
    /// Human readable instruction
    pub instruction: String,
}

/// A computed route
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Total length in metres
    pub distance_m: f64,
    /// Turn-by-turn legs
    pub steps: Vec<RouteStep>,
}

/// Mapping failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    /// Not two numeric tokens
    #[error("Address is not a \"lat lng\" pair: {address}")]
    InvalidAddress {
        /// Rejected input
        address: String,
    },

    /// Outside the operational area
    #[error("Point ({lat}, {lng}) is outside the map bounds")]
    OutOfBounds {
        /// Latitude
        lat: f64,
        /// Longitude
        lng: f64,
    },

    /// The router found nothing
    #[error("No {mode} route between the given points")]
    NoRoute {
        /// Requested mode
        mode: TransportMode,
    },
}

/// Narrow interface to the external mapping subsystem.
///
/// Calls are synchronous and never retried.
pub trait MapService: Send + Sync {
    /// Parses an address into a point
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidAddress`] if the address is malformed.
    fn to_coordinates(&self, address: &str) -> Result<GeoPoint, MapError>;

    /// Returns true if `point` is inside the operational area
    fn within_bounds(&self, point: GeoPoint) -> bool;

    /// Routes between two points
    ///
    /// # Errors
    ///
    /// Returns an error if no route exists.
    fn route(&self, mode: TransportMode, from: GeoPoint, to: GeoPoint) -> Result<Route, MapError>;
}

/// Parses `address` and checks it lies within the map.
///
/// # Errors
///
/// [`MapError::InvalidAddress`] or [`MapError::OutOfBounds`].
pub fn locate(map: &dyn MapService, address: &str) -> Result<GeoPoint, MapError> {
    let point = map.to_coordinates(address)?;
    if !map.within_bounds(point) {
        return Err(MapError::OutOfBounds {
            lat: point.lat,
            lng: point.lng,
        });
    }
    Ok(point)
}

/// Rectangular operational area
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    /// Southern edge
    pub min_lat: f64,
    /// Northern edge
    pub max_lat: f64,
    /// Western edge
    pub min_lng: f64,
    /// Eastern edge
    pub max_lng: f64,
}

impl MapBounds {
    /// Returns true if `point` is inside or on the edge
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat) && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

/// Scotland
impl Default for MapBounds {
    fn default() -> Self {
        Self {
            min_lat: 54.6,
            max_lat: 60.9,
            min_lng: -8.7,
            max_lng: -0.7,
        }
    }
}

/// Offline stand-in for a routing engine.
///
/// Routes are straight lines scaled by a per-mode detour factor.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineMap {
    bounds: MapBounds,
}

impl OfflineMap {
    /// Creates a map covering `bounds`
    #[must_use]
    pub const fn new(bounds: MapBounds) -> Self {
        Self { bounds }
    }

    const fn detour_factor(mode: TransportMode) -> f64 {
        match mode {
            TransportMode::Car => 1.4,
            TransportMode::Bike => 1.25,
            TransportMode::Foot => 1.15,
            TransportMode::Wheelchair => 1.2,
        }
    }
}

impl MapService for OfflineMap {
    fn to_coordinates(&self, address: &str) -> Result<GeoPoint, MapError> {
        parse_address(address).ok_or_else(|| MapError::InvalidAddress {
            address: address.to_string(),
        })
    }

    fn within_bounds(&self, point: GeoPoint) -> bool {
        self.bounds.contains(point)
    }

    fn route(&self, mode: TransportMode, from: GeoPoint, to: GeoPoint) -> Result<Route, MapError> {
        if !self.bounds.contains(from) || !self.bounds.contains(to) {
            return Err(MapError::NoRoute { mode });
        }

        let distance_m = from.haversine_m(to) * Self::detour_factor(mode);
        let steps = vec![
            RouteStep {
                distance_m,
                instruction: format!("head {} towards the venue", heading(from, to)),
            },
            RouteStep {
                distance_m: 0.0,
                instruction: "arrive at destination".to_string(),
            },
        ];
        Ok(Route { distance_m, steps })
    }
}

fn heading(from: GeoPoint, to: GeoPoint) -> &'static str {
    let north = to.lat >= from.lat;
    let east = to.lng >= from.lng;
    let mostly_vertical = (to.lat - from.lat).abs() >= (to.lng - from.lng).abs();
    match (mostly_vertical, north, east) {
        (true, true, _) => "north",
        (true, false, _) => "south",
        (false, _, true) => "east",
        (false, _, false) => "west",
    }
}
