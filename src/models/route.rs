//! Route geometry and the waypoints sampled along it

use super::{Coordinate, WeatherSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Meters to statute miles
pub const MILES_PER_METER: f64 = 0.000_621_371;

/// Path returned by the routing service for one alternative
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RouteGeometry {
    /// Ordered polyline from origin to destination
    pub coordinates: Vec<Coordinate>,
    pub distance_meters: f64,
    /// Duration as estimated by the routing engine, before speed correction
    pub duration_seconds: f64,
}

impl RouteGeometry {
    #[must_use]
    pub fn distance_miles(&self) -> f64 {
        self.distance_meters * MILES_PER_METER
    }
}

/// One route alternative together with its sampled waypoints
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RouteOption {
    pub geometry: RouteGeometry,
    pub waypoints: Vec<Waypoint>,
}

/// A sampled point along a route
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Waypoint {
    pub coordinate: Coordinate,
    /// Whole miles from the start
    pub distance_from_start_miles: f64,
    /// Fractional position (0 to 1) along the coordinate sequence
    pub route_progress: f64,
    /// "Start", "Mile N" or "Destination"
    pub label: String,
    /// Seconds after departure this point is reached
    pub eta_seconds: f64,
    pub eta_time: DateTime<Utc>,
}

/// A waypoint with the weather expected on arrival and its place name
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WaypointForecast {
    #[serde(flatten)]
    pub waypoint: Waypoint,
    /// `None` when the weather lookup failed for this point
    pub weather: Option<WeatherSnapshot>,
    pub location_name: String,
}

impl WaypointForecast {
    /// A waypoint that has not been looked up yet
    #[must_use]
    pub fn pending(waypoint: Waypoint) -> Self {
        Self {
            waypoint,
            weather: None,
            location_name: String::new(),
        }
    }
}
