//! Data models for Roadcast
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and named places
//! - Weather: Point-in-time weather snapshots and hourly records
//! - Route: Route geometry, alternatives and sampled waypoints
//! - Trip: Trip-wide summaries

pub mod location;
pub mod route;
pub mod trip;
pub mod weather;

// Re-export all public types for convenient access
pub use location::{Coordinate, Place};
pub use route::{MILES_PER_METER, RouteGeometry, RouteOption, Waypoint, WaypointForecast};
pub use trip::TripSummary;
pub use weather::{HourlyRecord, WeatherSnapshot};
