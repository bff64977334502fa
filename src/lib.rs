//! `Roadcast` - weather along a driving route
//!
//! Samples waypoints along a route, projects each one's arrival time onto an
//! hourly forecast, names it by reverse geocoding and summarizes the trip.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod forecast;
pub mod geo;
pub mod geocoding;
pub mod http;
pub mod location_resolver;
pub mod logging;
pub mod models;
pub mod routing;
pub mod sampler;
pub mod session;
pub mod weather;

// Re-export core types for public API
pub use aggregator::aggregate;
pub use cache::Cache;
pub use config::RoadcastConfig;
pub use error::{ErrorKind, RoadcastError};
pub use forecast::{PointForecast, project_for_hour};
pub use geocoding::{LocationInput, OpenMeteoGeocoder, PlaceSearch};
pub use location_resolver::{NominatimResolver, PlaceResolver};
pub use models::{
    Coordinate, Place, RouteGeometry, RouteOption, TripSummary, Waypoint, WaypointForecast,
    WeatherSnapshot,
};
pub use routing::{OsrmRouteClient, RouteClient};
pub use sampler::WaypointSampler;
pub use session::{Services, SessionSettings, TripSession, TripSnapshot, TripState};
pub use weather::{OpenMeteoClient, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, RoadcastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
