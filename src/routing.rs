//! Driving routes from an OSRM-compatible routing service

use crate::config::ServicesConfig;
use crate::http::{self, build_client};
use crate::models::{Coordinate, RouteGeometry};
use crate::{Result, RoadcastError};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{info, instrument};

/// Source of driving routes between two points
#[async_trait]
pub trait RouteClient: Send + Sync {
    /// Route alternatives from `origin` to `destination`, primary first.
    ///
    /// Fails with [`RoadcastError::RouteUnavailable`] when the service is
    /// unreachable or returns nothing usable.
    async fn compute_routes(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Vec<RouteGeometry>>;
}

/// OSRM `route` service client
pub struct OsrmRouteClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OsrmRouteClient {
    /// Routing failures are surfaced to the user directly, so no retries here
    pub fn new(services: &ServicesConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(services, 0)?,
            base_url: services.routing_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn route_url(&self, origin: Coordinate, destination: Coordinate) -> String {
        // OSRM takes lon,lat
        format!(
            "{}/route/v1/driving/{},{};{},{}?alternatives=true&overview=full&geometries=geojson",
            self.base_url, origin.lon, origin.lat, destination.lon, destination.lat
        )
    }
}

#[async_trait]
impl RouteClient for OsrmRouteClient {
    #[instrument(skip(self))]
    async fn compute_routes(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Vec<RouteGeometry>> {
        let url = self.route_url(origin, destination);
        let response: ApiResponse = http::get_json(&self.client, &url)
            .await
            .map_err(RoadcastError::route_unavailable)?;

        if response.code != "Ok" {
            return Err(RoadcastError::route_unavailable(format!(
                "routing service answered {}: {}",
                response.code,
                response.message.unwrap_or_default()
            )));
        }

        let routes: Vec<RouteGeometry> = response
            .routes
            .into_iter()
            .map(RouteGeometry::from)
            .filter(|route| route.coordinates.len() >= 2)
            .collect();

        if routes.is_empty() {
            return Err(RoadcastError::route_unavailable("No routes in response"));
        }

        info!(
            "Found {} route(s), primary {:.1} miles",
            routes.len(),
            routes[0].distance_miles()
        );
        Ok(routes)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    distance: f64,
    duration: f64,
    geometry: ApiGeometry,
}

#[derive(Debug, Deserialize)]
struct ApiGeometry {
    /// `[lon, lat]` pairs
    coordinates: Vec<[f64; 2]>,
}

impl From<ApiRoute> for RouteGeometry {
    fn from(route: ApiRoute) -> Self {
        Self {
            coordinates: route
                .geometry
                .coordinates
                .into_iter()
                .map(Coordinate::from_lon_lat)
                .collect(),
            distance_meters: route.distance.max(0.0),
            duration_seconds: route.duration.max(0.0),
        }
    }
}
