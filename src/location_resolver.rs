//! Reverse geocoding of waypoints into human-readable place names
//!
//! Resolution never fails: when the service is unreachable or knows nothing
//! useful about a point, a coordinate-based fallback name is returned instead.

use crate::cache::Cache;
use crate::config::{CacheConfig, ServicesConfig};
use crate::http::{self, build_client};
use crate::models::Coordinate;
use crate::{Result, RoadcastError};
use async_trait::async_trait;
use rand::RngExt;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Turns a coordinate into a short display name
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, coordinate: Coordinate) -> String;
}

/// Name used when nothing better is known about a point
#[must_use]
pub fn fallback_name(coordinate: Coordinate) -> String {
    format!("Near {:.2}, {:.2}", coordinate.lat, coordinate.lon)
}

/// Two-letter postal code for a US state name, if it is one
#[must_use]
pub fn state_abbreviation(state: &str) -> Option<&'static str> {
    let code = match state {
        "Alabama" => "AL",
        "Alaska" => "AK",
        "Arizona" => "AZ",
        "Arkansas" => "AR",
        "California" => "CA",
        "Colorado" => "CO",
        "Connecticut" => "CT",
        "Delaware" => "DE",
        "District of Columbia" => "DC",
        "Florida" => "FL",
        "Georgia" => "GA",
        "Hawaii" => "HI",
        "Idaho" => "ID",
        "Illinois" => "IL",
        "Indiana" => "IN",
        "Iowa" => "IA",
        "Kansas" => "KS",
        "Kentucky" => "KY",
        "Louisiana" => "LA",
        "Maine" => "ME",
        "Maryland" => "MD",
        "Massachusetts" => "MA",
        "Michigan" => "MI",
        "Minnesota" => "MN",
        "Mississippi" => "MS",
        "Missouri" => "MO",
        "Montana" => "MT",
        "Nebraska" => "NE",
        "Nevada" => "NV",
        "New Hampshire" => "NH",
        "New Jersey" => "NJ",
        "New Mexico" => "NM",
        "New York" => "NY",
        "North Carolina" => "NC",
        "North Dakota" => "ND",
        "Ohio" => "OH",
        "Oklahoma" => "OK",
        "Oregon" => "OR",
        "Pennsylvania" => "PA",
        "Rhode Island" => "RI",
        "South Carolina" => "SC",
        "South Dakota" => "SD",
        "Tennessee" => "TN",
        "Texas" => "TX",
        "Utah" => "UT",
        "Vermont" => "VT",
        "Virginia" => "VA",
        "Washington" => "WA",
        "West Virginia" => "WV",
        "Wisconsin" => "WI",
        "Wyoming" => "WY",
        _ => return None,
    };
    Some(code)
}

/// Address block of a Nominatim reverse lookup. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct NominatimAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub hamlet: Option<String>,
    pub municipality: Option<String>,
    pub suburb: Option<String>,
    pub county: Option<String>,
    pub road: Option<String>,
    pub highway: Option<String>,
    pub state: Option<String>,
}

impl NominatimAddress {
    /// Most specific settlement-like name available
    fn place(&self) -> Option<&str> {
        [
            &self.city,
            &self.town,
            &self.village,
            &self.hamlet,
            &self.municipality,
            &self.suburb,
            &self.county,
            &self.road,
            &self.highway,
        ]
        .into_iter()
        .find_map(|field| field.as_deref().filter(|value| !value.trim().is_empty()))
    }

    /// `"Lexington, KY"`, `"Lexington"`, or `None` when no place is known
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let place = self.place()?;
        match self.state.as_deref().filter(|s| !s.is_empty()) {
            Some(state) => Some(format!(
                "{}, {}",
                place,
                state_abbreviation(state).unwrap_or(state)
            )),
            None => Some(place.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<NominatimAddress>,
}

/// Nominatim reverse geocoder with an in-process name cache
pub struct NominatimResolver {
    client: ClientWithMiddleware,
    base_url: String,
    cache: Cache<String>,
    ttl: Duration,
}

impl NominatimResolver {
    pub fn new(services: &ServicesConfig, cache: &CacheConfig) -> Result<Self> {
        let capacity = NonZeroUsize::new(cache.place_capacity)
            .ok_or_else(|| RoadcastError::config("Place cache capacity must be positive"))?;
        Ok(Self {
            client: build_client(services, services.max_retries)?,
            base_url: services
                .reverse_geocoding_base_url
                .trim_end_matches('/')
                .to_string(),
            cache: Cache::new(capacity),
            ttl: Duration::from_secs(u64::from(cache.place_ttl_hours) * 3600),
        })
    }

    async fn lookup(&self, coordinate: Coordinate) -> Result<Option<String>> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=json&addressdetails=1&zoom=10",
            self.base_url, coordinate.lat, coordinate.lon
        );
        let response: ReverseResponse = http::get_json(&self.client, &url)
            .await
            .map_err(RoadcastError::place_unavailable)?;
        Ok(response.address.and_then(|address| address.display_name()))
    }

    /// Spread expiry so names resolved in one batch do not all lapse together
    fn jittered_ttl(&self) -> Duration {
        self.ttl.mul_f64(rand::rng().random_range(0.9..1.1))
    }
}

#[async_trait]
impl PlaceResolver for NominatimResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, coordinate: Coordinate) -> String {
        let key = coordinate.cache_key();
        if let Some(name) = self.cache.get(&key) {
            return name;
        }

        match self.lookup(coordinate).await {
            Ok(Some(name)) => {
                debug!("Resolved {} to {}", coordinate.format_coordinates(), name);
                self.cache.put(&key, name.clone(), self.jittered_ttl());
                name
            }
            Ok(None) => {
                debug!("No place known near {}", coordinate.format_coordinates());
                fallback_name(coordinate)
            }
            Err(e) => {
                warn!("{}", e);
                fallback_name(coordinate)
            }
        }
    }
}
