//! Destination search: free-text place lookup and coordinate input parsing

use crate::config::ServicesConfig;
use crate::http::{self, build_client};
use crate::models::{Coordinate, Place};
use crate::{Result, RoadcastError};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Maximum number of candidates requested per search
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// Forward geocoding of a place name into candidate places
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Best match first. An unknown name yields an empty list, not an error.
    async fn search(&self, query: &str) -> Result<Vec<Place>>;
}

/// Location typed by a user, before any lookup
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Coordinates(Coordinate),
    Name(String),
}

impl LocationInput {
    /// Parse `"lat,lon"`, `"lat lon"` or anything else as a place name.
    ///
    /// Out-of-range coordinates fall through to a name search.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RoadcastError::validation("Location cannot be empty"));
        }

        if let Some(coordinate) = Self::parse_coordinates(input) {
            return Ok(Self::Coordinates(coordinate));
        }
        Ok(Self::Name(input.to_string()))
    }

    fn parse_coordinates(input: &str) -> Option<Coordinate> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        let [lat, lon] = parts.as_slice() else {
            return None;
        };
        let lat = lat.parse::<f64>().ok()?;
        let lon = lon.parse::<f64>().ok()?;
        Coordinate::new(lat, lon).ok()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    latitude: f64,
    longitude: f64,
    /// First-level administrative area (state, province)
    admin1: Option<String>,
    country: Option<String>,
}

impl From<SearchResult> for Place {
    fn from(result: SearchResult) -> Self {
        Self {
            name: result.name,
            coordinate: Coordinate {
                lat: result.latitude,
                lon: result.longitude,
            },
            region: result.admin1,
            country: result.country,
        }
    }
}

/// Open-Meteo geocoding API client
pub struct OpenMeteoGeocoder {
    client: ClientWithMiddleware,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(services: &ServicesConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(services, services.max_retries)?,
            base_url: services.geocoding_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PlaceSearch for OpenMeteoGeocoder {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RoadcastError::validation("Search query cannot be empty"));
        }

        let url = format!(
            "{}/search?name={}&count={}&language=en&format=json",
            self.base_url,
            urlencoding::encode(query),
            SEARCH_RESULT_LIMIT
        );
        let response: SearchResponse = http::get_json(&self.client, &url)
            .await
            .map_err(RoadcastError::place_unavailable)?;

        let places: Vec<Place> = response.results.into_iter().map(Place::from).collect();
        debug!("Found {} place(s) for '{}'", places.len(), query);
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn geocoder_for(server: &MockServer) -> OpenMeteoGeocoder {
        let services = ServicesConfig {
            geocoding_base_url: server.uri(),
            max_retries: 0,
            ..ServicesConfig::default()
        };
        OpenMeteoGeocoder::new(&services).unwrap()
    }

    #[rstest]
    #[case("38.0406,-84.5037", 38.0406, -84.5037)]
    #[case("38.0406 -84.5037", 38.0406, -84.5037)]
    #[case(" -33.8688, 151.2093 ", -33.8688, 151.2093)]
    fn test_parse_coordinates(#[case] input: &str, #[case] lat: f64, #[case] lon: f64) {
        assert_eq!(
            LocationInput::parse(input).unwrap(),
            LocationInput::Coordinates(Coordinate { lat, lon })
        );
    }

    #[rstest]
    #[case("Cincinnati")]
    #[case("New York, NY")]
    #[case("91.0,8.0")]
    #[case("1.0,2.0,3.0")]
    fn test_parse_names(#[case] input: &str) {
        assert_eq!(
            LocationInput::parse(input).unwrap(),
            LocationInput::Name(input.trim().to_string())
        );
    }

    #[test]
    fn test_parse_empty_is_rejected() {
        assert!(matches!(
            LocationInput::parse("   "),
            Err(RoadcastError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_returns_places() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("name", "Lexington KY"))
            .and(query_param("count", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"name": "Lexington", "latitude": 37.98869, "longitude": -84.47772,
                     "admin1": "Kentucky", "country": "United States"},
                    {"name": "Lexington", "latitude": 42.44732, "longitude": -71.2245,
                     "admin1": "Massachusetts", "country": "United States"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let places = geocoder_for(&mock_server)
            .search("Lexington KY")
            .await
            .unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].display_name(), "Lexington, Kentucky");
        assert_eq!(places[1].coordinate.lon, -71.2245);
    }

    #[tokio::test]
    async fn test_search_without_results_is_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"generationtime_ms": 0.3})),
            )
            .mount(&mock_server)
            .await;

        let places = geocoder_for(&mock_server).search("Nowhere").await.unwrap();
        assert!(places.is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_is_place_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let err = geocoder_for(&mock_server).search("Lexington").await.unwrap_err();
        assert!(matches!(err, RoadcastError::PlaceUnavailable { .. }));
    }
}
