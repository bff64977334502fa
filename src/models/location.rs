//! Location models: geographic coordinates and named places

use crate::RoadcastError;
use serde::{Deserialize, Serialize};

/// A point on the globe in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate, validating latitude and longitude ranges
    pub fn new(lat: f64, lon: f64) -> crate::Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(RoadcastError::validation(format!(
                "Latitude must be between -90 and 90, got: {lat}"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(RoadcastError::validation(format!(
                "Longitude must be between -180 and 180, got: {lon}"
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Build from the `[lon, lat]` pair order used by GeoJSON and OSRM
    #[must_use]
    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[1],
            lon: pair[0],
        }
    }

    /// Format as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.lat * multiplier).round() / multiplier;
        let lon = (self.lon * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Cache key for place lookups, rounded to ~1 km
    #[must_use]
    pub fn cache_key(&self) -> String {
        let (lat, lon) = self.rounded(2);
        format!("place:{lat:.2}:{lon:.2}")
    }
}

/// A named, geocoded place a trip can start or end at
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Place {
    /// Place name (city, town, etc.)
    pub name: String,
    pub coordinate: Coordinate,
    /// First-level administrative region (state, province)
    pub region: Option<String>,
    /// Country name
    pub country: Option<String>,
}

impl Place {
    #[must_use]
    pub fn new(name: String, coordinate: Coordinate) -> Self {
        Self {
            name,
            coordinate,
            region: None,
            country: None,
        }
    }

    /// Name with region for disambiguation, e.g. "Lexington, Kentucky"
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.region {
            Some(region) if !region.is_empty() && region != &self.name => {
                format!("{}, {}", self.name, region)
            }
            _ => self.name.clone(),
        }
    }
}
