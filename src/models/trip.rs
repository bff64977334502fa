//! Trip-wide weather summary

use serde::{Deserialize, Serialize};

/// Extremes and hazard counts over every waypoint that has weather
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TripSummary {
    pub max_temp_f: f64,
    pub min_temp_f: f64,
    pub max_temp_location: String,
    pub min_temp_location: String,
    pub max_wind_mph: f64,
    pub max_wind_location: String,
    pub has_precipitation: bool,
    pub precipitation_count: usize,
    pub has_snow: bool,
    pub snow_count: usize,
    pub has_severe: bool,
    pub severe_count: usize,
    /// Number of waypoints the summary was computed from
    pub sample_count: usize,
}
