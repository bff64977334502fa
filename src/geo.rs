//! Great-circle distance and interpolation along a route

use crate::models::Coordinate;
use haversine::{Location as HaversineLocation, Units, distance};

/// Mean Earth radius used for all mileage
pub const EARTH_RADIUS_MILES: f64 = 3959.0;
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in statute miles
#[must_use]
pub fn distance_miles(a: &Coordinate, b: &Coordinate) -> f64 {
    let from = HaversineLocation {
        latitude: a.lat,
        longitude: a.lon,
    };
    let to = HaversineLocation {
        latitude: b.lat,
        longitude: b.lon,
    };
    // the crate's kilometre radius is exact, rescale the central angle to ours
    distance(from, to, Units::Kilometers) / EARTH_RADIUS_KM * EARTH_RADIUS_MILES
}

/// Sum of the segment lengths of a polyline, in miles
#[must_use]
pub fn polyline_length_miles(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_miles(&pair[0], &pair[1]))
        .sum()
}
