//! Waypoint sampling along a route geometry
//!
//! Waypoints are placed every `interval_miles` of accumulated great-circle
//! distance between consecutive polyline points, while their progress (and so
//! their ETA) is the polyline index fraction. On routes with uneven point
//! density the two can disagree; that mix is kept as-is.

use crate::geo;
use crate::models::{RouteGeometry, Waypoint};
use crate::{Result, RoadcastError};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// Default spacing between sampled waypoints
pub const DEFAULT_INTERVAL_MILES: f64 = 50.0;
/// Multiplier applied to the routing engine's duration estimate
pub const DEFAULT_SPEED_CORRECTION_FACTOR: f64 = 1.27;
/// A final sample closer than this to the destination is merged into it
const DESTINATION_MERGE_MILES: f64 = 10.0;

pub const START_LABEL: &str = "Start";
pub const DESTINATION_LABEL: &str = "Destination";

/// Derives evenly spaced waypoints with projected arrival times
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointSampler {
    interval_miles: f64,
    speed_correction_factor: f64,
}

impl Default for WaypointSampler {
    fn default() -> Self {
        Self {
            interval_miles: DEFAULT_INTERVAL_MILES,
            speed_correction_factor: DEFAULT_SPEED_CORRECTION_FACTOR,
        }
    }
}

impl WaypointSampler {
    pub fn new(interval_miles: f64, speed_correction_factor: f64) -> Result<Self> {
        if !(interval_miles > 0.0) {
            return Err(RoadcastError::validation(format!(
                "Sampling interval must be positive, got: {interval_miles}"
            )));
        }
        if !(speed_correction_factor > 0.0) {
            return Err(RoadcastError::validation(format!(
                "Speed correction factor must be positive, got: {speed_correction_factor}"
            )));
        }
        Ok(Self {
            interval_miles,
            speed_correction_factor,
        })
    }

    #[must_use]
    pub fn interval_miles(&self) -> f64 {
        self.interval_miles
    }

    #[must_use]
    pub fn speed_correction_factor(&self) -> f64 {
        self.speed_correction_factor
    }

    /// Routing duration scaled to realistic travel time
    #[must_use]
    pub fn adjusted_duration(&self, geometry: &RouteGeometry) -> f64 {
        geometry.duration_seconds / self.speed_correction_factor
    }

    /// Sample `geometry` into waypoints, the first labelled "Start" and the
    /// last "Destination"
    pub fn sample(&self, geometry: &RouteGeometry, departure: DateTime<Utc>) -> Result<Vec<Waypoint>> {
        let points = &geometry.coordinates;
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Err(RoadcastError::invalid_geometry("route has no coordinates"));
        };
        if points.len() < 2 {
            return Err(RoadcastError::invalid_geometry(
                "route needs at least 2 coordinates",
            ));
        }

        let adjusted = self.adjusted_duration(geometry);
        let total_miles = geometry.distance_miles();
        let last_index = (points.len() - 1) as f64;

        let mut waypoints = vec![Waypoint {
            coordinate: *first,
            distance_from_start_miles: 0.0,
            route_progress: 0.0,
            label: START_LABEL.to_string(),
            eta_seconds: 0.0,
            eta_time: departure,
        }];

        let mut accumulated = 0.0;
        for (index, pair) in points.windows(2).enumerate() {
            accumulated += geo::distance_miles(&pair[0], &pair[1]);
            if accumulated < self.interval_miles {
                continue;
            }
            accumulated = 0.0;

            let current = index + 1;
            let progress = current as f64 / last_index;
            let eta_seconds = progress * adjusted;
            let miles = (progress * total_miles).round();
            waypoints.push(Waypoint {
                coordinate: pair[1],
                distance_from_start_miles: miles,
                route_progress: progress,
                label: format!("Mile {miles:.0}"),
                eta_seconds,
                eta_time: eta_time(departure, eta_seconds),
            });
        }

        let final_miles = total_miles.round();
        let destination_eta = eta_time(departure, adjusted);
        let last_emitted_miles = waypoints
            .last()
            .map_or(0.0, |w| w.distance_from_start_miles);

        if waypoints.len() == 1 || final_miles - last_emitted_miles > DESTINATION_MERGE_MILES {
            waypoints.push(Waypoint {
                coordinate: *last,
                distance_from_start_miles: final_miles,
                route_progress: 1.0,
                label: DESTINATION_LABEL.to_string(),
                eta_seconds: adjusted,
                eta_time: destination_eta,
            });
        } else if let Some(tail) = waypoints.last_mut() {
            tail.label = DESTINATION_LABEL.to_string();
            tail.route_progress = 1.0;
            tail.distance_from_start_miles = final_miles;
            tail.eta_seconds = adjusted;
            tail.eta_time = destination_eta;
        }

        debug!(
            "Sampled {} waypoints over {:.1} miles ({} points, {:.1} miles of polyline)",
            waypoints.len(),
            total_miles,
            points.len(),
            geo::polyline_length_miles(points)
        );
        Ok(waypoints)
    }

    /// Re-project arrival times for a new departure without resampling
    pub fn recompute_etas(
        &self,
        waypoints: &mut [Waypoint],
        geometry: &RouteGeometry,
        departure: DateTime<Utc>,
    ) {
        let adjusted = self.adjusted_duration(geometry);
        for waypoint in waypoints {
            waypoint.eta_seconds = waypoint.route_progress * adjusted;
            waypoint.eta_time = eta_time(departure, waypoint.eta_seconds);
        }
    }
}

fn eta_time(departure: DateTime<Utc>, eta_seconds: f64) -> DateTime<Utc> {
    departure + TimeDelta::milliseconds((eta_seconds * 1000.0).round() as i64)
}
