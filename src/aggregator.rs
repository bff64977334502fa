//! Trip-wide aggregation of per-waypoint weather

use crate::models::{TripSummary, WaypointForecast, WeatherSnapshot};

/// Drizzle, rain, snow, showers and thunderstorms
fn is_precipitation(weather: &WeatherSnapshot) -> bool {
    weather.precipitation_in > 0.0 || (51..=99).contains(&weather.weather_code)
}

fn is_snow(weather: &WeatherSnapshot) -> bool {
    matches!(weather.weather_code, 71..=77 | 85..=86)
}

fn is_severe(weather: &WeatherSnapshot) -> bool {
    weather.weather_code >= 95
}

/// Fold waypoint forecasts into a [`TripSummary`].
///
/// Waypoints without weather are ignored; returns `None` when none have any.
/// Ties on an extreme keep the earliest waypoint's location.
#[must_use]
pub fn aggregate(waypoints: &[WaypointForecast]) -> Option<TripSummary> {
    let mut samples = waypoints
        .iter()
        .filter_map(|w| w.weather.as_ref().map(|weather| (w, weather)));

    let (first, first_weather) = samples.next()?;
    let mut summary = TripSummary {
        max_temp_f: first_weather.temperature_f,
        min_temp_f: first_weather.temperature_f,
        max_temp_location: first.location_name.clone(),
        min_temp_location: first.location_name.clone(),
        max_wind_mph: first_weather.wind_speed_mph,
        max_wind_location: first.location_name.clone(),
        has_precipitation: false,
        precipitation_count: 0,
        has_snow: false,
        snow_count: 0,
        has_severe: false,
        severe_count: 0,
        sample_count: 0,
    };

    for (waypoint, weather) in std::iter::once((first, first_weather)).chain(samples) {
        summary.sample_count += 1;

        if weather.temperature_f > summary.max_temp_f {
            summary.max_temp_f = weather.temperature_f;
            summary.max_temp_location = waypoint.location_name.clone();
        }
        if weather.temperature_f < summary.min_temp_f {
            summary.min_temp_f = weather.temperature_f;
            summary.min_temp_location = waypoint.location_name.clone();
        }
        if weather.wind_speed_mph > summary.max_wind_mph {
            summary.max_wind_mph = weather.wind_speed_mph;
            summary.max_wind_location = waypoint.location_name.clone();
        }

        if is_precipitation(weather) {
            summary.precipitation_count += 1;
        }
        if is_snow(weather) {
            summary.snow_count += 1;
        }
        if is_severe(weather) {
            summary.severe_count += 1;
        }
    }

    summary.has_precipitation = summary.precipitation_count > 0;
    summary.has_snow = summary.snow_count > 0;
    summary.has_severe = summary.severe_count > 0;
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, Waypoint};
    use chrono::Utc;
    use rstest::rstest;

    fn weather(temperature_f: f64, wind_speed_mph: f64, weather_code: u8, precipitation_in: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_f,
            apparent_temperature_f: temperature_f,
            wind_speed_mph,
            wind_gust_mph: wind_speed_mph,
            wind_direction_deg: 0,
            humidity_pct: 60,
            precipitation_in,
            precipitation_probability_pct: None,
            pressure_hpa: 1012.0,
            weather_code,
            is_forecast: true,
            forecast_hour: None,
        }
    }

    fn point(name: &str, weather: Option<WeatherSnapshot>) -> WaypointForecast {
        WaypointForecast {
            waypoint: Waypoint {
                coordinate: Coordinate { lat: 0.0, lon: 0.0 },
                distance_from_start_miles: 0.0,
                route_progress: 0.0,
                label: name.to_string(),
                eta_seconds: 0.0,
                eta_time: Utc::now(),
            },
            weather,
            location_name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_and_all_missing() {
        assert!(aggregate(&[]).is_none());
        let points = vec![point("A", None), point("B", None)];
        assert!(aggregate(&points).is_none());
    }

    #[test]
    fn test_extremes_skip_missing_weather() {
        let points = vec![
            point("Lexington, KY", Some(weather(41.0, 8.0, 1, 0.0))),
            point("Nowhere", None),
            point("Cincinnati, OH", Some(weather(35.0, 15.0, 3, 0.0))),
            point("Dayton, OH", Some(weather(48.0, 11.0, 2, 0.0))),
        ];
        let summary = aggregate(&points).unwrap();
        assert_eq!(summary.sample_count, 3);
        assert_eq!(summary.max_temp_f, 48.0);
        assert_eq!(summary.max_temp_location, "Dayton, OH");
        assert_eq!(summary.min_temp_f, 35.0);
        assert_eq!(summary.min_temp_location, "Cincinnati, OH");
        assert_eq!(summary.max_wind_mph, 15.0);
        assert_eq!(summary.max_wind_location, "Cincinnati, OH");
        assert!(!summary.has_precipitation);
        assert!(!summary.has_snow);
        assert!(!summary.has_severe);
    }

    #[test]
    fn test_ties_keep_first_location() {
        let points = vec![
            point("First", Some(weather(50.0, 10.0, 0, 0.0))),
            point("Second", Some(weather(50.0, 10.0, 0, 0.0))),
        ];
        let summary = aggregate(&points).unwrap();
        assert_eq!(summary.max_temp_location, "First");
        assert_eq!(summary.min_temp_location, "First");
        assert_eq!(summary.max_wind_location, "First");
    }

    #[test]
    fn test_thunderstorms_count_as_severe_and_precipitation() {
        let points = vec![
            point("A", Some(weather(70.0, 5.0, 1, 0.0))),
            point("B", Some(weather(71.0, 5.0, 97, 0.0))),
            point("C", Some(weather(72.0, 5.0, 1, 0.0))),
            point("D", Some(weather(73.0, 5.0, 97, 0.0))),
            point("E", Some(weather(74.0, 5.0, 1, 0.0))),
        ];
        let summary = aggregate(&points).unwrap();
        assert!(summary.has_severe);
        assert_eq!(summary.severe_count, 2);
        assert!(summary.has_precipitation);
        assert_eq!(summary.precipitation_count, 2);
        assert!(!summary.has_snow);
        assert_eq!(summary.sample_count, 5);
    }

    #[rstest]
    #[case(0, 0.0, false, false, false)]
    #[case(3, 0.01, true, false, false)]
    #[case(50, 0.0, false, false, false)]
    #[case(51, 0.0, true, false, false)]
    #[case(61, 0.0, true, false, false)]
    #[case(71, 0.0, true, true, false)]
    #[case(77, 0.0, true, true, false)]
    #[case(80, 0.0, true, false, false)]
    #[case(85, 0.0, true, true, false)]
    #[case(86, 0.0, true, true, false)]
    #[case(95, 0.0, true, false, true)]
    #[case(99, 0.0, true, false, true)]
    fn test_hazard_categories(
        #[case] code: u8,
        #[case] precipitation_in: f64,
        #[case] precipitation: bool,
        #[case] snow: bool,
        #[case] severe: bool,
    ) {
        let summary = aggregate(&[point("X", Some(weather(30.0, 5.0, code, precipitation_in)))]).unwrap();
        assert_eq!(summary.has_precipitation, precipitation);
        assert_eq!(summary.has_snow, snow);
        assert_eq!(summary.has_severe, severe);
    }
}
