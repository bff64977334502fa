//! Forecast projection: picking the hourly record for an arrival time

use crate::models::{HourlyRecord, WeatherSnapshot};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Anything that sits on an hourly timeline
pub trait HourlyEntry {
    fn time(&self) -> DateTime<Utc>;
}

impl HourlyEntry for HourlyRecord {
    fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Truncate to the top of the hour
#[must_use]
pub fn floor_hour(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_trunc(TimeDelta::hours(1)).unwrap_or(time)
}

/// First record at or after the hour containing `target`.
///
/// Only looks forward: a target past the end of the series yields `None`
/// even if an earlier record exists. `series` must be sorted ascending.
#[must_use]
pub fn project_for_hour<T: HourlyEntry>(series: &[T], target: DateTime<Utc>) -> Option<&T> {
    let hour = floor_hour(target);
    series.iter().find(|record| record.time() >= hour)
}

/// Everything the weather service returned for one point
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PointForecast {
    /// Ascending by time
    pub hourly: Vec<HourlyRecord>,
    /// Current conditions, used when the arrival is beyond the hourly range
    pub current: Option<WeatherSnapshot>,
}

impl PointForecast {
    /// Weather expected at `arrival`, falling back to current conditions
    #[must_use]
    pub fn snapshot_at(&self, arrival: DateTime<Utc>) -> Option<WeatherSnapshot> {
        if let Some(record) = project_for_hour(&self.hourly, arrival) {
            let mut snapshot = record.snapshot.clone();
            snapshot.is_forecast = true;
            snapshot.forecast_hour = Some(record.time);
            return Some(snapshot);
        }

        self.current.clone().map(|mut snapshot| {
            snapshot.is_forecast = false;
            snapshot.forecast_hour = None;
            snapshot
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn snapshot(temperature_f: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_f,
            apparent_temperature_f: temperature_f,
            wind_speed_mph: 5.0,
            wind_gust_mph: 8.0,
            wind_direction_deg: 180,
            humidity_pct: 50,
            precipitation_in: 0.0,
            precipitation_probability_pct: None,
            pressure_hpa: 1013.0,
            weather_code: 0,
            is_forecast: false,
            forecast_hour: None,
        }
    }

    fn series(hours: &[u32]) -> Vec<HourlyRecord> {
        hours
            .iter()
            .map(|&h| HourlyRecord {
                time: at(h, 0),
                snapshot: snapshot(f64::from(h)),
            })
            .collect()
    }

    #[rstest]
    #[case(at(12, 0), Some(12))]
    #[case(at(12, 39), Some(12))]
    #[case(at(13, 59), Some(13))]
    #[case(at(9, 30), Some(10))]
    #[case(at(15, 0), Some(15))]
    #[case(at(15, 1), Some(15))]
    #[case(at(16, 0), None)]
    fn test_project_for_hour(#[case] target: DateTime<Utc>, #[case] expected_hour: Option<u32>) {
        let records = series(&[10, 11, 12, 13, 14, 15]);
        let found = project_for_hour(&records, target).map(|r| r.time);
        assert_eq!(found, expected_hour.map(|h| at(h, 0)));
    }

    #[test]
    fn test_project_skips_gaps_forward() {
        let records = series(&[10, 14]);
        let found = project_for_hour(&records, at(11, 20)).unwrap();
        assert_eq!(found.time, at(14, 0));
    }

    #[test]
    fn test_project_empty_series() {
        let records: Vec<HourlyRecord> = Vec::new();
        assert!(project_for_hour(&records, at(12, 0)).is_none());
    }

    #[test]
    fn test_snapshot_at_marks_forecast_hour() {
        let forecast = PointForecast {
            hourly: series(&[12, 13]),
            current: Some(snapshot(40.0)),
        };
        let weather = forecast.snapshot_at(at(13, 34)).unwrap();
        assert!(weather.is_forecast);
        assert_eq!(weather.forecast_hour, Some(at(13, 0)));
        assert_eq!(weather.temperature_f, 13.0);
    }

    #[test]
    fn test_snapshot_at_falls_back_to_current() {
        let forecast = PointForecast {
            hourly: series(&[12, 13]),
            current: Some(snapshot(40.0)),
        };
        let weather = forecast.snapshot_at(at(18, 0)).unwrap();
        assert!(!weather.is_forecast);
        assert_eq!(weather.forecast_hour, None);
        assert_eq!(weather.temperature_f, 40.0);

        let empty = PointForecast::default();
        assert!(empty.snapshot_at(at(12, 0)).is_none());
    }
}
