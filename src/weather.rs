//! Point forecasts from the Open-Meteo API

use crate::config::{ServicesConfig, TripConfig};
use crate::forecast::PointForecast;
use crate::http::{self, build_client};
use crate::models::{Coordinate, HourlyRecord, WeatherSnapshot};
use crate::{Result, RoadcastError};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, instrument};

const HOURLY_VARIABLES: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,precipitation,precipitation_probability,weather_code,wind_speed_10m,wind_direction_10m,wind_gusts_10m,pressure_msl";
const CURRENT_VARIABLES: &str = "temperature_2m,apparent_temperature,relative_humidity_2m,precipitation,weather_code,wind_speed_10m,wind_direction_10m,wind_gusts_10m,pressure_msl";

/// Source of hourly forecasts for a single point
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fails with [`RoadcastError::WeatherUnavailable`]
    async fn point_forecast(&self, coordinate: Coordinate) -> Result<PointForecast>;
}

/// Open-Meteo forecast client (no API key required)
pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    base_url: String,
    forecast_days: u32,
}

impl OpenMeteoClient {
    pub fn new(services: &ServicesConfig, trip: &TripConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(services, services.max_retries)?,
            base_url: services.weather_base_url.trim_end_matches('/').to_string(),
            forecast_days: trip.forecast_days,
        })
    }

    fn forecast_url(&self, coordinate: Coordinate) -> String {
        format!(
            "{}/forecast?latitude={}&longitude={}&hourly={}&current={}&temperature_unit=fahrenheit&wind_speed_unit=mph&precipitation_unit=inch&timezone=GMT&forecast_days={}",
            self.base_url, coordinate.lat, coordinate.lon, HOURLY_VARIABLES, CURRENT_VARIABLES, self.forecast_days
        )
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    #[instrument(skip(self))]
    async fn point_forecast(&self, coordinate: Coordinate) -> Result<PointForecast> {
        let url = self.forecast_url(coordinate);
        let response: openmeteo::ForecastResponse = http::get_json(&self.client, &url)
            .await
            .map_err(|e| {
                RoadcastError::weather_unavailable(format!(
                    "{} at {}",
                    e,
                    coordinate.format_coordinates()
                ))
            })?;

        let forecast = PointForecast::from(response);
        if forecast.hourly.is_empty() && forecast.current.is_none() {
            return Err(RoadcastError::weather_unavailable(format!(
                "empty forecast at {}",
                coordinate.format_coordinates()
            )));
        }

        debug!(
            "Retrieved {} hourly records for {}",
            forecast.hourly.len(),
            coordinate.format_coordinates()
        );
        Ok(forecast)
    }
}

/// `OpenMeteo` API response structures and conversion utilities
mod openmeteo {
    use super::{HourlyRecord, PointForecast, WeatherSnapshot};
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        pub hourly: Option<HourlyData>,
        pub current: Option<CurrentData>,
    }

    /// Parallel arrays, one entry per hour; any value may be null
    #[derive(Debug, Deserialize)]
    pub struct HourlyData {
        pub time: Vec<String>,
        #[serde(rename = "temperature_2m")]
        pub temperature: Option<Vec<Option<f64>>>,
        pub apparent_temperature: Option<Vec<Option<f64>>>,
        #[serde(rename = "relative_humidity_2m")]
        pub humidity: Option<Vec<Option<f64>>>,
        pub precipitation: Option<Vec<Option<f64>>>,
        pub precipitation_probability: Option<Vec<Option<f64>>>,
        pub weather_code: Option<Vec<Option<f64>>>,
        #[serde(rename = "wind_speed_10m")]
        pub wind_speed: Option<Vec<Option<f64>>>,
        #[serde(rename = "wind_direction_10m")]
        pub wind_direction: Option<Vec<Option<f64>>>,
        #[serde(rename = "wind_gusts_10m")]
        pub wind_gusts: Option<Vec<Option<f64>>>,
        #[serde(rename = "pressure_msl")]
        pub pressure: Option<Vec<Option<f64>>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CurrentData {
        #[serde(rename = "temperature_2m")]
        pub temperature: Option<f64>,
        pub apparent_temperature: Option<f64>,
        #[serde(rename = "relative_humidity_2m")]
        pub humidity: Option<f64>,
        pub precipitation: Option<f64>,
        pub weather_code: Option<f64>,
        #[serde(rename = "wind_speed_10m")]
        pub wind_speed: Option<f64>,
        #[serde(rename = "wind_direction_10m")]
        pub wind_direction: Option<f64>,
        #[serde(rename = "wind_gusts_10m")]
        pub wind_gusts: Option<f64>,
        #[serde(rename = "pressure_msl")]
        pub pressure: Option<f64>,
    }

    /// Times come back as `2024-01-01T13:00` in the requested (GMT) zone
    pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
            .ok()
            .map(|dt| dt.and_utc())
    }

    fn at(series: &Option<Vec<Option<f64>>>, i: usize) -> Option<f64> {
        series.as_ref().and_then(|values| values.get(i)).copied().flatten()
    }

    fn percent(value: f64) -> u8 {
        value.round().clamp(0.0, 100.0) as u8
    }

    fn degrees(value: f64) -> u16 {
        value.round().rem_euclid(360.0) as u16
    }

    fn code(value: f64) -> u8 {
        value.round().clamp(0.0, 255.0) as u8
    }

    impl HourlyData {
        fn record(&self, i: usize) -> Option<HourlyRecord> {
            let time = parse_time(self.time.get(i)?)?;
            // an hour without temperature is not worth showing
            let temperature_f = at(&self.temperature, i)?;

            Some(HourlyRecord {
                time,
                snapshot: WeatherSnapshot {
                    temperature_f,
                    apparent_temperature_f: at(&self.apparent_temperature, i).unwrap_or(temperature_f),
                    wind_speed_mph: at(&self.wind_speed, i).unwrap_or(0.0),
                    wind_gust_mph: at(&self.wind_gusts, i).unwrap_or(0.0),
                    wind_direction_deg: at(&self.wind_direction, i).map_or(0, degrees),
                    humidity_pct: at(&self.humidity, i).map_or(0, percent),
                    precipitation_in: at(&self.precipitation, i).unwrap_or(0.0),
                    precipitation_probability_pct: at(&self.precipitation_probability, i).map(percent),
                    pressure_hpa: at(&self.pressure, i).unwrap_or(1013.25),
                    weather_code: at(&self.weather_code, i).map_or(0, code),
                    is_forecast: true,
                    forecast_hour: Some(time),
                },
            })
        }
    }

    impl CurrentData {
        fn snapshot(&self) -> Option<WeatherSnapshot> {
            let temperature_f = self.temperature?;
            Some(WeatherSnapshot {
                temperature_f,
                apparent_temperature_f: self.apparent_temperature.unwrap_or(temperature_f),
                wind_speed_mph: self.wind_speed.unwrap_or(0.0),
                wind_gust_mph: self.wind_gusts.unwrap_or(0.0),
                wind_direction_deg: self.wind_direction.map_or(0, degrees),
                humidity_pct: self.humidity.map_or(0, percent),
                precipitation_in: self.precipitation.unwrap_or(0.0),
                precipitation_probability_pct: None,
                pressure_hpa: self.pressure.unwrap_or(1013.25),
                weather_code: self.weather_code.map_or(0, code),
                is_forecast: false,
                forecast_hour: None,
            })
        }
    }

    impl From<ForecastResponse> for PointForecast {
        fn from(response: ForecastResponse) -> Self {
            let mut hourly: Vec<HourlyRecord> = response
                .hourly
                .as_ref()
                .map(|data| (0..data.time.len()).filter_map(|i| data.record(i)).collect())
                .unwrap_or_default();
            hourly.sort_by_key(|record| record.time);

            Self {
                hourly,
                current: response.current.as_ref().and_then(CurrentData::snapshot),
            }
        }
    }
}
