//! Weather snapshot model and display methods

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weather conditions at one point and time, in US customary units
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// Temperature in Fahrenheit
    pub temperature_f: f64,
    /// Feels-like temperature in Fahrenheit
    pub apparent_temperature_f: f64,
    /// Wind speed in mph
    pub wind_speed_mph: f64,
    /// Wind gust speed in mph
    pub wind_gust_mph: f64,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    pub wind_direction_deg: u16,
    /// Relative humidity percentage (0-100)
    pub humidity_pct: u8,
    /// Precipitation amount in inches
    pub precipitation_in: f64,
    /// Probability of precipitation (hourly forecasts only)
    pub precipitation_probability_pct: Option<u8>,
    /// Sea-level pressure in hPa
    pub pressure_hpa: f64,
    /// WMO weather interpretation code
    pub weather_code: u8,
    /// `true` when taken from the hourly forecast, `false` for current conditions
    pub is_forecast: bool,
    /// The forecast hour this snapshot was projected from
    pub forecast_hour: Option<DateTime<Utc>>,
}

/// One entry of an hourly forecast series
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HourlyRecord {
    pub time: DateTime<Utc>,
    pub snapshot: WeatherSnapshot,
}

impl WeatherSnapshot {
    /// Convert WMO weather code to human-readable description
    #[must_use]
    pub fn weather_code_to_description(code: u8) -> &'static str {
        match code {
            0 => "Clear sky",
            1 => "Mainly clear",
            2 => "Partly cloudy",
            3 => "Overcast",
            45 => "Fog",
            48 => "Depositing rime fog",
            51 => "Light drizzle",
            53 => "Moderate drizzle",
            55 => "Dense drizzle",
            56 => "Light freezing drizzle",
            57 => "Dense freezing drizzle",
            61 => "Slight rain",
            63 => "Moderate rain",
            65 => "Heavy rain",
            66 => "Light freezing rain",
            67 => "Heavy freezing rain",
            71 => "Slight snow fall",
            73 => "Moderate snow fall",
            75 => "Heavy snow fall",
            77 => "Snow grains",
            80 => "Slight rain showers",
            81 => "Moderate rain showers",
            82 => "Violent rain showers",
            85 => "Slight snow showers",
            86 => "Heavy snow showers",
            95 => "Thunderstorm",
            96 => "Thunderstorm with slight hail",
            99 => "Thunderstorm with heavy hail",
            _ => "Unknown",
        }
    }

    /// Convert wind direction from degrees to cardinal direction
    #[must_use]
    pub fn wind_direction_to_cardinal(degrees: u16) -> &'static str {
        match degrees {
            0..=11 | 349..=360 => "N",
            12..=33 => "NNE",
            34..=56 => "NE",
            57..=78 => "ENE",
            79..=101 => "E",
            102..=123 => "ESE",
            124..=146 => "SE",
            147..=168 => "SSE",
            169..=191 => "S",
            192..=213 => "SSW",
            214..=236 => "SW",
            237..=258 => "WSW",
            259..=281 => "W",
            282..=303 => "WNW",
            304..=326 => "NW",
            327..=348 => "NNW",
            _ => "Unknown",
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        Self::weather_code_to_description(self.weather_code)
    }

    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.0}°F", self.temperature_f)
    }

    /// Format wind information
    #[must_use]
    pub fn format_wind(&self) -> String {
        let direction = Self::wind_direction_to_cardinal(self.wind_direction_deg);
        format!(
            "{:.0} mph {} (gusts {:.0} mph)",
            self.wind_speed_mph, direction, self.wind_gust_mph
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature_f: 71.6,
            apparent_temperature_f: 70.0,
            wind_speed_mph: 12.4,
            wind_gust_mph: 20.2,
            wind_direction_deg: 225,
            humidity_pct: 55,
            precipitation_in: 0.0,
            precipitation_probability_pct: Some(10),
            pressure_hpa: 1016.2,
            weather_code: 2,
            is_forecast: true,
            forecast_hour: None,
        }
    }

    #[test]
    fn test_wind_direction_to_cardinal() {
        assert_eq!(WeatherSnapshot::wind_direction_to_cardinal(0), "N");
        assert_eq!(WeatherSnapshot::wind_direction_to_cardinal(90), "E");
        assert_eq!(WeatherSnapshot::wind_direction_to_cardinal(180), "S");
        assert_eq!(WeatherSnapshot::wind_direction_to_cardinal(270), "W");
        assert_eq!(WeatherSnapshot::wind_direction_to_cardinal(45), "NE");
    }

    #[test]
    fn test_formatting() {
        let weather = snapshot();
        assert_eq!(weather.format_temperature(), "72°F");
        assert_eq!(weather.format_wind(), "12 mph SW (gusts 20 mph)");
        assert_eq!(weather.description(), "Partly cloudy");
    }
}
