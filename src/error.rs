//! Error types and handling for `Roadcast`

use serde::Serialize;
use thiserror::Error;

/// Main error type for the `Roadcast` library
#[derive(Error, Debug)]
pub enum RoadcastError {
    /// The routing service returned no usable route or could not be reached
    #[error("Route unavailable: {message}")]
    RouteUnavailable { message: String },

    /// A route geometry too degenerate to sample
    #[error("Invalid route geometry: {message}")]
    InvalidGeometry { message: String },

    /// The weather service failed for a single point
    #[error("Weather unavailable: {message}")]
    WeatherUnavailable { message: String },

    /// The reverse geocoder failed for a single point
    #[error("Place unavailable: {message}")]
    PlaceUnavailable { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Discriminant of [`RoadcastError`], cheap to copy into session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    RouteUnavailable,
    InvalidGeometry,
    WeatherUnavailable,
    PlaceUnavailable,
    Config,
    Validation,
    Io,
}

impl RoadcastError {
    /// Create a new route error
    pub fn route_unavailable<S: Into<String>>(message: S) -> Self {
        Self::RouteUnavailable {
            message: message.into(),
        }
    }

    /// Create a new geometry error
    pub fn invalid_geometry<S: Into<String>>(message: S) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }

    /// Create a new weather error
    pub fn weather_unavailable<S: Into<String>>(message: S) -> Self {
        Self::WeatherUnavailable {
            message: message.into(),
        }
    }

    /// Create a new reverse geocoding error
    pub fn place_unavailable<S: Into<String>>(message: S) -> Self {
        Self::PlaceUnavailable {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RouteUnavailable { .. } => ErrorKind::RouteUnavailable,
            Self::InvalidGeometry { .. } => ErrorKind::InvalidGeometry,
            Self::WeatherUnavailable { .. } => ErrorKind::WeatherUnavailable,
            Self::PlaceUnavailable { .. } => ErrorKind::PlaceUnavailable,
            Self::Config { .. } => ErrorKind::Config,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RouteUnavailable { .. } => {
                "Unable to find a driving route. Check the destination and try again.".to_string()
            }
            Self::InvalidGeometry { .. } => {
                "The routing service returned an unusable route. Please try again.".to_string()
            }
            Self::WeatherUnavailable { .. } => "Weather unavailable".to_string(),
            Self::PlaceUnavailable { .. } => "Place name unavailable".to_string(),
            Self::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            Self::Validation { message } => {
                format!("Invalid input: {message}")
            }
            Self::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
