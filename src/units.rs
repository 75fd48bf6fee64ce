//! Angle and Time Unit Module
//!
//! All internal computation runs in radians and minutes; conversion to
//! degrees or hours happens only at the boundary through these helpers.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ===================== ANGLE UNITS =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
}

impl AngleUnit {
    /// Convert a value expressed in `self` into `target`.
    pub fn convert(self, value: f64, target: AngleUnit) -> f64 {
        match (self, target) {
            (AngleUnit::Radians, AngleUnit::Degrees) => value.to_degrees(),
            (AngleUnit::Degrees, AngleUnit::Radians) => value.to_radians(),
            _ => value,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AngleUnit::Radians => "rad",
            AngleUnit::Degrees => "°",
        }
    }
}

impl FromStr for AngleUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "radians" | "rad" => Ok(AngleUnit::Radians),
            "degrees" | "deg" => Ok(AngleUnit::Degrees),
            _ => Err(ValidationError::UnknownAlgorithm {
                capability: "angle unit",
                value: s.to_string(),
                expected: "radians, degrees",
            }),
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AngleUnit::Radians => write!(f, "radians"),
            AngleUnit::Degrees => write!(f, "degrees"),
        }
    }
}

// ===================== ANGLE SERIES =====================

/// A named, unit-tagged angle series aligned with a time index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AngleSeries {
    pub name: &'static str,
    pub unit: AngleUnit,
    pub values: Vec<f64>,
}

impl AngleSeries {
    pub fn from_radians(name: &'static str, values: Vec<f64>) -> Self {
        Self { name, unit: AngleUnit::Radians, values }
    }

    /// Re-express the series in another unit.
    pub fn to_unit(&self, unit: AngleUnit) -> Self {
        let values = self.values.iter().map(|&v| self.unit.convert(v, unit)).collect();
        Self { name: self.name, unit, values }
    }

    pub fn radians(&self) -> Vec<f64> {
        self.to_unit(AngleUnit::Radians).values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ===================== TIME UNITS =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Minutes,
    Hours,
}

impl TimeUnit {
    pub fn from_minutes(self, minutes: f64) -> f64 {
        match self {
            TimeUnit::Minutes => minutes,
            TimeUnit::Hours => minutes / 60.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minutes" | "min" => Ok(TimeUnit::Minutes),
            "hours" | "h" => Ok(TimeUnit::Hours),
            _ => Err(ValidationError::UnknownAlgorithm {
                capability: "time unit",
                value: s.to_string(),
                expected: "minutes, hours",
            }),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Minutes => write!(f, "minutes"),
            TimeUnit::Hours => write!(f, "hours"),
        }
    }
}

// ===================== HELPERS =====================

/// Wrap an angle into (-π, π].
pub fn wrap_to_pi(radians: f64) -> f64 {
    radians.sin().atan2(radians.cos())
}

/// Wrap an angle into [0, 2π).
pub fn wrap_to_two_pi(radians: f64) -> f64 {
    radians.rem_euclid(2.0 * PI)
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_round_trip_is_idempotent() {
        for i in -720..=720 {
            let rad = i as f64 * 0.01;
            let back = AngleUnit::Degrees
                .convert(AngleUnit::Radians.convert(rad, AngleUnit::Degrees), AngleUnit::Radians);
            assert!((back - rad).abs() < 1e-12, "Round trip drifted for {}: {}", rad, back);
        }
    }

    #[test]
    fn test_series_round_trip() {
        let s = AngleSeries::from_radians("altitude", vec![-1.2, 0.0, 0.5, PI / 2.0]);
        let back = s.to_unit(AngleUnit::Degrees).to_unit(AngleUnit::Radians);
        for (a, b) in s.values.iter().zip(&back.values) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(back.name, "altitude");
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("Degrees".parse::<AngleUnit>().unwrap(), AngleUnit::Degrees);
        assert_eq!("rad".parse::<AngleUnit>().unwrap(), AngleUnit::Radians);
        assert!("gradians".parse::<AngleUnit>().is_err());
        assert_eq!("hours".parse::<TimeUnit>().unwrap(), TimeUnit::Hours);
        assert_eq!(TimeUnit::Hours.from_minutes(90.0), 1.5);
    }

    #[test]
    fn test_wrapping() {
        assert!((wrap_to_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_to_two_pi(-PI / 2.0) - 3.0 * PI / 2.0).abs() < 1e-12);
    }
}
