//! Error Types Module
//!
//! Error taxonomy for the irradiance pipeline. Validation and configuration
//! problems are detected before any series is computed; arithmetic edge cases
//! only surface as errors from scalar entry points, vector paths substitute a
//! sentinel and record the index instead.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

// ===================== VALIDATION =====================

/// Malformed or ambiguous caller input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Time series index is empty")]
    EmptyIndex,

    #[error("Timestamp #{index} ({current}) is earlier than the previous one ({previous})")]
    NonChronological { index: usize, previous: String, current: String },

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Ambiguous {capability} selection '{value}': exactly one algorithm must be chosen")]
    AmbiguousSelection { capability: &'static str, value: String },

    #[error("Unknown {capability} algorithm '{value}' (expected one of: {expected})")]
    UnknownAlgorithm { capability: &'static str, value: String, expected: &'static str },

    #[error("Series '{name}' has {actual} values but the time index has {expected}")]
    LengthMismatch { name: &'static str, expected: usize, actual: usize },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange { name: &'static str, value: f64, min: f64, max: f64 },

    #[error("Time step must be positive, got {0} minutes")]
    NonPositiveStep(i64),
}

// ===================== CONFIGURATION =====================

/// Inconsistent selection of sub-models or model constants.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Position algorithm '{position}' cannot be combined with timing algorithm '{timing}'")]
    IncompatibleAlgorithms { position: &'static str, timing: &'static str },

    #[error(
        "{model} needs at least {required} coefficients but {provided} were given (missing: {missing})"
    )]
    InsufficientCoefficients {
        model: &'static str,
        required: usize,
        provided: usize,
        missing: String,
    },

    #[error("Could not read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ===================== ARITHMETIC EDGE CASES =====================

/// A near-zero denominator met by a scalar entry point.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("Division by a near-zero {denominator} while computing {quantity}")]
pub struct ArithmeticEdgeCase {
    pub quantity: &'static str,
    pub denominator: &'static str,
}

/// Record of a vector timestep where a fallback value replaced a hazardous division.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArithmeticFallback {
    pub index: usize,
    pub quantity: &'static str,
    pub denominator: &'static str,
    pub substitute: f64,
}

impl ArithmeticFallback {
    /// The error a scalar entry point raises instead of substituting.
    pub fn as_edge_case(&self) -> ArithmeticEdgeCase {
        ArithmeticEdgeCase { quantity: self.quantity, denominator: self.denominator }
    }
}

// ===================== PHYSICAL RANGE =====================

/// Advisory flag for a value outside the accepted physical bounds.
///
/// The value is still returned to the caller unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhysicalRangeWarning {
    pub component: &'static str,
    pub index: usize,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

impl fmt::Display for PhysicalRangeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at #{} is {:.3} W/m², outside [{}, {}]",
            self.component, self.index, self.value, self.lower, self.upper
        )
    }
}

// ===================== CRATE ERROR =====================

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticEdgeCase),

    #[error("Solar position algorithm failed: {0}")]
    Position(String),
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_name_the_offender() {
        let err = ValidationError::AmbiguousSelection { capability: "position", value: "all".into() };
        assert!(err.to_string().contains("'all'"));

        let err = ValidationError::LengthMismatch { name: "temperature", expected: 3, actual: 2 };
        assert_eq!(err.to_string(), "Series 'temperature' has 2 values but the time index has 3");
    }

    #[test]
    fn test_insufficient_coefficients_lists_missing() {
        let err = ConfigurationError::InsufficientCoefficients {
            model: "Faiman",
            required: 9,
            provided: 8,
            missing: "u1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("missing: u1"), "Unexpected message: {}", msg);
    }

    #[test]
    fn test_crate_error_wraps_taxonomy() {
        let err: Error = ArithmeticEdgeCase { quantity: "direct inclined", denominator: "sin(altitude)" }
            .into();
        assert!(matches!(err, Error::Arithmetic(_)));
        assert!(err.to_string().contains("sin(altitude)"));
    }

    #[test]
    fn test_physical_range_warning_display() {
        let w = PhysicalRangeWarning {
            component: "global",
            index: 4,
            value: 2500.0,
            lower: -4.0,
            upper: 2000.0,
        };
        assert_eq!(w.to_string(), "global at #4 is 2500.000 W/m², outside [-4, 2000]");
    }
}
