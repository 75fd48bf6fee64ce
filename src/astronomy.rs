//! Astronomical Base Quantities Module
//!
//! Fractional year, equation of time, time offset, true solar time and
//! hour angle. Everything here is a pure function of the time index and,
//! where noted, the observer longitude. Angles are radians, times minutes.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::parse_selection;
use crate::error::ValidationError;
use crate::time::TimeSeriesIndex;

/// Minutes in a day
pub const MINUTES_PER_DAY: f64 = 1440.0;

// ===================== TIMING ALGORITHM =====================

/// Model used for the equation of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimingAlgorithm {
    /// NOAA fractional-year Fourier series
    #[default]
    Noaa,
    /// Milne (1921) day-of-year approximation
    Milne1921,
}

impl TimingAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            TimingAlgorithm::Noaa => "noaa",
            TimingAlgorithm::Milne1921 => "milne1921",
        }
    }
}

impl FromStr for TimingAlgorithm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selection(
            "timing",
            s,
            &[("noaa", TimingAlgorithm::Noaa), ("milne1921", TimingAlgorithm::Milne1921)],
            "noaa, milne1921",
        )
    }
}

impl TryFrom<String> for TimingAlgorithm {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimingAlgorithm> for String {
    fn from(a: TimingAlgorithm) -> Self {
        a.name().to_string()
    }
}

impl fmt::Display for TimingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ===================== SCALAR KERNELS =====================

/// NOAA fractional year γ in radians.
///
/// Clamped at zero: the first half day of January would otherwise go
/// slightly negative.
pub fn fractional_year(day_of_year: u32, days_in_year: u32, decimal_hour: f64) -> f64 {
    let gamma = 2.0 * PI / days_in_year as f64
        * (day_of_year as f64 - 1.0 + (decimal_hour - 12.0) / 24.0);
    gamma.max(0.0)
}

/// NOAA equation of time in minutes.
pub fn equation_of_time_noaa(fractional_year: f64) -> f64 {
    let g = fractional_year;
    229.18
        * (0.000075 + 0.001868 * g.cos()
            - 0.032077 * g.sin()
            - 0.014615 * (2.0 * g).cos()
            - 0.040849 * (2.0 * g).sin())
}

/// Milne (1921) equation of time in minutes.
pub fn equation_of_time_milne(day_of_year: u32) -> f64 {
    let b = 2.0 * PI * (day_of_year as f64 - 81.0) / 365.0;
    9.87 * (2.0 * b).sin() - 7.53 * b.cos() - 1.5 * b.sin()
}

/// Hour angle in radians from true solar time in minutes.
///
/// Zero at solar noon, negative in the morning.
pub fn hour_angle_from_true_solar_time(true_solar_time: f64) -> f64 {
    let h = (true_solar_time - 720.0) * PI / 720.0;
    if h < -PI { h + 2.0 * PI } else { h }
}

// ===================== VECTOR QUANTITIES =====================

pub fn fractional_year_series(index: &TimeSeriesIndex) -> Vec<f64> {
    let doy = index.day_of_year();
    let diy = index.days_in_year();
    let hours = index.decimal_hours();
    doy.iter()
        .zip(&diy)
        .zip(&hours)
        .map(|((&d, &n), &h)| fractional_year(d, n, h))
        .collect()
}

pub fn equation_of_time(algorithm: TimingAlgorithm, index: &TimeSeriesIndex) -> Vec<f64> {
    match algorithm {
        TimingAlgorithm::Noaa => {
            fractional_year_series(index).into_iter().map(equation_of_time_noaa).collect()
        }
        TimingAlgorithm::Milne1921 => {
            index.day_of_year().into_iter().map(equation_of_time_milne).collect()
        }
    }
}

/// Time offset in minutes: `4·longitude° − utc_offset + EoT`.
pub fn time_offset(index: &TimeSeriesIndex, longitude: f64, equation_of_time: &[f64]) -> Vec<f64> {
    let lon_minutes = 4.0 * longitude.to_degrees();
    index
        .utc_offset_minutes()
        .iter()
        .zip(equation_of_time)
        .map(|(tz, eot)| lon_minutes - tz + eot)
        .collect()
}

/// True solar time in minutes within [0, 1440).
pub fn true_solar_time(index: &TimeSeriesIndex, time_offset: &[f64]) -> Vec<f64> {
    index
        .local_minutes()
        .iter()
        .zip(time_offset)
        .map(|(local, offset)| (local + offset).rem_euclid(MINUTES_PER_DAY))
        .collect()
}

pub fn hour_angle(true_solar_time: &[f64]) -> Vec<f64> {
    true_solar_time.iter().map(|&t| hour_angle_from_true_solar_time(t)).collect()
}

// ===================== SOLAR TIME BUNDLE =====================

/// All timing quantities for one index and longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarTime {
    pub algorithm: TimingAlgorithm,
    pub fractional_year: Vec<f64>,
    pub equation_of_time: Vec<f64>,
    pub time_offset: Vec<f64>,
    pub true_solar_time: Vec<f64>,
    pub hour_angle: Vec<f64>,
}

impl SolarTime {
    pub fn compute(index: &TimeSeriesIndex, longitude: f64, algorithm: TimingAlgorithm) -> Self {
        let fractional_year = fractional_year_series(index);
        let equation_of_time = equation_of_time(algorithm, index);
        let time_offset = time_offset(index, longitude, &equation_of_time);
        let true_solar_time = true_solar_time(index, &time_offset);
        let hour_angle = hour_angle(&true_solar_time);
        Self { algorithm, fractional_year, equation_of_time, time_offset, true_solar_time, hour_angle }
    }
}

// ===================== TESTS =====================
