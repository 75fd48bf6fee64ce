//! Atmospheric Correction Module
//!
//! Refraction, relative optical air mass, Rayleigh optical thickness and
//! the Linke turbidity correction (Hofierka & Šúri / ESRA clear-sky model).

use crate::error::ValidationError;

/// Altitude below which refraction is not applied (−0.575°)
pub const REFRACTION_ALTITUDE_LIMIT: f64 = -0.010036;

/// Scale height of the Rayleigh atmosphere in metres
pub const RAYLEIGH_SCALE_HEIGHT: f64 = 8434.5;

/// Air mass above which the low-sun Rayleigh fit is used
pub const RAYLEIGH_AIR_MASS_LIMIT: f64 = 20.0;

pub const LINKE_CORRECTION_FACTOR: f64 = -0.8662;

// ===================== REFRACTION =====================

/// Hofierka rational refraction correction Δ(h), radians in and out.
pub fn refraction_correction(altitude: f64) -> f64 {
    let h = altitude;
    0.061359 * (0.1594 + 1.123 * h + 0.065656 * h * h) / (1.0 + 28.9344 * h + 277.3971 * h * h)
}

/// Altitude corrected for refraction, or unchanged below the cut-off.
pub fn refracted_altitude(altitude: f64) -> f64 {
    if altitude >= REFRACTION_ALTITUDE_LIMIT {
        altitude + refraction_correction(altitude)
    } else {
        altitude
    }
}

// ===================== AIR MASS =====================

/// Relative optical air mass (Kasten & Young), elevation-corrected.
///
/// Zero when the sun is below the horizon.
pub fn optical_air_mass(elevation: f64, refracted_altitude: f64) -> f64 {
    if refracted_altitude < 0.0 {
        return 0.0;
    }
    let pressure_ratio = (-elevation / RAYLEIGH_SCALE_HEIGHT).exp();
    let h_deg = refracted_altitude.to_degrees();
    pressure_ratio / (refracted_altitude.sin() + 0.50572 * (h_deg + 6.07995).powf(-1.6364))
}

// ===================== RAYLEIGH =====================

/// Rayleigh optical thickness at air mass `m` (Kasten 1996).
///
/// Two separate fits meet at m = 20 without being continuous.
pub fn rayleigh_optical_thickness(m: f64) -> f64 {
    if m <= 0.0 {
        0.0
    } else if m <= RAYLEIGH_AIR_MASS_LIMIT {
        1.0 / (6.6296 + 1.7513 * m - 0.1202 * m.powi(2) + 0.0065 * m.powi(3)
            - 0.00013 * m.powi(4))
    } else {
        1.0 / (10.4 + 0.718 * m)
    }
}

// ===================== TURBIDITY =====================

/// Linke turbidity scaled into the beam attenuation exponent.
pub fn linke_turbidity_correction(linke_turbidity: f64) -> f64 {
    LINKE_CORRECTION_FACTOR * linke_turbidity
}

pub fn validate_linke_turbidity(values: &[f64], min: f64, max: f64) -> Result<(), ValidationError> {
    for &value in values {
        if !(min..=max).contains(&value) {
            return Err(ValidationError::OutOfRange { name: "Linke turbidity", value, min, max });
        }
    }
    Ok(())
}

// ===================== ATMOSPHERIC PROPERTIES =====================

/// Per-timestep atmospheric properties.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmosphericProperties {
    pub optical_air_mass: Vec<f64>,
    pub rayleigh_thickness: Vec<f64>,
    pub linke_corrected: Vec<f64>,
}

impl AtmosphericProperties {
    /// `altitude` is the refraction-corrected altitude; `turbidity` must
    /// already be aligned with it.
    pub fn compute(elevation: f64, altitude: &[f64], turbidity: &[f64]) -> Self {
        let optical_air_mass: Vec<f64> =
            altitude.iter().map(|&h| optical_air_mass(elevation, h)).collect();
        Self::with_air_mass(optical_air_mass, turbidity)
    }

    /// Use a caller-supplied air mass series instead of deriving it.
    pub fn with_air_mass(optical_air_mass: Vec<f64>, turbidity: &[f64]) -> Self {
        let rayleigh_thickness =
            optical_air_mass.iter().map(|&m| rayleigh_optical_thickness(m)).collect();
        let linke_corrected = turbidity.iter().map(|&t| linke_turbidity_correction(t)).collect();
        Self { optical_air_mass, rayleigh_thickness, linke_corrected }
    }
}

// ===================== TESTS =====================
