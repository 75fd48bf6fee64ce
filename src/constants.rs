//! Physical Constants Module
//!
//! Read-only physical and orbital constants shared by every stage. A single
//! [`Constants`] value is built once and passed explicitly into the pipeline.

use serde::{Deserialize, Serialize};

// ===================== DEFAULTS =====================

/// Solar constant (total solar irradiance at 1 AU) in W/m²
pub const SOLAR_CONSTANT: f64 = 1360.8;

/// Amplitude of the Earth-Sun distance correction
pub const ECCENTRICITY_CORRECTION: f64 = 0.03344;

/// Phase of the perigee relative to the start of the year, radians
pub const PERIGEE_OFFSET: f64 = 0.048869;

/// Angular loss coefficient aᵣ for glass-covered modules (Martin & Ruiz)
pub const ANGULAR_LOSS_COEFFICIENT: f64 = 0.155;

/// Lowest irradiance value accepted as physically plausible (W/m²)
pub const LOWER_PHYSICALLY_POSSIBLE_LIMIT: f64 = -4.0;

/// Highest irradiance value accepted as physically plausible (W/m²)
pub const UPPER_PHYSICALLY_POSSIBLE_LIMIT: f64 = 2000.0;

pub const LINKE_TURBIDITY_MINIMUM: f64 = 0.0;
pub const LINKE_TURBIDITY_MAXIMUM: f64 = 8.0;
pub const LINKE_TURBIDITY_DEFAULT: f64 = 2.0;

pub const ALBEDO_DEFAULT: f64 = 0.2;
pub const TEMPERATURE_DEFAULT: f64 = 25.0;
pub const WIND_SPEED_DEFAULT: f64 = 0.0;
pub const SYSTEM_EFFICIENCY_DEFAULT: f64 = 0.86;

// ===================== CONSTANT SET =====================

/// Process-wide physical constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Constants {
    /// Solar constant in W/m²
    pub solar_constant: f64,
    /// Earth orbit eccentricity correction amplitude
    pub eccentricity_correction: f64,
    /// Perigee offset in radians
    pub perigee_offset: f64,
    /// Angular loss coefficient aᵣ
    pub angular_loss_coefficient: f64,
    /// Lower bound of the physically plausible irradiance range (W/m²)
    pub lower_physical_limit: f64,
    /// Upper bound of the physically plausible irradiance range (W/m²)
    pub upper_physical_limit: f64,
    pub linke_turbidity_minimum: f64,
    pub linke_turbidity_maximum: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            solar_constant: SOLAR_CONSTANT,
            eccentricity_correction: ECCENTRICITY_CORRECTION,
            perigee_offset: PERIGEE_OFFSET,
            angular_loss_coefficient: ANGULAR_LOSS_COEFFICIENT,
            lower_physical_limit: LOWER_PHYSICALLY_POSSIBLE_LIMIT,
            upper_physical_limit: UPPER_PHYSICALLY_POSSIBLE_LIMIT,
            linke_turbidity_minimum: LINKE_TURBIDITY_MINIMUM,
            linke_turbidity_maximum: LINKE_TURBIDITY_MAXIMUM,
        }
    }
}

impl Constants {
    pub fn with_solar_constant(mut self, solar_constant: f64) -> Self {
        self.solar_constant = solar_constant;
        self
    }

    pub fn with_eccentricity_correction(mut self, eccentricity: f64) -> Self {
        self.eccentricity_correction = eccentricity;
        self
    }

    pub fn with_perigee_offset(mut self, perigee_offset: f64) -> Self {
        self.perigee_offset = perigee_offset;
        self
    }

    pub fn with_angular_loss_coefficient(mut self, coefficient: f64) -> Self {
        self.angular_loss_coefficient = coefficient;
        self
    }

    /// Whether an irradiance value lies inside the plausible physical range.
    pub fn is_physically_plausible(&self, value: f64) -> bool {
        (self.lower_physical_limit..=self.upper_physical_limit).contains(&value)
    }
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Constants::default();
        assert_eq!(c.solar_constant, 1360.8);
        assert_eq!(c.eccentricity_correction, 0.03344);
        assert_eq!(c.perigee_offset, 0.048869);
        assert_eq!(c.angular_loss_coefficient, 0.155);
    }

    #[test]
    fn test_physical_range() {
        let c = Constants::default();
        assert!(c.is_physically_plausible(0.0));
        assert!(c.is_physically_plausible(-4.0));
        assert!(c.is_physically_plausible(2000.0));
        assert!(!c.is_physically_plausible(-4.5));
        assert!(!c.is_physically_plausible(2000.1));
    }

    #[test]
    fn test_builder_overrides() {
        let c = Constants::default().with_solar_constant(1367.0).with_perigee_offset(0.0);
        assert_eq!(c.solar_constant, 1367.0);
        assert_eq!(c.perigee_offset, 0.0);
        assert_eq!(c.eccentricity_correction, ECCENTRICITY_CORRECTION);
    }
}
