//! Efficiency & Power Module
//!
//! Photovoltaic conversion efficiency (Huld et al. 2011) with module
//! temperature from the Faiman (2008) model, and the final power output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::parse_selection;
use crate::error::{ConfigurationError, ValidationError};

/// Reference irradiance of standard test conditions (W/m²)
pub const STC_IRRADIANCE: f64 = 1000.0;

/// Reference module temperature of standard test conditions (°C)
pub const STC_TEMPERATURE: f64 = 25.0;

/// Names of the coefficient vector entries, in order.
pub const COEFFICIENT_NAMES: [&str; 9] = ["c0", "c1", "c2", "c3", "c4", "c5", "c6", "u0", "u1"];

const HULD_COEFFICIENTS: usize = 7;
const FAIMAN_COEFFICIENTS: usize = 8;
const FAIMAN_WIND_COEFFICIENTS: usize = 9;

// ===================== MODULE TECHNOLOGY =====================

/// Built-in Huld + Faiman coefficient sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModuleTechnology {
    #[default]
    CsiFreeStanding,
    CsiBuildingIntegrated,
    CisFreeStanding,
    CdteFreeStanding,
}

impl ModuleTechnology {
    pub fn name(self) -> &'static str {
        match self {
            ModuleTechnology::CsiFreeStanding => "csi-free-standing",
            ModuleTechnology::CsiBuildingIntegrated => "csi-building-integrated",
            ModuleTechnology::CisFreeStanding => "cis-free-standing",
            ModuleTechnology::CdteFreeStanding => "cdte-free-standing",
        }
    }

    /// `[c0, c1, c2, c3, c4, c5, c6, u0, u1]`
    pub fn coefficients(self) -> [f64; 9] {
        match self {
            ModuleTechnology::CsiFreeStanding => {
                [1.0, -0.017162, -0.040289, -0.004681, 0.000148, 0.000169, 0.000005, 26.9, 6.2]
            }
            ModuleTechnology::CsiBuildingIntegrated => {
                [1.0, -0.017162, -0.040289, -0.004681, 0.000148, 0.000169, 0.000005, 20.0, 0.0]
            }
            ModuleTechnology::CisFreeStanding => {
                [1.0, -0.005521, -0.038492, -0.003701, -0.000899, -0.001248, 0.000001, 22.64, 3.38]
            }
            ModuleTechnology::CdteFreeStanding => {
                [1.0, -0.103251, -0.040446, -0.001667, -0.002075, -0.001445, -0.000023, 23.37, 5.44]
            }
        }
    }
}

impl FromStr for ModuleTechnology {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selection(
            "module technology",
            s,
            &[
                ("csi-free-standing", ModuleTechnology::CsiFreeStanding),
                ("csi-building-integrated", ModuleTechnology::CsiBuildingIntegrated),
                ("cis-free-standing", ModuleTechnology::CisFreeStanding),
                ("cdte-free-standing", ModuleTechnology::CdteFreeStanding),
            ],
            "csi-free-standing, csi-building-integrated, cis-free-standing, cdte-free-standing",
        )
    }
}

impl TryFrom<String> for ModuleTechnology {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ModuleTechnology> for String {
    fn from(m: ModuleTechnology) -> Self {
        m.name().to_string()
    }
}

impl fmt::Display for ModuleTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ===================== ALGORITHMS =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EfficiencyAlgorithm {
    /// Huld (2011) log-irradiance/temperature polynomial
    #[default]
    Huld,
    /// Constant ratio
    Fixed,
}

impl EfficiencyAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            EfficiencyAlgorithm::Huld => "huld",
            EfficiencyAlgorithm::Fixed => "fixed",
        }
    }
}

impl FromStr for EfficiencyAlgorithm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selection(
            "efficiency",
            s,
            &[("huld", EfficiencyAlgorithm::Huld), ("fixed", EfficiencyAlgorithm::Fixed)],
            "huld, fixed",
        )
    }
}

impl TryFrom<String> for EfficiencyAlgorithm {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EfficiencyAlgorithm> for String {
    fn from(a: EfficiencyAlgorithm) -> Self {
        a.name().to_string()
    }
}

impl fmt::Display for EfficiencyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TemperatureModel {
    #[default]
    Faiman,
    /// Module temperature equals ambient temperature
    None,
}

impl TemperatureModel {
    pub fn name(self) -> &'static str {
        match self {
            TemperatureModel::Faiman => "faiman",
            TemperatureModel::None => "none",
        }
    }
}

impl FromStr for TemperatureModel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selection(
            "temperature model",
            s,
            &[("faiman", TemperatureModel::Faiman), ("none", TemperatureModel::None)],
            "faiman, none",
        )
    }
}

impl TryFrom<String> for TemperatureModel {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TemperatureModel> for String {
    fn from(m: TemperatureModel) -> Self {
        m.name().to_string()
    }
}

impl fmt::Display for TemperatureModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ===================== KERNELS =====================

/// Faiman module temperature: `T + G / (u0 + u1·ws)`.
pub fn faiman_module_temperature(irradiance: f64, temperature: f64, wind_speed: f64, u0: f64, u1: f64) -> f64 {
    let heat_loss = u0 + u1 * wind_speed;
    if heat_loss <= 0.0 {
        return temperature;
    }
    temperature + irradiance / heat_loss
}

/// Huld relative efficiency, normalised by `c0`.
///
/// Zero for non-positive irradiance. The polynomial turns negative at a few
/// W/m², so the result is floored at zero.
pub fn huld_efficiency(irradiance: f64, module_temperature: f64, c: &[f64]) -> f64 {
    let g = irradiance / STC_IRRADIANCE;
    if g <= 0.0 || c.len() < HULD_COEFFICIENTS || c[0] == 0.0 {
        return 0.0;
    }
    let l = g.ln();
    let t = module_temperature - STC_TEMPERATURE;
    let eff = (c[0] + l * (c[1] + c[2] * l) + t * (c[3] + l * (c[4] + c[5] * l) + c[6] * t)) / c[0];
    eff.max(0.0)
}

/// Power output in W for `peak_power` kWp.
pub fn power_output(effective_irradiance: f64, system_efficiency: f64, peak_power: f64) -> f64 {
    effective_irradiance * system_efficiency * peak_power
}

// ===================== EFFICIENCY MODEL =====================

/// A resolved efficiency/temperature model with its coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyModel {
    pub algorithm: EfficiencyAlgorithm,
    pub temperature_model: TemperatureModel,
    coefficients: Vec<f64>,
    fixed_efficiency: f64,
}

impl EfficiencyModel {
    /// Check that `coefficients` covers what the selected models need.
    ///
    /// # Errors
    /// [`ConfigurationError::InsufficientCoefficients`] naming the missing entries.
    pub fn new(
        algorithm: EfficiencyAlgorithm,
        temperature_model: TemperatureModel,
        coefficients: Vec<f64>,
        fixed_efficiency: f64,
        wind_supplied: bool,
    ) -> Result<Self, ConfigurationError> {
        if algorithm == EfficiencyAlgorithm::Huld {
            require("Huld efficiency", HULD_COEFFICIENTS, coefficients.len())?;
        }
        if temperature_model == TemperatureModel::Faiman && algorithm == EfficiencyAlgorithm::Huld {
            let required = if wind_supplied { FAIMAN_WIND_COEFFICIENTS } else { FAIMAN_COEFFICIENTS };
            require("Faiman module temperature", required, coefficients.len())?;
        }
        Ok(Self { algorithm, temperature_model, coefficients, fixed_efficiency })
    }

    pub fn from_technology(
        algorithm: EfficiencyAlgorithm,
        temperature_model: TemperatureModel,
        technology: ModuleTechnology,
    ) -> Self {
        Self {
            algorithm,
            temperature_model,
            coefficients: technology.coefficients().to_vec(),
            fixed_efficiency: 1.0,
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn module_temperature(&self, irradiance: f64, temperature: f64, wind_speed: f64) -> f64 {
        match self.temperature_model {
            TemperatureModel::None => temperature,
            TemperatureModel::Faiman => {
                let u0 = self.coefficients.get(7).copied().unwrap_or(f64::INFINITY);
                let u1 = self.coefficients.get(8).copied().unwrap_or(0.0);
                faiman_module_temperature(irradiance, temperature, wind_speed, u0, u1)
            }
        }
    }

    /// Conversion efficiency ratio for one timestep.
    pub fn conversion_efficiency(&self, irradiance: f64, temperature: f64, wind_speed: f64) -> f64 {
        match self.algorithm {
            EfficiencyAlgorithm::Fixed => self.fixed_efficiency,
            EfficiencyAlgorithm::Huld => {
                let tm = self.module_temperature(irradiance, temperature, wind_speed);
                huld_efficiency(irradiance, tm, &self.coefficients)
            }
        }
    }

    pub fn efficiency_series(&self, irradiance: &[f64], temperature: &[f64], wind_speed: &[f64]) -> Vec<f64> {
        irradiance
            .iter()
            .zip(temperature)
            .zip(wind_speed)
            .map(|((&g, &t), &ws)| self.conversion_efficiency(g, t, ws))
            .collect()
    }
}

fn require(model: &'static str, required: usize, provided: usize) -> Result<(), ConfigurationError> {
    if provided >= required {
        return Ok(());
    }
    Err(ConfigurationError::InsufficientCoefficients {
        model,
        required,
        provided,
        missing: COEFFICIENT_NAMES[provided..required].join(", "),
    })
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;

    fn csi() -> EfficiencyModel {
        EfficiencyModel::from_technology(
            EfficiencyAlgorithm::Huld,
            TemperatureModel::None,
            ModuleTechnology::CsiFreeStanding,
        )
    }

    #[test]
    fn test_huld_at_standard_conditions() {
        let eff = csi().conversion_efficiency(1000.0, 25.0, 0.0);
        assert!((eff - 1.0).abs() < 1e-12, "STC efficiency {}", eff);
    }

    #[test]
    fn test_huld_reference_values() {
        let m = csi();
        let cases = [(500.0, 25.0, 0.992539), (1000.0, 45.0, 0.90838), (200.0, 25.0, 0.923261)];
        for (g, t, expected) in cases {
            let eff = m.conversion_efficiency(g, t, 0.0);
            assert!((eff - expected).abs() < 1e-5, "G={} T={} eff={}", g, t, eff);
        }
    }

    #[test]
    fn test_huld_zero_irradiance() {
        assert_eq!(csi().conversion_efficiency(0.0, 25.0, 0.0), 0.0);
        assert_eq!(csi().conversion_efficiency(-3.0, 25.0, 0.0), 0.0);
    }

    #[test]
    fn test_huld_never_negative_at_dim_light() {
        for g in [0.5, 1.0, 2.0, 3.0] {
            let eff = csi().conversion_efficiency(g, 25.0, 0.0);
            assert!(eff >= 0.0, "G={} eff={}", g, eff);
        }
        assert_eq!(csi().conversion_efficiency(1.0, 25.0, 0.0), 0.0);
        assert!(csi().conversion_efficiency(10.0, 25.0, 0.0) > 0.0);
    }

    #[test]
    fn test_faiman_module_temperature() {
        let m = EfficiencyModel::from_technology(
            EfficiencyAlgorithm::Huld,
            TemperatureModel::Faiman,
            ModuleTechnology::CsiFreeStanding,
        );
        let tm = m.module_temperature(1000.0, 25.0, 0.0);
        assert!((tm - 62.1747).abs() < 1e-3, "module temperature {}", tm);
        // wind cools the module
        assert!(m.module_temperature(1000.0, 25.0, 5.0) < tm);
        // hot module loses efficiency
        assert!(m.conversion_efficiency(1000.0, 25.0, 0.0) < 1.0);
    }

    #[test]
    fn test_insufficient_coefficients_named() {
        let err = EfficiencyModel::new(
            EfficiencyAlgorithm::Huld,
            TemperatureModel::None,
            vec![1.0, -0.01, -0.04],
            1.0,
            false,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("c3, c4, c5, c6"), "Unexpected message: {}", msg);

        let coeffs = ModuleTechnology::CsiFreeStanding.coefficients()[..8].to_vec();
        assert!(
            EfficiencyModel::new(EfficiencyAlgorithm::Huld, TemperatureModel::Faiman, coeffs.clone(), 1.0, false)
                .is_ok()
        );
        let err = EfficiencyModel::new(EfficiencyAlgorithm::Huld, TemperatureModel::Faiman, coeffs, 1.0, true)
            .unwrap_err();
        assert!(err.to_string().contains("missing: u1"));
    }

    #[test]
    fn test_fixed_efficiency() {
        let m = EfficiencyModel::new(EfficiencyAlgorithm::Fixed, TemperatureModel::Faiman, vec![], 0.9, true)
            .unwrap();
        assert_eq!(m.efficiency_series(&[100.0, 800.0], &[25.0, 30.0], &[0.0, 0.0]), vec![0.9, 0.9]);
    }

    #[test]
    fn test_technologies_differ() {
        let cdte = EfficiencyModel::from_technology(
            EfficiencyAlgorithm::Huld,
            TemperatureModel::None,
            ModuleTechnology::CdteFreeStanding,
        );
        let a = cdte.conversion_efficiency(300.0, 35.0, 0.0);
        let b = csi().conversion_efficiency(300.0, 35.0, 0.0);
        assert!((a - b).abs() > 1e-3);
        assert_eq!("cis-free-standing".parse::<ModuleTechnology>().unwrap(), ModuleTechnology::CisFreeStanding);
    }

    #[test]
    fn test_power_output() {
        assert!((power_output(1000.0, 0.86, 1.0) - 860.0).abs() < 1e-9);
        assert!((power_output(500.0, 0.86, 4.0) - 1720.0).abs() < 1e-9);
    }
}
