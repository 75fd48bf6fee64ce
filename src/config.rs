//! Configuration Module
//!
//! Per-invocation options and the TOML settings file. Merge order, from
//! highest priority to lowest:
//! 1. CLI arguments
//! 2. Configuration file (`--config`)
//! 3. Default values

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::astronomy::TimingAlgorithm;
use crate::constants::{ALBEDO_DEFAULT, Constants, SYSTEM_EFFICIENCY_DEFAULT};
use crate::efficiency::{EfficiencyAlgorithm, ModuleTechnology, TemperatureModel};
use crate::error::{ConfigurationError, ValidationError};
use crate::position::{IncidenceAlgorithm, PositionAlgorithm};
use crate::units::{AngleUnit, TimeUnit};

/// Default low-angle threshold in radians (about 5.7°)
pub const LOW_ANGLE_THRESHOLD_DEFAULT: f64 = 0.1;

/// Tilt below which a surface counts as horizontal, radians
pub const FLAT_SURFACE_THRESHOLD_DEFAULT: f64 = 0.0001;

// ===================== ALGORITHM SELECTION =====================

/// Resolve an algorithm name to exactly one variant.
///
/// "all" is rejected explicitly: a run always uses a single model per capability.
pub(crate) fn parse_selection<T: Copy>(
    capability: &'static str,
    value: &str,
    choices: &[(&str, T)],
    expected: &'static str,
) -> Result<T, ValidationError> {
    let normalized = value.trim().to_ascii_lowercase();
    if normalized == "all" {
        return Err(ValidationError::AmbiguousSelection { capability, value: value.to_string() });
    }
    choices
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, variant)| *variant)
        .ok_or_else(|| ValidationError::UnknownAlgorithm {
            capability,
            value: value.to_string(),
            expected,
        })
}

// ===================== PIPELINE OPTIONS =====================

/// Every per-run knob with its documented default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PipelineOptions {
    pub timing: TimingAlgorithm,
    pub position: PositionAlgorithm,
    pub incidence: IncidenceAlgorithm,
    pub efficiency: EfficiencyAlgorithm,
    pub temperature_model: TemperatureModel,
    pub module: ModuleTechnology,
    /// Overrides the module table: `[c0..c6, u0, u1]`
    pub coefficients: Option<Vec<f64>>,

    pub apply_refraction: bool,
    pub apply_angular_loss: bool,
    /// Altitude (radians) under which the beam is ignored
    pub low_angle_threshold: f64,
    pub flat_surface_threshold: f64,

    pub albedo: f64,
    pub system_efficiency: f64,
    /// Installed peak power in kWp
    pub peak_power: f64,
    /// Ratio used by the `fixed` efficiency algorithm
    pub fixed_efficiency: f64,

    pub angle_output_unit: AngleUnit,
    pub time_output_unit: TimeUnit,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            timing: TimingAlgorithm::Noaa,
            position: PositionAlgorithm::Noaa,
            incidence: IncidenceAlgorithm::Iqbal,
            efficiency: EfficiencyAlgorithm::Huld,
            temperature_model: TemperatureModel::Faiman,
            module: ModuleTechnology::CsiFreeStanding,
            coefficients: None,
            apply_refraction: true,
            apply_angular_loss: false,
            low_angle_threshold: LOW_ANGLE_THRESHOLD_DEFAULT,
            flat_surface_threshold: FLAT_SURFACE_THRESHOLD_DEFAULT,
            albedo: ALBEDO_DEFAULT,
            system_efficiency: SYSTEM_EFFICIENCY_DEFAULT,
            peak_power: 1.0,
            fixed_efficiency: 1.0,
            angle_output_unit: AngleUnit::Radians,
            time_output_unit: TimeUnit::Minutes,
        }
    }
}

impl PipelineOptions {
    /// Coefficients in effect: the custom vector if given, else the module table.
    pub fn effective_coefficients(&self) -> Vec<f64> {
        self.coefficients.clone().unwrap_or_else(|| self.module.coefficients().to_vec())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        in_range("albedo", self.albedo, 0.0, 1.0)?;
        in_range("system efficiency", self.system_efficiency, 0.0, 1.0)?;
        in_range("low angle threshold", self.low_angle_threshold, 0.0, std::f64::consts::FRAC_PI_2)?;
        in_range("flat surface threshold", self.flat_surface_threshold, 0.0, std::f64::consts::FRAC_PI_2)?;
        in_range("peak power", self.peak_power, 0.0, f64::MAX)?;
        in_range("fixed efficiency", self.fixed_efficiency, 0.0, f64::MAX)?;
        Ok(())
    }
}

fn in_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange { name, value, min, max });
    }
    Ok(())
}

// ===================== SETTINGS FILE =====================

/// Contents of a TOML settings file:
///
/// ```toml
/// [constants]
/// solar-constant = 1361.0
///
/// [options]
/// position = "jenco"
/// apply-angular-loss = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub constants: Constants,
    pub options: PipelineOptions,
}

impl Settings {
    pub fn from_toml(path: &str, text: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(text)
            .map_err(|source| ConfigurationError::Parse { path: path.to_string(), source })
    }

    /// Load settings from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigurationError::Read { path: shown.clone(), source })?;
        let settings = Self::from_toml(&shown, &text)?;
        tracing::debug!("Loaded settings from {}", shown);
        Ok(settings)
    }
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let o = PipelineOptions::default();
        assert!(o.apply_refraction);
        assert!(!o.apply_angular_loss);
        assert_eq!(o.low_angle_threshold, 0.1);
        assert_eq!(o.system_efficiency, 0.86);
        assert_eq!(o.effective_coefficients().len(), 9);
        assert!(o.validate().is_ok());
    }

    #[test]
    fn test_parse_selection() {
        let choices = [("a", 1), ("b", 2)];
        assert_eq!(parse_selection("test", " B ", &choices, "a, b").unwrap(), 2);
        assert!(matches!(
            parse_selection("test", "ALL", &choices, "a, b"),
            Err(ValidationError::AmbiguousSelection { .. })
        ));
        assert!(matches!(
            parse_selection("test", "c", &choices, "a, b"),
            Err(ValidationError::UnknownAlgorithm { .. })
        ));
    }

    #[test]
    fn test_load_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[constants]
solar-constant = 1367.0

[options]
position = "jenco"
timing = "milne1921"
apply-angular-loss = true
albedo = 0.3
"#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.constants.solar_constant, 1367.0);
        assert_eq!(settings.constants.perigee_offset, 0.048869);
        assert_eq!(settings.options.position, PositionAlgorithm::Jenco);
        assert_eq!(settings.options.timing, TimingAlgorithm::Milne1921);
        assert!(settings.options.apply_angular_loss);
        assert_eq!(settings.options.albedo, 0.3);
        assert_eq!(settings.options.incidence, IncidenceAlgorithm::Iqbal);
    }

    #[test]
    fn test_all_selection_rejected_at_load() {
        let err = Settings::from_toml("inline", "[options]\nposition = \"all\"\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { .. }));
        assert!(err.to_string().contains("inline"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Settings::from_toml("inline", "[options]\nfancy-mode = true\n").is_err());
        assert!(Settings::from_toml("inline", "[weather]\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load("/nonexistent/solarflux.toml").unwrap_err();
        assert!(matches!(err, ConfigurationError::Read { .. }));
    }

    #[test]
    fn test_invalid_options() {
        let o = PipelineOptions { albedo: 1.5, ..Default::default() };
        assert!(o.validate().is_err());
    }
}
