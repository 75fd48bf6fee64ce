//! Regime Masking & Combination Module
//!
//! Classifies every timestep into exactly one sun/surface regime, applies
//! the per-regime masking to irradiance components and sums them.

use std::fmt;

use serde::Serialize;

use crate::constants::Constants;
use crate::error::PhysicalRangeWarning;
use crate::position::HorizonProfile;

// ===================== REGIME =====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Regime {
    /// Sun below the astronomical horizon: every component is zero
    BelowHorizon,
    /// Sun above the horizon but behind the panel or the terrain horizon
    AboveHorizonShaded,
    /// Sun too low for the beam formulas: direct forced to zero
    LowAngle,
    AboveHorizonSunlit,
}

impl Regime {
    pub const ALL: [Regime; 4] = [
        Regime::BelowHorizon,
        Regime::AboveHorizonShaded,
        Regime::LowAngle,
        Regime::AboveHorizonSunlit,
    ];

    /// Classify one timestep.
    ///
    /// Precedence: below horizon, then shaded, then low angle, then sunlit.
    pub fn classify(altitude: f64, incidence: f64, low_angle_threshold: f64, terrain_shaded: bool) -> Self {
        if altitude < 0.0 {
            Regime::BelowHorizon
        } else if incidence.sin() < 0.0 || terrain_shaded {
            Regime::AboveHorizonShaded
        } else if altitude < low_angle_threshold {
            Regime::LowAngle
        } else {
            Regime::AboveHorizonSunlit
        }
    }

    /// Whether the beam reaches the inclined surface.
    pub fn receives_direct(self) -> bool {
        self == Regime::AboveHorizonSunlit
    }

    pub fn name(self) -> &'static str {
        match self {
            Regime::BelowHorizon => "below-horizon",
            Regime::AboveHorizonShaded => "shaded",
            Regime::LowAngle => "low-angle",
            Regime::AboveHorizonSunlit => "sunlit",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ===================== MASK =====================

/// Per-timestep regime classification aligned with the time index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeMask {
    regimes: Vec<Regime>,
    /// Sun above the low-angle threshold and not hidden by the terrain
    horizontal_beam: Vec<bool>,
}

impl RegimeMask {
    pub fn classify(
        altitude: &[f64],
        incidence: &[f64],
        azimuth: &[f64],
        low_angle_threshold: f64,
        horizon: Option<&HorizonProfile>,
    ) -> Self {
        let terrain_shaded: Vec<bool> = altitude
            .iter()
            .zip(azimuth)
            .map(|(&alt, &az)| alt >= 0.0 && horizon.is_some_and(|p| p.obstructs(alt, az)))
            .collect();
        let regimes = altitude
            .iter()
            .zip(incidence)
            .zip(&terrain_shaded)
            .map(|((&alt, &inc), &shaded)| Regime::classify(alt, inc, low_angle_threshold, shaded))
            .collect();
        let horizontal_beam = altitude
            .iter()
            .zip(&terrain_shaded)
            .map(|(&alt, &shaded)| alt >= low_angle_threshold && !shaded)
            .collect();
        Self { regimes, horizontal_beam }
    }

    pub fn len(&self) -> usize {
        self.regimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regimes.is_empty()
    }

    pub fn regimes(&self) -> &[Regime] {
        &self.regimes
    }

    pub fn get(&self, i: usize) -> Option<Regime> {
        self.regimes.get(i).copied()
    }

    /// Boolean mask for one regime.
    pub fn mask(&self, regime: Regime) -> Vec<bool> {
        self.regimes.iter().map(|&r| r == regime).collect()
    }

    pub fn count(&self, regime: Regime) -> usize {
        self.regimes.iter().filter(|&&r| r == regime).count()
    }

    /// Whether direct horizontal irradiance reaches the ground at `i`.
    ///
    /// Depends on the sun and the terrain only, never on the panel
    /// orientation: a low sun behind the panel still gets no beam.
    pub fn receives_direct_horizontal(&self, i: usize) -> bool {
        self.horizontal_beam[i]
    }

    /// Every timestep belongs to exactly one regime.
    pub fn is_partition(&self) -> bool {
        let masks: Vec<Vec<bool>> = Regime::ALL.iter().map(|&r| self.mask(r)).collect();
        (0..self.len()).all(|i| masks.iter().filter(|m| m[i]).count() == 1)
    }
}

// ===================== COMBINATION =====================

/// Zero out a component wherever `keep` is false.
pub fn apply_mask(values: &mut [f64], keep: impl Fn(usize) -> bool) {
    for (i, v) in values.iter_mut().enumerate() {
        if !keep(i) {
            *v = 0.0;
        }
    }
}

/// Element-wise sum of aligned components.
pub fn sum_components(components: &[&[f64]]) -> Vec<f64> {
    let len = components.first().map_or(0, |c| c.len());
    (0..len).map(|i| components.iter().map(|c| c[i]).sum()).collect()
}

/// Flag values outside the physically plausible range. Values are not changed.
pub fn check_physical_range(
    component: &'static str,
    values: &[f64],
    constants: &Constants,
) -> Vec<PhysicalRangeWarning> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !constants.is_physically_plausible(**v))
        .map(|(index, &value)| PhysicalRangeWarning {
            component,
            index,
            value,
            lower: constants.lower_physical_limit,
            upper: constants.upper_physical_limit,
        })
        .collect()
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::AngleUnit;
    use std::f64::consts::PI;

    #[test]
    fn test_classification_precedence() {
        assert_eq!(Regime::classify(-0.1, -0.5, 0.1, false), Regime::BelowHorizon);
        assert_eq!(Regime::classify(0.05, -0.1, 0.1, false), Regime::AboveHorizonShaded);
        assert_eq!(Regime::classify(0.5, 0.3, 0.1, true), Regime::AboveHorizonShaded);
        assert_eq!(Regime::classify(0.05, 0.1, 0.1, false), Regime::LowAngle);
        assert_eq!(Regime::classify(0.0, 0.0, 0.1, false), Regime::LowAngle);
        assert_eq!(Regime::classify(0.5, 0.3, 0.1, false), Regime::AboveHorizonSunlit);
    }

    #[test]
    fn test_mask_is_partition_over_sweep() {
        let n = 500;
        let altitude: Vec<f64> = (0..n).map(|i| -1.5 + 3.0 * i as f64 / n as f64).collect();
        let incidence: Vec<f64> = (0..n).map(|i| ((i * 7) as f64).sin()).collect();
        let azimuth: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1) % (2.0 * PI)).collect();
        let horizon = HorizonProfile::new(vec![5.0, 15.0, 25.0, 10.0], AngleUnit::Degrees).unwrap();

        for profile in [None, Some(&horizon)] {
            let mask = RegimeMask::classify(&altitude, &incidence, &azimuth, 0.1, profile);
            assert!(mask.is_partition());
            let total: usize = Regime::ALL.iter().map(|&r| mask.count(r)).sum();
            assert_eq!(total, n);
        }
    }

    #[test]
    fn test_terrain_shading_blocks_horizontal_beam() {
        let horizon = HorizonProfile::new(vec![20.0], AngleUnit::Degrees).unwrap();
        let altitude = [10f64.to_radians(), 30f64.to_radians(), 0.5];
        let incidence = [0.2, 0.5, -0.1];
        let azimuth = [PI, PI, PI];
        let mask = RegimeMask::classify(&altitude, &incidence, &azimuth, 0.1, Some(&horizon));
        assert_eq!(mask.get(0), Some(Regime::AboveHorizonShaded));
        assert!(!mask.receives_direct_horizontal(0));
        assert_eq!(mask.get(1), Some(Regime::AboveHorizonSunlit));
        // behind the panel but visible above the terrain
        assert_eq!(mask.get(2), Some(Regime::AboveHorizonShaded));
        assert!(mask.receives_direct_horizontal(2));
    }

    #[test]
    fn test_low_sun_behind_panel_gets_no_horizontal_beam() {
        let altitude = [0.05, 0.05, 0.3];
        let incidence = [-0.2, 0.02, -0.2];
        let azimuth = [PI, PI, PI];
        let mask = RegimeMask::classify(&altitude, &incidence, &azimuth, 0.1, None);
        assert_eq!(mask.get(0), Some(Regime::AboveHorizonShaded));
        assert_eq!(mask.get(1), Some(Regime::LowAngle));
        assert!(!mask.receives_direct_horizontal(0), "low sun behind the panel");
        assert!(!mask.receives_direct_horizontal(1), "low sun in front of the panel");
        assert!(mask.receives_direct_horizontal(2));
    }

    #[test]
    fn test_sum_and_mask() {
        let mut direct = vec![100.0, 200.0, 300.0];
        apply_mask(&mut direct, |i| i != 1);
        let diffuse = [10.0, 20.0, 30.0];
        let reflected = [1.0, 2.0, 3.0];
        let global = sum_components(&[&direct, &diffuse, &reflected]);
        assert_eq!(global, vec![111.0, 22.0, 333.0]);
    }

    #[test]
    fn test_physical_range_warnings() {
        let c = Constants::default();
        let warnings = check_physical_range("global", &[0.0, 2500.0, -10.0, 1999.0], &c);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].index, 1);
        assert_eq!(warnings[1].value, -10.0);
    }
}
