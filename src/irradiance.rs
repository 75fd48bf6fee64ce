//! Irradiance Component Module
//!
//! Clear-sky irradiance components after Hofierka & Šúri (2002), as used by
//! r.sun and PVGIS: extraterrestrial, direct beam, sky diffuse (Muneer
//! sky-view model) and ground reflected.
//!
//! The kernels here are unmasked. Regime masking and summation live in
//! [`crate::regime`], orchestration in [`crate::pipeline`].

use std::f64::consts::PI;

use crate::constants::Constants;
use crate::error::{ArithmeticEdgeCase, ArithmeticFallback};
use crate::position::azimuth_difference;
use crate::regime::Regime;

/// Sky term N used for surfaces in shade
pub const SHADED_SKY_TERM: f64 = 0.25227;

/// Lower bound of a₁·Tn in the diffuse altitude function
const MIN_DIFFUSE_TRANSMISSION_PRODUCT: f64 = 0.0022;

// ===================== EXTRATERRESTRIAL =====================

/// Extraterrestrial normal irradiance G0 (W/m²).
pub fn extraterrestrial_normal(fractional_year: f64, constants: &Constants) -> f64 {
    constants.solar_constant
        * (1.0
            + constants.eccentricity_correction
                * (fractional_year - constants.perigee_offset).cos())
}

/// Extraterrestrial irradiance on a horizontal plane.
pub fn extraterrestrial_horizontal(extraterrestrial_normal: f64, altitude: f64) -> f64 {
    extraterrestrial_normal * altitude.sin()
}

// ===================== DIRECT =====================

/// Direct normal (beam) irradiance Bn under a clear sky.
///
/// `linke_corrected` is the already-negative −0.8662·TL exponent factor.
pub fn direct_normal(
    extraterrestrial_normal: f64,
    linke_corrected: f64,
    optical_air_mass: f64,
    rayleigh_thickness: f64,
) -> f64 {
    extraterrestrial_normal * (linke_corrected * optical_air_mass * rayleigh_thickness).exp()
}

pub fn direct_horizontal(direct_normal: f64, altitude: f64) -> f64 {
    direct_normal * altitude.sin()
}

/// Direct irradiance on the inclined surface.
///
/// # Errors
/// Returns [`ArithmeticEdgeCase`] when `sin(altitude)` is not positive.
pub fn direct_inclined(
    direct_horizontal: f64,
    altitude: f64,
    incidence: f64,
) -> Result<f64, ArithmeticEdgeCase> {
    let sin_altitude = altitude.sin();
    if sin_altitude <= 0.0 {
        return Err(ArithmeticEdgeCase {
            quantity: "direct inclined irradiance",
            denominator: "sin(altitude)",
        });
    }
    Ok(direct_horizontal * incidence.sin() / sin_altitude)
}

/// Vector form of [`direct_inclined`], evaluated only where the beam reaches
/// the surface. Hazardous timesteps become 0 and are recorded.
pub fn direct_inclined_series(
    direct_horizontal: &[f64],
    altitude: &[f64],
    incidence: &[f64],
    regimes: &[Regime],
    fallbacks: &mut Vec<ArithmeticFallback>,
) -> Vec<f64> {
    (0..regimes.len())
        .map(|i| {
            if !regimes[i].receives_direct() {
                return 0.0;
            }
            direct_inclined(direct_horizontal[i], altitude[i], incidence[i]).unwrap_or_else(|e| {
                fallbacks.push(ArithmeticFallback {
                    index: i,
                    quantity: e.quantity,
                    denominator: e.denominator,
                    substitute: 0.0,
                });
                0.0
            })
        })
        .collect()
}

// ===================== DIFFUSE HORIZONTAL =====================

/// Diffuse transmission function Tn(TL) at zenith.
pub fn diffuse_transmission(linke_turbidity: f64) -> f64 {
    let tl = linke_turbidity;
    -0.015843 + 0.030543 * tl + 0.0003797 * tl * tl
}

/// Coefficients of the diffuse solar altitude function Fd.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffuseAltitudeCoefficients {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
}

impl DiffuseAltitudeCoefficients {
    pub fn new(linke_turbidity: f64, transmission: f64) -> Self {
        let tl = linke_turbidity;
        let a1_prime = 0.26463 - 0.061581 * tl + 0.0031408 * tl * tl;
        let a1 = if a1_prime * transmission < MIN_DIFFUSE_TRANSMISSION_PRODUCT
            && transmission > 0.0
        {
            (MIN_DIFFUSE_TRANSMISSION_PRODUCT / transmission).max(a1_prime)
        } else {
            a1_prime
        };
        let a2 = 2.04020 + 0.018945 * tl - 0.011161 * tl * tl;
        let a3 = -1.3025 + 0.039231 * tl + 0.0085079 * tl * tl;
        Self { a1, a2, a3 }
    }

    /// Fd(h) = a₁ + a₂ sin h + a₃ sin² h
    pub fn evaluate(&self, altitude: f64) -> f64 {
        let s = altitude.sin();
        self.a1 + self.a2 * s + self.a3 * s * s
    }
}

/// Clear-sky diffuse horizontal irradiance Dh = G0·Tn·Fd(h), zero below the horizon.
pub fn diffuse_horizontal(extraterrestrial_normal: f64, linke_turbidity: f64, altitude: f64) -> f64 {
    if altitude < 0.0 {
        return 0.0;
    }
    let tn = diffuse_transmission(linke_turbidity);
    let fd = DiffuseAltitudeCoefficients::new(linke_turbidity, tn).evaluate(altitude);
    extraterrestrial_normal * tn * fd
}

// ===================== DIFFUSE INCLINED =====================

/// Proportion of beam irradiance to extraterrestrial horizontal irradiance.
pub fn beam_ratio(direct_horizontal: f64, extraterrestrial_horizontal: f64) -> f64 {
    if extraterrestrial_horizontal <= 0.0 { 0.0 } else { direct_horizontal / extraterrestrial_horizontal }
}

/// Muneer sky term N for sunlit surfaces.
pub fn sky_term(kb: f64) -> f64 {
    0.00263 - 0.712 * kb - 0.6883 * kb * kb
}

/// Sky-view function F(N) for a surface of the given tilt.
pub fn sky_view_function(tilt: f64, n: f64) -> f64 {
    let half = (tilt / 2.0).sin();
    (1.0 + tilt.cos()) / 2.0
        + (tilt.sin() - tilt * tilt.cos() - PI * half * half) * n
}

/// Inputs for one diffuse-inclined evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffuseInclinedInput {
    pub diffuse_horizontal: f64,
    pub kb: f64,
    pub altitude: f64,
    pub incidence: f64,
    pub azimuth: f64,
    pub tilt: f64,
    pub orientation: f64,
}

/// Diffuse irradiance on the inclined surface for a classified timestep.
///
/// Returns `None` only when a sunlit timestep has `sin(altitude) <= 0`,
/// which can happen with a zero low-angle threshold.
pub fn diffuse_inclined(input: &DiffuseInclinedInput, regime: Regime) -> Option<f64> {
    let DiffuseInclinedInput { diffuse_horizontal: dh, kb, altitude, incidence, azimuth, tilt, orientation } =
        *input;
    match regime {
        Regime::BelowHorizon => Some(0.0),
        Regime::AboveHorizonShaded => Some(dh * sky_view_function(tilt, SHADED_SKY_TERM)),
        Regime::LowAngle => {
            let f = sky_view_function(tilt, sky_term(kb));
            let delta = azimuth_difference(azimuth, orientation);
            Some(dh * (f * (1.0 - kb) + kb * tilt.sin() * delta.cos() / (0.1 - 0.008 * altitude)))
        }
        Regime::AboveHorizonSunlit => {
            let sin_altitude = altitude.sin();
            if sin_altitude <= 0.0 {
                return None;
            }
            let f = sky_view_function(tilt, sky_term(kb));
            Some(dh * (f * (1.0 - kb) + kb * incidence.sin() / sin_altitude))
        }
    }
}

// ===================== GROUND REFLECTED =====================

/// Ground-reflected irradiance on the inclined surface.
pub fn ground_reflected(albedo: f64, global_horizontal: f64, tilt: f64) -> f64 {
    albedo * global_horizontal * (1.0 - tilt.cos()) / 2.0
}

// ===================== TESTS =====================
