//! Reflectivity (Angular Loss) Module
//!
//! Incidence angle modifiers after Martin & Ruiz (2001). Each factor is a
//! multiplier in [0, 1]; a vanishing denominator yields 1 (no loss).

use std::f64::consts::PI;

/// Reference incidence angle term c₁ = 4/(3π)
const C1: f64 = 4.0 / (3.0 * PI);

/// c₂ = aᵣ/2 − 0.154
fn c2(angular_loss_coefficient: f64) -> f64 {
    angular_loss_coefficient / 2.0 - 0.154
}

// ===================== DIRECT =====================

/// Angular loss factor for the direct beam.
///
/// `incidence` is the sun-to-plane angle: π/2 is normal incidence (factor 1),
/// 0 is grazing (factor 0).
pub fn direct_angular_loss_factor(incidence: f64, angular_loss_coefficient: f64) -> f64 {
    let ar = angular_loss_coefficient;
    let denominator = 1.0 - (-1.0 / ar).exp();
    if ar <= 0.0 || denominator.abs() < f64::EPSILON {
        return 1.0;
    }
    if incidence <= 0.0 {
        return 0.0;
    }
    (1.0 - (-incidence.sin() / ar).exp()) / denominator
}

// ===================== DIFFUSE & GROUND =====================

fn nondirect_factor(x: f64, angular_loss_coefficient: f64) -> f64 {
    let ar = angular_loss_coefficient;
    if ar <= 0.0 {
        return 1.0;
    }
    1.0 - (-(C1 * x + c2(ar) * x * x) / ar).exp()
}

/// Angular loss factor for sky diffuse irradiance on a surface of `tilt`.
pub fn diffuse_angular_loss_factor(tilt: f64, angular_loss_coefficient: f64) -> f64 {
    let denominator = 1.0 + tilt.cos();
    if denominator.abs() < f64::EPSILON {
        return 1.0;
    }
    let x = tilt.sin() + (PI - tilt - tilt.sin()) / denominator;
    nondirect_factor(x, angular_loss_coefficient)
}

/// Angular loss factor for ground-reflected irradiance on a surface of `tilt`.
///
/// A horizontal surface sees no ground and keeps factor 1.
pub fn ground_angular_loss_factor(tilt: f64, angular_loss_coefficient: f64) -> f64 {
    let denominator = 1.0 - tilt.cos();
    if denominator.abs() < f64::EPSILON {
        return 1.0;
    }
    let x = tilt.sin() + (tilt - tilt.sin()) / denominator;
    nondirect_factor(x, angular_loss_coefficient)
}

// ===================== TESTS =====================
