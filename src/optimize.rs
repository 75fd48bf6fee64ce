//! Surface Optimisation Module
//!
//! Golden-section search for the fixed tilt and orientation that maximise
//! the summed power over a time index.

use tracing::debug;

use crate::error::{Error, Result};
use crate::pipeline::{PipelineInput, SolarPipeline};
use crate::position::SurfaceGeometry;

// Result grid resolution
const TILT_GRID_STEP: f64 = 0.5;
const ORIENTATION_GRID_STEP: f64 = 1.0;
/// Below this tilt the orientation is physically meaningless
const TILT_DEGENERATE: f64 = 0.5;

const TILT_TOLERANCE: f64 = 0.4;
const ORIENTATION_TOLERANCE: f64 = 0.8;

/// Search ranges in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationConstraints {
    pub tilt_min: f64,
    pub tilt_max: f64,
    pub orientation_min: f64,
    pub orientation_max: f64,
}

impl Default for OptimizationConstraints {
    fn default() -> Self {
        Self { tilt_min: 0.0, tilt_max: 90.0, orientation_min: 0.0, orientation_max: 360.0 }
    }
}

impl OptimizationConstraints {
    pub fn with_tilt_range(mut self, range: Option<(f64, f64)>) -> Self {
        if let Some((min, max)) = range {
            self.tilt_min = min.clamp(0.0, 90.0);
            self.tilt_max = max.clamp(0.0, 90.0);
        }
        self
    }

    pub fn with_orientation_range(mut self, range: Option<(f64, f64)>) -> Self {
        if let Some((min, max)) = range {
            self.orientation_min = min.clamp(0.0, 360.0);
            self.orientation_max = max.clamp(0.0, 360.0);
        }
        self
    }

    fn is_full_circle(&self) -> bool {
        self.orientation_min < 0.1 && self.orientation_max > 359.9
    }

    fn orientation_centre(&self) -> f64 {
        if self.is_full_circle() { 180.0 } else { (self.orientation_min + self.orientation_max) / 2.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOptimum {
    pub tilt_deg: f64,
    pub orientation_deg: f64,
    /// Power summed over the index, W
    pub total_power: f64,
    pub evaluations: usize,
}

impl SurfaceOptimum {
    pub fn surface(&self) -> Result<SurfaceGeometry> {
        Ok(SurfaceGeometry::from_degrees(self.tilt_deg, self.orientation_deg)?)
    }
}

/// Find the surface maximising summed power for `input`'s location and index.
///
/// Tilt is searched first at the centre orientation (south for an
/// unconstrained search). Orientation follows: the full circle is scanned
/// at the cardinal points to pick a sector, then refined within ±90°.
pub fn optimize_surface(
    pipeline: &SolarPipeline,
    input: &PipelineInput,
    constraints: &OptimizationConstraints,
) -> Result<SurfaceOptimum> {
    let mut evaluations = 0;
    let mut failure: Option<Error> = None;

    let mut total_power = |tilt: f64, orientation: f64| -> f64 {
        evaluations += 1;
        let surface = match SurfaceGeometry::from_degrees(tilt, orientation.rem_euclid(360.0)) {
            Ok(s) => s,
            Err(e) => {
                failure.get_or_insert(e.into());
                return f64::NEG_INFINITY;
            }
        };
        let trial = PipelineInput { surface, ..input.clone() };
        match pipeline.run(&trial) {
            Ok(out) => out.total_power(),
            Err(e) => {
                failure.get_or_insert(e);
                f64::NEG_INFINITY
            }
        }
    };

    // ---- tilt ----
    let initial_orientation = constraints.orientation_centre();
    let (raw_tilt, _) = golden_section_search(constraints.tilt_min, constraints.tilt_max, TILT_TOLERANCE, |t| {
        total_power(t, initial_orientation)
    });
    let best_tilt = snap(raw_tilt, TILT_GRID_STEP).clamp(constraints.tilt_min, constraints.tilt_max);
    let mut best_power = total_power(best_tilt, initial_orientation);
    let mut best_orientation = initial_orientation;

    // ---- orientation ----
    if best_tilt >= TILT_DEGENERATE {
        let (search_min, search_max) = if constraints.is_full_circle() {
            // orientation wraps, so pick the sector before refining
            let mut sector = initial_orientation;
            let mut sector_power = best_power;
            for candidate in [0.0, 90.0, 270.0] {
                let p = total_power(best_tilt, candidate);
                if p > sector_power {
                    sector_power = p;
                    sector = candidate;
                }
            }
            (sector - 90.0, sector + 90.0)
        } else {
            (constraints.orientation_min, constraints.orientation_max)
        };

        if search_max - search_min > ORIENTATION_GRID_STEP {
            let (raw, _) = golden_section_search(search_min, search_max, ORIENTATION_TOLERANCE, |o| {
                total_power(best_tilt, o)
            });
            let mut orientation = snap(raw, ORIENTATION_GRID_STEP);
            if !constraints.is_full_circle() {
                orientation = orientation.clamp(constraints.orientation_min, constraints.orientation_max);
            }
            best_orientation = orientation.rem_euclid(360.0);
            best_power = total_power(best_tilt, best_orientation);
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }
    debug!(
        "Optimum tilt {:.1}° orientation {:.1}° after {} evaluations",
        best_tilt, best_orientation, evaluations
    );

    Ok(SurfaceOptimum {
        // + 0.0 normalises -0.0
        tilt_deg: best_tilt + 0.0,
        orientation_deg: best_orientation + 0.0,
        total_power: best_power,
        evaluations,
    })
}

fn snap(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Golden-section search for the maximum of a unimodal `f` on `[min, max]`.
///
/// Returns (x_at_max, max_value)
fn golden_section_search<F>(min: f64, max: f64, tol: f64, mut f: F) -> (f64, f64)
where
    F: FnMut(f64) -> f64,
{
    let resphi = 2.0 - (1.0 + 5.0_f64.sqrt()) / 2.0;

    let mut a = min;
    let mut b = max;
    let mut c = a + resphi * (b - a);
    let mut d = b - resphi * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);

    while (b - a).abs() > tol {
        if fc < fd {
            a = c;
            c = d;
            fc = fd;
            d = b - resphi * (b - a);
            fd = f(d);
        } else {
            b = d;
            d = c;
            fd = fc;
            c = a + resphi * (b - a);
            fc = f(c);
        }
    }

    ((a + b) / 2.0, fc.max(fd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineOptions;
    use crate::constants::Constants;
    use crate::position::Location;
    use crate::time::TimeSeriesIndex;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn day_input(month: u32, day: u32) -> PipelineInput {
        let start = Tz::UTC.with_ymd_and_hms(2024, month, day, 0, 0, 0).unwrap();
        let end = Tz::UTC.with_ymd_and_hms(2024, month, day, 23, 30, 0).unwrap();
        let index = TimeSeriesIndex::from_range(start, end, 30).unwrap();
        PipelineInput::new(Location::from_degrees(0.0, 45.0, 0.0).unwrap(), index)
    }

    fn pipeline() -> SolarPipeline {
        SolarPipeline::new(Constants::default(), PipelineOptions::default()).unwrap()
    }

    #[test]
    fn test_golden_section_finds_parabola_peak() {
        let (x, y) = golden_section_search(0.0, 10.0, 1e-4, |x| -(x - 3.7) * (x - 3.7) + 2.0);
        assert!((x - 3.7).abs() < 1e-3, "peak at {}", x);
        assert!((y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_winter_optimum_is_steep_and_south() {
        let optimum = optimize_surface(&pipeline(), &day_input(12, 21), &Default::default()).unwrap();
        assert!(optimum.tilt_deg >= 50.0, "Winter tilt should be steep, got {:.1}°", optimum.tilt_deg);
        assert!(
            (optimum.orientation_deg - 180.0).abs() <= 2.0,
            "Winter orientation should face south, got {:.1}°",
            optimum.orientation_deg
        );
        assert!(optimum.total_power > 0.0);
    }

    #[test]
    fn test_summer_optimum_is_shallow() {
        let optimum = optimize_surface(&pipeline(), &day_input(6, 21), &Default::default()).unwrap();
        assert!(optimum.tilt_deg <= 30.0, "Summer tilt should be shallow, got {:.1}°", optimum.tilt_deg);
        assert!((optimum.orientation_deg - 180.0).abs() <= 2.0, "got {:.1}°", optimum.orientation_deg);
    }

    #[test]
    fn test_constraints_and_grid() {
        let constraints = OptimizationConstraints::default()
            .with_tilt_range(Some((10.0, 20.0)))
            .with_orientation_range(Some((90.0, 150.0)));
        let optimum = optimize_surface(&pipeline(), &day_input(12, 21), &constraints).unwrap();
        assert!((10.0..=20.0).contains(&optimum.tilt_deg), "tilt {}", optimum.tilt_deg);
        assert!((90.0..=150.0).contains(&optimum.orientation_deg), "orientation {}", optimum.orientation_deg);
        assert_eq!(optimum.tilt_deg % TILT_GRID_STEP, 0.0);
        assert_eq!(optimum.orientation_deg % ORIENTATION_GRID_STEP, 0.0);
        // winter sun favours the southern end of the allowed range
        assert!(optimum.orientation_deg >= 140.0, "orientation {}", optimum.orientation_deg);
    }

    #[test]
    fn test_optimum_beats_horizontal() {
        let p = pipeline();
        let input = day_input(3, 20);
        let optimum = optimize_surface(&p, &input, &Default::default()).unwrap();
        let flat = p.run(&input).unwrap().total_power();
        assert!(optimum.total_power >= flat, "{} < {}", optimum.total_power, flat);
        assert!(optimum.surface().is_ok());
    }
}
