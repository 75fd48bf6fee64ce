//! Solar Position Module
//!
//! Declination, altitude, zenith, azimuth and incidence through
//! interchangeable position and incidence algorithms, plus the optional
//! horizon profile used for terrain shading.
//!
//! Conventions: azimuth and surface orientation are measured clockwise from
//! north (south = π). Incidence is the angle between the sun vector and the
//! surface *plane*, so it equals the altitude on a flat surface and turns
//! negative once the sun is behind the panel.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use solar_positioning::{spa, time::DeltaT};

use crate::astronomy::{SolarTime, TimingAlgorithm};
use crate::atmosphere::refracted_altitude;
use crate::config::parse_selection;
use crate::constants::Constants;
use crate::error::{ArithmeticFallback, ConfigurationError, Error, ValidationError};
use crate::time::TimeSeriesIndex;
use crate::units::{AngleUnit, wrap_to_pi, wrap_to_two_pi};

/// Denominators smaller than this are treated as zero.
pub const NEAR_ZERO: f64 = 1e-9;

// ===================== LOCATION & SURFACE =====================

/// Observer location, angles in radians, elevation in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: f64,
}

impl Location {
    pub fn new(
        longitude: f64,
        latitude: f64,
        elevation: f64,
        unit: AngleUnit,
    ) -> Result<Self, ValidationError> {
        let longitude = unit.convert(longitude, AngleUnit::Radians);
        let latitude = unit.convert(latitude, AngleUnit::Radians);
        check_range("longitude", longitude, -PI, PI)?;
        check_range("latitude", latitude, -FRAC_PI_2, FRAC_PI_2)?;
        Ok(Self { longitude, latitude, elevation })
    }

    pub fn from_degrees(
        longitude: f64,
        latitude: f64,
        elevation: f64,
    ) -> Result<Self, ValidationError> {
        Self::new(longitude, latitude, elevation, AngleUnit::Degrees)
    }
}

/// Surface tilt from horizontal and orientation clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfaceGeometry {
    pub tilt: f64,
    pub orientation: f64,
}

impl SurfaceGeometry {
    pub fn new(tilt: f64, orientation: f64, unit: AngleUnit) -> Result<Self, ValidationError> {
        let tilt = unit.convert(tilt, AngleUnit::Radians);
        let orientation = unit.convert(orientation, AngleUnit::Radians);
        check_range("tilt", tilt, 0.0, FRAC_PI_2)?;
        check_range("orientation", orientation, 0.0, 2.0 * PI)?;
        Ok(Self { tilt, orientation })
    }

    pub fn from_degrees(tilt: f64, orientation: f64) -> Result<Self, ValidationError> {
        Self::new(tilt, orientation, AngleUnit::Degrees)
    }

    /// A horizontal surface.
    pub fn horizontal() -> Self {
        Self { tilt: 0.0, orientation: PI }
    }
}

impl Default for SurfaceGeometry {
    fn default() -> Self {
        Self::horizontal()
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    // small slack so that 90° or 360° given in degrees survives the conversion
    let eps = 1e-12;
    if !value.is_finite() || value < min - eps || value > max + eps {
        return Err(ValidationError::OutOfRange { name, value, min, max });
    }
    Ok(())
}

// ===================== ALGORITHM SELECTION =====================

/// Model for declination, altitude and azimuth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PositionAlgorithm {
    #[default]
    Noaa,
    Jenco,
    /// NREL Solar Position Algorithm
    Spa,
}

impl PositionAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            PositionAlgorithm::Noaa => "noaa",
            PositionAlgorithm::Jenco => "jenco",
            PositionAlgorithm::Spa => "spa",
        }
    }

    /// NOAA and SPA report declination and hour angle from the NOAA
    /// fractional-year chain and cannot mix in another timing model.
    pub fn check_timing(self, timing: TimingAlgorithm) -> Result<(), ConfigurationError> {
        match (self, timing) {
            (PositionAlgorithm::Jenco, _) | (_, TimingAlgorithm::Noaa) => Ok(()),
            _ => Err(ConfigurationError::IncompatibleAlgorithms {
                position: self.name(),
                timing: timing.name(),
            }),
        }
    }
}

impl FromStr for PositionAlgorithm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selection(
            "position",
            s,
            &[
                ("noaa", PositionAlgorithm::Noaa),
                ("jenco", PositionAlgorithm::Jenco),
                ("spa", PositionAlgorithm::Spa),
            ],
            "noaa, jenco, spa",
        )
    }
}

impl TryFrom<String> for PositionAlgorithm {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PositionAlgorithm> for String {
    fn from(a: PositionAlgorithm) -> Self {
        a.name().to_string()
    }
}

impl fmt::Display for PositionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Model for the sun-to-surface incidence angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IncidenceAlgorithm {
    #[default]
    Iqbal,
    Jenco,
    Pvis,
}

impl IncidenceAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            IncidenceAlgorithm::Iqbal => "iqbal",
            IncidenceAlgorithm::Jenco => "jenco",
            IncidenceAlgorithm::Pvis => "pvis",
        }
    }
}

impl FromStr for IncidenceAlgorithm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selection(
            "incidence",
            s,
            &[
                ("iqbal", IncidenceAlgorithm::Iqbal),
                ("jenco", IncidenceAlgorithm::Jenco),
                ("pvis", IncidenceAlgorithm::Pvis),
            ],
            "iqbal, jenco, pvis",
        )
    }
}

impl TryFrom<String> for IncidenceAlgorithm {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IncidenceAlgorithm> for String {
    fn from(a: IncidenceAlgorithm) -> Self {
        a.name().to_string()
    }
}

impl fmt::Display for IncidenceAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ===================== DECLINATION =====================

/// NOAA declination from the fractional year.
pub fn declination_noaa(fractional_year: f64) -> f64 {
    let g = fractional_year;
    0.006918 - 0.399912 * g.cos() + 0.070257 * g.sin() - 0.006758 * (2.0 * g).cos()
        + 0.000907 * (2.0 * g).sin()
        - 0.002697 * (3.0 * g).cos()
        + 0.00148 * (3.0 * g).sin()
}

/// Jenčo declination from the day angle `j = 2π·doy/days_in_year`.
pub fn declination_jenco(day_of_year: u32, days_in_year: u32, constants: &Constants) -> f64 {
    let j = 2.0 * PI * day_of_year as f64 / days_in_year as f64;
    let inner = j - 1.4
        + constants.eccentricity_correction * (j - constants.perigee_offset).sin();
    (0.3978 * inner.sin()).asin()
}

// ===================== ALTITUDE & AZIMUTH =====================

/// Geometric solar altitude.
pub fn solar_altitude(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let s = latitude.sin() * declination.sin()
        + latitude.cos() * declination.cos() * hour_angle.cos();
    s.clamp(-1.0, 1.0).asin()
}

/// Azimuth via atan2, clockwise from north.
pub fn azimuth_jenco(latitude: f64, declination: f64, hour_angle: f64) -> f64 {
    let y = -declination.cos() * hour_angle.sin();
    let x = declination.sin() * latitude.cos()
        - declination.cos() * hour_angle.cos() * latitude.sin();
    wrap_to_two_pi(y.atan2(x))
}

/// NOAA azimuth via acos with quadrant fix.
///
/// Returns `None` when `cos(latitude)·sin(zenith)` vanishes: at the poles or
/// with the sun at the zenith.
pub fn azimuth_noaa(latitude: f64, declination: f64, hour_angle: f64, zenith: f64) -> Option<f64> {
    let denominator = latitude.cos() * zenith.sin();
    if denominator.abs() < NEAR_ZERO {
        return None;
    }
    let cos_theta = (latitude.sin() * zenith.cos() - declination.sin()) / denominator;
    let theta = cos_theta.clamp(-1.0, 1.0).acos();
    let azimuth = if hour_angle > 0.0 { theta + PI } else { 3.0 * PI - theta };
    Some(wrap_to_two_pi(azimuth))
}

// ===================== INCIDENCE =====================

/// Incidence from zenith/azimuth projection (Iqbal).
pub fn incidence_iqbal(zenith: f64, azimuth: f64, tilt: f64, orientation: f64) -> f64 {
    let cos_theta = tilt.cos() * zenith.cos()
        + tilt.sin() * zenith.sin() * (azimuth - orientation).cos();
    FRAC_PI_2 - cos_theta.clamp(-1.0, 1.0).acos()
}

/// Incidence via the relative latitude/longitude of the inclined plane (Jenčo).
pub fn incidence_jenco(
    latitude: f64,
    declination: f64,
    hour_angle: f64,
    tilt: f64,
    orientation: f64,
) -> f64 {
    let aspect = orientation - PI;
    let sin_lat_rel = latitude.sin() * tilt.cos() - latitude.cos() * tilt.sin() * aspect.cos();
    let lat_rel = sin_lat_rel.clamp(-1.0, 1.0).asin();
    let lon_rel = (tilt.sin() * aspect.sin())
        .atan2(latitude.sin() * tilt.sin() * aspect.cos() + latitude.cos() * tilt.cos());
    let s = lat_rel.cos() * declination.cos() * (hour_angle - lon_rel).cos()
        + lat_rel.sin() * declination.sin();
    s.clamp(-1.0, 1.0).asin()
}

/// Incidence by explicit declination/hour-angle expansion (Duffie & Beckman, as in PVGIS).
pub fn incidence_pvis(
    latitude: f64,
    declination: f64,
    hour_angle: f64,
    tilt: f64,
    orientation: f64,
) -> f64 {
    let g = orientation - PI;
    let (sd, cd) = declination.sin_cos();
    let (sl, cl) = latitude.sin_cos();
    let (sb, cb) = tilt.sin_cos();
    let (sg, cg) = g.sin_cos();
    let (sh, ch) = hour_angle.sin_cos();
    let cos_theta = sd * sl * cb - sd * cl * sb * cg
        + cd * cl * cb * ch
        + cd * sl * sb * cg * ch
        + cd * sb * sg * sh;
    FRAC_PI_2 - cos_theta.clamp(-1.0, 1.0).acos()
}

// ===================== HORIZON PROFILE =====================

/// Horizon heights (radians) equally spaced in azimuth starting at north.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonProfile {
    heights: Vec<f64>,
}

impl HorizonProfile {
    pub fn new(heights: Vec<f64>, unit: AngleUnit) -> Result<Self, ValidationError> {
        if heights.is_empty() {
            return Err(ValidationError::LengthMismatch { name: "horizon", expected: 1, actual: 0 });
        }
        let heights: Vec<f64> =
            heights.into_iter().map(|h| unit.convert(h, AngleUnit::Radians)).collect();
        for &h in &heights {
            check_range("horizon height", h, -FRAC_PI_2, FRAC_PI_2)?;
        }
        Ok(Self { heights })
    }

    /// Linearly interpolated horizon height at `azimuth`, wrapping at 2π.
    pub fn height_at(&self, azimuth: f64) -> f64 {
        let n = self.heights.len();
        let step = 2.0 * PI / n as f64;
        let position = wrap_to_two_pi(azimuth) / step;
        let i = (position.floor() as usize) % n;
        let frac = position - position.floor();
        self.heights[i] * (1.0 - frac) + self.heights[(i + 1) % n] * frac
    }

    pub fn obstructs(&self, altitude: f64, azimuth: f64) -> bool {
        altitude < self.height_at(azimuth)
    }
}

// ===================== POSITION MODEL =====================

/// Geometry knobs that come from the per-run options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometrySettings {
    pub apply_refraction: bool,
    pub flat_surface_threshold: f64,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self { apply_refraction: true, flat_surface_threshold: 0.0001 }
    }
}

/// Solar geometry series aligned with the time index, all in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarGeometry {
    pub solar_time: SolarTime,
    pub declination: Vec<f64>,
    /// Geometric altitude before refraction
    pub geometric_altitude: Vec<f64>,
    /// Altitude used downstream (refracted when enabled)
    pub altitude: Vec<f64>,
    pub zenith: Vec<f64>,
    pub azimuth: Vec<f64>,
    pub incidence: Vec<f64>,
    pub fallbacks: Vec<ArithmeticFallback>,
}

impl SolarGeometry {
    pub fn len(&self) -> usize {
        self.altitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.altitude.is_empty()
    }
}

/// A resolved position/timing/incidence combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionModel {
    pub position: PositionAlgorithm,
    pub timing: TimingAlgorithm,
    pub incidence: IncidenceAlgorithm,
}

impl PositionModel {
    pub fn new(
        position: PositionAlgorithm,
        timing: TimingAlgorithm,
        incidence: IncidenceAlgorithm,
    ) -> Result<Self, ConfigurationError> {
        position.check_timing(timing)?;
        Ok(Self { position, timing, incidence })
    }

    pub fn compute(
        &self,
        index: &TimeSeriesIndex,
        location: &Location,
        surface: &SurfaceGeometry,
        constants: &Constants,
        settings: GeometrySettings,
    ) -> Result<SolarGeometry, Error> {
        let solar_time = SolarTime::compute(index, location.longitude, self.timing);
        let lat = location.latitude;
        let mut fallbacks = Vec::new();

        let declination: Vec<f64> = match self.position {
            PositionAlgorithm::Noaa | PositionAlgorithm::Spa => {
                solar_time.fractional_year.iter().map(|&g| declination_noaa(g)).collect()
            }
            PositionAlgorithm::Jenco => index
                .day_of_year()
                .into_iter()
                .zip(index.days_in_year())
                .map(|(d, n)| declination_jenco(d, n, constants))
                .collect(),
        };

        let (geometric_altitude, mut azimuth) = match self.position {
            PositionAlgorithm::Spa => spa_altitude_azimuth(index, location)?,
            _ => {
                let altitude: Vec<f64> = declination
                    .iter()
                    .zip(&solar_time.hour_angle)
                    .map(|(&d, &h)| solar_altitude(lat, d, h))
                    .collect();
                let azimuth = if self.position == PositionAlgorithm::Noaa {
                    declination
                        .iter()
                        .zip(&solar_time.hour_angle)
                        .zip(&altitude)
                        .enumerate()
                        .map(|(i, ((&d, &h), &alt))| {
                            azimuth_noaa(lat, d, h, FRAC_PI_2 - alt).unwrap_or_else(|| {
                                fallbacks.push(ArithmeticFallback {
                                    index: i,
                                    quantity: "azimuth",
                                    denominator: "cos(latitude)·sin(zenith)",
                                    substitute: 0.0,
                                });
                                0.0
                            })
                        })
                        .collect()
                } else {
                    declination
                        .iter()
                        .zip(&solar_time.hour_angle)
                        .map(|(&d, &h)| azimuth_jenco(lat, d, h))
                        .collect()
                };
                (altitude, azimuth)
            }
        };

        let altitude: Vec<f64> = if settings.apply_refraction {
            geometric_altitude.iter().map(|&a| refracted_altitude(a)).collect()
        } else {
            geometric_altitude.clone()
        };
        let zenith: Vec<f64> = altitude.iter().map(|a| FRAC_PI_2 - a).collect();
        azimuth.iter_mut().for_each(|a| *a = wrap_to_two_pi(*a));

        let incidence: Vec<f64> = if surface.tilt <= settings.flat_surface_threshold {
            altitude.clone()
        } else {
            (0..altitude.len())
                .map(|i| match self.incidence {
                    IncidenceAlgorithm::Iqbal => {
                        incidence_iqbal(zenith[i], azimuth[i], surface.tilt, surface.orientation)
                    }
                    IncidenceAlgorithm::Jenco => incidence_jenco(
                        lat,
                        declination[i],
                        solar_time.hour_angle[i],
                        surface.tilt,
                        surface.orientation,
                    ),
                    IncidenceAlgorithm::Pvis => incidence_pvis(
                        lat,
                        declination[i],
                        solar_time.hour_angle[i],
                        surface.tilt,
                        surface.orientation,
                    ),
                })
                .collect()
        };

        Ok(SolarGeometry {
            solar_time,
            declination,
            geometric_altitude,
            altitude,
            zenith,
            azimuth,
            incidence,
            fallbacks,
        })
    }
}

/// Geometric altitude and azimuth from NREL SPA.
fn spa_altitude_azimuth(
    index: &TimeSeriesIndex,
    location: &Location,
) -> Result<(Vec<f64>, Vec<f64>), Error> {
    let lat = location.latitude.to_degrees();
    let lon = location.longitude.to_degrees();
    let mut altitude = Vec::with_capacity(index.len());
    let mut azimuth = Vec::with_capacity(index.len());

    for t in index.local() {
        let delta_t = DeltaT::estimate_from_date(t.year(), t.month())
            .map_err(|e| Error::Position(e.to_string()))?;
        let pos = spa::solar_position(t, lat, lon, location.elevation, delta_t, None)
            .map_err(|e| Error::Position(e.to_string()))?;
        altitude.push(pos.elevation_angle().to_radians());
        azimuth.push(pos.azimuth().to_radians());
    }
    Ok((altitude, azimuth))
}

/// Signed azimuth difference between sun and surface, wrapped into (-π, π].
pub fn azimuth_difference(sun_azimuth: f64, orientation: f64) -> f64 {
    wrap_to_pi(sun_azimuth - orientation)
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    fn location() -> Location {
        Location::from_degrees(0.0, 45.0, 0.0).unwrap()
    }

    fn noon_index() -> TimeSeriesIndex {
        TimeSeriesIndex::parse(&["2024-06-21 12:01:27"], Tz::UTC).unwrap()
    }

    fn no_refraction() -> GeometrySettings {
        GeometrySettings { apply_refraction: false, ..Default::default() }
    }

    #[test]
    fn test_location_validation() {
        assert!(Location::from_degrees(0.0, 91.0, 0.0).is_err());
        assert!(Location::from_degrees(-181.0, 0.0, 0.0).is_err());
        assert!(Location::from_degrees(180.0, -90.0, 0.0).is_ok());
        assert!(SurfaceGeometry::from_degrees(90.0, 360.0).is_ok());
        assert!(SurfaceGeometry::from_degrees(-1.0, 180.0).is_err());
    }

    #[test]
    fn test_declination_at_solstices() {
        let june = declination_noaa(2.952753750914997).to_degrees();
        assert!((june - 23.4548).abs() < 0.01, "June declination {}", june);
        let c = Constants::default();
        let jenco_june = declination_jenco(173, 366, &c).to_degrees();
        assert!((jenco_june - 23.44).abs() < 0.2, "Jenco June declination {}", jenco_june);
        let jenco_dec = declination_jenco(356, 366, &c).to_degrees();
        assert!(jenco_dec < -23.0, "Jenco December declination {}", jenco_dec);
    }

    #[test]
    fn test_noon_altitude_and_azimuth() {
        let model = PositionModel::new(
            PositionAlgorithm::Noaa,
            TimingAlgorithm::Noaa,
            IncidenceAlgorithm::Iqbal,
        )
        .unwrap();
        let geo = model
            .compute(&noon_index(), &location(), &SurfaceGeometry::horizontal(), &Constants::default(), no_refraction())
            .unwrap();
        let alt = geo.altitude[0].to_degrees();
        assert!((alt - 68.4548).abs() < 0.01, "Noon altitude {}", alt);
        assert!((geo.azimuth[0] - PI).abs() < 0.01, "Noon azimuth {}", geo.azimuth[0]);
        assert_eq!(geo.incidence, geo.altitude, "flat surface uses the altitude");
    }

    #[test]
    fn test_azimuth_algorithms_agree() {
        let lat = 45f64.to_radians();
        let dec = 0.2;
        for h in [-2.0, -1.0, -0.3, 0.4, 1.2, 2.5] {
            let alt = solar_altitude(lat, dec, h);
            let a = azimuth_jenco(lat, dec, h);
            let b = azimuth_noaa(lat, dec, h, FRAC_PI_2 - alt).unwrap();
            assert!((a - b).abs() < 1e-9, "h={} jenco {} noaa {}", h, a, b);
        }
        // morning sun is in the east
        assert!(azimuth_jenco(lat, 0.0, -FRAC_PI_2) < PI);
    }

    #[test]
    fn test_noaa_azimuth_guard_at_pole() {
        assert!(azimuth_noaa(FRAC_PI_2, 0.2, 0.5, 1.0).is_none());
        assert!(azimuth_noaa(0.5, 0.5, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_pole_records_fallback() {
        let model = PositionModel::new(
            PositionAlgorithm::Noaa,
            TimingAlgorithm::Noaa,
            IncidenceAlgorithm::Iqbal,
        )
        .unwrap();
        let pole = Location::from_degrees(0.0, 90.0, 0.0).unwrap();
        let geo = model
            .compute(&noon_index(), &pole, &SurfaceGeometry::horizontal(), &Constants::default(), no_refraction())
            .unwrap();
        assert_eq!(geo.azimuth[0], 0.0);
        assert_eq!(geo.fallbacks.len(), 1);
        assert_eq!(geo.fallbacks[0].quantity, "azimuth");
    }

    #[test]
    fn test_incidence_algorithms_agree() {
        let lat = 45f64.to_radians();
        let tilt = 30f64.to_radians();
        for orientation in [PI, 2.0, 4.5] {
            for (dec, h) in [(0.4, 0.0), (0.4, -1.0), (-0.3, 0.8), (0.1, 2.0)] {
                let alt = solar_altitude(lat, dec, h);
                let az = azimuth_jenco(lat, dec, h);
                let a = incidence_iqbal(FRAC_PI_2 - alt, az, tilt, orientation);
                let b = incidence_jenco(lat, dec, h, tilt, orientation);
                let c = incidence_pvis(lat, dec, h, tilt, orientation);
                assert!((a - b).abs() < 1e-9, "iqbal {} vs jenco {}", a, b);
                assert!((a - c).abs() < 1e-9, "iqbal {} vs pvis {}", a, c);
            }
        }
    }

    #[test]
    fn test_south_facing_tilt_at_noon() {
        // sun at 68.45° altitude due south, 30° south-facing panel: 68.45 + 30 > 90
        let lat = 45f64.to_radians();
        let dec = 23.4548f64.to_radians();
        let inc = incidence_iqbal(FRAC_PI_2 - solar_altitude(lat, dec, 0.0), PI, 30f64.to_radians(), PI);
        let expected = 180.0 - 68.4548 - 30.0 - 0.0;
        assert!((inc.to_degrees() - expected).abs() < 0.01, "incidence {}", inc.to_degrees());
    }

    #[test]
    fn test_sun_behind_panel_is_negative() {
        // north-facing vertical wall at noon
        let inc = incidence_iqbal(FRAC_PI_2 - 1.0, PI, FRAC_PI_2, 0.0);
        assert!(inc < 0.0);
    }

    #[test]
    fn test_incompatible_combination_rejected() {
        let res = PositionModel::new(
            PositionAlgorithm::Noaa,
            TimingAlgorithm::Milne1921,
            IncidenceAlgorithm::Iqbal,
        );
        assert!(matches!(res, Err(ConfigurationError::IncompatibleAlgorithms { .. })));
        assert!(
            PositionModel::new(PositionAlgorithm::Jenco, TimingAlgorithm::Milne1921, IncidenceAlgorithm::Pvis)
                .is_ok()
        );
    }

    #[test]
    fn test_spa_close_to_noaa() {
        let idx = TimeSeriesIndex::parse(&["2024-06-21 09:00", "2024-06-21 15:00"], Tz::UTC).unwrap();
        let loc = location();
        let surface = SurfaceGeometry::horizontal();
        let c = Constants::default();
        let spa = PositionModel::new(PositionAlgorithm::Spa, TimingAlgorithm::Noaa, IncidenceAlgorithm::Iqbal)
            .unwrap()
            .compute(&idx, &loc, &surface, &c, no_refraction())
            .unwrap();
        let noaa = PositionModel::new(PositionAlgorithm::Noaa, TimingAlgorithm::Noaa, IncidenceAlgorithm::Iqbal)
            .unwrap()
            .compute(&idx, &loc, &surface, &c, no_refraction())
            .unwrap();
        for i in 0..2 {
            let d_alt = (spa.altitude[i] - noaa.altitude[i]).to_degrees().abs();
            let d_az = (spa.azimuth[i] - noaa.azimuth[i]).to_degrees().abs();
            assert!(d_alt < 0.1, "altitude differs by {}°", d_alt);
            assert!(d_az < 0.2, "azimuth differs by {}°", d_az);
        }
    }

    #[test]
    fn test_refraction_raises_altitude() {
        let model = PositionModel::new(PositionAlgorithm::Noaa, TimingAlgorithm::Noaa, IncidenceAlgorithm::Iqbal)
            .unwrap();
        let geo = model
            .compute(&noon_index(), &location(), &SurfaceGeometry::horizontal(), &Constants::default(), GeometrySettings::default())
            .unwrap();
        let refracted = geo.altitude[0].to_degrees();
        assert!((refracted - 68.4678).abs() < 0.01, "refracted altitude {}", refracted);
        assert!(geo.altitude[0] > geo.geometric_altitude[0]);
    }

    #[test]
    fn test_horizon_profile_interpolation() {
        // north 0°, east 10°, south 20°, west 10°
        let profile = HorizonProfile::new(vec![0.0, 10.0, 20.0, 10.0], AngleUnit::Degrees).unwrap();
        assert!((profile.height_at(PI).to_degrees() - 20.0).abs() < 1e-9);
        assert!((profile.height_at(3.0 * PI / 4.0).to_degrees() - 15.0).abs() < 1e-9);
        // wraps from west back to north
        assert!((profile.height_at(7.0 * PI / 4.0).to_degrees() - 5.0).abs() < 1e-9);
        assert!(profile.obstructs(10f64.to_radians(), PI));
        assert!(!profile.obstructs(25f64.to_radians(), PI));
    }

    #[test]
    fn test_azimuth_difference_wraps() {
        assert!((azimuth_difference(0.1, 2.0 * PI - 0.1) - 0.2).abs() < 1e-12);
    }
}
