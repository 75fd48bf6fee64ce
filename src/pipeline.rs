//! Irradiance Pipeline Module
//!
//! Orchestrates the stages for one call: solar time and position,
//! atmosphere, clear-sky (or external) horizontal components, regime
//! masking, inclined components, efficiency and power.
//!
//! The vector entry point [`SolarPipeline::run`] never fails on arithmetic
//! hazards; it substitutes a sentinel and lists the index in the
//! diagnostics. The scalar entry point [`SolarPipeline::run_at`] raises them.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::astronomy::SolarTime;
use crate::atmosphere::{AtmosphericProperties, validate_linke_turbidity};
use crate::config::PipelineOptions;
use crate::constants::{Constants, LINKE_TURBIDITY_DEFAULT, TEMPERATURE_DEFAULT, WIND_SPEED_DEFAULT};
use crate::efficiency::{EfficiencyModel, power_output};
use crate::error::{ArithmeticFallback, Error, PhysicalRangeWarning, Result, ValidationError};
use crate::irradiance::{
    DiffuseInclinedInput, beam_ratio, diffuse_horizontal, diffuse_inclined, direct_horizontal,
    direct_inclined_series, direct_normal, extraterrestrial_horizontal, extraterrestrial_normal,
    ground_reflected,
};
use crate::position::{
    GeometrySettings, HorizonProfile, Location, PositionModel, SolarGeometry, SurfaceGeometry,
};
use crate::reflectivity::{
    diffuse_angular_loss_factor, direct_angular_loss_factor, ground_angular_loss_factor,
};
use crate::regime::{Regime, RegimeMask, apply_mask, check_physical_range, sum_components};
use crate::time::TimeSeriesIndex;
use crate::units::{AngleSeries, AngleUnit, TimeUnit};

// ===================== INPUTS =====================

/// Linke turbidity, either constant or one value per timestep.
#[derive(Debug, Clone, PartialEq)]
pub enum Turbidity {
    Constant(f64),
    Series(Vec<f64>),
}

impl Default for Turbidity {
    fn default() -> Self {
        Turbidity::Constant(LINKE_TURBIDITY_DEFAULT)
    }
}

impl Turbidity {
    fn expand(&self, len: usize) -> Result<Vec<f64>> {
        match self {
            Turbidity::Constant(v) => Ok(vec![*v; len]),
            Turbidity::Series(values) => {
                check_length("linke turbidity", values, len)?;
                Ok(values.clone())
            }
        }
    }
}

/// Pre-aligned horizontal components replacing the clear-sky model.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalComponents {
    pub global_horizontal: Vec<f64>,
    pub direct_horizontal: Vec<f64>,
}

/// Optional meteorological series; absent series use scalar defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeteoSeries {
    pub temperature: Option<Vec<f64>>,
    pub wind_speed: Option<Vec<f64>>,
}

/// Everything that varies between calls.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub location: Location,
    pub surface: SurfaceGeometry,
    pub index: TimeSeriesIndex,
    pub turbidity: Turbidity,
    /// Replaces the derived optical air mass when given
    pub optical_air_mass: Option<Vec<f64>>,
    pub external: Option<ExternalComponents>,
    pub meteo: MeteoSeries,
    pub horizon: Option<HorizonProfile>,
}

impl PipelineInput {
    pub fn new(location: Location, index: TimeSeriesIndex) -> Self {
        Self {
            location,
            surface: SurfaceGeometry::horizontal(),
            index,
            turbidity: Turbidity::default(),
            optical_air_mass: None,
            external: None,
            meteo: MeteoSeries::default(),
            horizon: None,
        }
    }

    pub fn with_surface(mut self, surface: SurfaceGeometry) -> Self {
        self.surface = surface;
        self
    }

    pub fn with_turbidity(mut self, turbidity: Turbidity) -> Self {
        self.turbidity = turbidity;
        self
    }

    pub fn with_optical_air_mass(mut self, air_mass: Vec<f64>) -> Self {
        self.optical_air_mass = Some(air_mass);
        self
    }

    pub fn with_external(mut self, external: ExternalComponents) -> Self {
        self.external = Some(external);
        self
    }

    pub fn with_meteo(mut self, meteo: MeteoSeries) -> Self {
        self.meteo = meteo;
        self
    }

    pub fn with_horizon(mut self, horizon: HorizonProfile) -> Self {
        self.horizon = Some(horizon);
        self
    }
}

fn check_length(name: &'static str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(ValidationError::LengthMismatch { name, expected, actual: values.len() }.into());
    }
    Ok(())
}

// ===================== OUTPUTS =====================

/// Irradiance components in W/m², efficiency as a ratio and power in W.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IrradianceComponents {
    pub extraterrestrial_normal: Vec<f64>,
    pub extraterrestrial_horizontal: Vec<f64>,
    pub direct_normal: Vec<f64>,
    pub direct_horizontal: Vec<f64>,
    pub direct_inclined: Vec<f64>,
    pub diffuse_horizontal: Vec<f64>,
    pub diffuse_inclined: Vec<f64>,
    pub reflected_inclined: Vec<f64>,
    pub global_horizontal: Vec<f64>,
    pub global_inclined: Vec<f64>,
    pub efficiency: Vec<f64>,
    pub effective: Vec<f64>,
    pub power: Vec<f64>,
}

/// Geometry and timing, converted to the requested output units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryOutput {
    pub declination: AngleSeries,
    pub hour_angle: AngleSeries,
    pub altitude: AngleSeries,
    pub zenith: AngleSeries,
    pub azimuth: AngleSeries,
    pub incidence: AngleSeries,
    pub time_unit: TimeUnit,
    pub equation_of_time: Vec<f64>,
    pub true_solar_time: Vec<f64>,
    pub optical_air_mass: Vec<f64>,
    pub rayleigh_thickness: Vec<f64>,
}

impl GeometryOutput {
    fn new(
        geometry: &SolarGeometry,
        atmosphere: &AtmosphericProperties,
        angle_unit: AngleUnit,
        time_unit: TimeUnit,
    ) -> Self {
        let angle = |name: &'static str, values: &[f64]| {
            AngleSeries::from_radians(name, values.to_vec()).to_unit(angle_unit)
        };
        let time = |values: &[f64]| -> Vec<f64> { values.iter().map(|&m| time_unit.from_minutes(m)).collect() };
        let st: &SolarTime = &geometry.solar_time;
        Self {
            declination: angle("declination", &geometry.declination),
            hour_angle: angle("hour angle", &st.hour_angle),
            altitude: angle("altitude", &geometry.altitude),
            zenith: angle("zenith", &geometry.zenith),
            azimuth: angle("azimuth", &geometry.azimuth),
            incidence: angle("incidence", &geometry.incidence),
            time_unit,
            equation_of_time: time(&st.equation_of_time),
            true_solar_time: time(&st.true_solar_time),
            optical_air_mass: atmosphere.optical_air_mass.clone(),
            rayleigh_thickness: atmosphere.rayleigh_thickness.clone(),
        }
    }
}

/// Algorithms actually used plus soft failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub timing: &'static str,
    pub position: &'static str,
    pub incidence: &'static str,
    pub efficiency: &'static str,
    pub temperature_model: &'static str,
    pub external_components: bool,
    pub warnings: Vec<PhysicalRangeWarning>,
    pub fallbacks: Vec<ArithmeticFallback>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub timestamps: Vec<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_timezone")]
    pub timezone: Tz,
    pub components: IrradianceComponents,
    pub regimes: RegimeMask,
    pub geometry: GeometryOutput,
    pub diagnostics: Diagnostics,
}

fn serialize_timezone<S: serde::Serializer>(tz: &Tz, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(tz.name())
}

impl PipelineOutput {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn total_power(&self) -> f64 {
        self.components.power.iter().sum()
    }
}

/// Scalar result of [`SolarPipeline::run_at`]. Angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointEstimate {
    pub regime: Regime,
    pub altitude: f64,
    pub azimuth: f64,
    pub incidence: f64,
    pub direct_horizontal: f64,
    pub diffuse_horizontal: f64,
    pub global_horizontal: f64,
    pub direct_inclined: f64,
    pub diffuse_inclined: f64,
    pub reflected_inclined: f64,
    pub global_inclined: f64,
    pub power: f64,
}

// ===================== PIPELINE =====================

/// A configured pipeline. Algorithm combinations are checked once here.
#[derive(Debug, Clone)]
pub struct SolarPipeline {
    constants: Constants,
    options: PipelineOptions,
    position: PositionModel,
}

impl SolarPipeline {
    /// # Errors
    /// [`crate::error::ConfigurationError`] for an incompatible position/timing pair
    /// or a coefficient vector too short for the efficiency model, and
    /// [`ValidationError`] for out-of-range options.
    pub fn new(constants: Constants, options: PipelineOptions) -> Result<Self> {
        options.validate()?;
        let position = PositionModel::new(options.position, options.timing, options.incidence)?;
        EfficiencyModel::new(
            options.efficiency,
            options.temperature_model,
            options.effective_coefficients(),
            options.fixed_efficiency,
            false,
        )?;
        debug!(
            "Pipeline configured: timing={} position={} incidence={} efficiency={}",
            options.timing, options.position, options.incidence, options.efficiency
        );
        Ok(Self { constants, options, position })
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the full pipeline over the input's time index.
    pub fn run(&self, input: &PipelineInput) -> Result<PipelineOutput> {
        let n = input.index.len();
        let opts = &self.options;
        let c = &self.constants;

        // ---- validation ----
        let turbidity = input.turbidity.expand(n)?;
        validate_linke_turbidity(&turbidity, c.linke_turbidity_minimum, c.linke_turbidity_maximum)?;
        if let Some(m) = &input.optical_air_mass {
            check_length("optical air mass", m, n)?;
        }
        if let Some(ext) = &input.external {
            check_length("global horizontal", &ext.global_horizontal, n)?;
            check_length("direct horizontal", &ext.direct_horizontal, n)?;
        }
        let temperature = match &input.meteo.temperature {
            Some(t) => {
                check_length("temperature", t, n)?;
                t.clone()
            }
            None => vec![TEMPERATURE_DEFAULT; n],
        };
        let wind_speed = match &input.meteo.wind_speed {
            Some(w) => {
                check_length("wind speed", w, n)?;
                w.clone()
            }
            None => vec![WIND_SPEED_DEFAULT; n],
        };
        let efficiency_model = EfficiencyModel::new(
            opts.efficiency,
            opts.temperature_model,
            opts.effective_coefficients(),
            opts.fixed_efficiency,
            input.meteo.wind_speed.is_some(),
        )?;

        // ---- geometry ----
        let settings = GeometrySettings {
            apply_refraction: opts.apply_refraction,
            flat_surface_threshold: opts.flat_surface_threshold,
        };
        let geometry = self.position.compute(&input.index, &input.location, &input.surface, c, settings)?;
        let mut fallbacks = geometry.fallbacks.clone();
        debug!("Solar geometry computed for {} timesteps", n);

        let mask = RegimeMask::classify(
            &geometry.altitude,
            &geometry.incidence,
            &geometry.azimuth,
            opts.low_angle_threshold,
            input.horizon.as_ref(),
        );
        let regimes = mask.regimes();
        debug!(
            "Regimes: {} sunlit, {} low-angle, {} shaded, {} below horizon",
            mask.count(Regime::AboveHorizonSunlit),
            mask.count(Regime::LowAngle),
            mask.count(Regime::AboveHorizonShaded),
            mask.count(Regime::BelowHorizon)
        );

        // ---- atmosphere ----
        let atmosphere = match &input.optical_air_mass {
            Some(m) => AtmosphericProperties::with_air_mass(m.clone(), &turbidity),
            None => AtmosphericProperties::compute(input.location.elevation, &geometry.altitude, &turbidity),
        };

        // ---- horizontal components ----
        let altitude = &geometry.altitude;
        let g0: Vec<f64> = geometry
            .solar_time
            .fractional_year
            .iter()
            .map(|&g| extraterrestrial_normal(g, c))
            .collect();
        let g0h: Vec<f64> = g0
            .iter()
            .zip(altitude)
            .map(|(&g, &h)| if h < 0.0 { 0.0 } else { extraterrestrial_horizontal(g, h) })
            .collect();

        let (mut bn, bh_raw, mut dh) = match &input.external {
            None => {
                let bn: Vec<f64> = (0..n)
                    .map(|i| {
                        if altitude[i] < 0.0 {
                            return 0.0;
                        }
                        direct_normal(
                            g0[i],
                            atmosphere.linke_corrected[i],
                            atmosphere.optical_air_mass[i],
                            atmosphere.rayleigh_thickness[i],
                        )
                    })
                    .collect();
                let bh: Vec<f64> = bn.iter().zip(altitude).map(|(&b, &h)| direct_horizontal(b, h)).collect();
                let dh: Vec<f64> =
                    (0..n).map(|i| diffuse_horizontal(g0[i], turbidity[i], altitude[i])).collect();
                (bn, bh, dh)
            }
            Some(ext) => {
                let bh = ext.direct_horizontal.clone();
                let bn: Vec<f64> = (0..n)
                    .map(|i| {
                        let s = altitude[i].sin();
                        if s > 0.0 { bh[i] / s } else { 0.0 }
                    })
                    .collect();
                let dh: Vec<f64> = ext
                    .global_horizontal
                    .iter()
                    .zip(&ext.direct_horizontal)
                    .map(|(g, b)| g - b)
                    .collect();
                (bn, bh, dh)
            }
        };

        // kb uses the unmasked beam so that low-angle timesteps keep their anisotropy
        let kb: Vec<f64> = bh_raw.iter().zip(&g0h).map(|(&b, &g)| beam_ratio(b, g)).collect();

        let mut bh = bh_raw.clone();
        apply_mask(&mut bh, |i| mask.receives_direct_horizontal(i));
        apply_mask(&mut bn, |i| mask.receives_direct_horizontal(i));
        apply_mask(&mut dh, |i| regimes[i] != Regime::BelowHorizon);
        let gh = sum_components(&[&bh, &dh]);

        // ---- inclined components ----
        let surface = &input.surface;
        let ar = c.angular_loss_coefficient;
        let flat = surface.tilt <= opts.flat_surface_threshold;

        let mut bi = direct_inclined_series(&bh_raw, altitude, &geometry.incidence, regimes, &mut fallbacks);
        if opts.apply_angular_loss {
            for (b, &inc) in bi.iter_mut().zip(&geometry.incidence) {
                *b *= direct_angular_loss_factor(inc, ar);
            }
        }

        let mut di: Vec<f64> = if flat {
            dh.clone()
        } else {
            (0..n)
                .map(|i| {
                    let diffuse = DiffuseInclinedInput {
                        diffuse_horizontal: dh[i],
                        kb: kb[i],
                        altitude: altitude[i],
                        incidence: geometry.incidence[i],
                        azimuth: geometry.azimuth[i],
                        tilt: surface.tilt,
                        orientation: surface.orientation,
                    };
                    diffuse_inclined(&diffuse, regimes[i]).unwrap_or_else(|| {
                        fallbacks.push(ArithmeticFallback {
                            index: i,
                            quantity: "diffuse inclined irradiance",
                            denominator: "sin(altitude)",
                            substitute: 0.0,
                        });
                        0.0
                    })
                })
                .collect()
        };
        let mut ri: Vec<f64> =
            gh.iter().map(|&g| ground_reflected(opts.albedo, g, surface.tilt)).collect();
        if opts.apply_angular_loss {
            let diffuse_factor = diffuse_angular_loss_factor(surface.tilt, ar);
            let ground_factor = ground_angular_loss_factor(surface.tilt, ar);
            di.iter_mut().for_each(|d| *d *= diffuse_factor);
            ri.iter_mut().for_each(|r| *r *= ground_factor);
        }
        let gi = sum_components(&[&bi, &di, &ri]);

        // ---- efficiency & power ----
        let efficiency = efficiency_model.efficiency_series(&gi, &temperature, &wind_speed);
        let effective: Vec<f64> = gi.iter().zip(&efficiency).map(|(g, e)| g * e).collect();
        let power: Vec<f64> = effective
            .iter()
            .map(|&e| power_output(e, opts.system_efficiency, opts.peak_power))
            .collect();

        // ---- diagnostics ----
        let mut warnings = check_physical_range("global horizontal", &gh, c);
        warnings.extend(check_physical_range("global inclined", &gi, c));
        for w in &warnings {
            warn!("{}", w);
        }
        for f in &fallbacks {
            warn!(
                "Near-zero {} for {} at #{}, using {}",
                f.denominator, f.quantity, f.index, f.substitute
            );
        }

        let diagnostics = Diagnostics {
            timing: opts.timing.name(),
            position: opts.position.name(),
            incidence: opts.incidence.name(),
            efficiency: opts.efficiency.name(),
            temperature_model: opts.temperature_model.name(),
            external_components: input.external.is_some(),
            warnings,
            fallbacks,
        };
        info!(
            "Computed {} timesteps, summed power {:.1} W, {} warnings, {} fallbacks",
            n,
            power.iter().sum::<f64>(),
            diagnostics.warnings.len(),
            diagnostics.fallbacks.len()
        );

        Ok(PipelineOutput {
            timestamps: input.index.timestamps().to_vec(),
            timezone: input.index.timezone(),
            components: IrradianceComponents {
                extraterrestrial_normal: g0,
                extraterrestrial_horizontal: g0h,
                direct_normal: bn,
                direct_horizontal: bh,
                direct_inclined: bi,
                diffuse_horizontal: dh,
                diffuse_inclined: di,
                reflected_inclined: ri,
                global_horizontal: gh,
                global_inclined: gi,
                efficiency,
                effective,
                power,
            },
            geometry: GeometryOutput::new(&geometry, &atmosphere, opts.angle_output_unit, opts.time_output_unit),
            regimes: mask,
            diagnostics,
        })
    }

    /// Scalar convenience entry point for a single instant.
    ///
    /// # Errors
    /// Unlike [`run`](Self::run), a near-zero denominator is an
    /// [`Error::Arithmetic`] here instead of a recorded fallback.
    pub fn run_at(
        &self,
        location: Location,
        surface: SurfaceGeometry,
        timestamp: DateTime<Utc>,
        timezone: Tz,
        linke_turbidity: f64,
    ) -> Result<PointEstimate> {
        let input = PipelineInput::new(location, TimeSeriesIndex::single(timestamp, timezone))
            .with_surface(surface)
            .with_turbidity(Turbidity::Constant(linke_turbidity));
        let out = self.run(&input)?;
        if let Some(f) = out.diagnostics.fallbacks.first() {
            return Err(Error::Arithmetic(f.as_edge_case()));
        }

        let to_rad = |s: &AngleSeries| s.radians()[0];
        let c = &out.components;
        Ok(PointEstimate {
            regime: out.regimes.regimes()[0],
            altitude: to_rad(&out.geometry.altitude),
            azimuth: to_rad(&out.geometry.azimuth),
            incidence: to_rad(&out.geometry.incidence),
            direct_horizontal: c.direct_horizontal[0],
            diffuse_horizontal: c.diffuse_horizontal[0],
            global_horizontal: c.global_horizontal[0],
            direct_inclined: c.direct_inclined[0],
            diffuse_inclined: c.diffuse_inclined[0],
            reflected_inclined: c.reflected_inclined[0],
            global_inclined: c.global_inclined[0],
            power: c.power[0],
        })
    }
}

// ===================== TESTS =====================
