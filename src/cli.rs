//! Command-Line Interface Module
//!
//! Handles argument parsing and validation for the solarflux binary. Flags
//! that mirror [`PipelineOptions`] fields are optional so that a value from
//! the `--config` file survives when the flag is absent.

use std::path::PathBuf;

use clap::Parser;

use solarflux::PipelineOptions;
use solarflux::astronomy::TimingAlgorithm;
use solarflux::efficiency::{EfficiencyAlgorithm, ModuleTechnology, TemperatureModel};
use solarflux::position::{IncidenceAlgorithm, PositionAlgorithm};
use solarflux::units::{AngleUnit, TimeUnit};

// ===================== CLI =====================

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Observer latitude in decimal degrees (-90 to 90)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_latitude, env = "SOLARFLUX_LATITUDE")]
    pub latitude: f64,
    /// Observer longitude in decimal degrees (-180 to 180)
    #[arg(long, allow_hyphen_values = true, value_parser = parse_longitude, env = "SOLARFLUX_LONGITUDE")]
    pub longitude: f64,
    /// Elevation above mean sea level in metres
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true, value_parser = parse_elevation, env = "SOLARFLUX_ELEVATION")]
    pub elevation: f64,
    /// Time zone to use ("system", "location", or IANA time zone name)
    #[arg(long, default_value = "system", env = "SOLARFLUX_TIMEZONE")]
    pub timezone: String,

    // ===================== TIME =====================
    /// Start of the series (e.g. "2024-06-21", "today", "next monday")
    #[arg(long, default_value = "today")]
    pub start: String,
    /// End of the series, inclusive; defaults to the end of the start day
    #[arg(long)]
    pub end: Option<String>,
    /// Step between timestamps in minutes
    #[arg(long, default_value_t = 60, value_parser = parse_step)]
    pub step_minutes: i64,

    // ===================== SURFACE =====================
    /// Surface tilt in degrees (0 = horizontal, 90 = vertical)
    #[arg(long, default_value_t = 0.0, value_parser = parse_tilt)]
    pub tilt: f64,
    /// Surface orientation in degrees clockwise from north (180 = south)
    #[arg(long, default_value_t = 180.0, value_parser = parse_orientation)]
    pub orientation: f64,

    // ===================== ATMOSPHERE =====================
    /// Linke turbidity factor (0-8, 2 = very clear)
    #[arg(long, default_value_t = 2.0, value_parser = parse_turbidity)]
    pub linke_turbidity: f64,
    /// Ground albedo (0.0-1.0, 0.2 = grass, 0.8 = snow)
    #[arg(long, value_parser = parse_unit_interval)]
    pub albedo: Option<f64>,

    // ===================== ALGORITHMS =====================
    /// Equation of time model: noaa, milne1921
    #[arg(long)]
    pub timing: Option<TimingAlgorithm>,
    /// Solar position model: noaa, jenco, spa
    #[arg(long)]
    pub position: Option<PositionAlgorithm>,
    /// Incidence model: iqbal, jenco, pvis
    #[arg(long)]
    pub incidence: Option<IncidenceAlgorithm>,
    /// Conversion efficiency model: huld, fixed
    #[arg(long)]
    pub efficiency: Option<EfficiencyAlgorithm>,
    /// Module temperature model: faiman, none
    #[arg(long)]
    pub temperature_model: Option<TemperatureModel>,
    /// Module technology for the built-in coefficient tables
    #[arg(long)]
    pub module: Option<ModuleTechnology>,
    /// Installed peak power in kWp
    #[arg(long, value_parser = parse_positive_f64)]
    pub peak_power: Option<f64>,
    /// System efficiency (0.0-1.0)
    #[arg(long, value_parser = parse_unit_interval)]
    pub system_efficiency: Option<f64>,

    // ===================== METEO =====================
    /// Ambient temperature in °C, applied to every timestep
    #[arg(long, allow_hyphen_values = true)]
    pub temperature: Option<f64>,
    /// Wind speed in m/s, applied to every timestep
    #[arg(long, value_parser = parse_non_negative_f64)]
    pub wind_speed: Option<f64>,

    // ===================== SWITCHES =====================
    /// Disable the atmospheric refraction correction
    #[arg(long)]
    pub no_refraction: bool,
    /// Apply reflectivity (angular) losses
    #[arg(long)]
    pub angular_loss: bool,
    /// Altitude in degrees below which the beam is ignored
    #[arg(long, value_parser = parse_low_angle)]
    pub low_angle_threshold: Option<f64>,

    // ===================== UNITS =====================
    /// Units for reported angles: radians, degrees
    #[arg(long)]
    pub angle_units: Option<AngleUnit>,
    /// Units for reported times: minutes, hours
    #[arg(long)]
    pub time_units: Option<TimeUnit>,

    // ===================== OTHER =====================
    /// TOML settings file; command-line flags take precedence
    #[arg(long, env = "SOLARFLUX_CONFIG")]
    pub config: Option<PathBuf>,
    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
    /// Search the tilt and orientation maximising summed power first
    #[arg(long)]
    pub optimize: bool,
    /// Tilt range constraint: "MIN-MAX" (e.g., "20-60" limits tilt to 20°-60°)
    #[arg(long, value_parser = parse_range, requires = "optimize")]
    pub tilt_range: Option<(f64, f64)>,
    /// Orientation range constraint: "MIN-MAX" (e.g., "150-210")
    #[arg(long, value_parser = parse_range, requires = "optimize")]
    pub orientation_range: Option<(f64, f64)>,
    /// Log per-stage progress
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Layer the flags given on the command line over `options`.
    pub fn apply_to(&self, options: &mut PipelineOptions) {
        if let Some(v) = self.timing {
            options.timing = v;
        }
        if let Some(v) = self.position {
            options.position = v;
        }
        if let Some(v) = self.incidence {
            options.incidence = v;
        }
        if let Some(v) = self.efficiency {
            options.efficiency = v;
        }
        if let Some(v) = self.temperature_model {
            options.temperature_model = v;
        }
        if let Some(v) = self.module {
            options.module = v;
            // an explicit module beats file coefficients
            options.coefficients = None;
        }
        if let Some(v) = self.albedo {
            options.albedo = v;
        }
        if let Some(v) = self.peak_power {
            options.peak_power = v;
        }
        if let Some(v) = self.system_efficiency {
            options.system_efficiency = v;
        }
        if let Some(v) = self.low_angle_threshold {
            options.low_angle_threshold = v.to_radians();
        }
        if let Some(v) = self.angle_units {
            options.angle_output_unit = v;
        }
        if let Some(v) = self.time_units {
            options.time_output_unit = v;
        }
        if self.no_refraction {
            options.apply_refraction = false;
        }
        if self.angular_loss {
            options.apply_angular_loss = true;
        }
    }
}

// ===================== CLI VALUE PARSERS =====================

fn parse_f64(s: &str) -> Result<f64, String> {
    s.parse().map_err(|_| format!("Invalid number: {}", s))
}

fn parse_bounded(s: &str, what: &str, min: f64, max: f64) -> Result<f64, String> {
    let v = parse_f64(s)?;
    if !(min..=max).contains(&v) {
        return Err(format!("{} must be between {} and {}, got {}", what, min, max, v));
    }
    Ok(v)
}

fn parse_latitude(s: &str) -> Result<f64, String> {
    parse_bounded(s, "Latitude", -90.0, 90.0)
}

fn parse_longitude(s: &str) -> Result<f64, String> {
    parse_bounded(s, "Longitude", -180.0, 180.0)
}

fn parse_elevation(s: &str) -> Result<f64, String> {
    parse_bounded(s, "Elevation", -500.0, 9000.0)
}

fn parse_tilt(s: &str) -> Result<f64, String> {
    parse_bounded(s, "Tilt", 0.0, 90.0)
}

fn parse_orientation(s: &str) -> Result<f64, String> {
    parse_bounded(s, "Orientation", 0.0, 360.0)
}

fn parse_turbidity(s: &str) -> Result<f64, String> {
    parse_bounded(s, "Linke turbidity", 0.0, 8.0)
}

fn parse_unit_interval(s: &str) -> Result<f64, String> {
    parse_bounded(s, "Value", 0.0, 1.0)
}

fn parse_low_angle(s: &str) -> Result<f64, String> {
    parse_bounded(s, "Low angle threshold", 0.0, 90.0)
}

fn parse_positive_f64(s: &str) -> Result<f64, String> {
    let v = parse_f64(s)?;
    if v <= 0.0 {
        return Err(format!("Value must be positive, got {}", v));
    }
    Ok(v)
}

fn parse_non_negative_f64(s: &str) -> Result<f64, String> {
    let v = parse_f64(s)?;
    if v < 0.0 {
        return Err(format!("Value must not be negative, got {}", v));
    }
    Ok(v)
}

fn parse_step(s: &str) -> Result<i64, String> {
    let v: i64 = s.parse().map_err(|_| format!("Invalid integer: {}", s))?;
    if !(1..=1440).contains(&v) {
        return Err(format!("Step must be between 1 and 1440 minutes, got {}", v));
    }
    Ok(v)
}

fn parse_range(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 2 {
        return Err(format!("Range must be in format MIN-MAX (e.g., '20-60'), got '{}'", s));
    }
    let min: f64 = parts[0].parse().map_err(|_| format!("Invalid minimum value: {}", parts[0]))?;
    let max: f64 = parts[1].parse().map_err(|_| format!("Invalid maximum value: {}", parts[1]))?;
    if min > max {
        return Err(format!("Minimum ({}) cannot be greater than maximum ({})", min, max));
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["solarflux", "--latitude", "45", "--longitude", "-3.5"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("20-60").unwrap(), (20.0, 60.0));
        assert!(parse_range("60-20").is_err());
        assert!(parse_range("20").is_err());
    }

    #[test]
    fn test_algorithm_flags() {
        let a = args(&["--position", "jenco", "--timing", "MILNE1921", "--module", "cdte-free-standing"]);
        assert_eq!(a.position, Some(PositionAlgorithm::Jenco));
        assert_eq!(a.timing, Some(TimingAlgorithm::Milne1921));

        let mut argv = vec!["solarflux", "--latitude", "45", "--longitude", "0"];
        argv.extend_from_slice(&["--position", "all"]);
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_flags_override_file_options() {
        let mut options = PipelineOptions { albedo: 0.5, apply_angular_loss: false, ..Default::default() };
        args(&["--angular-loss", "--no-refraction", "--low-angle-threshold", "10"]).apply_to(&mut options);
        assert!(options.apply_angular_loss);
        assert!(!options.apply_refraction);
        assert_eq!(options.albedo, 0.5, "absent flag must keep the file value");
        assert!((options.low_angle_threshold - 10f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_range_requires_optimize() {
        let argv = ["solarflux", "--latitude", "45", "--longitude", "0", "--tilt-range", "10-20"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let argv = ["solarflux", "--latitude", "95", "--longitude", "0"];
        assert!(Args::try_parse_from(argv).is_err());
    }
}
