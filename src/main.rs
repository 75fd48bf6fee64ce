use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use clap::Parser;
use tracing::Level;

use solarflux::optimize::{OptimizationConstraints, optimize_surface};
use solarflux::time::{parse_natural, select_timezone, start_of_day};
use solarflux::{Location, MeteoSeries, PipelineInput, Settings, SolarPipeline, SurfaceGeometry, TimeSeriesIndex, Turbidity};

mod cli;
mod output;

use cli::Args;

// ===================== MAIN =====================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // defaults < config file < command line
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    args.apply_to(&mut settings.options);

    let tz = select_timezone(&args.timezone, args.longitude, args.latitude)?;
    let (start, end) = series_window(&args, tz)?;
    let index = TimeSeriesIndex::from_range(start, end, args.step_minutes)?;
    let n = index.len();

    let location = Location::from_degrees(args.longitude, args.latitude, args.elevation)?;
    let meteo = MeteoSeries {
        temperature: args.temperature.map(|t| vec![t; n]),
        wind_speed: args.wind_speed.map(|w| vec![w; n]),
    };
    let mut input = PipelineInput::new(location, index)
        .with_surface(SurfaceGeometry::from_degrees(args.tilt, args.orientation)?)
        .with_turbidity(Turbidity::Constant(args.linke_turbidity))
        .with_meteo(meteo);

    let pipeline = SolarPipeline::new(settings.constants, settings.options)?;

    let optimum = if args.optimize {
        let constraints = OptimizationConstraints::default()
            .with_tilt_range(args.tilt_range)
            .with_orientation_range(args.orientation_range);
        let optimum = optimize_surface(&pipeline, &input, &constraints)?;
        input.surface = optimum.surface()?;
        Some(optimum)
    } else {
        None
    };

    let out = pipeline.run(&input)?;

    if args.json {
        output::print_json(&out, optimum.as_ref())?;
    } else {
        if let Some(o) = &optimum {
            output::print_optimum(o);
        }
        output::print_table(&out);
        output::print_diagnostics(&out);
    }
    Ok(())
}

/// Resolve `--start`/`--end` into an inclusive window in `tz`.
///
/// Without `--end` the window is the whole local day of the start date.
fn series_window(args: &Args, tz: Tz) -> Result<(DateTime<Tz>, DateTime<Tz>), Box<dyn std::error::Error>> {
    // Anchor 'today' to the target timezone
    let anchor = Utc::now().with_timezone(&tz);
    let start = parse_natural(&args.start, anchor)?;

    match &args.end {
        Some(end) => Ok((start, parse_natural(end, anchor)?)),
        None => {
            let date = start.date_naive();
            let first = start_of_day(date, tz).ok_or("Start day does not exist in this time zone")?;
            // look ahead two days so a skipped date (Samoa 2011) still ends the window
            let next = [1, 2]
                .into_iter()
                .filter_map(|d| date.checked_add_signed(Duration::days(d)))
                .find_map(|d| start_of_day(d, tz))
                .ok_or("Cannot find the end of the start day")?;
            Ok((first, next - Duration::minutes(1)))
        }
    }
}
