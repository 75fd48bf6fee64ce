//! solarflux
//!
//! Solar geometry, clear-sky irradiance decomposition and photovoltaic power
//! estimation over a time series.
//!
//! ```no_run
//! use chrono::TimeZone;
//! use chrono_tz::Tz;
//! use solarflux::{Constants, Location, PipelineInput, PipelineOptions, SolarPipeline, TimeSeriesIndex};
//!
//! # fn main() -> Result<(), solarflux::Error> {
//! let start = Tz::UTC.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
//! let end = Tz::UTC.with_ymd_and_hms(2024, 6, 21, 23, 0, 0).unwrap();
//! let index = TimeSeriesIndex::from_range(start, end, 60)?;
//! let location = Location::from_degrees(0.0, 45.0, 0.0)?;
//!
//! let pipeline = SolarPipeline::new(Constants::default(), PipelineOptions::default())?;
//! let out = pipeline.run(&PipelineInput::new(location, index))?;
//! println!("{:.1} W summed", out.total_power());
//! # Ok(())
//! # }
//! ```

pub mod astronomy;
pub mod atmosphere;
pub mod config;
pub mod constants;
pub mod efficiency;
pub mod error;
pub mod irradiance;
pub mod optimize;
pub mod pipeline;
pub mod position;
pub mod reflectivity;
pub mod regime;
pub mod time;
pub mod units;

pub use config::{PipelineOptions, Settings};
pub use constants::Constants;
pub use error::{Error, Result};
pub use pipeline::{
    ExternalComponents, MeteoSeries, PipelineInput, PipelineOutput, PointEstimate, SolarPipeline,
    Turbidity,
};
pub use position::{HorizonProfile, Location, SurfaceGeometry};
pub use regime::{Regime, RegimeMask};
pub use time::TimeSeriesIndex;
pub use units::{AngleUnit, TimeUnit};
