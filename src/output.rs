//! Output Formatting Module
//!
//! Terminal table and JSON rendering of a pipeline run.

use solarflux::PipelineOutput;
use solarflux::optimize::SurfaceOptimum;
use solarflux::pipeline::Diagnostics;
use solarflux::regime::Regime;

// ===================== FORMATTERS =====================

/// Format power for display
pub fn format_power(watts: f64) -> String {
    if watts.abs() >= 1000.0 { format!("{:.2} kW", watts / 1000.0) } else { format!("{:.1} W", watts) }
}

/// Format irradiance for display
pub fn format_irradiance(w_per_m2: f64) -> String {
    format!("{:.0} W/m²", w_per_m2)
}

// ===================== TABLE OUTPUT =====================

/// Print one row per timestep, angles in the configured output unit.
pub fn print_table(out: &PipelineOutput) {
    let g = &out.geometry;
    let unit = g.altitude.unit.symbol();
    println!(
        "{:<25} {:<13} {:>9} {:>9} {:>9} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>9}",
        "Time",
        "Regime",
        format!("Alt {}", unit),
        format!("Az {}", unit),
        format!("Inc {}", unit),
        "Gh",
        "Bh",
        "Dh",
        "Bi",
        "Di",
        "Ri",
        "Gi",
        "Power"
    );

    let c = &out.components;
    for (i, t) in out.timestamps.iter().enumerate() {
        let regime = out.regimes.get(i).map_or("-", Regime::name);
        println!(
            "{:<25} {:<13} {:>9.3} {:>9.3} {:>9.3} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>9}",
            t.with_timezone(&out.timezone).format("%Y-%m-%d %H:%M:%S %Z"),
            regime,
            g.altitude.values[i],
            g.azimuth.values[i],
            g.incidence.values[i],
            c.global_horizontal[i],
            c.direct_horizontal[i],
            c.diffuse_horizontal[i],
            c.direct_inclined[i],
            c.diffuse_inclined[i],
            c.reflected_inclined[i],
            c.global_inclined[i],
            format_power(c.power[i])
        );
    }

    let peak = c.global_inclined.iter().copied().fold(0.0, f64::max);
    println!();
    println!("Peak inclined: {} | Summed power: {}", format_irradiance(peak), format_power(out.total_power()));
}

/// Print the diagnostics footer.
pub fn print_diagnostics(out: &PipelineOutput) {
    let d: &Diagnostics = &out.diagnostics;
    println!();
    println!("=== Diagnostics ===");
    println!(
        "Algorithms: timing {} | position {} | incidence {} | efficiency {} ({})",
        d.timing, d.position, d.incidence, d.efficiency, d.temperature_model
    );
    if d.external_components {
        println!("Horizontal components supplied externally");
    }
    let counts: Vec<String> =
        Regime::ALL.iter().map(|&r| format!("{} {}", r, out.regimes.count(r))).collect();
    println!("Regimes   : {}", counts.join(" | "));

    if d.warnings.is_empty() {
        println!("Warnings  : none");
    } else {
        println!("Warnings  : {}", d.warnings.len());
        for w in &d.warnings {
            println!("  {}", w);
        }
    }
    if d.fallbacks.is_empty() {
        println!("Fallbacks : none");
    } else {
        println!("Fallbacks : {}", d.fallbacks.len());
        for f in &d.fallbacks {
            println!("  #{} {} (near-zero {}, used {})", f.index, f.quantity, f.denominator, f.substitute);
        }
    }
}

pub fn print_optimum(optimum: &SurfaceOptimum) {
    println!("=== Optimum Surface ===");
    println!("Tilt       : {:.1}°", optimum.tilt_deg);
    println!("Orientation: {:.1}°", optimum.orientation_deg);
    println!("Power      : {} summed ({} evaluations)", format_power(optimum.total_power), optimum.evaluations);
    println!();
}

// ===================== JSON OUTPUT =====================

pub fn print_json(
    out: &PipelineOutput,
    optimum: Option<&SurfaceOptimum>,
) -> Result<(), serde_json::Error> {
    let mut value = serde_json::to_value(out)?;
    if let (Some(o), Some(map)) = (optimum, value.as_object_mut()) {
        map.insert(
            "optimum".to_string(),
            serde_json::json!({
                "tilt": o.tilt_deg,
                "orientation": o.orientation_deg,
                "total-power": o.total_power,
                "evaluations": o.evaluations,
            }),
        );
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
