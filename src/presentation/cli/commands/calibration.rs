use anyhow::Context;
use colored::Colorize;

use crate::application::config::{expand_path, AppConfig};
use crate::domain::value_objects::calibration::CalibrationTable;
use crate::infrastructure::calibration::csv_dataset::load_dataset;
use crate::presentation::cli::formatters::status_fmt::print_section_header;

/// Load the configured calibration dataset.
///
/// # Errors
///
/// Returns an error if the dataset cannot be read or is not a valid curve.
pub fn load_calibration(config: &AppConfig) -> anyhow::Result<CalibrationTable> {
    let path = expand_path(&config.calibration.dataset_path);
    load_dataset(&path)
        .with_context(|| format!("Invalid calibration dataset {}", path.display()))
}

/// # Errors
///
/// Returns an error if the dataset is invalid or `resistance` is outside its domain.
pub fn run_calibration(config: &AppConfig, resistance: Option<f64>) -> anyhow::Result<()> {
    let table = load_calibration(config)?;
    let (min, max) = table.domain();
    let points = table.points();
    let (t_first, t_last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first.temperature, last.temperature),
        _ => anyhow::bail!("calibration table is empty"),
    };

    print_section_header("Calibration dataset");
    println!("  File        : {}", config.calibration.dataset_path);
    println!("  Points      : {}", table.len());
    println!("  Resistance  : {min} .. {max}");
    println!(
        "  Temperature : {:.2} °C .. {:.2} °C",
        t_first.min(t_last),
        t_first.max(t_last)
    );
    println!("  Status      : {}", "valid".green().bold());

    if let Some(r) = resistance {
        let temperature = table
            .lookup(r)
            .with_context(|| format!("Cannot look up resistance {r}"))?;
        println!();
        println!("  R = {r} → {}", format!("{temperature:.3} °C").bold());
    }

    Ok(())
}
