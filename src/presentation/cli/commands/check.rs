use std::path::Path;

use colored::Colorize;

use crate::application::config::{expand_path, AppConfig};
use crate::presentation::cli::commands::calibration::load_calibration;
use crate::presentation::cli::formatters::status_fmt::print_section_header;
use crate::presentation::cli::formatters::table_fmt::format_device_table;

/// Validate the configuration and print what acquisition would use.
///
/// # Errors
///
/// Returns an error if the configuration or the calibration dataset is invalid.
pub fn run_check(config: &AppConfig, config_path: &Path) -> anyhow::Result<()> {
    print_section_header("Configuration");
    println!("  File     : {}", config_path.display());

    if let Err(e) = config.validate() {
        println!("  Status   : {}", "invalid".red().bold());
        return Err(e.into());
    }
    println!("  Status   : {}", "valid".green().bold());
    println!(
        "  Interval : {} s (read timeout {} ms)",
        config.general.sample_interval_secs, config.general.read_timeout_ms
    );
    println!(
        "  Storage  : {:?} in {}",
        config.storage.backend,
        expand_path(&config.storage.save_folder).display()
    );

    println!();
    print_section_header("Devices");
    println!("{}", format_device_table(&config.device_entities()));

    println!();
    print_section_header("Calibration");
    let table = load_calibration(config)?;
    let (min, max) = table.domain();
    println!(
        "  {} points, resistance {min} .. {max}: {}",
        table.len(),
        "valid".green().bold()
    );

    Ok(())
}
