use clap::Parser;
use tracing_subscriber::EnvFilter;

use thermolog::application::config::AppConfig;
use thermolog::presentation::cli::app::{Cli, Commands};
use thermolog::presentation::cli::commands::calibration::run_calibration;
use thermolog::presentation::cli::commands::check::run_check;
use thermolog::presentation::cli::commands::convert::run_convert;
use thermolog::presentation::cli::commands::run::run_acquisition;

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    let config_path = match cli.config {
        Some(ref path) => path.clone(),
        None => AppConfig::config_path()?,
    };
    let config = AppConfig::load_or_create(&config_path)?;

    if let Some(Commands::Check) = cli.command {
        return run_check(&config, &config_path);
    }
    config.validate()?;

    match cli.command {
        Some(Commands::Run { export }) => {
            run_acquisition(&config, export.map(Into::into)).await?;
        }
        None => run_acquisition(&config, None).await?,
        Some(Commands::Calibration { resistance }) => run_calibration(&config, resistance)?,
        Some(Commands::Convert {
            ref device,
            ref channel,
            millivolts,
        }) => run_convert(&config, device, channel, millivolts)?,
        Some(Commands::Check) => {}
    }

    Ok(())
}
