//! Primus: leader election and failover over a fixed priority chain.

use color_eyre::eyre::Result;
use tracing::debug;

use primus_config::LoggingConfig;

use crate::args::{Args, Commands};

mod args;
mod cmd;
mod logging;
mod metrics;

#[tokio::main]
pub async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::new();

    match &args.command {
        Commands::Init(init) => {
            logging::init(&LoggingConfig::default(), args.log.as_deref())?;
            debug!("Command-line parameters: {args:?}");

            cmd::init::run(&args.get_config_file_path()?, init)
        }

        Commands::Start => {
            let config = args.load_config()?;
            logging::init(&config.logging, args.log.as_deref())?;
            debug!("Command-line parameters: {args:?}");

            cmd::start::run(config).await
        }

        Commands::Status => {
            let config = args.load_config()?;
            logging::init(&config.logging, args.log.as_deref())?;

            cmd::status::run(&config).await
        }
    }
}
