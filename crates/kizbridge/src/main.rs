mod cli;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kizbridge_core::{Bridge, CommandSlot, MqttBus, Shutdown};
use overkiz_api::{OverkizClient, TransportConfig};

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    match run(cli).await {
        Ok(Shutdown::Maintenance) => {
            tracing::info!("cloud platform is in maintenance, stopping until restarted");
        }
        Ok(Shutdown::RateLimited) => {
            tracing::info!("rate limited by the cloud API, stopping until restarted");
        }
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(code);
        }
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<Shutdown, CliError> {
    let config = config::load(cli.config.as_deref())?;
    let sync = config.sync_config();

    let client = OverkizClient::new(
        config.overkiz.server,
        &config.overkiz.username,
        config.overkiz_password(),
        &TransportConfig::default(),
    )?;

    let slot = CommandSlot::new();
    let bus = MqttBus::connect(&config.mqtt_settings(), &sync.commands_topic(), slot.clone()).await?;

    tracing::info!(
        server = %config.overkiz.server,
        topic_base = %sync.topic_base,
        "bridge starting"
    );

    let mut bridge = Bridge::new(client, bus, slot, sync);
    bridge.run().await.map_err(CliError::from)
}
