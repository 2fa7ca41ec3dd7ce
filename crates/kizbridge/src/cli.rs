use std::path::PathBuf;

use clap::Parser;

/// Bridge an Overkiz cloud account to an MQTT broker.
#[derive(Debug, Parser)]
#[command(name = "kizbridge", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-d: debug, -dd: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,
}
