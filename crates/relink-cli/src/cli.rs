use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use relink_repair::RepairConfig;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "relink",
    about = "Migrate legacy uploads and export local chunk stores",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log verbosity: 0 silent, 1 error, 2 warn, 3 info, 4 debug, 5 trace
    #[arg(long, global = true, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub verbosity: u8,

    /// TOML settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Maximum log level, or `None` when logging is off.
    pub fn log_level(&self) -> Option<Level> {
        match self.verbosity {
            0 => None,
            1 => Some(Level::ERROR),
            2 => Some(Level::WARN),
            3 => Some(Level::INFO),
            4 => Some(Level::DEBUG),
            _ => Some(Level::TRACE),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Tools for data written before the current manifest format
    #[command(subcommand)]
    Himalaya(HimalayaCommand),
}

#[derive(Subcommand)]
pub enum HimalayaCommand {
    /// Repair a legacy single-file upload
    File(RepairArgs),
    /// Repair a legacy directory upload
    Directory(RepairArgs),
    /// Export a local chunk index to a tar archive
    ExportDb(ExportArgs),
}

#[derive(Args)]
pub struct RepairArgs {
    /// Reference of the legacy upload (hex)
    pub reference: String,
    #[command(flatten)]
    pub api: ApiArgs,
}

#[derive(Args)]
pub struct ApiArgs {
    /// Node API host
    #[arg(long)]
    pub host: Option<String>,
    /// Node API port
    #[arg(long)]
    pub port: Option<u16>,
    /// Use https for the node API
    #[arg(long)]
    pub ssl: bool,
    /// Upload the new manifest encrypted
    #[arg(long)]
    pub encrypt: bool,
    /// Pin the new manifest
    #[arg(long)]
    pub pin: bool,
}

impl ApiArgs {
    /// Override settings from the config file with flags given on the
    /// command line.
    pub fn apply(&self, config: &mut RepairConfig) {
        if let Some(host) = &self.host {
            config.api.host = host.clone();
        }
        if let Some(port) = self.port {
            config.api.port = port;
        }
        config.api.ssl |= self.ssl;
        config.encrypt |= self.encrypt;
        config.pin |= self.pin;
    }
}

#[derive(Args)]
pub struct ExportArgs {
    /// Directory holding the chunk index
    pub database: PathBuf,
    /// Archive to write
    #[arg(long = "destination-file")]
    pub destination_file: Option<PathBuf>,
}
