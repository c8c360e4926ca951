use clap::Parser;

mod cli;
mod commands;
mod progress;
mod settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    if let Some(level) = cli.log_level() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }
    commands::run_command(cli).await
}
