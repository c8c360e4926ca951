use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use relink_export::{export, ExportConfig};
use relink_repair::{RepairConfig, Repairer};
use relink_types::ContentRef;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::*;
use crate::progress::{spawn_percent_printer, PercentTracker, StdoutUpdater};
use crate::settings::Settings;

#[derive(Clone, Copy)]
enum RepairKind {
    File,
    Directory,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    match cli.command {
        Command::Himalaya(cmd) => match cmd {
            HimalayaCommand::File(args) => cmd_repair(RepairKind::File, args, settings.repair).await,
            HimalayaCommand::Directory(args) => {
                cmd_repair(RepairKind::Directory, args, settings.repair).await
            }
            HimalayaCommand::ExportDb(args) => cmd_export_db(args, settings.export).await,
        },
    }
}

async fn cmd_repair(kind: RepairKind, args: RepairArgs, mut config: RepairConfig) -> anyhow::Result<()> {
    args.api.apply(&mut config);
    let reference: ContentRef = args
        .reference
        .parse()
        .with_context(|| format!("invalid reference {}", args.reference))?;
    let repairer = Repairer::connect(&config, Arc::new(StdoutUpdater))?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling repair");
                cancel.cancel();
            }
        })
    };

    let result = match kind {
        RepairKind::File => repairer.file_repair(&cancel, &reference).await,
        RepairKind::Directory => repairer.directory_repair(&cancel, &reference).await,
    };
    ctrl_c.abort();

    match result {
        Ok(new_reference) => {
            println!(
                "{} New reference: {}",
                "✓".green().bold(),
                new_reference.to_string().yellow()
            );
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("{} Repair cancelled, no reference produced", "✗".red().bold());
            Err(e.into())
        }
        Err(e) => Err(e).with_context(|| format!("repairing {reference}")),
    }
}

async fn cmd_export_db(args: ExportArgs, mut config: ExportConfig) -> anyhow::Result<()> {
    if let Some(destination) = args.destination_file {
        config.destination = destination;
    }
    let tracker = Arc::new(PercentTracker::default());
    let stop = CancellationToken::new();
    let printer = spawn_percent_printer(tracker.clone(), stop.clone());

    let source = args.database;
    let progress = tracker.clone();
    let result = tokio::task::spawn_blocking(move || export(&source, &config, &*progress)).await;
    stop.cancel();
    printer.await?;

    let summary = result??;
    println!("Progress 100 %");
    println!(
        "{} Exported {} chunks to {}",
        "✓".green().bold(),
        summary.exported.to_string().bold(),
        summary.destination.display()
    );
    Ok(())
}
