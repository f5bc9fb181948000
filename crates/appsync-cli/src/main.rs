use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use appsync_catalogs::FixtureSnapshot;
use appsync_sync::{build_scheduler, ItemOutcome, SyncConfig, SyncPipeline, SyncReport};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "appsync")]
#[command(about = "Reconcile the workspace apps database with the app inventory")]
struct Cli {
    /// YAML file overriding non-secret settings from the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one reconciliation pass
    Sync,
    /// Show what a pass would write, without writing
    Plan {
        /// Diff an offline snapshot instead of the live catalogs
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },
    /// Run a pass on every tick of APPSYNC_SYNC_CRON until ctrl-c
    Schedule,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("APPSYNC_LOG_JSON").is_ok_and(|v| v == "1");
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn outcome_label(outcome: &ItemOutcome) -> String {
    match outcome {
        ItemOutcome::Applied { action } => format!("{action:?}"),
        ItemOutcome::Unchanged => "unchanged".to_string(),
        ItemOutcome::Failed { error } => format!("failed: {error}"),
    }
}

fn print_items(report: &SyncReport) {
    for batch in &report.batches {
        for item in &batch.items {
            println!(
                "  {:<24} {:<7} {:<28} {}",
                batch.direction.to_string(),
                format!("{:?}", batch.kind),
                item.name,
                outcome_label(&item.outcome)
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = SyncConfig::from_env();
    if let Some(path) = &cli.config {
        config = config.with_file(path)?;
    }

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let report = SyncPipeline::new(config)?.run_once().await?;
            println!(
                "sync complete: run_id={} applied={} unchanged={} failed={} report={}",
                report.run_id,
                report.applied(),
                report.unchanged(),
                report.failed(),
                report.report_path.as_deref().unwrap_or("-")
            );
        }
        Commands::Plan { fixtures } => {
            let report = match fixtures {
                Some(path) => {
                    let snapshot = FixtureSnapshot::load(&path)?;
                    if config.workspace_database_id.is_none() {
                        config.workspace_database_id = Some(snapshot.database_id.clone());
                    }
                    let (workspace, inventory) = snapshot.into_catalogs();
                    SyncPipeline::with_catalogs(config, workspace, inventory)?
                        .plan()
                        .await?
                }
                None => SyncPipeline::new(config)?.plan().await?,
            };
            println!(
                "plan: workspace_pages={} inventory_apps={} writes={} unchanged={}",
                report.workspace_pages,
                report.inventory_apps,
                report.applied() + report.failed(),
                report.unchanged()
            );
            print_items(&report);
        }
        Commands::Schedule => {
            let cron = config.sync_cron.clone();
            let pipeline = Arc::new(SyncPipeline::new(config)?);
            let mut sched = build_scheduler(pipeline).await?;
            sched.start().await.context("starting scheduler")?;
            info!(%cron, "scheduler running; ctrl-c to stop");

            tokio::signal::ctrl_c()
                .await
                .context("waiting for ctrl-c")?;
            sched.shutdown().await.context("stopping scheduler")?;
        }
    }

    Ok(())
}
