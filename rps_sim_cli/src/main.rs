use anyhow::Context;
use clap::Parser;
use rps_sim::{Outcome, Simulation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod outputs;

use args::Cli;
use outputs::{CliReporter, CliSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.run_config().context("invalid run configuration")?;
    println!("{config}");

    let handle = Simulation::builder()
        .config(config)
        .sink(CliSink::new(cli.sink))
        .reporter(CliReporter::new(cli.report))
        .build()
        .start();

    let trigger = handle.shutdown_trigger();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down...");
            trigger.trigger();
        }
    });

    let summary = handle.wait().await.context("run aborted")?;
    match summary.outcome {
        Outcome::Completed => tracing::info!(
            items = summary.items,
            steps = summary.steps,
            elapsed = ?summary.elapsed,
            "Run completed"
        ),
        Outcome::Cancelled => tracing::info!(
            items = summary.items,
            steps = summary.steps,
            elapsed = ?summary.elapsed,
            "Run cancelled"
        ),
    }
    if summary.interrupted_sleeps > 0 {
        tracing::warn!(
            count = summary.interrupted_sleeps,
            "Pacing sleeps were interrupted"
        );
    }

    Ok(())
}
