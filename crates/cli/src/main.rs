//! scriptflow CLI - run a scrape/generate pipeline with progress reporting.

mod config;
mod pipeline;
mod stages;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{PipelineConfig, GENERATE_STEP, SCRAPE_STEP};
use pipeline::{run_pipeline, LogObserver};
use scriptflow_core::TrackerEvent;
use scriptflow_progress::ProgressTracker;
use serde_json::json;
use stages::{GenerateStage, ScrapeStage, Stage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scriptflow")]
#[command(about = "Generate viral scripts from reference videos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pipeline config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline
    Run {
        /// Reference video URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Make a step's remote call fail
        #[arg(long, value_name = "STEP")]
        fail: Option<String>,

        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// List pipeline steps
    Steps,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { urls, fail, json } => {
            let tracker = ProgressTracker::builder(config.steps())
                .config(config.tracker.clone())
                .observer(Arc::new(LogObserver))
                .on_error(|message| eprintln!("Error: {message}"))
                .build()?;

            let mut events = tracker.subscribe();
            let printer = tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    if let TrackerEvent::StepProgress { step_id, progress } = event {
                        println!("  [{step_id}] {progress:>5.1}%");
                    }
                }
            });

            let mut scrape = ScrapeStage::new(
                SCRAPE_STEP,
                config.scrape.latency(),
                config.scrape.estimate(),
            );
            let mut generate = GenerateStage::new(
                GENERATE_STEP,
                config.generate.latency(),
                config.generate.estimate(),
            );
            match fail.as_deref() {
                Some(SCRAPE_STEP) => scrape = scrape.failing(),
                Some(GENERATE_STEP) => generate = generate.failing(),
                Some(other) => anyhow::bail!("Unknown step: {other}"),
                None => {}
            }
            let stages: Vec<Box<dyn Stage>> = vec![Box::new(scrape), Box::new(generate)];

            let result = run_pipeline(&tracker, &stages, json!({ "urls": urls })).await;
            let snapshot = tracker.snapshot();
            drop(tracker);
            printer.await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!("Overall: {:.0}%", snapshot.overall_progress);
                for step in &snapshot.steps {
                    println!("  {} | {} | {:.0}%", step.id, step.status, step.progress);
                }
            }

            let output = result?;
            info!("Pipeline finished");
            if let Some(script) = output.get("script").and_then(|s| s.as_str()) {
                println!("Script: {script}");
            }
        }
        Commands::Steps => {
            for (index, step) in config.steps().iter().enumerate() {
                println!("{}. {} - {}", index + 1, step.id, step.label);
            }
        }
    }

    Ok(())
}
