//! Sourcing - Marketplace Product Sourcing
//!
//! Command-line driver: single-material search, rate-limited batch runs,
//! term preview and configuration bootstrap.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};

use sourcing::cli::{Args, Commands};
use sourcing::config::Config;
use sourcing::model::{Material, SearchOptions};
use sourcing::translate::TermTranslator;
use sourcing::workflow::{BatchOrchestrator, SourcingWorkflow};

const LOG_FILE_NAME: &str = "sourcing.log";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env_overrides();

    match args.command {
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Term { phrase, max_words } => {
            let translator = TermTranslator::new();
            let simplified = translator.simplify(&phrase, max_words.unwrap_or(config.search.max_term_words));
            let translated = translator.translate(&simplified);
            println!("simplified: {}", simplified);
            println!("marketplace term: {}", translated);
            if translated == simplified {
                println!("(no dictionary entry; a live search would ask the completion provider)");
            }
        }
        Commands::Search { query, description, image, max_results, no_translate, filters } => {
            let mut material = Material::new(&query);
            if let Some(description) = description.as_deref() {
                material = material.with_description(description);
            }
            if let Some(image) = image.as_deref() {
                material = material.with_image(image);
            }

            let options = build_options(&config, max_results, &filters, !no_translate);
            let workflow = SourcingWorkflow::from_config(&config)?;
            let result = workflow.search_material(&material, &options).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Batch { input, output, delay_ms, max_results, filters } => {
            info!("Loading materials from: {}", input.display());
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let materials: Vec<Material> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse materials from {}", input.display()))?;

            if let Some(delay_ms) = delay_ms {
                config.batch.inter_call_delay_ms = delay_ms;
            }
            let options = build_options(&config, max_results, &filters, config.search.translate_terms);
            let orchestrator = BatchOrchestrator::from_config(&config)?;

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling batch after the current item");
                    trigger.cancel();
                }
            });

            let pb = ProgressBar::new(materials.len() as u64);
            pb.set_style(ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"));

            let mut on_progress = |done: usize, _total: usize, label: &str| {
                pb.set_position(done as u64);
                pb.set_message(label.to_string());
            };

            let report = orchestrator
                .run_batch(&materials, &options, Some(&mut on_progress), Some(&cancel))
                .await?;
            pb.finish_with_message(format!("{:?}", report.status));

            println!(
                "{} materials: {} completed, {} failed, {} skipped",
                report.total_requested, report.completed, report.failed, report.skipped
            );

            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write report to {}", path.display()))?;
                    info!("Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

fn build_options(
    config: &Config,
    max_results: Option<usize>,
    filters: &sourcing::cli::FilterArgs,
    translate_term: bool,
) -> SearchOptions {
    let mut options = config.search.to_options();
    if let Some(max_results) = max_results {
        options.max_results = max_results.max(1);
    }
    options.translate_term = translate_term;
    filters.merge_into(&mut options.filters);
    options
}

/// Console output on stderr plus a daily log file under `.sourcing/log`.
///
/// The returned guard flushes the file writer when dropped.
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".sourcing").join("log");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let (file_writer, guard) = non_blocking(rolling::daily(&log_dir, LOG_FILE_NAME));
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    // plain text, one record per line
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    debug!("Logging at {} to {}", log_level, log_dir.join(LOG_FILE_NAME).display());
    Ok(guard)
}
