//! discussion-labeler - label unlabeled GitHub discussions on a schedule.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use discussion_labeler::classifier::{ChatCompletionClassifier, Classifier, LabelTaxonomy};
use discussion_labeler::config::{ConfigArgs, LabelerConfig};
use discussion_labeler::pipeline::LabelingPipeline;
use discussion_labeler::scheduler::run_periodically;

/// Classify unlabeled GitHub discussions and apply repository labels.
#[derive(Parser)]
#[command(name = "discussion-labeler")]
#[command(about = "Scheduled GitHub discussion labeling agent")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run now, then every RUN_INTERVAL_MINUTES until interrupted (default)
    Run,

    /// Run a single labeling pass (for CronJob use)
    Once {
        /// Classify but do not apply labels
        #[arg(long)]
        dry_run: bool,
    },

    /// Classify ad-hoc text and print the suggested tags
    Classify {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        body: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = LabelerConfig::from(cli.config);
    log_unhandled(run(cli.command.unwrap_or(Commands::Run), &config).await)
}

async fn run(command: Commands, config: &LabelerConfig) -> Result<()> {
    let classifier = Arc::new(
        ChatCompletionClassifier::new(config.azure.clone(), config.request_timeout)
            .context("Failed to create classifier")?,
    );
    if !classifier.settings().is_configured() {
        warn!("Azure OpenAI endpoint or key not set; no labels will be suggested");
    }

    match command {
        Commands::Run => run_scheduled(config, classifier).await,
        Commands::Once { dry_run } => run_once(config, classifier, dry_run).await,
        Commands::Classify { title, body } => {
            run_classify(config, classifier.as_ref(), &title, &body).await
        }
    }
}

/// Send a failed run through the log pipeline before it reaches stderr.
fn log_unhandled(result: Result<()>) -> Result<()> {
    result.inspect_err(|e| error!(error = %format!("{e:#}"), "Unhandled error"))
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("discussion_labeler=debug,github_app=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("discussion_labeler=info,github_app=info,warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn run_scheduled(config: &LabelerConfig, classifier: Arc<dyn Classifier>) -> Result<()> {
    let pipeline = LabelingPipeline::from_config(config, classifier, false)?;
    info!(
        repo = %config.repo,
        app_id = config.identity.app_id.as_deref().unwrap_or("<unset>"),
        interval_minutes = config.run_interval.as_secs() / 60,
        "Starting discussion labeler"
    );

    let pipeline = &pipeline;
    tokio::select! {
        () = run_periodically(config.run_interval, move || async move {
            pipeline.run().await;
        }) => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for ctrl-c")?;
            info!("Application stopped by user");
            Ok(())
        }
    }
}

async fn run_once(
    config: &LabelerConfig,
    classifier: Arc<dyn Classifier>,
    dry_run: bool,
) -> Result<()> {
    let pipeline = LabelingPipeline::from_config(config, classifier, dry_run)?;
    let summary = pipeline.run().await;

    println!("\nRun summary for {}", summary.repo);
    println!("   Visited: {}", summary.outcomes.len());
    println!("   Labeled: {}", summary.labeled());
    println!("   Not applied: {}", summary.not_applied());
    println!("   Skipped: {}", summary.skipped());
    println!("   Failed: {}", summary.failed());
    for result in summary.assignments() {
        println!(
            "     #{} {:?} -> {}",
            result.discussion_number,
            result.requested,
            if result.success { "ok" } else { "not applied" }
        );
    }

    if let discussion_labeler::RunStatus::Aborted { phase, reason } = summary.status {
        anyhow::bail!("Run aborted while {phase}: {reason}");
    }
    Ok(())
}

async fn run_classify(
    config: &LabelerConfig,
    classifier: &dyn Classifier,
    title: &str,
    body: &str,
) -> Result<()> {
    let taxonomy = LabelTaxonomy::load(&config.tags_file)?;
    let classification = classifier.classify(title, body, &taxonomy).await?;

    info!(source = ?classification.source, "Classified text");
    println!("{}", serde_json::to_string(&classification.tags)?);
    Ok(())
}
