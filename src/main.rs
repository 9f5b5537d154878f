//! Early-Goal Dual Logistic Trainer
//!
//! Trains the G1F5 / G1F10 classifiers from the early-game dataset and writes
//! the calibrated JSON artifact.

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use early_goal_trainer::{
    artifact::Artifact,
    config::Config,
    data::PgExampleSource,
    pipeline::TrainingPipeline,
    types::{DateRange, SplitName, Target},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "early-goal-trainer")]
#[command(about = "Train the dual early-goal logistic model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Train both targets and write the artifact
    Train {
        /// Database connection string (overrides config and environment)
        #[arg(long)]
        db: Option<String>,
        /// Artifact output path
        #[arg(long)]
        out: Option<String>,
        /// Train set start date (YYYY-MM-DD)
        #[arg(long)]
        train_start: Option<NaiveDate>,
        /// Train set end date, exclusive
        #[arg(long)]
        train_end: Option<NaiveDate>,
        /// Validation set start date
        #[arg(long)]
        val_start: Option<NaiveDate>,
        /// Validation set end date, exclusive
        #[arg(long)]
        val_end: Option<NaiveDate>,
        /// Test set start date
        #[arg(long)]
        test_start: Option<NaiveDate>,
        /// Test set end date, exclusive
        #[arg(long)]
        test_end: Option<NaiveDate>,
    },
    /// Summarize an existing artifact
    Inspect {
        /// Artifact path
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            db,
            out,
            train_start,
            train_end,
            val_start,
            val_end,
            test_start,
            test_end,
        } => {
            let mut config = Config::load(&cli.config).context("Failed to load configuration")?;
            if db.is_some() {
                config.database.url = db;
            }
            if out.is_some() {
                config.artifact.output = out;
            }
            let splits = &mut config.splits;
            splits.train = override_window(splits.train, train_start, train_end);
            splits.validate = override_window(splits.validate, val_start, val_end);
            splits.test = override_window(splits.test, test_start, test_end);

            train(config).await
        }
        Commands::Inspect { path } => inspect(&path),
    }
}

fn override_window(window: DateRange, start: Option<NaiveDate>, end: Option<NaiveDate>) -> DateRange {
    DateRange::new(start.unwrap_or(window.start), end.unwrap_or(window.end))
}

async fn train(config: Config) -> anyhow::Result<()> {
    let Some(output) = config.artifact.output.clone() else {
        bail!("No output path provided (--out or artifact.output)");
    };
    let output = shellexpand::tilde(&output).into_owned();

    tracing::info!("🏒 Starting early-goal training run");
    let source = PgExampleSource::connect(&config.database, &config.features)
        .await
        .context("Failed to connect to database")?;

    let pipeline = TrainingPipeline::new(config);
    let artifact = pipeline.run(&source).await?;
    artifact
        .save(&output)
        .with_context(|| format!("Failed to write artifact to {}", output))?;

    Ok(())
}

fn inspect(path: &str) -> anyhow::Result<()> {
    let path = shellexpand::tilde(path).into_owned();
    let artifact = Artifact::load(&path).with_context(|| format!("Failed to read artifact {}", path))?;

    println!("📦 {} ({})", artifact.version, artifact.kind);
    println!("   Trained at: {}", artifact.trained_at.to_rfc3339());
    println!("   Features:   {}", artifact.feature_order.len());
    println!("   Train:      {}", artifact.train_date_range);
    println!("   Validate:   {}", artifact.val_date_range);
    println!("   Test:       {}", artifact.test_date_range);

    for target in Target::ALL {
        match artifact.target(target) {
            Some(section) => {
                let metrics = &section.metrics;
                println!(
                    "\n🎯 {}: n_train={} n_val={} n_test={}",
                    target, metrics.n_train, metrics.n_val, metrics.n_test
                );
                for split in [SplitName::Validate, SplitName::Test] {
                    if let Some(m) = metrics.for_split(split) {
                        println!(
                            "   {}: Log Loss={:.4}, Brier={:.4}, ROC-AUC={:.4}",
                            split, m.log_loss, m.brier, m.roc_auc
                        );
                    }
                }
                match artifact.calibration_for(target) {
                    Some(map) => println!(
                        "   Calibration: {:?}, 0.25 -> {:.4}",
                        map.family(),
                        map.apply(0.25)
                    ),
                    None => println!("   Calibration: none (raw probabilities)"),
                }
            }
            None => println!("\n🎯 {}: not trained", target),
        }
    }

    Ok(())
}
