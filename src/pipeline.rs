//! End-to-end training run
//!
//! Resolving splits is the only async step; everything after it is a pure
//! function of the resolved rows and the configuration.

use crate::artifact::{Artifact, ArtifactBuilder};
use crate::config::Config;
use crate::data::{ExampleSource, SplitDateRanges, SplitProvider};
use crate::error::{Result, TrainerError};
use crate::ml::{ClassifierTrainer, FeatureMatrix, PreparedSplits, StandardScaler, TargetOutcome};
use crate::types::{LabeledExample, SplitSets, Target};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Runs one training job with a fixed configuration
pub struct TrainingPipeline {
    config: Config,
}

impl TrainingPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load splits from `source` and train both targets
    pub async fn run(&self, source: &dyn ExampleSource) -> Result<Artifact> {
        let provider = SplitProvider::new(&self.config.splits, self.config.database.fallback_sample_limit);
        let resolution = provider.resolve(source).await?;
        let ranges = resolution.date_ranges(&self.config.splits);
        self.fit(resolution.splits(), ranges, Utc::now())
    }

    /// Standardize, fit, evaluate and calibrate both targets on resolved splits
    pub fn fit(&self, splits: &SplitSets, ranges: SplitDateRanges, trained_at: DateTime<Utc>) -> Result<Artifact> {
        if splits.train.is_empty() {
            return Err(TrainerError::NoTrainingData);
        }
        let n_features = self.config.features.len();
        for rows in [&splits.train, &splits.validate, &splits.test] {
            check_width(rows, n_features)?;
        }

        let train = FeatureMatrix::from_examples(&splits.train);
        let validate = FeatureMatrix::from_examples(&splits.validate);
        let test = FeatureMatrix::from_examples(&splits.test);

        let scaler = StandardScaler::fit(&train.rows)?;
        info!("🔧 Standardized {} features on {} training rows", scaler.n_features(), train.len());
        let prepared = PreparedSplits {
            train: train.with_rows(scaler.transform(&train.rows)),
            validate: validate.with_rows(scaler.transform(&validate.rows)),
            test: test.with_rows(scaler.transform(&test.rows)),
        };

        let trainer = ClassifierTrainer::new(self.config.training, self.config.calibration.clone());
        let mut builder = ArtifactBuilder::new(&self.config.artifact.version, scaler, ranges, &self.config.features)
            .with_trained_at(trained_at);
        for target in Target::ALL {
            let outcome = trainer.train(target, &prepared)?;
            log_outcome(target, &outcome);
            builder = builder.with_target(target, &outcome);
        }

        let artifact = builder.build();
        if artifact.g1f5.is_none() && artifact.g1f10.is_none() {
            warn!("⚠️  Neither target could be trained; artifact carries no classifiers");
        }
        Ok(artifact)
    }
}

fn check_width(rows: &[LabeledExample], expected: usize) -> Result<()> {
    match rows.iter().find(|r| r.features.len() != expected) {
        Some(row) => Err(TrainerError::DimensionMismatch {
            expected,
            actual: row.features.len(),
        }),
        None => Ok(()),
    }
}

fn log_outcome(target: Target, outcome: &TargetOutcome) {
    match outcome {
        TargetOutcome::Fitted(fitted) => match serde_json::to_string(&fitted.metrics) {
            Ok(json) => info!("📊 {} metrics: {}", target, json),
            Err(e) => warn!("Failed to serialize {} metrics: {}", target, e),
        },
        TargetOutcome::Skipped { reason } => warn!("⚠️  {} omitted from artifact: {}", target, reason),
    }
}
