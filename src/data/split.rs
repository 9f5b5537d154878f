//! Train / validate / test resolution with a deterministic fallback chain
//!
//! 1. Query each date window.
//! 2. Empty train window: combine validate + test, or failing that take an
//!    unfiltered sample, and redistribute it with a seeded shuffle.
//! 3. Nothing anywhere: fatal.

use super::ExampleSource;
use crate::config::SplitConfig;
use crate::error::{Result, TrainerError};
use crate::types::{DateRange, LabeledExample, SplitName, SplitSets};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

/// Which path of the fallback chain produced the splits
#[derive(Debug, Clone, PartialEq)]
pub enum SplitResolution {
    /// All three splits come straight from their date windows
    Direct(SplitSets),
    /// Train window was empty; validate + test rows were redistributed
    FallbackCombined(SplitSets),
    /// Every window was empty; an unfiltered sample was redistributed
    FallbackSample(SplitSets),
}

impl SplitResolution {
    pub fn splits(&self) -> &SplitSets {
        match self {
            SplitResolution::Direct(s) | SplitResolution::FallbackCombined(s) | SplitResolution::FallbackSample(s) => s,
        }
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self, SplitResolution::Direct(_))
    }

    /// Date ranges to record: the requested windows for direct splits, the
    /// observed span of each split after a fallback
    pub fn date_ranges(&self, requested: &SplitConfig) -> SplitDateRanges {
        if !self.is_fallback() {
            return SplitDateRanges::requested(requested);
        }
        let splits = self.splits();
        SplitDateRanges {
            train: DateRange::spanning(&splits.train).unwrap_or(requested.train),
            validate: DateRange::spanning(&splits.validate).unwrap_or(requested.validate),
            test: DateRange::spanning(&splits.test).unwrap_or(requested.test),
        }
    }
}

/// Date ranges recorded in the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitDateRanges {
    pub train: DateRange,
    pub validate: DateRange,
    pub test: DateRange,
}

impl SplitDateRanges {
    pub fn requested(config: &SplitConfig) -> Self {
        Self {
            train: config.train,
            validate: config.validate,
            test: config.test,
        }
    }
}

/// Resolves splits from an [`ExampleSource`]
pub struct SplitProvider<'a> {
    config: &'a SplitConfig,
    sample_limit: usize,
}

impl<'a> SplitProvider<'a> {
    pub fn new(config: &'a SplitConfig, sample_limit: usize) -> Self {
        Self { config, sample_limit }
    }

    pub async fn resolve(&self, source: &dyn ExampleSource) -> Result<SplitResolution> {
        info!("📊 Loading dataset splits from {}...", source.name());
        let train = self.fetch(source, SplitName::Train, &self.config.train).await?;
        let validate = self.fetch(source, SplitName::Validate, &self.config.validate).await?;
        let test = self.fetch(source, SplitName::Test, &self.config.test).await?;

        let resolution = if !train.is_empty() {
            SplitResolution::Direct(SplitSets { train, validate, test })
        } else {
            let mut combined = validate;
            combined.extend(test);
            if !combined.is_empty() {
                SplitResolution::FallbackCombined(self.redistribute(combined))
            } else {
                let sample = source.fetch_sample(self.sample_limit).await?;
                if sample.is_empty() {
                    return Err(TrainerError::NoTrainingData);
                }
                SplitResolution::FallbackSample(self.redistribute(sample))
            }
        };

        let (n_train, n_val, n_test) = resolution.splits().sizes();
        if resolution.is_fallback() {
            warn!(
                "⚠️  No date-based training data. Split {} available rows: {} train, {} val, {} test",
                n_train + n_val + n_test,
                n_train,
                n_val,
                n_test
            );
        }
        if n_val == 0 {
            warn!("⚠️  Warning: No validation rows found for date range {}.", self.config.validate);
        }
        if n_test == 0 {
            warn!("⚠️  Warning: No test rows found for date range {}.", self.config.test);
        }

        Ok(resolution)
    }

    async fn fetch(&self, source: &dyn ExampleSource, split: SplitName, window: &DateRange) -> Result<Vec<LabeledExample>> {
        let rows = source.fetch_window(window).await?;
        info!("  {}: {} rows ({})", split, rows.len(), window);
        Ok(rows)
    }

    fn redistribute(&self, rows: Vec<LabeledExample>) -> SplitSets {
        partition_shuffled(rows, self.config.seed, self.config.train_fraction, self.config.validate_fraction)
    }
}

/// Shuffle with a seeded ChaCha8 stream, then cut into
/// `floor(n·train_fraction)` / `floor(n·validate_fraction)` / remainder
pub fn partition_shuffled(
    mut rows: Vec<LabeledExample>,
    seed: u64,
    train_fraction: f64,
    validate_fraction: f64,
) -> SplitSets {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let n = rows.len();
    let train_end = ((n as f64 * train_fraction).floor() as usize).min(n);
    let val_end = (train_end + (n as f64 * validate_fraction).floor() as usize).min(n);

    let test = rows.split_off(val_end);
    let validate = rows.split_off(train_end);
    SplitSets {
        train: rows,
        validate,
        test,
    }
}
