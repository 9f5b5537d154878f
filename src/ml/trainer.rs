//! Per-target classifier training, evaluation and calibration

use super::calibration::{CalibrationOutcome, Calibrator};
use super::features::{class_counts, FeatureMatrix};
use super::logistic::{ClassWeights, LinearModel, LogisticRegression};
use super::metrics::{SplitMetrics, TargetMetrics};
use crate::config::{CalibrationConfig, SolverConfig};
use crate::error::Result;
use crate::types::{has_both_classes, SplitName, Target};
use tracing::{info, warn};

/// Standardized train / validate / test matrices
#[derive(Debug, Clone, Default)]
pub struct PreparedSplits {
    pub train: FeatureMatrix,
    pub validate: FeatureMatrix,
    pub test: FeatureMatrix,
}

impl PreparedSplits {
    pub fn get(&self, split: SplitName) -> &FeatureMatrix {
        match split {
            SplitName::Train => &self.train,
            SplitName::Validate => &self.validate,
            SplitName::Test => &self.test,
        }
    }
}

/// A classifier that was fit, with its metrics and calibration
#[derive(Debug, Clone, PartialEq)]
pub struct FittedTarget {
    pub model: LinearModel,
    pub metrics: TargetMetrics,
    pub calibration: CalibrationOutcome,
    pub converged: bool,
}

/// What happened to one target
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOutcome {
    Fitted(FittedTarget),
    Skipped { reason: String },
}

impl TargetOutcome {
    pub fn fitted(&self) -> Option<&FittedTarget> {
        match self {
            TargetOutcome::Fitted(fitted) => Some(fitted),
            TargetOutcome::Skipped { .. } => None,
        }
    }
}

/// Fits one class-weighted classifier per target
#[derive(Debug, Clone)]
pub struct ClassifierTrainer {
    solver: SolverConfig,
    calibrator: Calibrator,
}

impl ClassifierTrainer {
    pub fn new(solver: SolverConfig, calibration: CalibrationConfig) -> Self {
        Self {
            solver,
            calibrator: Calibrator::new(calibration),
        }
    }

    /// Fit, evaluate and calibrate `target`.
    ///
    /// A single-class training split yields `TargetOutcome::Skipped`.
    pub fn train(&self, target: Target, splits: &PreparedSplits) -> Result<TargetOutcome> {
        let labels = splits.train.labels(target);
        info!("🔧 Training {} model on {} samples...", target, labels.len());

        if !has_both_classes(labels) {
            warn!("⚠️  {}: Not enough class diversity. Skipping {} model.", target, target);
            return Ok(TargetOutcome::Skipped {
                reason: "training split has a single class".to_string(),
            });
        }

        let (negatives, positives) = class_counts(labels);
        info!("   Class distribution: [{} {}]", negatives, positives);

        let report = LogisticRegression::new(self.solver)
            .with_class_weights(ClassWeights::balanced(labels))
            .fit(&splits.train.rows, labels)?;
        if !report.converged {
            warn!("⚠️  {}: solver stopped after {} iterations without converging", target, report.iterations);
        }

        let mut metrics = TargetMetrics::with_sizes(splits.train.len(), splits.validate.len(), splits.test.len());
        for split in [SplitName::Validate, SplitName::Test] {
            if let Some(result) = evaluate(target, split, &report.model, splits.get(split)) {
                metrics.record(split, result);
            }
        }

        let calibration = self
            .calibrator
            .calibrate(target, &report.model, &splits.train, &splits.validate)?;

        Ok(TargetOutcome::Fitted(FittedTarget {
            model: report.model,
            metrics,
            calibration,
            converged: report.converged,
        }))
    }
}

/// Metrics for one split, or `None` (with a diagnostic) if it is unusable
pub fn evaluate(target: Target, split: SplitName, model: &LinearModel, data: &FeatureMatrix) -> Option<SplitMetrics> {
    let labels = data.labels(target);
    if data.is_empty() {
        warn!("⚠️  {} {}: split is empty, skipping metrics", target, split);
        return None;
    }
    let probs = model.predict_proba_batch(&data.rows);
    match SplitMetrics::compute(labels, &probs) {
        Some(metrics) => {
            info!(
                "✅ {} {}: Log Loss={:.4}, Brier={:.4}, ROC-AUC={:.4}",
                target, split, metrics.log_loss, metrics.brier, metrics.roc_auc
            );
            Some(metrics)
        }
        None => {
            warn!("⚠️  {} {}: Only one class in split, skipping metrics", target, split);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::calibration::CalibrationSource;

    /// Two informative features, label = x0 + 0.5·x1 > threshold with
    /// deterministic noise
    fn synthetic(n: usize, offset: usize) -> FeatureMatrix {
        let mut rows = Vec::new();
        let mut g1f5 = Vec::new();
        let mut g1f10 = Vec::new();
        for k in 0..n {
            let i = k + offset;
            let x0 = ((i * 37) % 101) as f64 / 50.0 - 1.0;
            let x1 = ((i * 53) % 89) as f64 / 44.0 - 1.0;
            let score = x0 + 0.5 * x1;
            let flip = i % 11 == 0;
            g1f5.push(u8::from((score > 0.4) ^ flip));
            g1f10.push(u8::from((score > -0.3) ^ flip));
            rows.push(vec![x0, x1]);
        }
        FeatureMatrix { rows, g1f5, g1f10 }
    }

    fn trainer() -> ClassifierTrainer {
        ClassifierTrainer::new(SolverConfig::classifier(), CalibrationConfig::default())
    }

    #[test]
    fn test_train_fits_both_targets() {
        let splits = PreparedSplits {
            train: synthetic(400, 0),
            validate: synthetic(100, 400),
            test: synthetic(100, 500),
        };

        for target in Target::ALL {
            let outcome = trainer().train(target, &splits).unwrap();
            let fitted = outcome.fitted().expect("target should be fitted");
            assert_eq!(fitted.model.weights.len(), 2);
            assert!(fitted.converged);
            assert_eq!(fitted.metrics.n_train, 400);
            assert_eq!(fitted.metrics.n_val, 100);
            assert_eq!(fitted.metrics.n_test, 100);
            assert!(fitted.metrics.val_roc_auc.unwrap() > 0.7);
            assert!(fitted.metrics.test_roc_auc.unwrap() > 0.7);
            assert!(matches!(
                fitted.calibration,
                CalibrationOutcome::Fitted { source: CalibrationSource::Validation, .. }
            ));
        }
    }

    #[test]
    fn test_single_class_train_is_skipped() {
        let mut train = synthetic(200, 0);
        train.g1f5 = vec![0; 200];
        let splits = PreparedSplits {
            train,
            validate: synthetic(50, 200),
            test: FeatureMatrix::default(),
        };

        let outcome = trainer().train(Target::G1f5, &splits).unwrap();
        assert!(matches!(outcome, TargetOutcome::Skipped { .. }));
        assert!(outcome.fitted().is_none());

        let other = trainer().train(Target::G1f10, &splits).unwrap();
        assert!(other.fitted().is_some());
    }

    #[test]
    fn test_missing_splits_omit_metrics() {
        let mut validate = synthetic(50, 400);
        validate.g1f10 = vec![1; 50];
        let splits = PreparedSplits {
            train: synthetic(300, 0),
            validate,
            test: FeatureMatrix::default(),
        };

        let outcome = trainer().train(Target::G1f10, &splits).unwrap();
        let fitted = outcome.fitted().unwrap();
        assert!(fitted.metrics.val_log_loss.is_none());
        assert!(fitted.metrics.test_log_loss.is_none());
        assert_eq!(fitted.metrics.n_test, 0);
        // Single-class validation pushes calibration onto the train holdout
        assert!(matches!(
            fitted.calibration,
            CalibrationOutcome::Fitted { source: CalibrationSource::TrainHoldout, n_samples: 60, .. }
        ));
    }
}
