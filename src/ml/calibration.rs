//! Hybrid probability calibration
//!
//! Raw classifier probabilities are re-mapped by a small second model fit on
//! held-out predictions:
//! - Beta calibration for G1F5: `sigmoid(a·ln p + b·ln(1-p) + c)`, followed by
//!   an anchor correction on the intercept
//! - Platt scaling for G1F10: `sigmoid(A·logit(p) + B)`
//!
//! A missing mapping is the identity.

use super::features::FeatureMatrix;
use super::logistic::{logit, sigmoid, ClassWeights, LinearModel, LogisticRegression};
use crate::config::CalibrationConfig;
use crate::error::Result;
use crate::types::{has_both_classes, Target};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Raw probabilities are clipped to `[CLIP_EPS, 1 - CLIP_EPS]` before any log
pub const CLIP_EPS: f64 = 1e-7;

/// Raw values logged after each fit
const PROBE_POINTS: [f64; 4] = [0.2, 0.3, 0.35, 0.4];

pub fn clip_probability(p: f64) -> f64 {
    p.clamp(CLIP_EPS, 1.0 - CLIP_EPS)
}

/// Beta calibration coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaParams {
    /// Coefficient on `ln p`
    pub a: f64,
    /// Coefficient on `ln(1 - p)`
    pub b: f64,
    /// Intercept
    pub c: f64,
}

impl BetaParams {
    fn features(raw: f64) -> Vec<f64> {
        let p = clip_probability(raw);
        vec![p.ln(), (1.0 - p).ln()]
    }

    pub fn apply(&self, raw: f64) -> f64 {
        let p = clip_probability(raw);
        sigmoid(self.a * p.ln() + self.b * (1.0 - p).ln() + self.c)
    }
}

/// Platt scaling coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattParams {
    #[serde(rename = "A")]
    pub scale: f64,
    #[serde(rename = "B")]
    pub intercept: f64,
}

impl PlattParams {
    fn log_odds(raw: f64) -> f64 {
        (clip_probability(raw) / clip_probability(1.0 - raw)).ln()
    }

    pub fn apply(&self, raw: f64) -> f64 {
        sigmoid(self.scale * Self::log_odds(raw) + self.intercept)
    }
}

/// A fitted mapping, serialized as `{ "method": ..., "params": {...} }`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "lowercase")]
pub enum CalibrationMap {
    Beta(BetaParams),
    Platt(PlattParams),
}

impl CalibrationMap {
    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            CalibrationMap::Beta(params) => params.apply(raw),
            CalibrationMap::Platt(params) => params.apply(raw),
        }
    }

    pub fn family(&self) -> CalibrationFamily {
        match self {
            CalibrationMap::Beta(_) => CalibrationFamily::Beta,
            CalibrationMap::Platt(_) => CalibrationFamily::Platt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationFamily {
    Beta,
    Platt,
}

impl CalibrationFamily {
    /// G1F5 is the sparser target and gets the more flexible beta family
    pub fn for_target(target: Target) -> Self {
        match target {
            Target::G1f5 => CalibrationFamily::Beta,
            Target::G1f10 => CalibrationFamily::Platt,
        }
    }
}

/// Where the calibration set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationSource {
    Validation,
    TrainHoldout,
}

/// Calibration result for one target
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    Fitted {
        map: CalibrationMap,
        source: CalibrationSource,
        n_samples: usize,
        /// Intercept shift applied by the anchor correction
        anchor_shift: Option<f64>,
    },
    Skipped {
        reason: String,
    },
}

impl CalibrationOutcome {
    pub fn map(&self) -> Option<&CalibrationMap> {
        match self {
            CalibrationOutcome::Fitted { map, .. } => Some(map),
            CalibrationOutcome::Skipped { .. } => None,
        }
    }
}

/// Fits the per-target calibration mapping
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Trailing rows of train used when validation is unusable
    pub fn holdout_size(&self, n_train: usize) -> usize {
        let fraction = (n_train as f64 * self.config.holdout_fraction).floor() as usize;
        fraction.max(self.config.holdout_min).min(n_train)
    }

    /// Choose the calibration set, score it with `model`, and fit the
    /// family assigned to `target`
    pub fn calibrate(
        &self,
        target: Target,
        model: &LinearModel,
        train: &FeatureMatrix,
        validate: &FeatureMatrix,
    ) -> Result<CalibrationOutcome> {
        let val_labels = validate.labels(target);
        let (source, rows, labels) = if !validate.is_empty() && has_both_classes(val_labels) {
            (CalibrationSource::Validation, &validate.rows[..], val_labels)
        } else {
            let start = train.len() - self.holdout_size(train.len());
            (
                CalibrationSource::TrainHoldout,
                &train.rows[start..],
                &train.labels(target)[start..],
            )
        };

        if labels.is_empty() || !has_both_classes(labels) {
            warn!(
                "⚠️  {}: calibration set ({:?}, {} rows) lacks both classes, raw probabilities stand",
                target,
                source,
                labels.len()
            );
            return Ok(CalibrationOutcome::Skipped {
                reason: format!("calibration set from {:?} has a single class", source),
            });
        }

        let raw = model.predict_proba_batch(rows);
        let (map, anchor_shift) = match CalibrationFamily::for_target(target) {
            CalibrationFamily::Beta => {
                let (params, shift) = self.fit_beta(&raw, labels)?;
                info!(
                    "✅ {} Beta Calibration: a={:.4}, b={:.4}, c={:.4} (fitted on {} samples)",
                    target,
                    params.a,
                    params.b,
                    params.c,
                    labels.len()
                );
                (CalibrationMap::Beta(params), shift)
            }
            CalibrationFamily::Platt => {
                let params = self.fit_platt(&raw, labels)?;
                info!(
                    "✅ {} Platt Scaling: A={:.4}, B={:.4} (fitted on {} samples)",
                    target,
                    params.scale,
                    params.intercept,
                    labels.len()
                );
                (CalibrationMap::Platt(params), None)
            }
        };

        let mapping: Vec<String> = PROBE_POINTS
            .iter()
            .map(|&p| format!("{:.2}->{:.4}", p, map.apply(p)))
            .collect();
        info!("   Test mapping: {}", mapping.join(", "));

        Ok(CalibrationOutcome::Fitted {
            map,
            source,
            n_samples: labels.len(),
            anchor_shift,
        })
    }

    /// Class-weighted logistic fit on `[ln p, ln(1-p)]`, then the anchor
    /// correction. Returns the parameters and the intercept shift, if any.
    pub fn fit_beta(&self, raw: &[f64], labels: &[u8]) -> Result<(BetaParams, Option<f64>)> {
        let features: Vec<Vec<f64>> = raw.iter().map(|&p| BetaParams::features(p)).collect();
        let report = LogisticRegression::new(self.config.beta)
            .with_class_weights(ClassWeights::balanced(labels))
            .fit(&features, labels)?;

        let mut params = BetaParams {
            a: report.model.weights[0],
            b: report.model.weights[1],
            c: report.model.bias,
        };

        let before = params.apply(self.config.anchor_raw);
        let shift = if before < self.config.anchor_target {
            let current = before.clamp(1e-15, 1.0 - 1e-15);
            let adjustment = logit(self.config.anchor_target) - logit(current);
            params.c += adjustment;
            info!("   ⚡ Adjusted intercept by {:.4} to shift probabilities upward", adjustment);
            info!(
                "      Anchor: {:.2} raw -> {:.4} -> {:.4} calibrated",
                self.config.anchor_raw,
                before,
                params.apply(self.config.anchor_raw)
            );
            Some(adjustment)
        } else {
            None
        };

        Ok((params, shift))
    }

    /// Unweighted logistic fit on `logit(p)`
    pub fn fit_platt(&self, raw: &[f64], labels: &[u8]) -> Result<PlattParams> {
        let features: Vec<Vec<f64>> = raw.iter().map(|&p| vec![PlattParams::log_odds(p)]).collect();
        let report = LogisticRegression::new(self.config.platt).fit(&features, labels)?;
        Ok(PlattParams {
            scale: report.model.weights[0],
            intercept: report.model.bias,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Raw scores that understate the true rate by a fixed factor
    fn compressed_scores(n: usize, seed: u64) -> (Vec<f64>, Vec<u8>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut raw = Vec::with_capacity(n);
        let mut labels = Vec::with_capacity(n);
        for _ in 0..n {
            let p: f64 = rng.random_range(0.05..0.45);
            let truth = (p * 1.6).min(0.95);
            raw.push(p);
            labels.push(u8::from(rng.random::<f64>() < truth));
        }
        (raw, labels)
    }

    fn matrix(rows: Vec<Vec<f64>>, labels: Vec<u8>) -> FeatureMatrix {
        FeatureMatrix {
            rows,
            g1f5: labels.clone(),
            g1f10: labels,
        }
    }

    #[test]
    fn test_clip_probability() {
        assert_eq!(clip_probability(0.0), CLIP_EPS);
        assert_eq!(clip_probability(1.0), 1.0 - CLIP_EPS);
        assert_eq!(clip_probability(0.4), 0.4);
    }

    #[test]
    fn test_beta_identity_params() {
        // a = 1, b = -1, c = 0 is logit(p) -> p
        let params = BetaParams { a: 1.0, b: -1.0, c: 0.0 };
        for p in [0.1, 0.25, 0.5, 0.9] {
            assert!((params.apply(p) - p).abs() < 1e-12);
        }
        assert!(params.apply(0.0).is_finite());
        assert!(params.apply(1.0).is_finite());
    }

    #[test]
    fn test_platt_identity_params() {
        let params = PlattParams { scale: 1.0, intercept: 0.0 };
        for p in [0.1, 0.25, 0.5, 0.9] {
            assert!((params.apply(p) - p).abs() < 1e-9);
        }
    }

    #[test]
    fn test_family_per_target() {
        assert_eq!(CalibrationFamily::for_target(Target::G1f5), CalibrationFamily::Beta);
        assert_eq!(CalibrationFamily::for_target(Target::G1f10), CalibrationFamily::Platt);
    }

    #[test]
    fn test_map_serialization_shape() {
        let beta = CalibrationMap::Beta(BetaParams { a: 1.5, b: -0.5, c: 0.2 });
        let json = serde_json::to_value(beta).unwrap();
        assert_eq!(json["method"], "beta");
        assert_eq!(json["params"]["a"], 1.5);
        assert_eq!(json["params"]["c"], 0.2);

        let platt = CalibrationMap::Platt(PlattParams { scale: 0.9, intercept: -0.1 });
        let json = serde_json::to_value(platt).unwrap();
        assert_eq!(json["method"], "platt");
        assert_eq!(json["params"]["A"], 0.9);
        assert_eq!(json["params"]["B"], -0.1);

        let back: CalibrationMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, platt);
    }

    #[test]
    fn test_beta_anchor_holds_with_defaults() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        for seed in 0..5 {
            let (raw, labels) = compressed_scores(400, seed);
            let (params, _) = calibrator.fit_beta(&raw, &labels).unwrap();
            assert!(params.apply(0.25) >= 0.35 - 1e-9);
        }
    }

    #[test]
    fn test_beta_anchor_shift_hits_target_exactly() {
        let config = CalibrationConfig {
            anchor_target: 0.9,
            ..Default::default()
        };
        let calibrator = Calibrator::new(config);
        let (raw, labels) = compressed_scores(400, 7);
        let (params, shift) = calibrator.fit_beta(&raw, &labels).unwrap();

        assert!(shift.unwrap() > 0.0);
        assert!((params.apply(0.25) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_beta_no_shift_when_anchor_already_met() {
        let config = CalibrationConfig {
            anchor_target: 0.01,
            ..Default::default()
        };
        let (raw, labels) = compressed_scores(400, 3);
        let (_, shift) = Calibrator::new(config).fit_beta(&raw, &labels).unwrap();
        assert!(shift.is_none());
    }

    #[test]
    fn test_platt_corrects_compression() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let (raw, labels) = compressed_scores(2000, 11);
        let params = calibrator.fit_platt(&raw, &labels).unwrap();

        // True rate at 0.25 is 0.40; calibration should move toward it
        let calibrated = params.apply(0.25);
        assert!(calibrated > 0.3, "calibrated {}", calibrated);
        assert!(params.apply(0.4) > params.apply(0.2));
    }

    #[test]
    fn test_holdout_size() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        assert_eq!(calibrator.holdout_size(300), 60);
        assert_eq!(calibrator.holdout_size(250), 50);
        assert_eq!(calibrator.holdout_size(200), 50);
        assert_eq!(calibrator.holdout_size(30), 30);
        assert_eq!(calibrator.holdout_size(1000), 200);
    }

    #[test]
    fn test_calibrate_prefers_validation() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let model = LinearModel { weights: vec![1.0], bias: 0.0 };
        let train = matrix((0..300).map(|i| vec![(i % 10) as f64 / 5.0 - 1.0]).collect(), (0..300).map(|i| (i % 2) as u8).collect());
        let validate = matrix((0..40).map(|i| vec![(i % 4) as f64 - 1.5]).collect(), (0..40).map(|i| u8::from(i % 4 >= 2)).collect());

        let outcome = calibrator.calibrate(Target::G1f10, &model, &train, &validate).unwrap();
        match outcome {
            CalibrationOutcome::Fitted { source, n_samples, map, .. } => {
                assert_eq!(source, CalibrationSource::Validation);
                assert_eq!(n_samples, 40);
                assert_eq!(map.family(), CalibrationFamily::Platt);
            }
            other => panic!("expected fitted calibration, got {:?}", other),
        }
    }

    #[test]
    fn test_calibrate_falls_back_to_train_holdout() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let model = LinearModel { weights: vec![0.8], bias: -0.2 };
        let train = matrix(
            (0..300).map(|i| vec![(i % 10) as f64 / 5.0 - 1.0]).collect(),
            (0..300).map(|i| u8::from(i % 10 >= 6)).collect(),
        );
        // Single-class validation is not usable
        let validate = matrix(vec![vec![0.0]; 10], vec![1; 10]);

        let outcome = calibrator.calibrate(Target::G1f5, &model, &train, &validate).unwrap();
        match outcome {
            CalibrationOutcome::Fitted { source, n_samples, map, .. } => {
                assert_eq!(source, CalibrationSource::TrainHoldout);
                assert_eq!(n_samples, 60);
                assert_eq!(map.family(), CalibrationFamily::Beta);
            }
            other => panic!("expected fitted calibration, got {:?}", other),
        }
    }

    #[test]
    fn test_calibrate_skips_single_class_holdout() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let model = LinearModel { weights: vec![1.0], bias: 0.0 };
        // Positives only in the first rows; the trailing 50 are all negative
        let labels: Vec<u8> = (0..100).map(|i| u8::from(i < 20)).collect();
        let train = matrix((0..100).map(|i| vec![i as f64 / 100.0]).collect(), labels);

        let outcome = calibrator
            .calibrate(Target::G1f5, &model, &train, &FeatureMatrix::default())
            .unwrap();
        assert!(outcome.map().is_none());
        assert!(matches!(outcome, CalibrationOutcome::Skipped { .. }));
    }
}
