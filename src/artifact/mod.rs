//! Portable model artifact
//!
//! One JSON document carrying everything an external scorer needs:
//!
//! ```text
//! raw features ─▶ scaler ─▶ w·x + b ─▶ sigmoid ─▶ calibration ─▶ probability
//! ```
//!
//! Target sections are `null` when the target was skipped, and the matching
//! calibration entry is `null` as well.


use crate::data::SplitDateRanges;
use crate::error::{Result, TrainerError};
use crate::ml::{normalize_feature_name, CalibrationMap, StandardScaler, TargetMetrics, TargetOutcome};
use crate::types::{DateRange, Target};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Value of the `type` field
pub const ARTIFACT_TYPE: &str = "logreg_dual";
/// Value of `calibration.method`
pub const CALIBRATION_METHOD: &str = "hybrid";

/// Trained dual-target bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub scaler: StandardScaler,
    pub train_date_range: DateRange,
    pub val_date_range: DateRange,
    pub test_date_range: DateRange,
    pub feature_order: Vec<String>,
    pub g1f5: Option<TargetSection>,
    pub g1f10: Option<TargetSection>,
    pub calibration: CalibrationSection,
}

/// Linear classifier for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSection {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub metrics: TargetMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSection {
    pub method: String,
    pub g1f5: Option<CalibrationMap>,
    pub g1f10: Option<CalibrationMap>,
}

/// Raw and calibrated probability for one feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredProbability {
    pub raw: f64,
    pub calibrated: f64,
}

impl Artifact {
    pub fn target(&self, target: Target) -> Option<&TargetSection> {
        match target {
            Target::G1f5 => self.g1f5.as_ref(),
            Target::G1f10 => self.g1f10.as_ref(),
        }
    }

    pub fn calibration_for(&self, target: Target) -> Option<&CalibrationMap> {
        match target {
            Target::G1f5 => self.calibration.g1f5.as_ref(),
            Target::G1f10 => self.calibration.g1f10.as_ref(),
        }
    }

    /// Score raw (unscaled) features the way an external consumer must:
    /// scaler, linear score, logistic link, then calibration (identity if
    /// absent). `Ok(None)` when the target was not trained.
    pub fn score(&self, target: Target, features: &[f64]) -> Result<Option<ScoredProbability>> {
        if features.len() != self.feature_order.len() {
            return Err(TrainerError::DimensionMismatch {
                expected: self.feature_order.len(),
                actual: features.len(),
            });
        }
        let Some(section) = self.target(target) else {
            return Ok(None);
        };

        let scaled = self.scaler.transform_row(features);
        let z: f64 = section.weights.iter().zip(&scaled).map(|(w, x)| w * x).sum::<f64>() + section.bias;
        let raw = crate::ml::sigmoid(z);
        let calibrated = self.calibration_for(target).map_or(raw, |map| map.apply(raw));

        Ok(Some(ScoredProbability { raw, calibrated }))
    }

    /// Write pretty-printed JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("✅ Wrote artifact: {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Assembles an [`Artifact`] from a finished run
pub struct ArtifactBuilder {
    version: String,
    trained_at: DateTime<Utc>,
    scaler: StandardScaler,
    ranges: SplitDateRanges,
    feature_order: Vec<String>,
    g1f5: Option<(TargetSection, Option<CalibrationMap>)>,
    g1f10: Option<(TargetSection, Option<CalibrationMap>)>,
}

impl ArtifactBuilder {
    pub fn new(version: impl Into<String>, scaler: StandardScaler, ranges: SplitDateRanges, features: &[String]) -> Self {
        Self {
            version: version.into(),
            trained_at: Utc::now(),
            scaler,
            ranges,
            feature_order: features.iter().map(|f| normalize_feature_name(f)).collect(),
            g1f5: None,
            g1f10: None,
        }
    }

    pub fn with_trained_at(mut self, trained_at: DateTime<Utc>) -> Self {
        self.trained_at = trained_at;
        self
    }

    /// Record a target; skipped targets leave both sections empty
    pub fn with_target(mut self, target: Target, outcome: &TargetOutcome) -> Self {
        let entry = outcome.fitted().map(|fitted| {
            (
                TargetSection {
                    weights: fitted.model.weights.clone(),
                    bias: fitted.model.bias,
                    metrics: fitted.metrics.clone(),
                },
                fitted.calibration.map().copied(),
            )
        });
        match target {
            Target::G1f5 => self.g1f5 = entry,
            Target::G1f10 => self.g1f10 = entry,
        }
        self
    }

    pub fn build(self) -> Artifact {
        let (g1f5, g1f5_cal) = split_entry(self.g1f5);
        let (g1f10, g1f10_cal) = split_entry(self.g1f10);
        Artifact {
            kind: ARTIFACT_TYPE.to_string(),
            version: self.version,
            trained_at: self.trained_at,
            scaler: self.scaler,
            train_date_range: self.ranges.train,
            val_date_range: self.ranges.validate,
            test_date_range: self.ranges.test,
            feature_order: self.feature_order,
            g1f5,
            g1f10,
            calibration: CalibrationSection {
                method: CALIBRATION_METHOD.to_string(),
                g1f5: g1f5_cal,
                g1f10: g1f10_cal,
            },
        }
    }
}

fn split_entry(entry: Option<(TargetSection, Option<CalibrationMap>)>) -> (Option<TargetSection>, Option<CalibrationMap>) {
    match entry {
        Some((section, calibration)) => (Some(section), calibration),
        None => (None, None),
    }
}
