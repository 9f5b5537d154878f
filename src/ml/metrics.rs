//! Out-of-sample evaluation metrics

use crate::types::{has_both_classes, SplitName};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const LOG_LOSS_EPS: f64 = 1e-15;

/// Mean binary cross-entropy
pub fn log_loss(labels: &[u8], probs: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .zip(probs)
        .map(|(&y, &p)| {
            let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            if y == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / labels.len() as f64
}

/// Mean squared error of the probability against the label
pub fn brier_score(labels: &[u8], probs: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .zip(probs)
        .map(|(&y, &p)| (p - f64::from(y)).powi(2))
        .sum();
    total / labels.len() as f64
}

/// Area under the ROC curve (Mann-Whitney, ties get averaged ranks).
///
/// `None` unless both classes are present.
pub fn roc_auc(labels: &[u8], probs: &[f64]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&y| y == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| probs[a].partial_cmp(&probs[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; labels.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their average
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|&(&y, _)| y == 1)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Metrics for one split
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitMetrics {
    pub log_loss: f64,
    pub brier: f64,
    pub roc_auc: f64,
}

impl SplitMetrics {
    /// `None` when the split is empty or single-class
    pub fn compute(labels: &[u8], probs: &[f64]) -> Option<Self> {
        if labels.is_empty() || !has_both_classes(labels) {
            return None;
        }
        Some(Self {
            log_loss: log_loss(labels, probs),
            brier: brier_score(labels, probs),
            roc_auc: roc_auc(labels, probs)?,
        })
    }
}

/// Metrics recorded per target in the artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub n_train: usize,
    pub n_val: usize,
    pub n_test: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_log_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_brier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val_roc_auc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_log_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_brier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_roc_auc: Option<f64>,
}

impl TargetMetrics {
    pub fn with_sizes(n_train: usize, n_val: usize, n_test: usize) -> Self {
        Self {
            n_train,
            n_val,
            n_test,
            ..Default::default()
        }
    }

    /// Store metrics for validate or test; train metrics are not kept
    pub fn record(&mut self, split: SplitName, metrics: SplitMetrics) {
        match split {
            SplitName::Validate => {
                self.val_log_loss = Some(metrics.log_loss);
                self.val_brier = Some(metrics.brier);
                self.val_roc_auc = Some(metrics.roc_auc);
            }
            SplitName::Test => {
                self.test_log_loss = Some(metrics.log_loss);
                self.test_brier = Some(metrics.brier);
                self.test_roc_auc = Some(metrics.roc_auc);
            }
            SplitName::Train => {}
        }
    }

    pub fn for_split(&self, split: SplitName) -> Option<SplitMetrics> {
        let (log_loss, brier, roc_auc) = match split {
            SplitName::Validate => (self.val_log_loss, self.val_brier, self.val_roc_auc),
            SplitName::Test => (self.test_log_loss, self.test_brier, self.test_roc_auc),
            SplitName::Train => return None,
        };
        Some(SplitMetrics {
            log_loss: log_loss?,
            brier: brier?,
            roc_auc: roc_auc?,
        })
    }
}
