//! Feature matrices and feature-name handling

use crate::types::{LabeledExample, Target};

/// Dense rows plus both label vectors for one split
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<Vec<f64>>,
    pub g1f5: Vec<u8>,
    pub g1f10: Vec<u8>,
}

impl FeatureMatrix {
    pub fn from_examples(examples: &[LabeledExample]) -> Self {
        Self {
            rows: examples.iter().map(|e| e.features.clone()).collect(),
            g1f5: examples.iter().map(|e| e.label(Target::G1f5)).collect(),
            g1f10: examples.iter().map(|e| e.label(Target::G1f10)).collect(),
        }
    }

    pub fn labels(&self, target: Target) -> &[u8] {
        match target {
            Target::G1f5 => &self.g1f5,
            Target::G1f10 => &self.g1f10,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Same labels, rows replaced (e.g. after standardization)
    pub fn with_rows(&self, rows: Vec<Vec<f64>>) -> Self {
        Self {
            rows,
            g1f5: self.g1f5.clone(),
            g1f10: self.g1f10.clone(),
        }
    }
}

/// Flatten an interaction expression (`a * b`) into one opaque token.
///
/// `"x * y"` becomes `"x_x_y"`; names without an interaction are unchanged.
pub fn normalize_feature_name(name: &str) -> String {
    if name.contains(" * ") {
        name.replace(' ', "_").replace('*', "x")
    } else {
        name.to_string()
    }
}

/// Class counts as `(negatives, positives)`
pub fn class_counts(labels: &[u8]) -> (usize, usize) {
    let positives = labels.iter().filter(|&&y| y == 1).count();
    (labels.len() - positives, positives)
}
