//! Model fitting
//!
//! Provides the numeric half of a training run:
//! - Feature standardization
//! - Class-weighted L2 logistic regression
//! - Out-of-sample metrics
//! - Hybrid probability calibration (beta / Platt)

pub mod calibration;
pub mod features;
pub mod logistic;
pub mod metrics;
pub mod scaler;
pub mod trainer;

pub use calibration::{
    BetaParams, CalibrationFamily, CalibrationMap, CalibrationOutcome, CalibrationSource, Calibrator, PlattParams,
};
pub use features::{normalize_feature_name, FeatureMatrix};
pub use logistic::{sigmoid, ClassWeights, LinearModel, LogisticRegression};
pub use metrics::{SplitMetrics, TargetMetrics};
pub use scaler::StandardScaler;
pub use trainer::{ClassifierTrainer, FittedTarget, PreparedSplits, TargetOutcome};
