//! Early-Goal Dual Logistic Trainer
//!
//! Fits class-weighted logistic classifiers for "goal in the first 5 minutes"
//! (G1F5) and "goal in the first 10 minutes" (G1F10), calibrates them, and
//! writes a self-contained JSON artifact for an external scorer.
//!
//! ## Architecture
//!
//! ```text
//! ExampleSource (Postgres / memory) → SplitProvider → StandardScaler
//!                                                          ↓
//!                      Artifact ← Calibrator ← Evaluator ← ClassifierTrainer (per target)
//! ```

pub mod artifact;
pub mod config;
pub mod data;
pub mod error;
pub mod ml;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod types_tests;
