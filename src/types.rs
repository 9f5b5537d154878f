//! Core data types shared across the trainer

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open date window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether `date` falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Smallest window covering every example date, if any
    pub fn spanning(examples: &[LabeledExample]) -> Option<Self> {
        let start = examples.iter().map(|e| e.event_date).min()?;
        let last = examples.iter().map(|e| e.event_date).max()?;
        let end = last.succ_opt().unwrap_or(last);
        Some(Self { start, end })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// The two modeled outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Goal in the first 5 minutes
    G1f5,
    /// Goal in the first 10 minutes
    G1f10,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::G1f5, Target::G1f10];

    /// Key used in the artifact
    pub fn key(&self) -> &'static str {
        match self {
            Target::G1f5 => "g1f5",
            Target::G1f10 => "g1f10",
        }
    }

    /// Display label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Target::G1f5 => "G1F5",
            Target::G1f10 => "G1F10",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One game row: features plus both labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub event_date: NaiveDate,
    pub features: Vec<f64>,
    pub goal_in_first_5: bool,
    pub goal_in_first_10: bool,
}

impl LabeledExample {
    /// Build an example, treating missing feature values as zero
    pub fn from_optional(
        event_date: NaiveDate,
        features: impl IntoIterator<Item = Option<f64>>,
        goal_in_first_5: bool,
        goal_in_first_10: bool,
    ) -> Self {
        Self {
            event_date,
            features: features.into_iter().map(|v| v.unwrap_or(0.0)).collect(),
            goal_in_first_5,
            goal_in_first_10,
        }
    }

    pub fn label(&self, target: Target) -> u8 {
        let hit = match target {
            Target::G1f5 => self.goal_in_first_5,
            Target::G1f10 => self.goal_in_first_10,
        };
        u8::from(hit)
    }
}

/// Named partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitName {
    Train,
    Validate,
    Test,
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitName::Train => "Train",
            SplitName::Validate => "Validate",
            SplitName::Test => "Test",
        };
        f.write_str(name)
    }
}

/// Train / validate / test row sets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitSets {
    pub train: Vec<LabeledExample>,
    pub validate: Vec<LabeledExample>,
    pub test: Vec<LabeledExample>,
}

impl SplitSets {
    pub fn get(&self, name: SplitName) -> &[LabeledExample] {
        match name {
            SplitName::Train => &self.train,
            SplitName::Validate => &self.validate,
            SplitName::Test => &self.test,
        }
    }

    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.train.len(), self.validate.len(), self.test.len())
    }
}

/// Whether a label vector holds both classes
pub fn has_both_classes(labels: &[u8]) -> bool {
    labels.iter().any(|&y| y == 0) && labels.iter().any(|&y| y == 1)
}
