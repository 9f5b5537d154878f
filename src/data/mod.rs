//! Labeled example sources
//!
//! The trainer reads rows through [`ExampleSource`]: three date-window queries
//! plus one bounded, unfiltered fallback query.

pub mod postgres;
pub mod split;


pub use postgres::PgExampleSource;
pub use split::{partition_shuffled, SplitDateRanges, SplitProvider, SplitResolution};

use crate::error::Result;
use crate::types::{DateRange, LabeledExample};
use async_trait::async_trait;

/// Source of labeled game rows
#[async_trait]
pub trait ExampleSource: Send + Sync {
    /// Rows whose event date falls in `[window.start, window.end)`, oldest first
    async fn fetch_window(&self, window: &DateRange) -> Result<Vec<LabeledExample>>;

    /// Up to `limit` rows regardless of date, oldest first
    async fn fetch_sample(&self, limit: usize) -> Result<Vec<LabeledExample>>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Source backed by a vector already in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    rows: Vec<LabeledExample>,
}

impl InMemorySource {
    pub fn new(mut rows: Vec<LabeledExample>) -> Self {
        rows.sort_by_key(|r| r.event_date);
        Self { rows }
    }
}

#[async_trait]
impl ExampleSource for InMemorySource {
    async fn fetch_window(&self, window: &DateRange) -> Result<Vec<LabeledExample>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| window.contains(r.event_date))
            .cloned()
            .collect())
    }

    async fn fetch_sample(&self, limit: usize) -> Result<Vec<LabeledExample>> {
        Ok(self.rows.iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
