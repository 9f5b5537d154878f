//! PostgreSQL example source

use super::ExampleSource;
use crate::config::DatabaseConfig;
use crate::error::{Result, TrainerError};
use crate::types::{DateRange, LabeledExample};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

/// Columns selected ahead of the features
const LEADING_COLUMNS: usize = 3;

/// Reads the early-game dataset table.
///
/// Each configured feature is an SQL expression evaluated as `float8`; NULL
/// values become 0.
pub struct PgExampleSource {
    pool: PgPool,
    table: String,
    date_column: String,
    features: Vec<String>,
}

impl PgExampleSource {
    /// Connect using `config.url`; a missing URL or failed connection is fatal
    pub async fn connect(config: &DatabaseConfig, features: &[String]) -> Result<Self> {
        let url = config.url.as_deref().ok_or(TrainerError::MissingDatabaseUrl)?;
        let pool = PgPoolOptions::new().max_connections(1).connect(url).await?;
        info!("Connected to PostgreSQL, reading {}", config.table);
        Ok(Self::with_pool(pool, config, features))
    }

    pub fn with_pool(pool: PgPool, config: &DatabaseConfig, features: &[String]) -> Self {
        Self {
            pool,
            table: config.table.clone(),
            date_column: config.date_column.clone(),
            features: features.to_vec(),
        }
    }

    pub fn window_query(&self) -> String {
        build_window_query(&self.table, &self.date_column, &self.features)
    }

    pub fn sample_query(&self) -> String {
        build_sample_query(&self.table, &self.date_column, &self.features)
    }

    fn decode(&self, row: &PgRow) -> Result<LabeledExample> {
        let event_date: NaiveDate = row.try_get("event_date")?;
        let y5: i32 = row.try_get("y5")?;
        let y10: i32 = row.try_get("y10")?;
        let features = (0..self.features.len())
            .map(|i| row.try_get::<Option<f64>, _>(LEADING_COLUMNS + i))
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;
        Ok(LabeledExample::from_optional(event_date, features, y5 != 0, y10 != 0))
    }
}

#[async_trait]
impl ExampleSource for PgExampleSource {
    async fn fetch_window(&self, window: &DateRange) -> Result<Vec<LabeledExample>> {
        let rows = sqlx::query(&self.window_query())
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| self.decode(row)).collect()
    }

    async fn fetch_sample(&self, limit: usize) -> Result<Vec<LabeledExample>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(&self.sample_query())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| self.decode(row)).collect()
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

fn select_clause(table: &str, date_column: &str, features: &[String]) -> String {
    let feature_columns: Vec<String> = features.iter().map(|f| format!("({})::float8", f)).collect();
    let mut columns = vec![
        format!("{}::date AS event_date", date_column),
        "goal_in_first_5::int AS y5".to_string(),
        "goal_in_first_10::int AS y10".to_string(),
    ];
    columns.extend(feature_columns);

    format!(
        "SELECT\n  {}\nFROM {}\nWHERE goal_in_first_5 IS NOT NULL\n  AND goal_in_first_10 IS NOT NULL",
        columns.join(",\n  "),
        table
    )
}

fn build_window_query(table: &str, date_column: &str, features: &[String]) -> String {
    format!(
        "{}\n  AND {d}::date >= $1\n  AND {d}::date < $2\nORDER BY {d}",
        select_clause(table, date_column, features),
        d = date_column
    )
}

fn build_sample_query(table: &str, date_column: &str, features: &[String]) -> String {
    format!(
        "{}\nORDER BY {}\nLIMIT $1",
        select_clause(table, date_column, features),
        date_column
    )
}
