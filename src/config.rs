//! Configuration for a training run
//!
//! Values come from (lowest to highest priority) built-in defaults, an
//! optional TOML file, `EARLY_GOAL_*` environment variables, and finally the
//! command line.

use crate::error::Result;
use crate::types::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Full trainer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub splits: SplitConfig,
    pub training: SolverConfig,
    pub calibration: CalibrationConfig,
    pub artifact: ArtifactConfig,
    /// Ordered feature expressions; interactions are written `a * b`
    pub features: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            splits: SplitConfig::default(),
            training: SolverConfig::classifier(),
            calibration: CalibrationConfig::default(),
            artifact: ArtifactConfig::default(),
            features: default_features(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = shellexpand::tilde(path).into_owned();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("EARLY_GOAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;
        if cfg.database.url.is_none() {
            cfg.database.url = database_url_from_env();
        }
        Ok(cfg)
    }
}

/// `NEON_DATABASE_URL` wins over `DATABASE_URL`
fn database_url_from_env() -> Option<String> {
    ["NEON_DATABASE_URL", "DATABASE_URL"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

/// Data source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub table: String,
    pub date_column: String,
    /// Row cap for the unfiltered last-resort query
    pub fallback_sample_limit: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: "public.icura_nhl_early_game_dataset".to_string(),
            date_column: "date_iso".to_string(),
            fallback_sample_limit: 1000,
        }
    }
}

/// Date windows and fallback redistribution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train: DateRange,
    pub validate: DateRange,
    pub test: DateRange,
    pub seed: u64,
    pub train_fraction: f64,
    pub validate_fraction: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train: window((2023, 10, 1), (2024, 7, 1)),
            validate: window((2025, 10, 1), (2026, 1, 15)),
            test: window((2026, 1, 15), (2026, 7, 1)),
            seed: 42,
            train_fraction: 0.70,
            validate_fraction: 0.15,
        }
    }
}

fn window(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
    let date = |(y, m, d): (i32, u32, u32)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
    DateRange::new(date(start), date(end))
}

/// Settings for one L2-regularized logistic regression fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl SolverConfig {
    /// Main per-target classifier
    pub fn classifier() -> Self {
        Self { c: 0.5, max_iter: 5000, tol: 1e-5 }
    }

    pub fn beta_calibrator() -> Self {
        Self { c: 0.5, max_iter: 1000, tol: 1e-4 }
    }

    pub fn platt_calibrator() -> Self {
        Self { c: 1.0, max_iter: 1000, tol: 1e-4 }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::classifier()
    }
}

/// Calibration stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub holdout_fraction: f64,
    pub holdout_min: usize,
    pub beta: SolverConfig,
    pub platt: SolverConfig,
    /// Raw probability probed after the beta fit
    pub anchor_raw: f64,
    /// Minimum calibrated value required at `anchor_raw`
    pub anchor_target: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
            holdout_min: 50,
            beta: SolverConfig::beta_calibrator(),
            platt: SolverConfig::platt_calibrator(),
            anchor_raw: 0.25,
            anchor_target: 0.35,
        }
    }
}

/// Artifact metadata and output location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub version: String,
    pub output: Option<String>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            version: "early-goal-ml-0.6.0".to_string(),
            output: None,
        }
    }
}

/// Feature expressions in artifact order
pub fn default_features() -> Vec<String> {
    [
        // First 10 minutes
        "home_team_xgf_first10_last20",
        "home_team_xga_first10_last20",
        "home_team_rush_chances_first10_last20",
        "home_team_high_danger_first10_last20",
        "home_team_shot_attempts_first10",
        "away_team_xgf_first10_last20",
        "away_team_xga_first10_last20",
        "away_team_rush_chances_first10_last20",
        "away_team_high_danger_first10_last20",
        "away_team_shot_attempts_first10",
        // First 5 minutes
        "home_team_xgf_first5_last20",
        "home_team_rush_chances_first5_last20",
        "home_team_high_danger_first5_last20",
        "home_team_time_to_first_shot",
        "home_team_time_to_first_hd",
        "away_team_xgf_first5_last20",
        "away_team_rush_chances_first5_last20",
        "away_team_high_danger_first5_last20",
        "away_team_time_to_first_shot",
        "away_team_time_to_first_hd",
        // Goalies
        "home_goalie_save_pct_first5",
        "home_goalie_gsax_first5",
        "away_goalie_save_pct_first5",
        "away_goalie_gsax_first5",
        // Context
        "home_rest_days",
        "away_rest_days",
        "travel_distance",
        "ref_penalty_rate",
        "closing_total",
        "closing_first_period_total",
        // Penalties
        "(extras->>'home_penalties_first5')::numeric",
        "(extras->>'away_penalties_first5')::numeric",
        "(extras->>'home_penalty_time_first5')::numeric",
        "(extras->>'away_penalty_time_first5')::numeric",
        // Faceoff tempo
        "(extras->>'min_time_since_faceoff_first5')::numeric",
        "(extras->>'avg_time_since_faceoff_first5')::numeric",
        // Shifts
        "(extras->>'home_avg_toi_first5')::numeric",
        "(extras->>'home_max_toi_first5')::numeric",
        "(extras->>'home_min_time_since_faceoff_first5')::numeric",
        "(extras->>'away_avg_toi_first5')::numeric",
        "(extras->>'away_max_toi_first5')::numeric",
        "(extras->>'away_min_time_since_faceoff_first5')::numeric",
        // Interactions
        "home_team_time_to_first_shot * away_team_time_to_first_shot",
        "home_team_xgf_first5_last20 * away_team_xgf_first10_last20",
        "home_goalie_save_pct_first5 * away_goalie_save_pct_first5",
        "home_goalie_gsax_first5 * away_team_xgf_first5_last20",
        "away_goalie_gsax_first5 * home_team_xgf_first5_last20",
        "(extras->>'home_penalties_first5')::numeric * away_team_xgf_first5_last20",
        "(extras->>'away_penalties_first5')::numeric * home_team_xgf_first5_last20",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
