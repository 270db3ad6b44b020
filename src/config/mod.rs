use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub output: OutputConfig,
    pub pacing: PacingConfig,
}

/// Week traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Jump to a start week via the date-range input, then walk toward today.
    Forward,
    /// Walk back in time with the Previous-week button. No date lower bound.
    Backward,
}

/// Portal + navigation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortalConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_activities_url")]
    pub activities_url: String,

    #[serde(default = "default_direction")]
    pub direction: Direction,

    /// Optional starting week date (any accepted format). When unset the
    /// operator is prompted; empty/unparseable input means "today".
    #[serde(default)]
    pub start_date: Option<String>,

    #[serde(default = "default_wait_budget_ms")]
    pub wait_budget_ms: u64,
}

/// Output file configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    #[serde(default = "default_seen_path")]
    pub seen_path: PathBuf,
}

/// Inter-action delay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacingConfig {
    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,

    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}
fn default_activities_url() -> String {
    "https://drivers.uber.com/earnings/activities".to_string()
}
fn default_direction() -> Direction {
    Direction::Backward
}
fn default_wait_budget_ms() -> u64 {
    2000
}
fn default_csv_path() -> PathBuf {
    PathBuf::from("data/rides.csv")
}
fn default_seen_path() -> PathBuf {
    PathBuf::from("data/seen_trips.txt")
}
fn default_delay_min_ms() -> u64 {
    1000
}
fn default_delay_max_ms() -> u64 {
    3000
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("RIDE").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            portal: PortalConfig {
                webdriver_url: default_webdriver_url(),
                activities_url: default_activities_url(),
                direction: default_direction(),
                start_date: None,
                wait_budget_ms: default_wait_budget_ms(),
            },
            output: OutputConfig {
                csv_path: default_csv_path(),
                seen_path: default_seen_path(),
            },
            pacing: PacingConfig {
                delay_min_ms: default_delay_min_ms(),
                delay_max_ms: default_delay_max_ms(),
            },
        }
    }
}
