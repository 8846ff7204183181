use crate::config::{
    PipelineConfig, DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_CONNECT_ATTEMPTS, DEFAULT_CONNECT_DELAY_SECS, DEFAULT_OUTPUT_DIR,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TABLE,
};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{parse_iso_date, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub dashboard: DashboardSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSection {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub days: Option<u64>,
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub table: Option<String>,
    pub connect_attempts: Option<u32>,
    pub connect_delay_seconds: Option<u64>,
    pub acquire_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardSection {
    pub cache_ttl_seconds: Option<u64>,
}

/// Expands `${VAR}` through `lookup`. Unknown variables expand to an empty string,
/// which later counts as "not configured".
fn substitute_vars(content: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    static VAR: OnceLock<Regex> = OnceLock::new();
    let re = VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

    re.replace_all(content, |caps: &regex::Captures| {
        lookup(&caps[1]).unwrap_or_default()
    })
    .into_owned()
}

fn present(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_vars(content, |name| std::env::var(name).ok());

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn to_pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::default();

        config.feed.url = present(&self.feed.url);
        config.feed.api_key = present(&self.feed.api_key);
        config.feed.timeout = Duration::from_secs(
            self.feed
                .timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );

        config.start_date = present(&self.pipeline.start_date)
            .map(|v| parse_iso_date("pipeline.start_date", &v))
            .transpose()?;
        config.end_date = present(&self.pipeline.end_date)
            .map(|v| parse_iso_date("pipeline.end_date", &v))
            .transpose()?;
        config.days = self.pipeline.days;
        config.output_dir =
            present(&self.pipeline.output_dir).unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());

        let db = &self.database;
        config.database.url = present(&db.url);
        config.database.host = present(&db.host);
        config.database.port = db.port;
        config.database.user = present(&db.user);
        config.database.password = present(&db.password);
        config.database.name = present(&db.name);
        config.database.table = present(&db.table).unwrap_or_else(|| DEFAULT_TABLE.to_string());
        config.database.connect_attempts = db.connect_attempts.unwrap_or(DEFAULT_CONNECT_ATTEMPTS);
        config.database.connect_delay =
            Duration::from_secs(db.connect_delay_seconds.unwrap_or(DEFAULT_CONNECT_DELAY_SECS));
        config.database.acquire_timeout = Duration::from_secs(
            db.acquire_timeout_seconds
                .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        );

        config.cache_ttl = Duration::from_secs(
            self.dashboard
                .cache_ttl_seconds
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );

        Ok(config)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.to_pipeline_config()?.validate()
    }
}
