#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, DashboardCli, DatabaseArgs};
pub use toml_config::TomlConfig;

use crate::domain::model::DateRange;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    parse_iso_date, redact_password, validate_database_url, validate_path,
    validate_positive_number, validate_range, validate_required_field, validate_sql_identifier,
    validate_url, Validate,
};
use chrono::NaiveDate;
use std::time::Duration;

pub const DEFAULT_TABLE: &str = "asteroids";
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_CONNECT_DELAY_SECS: u64 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

#[derive(Clone, PartialEq)]
pub struct FeedSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for FeedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSettings")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub table: String,
    pub connect_attempts: u32,
    pub connect_delay: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            user: None,
            password: None,
            name: None,
            table: DEFAULT_TABLE.to_string(),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_delay: Duration::from_secs(DEFAULT_CONNECT_DELAY_SECS),
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &self.url.as_deref().map(redact_password))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("name", &self.name)
            .field("table", &self.table)
            .field("connect_attempts", &self.connect_attempts)
            .field("connect_delay", &self.connect_delay)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl DatabaseSettings {
    /// Explicit URL wins; otherwise a postgres URL is assembled from the parts.
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            validate_database_url("database.url", url)?;
            return Ok(url.clone());
        }

        let host = validate_required_field("database.host", &self.host)?;
        let port = validate_required_field("database.port", &self.port)?;
        let user = validate_required_field("database.user", &self.user)?;
        let password = validate_required_field("database.password", &self.password)?;
        let name = validate_required_field("database.name", &self.name)?;

        let mut url = url::Url::parse(&format!("postgres://{}:{}/{}", host, port, name))
            .map_err(|e| EtlError::InvalidConfigValueError {
                field: "database.host".to_string(),
                value: host.clone(),
                reason: e.to_string(),
            })?;
        url.set_username(user)
            .and_then(|_| url.set_password(Some(password.as_str())))
            .map_err(|_| EtlError::ConfigError {
                message: "database credentials cannot be encoded in a URL".to_string(),
            })?;
        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub feed: FeedSettings,
    pub database: DatabaseSettings,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days: Option<u64>,
    pub output_dir: String,
    pub cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feed: FeedSettings::default(),
            database: DatabaseSettings::default(),
            start_date: None,
            end_date: None,
            days: None,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl PipelineConfig {
    /// Explicit bounds take precedence over a `days` window starting at `today`.
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        match (self.start_date, self.end_date, self.days) {
            (Some(start), Some(end), _) => Ok(DateRange::new(start, end)),
            (Some(start), None, Some(days)) => Ok(DateRange::window(start, days)),
            (None, None, Some(days)) => Ok(DateRange::window(today, days)),
            (None, _, _) => Err(EtlError::MissingConfigError {
                field: "pipeline.start_date".to_string(),
            }),
            (Some(_), None, None) => Err(EtlError::MissingConfigError {
                field: "pipeline.end_date".to_string(),
            }),
        }
    }

    /// Layers `overrides` on top of a config file.
    pub fn from_layers(file: Option<&TomlConfig>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match file {
            Some(file) => file.to_pipeline_config()?,
            None => PipelineConfig::default(),
        };
        overrides.apply(&mut config)?;
        Ok(config)
    }
}

impl Validate for PipelineConfig {
    /// Checks values that are present. Absent required values are reported by the
    /// component that needs them.
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.feed.url {
            validate_url("feed.url", url)?;
        }
        validate_sql_identifier("database.table", &self.database.table)?;
        validate_positive_number(
            "database.connect_attempts",
            self.database.connect_attempts as usize,
            1,
        )?;
        if let Some(days) = self.days {
            validate_range("pipeline.days", days, 1, 366)?;
        }
        validate_path("pipeline.output_dir", &self.output_dir)?;
        Ok(())
    }
}

/// Values supplied on the command line or via environment; `None` leaves the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub feed_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub days: Option<u64>,
    pub database_url: Option<String>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_name: Option<String>,
    pub table: Option<String>,
    pub connect_attempts: Option<u32>,
    pub connect_delay_secs: Option<u64>,
    pub output_dir: Option<String>,
    pub cache_ttl_secs: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ConfigOverrides {
    fn apply(self, config: &mut PipelineConfig) -> Result<()> {
        if let Some(v) = non_empty(self.feed_url) {
            config.feed.url = Some(v);
        }
        if let Some(v) = non_empty(self.api_key) {
            config.feed.api_key = Some(v);
        }
        if let Some(v) = self.request_timeout_secs {
            config.feed.timeout = Duration::from_secs(v);
        }
        if let Some(v) = non_empty(self.start_date) {
            config.start_date = Some(parse_iso_date("pipeline.start_date", &v)?);
        }
        if let Some(v) = non_empty(self.end_date) {
            config.end_date = Some(parse_iso_date("pipeline.end_date", &v)?);
        }
        if let Some(v) = self.days {
            config.days = Some(v);
        }

        let db = &mut config.database;
        if let Some(v) = non_empty(self.database_url) {
            db.url = Some(v);
        }
        if let Some(v) = non_empty(self.db_host) {
            db.host = Some(v);
        }
        if let Some(v) = self.db_port {
            db.port = Some(v);
        }
        if let Some(v) = non_empty(self.db_user) {
            db.user = Some(v);
        }
        if let Some(v) = non_empty(self.db_password) {
            db.password = Some(v);
        }
        if let Some(v) = non_empty(self.db_name) {
            db.name = Some(v);
        }
        if let Some(v) = non_empty(self.table) {
            db.table = v;
        }
        if let Some(v) = self.connect_attempts {
            db.connect_attempts = v;
        }
        if let Some(v) = self.connect_delay_secs {
            db.connect_delay = Duration::from_secs(v);
        }

        if let Some(v) = non_empty(self.output_dir) {
            config.output_dir = v;
        }
        if let Some(v) = self.cache_ttl_secs {
            config.cache_ttl = Duration::from_secs(v);
        }
        Ok(())
    }
}
