use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Feed request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Malformed feed payload: {message}")]
    MalformedPayloadError { message: String },

    #[error("Malformed record {id} under {date}: {reason}")]
    MalformedRecordError {
        date: String,
        id: String,
        reason: String,
    },

    #[error("Transform produced no rows for {start_date}..{end_date}")]
    EmptyRowSetError { start_date: String, end_date: String },

    #[error("Could not connect to database after {attempts} attempt(s): {source}")]
    ConnectionError {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to replace table '{table}': {source}")]
    LoadError {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Upstream,
    Data,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigError { .. } => ErrorCategory::Configuration,
            EtlError::RequestError(_) => ErrorCategory::Upstream,
            EtlError::MalformedPayloadError { .. }
            | EtlError::MalformedRecordError { .. }
            | EtlError::EmptyRowSetError { .. }
            | EtlError::SerializationError(_)
            | EtlError::CsvError(_) => ErrorCategory::Data,
            EtlError::ConnectionError { .. }
            | EtlError::LoadError { .. }
            | EtlError::DatabaseError(_) => ErrorCategory::Storage,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::MalformedRecordError { .. } => ErrorSeverity::Low,
            EtlError::RequestError(_) | EtlError::ConnectionError { .. } => ErrorSeverity::Medium,
            EtlError::LoadError { .. } | EtlError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Whether re-running the whole pipeline later has a fair chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EtlError::RequestError(_) | EtlError::ConnectionError { .. }
        )
    }

    /// Process exit status: 75 (`EX_TEMPFAIL`) for transient failures so a scheduler can
    /// retry, 3 for critical ones, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_transient() {
            75
        } else if self.severity() == ErrorSeverity::Critical {
            3
        } else {
            1
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::MissingConfigError { .. } => {
                "Set the missing value via CLI flag, environment variable or config file"
            }
            EtlError::InvalidConfigValueError { .. } | EtlError::ConfigError { .. } => {
                "Fix the configuration value and run again"
            }
            EtlError::RequestError(_) => {
                "Check the feed URL, API key and date range (the feed rejects wide ranges), then re-run"
            }
            EtlError::MalformedPayloadError { .. } | EtlError::SerializationError(_) => {
                "Inspect raw_neo_data.json in the output directory; the feed response shape changed"
            }
            EtlError::MalformedRecordError { .. } => "The record was skipped; no action needed",
            EtlError::EmptyRowSetError { .. } => {
                "The feed returned no usable objects; try a different date range"
            }
            EtlError::ConnectionError { .. } => {
                "Make sure the database is running and reachable, then re-run"
            }
            EtlError::LoadError { .. } => {
                "Treat the table as untrustworthy and re-run the pipeline once the database is healthy"
            }
            EtlError::DatabaseError(_) => "Check database permissions and availability",
            EtlError::CsvError(_) | EtlError::IoError(_) => {
                "Check that the output directory exists and is writable"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } => {
                format!("Required setting '{}' is not configured", field)
            }
            EtlError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            EtlError::RequestError(e) => match e.status() {
                Some(status) => format!("The NEO feed answered with HTTP {}", status),
                None => "The NEO feed could not be reached".to_string(),
            },
            EtlError::ConnectionError { attempts, .. } => {
                format!("The database was unreachable after {} attempts", attempts)
            }
            EtlError::LoadError { table, .. } => {
                format!("Writing table '{}' failed; its contents are not reliable", table)
            }
            EtlError::EmptyRowSetError { .. } => "No asteroid rows to load".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
