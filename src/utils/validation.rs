use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

/// Accepts only the drivers compiled into the storage layer.
pub fn validate_database_url(field_name: &str, url_str: &str) -> Result<()> {
    let supported = ["postgres://", "postgresql://", "sqlite:"];
    if supported.iter().any(|prefix| url_str.starts_with(prefix)) {
        Ok(())
    } else {
        Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: redact_password(url_str),
            reason: "Expected a postgres:// or sqlite: URL".to_string(),
        })
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| EtlError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Table names are interpolated into DDL, so only bare identifiers pass.
pub fn validate_sql_identifier(field_name: &str, value: &str) -> Result<()> {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let re = IDENT.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier pattern is valid")
    });

    if re.is_match(value) {
        Ok(())
    } else {
        Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Must be a plain SQL identifier (letters, digits, underscore)".to_string(),
        })
    }
}

pub fn parse_iso_date(field_name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Expected a YYYY-MM-DD date: {}", e),
        }
    })
}

/// Replaces the password part of a connection URL so it can be logged.
pub fn redact_password(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => url_str.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("feed.url", "https://api.nasa.gov/neo/rest/v1/feed").is_ok());
        assert!(validate_url("feed.url", "http://localhost:8080").is_ok());
        assert!(validate_url("feed.url", "").is_err());
        assert!(validate_url("feed.url", "invalid-url").is_err());
        assert!(validate_url("feed.url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_database_url() {
        assert!(validate_database_url("database.url", "postgres://u:p@db:5432/neo").is_ok());
        assert!(validate_database_url("database.url", "sqlite://neo.db?mode=rwc").is_ok());
        assert!(validate_database_url("database.url", "mysql://u@db/neo").is_err());
    }

    #[test]
    fn test_validate_sql_identifier() {
        assert!(validate_sql_identifier("database.table", "asteroids").is_ok());
        assert!(validate_sql_identifier("database.table", "_neo_2024").is_ok());
        assert!(validate_sql_identifier("database.table", "1asteroids").is_err());
        assert!(validate_sql_identifier("database.table", "asteroids; DROP TABLE x").is_err());
        assert!(validate_sql_identifier("database.table", "").is_err());
    }

    #[test]
    fn test_parse_iso_date() {
        let date = parse_iso_date("pipeline.start_date", "2024-01-01").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(parse_iso_date("pipeline.start_date", "01/01/2024").is_err());
    }

    #[test]
    fn test_redact_password() {
        let redacted = redact_password("postgres://neo:secret@db:5432/neo");
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("***"));
        assert_eq!(redact_password("sqlite://neo.db"), "sqlite://neo.db");
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("database.connect_attempts", 5, 1).is_ok());
        assert!(validate_positive_number("database.connect_attempts", 0, 1).is_err());
    }
}
