use crate::config::DatabaseSettings;
use crate::domain::model::{LoadOutcome, RowSet, Verification};
use crate::domain::ports::{RowStore, StoreConnector};
use crate::utils::error::{EtlError, Result};
use std::future::Future;
use std::time::Duration;

/// Fixed-delay retry used when acquiring a storage connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_CONNECT_ATTEMPTS,
            Duration::from_secs(crate::config::DEFAULT_CONNECT_DELAY_SECS),
        )
    }
}

impl From<&DatabaseSettings> for RetryPolicy {
    fn from(settings: &DatabaseSettings) -> Self {
        Self::new(settings.connect_attempts, settings.connect_delay)
    }
}

/// Calls `attempt` until it succeeds or `policy.max_attempts` calls have failed,
/// sleeping `policy.delay` between calls. The last failure becomes a `ConnectionError`.
pub async fn connect_with_retry<T, F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => {
                tracing::info!("✅ Database connection established (attempt {})", n);
                return Ok(value);
            }
            Err(source) if n >= policy.max_attempts => {
                tracing::error!(
                    "🔴 Failed to connect to database after {} attempts: {}",
                    n,
                    source
                );
                return Err(EtlError::ConnectionError {
                    attempts: n,
                    source,
                });
            }
            Err(e) => {
                tracing::warn!(
                    "🔴 Connection failed (attempt {}/{}): {}. Retrying in {:?}",
                    n,
                    policy.max_attempts,
                    e,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                n += 1;
            }
        }
    }
}

/// Full-replace loader for one target table.
pub struct Loader<C: StoreConnector> {
    connector: C,
    table: String,
    policy: RetryPolicy,
}

impl<C: StoreConnector> Loader<C> {
    pub fn new(connector: C, table: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            connector,
            table: table.into(),
            policy,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn connect(&self) -> Result<C::Store> {
        connect_with_retry(self.policy, |_| self.connector.try_connect()).await
    }

    /// Replaces the table with `rows`. An empty row set leaves storage untouched.
    pub async fn load(&self, rows: &RowSet) -> Result<LoadOutcome> {
        if rows.is_empty() {
            tracing::warn!("🟡 No rows to load; leaving '{}' untouched", self.table);
            return Ok(LoadOutcome::Skipped);
        }

        let store = self.connect().await?;
        tracing::info!("Loading {} rows into '{}'", rows.len(), self.table);
        let written = store.replace_rows(&self.table, rows).await?;
        tracing::info!("✅ Table '{}' replaced with {} rows", self.table, written);
        Ok(LoadOutcome::Replaced { rows: written })
    }

    /// Counts rows in `table`. Never fails; problems come back as `ok == false`.
    pub async fn verify(&self, table: &str) -> Verification {
        let store = match self.connect().await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("🔴 Verification skipped, database unavailable: {}", e);
                return Verification::failed(table);
            }
        };
        verify_table(&store, table).await
    }
}

pub async fn verify_table<S: RowStore>(store: &S, table: &str) -> Verification {
    match store.count_rows(table).await {
        Ok(count) => {
            tracing::info!("✨ Found {} records in the '{}' table", count, table);
            Verification {
                table: table.to_string(),
                count,
                ok: true,
            }
        }
        Err(e) => {
            tracing::warn!("🔴 Verification failed, table might not exist yet: {}", e);
            Verification::failed(table)
        }
    }
}
