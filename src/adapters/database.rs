use crate::domain::model::{NeoRow, RowSet, NEO_ROW_COLUMNS};
use crate::domain::ports::{RowStore, StoreConnector};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{redact_password, validate_sql_identifier};
use chrono::NaiveDate;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use std::time::Duration;

/// Placeholder syntax differs between the drivers behind `AnyPool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("sqlite:") {
            Dialect::Sqlite
        } else {
            Dialect::Postgres
        }
    }

    fn placeholders(self, count: usize) -> String {
        (1..=count)
            .map(|i| match self {
                Dialect::Postgres => format!("${}", i),
                Dialect::Sqlite => "?".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (\
         id TEXT NOT NULL, \
         name TEXT NOT NULL, \
         is_potentially_hazardous BOOLEAN NOT NULL, \
         close_approach_date TEXT NOT NULL, \
         diameter_min_km DOUBLE PRECISION NOT NULL, \
         diameter_max_km DOUBLE PRECISION NOT NULL, \
         relative_velocity_km_s DOUBLE PRECISION NOT NULL, \
         miss_distance_km DOUBLE PRECISION NOT NULL)",
        table
    )
}

fn insert_sql(table: &str, dialect: Dialect) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        NEO_ROW_COLUMNS.join(", "),
        dialect.placeholders(NEO_ROW_COLUMNS.len())
    )
}

/// Opens `AnyPool`s for one connection URL.
#[derive(Clone)]
pub struct SqlConnector {
    url: String,
    acquire_timeout: Duration,
}

impl SqlConnector {
    pub fn new(url: impl Into<String>, acquire_timeout: Duration) -> Self {
        sqlx::any::install_default_drivers();
        Self {
            url: url.into(),
            acquire_timeout,
        }
    }

    pub fn redacted_url(&self) -> String {
        redact_password(&self.url)
    }
}

impl std::fmt::Debug for SqlConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlConnector")
            .field("url", &self.redacted_url())
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

impl StoreConnector for SqlConnector {
    type Store = SqlRowStore;

    async fn try_connect(&self) -> std::result::Result<SqlRowStore, sqlx::Error> {
        let pool = AnyPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.url)
            .await?;

        // Liveness round-trip before the pool is handed out.
        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(SqlRowStore {
            pool,
            dialect: Dialect::from_url(&self.url),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SqlRowStore {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlRowStore {
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_from_any(row: &AnyRow) -> std::result::Result<NeoRow, sqlx::Error> {
    let date: String = row.try_get("close_approach_date")?;
    let close_approach_date =
        NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| sqlx::Error::ColumnDecode {
            index: "close_approach_date".to_string(),
            source: Box::new(e),
        })?;
    let hazardous: i64 = row.try_get("hazardous_flag")?;

    Ok(NeoRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        is_potentially_hazardous: hazardous != 0,
        close_approach_date,
        diameter_min_km: row.try_get("diameter_min_km")?,
        diameter_max_km: row.try_get("diameter_max_km")?,
        relative_velocity_km_s: row.try_get("relative_velocity_km_s")?,
        miss_distance_km: row.try_get("miss_distance_km")?,
    })
}

impl RowStore for SqlRowStore {
    async fn replace_rows(&self, table: &str, rows: &RowSet) -> Result<usize> {
        validate_sql_identifier("database.table", table)?;
        let load_error = |source: sqlx::Error| EtlError::LoadError {
            table: table.to_string(),
            source,
        };

        // Drop, create and insert commit together; a failure leaves the old table intact.
        let mut tx = self.pool.begin().await.map_err(load_error)?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(&mut *tx)
            .await
            .map_err(load_error)?;
        sqlx::query(&create_table_sql(table))
            .execute(&mut *tx)
            .await
            .map_err(load_error)?;

        let insert = insert_sql(table, self.dialect);
        for row in rows {
            sqlx::query(&insert)
                .bind(row.id.clone())
                .bind(row.name.clone())
                .bind(row.is_potentially_hazardous)
                .bind(row.close_approach_date.format("%Y-%m-%d").to_string())
                .bind(row.diameter_min_km)
                .bind(row.diameter_max_km)
                .bind(row.relative_velocity_km_s)
                .bind(row.miss_distance_km)
                .execute(&mut *tx)
                .await
                .map_err(load_error)?;
        }

        tx.commit().await.map_err(load_error)?;
        Ok(rows.len())
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        validate_sql_identifier("database.table", table)?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn fetch_rows(&self, table: &str) -> Result<Vec<NeoRow>> {
        validate_sql_identifier("database.table", table)?;
        let sql = format!(
            "SELECT id, name, \
             CAST(CASE WHEN is_potentially_hazardous THEN 1 ELSE 0 END AS BIGINT) AS hazardous_flag, \
             close_approach_date, diameter_min_km, diameter_max_km, \
             relative_velocity_km_s, miss_distance_km \
             FROM {} ORDER BY close_approach_date DESC",
            table
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row_from_any(row).map_err(EtlError::from))
            .collect()
    }
}
