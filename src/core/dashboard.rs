//! Read-only view over the loaded table: ordered rows, summary metrics and a
//! time-bounded cache so repeated renders do not hit the database.

use crate::core::{NeoRow, RowStore, StoreConnector};
use crate::utils::error::Result;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const COLUMN_LABELS: [&str; 8] = [
    "ID",
    "Name",
    "Hazardous",
    "Approach Date",
    "Min Diameter (km)",
    "Max Diameter (km)",
    "Velocity (km/s)",
    "Miss Distance (km)",
];

const NOT_LOADED_HINT: &str =
    "The database may not be running or the table is empty. Run the neo-etl pipeline to load data first.";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardMetrics {
    pub total: usize,
    pub hazardous: usize,
    pub max_diameter_km: Option<f64>,
    pub min_miss_distance_km: Option<f64>,
}

impl DashboardMetrics {
    pub fn from_rows(rows: &[NeoRow]) -> Self {
        Self {
            total: rows.len(),
            hazardous: rows.iter().filter(|r| r.is_potentially_hazardous).count(),
            max_diameter_km: rows.iter().map(|r| r.diameter_max_km).reduce(f64::max),
            min_miss_distance_km: rows.iter().map(|r| r.miss_distance_km).reduce(f64::min),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Ready {
        rows: Arc<Vec<NeoRow>>,
        metrics: DashboardMetrics,
    },
    Empty {
        message: String,
    },
    Unavailable {
        message: String,
    },
}

struct CacheEntry {
    fetched_at: Instant,
    rows: Arc<Vec<NeoRow>>,
}

/// Serves the table through a cache with a freshness window of `ttl`.
pub struct DashboardReader<C: StoreConnector> {
    connector: C,
    table: String,
    ttl: Duration,
    store: Mutex<Option<C::Store>>,
    cache: Mutex<Option<CacheEntry>>,
}

impl<C: StoreConnector> DashboardReader<C> {
    pub fn new(connector: C, table: impl Into<String>, ttl: Duration) -> Self {
        Self {
            connector,
            table: table.into(),
            ttl,
            store: Mutex::new(None),
            cache: Mutex::new(None),
        }
    }

    async fn fetch_fresh(&self) -> Result<Vec<NeoRow>> {
        let mut store = self.store.lock().await;
        if store.is_none() {
            *store = Some(self.connector.try_connect().await?);
        }
        let result = match store.as_ref() {
            Some(s) => s.fetch_rows(&self.table).await,
            None => Ok(Vec::new()),
        };
        if result.is_err() {
            // Reconnect on the next refresh; the database may have restarted.
            *store = None;
        }
        result
    }

    /// Rows, newest approach first. Cached results are reused until they are older than `ttl`.
    pub async fn rows(&self) -> Result<Arc<Vec<NeoRow>>> {
        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                tracing::debug!("Serving {} cached rows", entry.rows.len());
                return Ok(Arc::clone(&entry.rows));
            }
        }

        let rows = Arc::new(self.fetch_fresh().await?);
        tracing::debug!("Fetched {} rows from '{}'", rows.len(), self.table);
        *cache = Some(CacheEntry {
            fetched_at: Instant::now(),
            rows: Arc::clone(&rows),
        });
        Ok(rows)
    }

    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// Never fails: storage problems become an `Unavailable` view.
    pub async fn view(&self) -> DashboardView {
        match self.rows().await {
            Ok(rows) if rows.is_empty() => DashboardView::Empty {
                message: format!("The '{}' table is empty. {}", self.table, NOT_LOADED_HINT),
            },
            Ok(rows) => {
                let metrics = DashboardMetrics::from_rows(&rows);
                DashboardView::Ready { rows, metrics }
            }
            Err(e) => {
                tracing::warn!("Dashboard could not read '{}': {}", self.table, e);
                DashboardView::Unavailable {
                    message: format!(
                        "🔴 Error fetching data from database. Has the ETL run? Details: {}\n{}",
                        e, NOT_LOADED_HINT
                    ),
                }
            }
        }
    }
}

/// `1234567.8` → `"1,234,568"`.
fn with_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{}{}", sign, out)
}

pub fn render_text(view: &DashboardView, limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🛰️  Near-Earth Asteroid Tracker");
    let _ = writeln!(out, "{}", "-".repeat(60));

    match view {
        DashboardView::Empty { message } | DashboardView::Unavailable { message } => {
            let _ = writeln!(out, "{}", message);
        }
        DashboardView::Ready { rows, metrics } => {
            let _ = writeln!(
                out,
                "Data from NASA NeoWs API ({} Close Approaches)\n",
                metrics.total
            );
            let _ = writeln!(out, "Potentially Hazardous NEOs:     {}", metrics.hazardous);
            if let Some(max) = metrics.max_diameter_km {
                let _ = writeln!(out, "Largest Max Diameter (km):      {:.2}", max);
            }
            if let Some(min) = metrics.min_miss_distance_km {
                let _ = writeln!(out, "Closest Approach Distance (km): {}", with_thousands(min));
            }
            let _ = writeln!(out, "{}", "-".repeat(60));
            let _ = writeln!(out, "{}", COLUMN_LABELS.join(" | "));
            for row in rows.iter().take(limit) {
                let _ = writeln!(
                    out,
                    "{} | {} | {} | {} | {:.3} | {:.3} | {:.2} | {}",
                    row.id,
                    row.name,
                    if row.is_potentially_hazardous { "yes" } else { "no" },
                    row.close_approach_date,
                    row.diameter_min_km,
                    row.diameter_max_km,
                    row.relative_velocity_km_s,
                    with_thousands(row.miss_distance_km)
                );
            }
            if rows.len() > limit {
                let _ = writeln!(out, "... {} more rows", rows.len() - limit);
            }
        }
    }
    out
}
