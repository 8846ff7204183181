use chrono::NaiveDate;
use neo_etl::core::dashboard::DashboardView;
use neo_etl::core::load::{verify_table, Loader, RetryPolicy};
use neo_etl::core::{LoadOutcome, NeoRow, RowSet, RowStore, StoreConnector};
use neo_etl::{DashboardReader, EtlError, SqlConnector};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn sqlite_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("neo.db").display())
}

fn connector(dir: &TempDir) -> SqlConnector {
    SqlConnector::new(sqlite_url(dir), Duration::from_secs(5))
}

fn loader(dir: &TempDir) -> Loader<SqlConnector> {
    Loader::new(
        connector(dir),
        "asteroids",
        RetryPolicy::new(3, Duration::from_millis(10)),
    )
}

fn row(id: &str, date: &str, hazardous: bool) -> NeoRow {
    NeoRow {
        id: id.to_string(),
        name: format!("({})", id),
        is_potentially_hazardous: hazardous,
        close_approach_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        diameter_min_km: 0.12,
        diameter_max_km: 0.27,
        relative_velocity_km_s: 13.5,
        miss_distance_km: 4_250_000.5,
    }
}

fn rows(n: usize) -> RowSet {
    (0..n)
        .map(|i| row(&format!("{}", 2000000 + i), "2024-01-01", i % 2 == 0))
        .collect::<Vec<_>>()
        .into()
}

#[tokio::test]
async fn test_load_then_verify_counts_rows() {
    let dir = TempDir::new().unwrap();
    let loader = loader(&dir);

    let outcome = assert_ok!(loader.load(&rows(4)).await);
    assert_eq!(outcome, LoadOutcome::Replaced { rows: 4 });

    let verification = loader.verify("asteroids").await;
    assert!(verification.ok);
    assert_eq!(verification.count, 4);
}

#[tokio::test]
async fn test_load_replaces_previous_generation() {
    let dir = TempDir::new().unwrap();
    let loader = loader(&dir);

    assert_ok!(loader.load(&rows(5)).await);
    assert_ok!(loader.load(&rows(2)).await);

    assert_eq!(loader.verify("asteroids").await.count, 2);
}

#[tokio::test]
async fn test_loading_same_rows_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let loader = loader(&dir);
    let batch = rows(3);

    assert_ok!(loader.load(&batch).await);
    let first = loader.verify("asteroids").await;
    assert_ok!(loader.load(&batch).await);
    let second = loader.verify("asteroids").await;

    assert_eq!(first, second);
    assert_eq!(second.count, 3);
}

#[tokio::test]
async fn test_empty_load_leaves_table_untouched() {
    let dir = TempDir::new().unwrap();
    let loader = loader(&dir);
    assert_ok!(loader.load(&rows(3)).await);

    let outcome = assert_ok!(loader.load(&RowSet::default()).await);

    assert_eq!(outcome, LoadOutcome::Skipped);
    assert_eq!(loader.verify("asteroids").await.count, 3);
}

#[tokio::test]
async fn test_verify_missing_table_is_negative_result() {
    let dir = TempDir::new().unwrap();
    let loader = loader(&dir);

    let verification = loader.verify("asteroids").await;

    assert!(!verification.ok);
    assert_eq!(verification.count, 0);
}

#[tokio::test]
async fn test_unreachable_storage_fails_after_all_attempts() {
    let dir = TempDir::new().unwrap();
    // No mode=rwc: the file does not exist and will not be created.
    let url = format!("sqlite://{}", dir.path().join("missing.db").display());
    let loader = Loader::new(
        SqlConnector::new(url, Duration::from_secs(1)),
        "asteroids",
        RetryPolicy::new(3, Duration::from_millis(50)),
    );
    let started = Instant::now();

    let err = assert_err!(loader.load(&rows(1)).await);

    assert!(matches!(err, EtlError::ConnectionError { attempts: 3, .. }));
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(!dir.path().join("missing.db").exists());
}

#[tokio::test]
async fn test_fetch_rows_round_trips_and_orders_by_date_desc() {
    let dir = TempDir::new().unwrap();
    let loader = loader(&dir);
    let batch: RowSet = vec![
        row("a", "2024-01-01", false),
        row("b", "2024-01-03", true),
        row("c", "2024-01-02", false),
    ]
    .into();
    assert_ok!(loader.load(&batch).await);

    let store = assert_ok!(connector(&dir).try_connect().await);
    let fetched = assert_ok!(store.fetch_rows("asteroids").await);

    let ids: Vec<&str> = fetched.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
    assert_eq!(fetched[0], batch.as_slice()[1]);
    assert_eq!(verify_table(&store, "asteroids").await.count, 3);
    store.close().await;
}

#[tokio::test]
async fn test_failed_replace_rolls_back_to_previous_table() {
    let dir = TempDir::new().unwrap();
    let store = assert_ok!(connector(&dir).try_connect().await);
    let previous: RowSet = vec![
        row("a", "2024-01-01", false),
        row("b", "2024-01-02", true),
        row("c", "2024-01-03", false),
    ]
    .into();
    assert_ok!(store.replace_rows("asteroids", &previous).await);

    // SQLite stores NaN as NULL, which the NOT NULL column rejects mid-insert.
    let mut poisoned = row("z", "2024-02-01", false);
    poisoned.miss_distance_km = f64::NAN;
    let batch: RowSet = vec![row("y", "2024-02-01", true), poisoned].into();

    let err = assert_err!(store.replace_rows("asteroids", &batch).await);
    assert!(matches!(err, EtlError::LoadError { ref table, .. } if table == "asteroids"));

    let verification = verify_table(&store, "asteroids").await;
    assert!(verification.ok);
    assert_eq!(verification.count, 3);

    let mut ids: Vec<String> = assert_ok!(store.fetch_rows("asteroids").await)
        .into_iter()
        .map(|r| r.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "c"]);
    store.close().await;
}

#[tokio::test]
async fn test_invalid_table_name_is_rejected_before_sql() {
    let dir = TempDir::new().unwrap();
    let store = assert_ok!(connector(&dir).try_connect().await);

    let err = assert_err!(store.replace_rows("asteroids; DROP TABLE x", &rows(1)).await);
    assert!(matches!(err, EtlError::InvalidConfigValueError { .. }));
}

#[tokio::test]
async fn test_dashboard_cache_serves_stale_rows_within_ttl() {
    let dir = TempDir::new().unwrap();
    let loader = loader(&dir);
    assert_ok!(loader.load(&rows(2)).await);

    let reader = DashboardReader::new(connector(&dir), "asteroids", Duration::from_secs(3600));
    assert_eq!(assert_ok!(reader.rows().await).len(), 2);

    assert_ok!(loader.load(&rows(5)).await);
    assert_eq!(assert_ok!(reader.rows().await).len(), 2);

    reader.invalidate().await;
    match reader.view().await {
        DashboardView::Ready { rows, metrics } => {
            assert_eq!(rows.len(), 5);
            assert_eq!(metrics.hazardous, 3);
            assert_eq!(metrics.max_diameter_km, Some(0.27));
        }
        other => panic!("expected ready view, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dashboard_zero_ttl_always_refreshes() {
    let dir = TempDir::new().unwrap();
    let loader = loader(&dir);
    assert_ok!(loader.load(&rows(1)).await);

    let reader = DashboardReader::new(connector(&dir), "asteroids", Duration::ZERO);
    assert_eq!(assert_ok!(reader.rows().await).len(), 1);

    assert_ok!(loader.load(&rows(4)).await);
    assert_eq!(assert_ok!(reader.rows().await).len(), 4);
}

#[tokio::test]
async fn test_dashboard_reports_missing_table_and_storage() {
    let dir = TempDir::new().unwrap();

    let reader = DashboardReader::new(connector(&dir), "asteroids", Duration::from_secs(60));
    match reader.view().await {
        DashboardView::Unavailable { message } => assert!(message.contains("Has the ETL run?")),
        other => panic!("expected unavailable view, got {:?}", other),
    }

    let url = format!("sqlite://{}", dir.path().join("absent.db").display());
    let reader = DashboardReader::new(
        SqlConnector::new(url, Duration::from_secs(1)),
        "asteroids",
        Duration::from_secs(60),
    );
    assert!(matches!(reader.view().await, DashboardView::Unavailable { .. }));
}

#[tokio::test]
async fn test_dashboard_reports_empty_table() {
    let dir = TempDir::new().unwrap();
    let store = assert_ok!(connector(&dir).try_connect().await);
    assert_ok!(store.replace_rows("asteroids", &RowSet::default()).await);

    let reader = DashboardReader::new(connector(&dir), "asteroids", Duration::from_secs(60));
    match reader.view().await {
        DashboardView::Empty { message } => assert!(message.contains("empty")),
        other => panic!("expected empty view, got {:?}", other),
    }
}
