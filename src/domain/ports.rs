use crate::domain::model::{
    DateRange, LoadOutcome, NeoRow, RawFeedPayload, RowSet, TransformOutput, Verification,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::future::Future;

/// Best-effort destination for diagnostic artifacts.
pub trait ArtifactSink: Send + Sync {
    fn write_file(&self, path: &str, data: &[u8]) -> impl Future<Output = Result<()>> + Send;
}

pub trait FeedSource: Send + Sync {
    fn fetch(&self, range: DateRange) -> impl Future<Output = Result<RawFeedPayload>> + Send;
}

/// A live handle on the relational store.
pub trait RowStore: Send + Sync {
    /// Drops and recreates `table` holding exactly `rows`.
    fn replace_rows(
        &self,
        table: &str,
        rows: &RowSet,
    ) -> impl Future<Output = Result<usize>> + Send;

    fn count_rows(&self, table: &str) -> impl Future<Output = Result<i64>> + Send;

    /// All rows, newest close-approach date first.
    fn fetch_rows(&self, table: &str) -> impl Future<Output = Result<Vec<NeoRow>>> + Send;
}

/// Opens one connection attempt; retrying is the loader's job.
pub trait StoreConnector: Send + Sync {
    type Store: RowStore;

    fn try_connect(&self) -> impl Future<Output = std::result::Result<Self::Store, sqlx::Error>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self, range: DateRange) -> Result<RawFeedPayload>;
    async fn transform(&self, payload: Option<RawFeedPayload>) -> Result<TransformOutput>;
    async fn load(&self, rows: &RowSet) -> Result<LoadOutcome>;
    async fn verify(&self) -> Verification;
}
