use crate::adapters::database::SqlConnector;
use crate::adapters::http::NeoFeedClient;
use crate::adapters::storage::LocalStorage;
use crate::config::PipelineConfig;
use crate::core::load::{Loader, RetryPolicy};
use crate::core::transform::{rows_to_csv, transform};
use crate::core::{
    ArtifactSink, DateRange, FeedSource, LoadOutcome, Pipeline, RawFeedPayload, RowSet,
    StoreConnector, TransformOutput, Verification,
};
use crate::utils::error::Result;

pub const RAW_SNAPSHOT_FILE: &str = "raw_neo_data.json";
pub const CLEAN_ROWS_FILE: &str = "clean_neo_data.csv";

/// The NEO feed → table pipeline. Diagnostic files go to `artifacts` and never affect
/// the stage results.
pub struct NeoPipeline<F: FeedSource, C: StoreConnector, S: ArtifactSink> {
    feed: F,
    loader: Loader<C>,
    artifacts: S,
}

impl<F: FeedSource, C: StoreConnector, S: ArtifactSink> NeoPipeline<F, C, S> {
    pub fn new(feed: F, loader: Loader<C>, artifacts: S) -> Self {
        Self {
            feed,
            loader,
            artifacts,
        }
    }

    pub fn loader(&self) -> &Loader<C> {
        &self.loader
    }

    async fn write_artifact(&self, path: &str, data: Result<Vec<u8>>) {
        let outcome = match data {
            Ok(bytes) => self.artifacts.write_file(path, &bytes).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => tracing::info!("💾 Saved {}", path),
            Err(e) => tracing::warn!("⚠️ Could not save {}: {}", path, e),
        }
    }
}

impl NeoPipeline<NeoFeedClient, SqlConnector, LocalStorage> {
    /// Production wiring: NeoWs client, sqlx storage, diagnostics under `output_dir`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let feed = NeoFeedClient::new(&config.feed)?;
        let connector = SqlConnector::new(
            config.database.connection_url()?,
            config.database.acquire_timeout,
        );
        tracing::debug!("Database: {}", connector.redacted_url());
        let loader = Loader::new(
            connector,
            config.database.table.clone(),
            RetryPolicy::from(&config.database),
        );
        Ok(Self::new(
            feed,
            loader,
            LocalStorage::new(config.output_dir.clone()),
        ))
    }
}

#[async_trait::async_trait]
impl<F: FeedSource, C: StoreConnector, S: ArtifactSink> Pipeline for NeoPipeline<F, C, S> {
    async fn extract(&self, range: DateRange) -> Result<RawFeedPayload> {
        let payload = self.feed.fetch(range).await?;
        self.write_artifact(RAW_SNAPSHOT_FILE, payload.to_pretty_json().map_err(Into::into))
            .await;
        Ok(payload)
    }

    async fn transform(&self, payload: Option<RawFeedPayload>) -> Result<TransformOutput> {
        let output = transform(payload.as_ref())?;
        for rejected in &output.rejected {
            tracing::debug!("Rejected {}", rejected);
        }
        self.write_artifact(CLEAN_ROWS_FILE, rows_to_csv(&output.rows))
            .await;
        Ok(output)
    }

    async fn load(&self, rows: &RowSet) -> Result<LoadOutcome> {
        self.loader.load(rows).await
    }

    async fn verify(&self) -> Verification {
        self.loader.verify(self.loader.table()).await
    }
}
