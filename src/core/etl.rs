use crate::core::{DateRange, LoadOutcome, Pipeline, RunSummary};
use crate::utils::error::{EtlError, Result};
use crate::utils::monitor::StageMonitor;

/// Runs extract → transform → load → verify, stopping at the first fatal error.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: StageMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: StageMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self, range: DateRange) -> Result<RunSummary> {
        tracing::info!("✨ Starting NEO ETL pipeline for {}", range);

        let payload = self.pipeline.extract(range).await.map_err(|e| {
            tracing::error!("🔴 Pipeline failed during extraction");
            e
        })?;
        self.monitor.log_stage("extract");

        let output = self.pipeline.transform(Some(payload)).await.map_err(|e| {
            tracing::error!("🔴 Pipeline failed during transformation");
            e
        })?;
        self.monitor.log_stage("transform");

        if !output.rejected.is_empty() {
            tracing::warn!(
                "⚠️ {} malformed record(s) skipped during transformation",
                output.rejected.len()
            );
        }

        // An empty transform is valid on its own, but loading it would say nothing useful.
        if output.rows.is_empty() {
            tracing::error!("🔴 Transformation produced no rows; nothing will be loaded");
            return Err(EtlError::EmptyRowSetError {
                start_date: range.start_param(),
                end_date: range.end_param(),
            });
        }

        let load = self.pipeline.load(&output.rows).await.map_err(|e| {
            tracing::error!("🔴 Pipeline failed during load");
            e
        })?;
        self.monitor.log_stage("load");

        let verification = self.pipeline.verify().await;
        if !verification.ok {
            tracing::warn!("🟡 Row count for '{}' could not be verified", verification.table);
        } else if let LoadOutcome::Replaced { rows } = load {
            if verification.count != rows as i64 {
                tracing::warn!(
                    "🟡 Loaded {} rows but '{}' holds {}",
                    rows,
                    verification.table,
                    verification.count
                );
            }
        }
        self.monitor.log_final();

        tracing::info!("🎉 ETL pipeline completed");
        Ok(RunSummary {
            range,
            rows_transformed: output.rows.len(),
            records_rejected: output.rejected.len(),
            load,
            verification,
        })
    }
}
