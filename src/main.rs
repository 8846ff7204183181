use clap::Parser;
use neo_etl::core::LoadOutcome;
use neo_etl::utils::error::EtlError;
use neo_etl::utils::{logger, validation::Validate};
use neo_etl::{CliConfig, EtlEngine, NeoPipeline};

fn fail(stage: &str, e: &EtlError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    if e.is_transient() {
        eprintln!("🔁 This failure is usually temporary; re-running later may succeed");
    }
    std::process::exit(e.exit_code());
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    logger::init_logger(cli.verbose, cli.log_json);
    tracing::info!("Starting neo-etl");

    let config = match cli.resolve().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => fail("Configuration validation failed", &e),
    };
    tracing::debug!("Resolved config: {:?}", config);

    let range = match config.date_range(chrono::Local::now().date_naive()) {
        Ok(range) => range,
        Err(e) => fail("No date range configured", &e),
    };

    let pipeline = match NeoPipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => fail("Pipeline setup failed", &e),
    };

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }
    let engine = EtlEngine::new_with_monitoring(pipeline, cli.monitor);

    match engine.run(range).await {
        Ok(summary) => {
            let loaded = match summary.load {
                LoadOutcome::Replaced { rows } => rows,
                LoadOutcome::Skipped => 0,
            };
            println!("✅ ETL pipeline completed for {}", summary.range);
            println!(
                "📦 {} rows loaded into '{}' ({} malformed records skipped)",
                loaded, summary.verification.table, summary.records_rejected
            );
            if summary.verification.ok {
                println!("✨ Table now holds {} rows", summary.verification.count);
            } else {
                println!("🟡 Row count could not be verified");
            }
        }
        Err(e) => fail("ETL pipeline failed", &e),
    }
}
