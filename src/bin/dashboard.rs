use clap::Parser;
use neo_etl::core::dashboard::render_text;
use neo_etl::utils::{logger, validation::Validate};
use neo_etl::{DashboardCli, DashboardReader, SqlConnector};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = DashboardCli::parse();
    logger::init_cli_logger(cli.verbose);

    let config = match cli.resolve().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // A missing database setting is shown like any other storage problem.
    let url = match config.database.connection_url() {
        Ok(url) => url,
        Err(e) => {
            println!("🔴 Error fetching data from database. Has the ETL run? Details: {}", e);
            return;
        }
    };

    let reader = DashboardReader::new(
        SqlConnector::new(url, config.database.acquire_timeout),
        config.database.table.clone(),
        config.cache_ttl,
    );

    loop {
        let view = reader.view().await;
        println!("{}", render_text(&view, cli.limit));

        match cli.watch {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs.max(1))).await,
            None => break,
        }
    }
}
