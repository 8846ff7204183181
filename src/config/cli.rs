use crate::config::{ConfigOverrides, PipelineConfig, TomlConfig};
use crate::utils::error::Result;
use clap::{Args, Parser};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Args)]
pub struct DatabaseArgs {
    /// Full connection URL (postgres://... or sqlite://...); overrides the parts below
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "DB_PORT")]
    pub db_port: Option<u16>,

    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Target table
    #[arg(long, env = "NEO_TABLE")]
    pub table: Option<String>,

    /// Connection attempts before giving up
    #[arg(long)]
    pub connect_attempts: Option<u32>,

    /// Seconds to wait between connection attempts
    #[arg(long)]
    pub connect_delay: Option<u64>,
}

impl DatabaseArgs {
    fn fill(&self, overrides: &mut ConfigOverrides) {
        overrides.database_url = self.database_url.clone();
        overrides.db_host = self.db_host.clone();
        overrides.db_port = self.db_port;
        overrides.db_user = self.db_user.clone();
        overrides.db_password = self.db_password.clone();
        overrides.db_name = self.db_name.clone();
        overrides.table = self.table.clone();
        overrides.connect_attempts = self.connect_attempts;
        overrides.connect_delay_secs = self.connect_delay;
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "neo-etl")]
#[command(about = "Load near-Earth-object close approaches from the NASA NeoWs feed into a table")]
pub struct CliConfig {
    /// Optional TOML configuration file
    #[arg(short, long, env = "NEO_ETL_CONFIG")]
    pub config: Option<PathBuf>,

    /// NeoWs feed endpoint
    #[arg(long, env = "NEO_FEED_URL")]
    pub feed_url: Option<String>,

    #[arg(long, env = "NASA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Feed request timeout in seconds
    #[arg(long, env = "NEO_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long, env = "START_DATE")]
    pub start_date: Option<String>,

    /// Last day of the range (YYYY-MM-DD)
    #[arg(long, env = "END_DATE")]
    pub end_date: Option<String>,

    /// Window length in days when no end date is given (starts today without a start date)
    #[arg(long, env = "NEO_DAYS")]
    pub days: Option<u64>,

    /// Directory for raw_neo_data.json and clean_neo_data.csv
    #[arg(long, env = "NEO_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log per-stage CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

impl CliConfig {
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            feed_url: self.feed_url.clone(),
            api_key: self.api_key.clone(),
            request_timeout_secs: self.request_timeout,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            days: self.days,
            output_dir: self.output_dir.clone(),
            ..Default::default()
        };
        self.database.fill(&mut overrides);
        overrides
    }

    pub fn resolve(&self) -> Result<PipelineConfig> {
        let file = self
            .config
            .as_ref()
            .map(TomlConfig::from_file)
            .transpose()?;
        PipelineConfig::from_layers(file.as_ref(), self.overrides())
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "neo-dashboard")]
#[command(about = "Show the loaded near-Earth-object table and summary metrics")]
pub struct DashboardCli {
    #[arg(short, long, env = "NEO_ETL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Seconds a fetched table stays fresh
    #[arg(long, env = "NEO_CACHE_TTL")]
    pub cache_ttl: Option<u64>,

    /// Re-render every N seconds instead of exiting after one view
    #[arg(long)]
    pub watch: Option<u64>,

    /// Rows shown in the table section
    #[arg(long, default_value = "25")]
    pub limit: usize,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl DashboardCli {
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            cache_ttl_secs: self.cache_ttl,
            ..Default::default()
        };
        self.database.fill(&mut overrides);
        overrides
    }

    pub fn resolve(&self) -> Result<PipelineConfig> {
        let file = self
            .config
            .as_ref()
            .map(TomlConfig::from_file)
            .transpose()?;
        PipelineConfig::from_layers(file.as_ref(), self.overrides())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_defaults() {
        let cli = CliConfig::try_parse_from([
            "neo-etl",
            "--api-key",
            "DEMO_KEY",
            "--feed-url",
            "https://api.nasa.gov/neo/rest/v1/feed",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "2024-01-02",
            "--database-url",
            "sqlite://neo.db?mode=rwc",
            "--connect-attempts",
            "2",
            "--days",
            "2",
            "--db-port",
            "5432",
            "--request-timeout",
            "30",
        ])
        .unwrap();

        // Layered without a file so an exported NEO_ETL_CONFIG cannot leak in.
        let config = PipelineConfig::from_layers(None, cli.overrides()).unwrap();
        assert_eq!(config.feed.api_key.as_deref(), Some("DEMO_KEY"));
        assert_eq!(config.end_date.unwrap().to_string(), "2024-01-02");
        assert_eq!(config.database.connect_attempts, 2);
        assert_eq!(config.days, Some(2));
        assert_eq!(
            config.database.connection_url().unwrap(),
            "sqlite://neo.db?mode=rwc"
        );
    }

    #[test]
    fn test_dashboard_cli_cache_ttl() {
        let cli = DashboardCli::try_parse_from([
            "neo-dashboard",
            "--cache-ttl",
            "30",
            "--db-port",
            "5432",
        ]).unwrap();
        let config = PipelineConfig::from_layers(None, cli.overrides()).unwrap();
        assert_eq!(config.cache_ttl, std::time::Duration::from_secs(30));
        assert_eq!(cli.limit, 25);
    }
}
