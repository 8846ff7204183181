pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, DashboardCli};

pub use adapters::{database::SqlConnector, http::NeoFeedClient, storage::LocalStorage};
pub use config::PipelineConfig;
pub use core::{dashboard::DashboardReader, etl::EtlEngine, pipeline::NeoPipeline};
pub use utils::error::{EtlError, Result};
