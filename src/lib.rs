pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::storage::LocalStorage;
pub use app::runner::{run_all, run_job};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{JobSpec, RunConfig};
pub use core::etl::EtlEngine;
pub use domain::table::Table;
pub use utils::error::{DknError, Result};
