#[cfg(feature = "cli")]
pub mod cli;
pub mod job;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use job::{ConditionMapJob, GrowthJob, ImarisJob, JobSpec, KineticsJob, OutputConfig, PlotJob};
pub use toml_config::RunConfig;
