use crate::config::job::{ConditionMapJob, GrowthJob, ImarisJob, JobSpec, KineticsJob, PlotJob};
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, Validate};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "dknlab")]
#[command(version, about = "Tidy plate reader, kinetics and imaging exports for the lab")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, global = true, default_value = ".", help = "Base directory for relative paths")]
    pub workdir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Tecan i-control time-course export
    Tecan(GrowthJob),
    /// BioTek Gen5 kinetic-read export
    Biotek(GrowthJob),
    /// 96-well condition map only
    Condmap(ConditionMapJob),
    /// Michaelis–Menten fit of SpectraMax slopes
    Kinetics(KineticsJob),
    /// Aggregate Imaris SYTO-9 / PI statistics
    Imaris(ImarisJob),
    /// Plot a tidy growth-curve table
    Plot(PlotJob),
    /// Run every job of a TOML run file
    Run {
        #[arg(long, short, default_value = "dknlab.toml")]
        config: String,

        #[arg(long, help = "Validate the run file without executing it")]
        dry_run: bool,
    },
}

impl Command {
    /// 單一工作的子命令；`run` 回傳 None
    pub fn job(&self) -> Option<JobSpec> {
        match self {
            Command::Tecan(job) => Some(JobSpec::Tecan(job.clone())),
            Command::Biotek(job) => Some(JobSpec::Biotek(job.clone())),
            Command::Condmap(job) => Some(JobSpec::Condmap(job.clone())),
            Command::Kinetics(job) => Some(JobSpec::Kinetics(job.clone())),
            Command::Imaris(job) => Some(JobSpec::Imaris(job.clone())),
            Command::Plot(job) => Some(JobSpec::Plot(job.clone())),
            Command::Run { .. } => None,
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("workdir", &self.workdir)?;
        match &self.command {
            Command::Run { config, .. } => validate_path("config", config),
            _ => match self.command.job() {
                Some(job) => job.validate(),
                None => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::condition_map::Instrument;

    #[test]
    fn test_parse_tecan_subcommand() {
        let config = CliConfig::try_parse_from([
            "dknlab",
            "--verbose",
            "tecan",
            "plate.xlsx",
            "--condition-map",
            "condmap.xlsx",
            "--output-formats",
            "csv,json",
            "--bundle",
            "growth.zip",
        ])
        .unwrap();

        assert!(config.verbose);
        assert_eq!(config.workdir, ".");
        match config.command.job() {
            Some(JobSpec::Tecan(job)) => {
                assert_eq!(job.data, "plate.xlsx");
                assert_eq!(job.condition_map.as_deref(), Some("condmap.xlsx"));
                assert_eq!(job.output.output_formats, vec!["csv", "json"]);
                assert_eq!(job.output.output_path, "./output");
                assert_eq!(job.output.bundle.as_deref(), Some("growth.zip"));
            }
            other => panic!("unexpected job {:?}", other),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_condmap_instrument() {
        let config =
            CliConfig::try_parse_from(["dknlab", "condmap", "map.csv", "--instrument", "biotek"])
                .unwrap();
        match config.command {
            Command::Condmap(job) => assert_eq!(job.instrument, Instrument::Biotek),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let config = CliConfig::try_parse_from([
            "dknlab", "run", "--config", "batch.toml", "--monitor", "--workdir", "/data",
        ])
        .unwrap();
        assert!(config.monitor);
        assert_eq!(config.workdir, "/data");
        assert!(config.command.job().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_kinetics_requires_parameters() {
        assert!(CliConfig::try_parse_from(["dknlab", "kinetics", "rates.csv"]).is_err());

        let config = CliConfig::try_parse_from([
            "dknlab",
            "kinetics",
            "rates.csv",
            "--ex-coeff",
            "0",
            "--substrate",
            "PYO",
            "--slope-column",
            "slope",
            "--protein-concentration",
            "0.5",
            "--protein-name",
            "PodA",
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }
}
