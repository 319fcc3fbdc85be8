use crate::core::condition_map::Instrument;
use crate::core::growth::TIME_HR;
use crate::core::ConfigProvider;
use crate::utils::error::{DknError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_output_formats, validate_path,
    validate_positive_number, validate_range, Validate, INPUT_EXTENSIONS,
};
use serde::{Deserialize, Serialize};

fn default_output_path() -> String {
    "./output".to_string()
}

fn default_output_formats() -> Vec<String> {
    vec!["csv".to_string()]
}

fn default_delimiter() -> String {
    ";".to_string()
}

fn default_time_column() -> String {
    TIME_HR.to_string()
}

fn default_plot_name() -> String {
    "growth_curves".to_string()
}

/// 輸出位置與格式，每個工作各自一份
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct OutputConfig {
    #[cfg_attr(feature = "cli", arg(long, default_value = "./output"))]
    #[serde(default = "default_output_path")]
    pub output_path: String,

    #[cfg_attr(
        feature = "cli",
        arg(long, value_delimiter = ',', default_value = "csv", help = "Table formats: csv, tsv, json")
    )]
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,

    #[cfg_attr(feature = "cli", arg(long, help = "Also pack every output into this zip file"))]
    #[serde(default)]
    pub bundle: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            output_formats: default_output_formats(),
            bundle: None,
        }
    }
}

impl ConfigProvider for OutputConfig {
    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }

    fn bundle_name(&self) -> Option<&str> {
        self.bundle.as_deref()
    }
}

impl Validate for OutputConfig {
    fn validate(&self) -> Result<()> {
        validate_path("output_path", &self.output_path)?;
        validate_output_formats("output_formats", &self.output_formats)?;
        if let Some(bundle) = &self.bundle {
            validate_file_extensions("bundle", std::slice::from_ref(bundle), &["zip"])?;
        }
        Ok(())
    }
}

/// Tecan / BioTek 生長曲線
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct GrowthJob {
    #[cfg_attr(feature = "cli", arg(help = "Plate reader export (csv or spreadsheet)"))]
    pub data: String,

    #[cfg_attr(feature = "cli", arg(long, help = "Filled-in 96-well condition map"))]
    #[serde(default)]
    pub condition_map: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, default_value = ";"))]
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[cfg_attr(
        feature = "cli",
        arg(long, help = "Condition map lists every addition per well (Tecan only)")
    )]
    #[serde(default)]
    pub verbose_legend: bool,

    #[cfg_attr(feature = "cli", arg(long, help = "Write one table per measurement"))]
    #[serde(default)]
    pub separate: bool,

    #[cfg_attr(feature = "cli", command(flatten))]
    #[serde(flatten)]
    pub output: OutputConfig,
}

impl GrowthJob {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            condition_map: None,
            delimiter: default_delimiter(),
            verbose_legend: false,
            separate: false,
            output: OutputConfig::default(),
        }
    }
}

impl Validate for GrowthJob {
    fn validate(&self) -> Result<()> {
        validate_file_extensions("data", std::slice::from_ref(&self.data), INPUT_EXTENSIONS)?;
        if let Some(condition_map) = &self.condition_map {
            validate_file_extensions(
                "condition_map",
                std::slice::from_ref(condition_map),
                INPUT_EXTENSIONS,
            )?;
        }
        validate_delimiter(&self.delimiter)?;
        if self.separate && self.condition_map.is_some() {
            return Err(DknError::ConfigValidationError {
                field: "separate".to_string(),
                message: "A condition map can only be joined with merged measurements".to_string(),
            });
        }
        self.output.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct ConditionMapJob {
    pub file: String,

    #[cfg_attr(feature = "cli", arg(long, value_enum, default_value = "tecan"))]
    #[serde(default)]
    pub instrument: Instrument,

    #[cfg_attr(feature = "cli", arg(long, default_value = ";"))]
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    #[cfg_attr(feature = "cli", arg(long))]
    #[serde(default)]
    pub verbose_legend: bool,

    #[cfg_attr(feature = "cli", command(flatten))]
    #[serde(flatten)]
    pub output: OutputConfig,
}

impl Validate for ConditionMapJob {
    fn validate(&self) -> Result<()> {
        validate_file_extensions("file", std::slice::from_ref(&self.file), INPUT_EXTENSIONS)?;
        validate_delimiter(&self.delimiter)?;
        if self.verbose_legend && self.instrument == Instrument::Biotek {
            return Err(DknError::InvalidConfigValueError {
                field: "verbose_legend".to_string(),
                value: "true".to_string(),
                reason: "Verbose legends are only supported for Tecan condition maps".to_string(),
            });
        }
        self.output.validate()
    }
}

/// SpectraMax 斜率的 Michaelis–Menten 分析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct KineticsJob {
    pub data: String,

    #[cfg_attr(feature = "cli", arg(long, help = "Extinction coefficient of the substrate (M-1 cm-1)"))]
    pub ex_coeff: f64,

    #[cfg_attr(feature = "cli", arg(long, help = "Substrate concentration column (µM)"))]
    pub substrate: String,

    #[cfg_attr(feature = "cli", arg(long, help = "Slope column (absorbance per minute)"))]
    pub slope_column: String,

    #[cfg_attr(feature = "cli", arg(long, help = "Enzyme concentration (µM)"))]
    pub protein_concentration: f64,

    #[cfg_attr(feature = "cli", arg(long))]
    pub protein_name: String,

    #[cfg_attr(feature = "cli", command(flatten))]
    #[serde(flatten)]
    pub output: OutputConfig,
}

impl Validate for KineticsJob {
    fn validate(&self) -> Result<()> {
        validate_file_extensions("data", std::slice::from_ref(&self.data), INPUT_EXTENSIONS)?;
        validate_positive_number("ex_coeff", self.ex_coeff)?;
        validate_positive_number("protein_concentration", self.protein_concentration)?;
        validate_non_empty_string("substrate", &self.substrate)?;
        validate_non_empty_string("slope_column", &self.slope_column)?;
        validate_non_empty_string("protein_name", &self.protein_name)?;
        self.output.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct ImarisJob {
    #[cfg_attr(feature = "cli", arg(help = "Folder of <image>_Combined_Statistics folders"))]
    pub folder: String,

    #[cfg_attr(feature = "cli", arg(long, help = "The folder holds one image's CSVs directly"))]
    #[serde(default)]
    pub single_image: bool,

    #[cfg_attr(feature = "cli", command(flatten))]
    #[serde(flatten)]
    pub output: OutputConfig,
}

impl Validate for ImarisJob {
    fn validate(&self) -> Result<()> {
        validate_path("folder", &self.folder)?;
        self.output.validate()
    }
}

/// 由整理好的長表繪製生長曲線
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct PlotJob {
    pub data: String,

    #[cfg_attr(feature = "cli", arg(long))]
    pub y: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = TIME_HR))]
    #[serde(default = "default_time_column")]
    pub x: String,

    #[cfg_attr(feature = "cli", arg(long))]
    #[serde(default)]
    pub color_by: Option<String>,

    #[cfg_attr(feature = "cli", arg(long))]
    #[serde(default)]
    pub plot_by: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, value_delimiter = ','))]
    #[serde(default)]
    pub palette: Option<Vec<String>>,

    #[cfg_attr(feature = "cli", arg(long, default_value = "growth_curves"))]
    #[serde(default = "default_plot_name")]
    pub name: String,

    #[cfg_attr(feature = "cli", arg(long, default_value_t = 600))]
    #[serde(default = "default_width")]
    pub width: u32,

    #[cfg_attr(feature = "cli", arg(long, default_value_t = 400))]
    #[serde(default = "default_height")]
    pub height: u32,

    #[cfg_attr(feature = "cli", command(flatten))]
    #[serde(flatten)]
    pub output: OutputConfig,
}

fn default_width() -> u32 {
    600
}

fn default_height() -> u32 {
    400
}

impl Validate for PlotJob {
    fn validate(&self) -> Result<()> {
        validate_file_extensions("data", std::slice::from_ref(&self.data), INPUT_EXTENSIONS)?;
        validate_non_empty_string("y", &self.y)?;
        validate_non_empty_string("x", &self.x)?;
        validate_non_empty_string("name", &self.name)?;
        validate_range("width", self.width, 50, 4000)?;
        validate_range("height", self.height, 50, 4000)?;
        if let Some(palette) = &self.palette {
            if palette.is_empty() {
                return Err(DknError::InvalidConfigValueError {
                    field: "palette".to_string(),
                    value: String::new(),
                    reason: "Palette must contain at least one color".to_string(),
                });
            }
            for color in palette {
                validate_non_empty_string("palette", color)?;
            }
        }
        self.output.validate()
    }
}

fn validate_delimiter(delimiter: &str) -> Result<()> {
    if delimiter.is_empty() {
        return Err(DknError::InvalidConfigValueError {
            field: "delimiter".to_string(),
            value: delimiter.to_string(),
            reason: "Delimiter cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// 一個工作；TOML 中以 `kind` 區分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSpec {
    Tecan(GrowthJob),
    Biotek(GrowthJob),
    Condmap(ConditionMapJob),
    Kinetics(KineticsJob),
    Imaris(ImarisJob),
    Plot(PlotJob),
}

impl JobSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            JobSpec::Tecan(_) => "tecan",
            JobSpec::Biotek(_) => "biotek",
            JobSpec::Condmap(_) => "condmap",
            JobSpec::Kinetics(_) => "kinetics",
            JobSpec::Imaris(_) => "imaris",
            JobSpec::Plot(_) => "plot",
        }
    }

    pub fn output(&self) -> &OutputConfig {
        match self {
            JobSpec::Tecan(job) | JobSpec::Biotek(job) => &job.output,
            JobSpec::Condmap(job) => &job.output,
            JobSpec::Kinetics(job) => &job.output,
            JobSpec::Imaris(job) => &job.output,
            JobSpec::Plot(job) => &job.output,
        }
    }

    pub fn output_mut(&mut self) -> &mut OutputConfig {
        match self {
            JobSpec::Tecan(job) | JobSpec::Biotek(job) => &mut job.output,
            JobSpec::Condmap(job) => &mut job.output,
            JobSpec::Kinetics(job) => &mut job.output,
            JobSpec::Imaris(job) => &mut job.output,
            JobSpec::Plot(job) => &mut job.output,
        }
    }
}

impl Validate for JobSpec {
    fn validate(&self) -> Result<()> {
        match self {
            JobSpec::Tecan(job) => job.validate(),
            JobSpec::Biotek(job) => {
                if job.verbose_legend {
                    return Err(DknError::InvalidConfigValueError {
                        field: "verbose_legend".to_string(),
                        value: "true".to_string(),
                        reason: "Verbose legends are only supported for Tecan condition maps"
                            .to_string(),
                    });
                }
                job.validate()
            }
            JobSpec::Condmap(job) => job.validate(),
            JobSpec::Kinetics(job) => job.validate(),
            JobSpec::Imaris(job) => job.validate(),
            JobSpec::Plot(job) => job.validate(),
        }
    }
}
