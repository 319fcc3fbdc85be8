use thiserror::Error;

#[derive(Error, Debug)]
pub enum DknError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid file pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    #[cfg(feature = "excel")]
    #[error("Workbook error: {0}")]
    WorkbookError(#[from] calamine::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Column '{column}' not found in {context}")]
    MissingColumnError { column: String, context: String },

    #[error("Improper time format '{value}': {reason}")]
    TimeFormatError { value: String, reason: String },

    #[error("Unexpected sheet layout: {message}")]
    LayoutError { message: String },

    #[error("Condition map error: {message}")]
    ConditionMapError { message: String },

    #[error("Curve fit failed: {message}")]
    FitError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, DknError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Data,
    Analysis,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DknError {
    pub fn processing(message: impl Into<String>) -> Self {
        DknError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn layout(message: impl Into<String>) -> Self {
        DknError::LayoutError {
            message: message.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>, context: impl Into<String>) -> Self {
        DknError::MissingColumnError {
            column: column.into(),
            context: context.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DknError::ConfigValidationError { .. }
            | DknError::InvalidConfigValueError { .. }
            | DknError::MissingConfigError { .. }
            | DknError::PatternError(_) => ErrorCategory::Configuration,
            DknError::CsvError(_) | DknError::LayoutError { .. } => ErrorCategory::Input,
            #[cfg(feature = "excel")]
            DknError::WorkbookError(_) => ErrorCategory::Input,
            DknError::MissingColumnError { .. }
            | DknError::TimeFormatError { .. }
            | DknError::ConditionMapError { .. }
            | DknError::ValidationError { .. }
            | DknError::ProcessingError { .. } => ErrorCategory::Data,
            DknError::FitError { .. } => ErrorCategory::Analysis,
            DknError::IoError(_)
            | DknError::ZipError(_)
            | DknError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            // 擬合失敗通常換一組數據或參數即可重試
            ErrorCategory::Analysis => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DknError::ConfigValidationError { .. } | DknError::InvalidConfigValueError { .. } => {
                "Check the command line arguments or the run file against the documented options"
            }
            DknError::MissingConfigError { .. } => "Provide the missing option and try again",
            DknError::PatternError(_) => "Avoid unbalanced brackets in folder names",
            DknError::MissingColumnError { .. } => {
                "Column names must match the export exactly, including units and spacing"
            }
            DknError::TimeFormatError { .. } => {
                "Verify that all time points are in the format hours:minutes:seconds"
            }
            DknError::LayoutError { .. } | DknError::CsvError(_) => {
                "Make sure the file is an unmodified export from the instrument software"
            }
            #[cfg(feature = "excel")]
            DknError::WorkbookError(_) => {
                "Make sure the workbook opens in a spreadsheet program, or export it as CSV"
            }
            DknError::ConditionMapError { .. } => {
                "Fill out the condition map template and keep the descriptor format consistent across wells"
            }
            DknError::FitError { .. } => {
                "Check that substrate concentrations span the saturation range and rates are non-zero"
            }
            DknError::ProcessingError { .. } | DknError::ValidationError { .. } => {
                "Inspect the input data for unexpected values"
            }
            DknError::IoError(_) => "Check that the paths exist and are readable/writable",
            DknError::ZipError(_) | DknError::SerializationError(_) => {
                "Retry the run; if it fails again, report the error"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Could not read input: {}", self),
            ErrorCategory::Data => format!("Problem in the data: {}", self),
            ErrorCategory::Analysis => format!("Analysis failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// CLI 依嚴重程度回傳的退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}
