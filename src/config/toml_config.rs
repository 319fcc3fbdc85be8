use crate::config::job::JobSpec;
use crate::utils::error::{DknError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 批次執行檔：`[run]`、`[global]` 與多個 `[[jobs]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub run: RunInfo,
    pub global: Option<GlobalConfig>,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// 相對路徑的基準目錄
    pub working_directory: Option<String>,
    pub monitoring: Option<bool>,
}

impl RunConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DknError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})；未定義的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| DknError::processing(format!("Invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn working_directory(&self) -> Option<&str> {
        self.global
            .as_ref()
            .and_then(|g| g.working_directory.as_deref())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.global
            .as_ref()
            .and_then(|g| g.monitoring)
            .unwrap_or(false)
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("run.name", &self.run.name)?;

        if let Some(dir) = self.working_directory() {
            validate_path("global.working_directory", dir)?;
        }

        if self.jobs.is_empty() {
            return Err(DknError::MissingConfigError {
                field: "jobs".to_string(),
            });
        }

        for (i, job) in self.jobs.iter().enumerate() {
            job.validate().map_err(|e| match e {
                DknError::InvalidConfigValueError {
                    field,
                    value,
                    reason,
                } => DknError::InvalidConfigValueError {
                    field: format!("jobs[{}].{}", i, field),
                    value,
                    reason,
                },
                other => other,
            })?;
        }

        // 每個工作都會寫 manifest.json，輸出目錄不可共用
        let mut used: HashMap<String, usize> = HashMap::new();
        for (i, job) in self.jobs.iter().enumerate() {
            let output_path = &job.output().output_path;
            if let Some(first) = used.insert(normalize_dir(output_path), i) {
                return Err(DknError::InvalidConfigValueError {
                    field: format!("jobs[{}].output_path", i),
                    value: output_path.clone(),
                    reason: format!(
                        "Already used by jobs[{}]; give each job its own output directory",
                        first
                    ),
                });
            }
        }
        Ok(())
    }
}

fn normalize_dir(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    trimmed.strip_prefix("./").unwrap_or(trimmed).to_string()
}
