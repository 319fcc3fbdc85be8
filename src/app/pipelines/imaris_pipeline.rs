use crate::app::output::write_outputs;
use crate::config::ImarisJob;
use crate::core::imaris::{aggregate, image_label, parse_statistics_csv, ImageStatistics, STATISTICS_FILES};
use crate::core::{NamedTable, Pipeline, Storage, TransformResult};
use crate::utils::error::{DknError, Result};
use std::path::Path;

pub const STATISTICS_TABLE: &str = "SYTO9_PI_statistics";

pub struct ImarisPipeline<S: Storage> {
    storage: S,
    job: ImarisJob,
}

impl<S: Storage> ImarisPipeline<S> {
    pub fn new(storage: S, job: ImarisJob) -> Self {
        Self { storage, job }
    }

    /// 要處理的 (影像名稱, 資料夾路徑)
    async fn image_folders(&self) -> Result<Vec<(String, String)>> {
        let folder = self.job.folder.trim_end_matches('/');
        if self.job.single_image {
            let base = Path::new(folder)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or(folder);
            return Ok(vec![(image_label(base), folder.to_string())]);
        }

        let folders: Vec<(String, String)> = self
            .storage
            .list_dir(folder)
            .await?
            .into_iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| (image_label(&entry.name), format!("{}/{}", folder, entry.name)))
            .collect();

        if folders.is_empty() {
            return Err(DknError::ValidationError {
                message: format!("No image folders found in '{}'", folder),
            });
        }
        Ok(folders)
    }

    async fn read_image(&self, label: String, path: &str) -> Result<ImageStatistics> {
        let files: Vec<String> = self
            .storage
            .list_dir(path)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| entry.name)
            .collect();

        let mut tables = Vec::with_capacity(STATISTICS_FILES.len());
        for file in &STATISTICS_FILES {
            let pattern = glob::Pattern::new(file.pattern)?;
            let name = files
                .iter()
                .find(|name| pattern.matches(name))
                .ok_or_else(|| DknError::ValidationError {
                    message: format!("No file matching '{}' in '{}'", file.pattern, path),
                })?;

            tracing::debug!("Reading {}/{}", path, name);
            let data = self.storage.read_file(&format!("{}/{}", path, name)).await?;
            tables.push(parse_statistics_csv(&data)?);
        }

        Ok(ImageStatistics { label, tables })
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ImarisPipeline<S> {
    type Raw = Vec<ImageStatistics>;

    fn name(&self) -> &str {
        "imaris"
    }

    async fn extract(&self) -> Result<Vec<ImageStatistics>> {
        let folders = self.image_folders().await?;
        tracing::info!("Reading statistics for {} image(s)", folders.len());

        let mut images = Vec::with_capacity(folders.len());
        for (label, path) in folders {
            images.push(self.read_image(label, &path).await?);
        }
        Ok(images)
    }

    async fn transform(&self, raw: Vec<ImageStatistics>) -> Result<TransformResult> {
        let table = aggregate(&raw)?;
        let labels: Vec<&str> = raw.iter().map(|image| image.label.as_str()).collect();

        let summary = serde_json::json!({
            "images": labels,
            "objects": table.len(),
        });
        Ok(TransformResult {
            tables: vec![NamedTable::new(STATISTICS_TABLE, table)],
            figures: Vec::new(),
            summary,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        write_outputs(&self.storage, &self.job.output, self.name(), &result).await
    }
}
