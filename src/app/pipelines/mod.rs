pub mod condition_map_pipeline;
pub mod growth_pipeline;
pub mod imaris_pipeline;
pub mod kinetics_pipeline;
pub mod plot_pipeline;

pub use condition_map_pipeline::ConditionMapPipeline;
pub use growth_pipeline::GrowthPipeline;
pub use imaris_pipeline::ImarisPipeline;
pub use kinetics_pipeline::KineticsPipeline;
pub use plot_pipeline::PlotPipeline;

#[cfg(test)]
pub(crate) mod tests {
    use crate::core::{DirEntry, Storage};
    use crate::utils::error::{DknError, Result};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// 記憶體中的檔案系統，鍵為以 `/` 分隔的路徑
    #[derive(Clone, Default)]
    pub struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
            self.files.lock().await.insert(path.to_string(), data.into());
        }

        pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }

        pub async fn paths(&self) -> Vec<String> {
            let mut paths: Vec<String> = self.files.lock().await.keys().cloned().collect();
            paths.sort();
            paths
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.get(path).await.ok_or_else(|| {
                DknError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.insert(path, data).await;
            Ok(())
        }

        async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
            let prefix = format!("{}/", path.trim_end_matches('/'));
            let files = self.files.lock().await;
            let entries: BTreeSet<DirEntry> = files
                .keys()
                .filter_map(|key| key.strip_prefix(&prefix))
                .map(|rest| match rest.split_once('/') {
                    Some((dir, _)) => DirEntry {
                        name: dir.to_string(),
                        is_dir: true,
                    },
                    None => DirEntry {
                        name: rest.to_string(),
                        is_dir: false,
                    },
                })
                .collect();

            if entries.is_empty() {
                return Err(DknError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} is not a directory", path),
                )));
            }
            Ok(entries.into_iter().collect())
        }
    }
}
