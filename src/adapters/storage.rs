use crate::domain::ports::{DirEntry, Storage};
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// 以本機目錄為根的存儲
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        // 絕對路徑會取代根目錄
        self.base_path.join(path)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        tracing::debug!("Reading {}", full_path.display());
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        storage.write_file("out/nested/a.csv", b"x\n1\n").await.unwrap();
        let data = storage.read_file("out/nested/a.csv").await.unwrap();
        assert_eq!(data, b"x\n1\n");
    }

    #[tokio::test]
    async fn test_list_dir_is_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        storage.write_file("b.csv", b"").await.unwrap();
        storage.write_file("a/inner.csv", b"").await.unwrap();

        let entries = storage.list_dir("").await.unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry {
                    name: "a".to_string(),
                    is_dir: true
                },
                DirEntry {
                    name: "b.csv".to_string(),
                    is_dir: false
                },
            ]
        );
    }
}
