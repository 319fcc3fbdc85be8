use crate::domain::model::TransformResult;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 目錄項目
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 列出目錄內容，依名稱排序
    fn list_dir(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Vec<DirEntry>>> + Send;
}

/// 輸出設定
pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn bundle_name(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Extract 階段讀出的原始資料
    type Raw: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Self::Raw>;
    async fn transform(&self, raw: Self::Raw) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
