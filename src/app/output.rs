use crate::core::viz::render_html;
use crate::core::{ConfigProvider, Storage, TransformResult};
use crate::utils::error::{DknError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub job: String,
    pub created_at: String,
    pub files: Vec<String>,
    pub summary: serde_json::Value,
}

/// 表格或圖表名稱轉為安全的檔名
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "output".to_string()
    } else {
        stem
    }
}

fn join(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), file)
    }
}

/// 同一個工作的輸出檔名不可重複，否則後寫的會蓋掉先寫的
fn ensure_unique_names(files: &[(String, Vec<u8>)], bundle: Option<&str>) -> Result<()> {
    let mut seen = HashSet::new();
    let names = files.iter().map(|(name, _)| name.as_str()).chain(bundle);
    for name in names {
        if !seen.insert(name) {
            return Err(DknError::ValidationError {
                message: format!(
                    "Output file '{}' would be written more than once; rename the tables, figures or bundle so every output name is distinct",
                    name
                ),
            });
        }
    }
    Ok(())
}

/// 把轉換結果寫到輸出目錄；回傳目錄或壓縮檔路徑
pub async fn write_outputs<S: Storage, C: ConfigProvider>(
    storage: &S,
    config: &C,
    job: &str,
    result: &TransformResult,
) -> Result<String> {
    let output_dir = config.output_path();
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    for named in &result.tables {
        let stem = file_stem(&named.name);
        for format in config.output_formats() {
            let data = match format.as_str() {
                "csv" => named.table.to_csv()?.into_bytes(),
                "tsv" => named.table.to_tsv()?.into_bytes(),
                "json" => serde_json::to_vec_pretty(&named.table.to_records())?,
                other => {
                    return Err(DknError::InvalidConfigValueError {
                        field: "output_formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported format".to_string(),
                    })
                }
            };
            files.push((format!("{}.{}", stem, format), data));
        }
    }

    for figure in &result.figures {
        let stem = file_stem(&figure.name);
        files.push((
            format!("{}.vl.json", stem),
            serde_json::to_vec_pretty(&figure.spec)?,
        ));
        files.push((
            format!("{}.html", stem),
            render_html(&figure.name, &figure.spec)?.into_bytes(),
        ));
    }

    let manifest = Manifest {
        job: job.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        files: files.iter().map(|(name, _)| name.clone()).collect(),
        summary: result.summary.clone(),
    };
    files.push((
        MANIFEST_FILE.to_string(),
        serde_json::to_vec_pretty(&manifest)?,
    ));
    ensure_unique_names(&files, config.bundle_name())?;

    for (name, data) in &files {
        let path = join(output_dir, name);
        tracing::debug!("Writing {} ({} bytes)", path, data.len());
        storage.write_file(&path, data).await?;
    }

    let Some(bundle) = config.bundle_name() else {
        tracing::info!("📁 Wrote {} files to {}", files.len(), output_dir);
        return Ok(output_dir.to_string());
    };

    let zip_data = {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in &files {
            zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
            zip.write_all(data)?;
        }
        let cursor = zip.finish()?;
        cursor.into_inner()
    };

    let bundle_path = join(output_dir, bundle);
    tracing::debug!("Writing ZIP bundle ({} bytes)", zip_data.len());
    storage.write_file(&bundle_path, &zip_data).await?;
    tracing::info!("📦 Bundle saved: {}", bundle_path);

    Ok(bundle_path)
}
