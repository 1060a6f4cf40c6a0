//! 批量结果导出服务 - 业务能力层
//!
//! 只负责"把批量任务的条目结果写成 CSV"，不关心任务是如何轮询到的

use crate::error::{AppError, AppResult};
use crate::models::BatchJob;
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// 导出的一行，对应任务中的一个关键词组
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub keyword: String,
    pub status: String,
    pub artifact_id: String,
    pub error: String,
    pub timestamp: String,
}

/// 把任务结果展开为导出行，顺序与服务端返回一致
pub fn export_rows(job: &BatchJob) -> Vec<ExportRow> {
    job.results
        .iter()
        .map(|item| ExportRow {
            keyword: item.main_keyword.clone(),
            status: item.status.as_str().to_string(),
            artifact_id: item.artifact_id.clone().unwrap_or_default(),
            error: item.error.clone().unwrap_or_default(),
            timestamp: item.timestamp().unwrap_or_default().to_string(),
        })
        .collect()
}

/// 批量结果导出服务
///
/// 职责：
/// - 把单个任务的结果写成 CSV
/// - 不修改任务状态
pub struct ResultsExporter {
    export_dir: PathBuf,
}

impl ResultsExporter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    /// 导出到 `{export_dir}/batch_{job_id}_{时间}.csv`
    ///
    /// # 返回
    /// 写入的文件路径
    pub fn write_csv(&self, job: &BatchJob) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.export_dir)
            .map_err(|e| AppError::file_write_failed(self.export_dir.display().to_string(), e))?;

        let file_name = format!(
            "batch_{}_{}.csv",
            job.job_id,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.export_dir.join(file_name);
        self.write_to(&path, job)?;

        info!("📄 已导出 {} 条结果到 {}", job.results.len(), path.display());
        Ok(path)
    }

    /// 写入指定文件
    pub fn write_to(&self, path: &Path, job: &BatchJob) -> AppResult<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        write_rows(&mut writer, job)?;
        writer
            .flush()
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        Ok(())
    }

    /// 生成 CSV 文本
    pub fn to_csv_string(job: &BatchJob) -> AppResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        write_rows(&mut writer, job)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Other(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| AppError::Other(e.to_string()))
    }
}

fn write_rows<W: std::io::Write>(writer: &mut csv::Writer<W>, job: &BatchJob) -> AppResult<()> {
    let rows = export_rows(job);
    if rows.is_empty() {
        writer.write_record(["keyword", "status", "artifact_id", "error", "timestamp"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    Ok(())
}
