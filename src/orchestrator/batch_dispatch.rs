//! 批量上传与分发 - 编排层
//!
//! 负责批量模式中"提交一个表格、恢复一个任务、操作单个条目"，轮询交给 `batch_monitor`。

use crate::error::{AppError, AppResult, ValidationError, WorkflowError};
use crate::infrastructure::SessionStore;
use crate::models::{
    BatchItemResult, BatchJob, BatchUpload, BlogPreview, OutputFormat, SessionMode,
    SessionPayload, SessionRecord,
};
use crate::orchestrator::batch_monitor::BatchMonitor;
use crate::services::ContentService;
use crate::workflow::Confirmer;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 允许上传的表格扩展名
const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// 批量历史最多展示的任务数
pub const MAX_LISTED_JOBS: usize = 20;

/// 校验上传文件
///
/// 扩展名必须是 .xlsx / .xls（不区分大小写），且文件存在
///
/// # 返回
/// 文件名
pub fn validate_spreadsheet(path: &Path) -> Result<String, ValidationError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let extension_ok = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.as_str()));
    if !extension_ok {
        return Err(ValidationError::InvalidFileExtension { filename });
    }

    if !path.is_file() {
        return Err(ValidationError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    Ok(filename)
}

/// 恢复批量会话的结果
#[derive(Debug, Clone, PartialEq)]
pub enum BatchResume {
    /// 没有批量会话
    Fresh,
    /// 任务仍存在；确认请求失败时 `job` 为 None，沿用本地记录
    Resumed {
        record: SessionRecord,
        job: Option<BatchJob>,
    },
    /// 服务端已没有该任务，会话已清除，回到上传页
    SoftReset,
}

/// 批量分发器
pub struct BatchDispatcher {
    service: Arc<dyn ContentService>,
    store: SessionStore,
}

impl BatchDispatcher {
    pub fn new(service: Arc<dyn ContentService>, store: SessionStore) -> Self {
        Self { service, store }
    }

    /// 当前批量会话
    pub fn current(&self) -> Option<SessionRecord> {
        self.store.load(SessionMode::Batch)
    }

    /// 上传表格并立即写入批量会话（status=started）
    ///
    /// 文件校验失败时不会发出任何远程请求，也不会写入会话
    pub async fn upload(&mut self, path: &Path) -> AppResult<BatchUpload> {
        let filename = validate_spreadsheet(path)?;

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        info!("📤 上传 {}（{} 字节）", filename, content.len());
        let upload = self.service.upload_batch(&filename, content).await?;
        info!(
            "✓ 批量任务已创建: {}（{} 个关键词组）",
            upload.job_id, upload.total_keywords
        );

        let record = SessionRecord::batch(
            &upload.job_id,
            "started",
            SessionPayload {
                filename: Some(filename),
                total_keywords: Some(upload.total_keywords),
                ..Default::default()
            },
        );
        if let Err(e) = self.store.save(record) {
            warn!("⚠️ 保存批量会话失败: {}", e);
        }

        Ok(upload)
    }

    /// 恢复批量会话，向服务端确认一次任务是否存在
    pub async fn resume(&self) -> AppResult<BatchResume> {
        let Some(record) = self.store.load(SessionMode::Batch) else {
            return Ok(BatchResume::Fresh);
        };

        match self.service.get_batch_status(&record.primary_id).await {
            Ok(job) => {
                info!("🔄 恢复批量任务 {}: {}", record.primary_id, job.status);
                let record = self
                    .store
                    .update_batch_status(&record.primary_id, job.status.as_str())
                    .unwrap_or(record);
                Ok(BatchResume::Resumed {
                    record,
                    job: Some(job),
                })
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    "⚠️ 批量任务 {} 已不存在，会话已重置: {}",
                    record.primary_id, e
                );
                self.store.clear(SessionMode::Batch)?;
                Ok(BatchResume::SoftReset)
            }
            Err(e) => {
                warn!(
                    "⚠️ 无法确认批量任务 {}，继续使用本地会话: {}",
                    record.primary_id, e
                );
                Ok(BatchResume::Resumed { record, job: None })
            }
        }
    }

    /// 最近的批量任务
    pub async fn list_jobs(&self) -> AppResult<Vec<BatchJob>> {
        let mut jobs = self.service.list_batch_jobs().await?;
        jobs.truncate(MAX_LISTED_JOBS);
        Ok(jobs)
    }

    /// 当前任务的监控器，轮询结果会写回批量会话
    pub fn monitor(&self, job_id: &str, poll_interval: Duration) -> BatchMonitor {
        BatchMonitor::new(self.service.clone(), job_id, poll_interval).with_store(self.store.clone())
    }

    /// 预览单个条目，仅限成功的条目
    pub async fn preview(&self, item: &BatchItemResult) -> AppResult<BlogPreview> {
        let id = Self::ready_id(item)?;
        self.service.preview_batch_item(id).await
    }

    /// 下载单个条目，仅限成功的条目
    pub async fn download(
        &self,
        item: &BatchItemResult,
        format: OutputFormat,
    ) -> AppResult<Vec<u8>> {
        let id = Self::ready_id(item)?;
        self.service.download_batch_item(id, format).await
    }

    /// 清除批量会话，需要用户确认
    pub fn clear(&self, confirmer: &dyn Confirmer) -> AppResult<bool> {
        if !confirmer.confirm("Clear the current batch session and upload a new file?") {
            return Ok(false);
        }
        self.store.clear(SessionMode::Batch)?;
        info!("🗑️ 批量会话已清除");
        Ok(true)
    }

    fn ready_id(item: &BatchItemResult) -> AppResult<&str> {
        match item.artifact_id.as_deref() {
            Some(id) if item.is_downloadable() => Ok(id),
            _ => Err(WorkflowError::ItemNotReady {
                keyword: item.main_keyword.clone(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemStatus, JobStatus};
    use crate::services::MockContentService;
    use std::fs;

    fn dispatcher_in(dir: &Path) -> (BatchDispatcher, Arc<MockContentService>, SessionStore) {
        let mock = Arc::new(MockContentService::new());
        let store = SessionStore::new(dir.join("sessions"), chrono::Duration::hours(24));
        (
            BatchDispatcher::new(mock.clone(), store.clone()),
            mock,
            store,
        )
    }

    #[test]
    fn test_validate_spreadsheet_extension() {
        let dir = tempfile::tempdir().unwrap();
        let upper = dir.path().join("KEYWORDS.XLSX");
        fs::write(&upper, b"data").unwrap();
        assert_eq!(validate_spreadsheet(&upper).unwrap(), "KEYWORDS.XLSX");

        let xls = dir.path().join("old.xls");
        fs::write(&xls, b"data").unwrap();
        assert!(validate_spreadsheet(&xls).is_ok());

        let csv = dir.path().join("keywords.csv");
        fs::write(&csv, b"data").unwrap();
        assert_eq!(
            validate_spreadsheet(&csv).unwrap_err(),
            ValidationError::InvalidFileExtension {
                filename: "keywords.csv".to_string()
            }
        );

        assert!(matches!(
            validate_spreadsheet(&dir.path().join("missing.xlsx")),
            Err(ValidationError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_writes_started_record() {
        let dir = tempfile::tempdir().unwrap();
        let (mut dispatcher, mock, store) = dispatcher_in(dir.path());
        let file = dir.path().join("keywords.xlsx");
        fs::write(&file, b"fake excel").unwrap();

        let upload = dispatcher.upload(&file).await.unwrap();
        assert_eq!(upload.total_keywords, 10);

        let record = store.load(SessionMode::Batch).unwrap();
        assert_eq!(record.primary_id, upload.job_id);
        assert_eq!(record.status.as_deref(), Some("started"));
        assert_eq!(record.payload.filename.as_deref(), Some("keywords.xlsx"));
        assert_eq!(record.payload.total_keywords, Some(10));
        assert_eq!(mock.call_count("upload_batch"), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut dispatcher, mock, store) = dispatcher_in(dir.path());
        let file = dir.path().join("keywords.xlsx");
        fs::write(&file, b"fake excel").unwrap();

        mock.fail_on("upload_batch");
        assert!(dispatcher.upload(&file).await.is_err());
        assert!(store.load(SessionMode::Batch).is_none());
    }

    #[tokio::test]
    async fn test_resume_soft_reset() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, mock, store) = dispatcher_in(dir.path());
        store
            .save(SessionRecord::batch("job-gone", "started", SessionPayload::default()))
            .unwrap();
        mock.remove_job("job-gone");

        assert_eq!(dispatcher.resume().await.unwrap(), BatchResume::SoftReset);
        assert!(store.load(SessionMode::Batch).is_none());
    }

    #[tokio::test]
    async fn test_resume_existing_job() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, mock, store) = dispatcher_in(dir.path());
        store
            .save(SessionRecord::batch("job-1", "started", SessionPayload::default()))
            .unwrap();
        let mut job = BatchJob {
            job_id: String::new(),
            filename: "keywords.xlsx".to_string(),
            total_keywords: 2,
            status: JobStatus::Processing,
            processed_count: 1,
            failed_count: 0,
            current_keyword: None,
            progress_percentage: Some(50.0),
            results: Vec::new(),
            error: None,
        };
        job.current_keyword = Some("b".to_string());
        mock.script_batch("job-1", vec![job]);

        match dispatcher.resume().await.unwrap() {
            BatchResume::Resumed { record, job } => {
                assert_eq!(record.status.as_deref(), Some("processing"));
                assert_eq!(job.unwrap().job_id, "job-1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_item_actions_only_for_success() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, mock, _) = dispatcher_in(dir.path());

        let failed = BatchItemResult {
            main_keyword: "laser cutting".to_string(),
            status: ItemStatus::Failed,
            artifact_id: None,
            error: Some("scrape failed".to_string()),
            completed_at: None,
            failed_at: None,
        };
        let err = dispatcher.preview(&failed).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Workflow(WorkflowError::ItemNotReady { .. })
        ));
        assert!(dispatcher.download(&failed, OutputFormat::Html).await.is_err());
        assert_eq!(mock.total_calls(), 0);

        let ok = BatchItemResult {
            main_keyword: "robotic welding".to_string(),
            status: ItemStatus::Success,
            artifact_id: Some("kw-9".to_string()),
            error: None,
            completed_at: None,
            failed_at: None,
        };
        let bytes = dispatcher.download(&ok, OutputFormat::Json).await.unwrap();
        assert_eq!(bytes, b"kw-9.json".to_vec());
        assert!(dispatcher.preview(&ok).await.unwrap().ready_for_download);
    }
}
