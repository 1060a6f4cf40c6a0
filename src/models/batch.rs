use serde::{Deserialize, Serialize};

/// 批量任务整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    CompletedSuccessfully,
    CompletedWithErrors,
    Failed,
    /// 服务端的其他中间状态（如 starting），按非终态处理
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// 终态：之后不会再有任何状态变化
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::CompletedSuccessfully | JobStatus::CompletedWithErrors | JobStatus::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::CompletedSuccessfully => "completed_successfully",
            JobStatus::CompletedWithErrors => "completed_with_errors",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个关键词组在批量任务中的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    Processing,
    Success,
    Failed,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Success => "success",
            ItemStatus::Failed => "failed",
        }
    }
}

/// 批量任务中单个条目的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub main_keyword: String,
    #[serde(default)]
    pub status: ItemStatus,
    /// 仅 success 时存在（服务端字段名 keyword_id）
    #[serde(rename = "keyword_id", default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    /// 仅 failed 时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
}

impl BatchItemResult {
    /// 条目的完成或失败时间
    pub fn timestamp(&self) -> Option<&str> {
        self.completed_at
            .as_deref()
            .or(self.failed_at.as_deref())
    }

    /// 只有成功的条目才允许预览和下载
    pub fn is_downloadable(&self) -> bool {
        self.status == ItemStatus::Success && self.artifact_id.is_some()
    }
}

/// 批量任务状态（`get batch status` 的响应）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    /// 内存中的任务状态不带 job_id，由调用方补齐
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub total_keywords: u32,
    pub status: JobStatus,
    #[serde(rename = "processed", default)]
    pub processed_count: u32,
    #[serde(rename = "failed", default)]
    pub failed_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_keyword: Option<String>,
    /// 服务端计算的进度，客户端原样展示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub results: Vec<BatchItemResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchJob {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 当前正在处理的关键词，仅在 processing 状态下有意义
    pub fn active_keyword(&self) -> Option<&str> {
        if self.status != JobStatus::Processing {
            return None;
        }
        self.current_keyword
            .as_deref()
            .filter(|k| !k.is_empty())
    }

    /// processed + failed 不能超过 total
    pub fn counts_consistent(&self) -> bool {
        self.processed_count as u64 + self.failed_count as u64 <= self.total_keywords as u64
    }

    /// 展示用的进度百分比，缺省为 0
    pub fn progress(&self) -> f64 {
        self.progress_percentage.unwrap_or(0.0)
    }
}

/// 上传批量文件的响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpload {
    pub job_id: String,
    pub total_keywords: u32,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::CompletedSuccessfully.is_terminal());
        assert!(JobStatus::CompletedWithErrors.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_deserialize_status_response() {
        let json = r#"{
            "status": "processing",
            "total_keywords": 3,
            "processed": 1,
            "failed": 0,
            "current_keyword": "MIG Welding Technology",
            "progress_percentage": 33.33,
            "results": [
                {"main_keyword": "Automated Welding", "keyword_id": "abc", "status": "success", "completed_at": "2024-03-13T10:00:00"}
            ],
            "error": null,
            "updated_at": "2024-03-13T10:00:01"
        }"#;
        let job: BatchJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.active_keyword(), Some("MIG Welding Technology"));
        assert_eq!(job.progress(), 33.33);
        assert!(job.results[0].is_downloadable());
        assert!(job.counts_consistent());
    }

    #[test]
    fn test_unknown_status_is_not_terminal() {
        let job: BatchJob =
            serde_json::from_str(r#"{"status": "starting", "total_keywords": 2}"#).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_current_keyword_ignored_outside_processing() {
        let job: BatchJob = serde_json::from_str(
            r#"{"status": "completed_successfully", "total_keywords": 1, "processed": 1, "current_keyword": "x"}"#,
        )
        .unwrap();
        assert_eq!(job.active_keyword(), None);
    }

    #[test]
    fn test_counts_inconsistent() {
        let job: BatchJob = serde_json::from_str(
            r#"{"status": "processing", "total_keywords": 2, "processed": 2, "failed": 1}"#,
        )
        .unwrap();
        assert!(!job.counts_consistent());
    }
}
