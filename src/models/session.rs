use crate::models::draft::DraftProgress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// 会话模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Manual,
    Batch,
}

impl SessionMode {
    pub const ALL: [SessionMode; 2] = [SessionMode::Manual, SessionMode::Batch];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Manual => "manual",
            SessionMode::Batch => "batch",
        }
    }

    /// 另一种模式
    pub fn other(self) -> SessionMode {
        match self {
            SessionMode::Manual => SessionMode::Batch,
            SessionMode::Batch => SessionMode::Manual,
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 模式相关的附加数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    /// 手动模式：每个阶段产出的数据，key 为阶段编号
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub step_data: BTreeMap<String, JsonValue>,
    /// 手动模式：第 4 步的草稿进度
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftProgress>,
    /// 手动模式：已选择的图片
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_images: Vec<String>,
    /// 批量模式：上传的文件名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// 批量模式：关键词组总数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_keywords: Option<u32>,
}

impl SessionPayload {
    /// 合并另一个 payload，已有的阶段数据不会被删除
    pub fn merge(&mut self, other: SessionPayload) {
        self.step_data.extend(other.step_data);
        if other.draft.is_some() {
            self.draft = other.draft;
        }
        if !other.selected_images.is_empty() {
            self.selected_images = other.selected_images;
        }
        if other.filename.is_some() {
            self.filename = other.filename;
        }
        if other.total_keywords.is_some() {
            self.total_keywords = other.total_keywords;
        }
    }
}

/// 持久化的会话记录，每种模式最多一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub mode: SessionMode,
    /// 手动模式为关键词组 ID，批量模式为任务 ID
    pub primary_id: String,
    /// 手动模式的阶段编号（1-6）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<u8>,
    /// 批量模式的任务状态
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub payload: SessionPayload,
    /// 由存储层在保存时写入
    pub saved_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn manual(keyword_set_id: impl Into<String>, stage: u8, payload: SessionPayload) -> Self {
        Self {
            mode: SessionMode::Manual,
            primary_id: keyword_set_id.into(),
            stage: Some(stage),
            status: None,
            payload,
            saved_at: Utc::now(),
        }
    }

    pub fn batch(job_id: impl Into<String>, status: impl Into<String>, payload: SessionPayload) -> Self {
        Self {
            mode: SessionMode::Batch,
            primary_id: job_id.into(),
            stage: None,
            status: Some(status.into()),
            payload,
            saved_at: Utc::now(),
        }
    }
}
