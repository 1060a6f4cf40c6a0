//! 会话存储 - 基础设施层
//!
//! 每种模式（manual / batch）最多保存一条会话记录，每条记录是会话目录下的一个 JSON 文件。
//! 每次 `load` 都会检查有效期，过期或损坏的记录会被直接删除并视为不存在。

use crate::config::Config;
use crate::error::{AppResult, SessionError};
use crate::models::{SessionMode, SessionPayload, SessionRecord};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 时间来源，测试中可以替换
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// 会话存储
///
/// 职责：
/// - 持有会话目录
/// - 提供 save / load / clear 能力
/// - 不关心流程阶段的含义
#[derive(Clone)]
pub struct SessionStore {
    dir: PathBuf,
    ttl: chrono::Duration,
    clock: Clock,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("dir", &self.dir)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionStore {
    /// 创建新的会话存储
    pub fn new(dir: impl Into<PathBuf>, ttl: chrono::Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.session_path(), config.session_ttl())
    }

    /// 替换时间来源
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn path_for(&self, mode: SessionMode) -> PathBuf {
        self.dir.join(format!("{}.json", mode.as_str()))
    }

    /// 保存（覆盖）会话记录，写入时间戳
    ///
    /// 先写临时文件再重命名，避免写到一半的文件被下次读取
    pub fn save(&self, mut record: SessionRecord) -> AppResult<SessionRecord> {
        record.saved_at = self.now();

        let path = self.path_for(record.mode);
        let tmp_path = self.dir.join(format!(".{}.json.tmp", record.mode.as_str()));
        let content = serde_json::to_string_pretty(&record)
            .map_err(|source| SessionError::SerializeFailed { source })?;

        fs::create_dir_all(&self.dir).map_err(|source| SessionError::WriteFailed {
            path: self.dir.display().to_string(),
            source,
        })?;
        fs::write(&tmp_path, content).map_err(|source| SessionError::WriteFailed {
            path: tmp_path.display().to_string(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| SessionError::WriteFailed {
            path: path.display().to_string(),
            source,
        })?;

        debug!(
            "💾 会话已保存: mode={} id={} stage={:?} status={:?}",
            record.mode, record.primary_id, record.stage, record.status
        );
        Ok(record)
    }

    /// 读取会话记录
    ///
    /// 过期、损坏或模式不匹配的记录会被删除并返回 None，不会向上抛出错误
    pub fn load(&self, mode: SessionMode) -> Option<SessionRecord> {
        let path = self.path_for(mode);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("⚠️ 读取 {} 会话失败，已丢弃: {}", mode, e);
                self.purge(mode);
                return None;
            }
        };

        let record: SessionRecord = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!("⚠️ {} 会话数据损坏，已丢弃: {}", mode, e);
                self.purge(mode);
                return None;
            }
        };

        if record.mode != mode {
            warn!(
                "⚠️ {} 会话文件中的模式为 {}，已丢弃",
                mode, record.mode
            );
            self.purge(mode);
            return None;
        }

        if self.now() - record.saved_at >= self.ttl {
            info!(
                "⌛ {} 会话已过期 (保存于 {})，已清除",
                mode,
                record.saved_at.format("%Y-%m-%d %H:%M:%S")
            );
            self.purge(mode);
            return None;
        }

        Some(record)
    }

    /// 删除指定模式的会话
    pub fn clear(&self, mode: SessionMode) -> AppResult<()> {
        let path = self.path_for(mode);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("🗑️ 已清除 {} 会话", mode);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::DeleteFailed {
                path: path.display().to_string(),
                source,
            }
            .into()),
        }
    }

    /// 删除全部会话
    pub fn clear_all(&self) -> AppResult<()> {
        for mode in SessionMode::ALL {
            self.clear(mode)?;
        }
        Ok(())
    }

    /// 当前最近保存的会话，用于决定启动时恢复到哪种模式
    pub fn active_session(&self) -> Option<SessionRecord> {
        let manual = self.load(SessionMode::Manual);
        let batch = self.load(SessionMode::Batch);

        match (manual, batch) {
            (Some(m), Some(b)) => Some(if m.saved_at > b.saved_at { m } else { b }),
            (m, b) => m.or(b),
        }
    }

    /// 更新手动模式的阶段，合并该阶段产出的数据
    ///
    /// 若已有记录属于另一个关键词组，则从空 payload 开始
    pub fn update_manual_step(
        &self,
        keyword_set_id: &str,
        stage: u8,
        payload: SessionPayload,
    ) -> AppResult<SessionRecord> {
        let mut merged = self
            .load(SessionMode::Manual)
            .filter(|r| r.primary_id == keyword_set_id)
            .map(|r| r.payload)
            .unwrap_or_default();
        merged.merge(payload);

        self.save(SessionRecord::manual(keyword_set_id, stage, merged))
    }

    /// 更新批量模式的任务状态，保留已有的文件名等信息
    pub fn update_batch_status(&self, job_id: &str, status: &str) -> AppResult<SessionRecord> {
        let payload = self
            .load(SessionMode::Batch)
            .filter(|r| r.primary_id == job_id)
            .map(|r| r.payload)
            .unwrap_or_default();

        self.save(SessionRecord::batch(job_id, status, payload))
    }

    /// 尽力删除，失败只记录日志
    fn purge(&self, mode: SessionMode) {
        if let Err(e) = self.clear(mode) {
            warn!("⚠️ 删除 {} 会话失败: {}", mode, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// 可手动拨动的时钟
    fn manual_clock(start: DateTime<Utc>) -> (Clock, Arc<Mutex<DateTime<Utc>>>) {
        let now = Arc::new(Mutex::new(start));
        let handle = now.clone();
        let clock: Clock = Arc::new(move || *handle.lock().unwrap());
        (clock, now)
    }

    fn store_in(dir: &Path) -> (SessionStore, Arc<Mutex<DateTime<Utc>>>) {
        let (clock, now) = manual_clock(Utc::now());
        let store = SessionStore::new(dir, chrono::Duration::hours(24)).with_clock(clock);
        (store, now)
    }

    #[test]
    fn test_round_trip_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let (store, now) = store_in(dir.path());

        store
            .save(SessionRecord::manual("kw-1", 2, SessionPayload::default()))
            .unwrap();
        *now.lock().unwrap() += chrono::Duration::hours(23);

        let loaded = store.load(SessionMode::Manual).unwrap();
        assert_eq!(loaded.mode, SessionMode::Manual);
        assert_eq!(loaded.primary_id, "kw-1");
        assert_eq!(loaded.stage, Some(2));
    }

    #[test]
    fn test_expired_record_is_purged() {
        let dir = tempfile::tempdir().unwrap();
        let (store, now) = store_in(dir.path());

        store
            .save(SessionRecord::manual("kw-1", 3, SessionPayload::default()))
            .unwrap();
        *now.lock().unwrap() += chrono::Duration::hours(24);

        assert!(store.load(SessionMode::Manual).is_none());
        // 不留下任何残余文件
        assert!(!dir.path().join("manual.json").exists());
    }

    #[test]
    fn test_corrupt_record_is_purged() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        fs::write(dir.path().join("batch.json"), "{not json").unwrap();

        assert!(store.load(SessionMode::Batch).is_none());
        assert!(!dir.path().join("batch.json").exists());
    }

    #[test]
    fn test_mode_mismatch_is_treated_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        let record = SessionRecord::batch("job-1", "started", SessionPayload::default());
        fs::write(
            dir.path().join("manual.json"),
            serde_json::to_string(&record).unwrap(),
        )
        .unwrap();

        assert!(store.load(SessionMode::Manual).is_none());
        assert!(!dir.path().join("manual.json").exists());
    }

    #[test]
    fn test_modes_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        store
            .save(SessionRecord::manual("kw-1", 2, SessionPayload::default()))
            .unwrap();
        store
            .save(SessionRecord::batch("job-1", "started", SessionPayload::default()))
            .unwrap();
        store.clear(SessionMode::Batch).unwrap();

        assert!(store.load(SessionMode::Batch).is_none());
        assert_eq!(store.load(SessionMode::Manual).unwrap().primary_id, "kw-1");
    }

    #[test]
    fn test_clear_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());
        assert!(store.clear(SessionMode::Manual).is_ok());
        assert!(store.clear_all().is_ok());
    }

    #[test]
    fn test_active_session_picks_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let (store, now) = store_in(dir.path());

        assert!(store.active_session().is_none());

        store
            .save(SessionRecord::batch("job-1", "started", SessionPayload::default()))
            .unwrap();
        *now.lock().unwrap() += chrono::Duration::minutes(5);
        store
            .save(SessionRecord::manual("kw-1", 4, SessionPayload::default()))
            .unwrap();

        let active = store.active_session().unwrap();
        assert_eq!(active.mode, SessionMode::Manual);

        *now.lock().unwrap() += chrono::Duration::minutes(5);
        store.update_batch_status("job-1", "processing").unwrap();
        assert_eq!(store.active_session().unwrap().mode, SessionMode::Batch);
    }

    #[test]
    fn test_update_manual_step_merges_payload() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        let mut first = SessionPayload::default();
        first.step_data.insert("2".to_string(), json!({"total_results": 5}));
        store.update_manual_step("kw-1", 3, first).unwrap();

        let mut second = SessionPayload::default();
        second.step_data.insert("3".to_string(), json!({"total_images": 9}));
        let record = store.update_manual_step("kw-1", 4, second).unwrap();

        assert_eq!(record.stage, Some(4));
        assert_eq!(record.payload.step_data.len(), 2);

        // 换了关键词组则不继承旧数据
        let record = store
            .update_manual_step("kw-2", 2, SessionPayload::default())
            .unwrap();
        assert!(record.payload.step_data.is_empty());
    }

    #[test]
    fn test_update_batch_status_keeps_payload() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = store_in(dir.path());

        store
            .save(SessionRecord::batch(
                "job-1",
                "started",
                SessionPayload {
                    filename: Some("keywords.xlsx".to_string()),
                    total_keywords: Some(10),
                    ..Default::default()
                },
            ))
            .unwrap();

        let record = store
            .update_batch_status("job-1", "completed_with_errors")
            .unwrap();
        assert_eq!(record.status.as_deref(), Some("completed_with_errors"));
        assert_eq!(record.payload.filename.as_deref(), Some("keywords.xlsx"));
        assert_eq!(record.payload.total_keywords, Some(10));
    }
}
