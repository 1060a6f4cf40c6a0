//! 批量任务监控 - 编排层
//!
//! ## 职责
//!
//! 后台定时轮询批量任务状态，直到任务进入终态或被取消。
//!
//! ## 核心功能
//!
//! 1. **定时轮询**：默认每 3 秒一次，第一次立即执行
//! 2. **阶段标签**：把每个条目折叠为 Completed / Failed / Generating… / In Queue / Pending
//! 3. **实时快照**：通过 `watch` 通道发布最新状态
//! 4. **一致性检查**：processed + failed 超过 total 时记录警告
//! 5. **可取消**：`MonitorHandle::cancel()` 或丢弃句柄都会停止轮询
//!
//! 单次轮询失败只记录错误并在下一次继续；任务在服务端消失时停止并清除批量会话。

use crate::error::{AppError, AppResult};
use crate::infrastructure::SessionStore;
use crate::models::{BatchItemResult, BatchJob, ItemStatus, SessionMode};
use crate::services::ContentService;
use crate::utils::logging::print_batch_summary;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// 条目的展示阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStage {
    Completed,
    Failed,
    /// 正在生成
    Active,
    /// 排队中
    Waiting,
    Pending,
}

impl ProcessingStage {
    pub fn label(self) -> &'static str {
        match self {
            ProcessingStage::Completed => "Completed",
            ProcessingStage::Failed => "Failed",
            ProcessingStage::Active => "Generating…",
            ProcessingStage::Waiting => "In Queue",
            ProcessingStage::Pending => "Pending",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStage::Completed => "completed",
            ProcessingStage::Failed => "failed",
            ProcessingStage::Active => "active",
            ProcessingStage::Waiting => "waiting",
            ProcessingStage::Pending => "pending",
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 计算条目的展示阶段
///
/// `active_keyword` 为任务当前正在处理的关键词（仅 processing 状态下存在）。
/// 只有 processing 的条目区分正在生成和排队中，其余都是 Pending。
pub fn derive_stage(item: &BatchItemResult, active_keyword: Option<&str>) -> ProcessingStage {
    let is_current = active_keyword == Some(item.main_keyword.as_str());
    match item.status {
        ItemStatus::Success => ProcessingStage::Completed,
        ItemStatus::Failed => ProcessingStage::Failed,
        ItemStatus::Processing if is_current => ProcessingStage::Active,
        ItemStatus::Processing => ProcessingStage::Waiting,
        ItemStatus::Pending => ProcessingStage::Pending,
    }
}

/// 单个条目的展示数据
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub keyword: String,
    pub status: ItemStatus,
    pub stage: ProcessingStage,
    pub artifact_id: Option<String>,
    pub error: Option<String>,
    /// 只有成功的条目可以预览和下载
    pub downloadable: bool,
}

impl ItemView {
    fn from_item(item: &BatchItemResult, active_keyword: Option<&str>) -> Self {
        Self {
            keyword: item.main_keyword.clone(),
            status: item.status,
            stage: derive_stage(item, active_keyword),
            artifact_id: item.artifact_id.clone(),
            error: item.error.clone(),
            downloadable: item.is_downloadable(),
        }
    }
}

/// 监控的实时快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorSnapshot {
    pub job: Option<BatchJob>,
    pub items: Vec<ItemView>,
    /// 已完成的轮询次数（含失败）
    pub polls: u32,
    /// 最近一次轮询失败的提示，成功后清空
    pub last_error: Option<String>,
    /// 轮询已停止
    pub finished: bool,
}

impl MonitorSnapshot {
    /// 由一次成功的状态响应生成
    pub fn from_job(job: &BatchJob) -> Self {
        let active = job.active_keyword();
        Self {
            items: job
                .results
                .iter()
                .map(|item| ItemView::from_item(item, active))
                .collect(),
            job: Some(job.clone()),
            polls: 0,
            last_error: None,
            finished: job.is_terminal(),
        }
    }

    /// 服务端给出的进度，原样展示
    pub fn progress(&self) -> f64 {
        self.job.as_ref().map(BatchJob::progress).unwrap_or(0.0)
    }
}

/// 监控结束的原因
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorExit {
    /// 任务进入终态
    Terminal(BatchJob),
    /// 被取消，附带最后一次看到的状态
    Cancelled(Option<BatchJob>),
    /// 服务端已没有该任务，批量会话已清除
    JobMissing,
}

/// 批量任务监控
pub struct BatchMonitor {
    service: Arc<dyn ContentService>,
    store: Option<SessionStore>,
    job_id: String,
    poll_interval: Duration,
}

impl BatchMonitor {
    pub fn new(
        service: Arc<dyn ContentService>,
        job_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            service,
            store: None,
            job_id: job_id.into(),
            poll_interval,
        }
    }

    /// 每次轮询后把任务状态写回批量会话
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// 轮询一次
    pub async fn poll_once(&self) -> AppResult<BatchJob> {
        let job = self.service.get_batch_status(&self.job_id).await?;

        if !job.counts_consistent() {
            warn!(
                "⚠️ 任务 {} 计数不一致: processed={} failed={} total={}",
                self.job_id, job.processed_count, job.failed_count, job.total_keywords
            );
        }

        debug!(
            "📊 任务 {} 状态: {} ({}/{}，进度 {:.1}%)",
            self.job_id,
            job.status,
            job.processed_count + job.failed_count,
            job.total_keywords,
            job.progress()
        );

        if let Some(store) = &self.store {
            if let Err(e) = store.update_batch_status(&self.job_id, job.status.as_str()) {
                warn!("⚠️ 保存批量会话失败: {}", e);
            }
        }

        Ok(job)
    }

    /// 在后台启动轮询
    pub fn start(self) -> MonitorHandle {
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(MonitorSnapshot::default());

        info!(
            "👀 开始监控任务 {}（每 {} 秒轮询一次）",
            self.job_id,
            self.poll_interval.as_secs_f64()
        );

        let task_token = token.clone();
        let task = tokio::spawn(async move { self.run(task_token, tx).await });

        MonitorHandle {
            token: token.clone(),
            guard: token.drop_guard(),
            snapshots: rx,
            task,
        }
    }

    async fn run(
        self,
        token: CancellationToken,
        tx: watch::Sender<MonitorSnapshot>,
    ) -> MonitorExit {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_job: Option<BatchJob> = None;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                result = self.poll_once() => result,
            };

            match result {
                Ok(job) => {
                    let terminal = job.is_terminal();
                    tx.send_modify(|snapshot| {
                        let polls = snapshot.polls + 1;
                        *snapshot = MonitorSnapshot::from_job(&job);
                        snapshot.polls = polls;
                    });

                    if terminal {
                        info!("🏁 任务 {} 已结束: {}", self.job_id, job.status);
                        print_batch_summary(
                            &self.job_id,
                            job.processed_count,
                            job.failed_count,
                            job.total_keywords,
                            job.progress(),
                        );
                        return MonitorExit::Terminal(job);
                    }
                    last_job = Some(job);
                }
                Err(e) if e.is_not_found() => {
                    warn!("⚠️ 任务 {} 已不存在，停止监控: {}", self.job_id, e);
                    if let Some(store) = &self.store {
                        if let Err(e) = store.clear(SessionMode::Batch) {
                            warn!("⚠️ 清除批量会话失败: {}", e);
                        }
                    }
                    tx.send_modify(|snapshot| {
                        snapshot.polls += 1;
                        snapshot.last_error = Some(e.user_message());
                        snapshot.finished = true;
                    });
                    return MonitorExit::JobMissing;
                }
                Err(e) => {
                    warn!("⚠️ 轮询任务 {} 失败，稍后重试: {}", self.job_id, e);
                    tx.send_modify(|snapshot| {
                        snapshot.polls += 1;
                        snapshot.last_error = Some(e.user_message());
                    });
                }
            }
        }

        info!("⏹️ 任务 {} 的监控已取消", self.job_id);
        tx.send_modify(|snapshot| snapshot.finished = true);
        MonitorExit::Cancelled(last_job)
    }
}

/// 后台监控的句柄
///
/// 丢弃句柄会取消轮询
pub struct MonitorHandle {
    token: CancellationToken,
    guard: DropGuard,
    snapshots: watch::Receiver<MonitorSnapshot>,
    task: JoinHandle<MonitorExit>,
}

impl MonitorHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 新的快照订阅
    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshots.clone()
    }

    /// 当前最新快照
    pub fn latest(&self) -> MonitorSnapshot {
        self.snapshots.borrow().clone()
    }

    /// 等待轮询结束
    pub async fn join(self) -> AppResult<MonitorExit> {
        let MonitorHandle { task, guard, .. } = self;
        let exit = task
            .await
            .map_err(|e| AppError::Other(format!("监控任务异常退出: {}", e)));
        drop(guard);
        exit
    }
}
