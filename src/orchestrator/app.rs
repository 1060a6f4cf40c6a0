//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：写日志文件头、输出启动信息、创建服务客户端和会话存储
//! 2. **命令分发**：把命令行子命令交给手动流程或批量分发器
//! 3. **模式切换**：开始新会话前经过 `ModeSwitchGuard`
//! 4. **结果输出**：把流程返回的数据写到日志或文件
//!
//! 每次运行都会先恢复对应模式的会话（带一次远程确认），再执行命令。

use crate::cli::{BatchCommand, Command, ManualCommand};
use crate::clients::ContentClient;
use crate::config::Config;
use crate::error::WorkflowError;
use crate::infrastructure::SessionStore;
use crate::models::{BatchItemResult, BatchJob, KeywordInput, OutputFormat, SessionMode};
use crate::orchestrator::batch_dispatch::{BatchDispatcher, BatchResume};
use crate::orchestrator::batch_monitor::{MonitorExit, MonitorSnapshot};
use crate::orchestrator::mode_guard::{ModeSwitchGuard, SwitchOutcome};
use crate::services::{ContentService, ResultsExporter};
use crate::utils::logging::{init_log_file, log_startup, truncate_text};
use crate::workflow::{Confirmer, ManualFlow, ManualStage, ResumeOutcome};
use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    store: SessionStore,
    service: Arc<dyn ContentService>,
    confirmer: Box<dyn Confirmer>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config, confirmer: Box<dyn Confirmer>) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config.api_base_url, &config.session_dir);

        let service: Arc<dyn ContentService> = Arc::new(ContentClient::new(&config));
        Ok(Self::with_service(config, service, confirmer))
    }

    /// 使用指定的服务实现创建应用
    pub fn with_service(
        config: Config,
        service: Arc<dyn ContentService>,
        confirmer: Box<dyn Confirmer>,
    ) -> Self {
        let store = SessionStore::from_config(&config);
        Self {
            config,
            store,
            service,
            confirmer,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// 运行一个命令
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Resume => self.resume().await,
            Command::Manual(cmd) => self.run_manual(cmd).await,
            Command::Batch(cmd) => self.run_batch(cmd).await,
            Command::Switch { mode } => {
                let target = SessionMode::from(mode);
                match self.guard().switch_to(target, self.confirmer.as_ref())? {
                    SwitchOutcome::Declined => warn!("⚠️ 已取消，保持当前会话"),
                    _ => info!("✓ 当前模式: {}", target),
                }
                Ok(())
            }
        }
    }

    fn guard(&self) -> ModeSwitchGuard {
        ModeSwitchGuard::new(self.store.clone())
    }

    fn manual_flow(&self) -> ManualFlow {
        ManualFlow::new(self.service.clone(), self.store.clone())
    }

    fn dispatcher(&self) -> BatchDispatcher {
        BatchDispatcher::new(self.service.clone(), self.store.clone())
    }

    /// 开始新会话前确认模式切换
    fn enter_mode(&self, mode: SessionMode) -> Result<()> {
        match self.guard().switch_to(mode, self.confirmer.as_ref())? {
            SwitchOutcome::Declined => Err(WorkflowError::ConfirmationDeclined.into()),
            _ => Ok(()),
        }
    }

    /// 恢复最近的会话
    async fn resume(&self) -> Result<()> {
        match self.guard().resume_mode() {
            None => info!("📭 没有进行中的会话"),
            Some(SessionMode::Manual) => {
                let mut flow = self.manual_flow();
                match flow.resume().await? {
                    ResumeOutcome::Resumed(stage) => log_manual_stage(&flow, stage),
                    ResumeOutcome::SoftReset => {
                        info!("🔁 关键词组已不存在，请重新输入关键词")
                    }
                    ResumeOutcome::Fresh => info!("📭 没有进行中的会话"),
                }
            }
            Some(SessionMode::Batch) => match self.dispatcher().resume().await? {
                BatchResume::Resumed { record, job } => {
                    info!(
                        "📦 批量任务 {} ({}): {}",
                        record.primary_id,
                        record.payload.filename.as_deref().unwrap_or("-"),
                        record.status.as_deref().unwrap_or("unknown")
                    );
                    if let Some(job) = job {
                        log_job(&job);
                    }
                }
                BatchResume::SoftReset => info!("🔁 批量任务已不存在，请重新上传文件"),
                BatchResume::Fresh => info!("📭 没有进行中的会话"),
            },
        }
        Ok(())
    }

    async fn run_manual(&self, command: ManualCommand) -> Result<()> {
        let mut flow = self.manual_flow();

        // 提交新关键词/选择历史记录前确认模式切换，其余命令都在已有会话上执行
        match &command {
            ManualCommand::Submit { .. } | ManualCommand::Select { .. } => {
                self.enter_mode(SessionMode::Manual)?;
            }
            _ => {}
        }
        flow.resume().await?;

        match command {
            ManualCommand::Submit {
                main_keyword,
                keywords,
            } => {
                let input = KeywordInput::new(main_keyword, keywords);
                let keyword_set = flow.submit_keywords(&input).await.map_err(user_facing)?;
                info!("➡️ 下一步: {} (ID: {})", flow.stage(), keyword_set.id);
            }
            ManualCommand::History => {
                let sets = flow.list_history().await.map_err(user_facing)?;
                if sets.is_empty() {
                    info!("📭 没有历史关键词组");
                }
                for set in sets {
                    info!("  {} | {}", set.id, set);
                }
            }
            ManualCommand::Select { keyword_set_id } => {
                flow.select_keyword_set(&keyword_set_id).map_err(user_facing)?;
                info!("➡️ 下一步: {}", flow.stage());
            }
            ManualCommand::Scrape => {
                let summary = flow.scrape().await.map_err(user_facing)?;
                info!("📰 抓取到 {} 条内容", summary.total_results);
            }
            ManualCommand::Images => {
                let catalog = flow.search_images().await.map_err(user_facing)?;
                for candidate in catalog.candidates() {
                    info!(
                        "  🖼️ [{}] {} ({})",
                        candidate.keyword,
                        candidate.unique_id,
                        truncate_text(&candidate.image.alt_text, 40)
                    );
                }
            }
            ManualCommand::Draft { all } => loop {
                match flow.run_draft_step().await.map_err(user_facing)? {
                    Some(step) => info!("✍️ {} 完成", step.display_name()),
                    None => info!("♻️ 博客已存在，直接进入图片集成"),
                }
                if !all || flow.stage() != ManualStage::BlogDrafted {
                    break;
                }
            },
            ManualCommand::Integrate { image_ids } => {
                let preview = flow.integrate_images(&image_ids).await.map_err(user_facing)?;
                info!("🖼️ 已使用 {} 张图片", preview.images_used);
            }
            ManualCommand::Metadata => {
                let finalized = flow.generate_metadata().await.map_err(user_facing)?;
                info!("🏷️ 标题: {}", finalized.metadata.title);
                info!("🔗 Slug: {}", finalized.metadata.slug);
                info!("📝 描述: {}", finalized.metadata.meta_description);
            }
            ManualCommand::Download { output } => {
                let bytes = flow.download_blog().await.map_err(user_facing)?;
                let path = output.unwrap_or_else(|| {
                    PathBuf::from(format!(
                        "blog_{}.html",
                        flow.keyword_set_id().unwrap_or("draft")
                    ))
                });
                write_file(&path, &bytes).await?;
                info!("💾 已保存到 {}", path.display());
            }
            ManualCommand::Clear => {
                if !flow.clear_session(self.confirmer.as_ref())? {
                    warn!("⚠️ 已取消，会话保持不变");
                }
            }
        }

        log_manual_stage(&flow, flow.stage());
        Ok(())
    }

    async fn run_batch(&self, command: BatchCommand) -> Result<()> {
        let mut dispatcher = self.dispatcher();

        match command {
            BatchCommand::Upload { file } => {
                self.enter_mode(SessionMode::Batch)?;
                if let Some(record) = dispatcher.current() {
                    if !self.confirmer.confirm(&format!(
                        "Batch job {} is still tracked. Replace it with a new upload?",
                        record.primary_id
                    )) {
                        return Err(WorkflowError::ConfirmationDeclined.into());
                    }
                }
                let upload = dispatcher.upload(&file).await.map_err(user_facing)?;
                info!(
                    "📦 任务 {} 已开始，共 {} 个关键词组",
                    upload.job_id, upload.total_keywords
                );
            }
            BatchCommand::Monitor { export } => {
                let job_id = self.require_batch(&dispatcher).await?;
                let exit = self.monitor(&dispatcher, &job_id).await?;
                if let (true, MonitorExit::Terminal(job)) = (export, &exit) {
                    self.export(job)?;
                }
            }
            BatchCommand::Jobs => {
                for job in dispatcher.list_jobs().await.map_err(user_facing)? {
                    info!(
                        "  {} | {} | {} | {}/{}",
                        job.job_id,
                        job.filename,
                        job.status,
                        job.processed_count,
                        job.total_keywords
                    );
                }
            }
            BatchCommand::Preview { keyword } => {
                let job = self.fetch_job(&dispatcher).await?;
                let item = find_item(&job, &keyword)?;
                let preview = dispatcher.preview(item).await.map_err(user_facing)?;
                info!("👀 {}", truncate_text(&preview.html, 500));
            }
            BatchCommand::Download {
                keyword,
                format,
                output_dir,
            } => {
                let job = self.fetch_job(&dispatcher).await?;
                let dir = output_dir.unwrap_or_else(|| PathBuf::from(&self.config.export_dir));
                let items: Vec<&BatchItemResult> = match &keyword {
                    Some(keyword) => vec![find_item(&job, keyword)?],
                    None => job.results.iter().filter(|i| i.is_downloadable()).collect(),
                };
                let saved = self.download_items(&dispatcher, items, format, &dir).await;
                info!("💾 已下载 {} 个文件到 {}", saved, dir.display());
            }
            BatchCommand::Export => {
                let job = self.fetch_job(&dispatcher).await?;
                self.export(&job)?;
            }
            BatchCommand::Clear => {
                if !dispatcher.clear(self.confirmer.as_ref())? {
                    warn!("⚠️ 已取消，会话保持不变");
                }
            }
        }
        Ok(())
    }

    /// 恢复批量会话，返回任务 ID
    async fn require_batch(&self, dispatcher: &BatchDispatcher) -> Result<String> {
        match dispatcher.resume().await? {
            BatchResume::Resumed { record, .. } => Ok(record.primary_id),
            BatchResume::SoftReset | BatchResume::Fresh => {
                Err(WorkflowError::NoActiveSession.into())
            }
        }
    }

    /// 获取当前任务的最新状态
    async fn fetch_job(&self, dispatcher: &BatchDispatcher) -> Result<BatchJob> {
        match dispatcher.resume().await? {
            BatchResume::Resumed { job: Some(job), .. } => Ok(job),
            BatchResume::Resumed { record, job: None } => Err(anyhow!(
                "无法获取批量任务 {} 的状态，请稍后重试",
                record.primary_id
            )),
            BatchResume::SoftReset | BatchResume::Fresh => {
                Err(WorkflowError::NoActiveSession.into())
            }
        }
    }

    /// 前台监控，Ctrl-C 取消
    async fn monitor(&self, dispatcher: &BatchDispatcher, job_id: &str) -> Result<MonitorExit> {
        let handle = dispatcher
            .monitor(job_id, self.config.poll_interval())
            .start();
        let mut rx = handle.subscribe();

        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = rx.borrow_and_update().clone();
                    log_snapshot(&snapshot);
                    if snapshot.finished {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("⏹️ 收到中断信号，停止监控");
                    handle.cancel();
                    break;
                }
            }
        }

        let exit = handle.join().await?;
        match &exit {
            MonitorExit::Terminal(job) => {
                for item in &job.results {
                    if let Some(err) = &item.error {
                        error!("  ❌ {}: {}", item.main_keyword, err);
                    }
                }
            }
            MonitorExit::JobMissing => info!("🔁 批量任务已不存在，请重新上传文件"),
            MonitorExit::Cancelled(_) => {}
        }
        Ok(exit)
    }

    /// 逐个下载条目，一次只有一个请求
    async fn download_items(
        &self,
        dispatcher: &BatchDispatcher,
        items: Vec<&BatchItemResult>,
        format: OutputFormat,
        dir: &Path,
    ) -> usize {
        futures::stream::iter(items)
            .then(|item| async move {
                let bytes = dispatcher.download(item, format).await?;
                let name = format!(
                    "{}.{}",
                    item.main_keyword.replace(|c: char| !c.is_alphanumeric(), "_"),
                    format.as_str()
                );
                write_file(&dir.join(name), &bytes).await?;
                Ok::<_, anyhow::Error>(())
            })
            .filter_map(|result| async move {
                match result {
                    Ok(()) => Some(()),
                    Err(e) => {
                        warn!("⚠️ 下载失败: {:#}", e);
                        None
                    }
                }
            })
            .count()
            .await
    }

    fn export(&self, job: &BatchJob) -> Result<()> {
        let path = ResultsExporter::new(&self.config.export_dir).write_csv(job)?;
        info!("📄 结果已导出: {}", path.display());
        Ok(())
    }
}

/// 远程错误只展示面向用户的提示
fn user_facing(err: crate::error::AppError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

fn find_item<'a>(job: &'a BatchJob, keyword: &str) -> Result<&'a BatchItemResult> {
    job.results
        .iter()
        .find(|item| {
            item.main_keyword.eq_ignore_ascii_case(keyword)
                || item.artifact_id.as_deref() == Some(keyword)
        })
        .ok_or_else(|| anyhow!("任务中没有关键词 {}", keyword))
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("创建目录失败: {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("写入文件失败: {}", path.display()))
}

fn log_manual_stage(flow: &ManualFlow, stage: ManualStage) {
    match flow.keyword_set_id() {
        Some(id) => {
            info!("📍 关键词组 {} 当前位于 {}", id, stage);
            if stage == ManualStage::BlogDrafted {
                if let Some(step) = flow.draft().next_step() {
                    info!("   下一个草稿步骤: {}", step.display_name());
                }
            }
        }
        None => info!("📍 当前位于 {}", stage),
    }
}

fn log_job(job: &BatchJob) {
    info!(
        "📊 {}: {} | 成功 {} | 失败 {} | 共 {} | 进度 {}%",
        job.job_id,
        job.status,
        job.processed_count,
        job.failed_count,
        job.total_keywords,
        job.progress()
    );
}

fn log_snapshot(snapshot: &MonitorSnapshot) {
    if let Some(err) = &snapshot.last_error {
        warn!("⚠️ {}", err);
    }
    let Some(job) = &snapshot.job else {
        return;
    };
    log_job(job);
    for item in &snapshot.items {
        info!("   {:<40} {}", truncate_text(&item.keyword, 40), item.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ModeArg;
    use crate::services::MockContentService;

    fn app_in(dir: &Path, answer: bool) -> (App, Arc<MockContentService>) {
        let config = Config {
            session_dir: dir.join("sessions").display().to_string(),
            export_dir: dir.join("exports").display().to_string(),
            ..Default::default()
        };
        let mock = Arc::new(MockContentService::new());
        let confirmer: Box<dyn Confirmer> = Box::new(move |_: &str| answer);
        (App::with_service(config, mock.clone(), confirmer), mock)
    }

    #[tokio::test]
    async fn test_declined_switch_blocks_upload() {
        let dir = tempfile::tempdir().unwrap();
        let (app, mock) = app_in(dir.path(), false);

        app.run(Command::Manual(ManualCommand::Submit {
            main_keyword: "Automated Welding".to_string(),
            keywords: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        }))
        .await
        .unwrap();

        let file = dir.path().join("keywords.xlsx");
        std::fs::write(&file, b"fake").unwrap();
        assert!(app
            .run(Command::Batch(BatchCommand::Upload { file }))
            .await
            .is_err());
        assert_eq!(mock.call_count("upload_batch"), 0);
        assert!(app.store().load(SessionMode::Manual).is_some());
    }

    #[tokio::test]
    async fn test_switch_command_clears_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_in(dir.path(), true);

        app.run(Command::Manual(ManualCommand::Submit {
            main_keyword: "Automated Welding".to_string(),
            keywords: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        }))
        .await
        .unwrap();

        app.run(Command::Switch {
            mode: ModeArg::Batch,
        })
        .await
        .unwrap();
        assert!(app.store().load(SessionMode::Manual).is_none());
    }

    #[tokio::test]
    async fn test_validation_error_surfaces_message() {
        let dir = tempfile::tempdir().unwrap();
        let (app, mock) = app_in(dir.path(), true);

        let err = app
            .run(Command::Manual(ManualCommand::Submit {
                main_keyword: "Automated Welding".to_string(),
                keywords: vec!["a".into(), "b".into()],
            }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please provide 4-5 keywords (got 2)");
        assert_eq!(mock.total_calls(), 0);
    }
}
