//! 手动模式流程 - 流程层
//!
//! 核心职责：按阶段驱动一个关键词组从输入到最终下载
//!
//! 流程顺序：
//! 1. 提交关键词（或从历史中选择）
//! 2. 抓取内容
//! 3. 搜索图片
//! 4. 分步生成博客
//! 5. 集成图片
//! 6. 生成元数据 / 下载
//!
//! 每次远程调用成功后立即持久化当前阶段；失败时阶段不变，可以重试。

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::error::{AppResult, ValidationError, WorkflowError};
use crate::infrastructure::SessionStore;
use crate::models::{
    DraftStep, FinalizedBlog, ImageCatalog, IntegrationPreview, KeywordInput, KeywordSet,
    ScrapeSummary, SessionMode, SessionPayload, SessionRecord,
};
use crate::services::ContentService;
use crate::workflow::confirm::Confirmer;
use crate::workflow::draft_driver::DraftDriver;
use crate::workflow::manual_stage::{ManualAction, ManualStage};

/// 第 5 步最多可选择的图片数量
pub const MAX_SELECTED_IMAGES: usize = 4;

/// 启动时恢复会话的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// 没有可恢复的会话
    Fresh,
    /// 恢复到保存的阶段
    Resumed(ManualStage),
    /// 远程关键词组已不存在，会话被清除
    SoftReset,
}

/// 手动模式流程
///
/// - 持有当前阶段和关键词组 ID
/// - 决定何时调用远程服务、何时持久化
/// - 通过 `&mut self` 保证同一时间只有一个远程调用
pub struct ManualFlow {
    service: Arc<dyn ContentService>,
    store: SessionStore,
    stage: ManualStage,
    keyword_set_id: Option<String>,
    payload: SessionPayload,
    draft: DraftDriver,
    draft_checked: bool,
}

impl ManualFlow {
    pub fn new(service: Arc<dyn ContentService>, store: SessionStore) -> Self {
        Self {
            service,
            store,
            stage: ManualStage::KeywordsEntered,
            keyword_set_id: None,
            payload: SessionPayload::default(),
            draft: DraftDriver::new(),
            draft_checked: false,
        }
    }

    pub fn stage(&self) -> ManualStage {
        self.stage
    }

    pub fn keyword_set_id(&self) -> Option<&str> {
        self.keyword_set_id.as_deref()
    }

    pub fn payload(&self) -> &SessionPayload {
        &self.payload
    }

    pub fn draft(&self) -> &DraftDriver {
        &self.draft
    }

    /// 已有会话时关键词表单被锁定
    pub fn is_locked(&self) -> bool {
        self.keyword_set_id.is_some()
    }

    /// 恢复上次的会话
    ///
    /// 会向服务端确认一次关键词组是否仍然存在：
    /// - 不存在：清除会话，回到第 1 步
    /// - 其他错误：保留本地状态
    pub async fn resume(&mut self) -> AppResult<ResumeOutcome> {
        let Some(record) = self.store.load(SessionMode::Manual) else {
            return Ok(ResumeOutcome::Fresh);
        };

        let Some(stage) = record.stage.and_then(ManualStage::from_number) else {
            warn!("⚠️ 会话中的阶段 {:?} 无效，已清除", record.stage);
            self.store.clear(SessionMode::Manual)?;
            return Ok(ResumeOutcome::Fresh);
        };

        match self.service.get_keyword_set(&record.primary_id).await {
            Ok(keyword_set) => {
                info!("🔄 恢复手动会话: {} ({})", keyword_set.main_keyword, stage);
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    "⚠️ 关键词组 {} 已不存在，会话已重置: {}",
                    record.primary_id, e
                );
                self.store.clear(SessionMode::Manual)?;
                self.reset_state();
                return Ok(ResumeOutcome::SoftReset);
            }
            Err(e) => {
                warn!("⚠️ 无法确认关键词组 {}，继续使用本地会话: {}", record.primary_id, e);
            }
        }

        self.stage = stage;
        self.keyword_set_id = Some(record.primary_id);
        self.draft = record
            .payload
            .draft
            .clone()
            .map(DraftDriver::from_progress)
            .unwrap_or_default();
        self.payload = record.payload;
        self.draft_checked = false;

        Ok(ResumeOutcome::Resumed(stage))
    }

    /// 第 1 步：提交关键词
    ///
    /// 校验失败时不会发出任何远程请求
    pub async fn submit_keywords(&mut self, input: &KeywordInput) -> AppResult<KeywordSet> {
        self.ensure_unlocked()?;
        let validated = input.validate()?;
        let next = self.stage.apply(ManualAction::SubmitKeywords)?;

        let keyword_set = self.service.create_keyword_set(&validated).await?;
        info!("✓ 关键词组已保存: {}", keyword_set);

        self.keyword_set_id = Some(keyword_set.id.clone());
        let mut payload = SessionPayload::default();
        payload.step_data.insert(
            "1".to_string(),
            json!({
                "main_keyword": keyword_set.main_keyword,
                "keywords": keyword_set.supporting_keywords,
            }),
        );
        self.persist(next, payload);

        Ok(keyword_set)
    }

    /// 历史关键词组
    pub async fn list_history(&self) -> AppResult<Vec<KeywordSet>> {
        self.service.list_keyword_sets().await
    }

    /// 从历史中选择关键词组，直接进入第 2 步（不向服务端确认）
    pub fn select_keyword_set(&mut self, keyword_set_id: &str) -> AppResult<()> {
        self.ensure_unlocked()?;
        let next = self.stage.apply(ManualAction::SelectKeywordSet)?;

        let record = SessionRecord::manual(keyword_set_id, next.number(), SessionPayload::default());
        if let Err(e) = self.store.save(record) {
            warn!("⚠️ 保存会话失败: {}", e);
        }

        info!("📂 已选择关键词组 {}", keyword_set_id);
        self.keyword_set_id = Some(keyword_set_id.to_string());
        self.stage = next;
        self.payload = SessionPayload::default();
        self.draft = DraftDriver::new();
        self.draft_checked = false;
        Ok(())
    }

    /// 第 2 步：抓取内容
    pub async fn scrape(&mut self) -> AppResult<ScrapeSummary> {
        let next = self.stage.apply(ManualAction::Scrape)?;
        let id = self.require_id()?;

        let summary = self.service.scrape_content(&id).await?;
        info!("✓ 抓取完成，共 {} 条结果", summary.total_results);

        let mut payload = SessionPayload::default();
        payload
            .step_data
            .insert("2".to_string(), serde_json::to_value(&summary)?);
        self.persist(next, payload);

        Ok(summary)
    }

    /// 第 3 步：搜索图片
    pub async fn search_images(&mut self) -> AppResult<ImageCatalog> {
        let next = self.stage.apply(ManualAction::SearchImages)?;
        let id = self.require_id()?;

        let catalog = self.service.search_images(&id).await?;
        info!(
            "✓ 图片搜索完成，{} 个关键词共 {} 张图片",
            catalog.images.len(),
            catalog.total()
        );

        let mut payload = SessionPayload::default();
        payload.step_data.insert(
            "3".to_string(),
            json!({
                "total_images": catalog.total(),
                "images": catalog.images,
            }),
        );
        self.persist(next, payload);

        Ok(catalog)
    }

    /// 进入第 4 步时检查服务端是否已有完整博客
    ///
    /// # 返回
    /// 已存在时返回 true，并直接进入第 5 步
    pub async fn enter_drafting(&mut self) -> AppResult<bool> {
        self.stage.apply(ManualAction::RunDraftStep)?;
        let id = self.require_id()?;

        // 查询失败时保持未检查状态，重试会再次确认
        let existing = self.service.get_blog(&id).await?;
        self.draft_checked = true;
        let Some(blog) = existing else {
            return Ok(false);
        };

        self.draft.mark_existing(&blog);
        let next = self.stage.apply(ManualAction::DraftFinalized)?;
        self.persist(
            next,
            SessionPayload {
                draft: Some(self.draft.progress().clone()),
                ..Default::default()
            },
        );
        Ok(true)
    }

    /// 第 4 步：执行下一个草稿步骤
    ///
    /// # 返回
    /// 刚完成的步骤；若服务端已有博客而直接跳过，返回 None
    pub async fn run_draft_step(&mut self) -> AppResult<Option<DraftStep>> {
        self.stage.apply(ManualAction::RunDraftStep)?;
        let id = self.require_id()?;

        let fresh = self.draft.progress().cursor == 0;
        if fresh && !self.draft_checked && self.enter_drafting().await? {
            return Ok(None);
        }

        let step = self.draft.advance(self.service.as_ref(), &id).await?;

        let next = if self.draft.is_complete() {
            self.stage.apply(ManualAction::DraftFinalized)?
        } else {
            self.stage
        };
        self.persist(
            next,
            SessionPayload {
                draft: Some(self.draft.progress().clone()),
                ..Default::default()
            },
        );

        Ok(Some(step))
    }

    /// 第 5 步：集成选择的图片（最多 4 张）
    pub async fn integrate_images(&mut self, image_ids: &[String]) -> AppResult<IntegrationPreview> {
        let next = self.stage.apply(ManualAction::IntegrateImages)?;
        if image_ids.len() > MAX_SELECTED_IMAGES {
            return Err(ValidationError::TooManyImages {
                count: image_ids.len(),
                max: MAX_SELECTED_IMAGES,
            }
            .into());
        }
        let id = self.require_id()?;

        let preview = self.service.integrate_images(&id, image_ids).await?;
        info!("✓ 已集成 {} 张图片", preview.images_used);

        let mut payload = SessionPayload {
            selected_images: image_ids.to_vec(),
            ..Default::default()
        };
        payload.step_data.insert(
            "5".to_string(),
            json!({
                "images_used": preview.images_used,
                "image_urls": preview.image_urls,
            }),
        );
        self.persist(next, payload);

        Ok(preview)
    }

    /// 第 6 步：生成元数据
    pub async fn generate_metadata(&mut self) -> AppResult<FinalizedBlog> {
        let next = self.stage.apply(ManualAction::GenerateMetadata)?;
        let id = self.require_id()?;

        let finalized = self.service.generate_metadata(&id).await?;
        info!("✓ 元数据已生成: {}", finalized.metadata.title);

        let mut payload = SessionPayload::default();
        payload.step_data.insert(
            "6".to_string(),
            json!({
                "blog_id": finalized.blog_id,
                "metadata": finalized.metadata,
            }),
        );
        self.persist(next, payload);

        Ok(finalized)
    }

    /// 下载最终 HTML，要求元数据已生成
    pub async fn download_blog(&self) -> AppResult<Vec<u8>> {
        self.stage.apply(ManualAction::Download)?;
        if !self.payload.step_data.contains_key("6") {
            return Err(WorkflowError::InvalidTransition {
                stage: self.stage.number(),
                action: ManualAction::Download.as_str().to_string(),
            }
            .into());
        }
        let id = self.require_id()?;
        self.service.download_blog(&id).await
    }

    /// 清除会话并回到第 1 步，需要用户确认
    ///
    /// # 返回
    /// 用户取消时返回 false，状态不变
    pub fn clear_session(&mut self, confirmer: &dyn Confirmer) -> AppResult<bool> {
        if !confirmer.confirm("Clear the current manual session and start over?") {
            return Ok(false);
        }

        self.store.clear(SessionMode::Manual)?;
        self.reset_state();
        info!("🗑️ 手动会话已清除");
        Ok(true)
    }

    fn ensure_unlocked(&self) -> AppResult<()> {
        match &self.keyword_set_id {
            Some(id) => Err(WorkflowError::SessionLocked {
                primary_id: id.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }

    fn require_id(&self) -> AppResult<String> {
        self.keyword_set_id
            .clone()
            .ok_or_else(|| WorkflowError::NoActiveSession.into())
    }

    fn reset_state(&mut self) {
        self.stage = ManualStage::KeywordsEntered;
        self.keyword_set_id = None;
        self.payload = SessionPayload::default();
        self.draft = DraftDriver::new();
        self.draft_checked = false;
    }

    /// 进入新阶段并持久化
    ///
    /// 远程调用已经成功，持久化失败只记录日志
    fn persist(&mut self, next: ManualStage, payload: SessionPayload) {
        self.stage = next;
        let Some(id) = self.keyword_set_id.clone() else {
            return;
        };

        match self.store.update_manual_step(&id, next.number(), payload.clone()) {
            Ok(record) => self.payload = record.payload,
            Err(e) => {
                warn!("⚠️ 保存会话失败，仅保留内存状态: {}", e);
                self.payload.merge(payload);
            }
        }
    }
}
