//! 内容生成服务 - 业务能力层
//!
//! 描述"远程服务能做什么"，流程层只依赖这个 trait，不关心 HTTP 细节

use crate::error::AppResult;
use crate::models::{
    BatchJob, BatchUpload, BlogArtifact, BlogPreview, DraftStep, FinalizedBlog, ImageCatalog,
    IntegrationPreview, KeywordSet, OutputFormat, ScrapeSummary, StepOutcome, ValidatedKeywords,
};
use async_trait::async_trait;

/// 远程内容生成服务的请求/响应契约
#[async_trait]
pub trait ContentService: Send + Sync {
    /// 保存关键词组，返回服务端分配的 ID
    async fn create_keyword_set(&self, keywords: &ValidatedKeywords) -> AppResult<KeywordSet>;

    /// 历史关键词组
    async fn list_keyword_sets(&self) -> AppResult<Vec<KeywordSet>>;

    /// 单个关键词组；不存在时返回 `ApiError::NotFound`
    async fn get_keyword_set(&self, keyword_set_id: &str) -> AppResult<KeywordSet>;

    async fn scrape_content(&self, keyword_set_id: &str) -> AppResult<ScrapeSummary>;

    async fn search_images(&self, keyword_set_id: &str) -> AppResult<ImageCatalog>;

    /// 打开服务端草稿会话，返回 draft session id
    async fn start_draft(&self, keyword_set_id: &str) -> AppResult<String>;

    async fn run_draft_step(
        &self,
        keyword_set_id: &str,
        draft_session_id: &str,
        step: DraftStep,
    ) -> AppResult<StepOutcome>;

    /// 已生成的博客；尚未生成时返回 None
    async fn get_blog(&self, keyword_set_id: &str) -> AppResult<Option<BlogArtifact>>;

    async fn integrate_images(
        &self,
        keyword_set_id: &str,
        image_ids: &[String],
    ) -> AppResult<IntegrationPreview>;

    async fn generate_metadata(&self, keyword_set_id: &str) -> AppResult<FinalizedBlog>;

    async fn download_blog(&self, keyword_set_id: &str) -> AppResult<Vec<u8>>;

    async fn upload_batch(&self, filename: &str, content: Vec<u8>) -> AppResult<BatchUpload>;

    /// 批量任务状态；任务不存在时返回 `ApiError::NotFound`
    async fn get_batch_status(&self, job_id: &str) -> AppResult<BatchJob>;

    async fn list_batch_jobs(&self) -> AppResult<Vec<BatchJob>>;

    async fn preview_batch_item(&self, item_id: &str) -> AppResult<BlogPreview>;

    async fn download_batch_item(&self, item_id: &str, format: OutputFormat)
        -> AppResult<Vec<u8>>;
}
