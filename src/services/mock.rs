//! 内存中的内容生成服务
//!
//! 不发任何网络请求，供流程层测试和离线演示使用。
//! 可以注入失败、删除远程实体、按顺序播放批量任务状态，并记录每次调用。

use crate::error::{ApiError, AppError, AppResult};
use crate::models::{
    BatchJob, BatchUpload, BlogArtifact, BlogMetadata, BlogPreview, DraftFragments, DraftStep,
    FinalizedBlog, ImageCatalog, ImageDescriptor, IntegrationPreview, KeywordSet, OutputFormat,
    ScrapeSummary, StepOutcome, ValidatedKeywords,
};
use crate::services::ContentService;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MockState {
    next_id: u32,
    keyword_sets: BTreeMap<String, KeywordSet>,
    blogs: HashMap<String, BlogArtifact>,
    images: ImageCatalog,
    failures: HashSet<String>,
    batch_scripts: HashMap<String, VecDeque<BatchJob>>,
    missing_jobs: HashSet<String>,
    upload_total: u32,
    calls: Vec<String>,
}

/// 内存版 `ContentService`
pub struct MockContentService {
    state: Mutex<MockState>,
}

impl Default for MockContentService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContentService {
    pub fn new() -> Self {
        let mut images = BTreeMap::new();
        images.insert(
            "main".to_string(),
            vec![
                ImageDescriptor {
                    url: "https://images.example.com/main-1.jpg".to_string(),
                    alt_text: "main keyword image".to_string(),
                    source: "Bing Images".to_string(),
                    title: "Main 1".to_string(),
                },
                ImageDescriptor {
                    url: "https://images.example.com/main-2.jpg".to_string(),
                    alt_text: "main keyword image".to_string(),
                    source: "Bing Images".to_string(),
                    title: "Main 2".to_string(),
                },
            ],
        );

        Self {
            state: Mutex::new(MockState {
                images: ImageCatalog { images },
                upload_total: 10,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 记录一次调用，若该操作被注入了失败则返回错误
    fn record(&self, op: &str) -> AppResult<()> {
        let mut state = self.state();
        state.calls.push(op.to_string());
        if state.failures.contains(op) {
            return Err(ApiError::BadResponse {
                endpoint: op.to_string(),
                status: 500,
                message: Some("injected failure".to_string()),
            }
            .into());
        }
        Ok(())
    }

    fn not_found(endpoint: &str, message: &str) -> AppError {
        ApiError::NotFound {
            endpoint: endpoint.to_string(),
            message: Some(message.to_string()),
        }
        .into()
    }

    /// 预置一个关键词组
    pub fn with_keyword_set(self, keyword_set: KeywordSet) -> Self {
        self.state()
            .keyword_sets
            .insert(keyword_set.id.clone(), keyword_set);
        self
    }

    /// 预置一篇已生成的博客
    pub fn with_blog(self, keyword_set_id: &str, blog: BlogArtifact) -> Self {
        self.state().blogs.insert(keyword_set_id.to_string(), blog);
        self
    }

    pub fn with_upload_total(self, total: u32) -> Self {
        self.state().upload_total = total;
        self
    }

    /// 让某个操作之后的调用都返回 500
    pub fn fail_on(&self, op: &str) {
        self.state().failures.insert(op.to_string());
    }

    pub fn clear_failure(&self, op: &str) {
        self.state().failures.remove(op);
    }

    /// 模拟关键词组在服务端被删除
    pub fn remove_keyword_set(&self, keyword_set_id: &str) {
        self.state().keyword_sets.remove(keyword_set_id);
    }

    /// 按顺序返回的任务状态，播放完后一直重复最后一个
    pub fn script_batch(&self, job_id: &str, statuses: Vec<BatchJob>) {
        self.state()
            .batch_scripts
            .insert(job_id.to_string(), statuses.into());
    }

    /// 模拟批量任务在服务端消失（例如服务重启）
    pub fn remove_job(&self, job_id: &str) {
        self.state().missing_jobs.insert(job_id.to_string());
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.state().calls.iter().filter(|c| c.as_str() == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    fn ensure_keyword_set(&self, endpoint: &str, keyword_set_id: &str) -> AppResult<KeywordSet> {
        self.state()
            .keyword_sets
            .get(keyword_set_id)
            .cloned()
            .ok_or_else(|| Self::not_found(endpoint, "Keyword set not found"))
    }

    fn fragments_for(step: DraftStep, main_keyword: &str) -> DraftFragments {
        match step {
            DraftStep::Start => DraftFragments::default(),
            DraftStep::TitleTag => DraftFragments {
                title: Some(format!("{}: A Complete Guide", main_keyword)),
                ..Default::default()
            },
            DraftStep::H1Heading => DraftFragments {
                h1: Some(format!("Everything About {}", main_keyword)),
                ..Default::default()
            },
            DraftStep::OpeningParagraph => DraftFragments {
                opening_paragraph: Some(format!("{} is changing the industry.", main_keyword)),
                ..Default::default()
            },
            DraftStep::Subheadings => DraftFragments {
                subheadings: Some(vec!["Benefits".to_string(), "Challenges".to_string()]),
                ..Default::default()
            },
            DraftStep::ContentSections => DraftFragments {
                content_sections: Some(vec![
                    "Benefits section".to_string(),
                    "Challenges section".to_string(),
                ]),
                ..Default::default()
            },
            DraftStep::Cta => DraftFragments {
                cta: Some("Contact us today".to_string()),
                ..Default::default()
            },
            DraftStep::Conclusion => DraftFragments {
                conclusion: Some("In short, it pays off.".to_string()),
                ..Default::default()
            },
            DraftStep::QualityCheck => DraftFragments {
                quality_report: Some(json!({"topic_complexity": "medium"})),
                enhancement_done: Some(false),
                final_word_count: Some(1250),
                ..Default::default()
            },
            DraftStep::Finalize => DraftFragments::default(),
        }
    }
}

#[async_trait]
impl ContentService for MockContentService {
    async fn create_keyword_set(&self, keywords: &ValidatedKeywords) -> AppResult<KeywordSet> {
        self.record("create_keyword_set")?;
        let mut state = self.state();
        state.next_id += 1;
        let keyword_set = KeywordSet {
            id: format!("kw-{}", state.next_id),
            main_keyword: keywords.main_keyword().to_string(),
            supporting_keywords: keywords.supporting_keywords().to_vec(),
            created_at: None,
            status: Some("created".to_string()),
        };
        state
            .keyword_sets
            .insert(keyword_set.id.clone(), keyword_set.clone());
        Ok(keyword_set)
    }

    async fn list_keyword_sets(&self) -> AppResult<Vec<KeywordSet>> {
        self.record("list_keyword_sets")?;
        Ok(self.state().keyword_sets.values().cloned().collect())
    }

    async fn get_keyword_set(&self, keyword_set_id: &str) -> AppResult<KeywordSet> {
        self.record("get_keyword_set")?;
        self.ensure_keyword_set("get_keyword_set", keyword_set_id)
    }

    async fn scrape_content(&self, keyword_set_id: &str) -> AppResult<ScrapeSummary> {
        self.record("scrape_content")?;
        self.ensure_keyword_set("scrape_content", keyword_set_id)?;
        Ok(ScrapeSummary {
            total_results: 12,
            scraped_at: Some("2024-03-13T10:00:00".to_string()),
        })
    }

    async fn search_images(&self, keyword_set_id: &str) -> AppResult<ImageCatalog> {
        self.record("search_images")?;
        self.ensure_keyword_set("search_images", keyword_set_id)?;
        Ok(self.state().images.clone())
    }

    async fn start_draft(&self, keyword_set_id: &str) -> AppResult<String> {
        self.record("start_draft")?;
        self.ensure_keyword_set("start_draft", keyword_set_id)?;
        Ok(format!("draft-{}", keyword_set_id))
    }

    async fn run_draft_step(
        &self,
        keyword_set_id: &str,
        _draft_session_id: &str,
        step: DraftStep,
    ) -> AppResult<StepOutcome> {
        self.record("run_draft_step")?;
        self.record(&format!("run_draft_step:{}", step.as_str()))?;
        let keyword_set = self.ensure_keyword_set("run_draft_step", keyword_set_id)?;

        let fragments = Self::fragments_for(step, &keyword_set.main_keyword);
        let blog = if step == DraftStep::Finalize {
            let blog = BlogArtifact {
                id: format!("blog-{}", keyword_set_id),
                keyword_id: Some(keyword_set_id.to_string()),
                title: Some(format!("{}: A Complete Guide", keyword_set.main_keyword)),
                html_content: Some("<h1>Draft</h1>".to_string()),
                status: Some("draft".to_string()),
                word_count: Some(1250),
            };
            self.state()
                .blogs
                .insert(keyword_set_id.to_string(), blog.clone());
            Some(blog)
        } else {
            None
        };

        Ok(StepOutcome { fragments, blog })
    }

    async fn get_blog(&self, keyword_set_id: &str) -> AppResult<Option<BlogArtifact>> {
        self.record("get_blog")?;
        Ok(self.state().blogs.get(keyword_set_id).cloned())
    }

    async fn integrate_images(
        &self,
        keyword_set_id: &str,
        image_ids: &[String],
    ) -> AppResult<IntegrationPreview> {
        self.record("integrate_images")?;
        self.ensure_keyword_set("integrate_images", keyword_set_id)?;
        Ok(IntegrationPreview {
            html_preview: "<h1>Draft</h1>".to_string(),
            images_used: image_ids.len() as u32,
            image_urls: image_ids.to_vec(),
        })
    }

    async fn generate_metadata(&self, keyword_set_id: &str) -> AppResult<FinalizedBlog> {
        self.record("generate_metadata")?;
        let keyword_set = self.ensure_keyword_set("generate_metadata", keyword_set_id)?;
        Ok(FinalizedBlog {
            metadata: BlogMetadata {
                title: format!("{}: A Complete Guide", keyword_set.main_keyword),
                slug: keyword_set.main_keyword.to_lowercase().replace(' ', "-"),
                ..Default::default()
            },
            final_html: "<html><body><h1>Draft</h1></body></html>".to_string(),
            blog_id: format!("blog-{}", keyword_set_id),
        })
    }

    async fn download_blog(&self, keyword_set_id: &str) -> AppResult<Vec<u8>> {
        self.record("download_blog")?;
        self.ensure_keyword_set("download_blog", keyword_set_id)?;
        Ok(b"<html><body><h1>Draft</h1></body></html>".to_vec())
    }

    async fn upload_batch(&self, _filename: &str, _content: Vec<u8>) -> AppResult<BatchUpload> {
        self.record("upload_batch")?;
        let mut state = self.state();
        state.next_id += 1;
        Ok(BatchUpload {
            job_id: format!("batch_mock_{}", state.next_id),
            total_keywords: state.upload_total,
            status: Some("started".to_string()),
        })
    }

    async fn get_batch_status(&self, job_id: &str) -> AppResult<BatchJob> {
        self.record("get_batch_status")?;
        let mut state = self.state();
        if state.missing_jobs.contains(job_id) {
            return Err(Self::not_found("get_batch_status", "Batch job not found"));
        }

        let script = state
            .batch_scripts
            .get_mut(job_id)
            .ok_or_else(|| Self::not_found("get_batch_status", "Batch job not found"))?;
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        let mut job =
            next.ok_or_else(|| Self::not_found("get_batch_status", "Batch job not found"))?;

        if job.job_id.is_empty() {
            job.job_id = job_id.to_string();
        }
        Ok(job)
    }

    async fn list_batch_jobs(&self) -> AppResult<Vec<BatchJob>> {
        self.record("list_batch_jobs")?;
        let state = self.state();
        let mut jobs: Vec<BatchJob> = state
            .batch_scripts
            .iter()
            .filter(|(id, _)| !state.missing_jobs.contains(*id))
            .filter_map(|(id, script)| {
                script.back().cloned().map(|mut job| {
                    job.job_id = id.clone();
                    job
                })
            })
            .collect();
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        Ok(jobs)
    }

    async fn preview_batch_item(&self, item_id: &str) -> AppResult<BlogPreview> {
        self.record("preview_batch_item")?;
        Ok(BlogPreview {
            html: format!("<h1>{}</h1>", item_id),
            metadata: json!({"title": item_id}),
            ready_for_download: true,
        })
    }

    async fn download_batch_item(
        &self,
        item_id: &str,
        format: OutputFormat,
    ) -> AppResult<Vec<u8>> {
        self.record("download_batch_item")?;
        Ok(format!("{}.{}", item_id, format.as_str()).into_bytes())
    }
}
