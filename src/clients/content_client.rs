/// 内容生成服务 API 客户端
///
/// 封装所有与内容生成服务相关的 HTTP 调用
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{
    BatchJob, BatchUpload, BlogArtifact, BlogPreview, DraftFragments, DraftStep, FinalizedBlog,
    ImageCatalog, ImageDescriptor, IntegrationPreview, KeywordSet, OutputFormat, ScrapeSummary,
    StepOutcome, ValidatedKeywords,
};
use crate::services::ContentService;
use async_trait::async_trait;
use reqwest::{multipart, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// 服务端统一的 `{ "data": ... }` 包装
#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// 服务端错误响应 `{ "error": "..." }`
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// 内容生成服务客户端
#[derive(Clone)]
pub struct ContentClient {
    http: reqwest::Client,
    base_url: String,
    upload_timeout: Duration,
    download_timeout: Duration,
}

impl ContentClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.api_base_url)
            .with_timeouts(config.upload_timeout(), config.download_timeout())
    }

    /// 使用自定义地址创建客户端（默认超时 30s / 60s）
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upload_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeouts(mut self, upload: Duration, download: Duration) -> Self {
        self.upload_timeout = upload;
        self.download_timeout = download;
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// 发送请求并把非 2xx 响应转换为 ApiError
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> AppResult<Response> {
        debug!("➡️ 请求 {}", endpoint);

        let response = request
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);

        warn!("⚠️ {} 返回 {}: {:?}", endpoint, status, message);

        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound {
                endpoint: endpoint.to_string(),
                message,
            }
            .into())
        } else {
            Err(ApiError::BadResponse {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message,
            }
            .into())
        }
    }

    /// 发送请求并解析 JSON 响应
    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> AppResult<T> {
        let response = self.send(endpoint, request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// 下载二进制内容（使用下载超时）
    async fn send_bytes(&self, endpoint: &str, request: RequestBuilder) -> AppResult<Vec<u8>> {
        let response = self
            .send(endpoint, request.timeout(self.download_timeout))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e))?;
        Ok(bytes.to_vec())
    }
}

/// 从响应中取出必需字段
fn required<T: DeserializeOwned>(value: &Value, field: &str, endpoint: &str) -> AppResult<T> {
    let raw = value.get(field).cloned().ok_or_else(|| ApiError::MissingField {
        endpoint: endpoint.to_string(),
        field: field.to_string(),
    })?;
    Ok(serde_json::from_value(raw)?)
}

/// 解析图片搜索结果
///
/// 服务端的 `images` 可能是 `{keyword: [...]}`，也可能再包一层 `{images: {keyword: [...]}}`；
/// 非数组的字段（如统计信息）被忽略
fn parse_image_catalog(data: &Value) -> AppResult<ImageCatalog> {
    let mut node = data.get("images").unwrap_or(data);
    if let Some(inner) = node.get("images").filter(|v| v.is_object()) {
        node = inner;
    }

    let mut images = BTreeMap::new();
    if let Some(map) = node.as_object() {
        for (keyword, list) in map {
            if list.is_array() {
                let descriptors: Vec<ImageDescriptor> = serde_json::from_value(list.clone())?;
                images.insert(keyword.clone(), descriptors);
            }
        }
    }

    Ok(ImageCatalog { images })
}

#[async_trait]
impl ContentService for ContentClient {
    async fn create_keyword_set(&self, keywords: &ValidatedKeywords) -> AppResult<KeywordSet> {
        let endpoint = "/keywords";
        let body = json!({
            "main_keyword": keywords.main_keyword(),
            "keywords": keywords.supporting_keywords(),
        });
        let envelope: DataEnvelope<KeywordSet> = self
            .send_json(endpoint, self.http.post(self.url(endpoint)).json(&body))
            .await?;
        Ok(envelope.data)
    }

    async fn list_keyword_sets(&self) -> AppResult<Vec<KeywordSet>> {
        let endpoint = "/keywords";
        let envelope: DataEnvelope<Vec<KeywordSet>> = self
            .send_json(endpoint, self.http.get(self.url(endpoint)))
            .await?;
        Ok(envelope.data)
    }

    async fn get_keyword_set(&self, keyword_set_id: &str) -> AppResult<KeywordSet> {
        let endpoint = format!("/keywords/{}", keyword_set_id);
        let envelope: DataEnvelope<KeywordSet> = self
            .send_json(&endpoint, self.http.get(self.url(&endpoint)))
            .await?;
        Ok(envelope.data)
    }

    async fn scrape_content(&self, keyword_set_id: &str) -> AppResult<ScrapeSummary> {
        let endpoint = format!("/scrape/{}", keyword_set_id);
        let value: Value = self
            .send_json(&endpoint, self.http.post(self.url(&endpoint)))
            .await?;

        Ok(ScrapeSummary {
            total_results: value
                .get("total_results")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            scraped_at: value
                .pointer("/data/created_at")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    async fn search_images(&self, keyword_set_id: &str) -> AppResult<ImageCatalog> {
        let endpoint = format!("/search-images/{}", keyword_set_id);
        let value: Value = self
            .send_json(&endpoint, self.http.post(self.url(&endpoint)))
            .await?;
        let data = value.get("data").unwrap_or(&value);
        parse_image_catalog(data)
    }

    async fn start_draft(&self, keyword_set_id: &str) -> AppResult<String> {
        let endpoint = format!("/generate-blog/{}/start", keyword_set_id);
        let value: Value = self
            .send_json(&endpoint, self.http.post(self.url(&endpoint)))
            .await?;
        required(&value, "session_id", &endpoint)
    }

    async fn run_draft_step(
        &self,
        keyword_set_id: &str,
        draft_session_id: &str,
        step: DraftStep,
    ) -> AppResult<StepOutcome> {
        let endpoint = format!("/generate-blog/{}/step", keyword_set_id);
        let body = json!({
            "step": step.as_str(),
            "session_id": draft_session_id,
        });
        let value: Value = self
            .send_json(&endpoint, self.http.post(self.url(&endpoint)).json(&body))
            .await?;

        let result = value.get("result").cloned().unwrap_or(Value::Null);
        let fragments: DraftFragments = if result.is_object() {
            serde_json::from_value(result.clone())?
        } else {
            DraftFragments::default()
        };
        let blog = match result.get("blog") {
            Some(blog) if !blog.is_null() => Some(serde_json::from_value::<BlogArtifact>(blog.clone())?),
            _ => None,
        };

        Ok(StepOutcome { fragments, blog })
    }

    async fn get_blog(&self, keyword_set_id: &str) -> AppResult<Option<BlogArtifact>> {
        let endpoint = format!("/blog/{}", keyword_set_id);
        let result: AppResult<DataEnvelope<BlogArtifact>> = self
            .send_json(&endpoint, self.http.get(self.url(&endpoint)))
            .await;

        match result {
            Ok(envelope) => Ok(Some(envelope.data)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn integrate_images(
        &self,
        keyword_set_id: &str,
        image_ids: &[String],
    ) -> AppResult<IntegrationPreview> {
        let endpoint = format!("/integrate-images/{}", keyword_set_id);
        let body = json!({ "selected_images": image_ids });
        self.send_json(&endpoint, self.http.post(self.url(&endpoint)).json(&body))
            .await
    }

    async fn generate_metadata(&self, keyword_set_id: &str) -> AppResult<FinalizedBlog> {
        let endpoint = format!("/generate-metadata/{}", keyword_set_id);
        self.send_json(&endpoint, self.http.post(self.url(&endpoint)))
            .await
    }

    async fn download_blog(&self, keyword_set_id: &str) -> AppResult<Vec<u8>> {
        let endpoint = format!("/download-blog/{}", keyword_set_id);
        self.send_bytes(&endpoint, self.http.get(self.url(&endpoint)))
            .await
    }

    async fn upload_batch(&self, filename: &str, content: Vec<u8>) -> AppResult<BatchUpload> {
        let endpoint = "/batch-upload";
        let part = multipart::Part::bytes(content).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);

        self.send_json(
            endpoint,
            self.http
                .post(self.url(endpoint))
                .multipart(form)
                .timeout(self.upload_timeout),
        )
        .await
    }

    async fn get_batch_status(&self, job_id: &str) -> AppResult<BatchJob> {
        let endpoint = format!("/batch-status/{}", job_id);
        let mut job: BatchJob = self
            .send_json(&endpoint, self.http.get(self.url(&endpoint)))
            .await?;
        if job.job_id.is_empty() {
            job.job_id = job_id.to_string();
        }
        Ok(job)
    }

    async fn list_batch_jobs(&self) -> AppResult<Vec<BatchJob>> {
        let endpoint = "/batch-jobs";
        let envelope: DataEnvelope<Vec<BatchJob>> = self
            .send_json(endpoint, self.http.get(self.url(endpoint)))
            .await?;
        Ok(envelope.data)
    }

    async fn preview_batch_item(&self, item_id: &str) -> AppResult<BlogPreview> {
        let endpoint = format!("/batch-blog-preview/{}", item_id);
        self.send_json(&endpoint, self.http.get(self.url(&endpoint)))
            .await
    }

    async fn download_batch_item(
        &self,
        item_id: &str,
        format: OutputFormat,
    ) -> AppResult<Vec<u8>> {
        let endpoint = format!("/batch-download-blog/{}/{}", item_id, format.as_str());
        self.send_bytes(&endpoint, self.http.get(self.url(&endpoint)))
            .await
    }
}
