use blog_workflow::error::{ApiError, AppError};
use blog_workflow::models::{DraftStep, JobStatus, KeywordInput, OutputFormat};
use blog_workflow::services::ContentService;
use blog_workflow::ContentClient;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> ContentClient {
    ContentClient::with_base_url(format!("{}/api", server.uri()))
}

#[tokio::test]
async fn test_create_keyword_set_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/keywords"))
        .and(body_json(json!({
            "main_keyword": "Automated Welding",
            "keywords": ["robotic welding", "welding automation", "industrial welding", "smart welding"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "Keywords saved successfully",
            "data": {
                "_id": "65f1c0ffee",
                "main_keyword": "Automated Welding",
                "keywords": ["robotic welding", "welding automation", "industrial welding", "smart welding"],
                "created_at": "2024-03-13T10:00:00",
                "status": "created"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keywords = KeywordInput::new(
        " Automated Welding ",
        vec![
            "robotic welding".to_string(),
            "welding automation".to_string(),
            "".to_string(),
            "industrial welding".to_string(),
            "smart welding".to_string(),
        ],
    )
    .validate()
    .expect("关键词应该有效");

    let client = client_for(&server).await;
    let created = client
        .create_keyword_set(&keywords)
        .await
        .expect("创建关键词组失败");
    assert_eq!(created.id, "65f1c0ffee");
    assert_eq!(created.supporting_keywords.len(), 4);
}

#[tokio::test]
async fn test_error_body_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scrape/kw-1"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "Content already scraped for this keyword batch"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .scrape_content("kw-1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Api(ApiError::BadResponse { status: 400, .. })
    ));
    assert_eq!(
        err.user_message(),
        "Content already scraped for this keyword batch"
    );
}

#[tokio::test]
async fn test_error_without_body_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate-metadata/kw-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .generate_metadata("kw-1")
        .await
        .unwrap_err();
    assert_eq!(
        err.user_message(),
        "Something went wrong while contacting the service"
    );
}

#[tokio::test]
async fn test_not_found_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/batch-status/batch_gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Batch job not found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/blog/kw-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Blog not found"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client
        .get_batch_status("batch_gone")
        .await
        .unwrap_err()
        .is_not_found());
    // 博客不存在不是错误
    assert_eq!(client.get_blog("kw-1").await.expect("查询博客失败"), None);
}

#[tokio::test]
async fn test_batch_status_fills_job_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/batch-status/batch_20240313_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed_with_errors",
            "total_keywords": 10,
            "processed": 8,
            "failed": 2,
            "current_keyword": "",
            "progress_percentage": 100.0,
            "results": [
                {"main_keyword": "robotic welding", "status": "success", "keyword_id": "kw-1", "completed_at": "2024-03-13T10:00:00"},
                {"main_keyword": "laser cutting", "status": "failed", "error": "scrape failed", "failed_at": "2024-03-13T10:01:00"}
            ],
            "filename": "keywords.xlsx"
        })))
        .mount(&server)
        .await;

    let job = client_for(&server)
        .await
        .get_batch_status("batch_20240313_abc")
        .await
        .expect("查询批量状态失败");
    assert_eq!(job.job_id, "batch_20240313_abc");
    assert_eq!(job.status, JobStatus::CompletedWithErrors);
    assert_eq!(job.progress(), 100.0);
    assert_eq!(job.results[0].artifact_id.as_deref(), Some("kw-1"));
    assert!(job.results[0].is_downloadable());
    assert!(!job.results[1].is_downloadable());
}

#[tokio::test]
async fn test_draft_step_sends_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate-blog/kw-1/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Blog generation session started",
            "session_id": "sess-42"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate-blog/kw-1/step"))
        .and(body_json(json!({"step": "title_tag", "session_id": "sess-42"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "step": "title_tag",
            "result": {"title": "Automated Welding: A Complete Guide"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate-blog/kw-1/step"))
        .and(body_json(json!({"step": "finalize", "session_id": "sess-42"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "step": "finalize",
            "result": {
                "blog": {"_id": "blog-7", "keyword_id": "kw-1", "title": "Automated Welding", "word_count": 1580}
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let session_id = client.start_draft("kw-1").await.expect("开始草稿失败");
    assert_eq!(session_id, "sess-42");

    let outcome = client
        .run_draft_step("kw-1", &session_id, DraftStep::TitleTag)
        .await
        .expect("执行草稿步骤失败");
    assert_eq!(
        outcome.fragments.title.as_deref(),
        Some("Automated Welding: A Complete Guide")
    );
    assert!(outcome.blog.is_none());

    let outcome = client
        .run_draft_step("kw-1", &session_id, DraftStep::Finalize)
        .await
        .expect("执行草稿步骤失败");
    assert_eq!(outcome.blog.expect("应该返回博客").id, "blog-7");
}

#[tokio::test]
async fn test_upload_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/batch-upload"))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Batch processing started",
            "job_id": "batch_20240313_abc",
            "total_keywords": 10,
            "status": "started"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let upload = client_for(&server)
        .await
        .upload_batch("keywords.xlsx", b"fake excel".to_vec())
        .await
        .expect("上传失败");
    assert_eq!(upload.job_id, "batch_20240313_abc");
    assert_eq!(upload.total_keywords, 10);

    let requests = server.received_requests().await.expect("应该记录请求");
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"keywords.xlsx\""));
    assert!(body.contains("fake excel"));
}

#[tokio::test]
async fn test_download_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/batch-download-blog/kw-1/html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server)
        .await
        .with_timeouts(Duration::from_secs(30), Duration::from_millis(50));
    let err = client
        .download_batch_item("kw-1", OutputFormat::Html)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Api(ApiError::Timeout { .. })));
    assert_eq!(err.user_message(), "Request timed out, please try again");
}
