//! 分步生成博客（第 4 步）
//!
//! 十个步骤按固定顺序执行，每次成功调用游标前进一步；失败时游标不动，重试同一步。

use crate::error::{AppResult, WorkflowError};
use crate::models::{BlogArtifact, DraftProgress, DraftStep};
use crate::services::ContentService;
use tracing::{debug, info};

/// 草稿生成驱动
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftDriver {
    progress: DraftProgress,
}

impl DraftDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从会话中保存的进度恢复
    pub fn from_progress(progress: DraftProgress) -> Self {
        Self { progress }
    }

    pub fn progress(&self) -> &DraftProgress {
        &self.progress
    }

    pub fn into_progress(self) -> DraftProgress {
        self.progress
    }

    /// 下一个要执行的步骤；全部完成后为 None
    pub fn next_step(&self) -> Option<DraftStep> {
        if self.progress.blog_id.is_some() {
            return None;
        }
        DraftStep::at(self.progress.cursor)
    }

    pub fn is_complete(&self) -> bool {
        self.next_step().is_none()
    }

    /// 服务端已有完整博客时直接进入完成状态
    pub fn mark_existing(&mut self, blog: &BlogArtifact) {
        info!("♻️ 博客已存在 ({})，跳过分步生成", blog.id);
        self.progress.blog_id = Some(blog.id.clone());
        self.progress.cursor = DraftStep::ALL.len();
    }

    /// 执行下一步
    ///
    /// # 返回
    /// 刚完成的步骤
    pub async fn advance(
        &mut self,
        service: &dyn ContentService,
        keyword_set_id: &str,
    ) -> AppResult<DraftStep> {
        let step = self.next_step().ok_or(WorkflowError::DraftComplete)?;
        debug!(
            "✍️ 执行草稿步骤 {}/{}: {}",
            step.index() + 1,
            DraftStep::ALL.len(),
            step.display_name()
        );

        if step == DraftStep::Start {
            let session_id = service.start_draft(keyword_set_id).await?;
            self.progress.draft_session_id = Some(session_id);
        } else {
            let session_id = self.progress.draft_session_id.clone().ok_or_else(|| {
                WorkflowError::InvalidTransition {
                    stage: 4,
                    action: step.as_str().to_string(),
                }
            })?;

            let outcome = service
                .run_draft_step(keyword_set_id, &session_id, step)
                .await?;
            self.progress.fragments.merge(outcome.fragments);

            if step == DraftStep::Finalize {
                self.progress.blog_id = Some(
                    outcome
                        .blog
                        .map(|b| b.id)
                        .unwrap_or_else(|| keyword_set_id.to_string()),
                );
            }
        }

        self.progress.cursor += 1;
        info!("✓ {} 完成", step.display_name());
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeywordSet;
    use crate::services::MockContentService;

    fn service() -> MockContentService {
        MockContentService::new().with_keyword_set(KeywordSet {
            id: "kw-1".to_string(),
            main_keyword: "Automated Welding".to_string(),
            supporting_keywords: Vec::new(),
            created_at: None,
            status: None,
        })
    }

    #[tokio::test]
    async fn test_runs_all_steps_in_order() {
        let service = service();
        let mut driver = DraftDriver::new();

        let mut executed = Vec::new();
        while !driver.is_complete() {
            executed.push(driver.advance(&service, "kw-1").await.unwrap());
        }

        assert_eq!(executed, DraftStep::ALL.to_vec());
        assert_eq!(driver.progress().cursor, 10);
        assert_eq!(driver.progress().blog_id.as_deref(), Some("blog-kw-1"));
        assert_eq!(driver.progress().draft_session_id.as_deref(), Some("draft-kw-1"));
        assert!(driver.progress().fragments.title.is_some());
        assert_eq!(service.call_count("start_draft"), 1);
        assert_eq!(service.call_count("run_draft_step"), 9);

        let err = driver.advance(&service, "kw-1").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Workflow(WorkflowError::DraftComplete)
        ));
    }

    #[tokio::test]
    async fn test_failure_keeps_cursor() {
        let service = service();
        let mut driver = DraftDriver::new();
        driver.advance(&service, "kw-1").await.unwrap();
        driver.advance(&service, "kw-1").await.unwrap();

        service.fail_on("run_draft_step:h1_heading");
        assert!(driver.advance(&service, "kw-1").await.is_err());
        assert_eq!(driver.progress().cursor, 2);
        assert_eq!(driver.next_step(), Some(DraftStep::H1Heading));

        service.clear_failure("run_draft_step:h1_heading");
        assert_eq!(
            driver.advance(&service, "kw-1").await.unwrap(),
            DraftStep::H1Heading
        );
        assert_eq!(driver.progress().cursor, 3);
        // 之前的片段仍然保留
        assert!(driver.progress().fragments.title.is_some());
        assert!(driver.progress().fragments.h1.is_some());
    }

    #[tokio::test]
    async fn test_resume_from_saved_progress() {
        let service = service();
        let mut driver = DraftDriver::new();
        for _ in 0..4 {
            driver.advance(&service, "kw-1").await.unwrap();
        }

        let saved = driver.clone().into_progress();
        let mut resumed = DraftDriver::from_progress(saved);
        assert_eq!(resumed.next_step(), Some(DraftStep::Subheadings));
        resumed.advance(&service, "kw-1").await.unwrap();
        assert_eq!(service.call_count("start_draft"), 1);
    }

    #[test]
    fn test_mark_existing_is_terminal() {
        let mut driver = DraftDriver::new();
        driver.mark_existing(&BlogArtifact {
            id: "blog-9".to_string(),
            keyword_id: Some("kw-1".to_string()),
            title: None,
            html_content: None,
            status: None,
            word_count: None,
        });
        assert!(driver.is_complete());
        assert_eq!(driver.next_step(), None);
    }
}
