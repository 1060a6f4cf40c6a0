use crate::models::blog::BlogArtifact;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 分步生成博客的固定步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStep {
    Start,
    TitleTag,
    H1Heading,
    OpeningParagraph,
    Subheadings,
    ContentSections,
    Cta,
    Conclusion,
    QualityCheck,
    Finalize,
}

impl DraftStep {
    /// 全部步骤，按执行顺序排列
    pub const ALL: [DraftStep; 10] = [
        DraftStep::Start,
        DraftStep::TitleTag,
        DraftStep::H1Heading,
        DraftStep::OpeningParagraph,
        DraftStep::Subheadings,
        DraftStep::ContentSections,
        DraftStep::Cta,
        DraftStep::Conclusion,
        DraftStep::QualityCheck,
        DraftStep::Finalize,
    ];

    /// 按游标取步骤，越界返回 None（表示已全部完成）
    pub fn at(cursor: usize) -> Option<DraftStep> {
        Self::ALL.get(cursor).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// 服务端使用的步骤名
    pub fn as_str(self) -> &'static str {
        match self {
            DraftStep::Start => "start",
            DraftStep::TitleTag => "title_tag",
            DraftStep::H1Heading => "h1_heading",
            DraftStep::OpeningParagraph => "opening_paragraph",
            DraftStep::Subheadings => "subheadings",
            DraftStep::ContentSections => "content_sections",
            DraftStep::Cta => "cta",
            DraftStep::Conclusion => "conclusion",
            DraftStep::QualityCheck => "quality_check",
            DraftStep::Finalize => "finalize",
        }
    }

    /// 展示名称
    pub fn display_name(self) -> &'static str {
        match self {
            DraftStep::Start => "Start Generation",
            DraftStep::TitleTag => "Generate Title Tag",
            DraftStep::H1Heading => "Generate H1 Heading",
            DraftStep::OpeningParagraph => "Generate Opening Paragraph",
            DraftStep::Subheadings => "Generate Subheadings",
            DraftStep::ContentSections => "Generate Content Sections",
            DraftStep::Cta => "Generate Call to Action",
            DraftStep::Conclusion => "Generate Conclusion",
            DraftStep::QualityCheck => "Quality Check & Enhancement",
            DraftStep::Finalize => "Finalize Blog",
        }
    }
}

impl std::fmt::Display for DraftStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已生成的草稿片段
///
/// 每个字段由对应步骤写入；合并只覆盖对方带来的字段，不会删除已有字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftFragments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_paragraph: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sections: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_report: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_report: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement_done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_word_count: Option<u64>,
}

macro_rules! merge_fields {
    ($target:expr, $source:expr, $($field:ident),+ $(,)?) => {
        $(
            if $source.$field.is_some() {
                $target.$field = $source.$field;
            }
        )+
    };
}

impl DraftFragments {
    /// 合并新片段（同名字段以最后一次为准）
    pub fn merge(&mut self, other: DraftFragments) {
        merge_fields!(
            self,
            other,
            title,
            h1,
            opening_paragraph,
            subheadings,
            content_sections,
            cta,
            conclusion,
            quality_report,
            enhanced_report,
            enhancement_done,
            final_word_count,
        );
    }

    /// 已存在的片段名称
    pub fn present(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.title.is_some() {
            names.push("title");
        }
        if self.h1.is_some() {
            names.push("h1");
        }
        if self.opening_paragraph.is_some() {
            names.push("opening_paragraph");
        }
        if self.subheadings.is_some() {
            names.push("subheadings");
        }
        if self.content_sections.is_some() {
            names.push("content_sections");
        }
        if self.cta.is_some() {
            names.push("cta");
        }
        if self.conclusion.is_some() {
            names.push("conclusion");
        }
        if self.quality_report.is_some() {
            names.push("quality_report");
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }
}

/// 单步生成的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub fragments: DraftFragments,
    /// 仅 finalize 步骤返回完整博客
    pub blog: Option<BlogArtifact>,
}

/// 持久化到会话中的草稿进度
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_session_id: Option<String>,
    /// 下一个要执行的步骤下标
    #[serde(default)]
    pub cursor: usize,
    #[serde(default)]
    pub fragments: DraftFragments,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_id: Option<String>,
}
