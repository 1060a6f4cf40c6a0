//! 手动模式的阶段状态机
//!
//! 阶段编号即当前展示的步骤：1 输入关键词，2 抓取，3 搜图，4 分步生成，5 集成图片，6 元数据。
//! 只有前一步的远程调用成功后才会进入下一阶段。这里只有纯函数，不做任何 I/O。

use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ManualStage {
    KeywordsEntered = 1,
    Scraped = 2,
    ImagesSearched = 3,
    BlogDrafted = 4,
    ImagesIntegrated = 5,
    MetadataFinalized = 6,
}

impl ManualStage {
    pub fn from_number(number: u8) -> Option<ManualStage> {
        match number {
            1 => Some(ManualStage::KeywordsEntered),
            2 => Some(ManualStage::Scraped),
            3 => Some(ManualStage::ImagesSearched),
            4 => Some(ManualStage::BlogDrafted),
            5 => Some(ManualStage::ImagesIntegrated),
            6 => Some(ManualStage::MetadataFinalized),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    /// 当前阶段要做的事
    pub fn title(self) -> &'static str {
        match self {
            ManualStage::KeywordsEntered => "Enter Keywords",
            ManualStage::Scraped => "Scrape Content",
            ManualStage::ImagesSearched => "Search Images",
            ManualStage::BlogDrafted => "Generate Blog",
            ManualStage::ImagesIntegrated => "Integrate Images",
            ManualStage::MetadataFinalized => "Generate Metadata",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ManualStage::MetadataFinalized
    }

    /// 计算执行 `action` 之后的阶段
    ///
    /// 不允许的操作返回 `InvalidTransition`，调用方据此在发出远程请求之前拒绝
    pub fn apply(self, action: ManualAction) -> Result<ManualStage, WorkflowError> {
        use ManualAction::*;
        use ManualStage::*;

        let next = match (self, action) {
            (_, Reset) => KeywordsEntered,
            (KeywordsEntered, SubmitKeywords) | (KeywordsEntered, SelectKeywordSet) => Scraped,
            (Scraped, Scrape) => ImagesSearched,
            (ImagesSearched, SearchImages) => BlogDrafted,
            (BlogDrafted, RunDraftStep) => BlogDrafted,
            (BlogDrafted, DraftFinalized) => ImagesIntegrated,
            (ImagesIntegrated, IntegrateImages) => MetadataFinalized,
            (MetadataFinalized, GenerateMetadata) => MetadataFinalized,
            (MetadataFinalized, Download) => MetadataFinalized,
            (stage, action) => {
                return Err(WorkflowError::InvalidTransition {
                    stage: stage.number(),
                    action: action.as_str().to_string(),
                })
            }
        };
        Ok(next)
    }
}

impl std::fmt::Display for ManualStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Step {}: {}", self.number(), self.title())
    }
}

/// 用户在手动模式中可以触发的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManualAction {
    SubmitKeywords,
    SelectKeywordSet,
    Scrape,
    SearchImages,
    RunDraftStep,
    DraftFinalized,
    IntegrateImages,
    GenerateMetadata,
    Download,
    Reset,
}

impl ManualAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ManualAction::SubmitKeywords => "submit_keywords",
            ManualAction::SelectKeywordSet => "select_keyword_set",
            ManualAction::Scrape => "scrape",
            ManualAction::SearchImages => "search_images",
            ManualAction::RunDraftStep => "run_draft_step",
            ManualAction::DraftFinalized => "draft_finalized",
            ManualAction::IntegrateImages => "integrate_images",
            ManualAction::GenerateMetadata => "generate_metadata",
            ManualAction::Download => "download",
            ManualAction::Reset => "reset",
        }
    }
}
