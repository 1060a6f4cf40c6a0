//! 流程层（Workflow Layer）
//!
//! 定义手动模式"一个关键词组"的完整处理流程，只依赖 services 和 infrastructure。

pub mod confirm;
pub mod draft_driver;
pub mod manual_flow;
pub mod manual_stage;

pub use confirm::{AssumeYes, Confirmer};
pub use draft_driver::DraftDriver;
pub use manual_flow::{ManualFlow, ResumeOutcome, MAX_SELECTED_IMAGES};
pub use manual_stage::{ManualAction, ManualStage};
