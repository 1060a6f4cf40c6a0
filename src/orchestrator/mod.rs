//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责命令分发、批量任务调度和模式切换，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 初始化日志文件、服务客户端和会话存储
//! - 把命令行子命令分发给手动流程或批量分发器
//!
//! ### `batch_dispatch` - 批量上传与分发
//! - 校验并上传表格，写入批量会话
//! - 恢复批量会话（向服务端确认一次）
//! - 单个条目的预览和下载
//!
//! ### `batch_monitor` - 批量任务监控
//! - 后台定时轮询，终态或取消时停止
//! - 通过 watch 通道发布快照
//!
//! ### `mode_guard` - 模式切换保护
//! - 另一种模式有会话时要求确认
//!
//! ## 层次关系
//!
//! ```text
//! app (处理命令)
//!     ↓
//! batch_dispatch / batch_monitor / mode_guard     workflow::ManualFlow
//!     ↓                                               ↓
//! services (能力层：ContentService / ResultsExporter)
//!     ↓
//! infrastructure (基础设施：SessionStore)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：dispatch 管提交，monitor 管轮询
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **后台任务可取消**：监控任务总是由句柄控制

pub mod app;
pub mod batch_dispatch;
pub mod batch_monitor;
pub mod mode_guard;

// 重新导出主要类型
pub use app::App;
pub use batch_dispatch::{validate_spreadsheet, BatchDispatcher, BatchResume};
pub use batch_monitor::{
    derive_stage, BatchMonitor, ItemView, MonitorExit, MonitorHandle, MonitorSnapshot,
    ProcessingStage,
};
pub use mode_guard::{ModeSwitchGuard, SwitchOutcome};
