//! # Blog Workflow
//!
//! 驱动远程 SEO 博客生成服务的客户端：手动模式逐步生成单篇博客，批量模式上传表格并监控任务
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有本地状态，只暴露能力
//! - `SessionStore` - 每种模式一条会话记录，带有效期
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ContentService` - 远程内容生成服务的契约（`clients::ContentClient` 为 HTTP 实现）
//! - `ResultsExporter` - 批量结果导出 CSV
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个关键词组"的完整处理流程
//! - `ManualStage` - 阶段状态机（纯函数）
//! - `DraftDriver` - 十步草稿生成
//! - `ManualFlow` - 流程编排（keywords → scrape → images → draft → integrate → metadata）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 命令分发
//! - `orchestrator/batch_dispatch` - 批量上传、恢复、条目操作
//! - `orchestrator/batch_monitor` - 可取消的后台轮询
//! - `orchestrator/mode_guard` - 模式切换确认
//!
//! ## 模块结构

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::ContentClient;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::SessionStore;
pub use models::{SessionMode, SessionRecord};
pub use orchestrator::{App, BatchDispatcher, BatchMonitor, ModeSwitchGuard};
pub use services::{ContentService, MockContentService, ResultsExporter};
pub use workflow::{Confirmer, ManualFlow, ManualStage};
