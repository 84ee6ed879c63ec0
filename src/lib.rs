//! # Prosper
//!
//! 两个独立的内容生产工具：
//!
//! - **Publisher**：把 Markdown 文章逐行翻译成编辑器操作，通过 Chrome DevTools
//!   协议写入 note.com 编辑器（标题、头图、标题块、列表、引用、图片、付费分隔线）
//! - **Investigator**：可续跑的深度调研。规划主题 → 每 5 个主题打包一次检索请求
//!   → 每批落盘 → 配额耗尽时按模型降级 → 拼接成 Markdown 报告
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 连接或启动 Chromium
//! - `infrastructure/` - `JsExecutor`，唯一的 page owner
//!
//! ### ② 业务层
//! - `publisher/` - 行分类、编辑器命令翻译、`UiDriver` 执行
//! - `research/` - 会话状态、模型降级、供应商、规划、报告
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/research` - 选择供应商并运行调研
//! - `orchestrator/publish` - 准备浏览器并发布文章
//!
//! ## 模块结构

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod orchestrator;
pub mod publisher;
pub mod research;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use publisher::{translate_lines, ChromiumDriver, Document, EditorCommand, UiDriver};
pub use research::{Investigator, ModelFallback, ResearchProvider, ResearchSession, RunOutcome};
