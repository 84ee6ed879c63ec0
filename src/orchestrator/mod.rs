//! 编排层（Orchestration Layer）
//!
//! 每个子命令一个模块，只做资源准备和流程调度：
//!
//! ```text
//! main (cli)
//!   ├─ orchestrator::research → research::Investigator → ResearchProvider
//!   └─ orchestrator::publish  → publisher::publish_document → ChromiumDriver → JsExecutor
//! ```
//!
//! 只有编排层持有 Browser；业务逻辑放在 `research` / `publisher` 中。

pub mod publish;
pub mod research;
