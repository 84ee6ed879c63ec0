//! 深度调研
//!
//! - `session`: 会话状态与持久化
//! - `fallback`: 候选模型与降级游标
//! - `provider`: LLM 供应商
//! - `planner` / `prompt`: 主题规划与提示词
//! - `report`: 报告汇总
//! - `investigator`: 调研状态机

pub mod fallback;
pub mod investigator;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod report;
pub mod session;

pub use fallback::{candidate_models, ModelFallback};
pub use investigator::{Investigator, InvestigatorOptions, RunOutcome};
pub use provider::{AnyProvider, GenerationRequest, GenerationResponse, ResearchProvider};
pub use session::{ResearchSession, BATCH_SIZE, BUNDLED_MARKER};
