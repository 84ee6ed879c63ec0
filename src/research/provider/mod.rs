//! LLM 供应商
//!
//! 调研流程只依赖 [`ResearchProvider`]：一次请求 = 提示词 + 是否要求 JSON 输出
//! + 是否启用检索工具；响应 = 文本 + 检索来源。

pub mod dry_run;
pub mod gemini;
pub mod openai;

pub use dry_run::DryRunProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::error::LlmError;

/// 生成请求
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// 要求结构化（JSON）输出
    pub json_output: bool,
    /// 启用检索工具（grounded search）
    pub search_grounding: bool,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_output: true,
            search_grounding: false,
        }
    }

    pub fn grounded(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json_output: false,
            search_grounding: true,
        }
    }
}

/// 检索来源
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundingSource {
    pub title: Option<String>,
    pub uri: String,
}

/// 检索元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundingMetadata {
    pub search_queries: Vec<String>,
    pub sources: Vec<GroundingSource>,
}

/// 生成响应
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: String,
    pub grounding: Option<GroundingMetadata>,
}

impl GenerationResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grounding: None,
        }
    }
}

/// 文本生成供应商
#[allow(async_fn_in_trait)]
pub trait ResearchProvider {
    /// 用指定模型生成内容
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<GenerationResponse, LlmError>;

    /// 列出可用模型
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

/// 运行时选择的供应商
pub enum AnyProvider {
    Gemini(GeminiProvider),
    OpenAi(OpenAiProvider),
    DryRun(DryRunProvider),
}

impl ResearchProvider for AnyProvider {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        match self {
            AnyProvider::Gemini(p) => p.generate(model, request).await,
            AnyProvider::OpenAi(p) => p.generate(model, request).await,
            AnyProvider::DryRun(p) => p.generate(model, request).await,
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        match self {
            AnyProvider::Gemini(p) => p.list_models().await,
            AnyProvider::OpenAi(p) => p.list_models().await,
            AnyProvider::DryRun(p) => p.list_models().await,
        }
    }
}
