//! 兼容 OpenAI API 的供应商
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 Chat Completions 调用
//! - 支持自定义 API 端点（如 Gemini 的 OpenAI 兼容端点、Azure、Doubao 等）
//!
//! Chat Completions 没有通用的检索工具，`search_grounding` 请求会按普通请求发送。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{GenerationRequest, GenerationResponse, ResearchProvider};
use crate::error::LlmError;

/// OpenAI 兼容客户端
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelEntry {
    id: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();

        let openai_config = OpenAIConfig::new()
            .with_api_key(&api_key)
            .with_api_base(&api_base_url);

        Self {
            client: Client::with_config(openai_config),
            http: reqwest::Client::new(),
            api_key,
            api_base_url,
        }
    }

    fn build_request(
        model: &str,
        request: &GenerationRequest,
    ) -> Result<async_openai::types::chat::CreateChatCompletionRequest, LlmError> {
        let invalid = |e: async_openai::error::OpenAIError| LlmError::ApiCallFailed {
            model: model.to_string(),
            message: e.to_string(),
        };

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.prompt.as_str())
            .build()
            .map_err(invalid)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(model)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(0.3);
        if request.json_output {
            args.response_format(ResponseFormat::JsonObject);
        }
        args.build().map_err(invalid)
    }
}

impl ResearchProvider for OpenAiProvider {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        debug!("调用 LLM API，模型: {}", model);
        if request.search_grounding {
            debug!("Chat Completions 不支持检索工具，按普通请求发送");
        }

        let chat_request = Self::build_request(model, request)?;
        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            // Debug 形式包含错误类型和代码（rate_limit_exceeded / insufficient_quota）
            LlmError::classify(model, None, format!("{:?}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent { model: model.to_string() })?;

        Ok(GenerationResponse::from_text(content.trim()))
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .http
            .get(format!("{}/models", self.api_base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| LlmError::classify("-", None, e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::classify("-", None, e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::classify("-", Some(status.as_u16()), body));
        }
        let list: ModelList = serde_json::from_str(&body).map_err(|e| LlmError::ApiCallFailed {
            model: "-".to_string(),
            message: e.to_string(),
        })?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}
