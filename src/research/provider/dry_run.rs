//! 演练模式：不发出任何外部请求

use tracing::info;

use super::{GenerationRequest, GenerationResponse, ResearchProvider};
use crate::error::LlmError;

/// 演练模式下 LLM 规划返回的主题
pub const MOCK_TOPICS: [&str; 5] = [
    "Mock Topic 1",
    "Mock Topic 2",
    "Mock Topic 3",
    "Mock Topic 4",
    "Mock Topic 5",
];

/// 演练模式下检索返回的内容
pub const MOCK_CONTENT: &str = "# Bundled Content\n(Mock Data)";

#[derive(Debug, Default, Clone)]
pub struct DryRunProvider;

impl ResearchProvider for DryRunProvider {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        info!("      [Dry Run] 跳过 API 调用 (模型: {})", model);
        let text = if request.json_output {
            serde_json::to_string(&MOCK_TOPICS).unwrap_or_default()
        } else {
            MOCK_CONTENT.to_string()
        };
        Ok(GenerationResponse::from_text(text))
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(vec!["dry-run".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_request_returns_mock_topics() {
        let response = DryRunProvider
            .generate("m", &GenerationRequest::json("plan"))
            .await
            .unwrap();
        let topics: Vec<String> = serde_json::from_str(&response.text).unwrap();
        assert_eq!(topics.len(), 5);
    }

    #[tokio::test]
    async fn test_grounded_request_returns_mock_content() {
        let response = DryRunProvider
            .generate("m", &GenerationRequest::grounded("research"))
            .await
            .unwrap();
        assert_eq!(response.text, MOCK_CONTENT);
        assert!(response.grounding.is_none());
    }
}
