//! Gemini REST 供应商
//!
//! 直接调用 `generateContent`，检索通过 `google_search` 工具完成。

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use super::{GenerationRequest, GenerationResponse, GroundingMetadata, GroundingSource, ResearchProvider};
use crate::error::LlmError;

/// Gemini 客户端
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base_url, model)
    }
}

/// 构建请求体
pub(crate) fn build_body(request: &GenerationRequest) -> JsonValue {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
    });
    if request.search_grounding {
        body["tools"] = json!([{ "google_search": {} }]);
    }
    if request.json_output {
        body["generationConfig"] = json!({ "responseMimeType": "application/json" });
    }
    body
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<RawGrounding>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawGrounding {
    web_search_queries: Vec<String>,
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebChunk {
    uri: String,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    code: Option<u16>,
    status: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelList {
    models: Vec<ModelEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelEntry {
    name: String,
}

/// 解析成功响应：拼接第一个候选的所有文本片段
pub(crate) fn parse_response(model: &str, body: &str) -> Result<GenerationResponse, LlmError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ApiCallFailed {
            model: model.to_string(),
            message: format!("响应解析失败: {}", e),
        })?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::EmptyContent { model: model.to_string() })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyContent { model: model.to_string() });
    }

    let grounding = candidate.grounding_metadata.map(|g| GroundingMetadata {
        search_queries: g.web_search_queries,
        sources: g
            .grounding_chunks
            .into_iter()
            .filter_map(|c| c.web)
            .map(|w| GroundingSource { title: w.title, uri: w.uri })
            .collect(),
    });

    Ok(GenerationResponse { text, grounding })
}

/// 把错误响应分类为配额类或普通失败
pub(crate) fn classify_error(model: &str, status: u16, body: &str) -> LlmError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let message = format!(
        "{} {}: {}",
        envelope.error.code.unwrap_or(status),
        envelope.error.status.unwrap_or_default(),
        envelope.error.message.unwrap_or_else(|| body.to_string())
    );
    LlmError::classify(model, Some(status), message)
}

impl ResearchProvider for GeminiProvider {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        debug!(
            "调用 Gemini，模型: {}，检索: {}，JSON: {}",
            model, request.search_grounding, request.json_output
        );
        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| LlmError::classify(model, e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::classify(model, None, e.to_string()))?;

        if !status.is_success() {
            let err = classify_error(model, status.as_u16(), &body);
            warn!("Gemini 调用失败: {}", err);
            return Err(err);
        }

        let parsed = parse_response(model, &body)?;
        if let Some(grounding) = &parsed.grounding {
            debug!(
                "检索查询 {} 条，来源 {} 个",
                grounding.search_queries.len(),
                grounding.sources.len()
            );
        }
        Ok(parsed)
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/models?pageSize=1000", self.api_base_url);
        let response = self
            .http
            .get(url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| LlmError::classify("-", None, e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::classify("-", None, e.to_string()))?;
        if !status.is_success() {
            return Err(classify_error("-", status.as_u16(), &body));
        }
        let list: ModelList = serde_json::from_str(&body).map_err(|e| LlmError::ApiCallFailed {
            model: "-".to_string(),
            message: e.to_string(),
        })?;
        Ok(list.models.into_iter().map(|m| m.name).collect())
    }
}
