//! 模型降级
//!
//! 候选列表 = 用户指定模型（若有）+ 固定的降级模型，去重且保持顺序。
//! 游标在一次运行中只前进不后退：某个模型配额耗尽后，后续所有调用都使用下一个模型。

use std::time::Duration;

use tracing::{info, warn};

use super::provider::{GenerationRequest, GenerationResponse, ResearchProvider};
use crate::error::LlmError;

/// 固定的降级模型（按优先级）
pub const FALLBACK_MODELS: [&str; 2] = ["gemini-2.5-flash", "gemini-2.5-flash-lite"];

/// 去掉 `models/` 前缀，`models/x` 与 `x` 视为同一模型
pub fn normalize_model(name: &str) -> String {
    name.trim().trim_start_matches("models/").to_string()
}

/// 生成候选模型列表
pub fn candidate_models(user_model: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let requested = user_model
        .map(normalize_model)
        .filter(|m| !m.is_empty());

    for model in requested.into_iter().chain(FALLBACK_MODELS.iter().map(|m| m.to_string())) {
        if !candidates.contains(&model) {
            candidates.push(model);
        }
    }
    candidates
}

/// 带游标的降级器
#[derive(Debug, Clone)]
pub struct ModelFallback {
    candidates: Vec<String>,
    cursor: usize,
    backoff: Duration,
}

impl ModelFallback {
    /// `candidates` 为空时退回固定降级列表
    pub fn new(candidates: Vec<String>, backoff: Duration) -> Self {
        let candidates = if candidates.is_empty() {
            candidate_models(None)
        } else {
            candidates
        };
        Self {
            candidates,
            cursor: 0,
            backoff,
        }
    }

    /// 当前模型
    pub fn current(&self) -> &str {
        &self.candidates[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// 切换到下一个模型；已经是最后一个时返回 `false`
    pub fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.candidates.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// 调用供应商，配额错误时切换模型并重试
    ///
    /// 非配额错误立即返回；最后一个模型也配额耗尽时返回原始配额错误。
    pub async fn run<P: ResearchProvider>(
        &mut self,
        provider: &P,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, LlmError> {
        loop {
            let model = self.current().to_string();
            match provider.generate(&model, request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_quota() => {
                    warn!("   [Quota] 模型 {} 配额耗尽", model);
                    if !self.advance() {
                        warn!("   [Quota] 所有模型均已耗尽，放弃");
                        return Err(err);
                    }
                    info!(
                        "   ⚠️ 切换到降级模型: {}，{}s 后重试",
                        self.current(),
                        self.backoff.as_secs()
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 按顺序返回预设结果，并记录被调用的模型
    struct Scripted {
        outcomes: Mutex<Vec<Result<&'static str, LlmError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<&'static str, LlmError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ResearchProvider for Scripted {
        async fn generate(&self, model: &str, _request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
            self.calls.lock().unwrap().push(model.to_string());
            let next = self.outcomes.lock().unwrap().pop().expect("unexpected call");
            next.map(GenerationResponse::from_text)
        }

        async fn list_models(&self) -> Result<Vec<String>, LlmError> {
            Ok(Vec::new())
        }
    }

    fn quota(model: &str) -> LlmError {
        LlmError::classify(model, Some(429), "RESOURCE_EXHAUSTED")
    }

    fn abc() -> Vec<String> {
        vec!["A".into(), "B".into(), "C".into()]
    }

    #[test]
    fn test_candidate_models() {
        assert_eq!(
            candidate_models(Some("gemini-3-pro")),
            vec!["gemini-3-pro", "gemini-2.5-flash", "gemini-2.5-flash-lite"]
        );
        assert_eq!(
            candidate_models(Some("models/gemini-2.5-flash")),
            vec!["gemini-2.5-flash", "gemini-2.5-flash-lite"]
        );
        assert_eq!(candidate_models(None), vec!["gemini-2.5-flash", "gemini-2.5-flash-lite"]);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut fallback = ModelFallback::new(abc(), Duration::ZERO);
        assert_eq!(fallback.current(), "A");
        assert!(fallback.advance());
        assert!(fallback.advance());
        assert!(!fallback.advance());
        assert_eq!(fallback.current(), "C");
        assert_eq!(fallback.cursor(), 2);
    }

    #[tokio::test]
    async fn test_quota_quota_success_ends_on_last() {
        let provider = Scripted::new(vec![Err(quota("A")), Err(quota("B")), Ok("done")]);
        let mut fallback = ModelFallback::new(abc(), Duration::ZERO);

        let response = fallback.run(&provider, &GenerationRequest::text("p")).await.unwrap();
        assert_eq!(response.text, "done");
        assert_eq!(fallback.current(), "C");
        assert_eq!(*provider.calls.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_all_quota_reraises_after_three_attempts() {
        let provider = Scripted::new(vec![Err(quota("A")), Err(quota("B")), Err(quota("C"))]);
        let mut fallback = ModelFallback::new(abc(), Duration::ZERO);

        let err = fallback.run(&provider, &GenerationRequest::text("p")).await.unwrap_err();
        assert!(err.is_quota());
        assert_eq!(provider.calls.lock().unwrap().len(), 3);
        assert_eq!(fallback.cursor(), 2);
    }

    #[tokio::test]
    async fn test_non_quota_error_does_not_advance() {
        let provider = Scripted::new(vec![Err(LlmError::classify("A", Some(500), "internal"))]);
        let mut fallback = ModelFallback::new(abc(), Duration::ZERO);

        let err = fallback.run(&provider, &GenerationRequest::text("p")).await.unwrap_err();
        assert!(!err.is_quota());
        assert_eq!(fallback.current(), "A");
    }

    #[tokio::test]
    async fn test_cursor_persists_across_calls() {
        let provider = Scripted::new(vec![Err(quota("A")), Ok("one"), Ok("two")]);
        let mut fallback = ModelFallback::new(abc(), Duration::ZERO);

        fallback.run(&provider, &GenerationRequest::text("p")).await.unwrap();
        fallback.run(&provider, &GenerationRequest::text("p")).await.unwrap();
        assert_eq!(*provider.calls.lock().unwrap(), vec!["A", "B", "B"]);
    }
}
