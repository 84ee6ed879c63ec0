use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use prosper::error::LlmError;
use prosper::research::provider::{GenerationRequest, GenerationResponse, ResearchProvider};
use prosper::research::session::{session_id, state_path};
use prosper::research::{Investigator, InvestigatorOptions, ModelFallback, ResearchSession, RunOutcome};

/// 调用计数，测试结束后检查
#[derive(Default)]
struct Calls {
    planning: AtomicUsize,
    grounded: AtomicUsize,
    models: Mutex<Vec<String>>,
}

/// 按主题生成确定性内容的脚本化供应商
struct ScriptedProvider {
    topics: Vec<String>,
    /// 从第几次（0 起）检索调用开始一直返回配额错误
    quota_from: Option<usize>,
    /// 第几次检索调用返回普通错误
    fail_at: Option<usize>,
    calls: Arc<Calls>,
}

impl ScriptedProvider {
    fn new(topics: &[String], calls: Arc<Calls>) -> Self {
        Self {
            topics: topics.to_vec(),
            quota_from: None,
            fail_at: None,
            calls,
        }
    }
}

/// 从提示词中取出代表主题
fn representative(prompt: &str) -> String {
    prompt
        .lines()
        .map(str::trim)
        .find_map(|l| l.strip_prefix("- ").or_else(|| l.strip_prefix("Topic: ")))
        .unwrap_or("?")
        .to_string()
}

impl ResearchProvider for ScriptedProvider {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.calls.models.lock().unwrap().push(model.to_string());
        if request.json_output {
            self.calls.planning.fetch_add(1, Ordering::SeqCst);
            return Ok(GenerationResponse::from_text(serde_json::to_string(&self.topics).unwrap()));
        }

        assert!(request.search_grounding);
        let n = self.calls.grounded.fetch_add(1, Ordering::SeqCst);
        if self.quota_from.is_some_and(|q| n >= q) {
            return Err(LlmError::classify(model, Some(429), "RESOURCE_EXHAUSTED"));
        }
        if self.fail_at == Some(n) {
            return Err(LlmError::classify(model, Some(500), "INTERNAL"));
        }
        Ok(GenerationResponse::from_text(format!(
            "facts about {}",
            representative(&request.prompt)
        )))
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(vec!["a".to_string(), "b".to_string()])
    }
}

fn topics(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("T{}", i)).collect()
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn options(dir: &Path) -> InvestigatorOptions {
    InvestigatorOptions {
        state_dir: dir.join("state"),
        reports_dir: dir.join("reports"),
        rules_path: dir.join("RESEARCH_RULES.md"),
        cooldown: Duration::ZERO,
    }
}

fn investigator(dir: &Path, provider: ScriptedProvider) -> Investigator<ScriptedProvider> {
    Investigator::new(
        provider,
        ModelFallback::new(vec!["a".to_string(), "b".to_string()], Duration::ZERO),
        options(dir),
    )
}

async fn load_state(dir: &Path, theme: &str) -> ResearchSession {
    let path = state_path(&dir.join("state"), &session_id(theme, now().date()));
    ResearchSession::load(&path).await.unwrap().expect("state file")
}

#[tokio::test]
async fn resumed_run_matches_uninterrupted_run() {
    let planned = topics(12);

    // 一次跑完
    let full_dir = tempfile::tempdir().unwrap();
    let full_calls = Arc::new(Calls::default());
    let mut full = investigator(full_dir.path(), ScriptedProvider::new(&planned, full_calls.clone()));
    let full_outcome = full.run_at("Theme", None, true, now()).await.unwrap();
    let RunOutcome::Completed { report_path: full_report } = full_outcome else {
        panic!("unexpected outcome: {:?}", full_outcome);
    };
    assert_eq!(full_calls.grounded.load(Ordering::SeqCst), 3);

    // 第一次在第二批配额耗尽，第二次续跑
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(Calls::default());
    let mut limited = ScriptedProvider::new(&planned, calls.clone());
    limited.quota_from = Some(1);
    let outcome = investigator(dir.path(), limited)
        .run_at("Theme", None, true, now())
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::QuotaExhausted { .. }));
    assert_eq!(load_state(dir.path(), "Theme").await.results.len(), 5);

    let resume_calls = Arc::new(Calls::default());
    let outcome = investigator(dir.path(), ScriptedProvider::new(&planned, resume_calls.clone()))
        .run_at("Theme", None, true, now())
        .await
        .unwrap();
    let RunOutcome::Completed { report_path } = outcome else {
        panic!("unexpected outcome: {:?}", outcome);
    };

    // 续跑不重新规划，也不重复已完成的批次
    assert_eq!(resume_calls.planning.load(Ordering::SeqCst), 0);
    assert_eq!(resume_calls.grounded.load(Ordering::SeqCst), 2);

    let full_state = load_state(full_dir.path(), "Theme").await;
    let resumed_state = load_state(dir.path(), "Theme").await;
    assert_eq!(resumed_state.topics, full_state.topics);
    assert_eq!(resumed_state.results, full_state.results);

    let full_text = tokio::fs::read_to_string(full_report).await.unwrap();
    let resumed_text = tokio::fs::read_to_string(report_path).await.unwrap();
    assert_eq!(resumed_text, full_text);
    assert!(full_text.contains("## T1\n\nfacts about T1"));
    assert!(full_text.contains("## T11\n\nfacts about T11"));
    assert!(!full_text.contains("## T2\n"));
}

#[tokio::test]
async fn quota_exhaustion_keeps_completed_batches() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(Calls::default());
    let mut provider = ScriptedProvider::new(&topics(12), calls.clone());
    provider.quota_from = Some(1);

    let outcome = investigator(dir.path(), provider)
        .run_at("Theme", None, true, now())
        .await
        .unwrap();

    let expected_state = state_path(&dir.path().join("state"), &session_id("Theme", now().date()));
    assert_eq!(outcome, RunOutcome::QuotaExhausted { state_path: expected_state });

    // 第二批: a 配额耗尽 → b 配额耗尽 → 停止，不再尝试第三批
    assert_eq!(calls.grounded.load(Ordering::SeqCst), 3);
    assert_eq!(*calls.models.lock().unwrap(), vec!["a", "a", "a", "b"]);

    let state = load_state(dir.path(), "Theme").await;
    assert_eq!(state.pending_topics(), topics(12)[5..].to_vec());
    assert!(!dir.path().join("reports").exists());
}

#[tokio::test]
async fn failed_batch_is_skipped_and_retried_on_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let planned = topics(12);
    let mut provider = ScriptedProvider::new(&planned, Arc::new(Calls::default()));
    provider.fail_at = Some(1);

    let outcome = investigator(dir.path(), provider)
        .run_at("Theme", None, true, now())
        .await
        .unwrap();
    let RunOutcome::Incomplete { pending, .. } = outcome else {
        panic!("unexpected outcome: {:?}", outcome);
    };
    assert_eq!(pending, planned[5..10].to_vec());

    // 第三批照常完成
    let state = load_state(dir.path(), "Theme").await;
    assert_eq!(state.results["T11"], "facts about T11");

    let outcome = investigator(dir.path(), ScriptedProvider::new(&planned, Arc::new(Calls::default())))
        .run_at("Theme", None, true, now())
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    assert!(load_state(dir.path(), "Theme").await.is_complete());
}

#[tokio::test]
async fn unparsable_plan_falls_back_to_default_topics() {
    struct Garbled;

    impl ResearchProvider for Garbled {
        async fn generate(&self, _model: &str, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
            if request.json_output {
                Ok(GenerationResponse::from_text("Sure! Here are some topics: ..."))
            } else {
                Ok(GenerationResponse::from_text("content"))
            }
        }

        async fn list_models(&self) -> Result<Vec<String>, LlmError> {
            Ok(Vec::new())
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let mut investigator = Investigator::new(
        Garbled,
        ModelFallback::new(Vec::new(), Duration::ZERO),
        options(dir.path()),
    );
    let planned = investigator.plan("X", true).await.unwrap();
    assert_eq!(planned, vec!["X Overview", "X History", "X Impact"]);
}

/// 规划结果固定、检索结果固定的供应商
struct FixedPlan(&'static str);

impl ResearchProvider for FixedPlan {
    async fn generate(&self, _model: &str, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        if request.json_output {
            Ok(GenerationResponse::from_text(self.0))
        } else {
            Ok(GenerationResponse::from_text("REAL CONTENT"))
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn repeated_planned_topic_keeps_research_content() {
    let dir = tempfile::tempdir().unwrap();
    let mut investigator = Investigator::new(
        FixedPlan(r#"["A", "B", "A"]"#),
        ModelFallback::new(Vec::new(), Duration::ZERO),
        options(dir.path()),
    );

    let outcome = investigator.run_at("Theme", None, true, now()).await.unwrap();
    let RunOutcome::Completed { report_path } = outcome else {
        panic!("unexpected outcome: {:?}", outcome);
    };

    let state = load_state(dir.path(), "Theme").await;
    assert_eq!(state.topics, vec!["A", "B"]);
    let report = tokio::fs::read_to_string(report_path).await.unwrap();
    assert!(report.contains("## A\n\nREAL CONTENT"));
}

#[tokio::test]
async fn object_wrapped_plan_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let mut investigator = Investigator::new(
        FixedPlan(r#"{"topics": ["Alpha", "Beta"]}"#),
        ModelFallback::new(Vec::new(), Duration::ZERO),
        options(dir.path()),
    );
    let planned = investigator.plan("X", true).await.unwrap();
    assert_eq!(planned, vec!["Alpha", "Beta"]);
}
