//! 调研编排：选择供应商、列出模型、运行调研

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::cli::ResearchArgs;
use crate::config::{Config, LlmBackend};
use crate::research::provider::{DryRunProvider, GeminiProvider, OpenAiProvider};
use crate::research::{
    candidate_models, AnyProvider, Investigator, InvestigatorOptions, ModelFallback,
    ResearchProvider, RunOutcome,
};

/// Gemini 的 OpenAI 兼容端点后缀
const GEMINI_OPENAI_SUFFIX: &str = "/openai";

/// 根据配置构建供应商；演练模式不需要 API 密钥
pub fn build_provider(config: &Config, dry_run: bool) -> Result<AnyProvider> {
    if dry_run {
        return Ok(AnyProvider::DryRun(DryRunProvider));
    }
    let api_key = config.require_api_key()?;
    let provider = match config.llm_backend {
        LlmBackend::Gemini => AnyProvider::Gemini(GeminiProvider::new(api_key, &config.llm_api_base_url)),
        LlmBackend::OpenAi => {
            let base = openai_base_url(&config.llm_api_base_url);
            AnyProvider::OpenAi(OpenAiProvider::new(api_key, base))
        }
    };
    Ok(provider)
}

/// 默认地址是 Gemini 原生端点时，改用其 OpenAI 兼容端点
fn openai_base_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base == Config::default().llm_api_base_url {
        format!("{}{}", base, GEMINI_OPENAI_SUFFIX)
    } else {
        base.to_string()
    }
}

/// 执行 `research` 子命令
pub async fn run(config: &Config, args: &ResearchArgs) -> Result<Option<RunOutcome>> {
    let provider = build_provider(config, args.dry_run)?;

    if args.list_models {
        info!(">>> 可用模型:");
        let models = provider.list_models().await.context("获取模型列表失败")?;
        for model in models {
            println!(" - {}", model);
        }
        return Ok(None);
    }

    let Some(theme) = args.theme.as_deref().filter(|t| !t.trim().is_empty()) else {
        bail!("缺少调研主题（仅 --list-models 时可省略）");
    };

    let candidates = candidate_models(args.model.as_deref());
    info!("模型优先级: {:?}", candidates);

    let mut options = InvestigatorOptions::from_config(config);
    if args.dry_run {
        options.cooldown = Duration::ZERO;
    }
    let fallback = ModelFallback::new(candidates, Duration::from_secs(config.fallback_backoff_secs));
    let mut investigator = Investigator::new(provider, fallback, options);

    let outcome = investigator
        .run(theme, args.output.as_deref(), args.ai_plan)
        .await
        .with_context(|| format!("调研失败: {}", theme))?;

    match &outcome {
        RunOutcome::Completed { report_path } => {
            info!("📄 报告: {}", report_path.display());
        }
        RunOutcome::QuotaExhausted { state_path } => {
            warn!("⏸️ 配额耗尽，明天或更换模型后重新运行即可续跑: {}", state_path.display());
        }
        RunOutcome::Incomplete { state_path, pending } => {
            warn!(
                "⏸️ {} 个主题未完成，重新运行即可续跑: {}",
                pending.len(),
                state_path.display()
            );
        }
    }
    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_base_url() {
        assert_eq!(
            openai_base_url("https://generativelanguage.googleapis.com/v1beta/"),
            "https://generativelanguage.googleapis.com/v1beta/openai"
        );
        assert_eq!(openai_base_url("https://api.openai.com/v1"), "https://api.openai.com/v1");
    }

    #[test]
    fn test_build_provider_requires_key() {
        let config = Config::default();
        assert!(build_provider(&config, false).is_err());
        assert!(matches!(build_provider(&config, true), Ok(AnyProvider::DryRun(_))));
    }

    #[tokio::test]
    async fn test_missing_theme_is_error() {
        let args = ResearchArgs {
            dry_run: true,
            ..Default::default()
        };
        assert!(run(&Config::default(), &args).await.is_err());
    }

    #[tokio::test]
    async fn test_list_models_needs_no_theme() {
        let args = ResearchArgs {
            dry_run: true,
            list_models: true,
            ..Default::default()
        };
        assert_eq!(run(&Config::default(), &args).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dry_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            state_dir: dir.path().join("state"),
            reports_dir: dir.path().join("reports"),
            rules_path: dir.path().join("rules.md"),
            ..Config::default()
        };
        let args = ResearchArgs {
            theme: Some("Theme".to_string()),
            dry_run: true,
            ai_plan: true,
            ..Default::default()
        };
        let outcome = run(&config, &args).await.unwrap();
        let Some(RunOutcome::Completed { report_path }) = outcome else {
            panic!("unexpected outcome: {:?}", outcome);
        };
        let report = tokio::fs::read_to_string(report_path).await.unwrap();
        assert!(report.contains("## Mock Topic 1"));
        assert!(!report.contains("## Mock Topic 2"));
    }
}
