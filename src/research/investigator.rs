//! 可续跑的调研流程
//!
//! ## 状态
//!
//! `Planning → Executing → Aggregating → Done`，外加只能从 Executing
//! （或 LLM 规划）进入的终止状态 `QuotaExhausted`。
//!
//! ## 持久化
//!
//! - 规划完成后立即保存一次会话
//! - 每批成功后保存一次；配额耗尽退出时，之前的批次都已落盘
//! - 同一天同一主题再次运行会从状态文件续跑，跳过规划

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::{error, info, warn};

use super::fallback::ModelFallback;
use super::planner::{default_topics, load_rules, parse_planned_topics, template_topics};
use super::prompt::{batch_prompt, planning_prompt};
use super::provider::{GenerationRequest, ResearchProvider};
use super::report::{aggregate_report, default_report_path, write_report};
use super::session::{partition_batches, session_id, state_path, ResearchSession, BATCH_SIZE};
use crate::config::Config;
use crate::error::{AppResult, LlmError};
use crate::logger;

/// 一次运行的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// 所有主题完成，报告已写入
    Completed { report_path: PathBuf },
    /// 所有候选模型配额耗尽；已完成的批次保存在状态文件中
    QuotaExhausted { state_path: PathBuf },
    /// 部分批次因非配额错误失败，不生成报告，再次运行会续跑
    Incomplete { state_path: PathBuf, pending: Vec<String> },
}

/// 调研参数
#[derive(Debug, Clone)]
pub struct InvestigatorOptions {
    pub state_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub rules_path: PathBuf,
    /// 每次 LLM 调用前的冷却时间
    pub cooldown: Duration,
}

impl InvestigatorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            state_dir: config.state_dir.clone(),
            reports_dir: config.reports_dir.clone(),
            rules_path: config.rules_path.clone(),
            cooldown: Duration::from_secs(config.research_cooldown_secs),
        }
    }
}

/// 调研器
pub struct Investigator<P> {
    provider: P,
    fallback: ModelFallback,
    options: InvestigatorOptions,
}

impl<P: ResearchProvider> Investigator<P> {
    pub fn new(provider: P, fallback: ModelFallback, options: InvestigatorOptions) -> Self {
        Self {
            provider,
            fallback,
            options,
        }
    }

    /// 当前使用的模型
    pub fn current_model(&self) -> &str {
        self.fallback.current()
    }

    /// 以当前本地时间运行
    pub async fn run(&mut self, theme: &str, output: Option<&Path>, use_ai_plan: bool) -> AppResult<RunOutcome> {
        self.run_at(theme, output, use_ai_plan, Local::now().naive_local()).await
    }

    /// 以指定时间运行（决定会话 ID 与默认报告名）
    pub async fn run_at(
        &mut self,
        theme: &str,
        output: Option<&Path>,
        use_ai_plan: bool,
        now: NaiveDateTime,
    ) -> AppResult<RunOutcome> {
        info!("\n>>> 🔎 开始深度调研: '{}'\n", theme);

        let id = session_id(theme, now.date());
        let state_file = state_path(&self.options.state_dir, &id);

        let mut session = match self.resume(&state_file).await {
            Some(session) => session,
            None => {
                let topics = match self.plan(theme, use_ai_plan).await {
                    Ok(topics) => topics,
                    Err(e) => {
                        warn!("   [Quota] 规划阶段配额耗尽: {}", e);
                        return Ok(RunOutcome::QuotaExhausted { state_path: state_file });
                    }
                };
                let mut session = ResearchSession::new(theme, topics);
                session.save(&state_file).await?;
                session
            }
        };

        let pending = session.pending_topics();
        if pending.is_empty() {
            info!("   [Resume] 所有主题均已完成");
        } else {
            info!(
                "   [Progress] 已完成 {}/{}，剩余 {}",
                session.topics.len() - pending.len(),
                session.topics.len(),
                pending.len()
            );
            if let Some(outcome) = self.execute(&mut session, &pending, &state_file).await? {
                return Ok(outcome);
            }
        }

        if !session.is_complete() {
            let pending = session.pending_topics();
            warn!("⚠️ 仍有 {} 个主题未完成，跳过报告生成，重新运行即可续跑", pending.len());
            return Ok(RunOutcome::Incomplete {
                state_path: state_file,
                pending,
            });
        }

        info!("   [Aggregation] 汇总报告...");
        let report = aggregate_report(
            &session.theme,
            &session.topics,
            &session.results,
            self.fallback.current(),
            now,
        );
        let report_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_report_path(&self.options.reports_dir, theme, now));
        write_report(&report_path, &report).await?;

        info!("\n>>> ✅ 调研完成！");
        info!(">>> 报告已保存: {}", report_path.display());
        Ok(RunOutcome::Completed { report_path })
    }

    /// 读取已有会话；状态文件损坏时从头开始
    async fn resume(&self, state_file: &Path) -> Option<ResearchSession> {
        match ResearchSession::load(state_file).await {
            Ok(Some(session)) => {
                info!("   [Resume] 找到保存于 {} 的状态", session.last_updated);
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("⚠️ 状态文件无法读取，重新开始: {}", e);
                None
            }
        }
    }

    /// 规划主题
    ///
    /// 只有配额耗尽才返回错误；其他失败都退回默认主题。
    pub async fn plan(&mut self, theme: &str, use_ai: bool) -> Result<Vec<String>, LlmError> {
        info!("   [Planning] 分析主题: '{}'", theme);
        if !use_ai {
            info!("   [Planning] 使用模板规划（不调用 API）");
            return Ok(template_topics(theme));
        }

        let rules = load_rules(&self.options.rules_path).await;
        self.cooldown().await;

        let request = GenerationRequest::json(planning_prompt(theme, &rules));
        let response = match self.fallback.run(&self.provider, &request).await {
            Ok(response) => response,
            Err(e) if e.is_quota() => return Err(e),
            Err(e) => {
                error!("   [Error] 规划调用失败: {}，使用默认主题", e);
                return Ok(default_topics(theme));
            }
        };

        match parse_planned_topics(&response.text) {
            Some(topics) => {
                info!("   [Planning] 生成 {} 个主题", topics.len());
                for topic in &topics {
                    info!("      - {}", topic);
                }
                Ok(topics)
            }
            None => {
                error!("   [Error] 规划结果不是 JSON 字符串列表，使用默认主题");
                Ok(default_topics(theme))
            }
        }
    }

    /// 分批调研；配额耗尽时返回终止结果
    async fn execute(
        &mut self,
        session: &mut ResearchSession,
        pending: &[String],
        state_file: &Path,
    ) -> AppResult<Option<RunOutcome>> {
        let batches = partition_batches(pending, BATCH_SIZE);
        let total_batches = batches.len();

        for (index, batch) in batches.iter().enumerate() {
            let batch_num = index + 1;
            logger::log_batch_start(batch_num, total_batches, batch.len(), &batch[0]);

            match self.research_batch(batch).await {
                Ok(content) => {
                    session.record_batch(batch, content);
                    session.save(state_file).await?;
                    logger::log_batch_complete(batch_num, session.results.len(), session.topics.len());
                }
                Err(e) if e.is_quota() => {
                    warn!("   [Quota] API 配额耗尽，进度已保存: {}", state_file.display());
                    return Ok(Some(RunOutcome::QuotaExhausted {
                        state_path: state_file.to_path_buf(),
                    }));
                }
                Err(e) => {
                    error!("   [Error] 第 {} 批失败: {}", batch_num, e);
                }
            }
        }
        Ok(None)
    }

    /// 一次检索请求覆盖整批主题
    async fn research_batch(&mut self, batch: &[String]) -> Result<String, LlmError> {
        info!("   [Researching] 调研 {} 个主题...", batch.len());
        self.cooldown().await;
        let request = GenerationRequest::grounded(batch_prompt(batch));
        let response = self.fallback.run(&self.provider, &request).await?;
        Ok(response.text)
    }

    async fn cooldown(&self) {
        if self.options.cooldown.is_zero() {
            return;
        }
        info!("      [Rate Limit] 等待 {}s...", self.options.cooldown.as_secs());
        tokio::time::sleep(self.options.cooldown).await;
    }
}
