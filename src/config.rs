use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppResult, ConfigError, FileError};

/// LLM 后端类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Google Gemini REST API（支持 google_search 工具）
    Gemini,
    /// 兼容 OpenAI 的 Chat Completions 服务
    OpenAi,
}

impl LlmBackend {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(LlmBackend::Gemini),
            "openai" => Ok(LlmBackend::OpenAi),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_backend: LlmBackend,
    /// API 密钥（GEMINI_API_KEY 或 GOOGLE_API_KEY）
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    // --- 调研配置 ---
    /// 会话状态 JSON 存放目录
    pub state_dir: PathBuf,
    /// 报告输出目录
    pub reports_dir: PathBuf,
    /// 调研规则文件（LLM 规划时嵌入提示词）
    pub rules_path: PathBuf,
    /// 每次检索调用前的固定冷却时间（秒）
    pub research_cooldown_secs: u64,
    /// 配额切换模型后的等待时间（秒）
    pub fallback_backoff_secs: u64,
    // --- 发布配置 ---
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 编辑器 URL
    pub editor_url: String,
    /// 等待编辑器出现的超时时间（秒）
    pub editor_timeout_secs: u64,
    /// 发布完成后保持浏览器打开的时间（秒）
    pub close_grace_secs: u64,
    /// 自行启动浏览器时的用户数据目录（保留登录态）
    pub browser_profile_dir: Option<PathBuf>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_backend: LlmBackend::Gemini,
            llm_api_key: None,
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            state_dir: PathBuf::from("projects/prosper/investigator/state"),
            reports_dir: PathBuf::from("projects/prosper/investigator/reports"),
            rules_path: PathBuf::from("projects/prosper/investigator/RESEARCH_RULES.md"),
            research_cooldown_secs: 15,
            fallback_backoff_secs: 5,
            browser_debug_port: 9222,
            editor_url: "https://note.com/notes/new".to_string(),
            editor_timeout_secs: 300,
            close_grace_secs: 30,
            browser_profile_dir: None,
            verbose_logging: false,
        }
    }
}

/// TOML 配置文件中允许出现的字段（全部可选，覆盖环境变量结果）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    llm_backend: Option<LlmBackend>,
    llm_api_base_url: Option<String>,
    state_dir: Option<PathBuf>,
    reports_dir: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    research_cooldown_secs: Option<u64>,
    fallback_backoff_secs: Option<u64>,
    browser_debug_port: Option<u16>,
    editor_url: Option<String>,
    editor_timeout_secs: Option<u64>,
    close_grace_secs: Option<u64>,
    browser_profile_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let default = Self::default();
        let llm_backend = match std::env::var("LLM_BACKEND") {
            Ok(v) => LlmBackend::parse(&v)?,
            Err(_) => default.llm_backend,
        };
        let llm_api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .or_else(|_| std::env::var("LLM_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            llm_backend,
            llm_api_key,
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            state_dir: std::env::var("STATE_DIR").map(PathBuf::from).unwrap_or(default.state_dir),
            reports_dir: std::env::var("REPORTS_DIR").map(PathBuf::from).unwrap_or(default.reports_dir),
            rules_path: std::env::var("RULES_PATH").map(PathBuf::from).unwrap_or(default.rules_path),
            research_cooldown_secs: env_parse("RESEARCH_COOLDOWN_SECS").unwrap_or(default.research_cooldown_secs),
            fallback_backoff_secs: env_parse("FALLBACK_BACKOFF_SECS").unwrap_or(default.fallback_backoff_secs),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").unwrap_or(default.browser_debug_port),
            editor_url: std::env::var("EDITOR_URL").unwrap_or(default.editor_url),
            editor_timeout_secs: env_parse("EDITOR_TIMEOUT_SECS").unwrap_or(default.editor_timeout_secs),
            close_grace_secs: env_parse("CLOSE_GRACE_SECS").unwrap_or(default.close_grace_secs),
            browser_profile_dir: std::env::var("BROWSER_PROFILE_DIR").ok().map(PathBuf::from),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
        })
    }

    /// 用 TOML 文件覆盖当前配置
    pub fn merge_toml_file(mut self, path: &Path) -> AppResult<Self> {
        let path_str = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| FileError::ReadFailed {
            path: path_str.clone(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|source| FileError::TomlParseFailed { path: path_str, source })?;

        if let Some(v) = file.llm_backend {
            self.llm_backend = v;
        }
        if let Some(v) = file.llm_api_base_url {
            self.llm_api_base_url = v;
        }
        if let Some(v) = file.state_dir {
            self.state_dir = v;
        }
        if let Some(v) = file.reports_dir {
            self.reports_dir = v;
        }
        if let Some(v) = file.rules_path {
            self.rules_path = v;
        }
        if let Some(v) = file.research_cooldown_secs {
            self.research_cooldown_secs = v;
        }
        if let Some(v) = file.fallback_backoff_secs {
            self.fallback_backoff_secs = v;
        }
        if let Some(v) = file.browser_debug_port {
            self.browser_debug_port = v;
        }
        if let Some(v) = file.editor_url {
            self.editor_url = v;
        }
        if let Some(v) = file.editor_timeout_secs {
            self.editor_timeout_secs = v;
        }
        if let Some(v) = file.close_grace_secs {
            self.close_grace_secs = v;
        }
        if let Some(v) = file.browser_profile_dir {
            self.browser_profile_dir = Some(v);
        }
        Ok(self)
    }

    /// 取出 API 密钥，缺失时属于致命配置错误
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.llm_api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }
}
