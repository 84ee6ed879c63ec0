use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: chromiumoxide::error::CdpError,
    },
    /// 等待元素超时
    #[error("等待元素超时 ({selector}, {timeout_secs}秒)")]
    ElementTimeout { selector: String, timeout_secs: u64 },
    /// CDP 参数构建失败
    #[error("CDP 参数构建失败: {0}")]
    InvalidParams(String),
    /// 其他 CDP 调用失败
    #[error(transparent)]
    Cdp(#[from] chromiumoxide::error::CdpError),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 配额或频率限制（429 / RESOURCE_EXHAUSTED）
    #[error("配额耗尽 (模型: {model}): {message}")]
    QuotaExceeded { model: String, message: String },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

impl LlmError {
    /// 是否属于配额类错误
    ///
    /// 只有配额类错误会触发模型降级；其余错误直接返回给调用方。
    pub fn is_quota(&self) -> bool {
        matches!(self, LlmError::QuotaExceeded { .. })
    }

    /// 根据 HTTP 状态码和错误文本对调用失败进行分类
    pub fn classify(model: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == Some(429) || looks_like_quota(&message) {
            LlmError::QuotaExceeded {
                model: model.to_string(),
                message,
            }
        } else {
            LlmError::ApiCallFailed {
                model: model.to_string(),
                message,
            }
        }
    }
}

/// 供应商报错文本中的配额特征
fn looks_like_quota(message: &str) -> bool {
    const MARKERS: [&str; 4] = ["429", "RESOURCE_EXHAUSTED", "rate_limit", "insufficient_quota"];
    MARKERS.iter().any(|marker| message.contains(marker))
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 状态文件解析失败
    #[error("状态文件解析失败 ({path}): {source}")]
    StateParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少 API 密钥
    #[error("缺少 API 密钥，请设置 GEMINI_API_KEY 或 GOOGLE_API_KEY")]
    MissingApiKey,
    /// 未知的 LLM 后端
    #[error("未知的 LLM 后端: {0} (可选: gemini, openai)")]
    UnknownBackend(String),
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
