//! 命令行参数定义
//!
//! ```sh
//! # 模板规划 + 分批调研
//! prosper research "Fight Club"
//!
//! # LLM 规划，指定模型
//! prosper research "Fight Club" --ai-plan --model gemini-2.5-pro
//!
//! # 把 Markdown 写入 note 编辑器（浏览器需以 --remote-debugging-port=9222 启动）
//! prosper publish article.md --port 9222
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "prosper", author, version, about)]
pub struct Cli {
    /// TOML 配置文件（覆盖环境变量）
    #[arg(short, long, global = true, env = "PROSPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 深度调研一个主题并生成 Markdown 报告
    Research(ResearchArgs),
    /// 把 Markdown 文章写入 note 编辑器
    Publish(PublishArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ResearchArgs {
    /// 调研主题
    pub theme: Option<String>,

    /// 报告输出路径
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// 列出可用模型后退出
    #[arg(long)]
    pub list_models: bool,

    /// 不调用 API，使用模拟数据
    #[arg(long)]
    pub dry_run: bool,

    /// 首选模型（如 gemini-2.5-flash-lite）
    #[arg(long)]
    pub model: Option<String>,

    /// 用 LLM 规划主题（消耗 API 配额）
    #[arg(long)]
    pub ai_plan: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    /// Markdown 文章路径
    pub article: PathBuf,

    /// 浏览器调试端口（默认取配置）
    #[arg(long)]
    pub port: Option<u16>,

    /// 自行启动无头浏览器，而不是连接已运行的浏览器
    #[arg(long)]
    pub headless: bool,
}
