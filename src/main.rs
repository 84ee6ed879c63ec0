use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use prosper::cli::{Cli, Command};
use prosper::config::Config;
use prosper::{logger, orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置：环境变量，再叠加 TOML 文件
    let mut config = Config::from_env()?;
    if let Some(path) = &cli.config {
        config = config
            .merge_toml_file(path)
            .with_context(|| format!("无法加载配置文件: {}", path.display()))?;
    }

    // 初始化日志
    logger::init(cli.verbose || config.verbose_logging);
    debug!("配置: {:?}", config.llm_backend);

    match &cli.command {
        Command::Research(args) => {
            orchestrator::research::run(&config, args).await?;
        }
        Command::Publish(args) => {
            orchestrator::publish::run(&config, args).await?;
        }
    }

    Ok(())
}
