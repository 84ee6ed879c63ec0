//! 发布编排：准备浏览器，打开编辑器，写入文章

use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::browser;
use crate::cli::PublishArgs;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::publisher::{load_document, publish_document, ChromiumDriver, PublishStats};

/// 执行 `publish` 子命令
pub async fn run(config: &Config, args: &PublishArgs) -> Result<PublishStats> {
    let document = load_document(&args.article)
        .await
        .with_context(|| format!("无法加载文章: {}", args.article.display()))?;
    info!(
        "📄 已加载文章: {} ({} 行)",
        document.title.as_deref().unwrap_or("(无标题)"),
        document.lines.len()
    );

    let (browser, page) = open_editor(config, args).await?;

    let mut driver = ChromiumDriver::new(JsExecutor::new(page));
    driver
        .wait_for_editor(Duration::from_secs(config.editor_timeout_secs))
        .await
        .context("编辑器未就绪")?;

    let stats = publish_document(&mut driver, &document).await?;

    if config.close_grace_secs > 0 {
        info!("⏳ 保持浏览器打开 {}s，请检查草稿", config.close_grace_secs);
        sleep(Duration::from_secs(config.close_grace_secs)).await;
    }
    drop(browser);
    Ok(stats)
}

/// `--headless` 时自行启动；否则连接调试端口，连接失败再启动有界面的浏览器
async fn open_editor(config: &Config, args: &PublishArgs) -> Result<(Browser, Page)> {
    let profile = config.browser_profile_dir.as_deref();
    if args.headless {
        return browser::launch_browser(&config.editor_url, true, profile).await;
    }

    let port = args.port.unwrap_or(config.browser_debug_port);
    match browser::connect_to_browser_and_page(port, &config.editor_url).await {
        Ok(pair) => Ok(pair),
        Err(e) => {
            warn!("⚠️ 无法连接调试端口 {}: {}，改为启动新浏览器", port, e);
            browser::launch_browser(&config.editor_url, false, profile).await
        }
    }
}
