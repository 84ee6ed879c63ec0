use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::BrowserError;

/// 启动本地浏览器并导航到指定 URL
///
/// `user_data_dir` 用于持久化登录态；`headless` 为 false 时显示窗口，
/// 方便人工检查草稿。
pub async fn launch_browser(
    url: &str,
    headless: bool,
    user_data_dir: Option<&Path>,
) -> Result<(Browser, Page)> {
    info!("🚀 启动浏览器 (headless: {})...", headless);

    let mut builder = BrowserConfig::builder().args(vec![
        "--start-maximized",
        "--disable-dev-shm-usage",
    ]);
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(dir) = user_data_dir {
        debug!("用户数据目录: {}", dir.display());
        builder = builder.user_data_dir(dir);
    }
    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        BrowserError::InvalidParams(e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        e
    })?;

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page(url).await.map_err(|e| {
        error!("创建页面失败: {}", e);
        e
    })?;
    info!("✅ 浏览器已导航到: {}", url);

    Ok((browser, page))
}
