//! UI 驱动抽象与命令执行
//!
//! `UiDriver` 是编辑器自动化的唯一接缝：真实实现基于 chromiumoxide，
//! 测试中使用记录型驱动。

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use super::document::Document;
use super::translator::{translate_lines, EditorCommand, TranslatedLine};
use crate::logger::truncate_text;

/// 编辑器自动化能力
///
/// 返回 `Ok(false)` 表示目标元素没找到（非致命），`Err` 表示浏览器层面的失败。
#[allow(async_fn_in_trait)]
pub trait UiDriver {
    /// 设置头图
    async fn set_banner(&mut self, path: &Path) -> Result<bool>;
    /// 填写标题
    async fn set_title(&mut self, title: &str) -> Result<bool>;
    /// 聚焦正文区域
    async fn focus_body(&mut self) -> Result<()>;
    /// 打开 "+" 菜单，按名称查找并点击项目
    async fn click_menu_item(&mut self, label: &str) -> Result<bool>;
    /// 通过 "+" 菜单上传图片
    async fn upload_image(&mut self, path: &Path) -> Result<bool>;
    async fn insert_text(&mut self, text: &str) -> Result<()>;
    async fn press_enter(&mut self) -> Result<()>;
    async fn select_to_line_start(&mut self) -> Result<()>;
    async fn toggle_bold(&mut self) -> Result<()>;
    async fn collapse_selection(&mut self) -> Result<()>;
    async fn pause(&mut self, duration: Duration);
}

/// 发布统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishStats {
    pub lines: usize,
    /// 没找到菜单项而退化为普通文本的块
    pub failed_blocks: usize,
    /// 因文件不存在或上传失败而跳过的图片
    pub skipped_images: usize,
}

/// 执行单行命令
///
/// 块打开失败时只记录日志，后续的插入文本照常执行，也就是退化为普通文本。
/// 图片失败时跳过本行剩余命令。
pub async fn apply_line<D: UiDriver>(
    driver: &mut D,
    line: &TranslatedLine,
    stats: &mut PublishStats,
) -> Result<()> {
    for command in &line.commands {
        match command {
            EditorCommand::InsertText(text) => driver.insert_text(text).await?,
            EditorCommand::Newline | EditorCommand::CloseList => driver.press_enter().await?,
            EditorCommand::OpenBlock(block) => {
                if !driver.click_menu_item(block.menu_label()).await? {
                    warn!("⚠️ 菜单项 '{}' 未找到，按普通文本处理", block.menu_label());
                    stats.failed_blocks += 1;
                }
            }
            EditorCommand::UploadImage(path) => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    warn!("⚠️ 图片文件不存在，跳过: {}", path.display());
                    stats.skipped_images += 1;
                    return Ok(());
                }
                info!("   >>> 上传图片: {}", path.display());
                if !driver.upload_image(path).await? {
                    warn!("⚠️ 图片上传失败，跳过: {}", path.display());
                    stats.skipped_images += 1;
                    return Ok(());
                }
            }
            EditorCommand::SelectToLineStart => driver.select_to_line_start().await?,
            EditorCommand::ToggleBold => driver.toggle_bold().await?,
            EditorCommand::CollapseSelection => driver.collapse_selection().await?,
            EditorCommand::Pause(duration) => driver.pause(*duration).await,
        }
    }
    Ok(())
}

/// 把整篇文章写入编辑器
///
/// 顺序：头图 → 标题 → 聚焦正文 → 逐行执行。
pub async fn publish_document<D: UiDriver>(driver: &mut D, document: &Document) -> Result<PublishStats> {
    let mut stats = PublishStats::default();

    if let Some(banner) = &document.banner {
        info!(">>> 设置头图: {}", banner.display());
        if !tokio::fs::try_exists(banner).await.unwrap_or(false) {
            warn!("⚠️ 头图文件不存在，跳过: {}", banner.display());
        } else if !driver.set_banner(banner).await? {
            warn!("⚠️ 头图设置失败，继续处理正文");
        }
    }

    if let Some(title) = &document.title {
        info!(">>> 设置标题: {}", truncate_text(title, 30));
        if !driver.set_title(title).await? {
            warn!("⚠️ 未找到标题输入框");
        }
    }

    driver.focus_body().await?;

    let translated = translate_lines(&document.lines);
    let total = translated.len();
    for (i, line) in translated.iter().enumerate() {
        let progress = (i + 1) * 100 / total.max(1);
        info!(
            "[{:3}%] 行 {}/{}: {}",
            progress,
            i + 1,
            total,
            truncate_text(&line.source, 30)
        );
        apply_line(driver, line, &mut stats).await?;
        stats.lines += 1;
    }

    info!(
        ">>> 完成！{} 行，退化块 {} 个，跳过图片 {} 张",
        stats.lines, stats.failed_blocks, stats.skipped_images
    );
    Ok(stats)
}
