//! 文章解析
//!
//! 读取 Markdown 文件，提取标题和头图，把 `![alt](path)` 改写成图片指令。

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use super::line::IMAGE_DIRECTIVE;
use crate::error::{AppResult, FileError};

/// 头图指令前缀
pub const BANNER_DIRECTIVE: &str = "[BANNER]:";

static MARKDOWN_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[.*?\]\((.*?)\)").expect("valid regex"));

/// 解析后的文章
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// 第一个一级标题
    pub title: Option<String>,
    /// 头图路径（已按文章目录解析）
    pub banner: Option<PathBuf>,
    /// 正文行（已去掉标题和头图指令）
    pub lines: Vec<String>,
}

/// 从文件读取并解析文章
pub async fn load_document(path: &Path) -> AppResult<Document> {
    let path_str = path.display().to_string();
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(FileError::NotFound { path: path_str }.into());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FileError::ReadFailed { path: path_str, source })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let document = parse_markdown(&content, base_dir);

    info!(
        "✓ 解析完成: 标题='{}', 头图={}, 正文 {} 行",
        document.title.as_deref().unwrap_or(""),
        if document.banner.is_some() { "有" } else { "无" },
        document.lines.len()
    );
    Ok(document)
}

/// 解析 Markdown 文本
///
/// 相对路径按 `base_dir` 解析。只有第一个 `# ` 行被当作标题，
/// 之后的一级标题保留在正文中。
pub fn parse_markdown(content: &str, base_dir: &Path) -> Document {
    let mut document = Document::default();

    for raw in content.lines() {
        let line = raw.trim_end_matches('\r');

        if let Some(rel) = line.strip_prefix(BANNER_DIRECTIVE) {
            document.banner = Some(base_dir.join(rel.trim()));
            continue;
        }

        if document.title.is_none() && line.starts_with("# ") {
            document.title = Some(line[2..].trim().to_string());
            continue;
        }

        if let Some(caps) = MARKDOWN_IMAGE.captures(line) {
            let path = base_dir.join(&caps[1]);
            document
                .lines
                .push(format!("{} {}", IMAGE_DIRECTIVE, path.display()));
            continue;
        }

        document.lines.push(line.to_string());
    }

    document
}
