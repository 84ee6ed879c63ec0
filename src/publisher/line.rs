//! 行分类
//!
//! 只回答"这一行是什么"，不关心要发出哪些编辑器命令。

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

/// 付费区域标记
pub const PAYWALL_SENTINEL: &str = "<!-- PAYWALL -->";

/// 图片指令前缀
pub const IMAGE_DIRECTIVE: &str = "[IMAGE]:";

/// 目录指令
pub const TOC_DIRECTIVE: &str = "[TOC]";

static HORIZONTAL_RULES: phf::Set<&'static str> = phf::phf_set! { "---", "***", "___" };

static NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s").expect("valid regex"));

static BOLD_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*\*(.+?)\*\*$").expect("valid regex"));

/// 正文行的种类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Image(PathBuf),
    TableOfContents,
    Paywall,
    HorizontalRule,
    Heading2(String),
    Heading3(String),
    Quote(String),
    BulletItem(String),
    NumberedItem(String),
    /// 整行被 `**` 包裹，内容不含星号
    Bold(String),
    Url(String),
    /// 普通文本，保留原始缩进
    Plain(String),
}

impl LineKind {
    pub fn is_list_item(&self) -> bool {
        matches!(self, LineKind::BulletItem(_) | LineKind::NumberedItem(_))
    }
}

/// 对单行进行分类（按优先级，先匹配者胜出）
pub fn classify_line(line: &str) -> LineKind {
    let stripped = line.trim();

    if stripped.is_empty() {
        return LineKind::Blank;
    }
    if let Some(path) = stripped.strip_prefix(IMAGE_DIRECTIVE) {
        return LineKind::Image(PathBuf::from(path.trim()));
    }
    if stripped == TOC_DIRECTIVE {
        return LineKind::TableOfContents;
    }
    if stripped.contains(PAYWALL_SENTINEL) {
        return LineKind::Paywall;
    }
    if HORIZONTAL_RULES.contains(stripped) {
        return LineKind::HorizontalRule;
    }
    if let Some(text) = stripped.strip_prefix("## ") {
        return LineKind::Heading2(text.to_string());
    }
    if let Some(text) = stripped.strip_prefix("### ") {
        return LineKind::Heading3(text.to_string());
    }
    if let Some(text) = stripped.strip_prefix("> ") {
        return LineKind::Quote(text.to_string());
    }
    if let Some(text) = stripped
        .strip_prefix("- ")
        .or_else(|| stripped.strip_prefix("* "))
    {
        return LineKind::BulletItem(text.to_string());
    }
    if let Some(m) = NUMBERED_ITEM.find(stripped) {
        return LineKind::NumberedItem(stripped[m.end()..].to_string());
    }
    if let Some(caps) = BOLD_LINE.captures(stripped) {
        return LineKind::Bold(caps[1].to_string());
    }
    if stripped.starts_with("http") {
        return LineKind::Url(stripped.to_string());
    }
    LineKind::Plain(line.to_string())
}
