//! 调研规划：模板主题、LLM 输出解析、规则文件

use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::session::dedup_topics;

/// 规则文件缺失时嵌入提示词的文本
pub const NO_RULES: &str = "No specific rules found.";

/// 模板规划：六个由主题派生的主题，不发出任何请求
pub fn template_topics(theme: &str) -> Vec<String> {
    vec![
        format!("{}の概要、基本情報、および歴史的背景", theme),
        format!("{}の主要な機能、技術的特徴、または核心的な要素", theme),
        format!("{}の市場評価、競合との比較、および独自の強み", theme),
        format!("{}の社会的・文化的影響、およびユーザーコミュニティの反応", theme),
        format!("{}に関する批判、課題、論争、または法的問題", theme),
        format!("{}の将来展望、長期的な遺産、および今後の予測", theme),
    ]
}

/// LLM 规划失败时的默认主题
pub fn default_topics(theme: &str) -> Vec<String> {
    vec![
        format!("{} Overview", theme),
        format!("{} History", theme),
        format!("{} Impact", theme),
    ]
}

/// 解析 LLM 返回的主题列表
///
/// 接受 JSON 字符串数组，允许外层包着 Markdown 代码块。JSON 对象模式下模型只能返回对象，
/// 因此也接受 `{"topics": [...]}` 这类只包一层数组的对象。空列表视为失败，重复主题只保留一次。
pub fn parse_planned_topics(text: &str) -> Option<Vec<String>> {
    let body = strip_code_fence(text.trim());
    let value: JsonValue = serde_json::from_str(body).ok()?;
    let items = match value {
        JsonValue::Array(items) => items,
        JsonValue::Object(fields) => fields.into_iter().find_map(|(_, v)| match v {
            JsonValue::Array(items) => Some(items),
            _ => None,
        })?,
        _ => return None,
    };

    let mut topics = Vec::with_capacity(items.len());
    for item in items {
        let JsonValue::String(topic) = item else {
            return None;
        };
        let topic = topic.trim();
        if !topic.is_empty() {
            topics.push(topic.to_string());
        }
    }
    let topics = dedup_topics(topics);
    (!topics.is_empty()).then_some(topics)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // 去掉语言标记所在的首行
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// 读取调研规则文件，不存在或读取失败时返回 [`NO_RULES`]
pub async fn load_rules(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(rules) => {
            debug!("已加载调研规则: {}", path.display());
            rules
        }
        Err(e) => {
            warn!("⚠️ 无法读取调研规则 {}: {}，使用默认规则", path.display(), e);
            NO_RULES.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_topics() {
        let topics = template_topics("X");
        assert_eq!(topics.len(), 6);
        assert!(topics.iter().all(|t| t.starts_with('X')));
    }

    #[test]
    fn test_parse_plain_and_fenced() {
        assert_eq!(
            parse_planned_topics(r#"["a", "b"]"#),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            parse_planned_topics("```json\n[\"a\"]\n```"),
            Some(vec!["a".to_string()])
        );
    }

    #[test]
    fn test_parse_object_wrapper() {
        assert_eq!(
            parse_planned_topics(r#"{"topics": ["a", "b"]}"#),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_parse_drops_duplicates() {
        assert_eq!(
            parse_planned_topics(r#"["A", "B", " A "]"#),
            Some(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(parse_planned_topics("not json"), None);
        assert_eq!(parse_planned_topics("[]"), None);
        assert_eq!(parse_planned_topics(r#"{"count": 3}"#), None);
        assert_eq!(parse_planned_topics(r#"["a", 1]"#), None);
    }

    #[test]
    fn test_default_topics() {
        assert_eq!(default_topics("T"), vec!["T Overview", "T History", "T Impact"]);
    }

    #[tokio::test]
    async fn test_load_rules() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("RESEARCH_RULES.md");
        assert_eq!(load_rules(&missing).await, NO_RULES);

        tokio::fs::write(&missing, "Rule 1").await.unwrap();
        assert_eq!(load_rules(&missing).await, "Rule 1");
    }
}
