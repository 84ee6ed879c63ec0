//! 提示词模板

/// 规划提示词：要求 8–10 个 JSON 字符串主题，并嵌入调研规则
pub fn planning_prompt(theme: &str, rules: &str) -> String {
    format!(
        r#"あなたはプロの調査プランナーです。以下のテーマについて、徹底的な調査を行うための「調査トピックリスト」を作成してください。

Theme: {theme}

[Reference Rules]
{rules}

[INSTRUCTIONS]
1. Create a list of 8-10 essential research topics to cover the theme comprehensively.
2. Ensure you cover all dimensions defined in the Rules.
3. Output MUST be a valid JSON list of strings. Example: ["Topic 1", "Topic 2", ...]
4. Do NOT include generic topics. Be specific to the theme.
"#
    )
}

/// 单主题深挖提示词
pub fn deep_dive_prompt(topic: &str) -> String {
    format!(
        r#"あなたは執筆者のために「生の素材」を集める調査員です。
以下のトピックについて、Google検索を行い、**可能な限り詳細で具体的な事実**を集めてください。

Topic: {topic}

[INSTRUCTIONS]
1. Use Google Search Grounding to find detailed facts, numbers, quotes, and episodes.
2. **DO NOT SUMMARIZE.** Do not condense information. We need RAW details.
3. If there are conflicting views, capture both.
4. Include specific dates, names of key figures, and technical specs.
5. Output format: Markdown (Bullet points or paragraphs).
6. Language: Japanese (but keep English terms where appropriate).
"#
    )
}

/// 打包提示词：一次请求覆盖整批主题，每个主题输出一个 `# <topic>` 小节
pub fn bundle_prompt(topics: &[String]) -> String {
    let listing: Vec<String> = topics.iter().map(|t| format!("- {}", t)).collect();
    let sections: Vec<String> = topics.iter().map(|t| format!("   # {}\n   (Details...)", t)).collect();
    format!(
        r#"あなたは執筆者のために「生の素材」を集める調査員です。
以下の複数のトピックについて、まとめてGoogle検索を行い、詳細情報を収集してください。

Target Topics:
{}

[INSTRUCTIONS]
1. Use Google Search to find detailed facts for EACH topic.
2. Output Format:
{}
3. Do NOT Summarize. Raw data needed.
"#,
        listing.join("\n"),
        sections.join("\n\n")
    )
}

/// 按批大小选择提示词
pub fn batch_prompt(batch: &[String]) -> String {
    match batch {
        [single] => deep_dive_prompt(single),
        _ => bundle_prompt(batch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_prompt_embeds_rules() {
        let prompt = planning_prompt("Fight Club", "Cover marketing.");
        assert!(prompt.contains("Theme: Fight Club"));
        assert!(prompt.contains("Cover marketing."));
        assert!(prompt.contains("8-10"));
    }

    #[test]
    fn test_bundle_prompt_lists_every_topic() {
        let batch: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
        let prompt = batch_prompt(&batch);
        for t in &batch {
            assert!(prompt.contains(&format!("- {}", t)));
            assert!(prompt.contains(&format!("# {}", t)));
        }
    }

    #[test]
    fn test_single_topic_uses_deep_dive() {
        let prompt = batch_prompt(&["Only".to_string()]);
        assert!(prompt.contains("Topic: Only"));
        assert!(!prompt.contains("Target Topics"));
    }
}
