//! 调研会话状态
//!
//! 状态文件是唯一的持久化边界：规划完成后写一次，之后每批写一次。
//! 文件格式与旧版脚本兼容：`{theme, last_updated, topics, results}`。

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppResult, FileError};

/// 打包主题中非代表主题的占位值
pub const BUNDLED_MARKER: &str = "See above (Bundled)";

/// 每批主题数
pub const BATCH_SIZE: usize = 5;

/// 调研会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSession {
    pub theme: String,
    /// ISO-8601 本地时间
    pub last_updated: String,
    /// 规划好的主题，顺序固定
    pub topics: Vec<String>,
    /// 主题 → 调研内容（或 [`BUNDLED_MARKER`]）
    #[serde(default)]
    pub results: BTreeMap<String, String>,
}

impl ResearchSession {
    /// 重复的主题只保留第一次出现的位置
    pub fn new(theme: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            theme: theme.into(),
            last_updated: now_iso(),
            topics: dedup_topics(topics),
            results: BTreeMap::new(),
        }
    }

    /// 尚未有结果的主题（保持规划顺序）
    pub fn pending_topics(&self) -> Vec<String> {
        self.topics
            .iter()
            .filter(|t| !self.results.contains_key(*t))
            .cloned()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.topics.iter().all(|t| self.results.contains_key(t))
    }

    /// 记录一批的结果：内容存在代表主题（第一个）下，其余写占位值
    pub fn record_batch(&mut self, batch: &[String], content: String) {
        let Some((representative, others)) = batch.split_first() else {
            return;
        };
        self.results.insert(representative.clone(), content);
        for topic in others.iter().filter(|t| *t != representative) {
            self.results.insert(topic.clone(), BUNDLED_MARKER.to_string());
        }
    }

    /// 读取状态文件；文件不存在时返回 `None`
    pub async fn load(path: &Path) -> AppResult<Option<Self>> {
        let path_str = path.display().to_string();
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FileError::ReadFailed {
                path: path_str.clone(),
                source,
            })?;
        let session = serde_json::from_str(&content)
            .map_err(|source| FileError::StateParseFailed { path: path_str, source })?;
        Ok(Some(session))
    }

    /// 写入状态文件（先写临时文件再改名，中断时不会留下半个文件）
    pub async fn save(&mut self, path: &Path) -> AppResult<()> {
        self.last_updated = now_iso();
        let path_str = path.display().to_string();
        let write_failed = |source| FileError::WriteFailed {
            path: path_str.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(write_failed)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| FileError::StateParseFailed {
            path: path_str.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(write_failed)?;
        tokio::fs::rename(&tmp, path).await.map_err(write_failed)?;

        debug!("状态已保存: {} ({}/{})", path_str, self.results.len(), self.topics.len());
        Ok(())
    }
}

/// 去重并保持顺序
pub fn dedup_topics(topics: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    topics.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// 按固定大小切分待处理主题
pub fn partition_batches(pending: &[String], size: usize) -> Vec<Vec<String>> {
    pending.chunks(size.max(1)).map(|c| c.to_vec()).collect()
}

/// 清理主题名：只保留字母数字、空格、`-`、`_`，空格换成下划线
pub fn sanitize_theme(theme: &str) -> String {
    theme
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

/// 会话 ID：`<YYYYMMDD>_<清理后的主题>`，同一天同一主题共享会话
pub fn session_id(theme: &str, date: NaiveDate) -> String {
    format!("{}_{}", date.format("%Y%m%d"), sanitize_theme(theme))
}

/// 会话状态文件路径
pub fn state_path(state_dir: &Path, session_id: &str) -> PathBuf {
    state_dir.join(format!("{}.json", session_id))
}

fn now_iso() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("T{}", i)).collect()
    }

    #[test]
    fn test_partition_reconstructs_order() {
        for n in 0..=17 {
            let pending = topics(n);
            let batches = partition_batches(&pending, BATCH_SIZE);
            let flat: Vec<String> = batches.iter().flatten().cloned().collect();
            assert_eq!(flat, pending);

            if n > 0 {
                let expected_last = if n % BATCH_SIZE == 0 { BATCH_SIZE } else { n % BATCH_SIZE };
                assert_eq!(batches.last().unwrap().len(), expected_last);
                assert!(batches.iter().all(|b| b.len() <= BATCH_SIZE));
            } else {
                assert!(batches.is_empty());
            }
        }
    }

    #[test]
    fn test_record_batch_uses_representative() {
        let mut session = ResearchSession::new("theme", topics(7));
        let batch = topics(5);
        session.record_batch(&batch, "content".into());

        assert_eq!(session.results["T1"], "content");
        for t in &batch[1..] {
            assert_eq!(session.results[t], BUNDLED_MARKER);
        }
        assert_eq!(session.pending_topics(), vec!["T6".to_string(), "T7".to_string()]);
        assert!(!session.is_complete());
    }

    #[test]
    fn test_duplicate_topics_keep_first_occurrence() {
        let planned: Vec<String> = vec!["A".into(), "B".into(), "A".into(), "C".into(), "B".into()];
        let session = ResearchSession::new("theme", planned);
        assert_eq!(session.topics, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_record_batch_never_overwrites_representative() {
        let mut session = ResearchSession::new("theme", topics(2));
        let batch: Vec<String> = vec!["T1".into(), "T2".into(), "T1".into()];
        session.record_batch(&batch, "content".into());
        assert_eq!(session.results["T1"], "content");
        assert_eq!(session.results["T2"], BUNDLED_MARKER);
    }

    #[test]
    fn test_sanitize_and_session_id() {
        assert_eq!(sanitize_theme("  Fight Club: marketing!  "), "Fight_Club_marketing");
        assert_eq!(sanitize_theme("ファイト・クラブ"), "ファイトクラブ");
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        assert_eq!(session_id("a b", date), "20260102_a_b");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_path(dir.path(), "20260102_x");

        assert!(ResearchSession::load(&path).await.unwrap().is_none());

        let mut session = ResearchSession::new("x", topics(2));
        session.record_batch(&topics(2), "body".into());
        session.save(&path).await.unwrap();

        let loaded = ResearchSession::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        let legacy = r#"{
  "theme": "x",
  "last_updated": "2025-12-01T10:00:00.123456",
  "topics": ["a", "b"],
  "results": {"a": "content", "b": "See above (Bundled)"}
}"#;
        tokio::fs::write(&path, legacy).await.unwrap();

        let loaded = ResearchSession::load(&path).await.unwrap().unwrap();
        assert!(loaded.is_complete());
        assert_eq!(loaded.results["b"], BUNDLED_MARKER);
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        assert!(ResearchSession::load(&path).await.is_err());
    }
}
