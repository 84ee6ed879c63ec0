//! 报告汇总
//!
//! 纯拼接，不调用 LLM：按规划顺序输出每个有内容的主题，跳过打包占位值。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::session::{sanitize_theme, BUNDLED_MARKER};
use crate::error::{AppResult, FileError};

/// 汇总报告
pub fn aggregate_report(
    theme: &str,
    topics: &[String],
    results: &BTreeMap<String, String>,
    model: &str,
    generated_at: NaiveDateTime,
) -> String {
    let mut report = format!(
        "# Deep Research Report: {}\nGenerated: {}\nModel: {}\n\n---\n\n",
        theme,
        generated_at.format("%Y-%m-%d %H:%M"),
        model
    );

    for topic in topics {
        let Some(content) = results.get(topic) else {
            continue;
        };
        if content == BUNDLED_MARKER {
            continue;
        }
        report.push_str(&format!("## {}\n\n{}\n\n---\n\n", topic, content));
    }
    report
}

/// 默认报告路径：`<reports_dir>/<YYYYmmdd_HHMMSS>_<主题>_DEEP.md`
pub fn default_report_path(reports_dir: &Path, theme: &str, now: NaiveDateTime) -> PathBuf {
    reports_dir.join(format!(
        "{}_{}_DEEP.md",
        now.format("%Y%m%d_%H%M%S"),
        sanitize_theme(theme)
    ))
}

/// 写入报告，必要时创建父目录
pub async fn write_report(path: &Path, report: &str) -> AppResult<()> {
    let write_failed = |source| FileError::WriteFailed {
        path: path.display().to_string(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await.map_err(write_failed)?;
    }
    tokio::fs::write(path, report).await.map_err(write_failed)?;
    Ok(())
}
