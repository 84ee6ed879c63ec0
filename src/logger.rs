//! 日志工具模块
//!
//! 初始化 tracing 订阅者，并提供格式化进度输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则默认 `info`（`verbose` 时为 `debug`）。
/// 重复调用是安全的（测试中会多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录批次开始信息
pub fn log_batch_start(batch_num: usize, total_batches: usize, batch_len: usize, first_topic: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批 ({} 个主题)", batch_num, total_batches, batch_len);
    info!("📄 代表主题: {}", truncate_text(first_topic, 20));
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, resolved: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 已完成 {}/{}", batch_num, resolved, total);
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
