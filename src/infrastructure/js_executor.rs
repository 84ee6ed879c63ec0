//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"和"等待元素"的能力

use std::time::{Duration, Instant};

use anyhow::Result;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::debug;

use crate::error::BrowserError;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识 Markdown / 编辑器命令
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 轮询等待选择器出现
    ///
    /// 页面可能在登录跳转中，所以不依赖 navigation 事件，而是每 500ms 查询一次。
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let js = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        loop {
            if self.eval_as::<bool>(js.as_str()).await.unwrap_or(false) {
                debug!("元素已出现: {} ({:?})", selector, started.elapsed());
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(BrowserError::ElementTimeout {
                    selector: selector.to_string(),
                    timeout_secs: timeout.as_secs(),
                }
                .into());
            }
            sleep(Duration::from_millis(500)).await;
        }
    }

    /// 点击第一个（或最后一个）文本匹配的按钮
    ///
    /// `exact` 为 true 时要求去除空白后完全一致；`from_end` 为 true 时从 DOM 末尾往前找，
    /// 用来避开页头里同名的按钮。返回是否点击成功。
    pub async fn click_button_by_text(&self, text: &str, exact: bool, from_end: bool) -> Result<bool> {
        let js = format!(
            r#"
            (() => {{
                const wanted = {text};
                let buttons = Array.from(document.querySelectorAll('button'));
                if ({from_end}) buttons = buttons.reverse();
                const hit = buttons.find(b => {{
                    const t = (b.innerText || '').trim();
                    return {exact} ? t === wanted : t.includes(wanted);
                }});
                if (!hit) return false;
                hit.click();
                return true;
            }})()
            "#,
            text = serde_json::to_string(text)?,
            from_end = from_end,
            exact = exact,
        );
        self.eval_as::<bool>(js).await
    }
}
