//! 基于 chromiumoxide 的编辑器驱动
//!
//! 文本通过 `Input.insertText` 直接插入，绕过 IME 和剪贴板；
//! 文件上传通过拦截文件选择对话框完成。

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventFileChooserOpened, SetInterceptFileChooserDialogParams,
};
use chromiumoxide::listeners::EventStream;
use futures::StreamExt;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::driver::UiDriver;
use crate::error::BrowserError;
use crate::infrastructure::JsExecutor;

/// 标题输入框
pub const TITLE_SELECTOR: &str = r#"textarea[placeholder*="タイトル"]"#;
/// 正文编辑区
pub const BODY_SELECTOR: &str = r#"div[contenteditable="true"][role="textbox"]"#;
/// 编辑器就绪判断
pub const EDITOR_READY_SELECTOR: &str =
    r#"textarea[placeholder*="タイトル"], div[contenteditable="true"]"#;

const PLUS_MENU_SELECTOR: &str = r#"button[aria-label="メニューを開く"]"#;
const ADD_IMAGE_SELECTOR: &str = r#"button[aria-label="画像を追加"]"#;
const IMAGE_MENU_LABEL: &str = "画像";

const MOD_SHIFT: i64 = 8;
const MOD_META: i64 = 4;
const MOD_CTRL: i64 = 2;

/// 单个按键
struct Key<'a> {
    key: &'a str,
    code: &'a str,
    vk: i64,
    text: Option<&'a str>,
    /// macOS 下需要显式的编辑命令才会移动光标
    commands: &'a [&'a str],
}

/// chromiumoxide 驱动
pub struct ChromiumDriver {
    executor: JsExecutor,
    /// macOS 用 Cmd，其他平台用 Ctrl
    mac_shortcuts: bool,
}

impl ChromiumDriver {
    pub fn new(executor: JsExecutor) -> Self {
        Self {
            executor,
            mac_shortcuts: cfg!(target_os = "macos"),
        }
    }

    /// 等待编辑器出现
    pub async fn wait_for_editor(&self, wait: Duration) -> Result<()> {
        info!(">>> 等待编辑器就绪...");
        self.executor.wait_for_selector(EDITOR_READY_SELECTOR, wait).await?;
        sleep(Duration::from_secs(2)).await;
        Ok(())
    }

    fn primary_modifier(&self) -> i64 {
        if self.mac_shortcuts {
            MOD_META
        } else {
            MOD_CTRL
        }
    }

    async fn dispatch(&self, key: &Key<'_>, modifiers: i64) -> Result<()> {
        let mut down = DispatchKeyEventParams::builder()
            .r#type(if key.text.is_some() {
                DispatchKeyEventType::KeyDown
            } else {
                DispatchKeyEventType::RawKeyDown
            })
            .key(key.key)
            .code(key.code)
            .windows_virtual_key_code(key.vk)
            .native_virtual_key_code(key.vk)
            .modifiers(modifiers);
        if let Some(text) = key.text {
            down = down.text(text);
        }
        if self.mac_shortcuts && !key.commands.is_empty() {
            down = down.commands(key.commands.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        }
        let down = down.build().map_err(BrowserError::InvalidParams)?;
        self.executor.page().execute(down).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key.key)
            .code(key.code)
            .windows_virtual_key_code(key.vk)
            .native_virtual_key_code(key.vk)
            .modifiers(modifiers)
            .build()
            .map_err(BrowserError::InvalidParams)?;
        self.executor.page().execute(up).await?;
        Ok(())
    }

    async fn click_selector(&self, selector: &str) -> Result<bool> {
        let js = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
            serde_json::to_string(selector)?
        );
        self.executor.eval_as::<bool>(js).await
    }

    /// 开启文件选择框拦截，返回对话框事件流
    async fn arm_file_chooser(&self) -> Result<EventStream<EventFileChooserOpened>> {
        let page = self.executor.page();
        page.execute(SetInterceptFileChooserDialogParams::new(true)).await?;
        Ok(page.event_listener::<EventFileChooserOpened>().await?)
    }

    async fn disarm_file_chooser(&self) -> Result<()> {
        self.executor
            .page()
            .execute(SetInterceptFileChooserDialogParams::new(false))
            .await?;
        Ok(())
    }

    /// 等待文件选择框弹出，并把文件交给它
    async fn deliver_file(
        &self,
        events: &mut EventStream<EventFileChooserOpened>,
        path: &Path,
    ) -> Result<bool> {
        let opened = match timeout(Duration::from_secs(10), events.next()).await {
            Ok(Some(event)) => event,
            _ => {
                warn!("等待文件选择框超时");
                return Ok(false);
            }
        };
        let Some(node) = opened.backend_node_id.clone() else {
            warn!("文件选择框缺少节点信息");
            return Ok(false);
        };
        let params = SetFileInputFilesParams::builder()
            .files(vec![path.display().to_string()])
            .backend_node_id(node)
            .build()
            .map_err(BrowserError::InvalidParams)?;
        self.executor.page().execute(params).await?;
        debug!("已选择文件: {}", path.display());
        Ok(true)
    }

    /// 打开 "+" 菜单并点击指定项目
    async fn open_menu_item(&self, label: &str) -> Result<bool> {
        if !self.click_selector(PLUS_MENU_SELECTOR).await? {
            return Ok(false);
        }
        sleep(Duration::from_millis(500)).await;

        if !self.executor.click_button_by_text(label, false, false).await? {
            return Ok(false);
        }
        sleep(Duration::from_secs(1)).await;
        Ok(true)
    }

    async fn choose_via_image_menu(
        &self,
        events: &mut EventStream<EventFileChooserOpened>,
        path: &Path,
    ) -> Result<bool> {
        if !self.open_menu_item(IMAGE_MENU_LABEL).await? {
            return Ok(false);
        }
        self.deliver_file(events, path).await
    }

    async fn choose_via_upload_entry(
        &self,
        events: &mut EventStream<EventFileChooserOpened>,
        path: &Path,
    ) -> Result<bool> {
        if !self.click_upload_entry().await? {
            return Ok(false);
        }
        self.deliver_file(events, path).await
    }

    /// 点击"画像をアップロード"（优先 button，其次 div）
    async fn click_upload_entry(&self) -> Result<bool> {
        if self
            .executor
            .click_button_by_text("画像をアップロード", false, false)
            .await?
        {
            return Ok(true);
        }
        let js = r#"
            (() => {
                const hit = Array.from(document.querySelectorAll('div'))
                    .reverse()
                    .find(d => (d.innerText || '').trim() === '画像をアップロード');
                if (!hit) return false;
                hit.click();
                return true;
            })()
        "#;
        self.executor.eval_as::<bool>(js).await
    }
}

/// 先执行 `action`，无论成败都执行 `cleanup`
///
/// 两者都失败时返回 `action` 的错误。
async fn finally<T>(
    action: impl Future<Output = Result<T>>,
    cleanup: impl Future<Output = Result<()>>,
) -> Result<T> {
    let outcome = action.await;
    let cleaned = cleanup.await;
    let value = outcome?;
    cleaned?;
    Ok(value)
}

impl UiDriver for ChromiumDriver {
    async fn set_banner(&mut self, path: &Path) -> Result<bool> {
        // 页头附近的第一个"画像を追加"按钮
        if !self.click_selector(ADD_IMAGE_SELECTOR).await? {
            warn!("   >>> 未找到 '画像を追加' 按钮");
            return Ok(false);
        }
        sleep(Duration::from_secs(1)).await;

        let mut events = self.arm_file_chooser().await?;
        let chosen = finally(
            self.choose_via_upload_entry(&mut events, path),
            self.disarm_file_chooser(),
        )
        .await?;
        if !chosen {
            warn!("   >>> 未找到 '画像をアップロード' 菜单");
            return Ok(false);
        }

        // 裁剪确认框的"保存"按钮；从后往前找，避免点到页头的"下書き保存"
        sleep(Duration::from_secs(4)).await;
        let saved = self.executor.click_button_by_text("保存", true, true).await?;
        if !saved {
            warn!("   >>> 未找到 '保存' 按钮");
        }
        sleep(Duration::from_secs(5)).await;
        Ok(saved)
    }

    async fn set_title(&mut self, title: &str) -> Result<bool> {
        let Ok(area) = self.executor.page().find_element(TITLE_SELECTOR).await else {
            return Ok(false);
        };
        area.click().await?;
        self.insert_text(title).await?;
        self.dispatch(
            &Key { key: "Tab", code: "Tab", vk: 9, text: None, commands: &[] },
            0,
        )
        .await?;
        sleep(Duration::from_secs(1)).await;
        Ok(true)
    }

    async fn focus_body(&mut self) -> Result<()> {
        self.executor.page().find_element(BODY_SELECTOR).await?.click().await?;
        sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    async fn click_menu_item(&mut self, label: &str) -> Result<bool> {
        self.open_menu_item(label).await
    }

    async fn upload_image(&mut self, path: &Path) -> Result<bool> {
        let mut events = self.arm_file_chooser().await?;
        let uploaded = finally(
            self.choose_via_image_menu(&mut events, path),
            self.disarm_file_chooser(),
        )
        .await?;
        if uploaded {
            // 等待上传完成和渲染
            sleep(Duration::from_secs(5)).await;
        }
        Ok(uploaded)
    }

    async fn insert_text(&mut self, text: &str) -> Result<()> {
        self.executor.page().execute(InsertTextParams::new(text)).await?;
        sleep(Duration::from_millis(100)).await;
        Ok(())
    }

    async fn press_enter(&mut self) -> Result<()> {
        self.dispatch(
            &Key { key: "Enter", code: "Enter", vk: 13, text: Some("\r"), commands: &[] },
            0,
        )
        .await?;
        sleep(Duration::from_millis(300)).await;
        Ok(())
    }

    async fn select_to_line_start(&mut self) -> Result<()> {
        if self.mac_shortcuts {
            self.dispatch(
                &Key {
                    key: "ArrowLeft",
                    code: "ArrowLeft",
                    vk: 37,
                    text: None,
                    commands: &["moveToBeginningOfLineAndModifySelection"],
                },
                MOD_SHIFT | MOD_META,
            )
            .await?;
        } else {
            self.dispatch(
                &Key { key: "Home", code: "Home", vk: 36, text: None, commands: &[] },
                MOD_SHIFT,
            )
            .await?;
        }
        sleep(Duration::from_millis(200)).await;
        Ok(())
    }

    async fn toggle_bold(&mut self) -> Result<()> {
        self.dispatch(
            &Key { key: "b", code: "KeyB", vk: 66, text: None, commands: &[] },
            self.primary_modifier(),
        )
        .await?;
        sleep(Duration::from_millis(200)).await;
        Ok(())
    }

    async fn collapse_selection(&mut self) -> Result<()> {
        self.dispatch(
            &Key {
                key: "ArrowRight",
                code: "ArrowRight",
                vk: 39,
                text: None,
                commands: &["moveRight"],
            },
            0,
        )
        .await?;
        sleep(Duration::from_millis(200)).await;
        Ok(())
    }

    async fn pause(&mut self, duration: Duration) {
        sleep(duration).await;
    }
}
