//! 文章发布
//!
//! ```text
//! document (读取文章) → line (行分类) → translator (编辑器命令) → driver (执行)
//! ```
//!
//! 分类与翻译是纯逻辑，可以脱离浏览器测试；浏览器交互全部收敛在
//! [`UiDriver`] 之后。

pub mod chromium;
pub mod document;
pub mod driver;
pub mod line;
pub mod translator;

pub use chromium::ChromiumDriver;
pub use document::{load_document, parse_markdown, Document};
pub use driver::{apply_line, publish_document, PublishStats, UiDriver};
pub use line::{classify_line, LineKind};
pub use translator::{translate_lines, Block, EditorCommand, ListState, TranslatedLine, Translator};
