//! Markdown → 编辑器命令翻译
//!
//! 纯函数层：输入已分类的行，输出按顺序执行的编辑器命令。
//! 列表状态是唯一的跨行状态。

use std::path::PathBuf;
use std::time::Duration;

use super::line::{classify_line, LineKind};

/// 链接卡片展开等待
pub const LINK_CARD_PAUSE: Duration = Duration::from_secs(2);

/// 付费区域切换后的等待
pub const PAYWALL_PAUSE: Duration = Duration::from_secs(1);

/// 通过 "+" 菜单插入的块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Heading2,
    Heading3,
    Quote,
    BulletList,
    NumberedList,
    Divider,
    TableOfContents,
    PaywallArea,
}

impl Block {
    /// "+" 菜单中的项目名
    pub fn menu_label(self) -> &'static str {
        match self {
            Block::Heading2 => "大見出し",
            Block::Heading3 => "小見出し",
            Block::Quote => "引用",
            Block::BulletList => "箇条書きリスト",
            Block::NumberedList => "番号付きリスト",
            Block::Divider => "区切り線",
            Block::TableOfContents => "目次",
            Block::PaywallArea => "有料エリア指定",
        }
    }
}

/// 编辑器命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    /// 直接插入文本（绕过 IME 和剪贴板）
    InsertText(String),
    /// 回车换行
    Newline,
    /// 结束当前列表（空列表项上的回车）
    CloseList,
    /// 打开 "+" 菜单并点击对应项目
    OpenBlock(Block),
    /// 通过 "+" 菜单上传图片，并把光标移到图片之后
    UploadImage(PathBuf),
    /// 选中到行首
    SelectToLineStart,
    /// 加粗快捷键
    ToggleBold,
    /// 取消选区，光标留在行尾
    CollapseSelection,
    /// 等待页面渲染
    Pause(Duration),
}

/// 列表状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListState {
    #[default]
    NotInList,
    InBulletList,
    InNumberedList,
}

/// 一行及其对应的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedLine {
    pub source: String,
    pub commands: Vec<EditorCommand>,
}

/// 行翻译器
#[derive(Debug, Default)]
pub struct Translator {
    list: ListState,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_state(&self) -> ListState {
        self.list
    }

    pub fn in_list(&self) -> bool {
        self.list != ListState::NotInList
    }

    /// 为一行生成命令
    pub fn emit(&mut self, kind: &LineKind) -> Vec<EditorCommand> {
        let mut out = Vec::new();
        match kind {
            LineKind::Blank => {
                // 列表中的空行只需一次回车即可退出列表
                if self.in_list() {
                    self.list = ListState::NotInList;
                    out.push(EditorCommand::CloseList);
                } else {
                    out.push(EditorCommand::Newline);
                }
            }
            LineKind::Image(path) => {
                self.close_list(&mut out);
                out.push(EditorCommand::UploadImage(path.clone()));
                out.push(EditorCommand::Newline);
            }
            LineKind::TableOfContents => {
                self.close_list(&mut out);
                out.push(EditorCommand::OpenBlock(Block::TableOfContents));
                out.push(EditorCommand::Newline);
            }
            LineKind::Paywall => {
                self.close_list(&mut out);
                out.push(EditorCommand::OpenBlock(Block::PaywallArea));
                out.push(EditorCommand::Pause(PAYWALL_PAUSE));
            }
            LineKind::HorizontalRule => {
                self.close_list(&mut out);
                out.push(EditorCommand::OpenBlock(Block::Divider));
                out.push(EditorCommand::Newline);
            }
            LineKind::Heading2(text) => self.text_block(&mut out, Block::Heading2, text),
            LineKind::Heading3(text) => self.text_block(&mut out, Block::Heading3, text),
            LineKind::Quote(text) => self.text_block(&mut out, Block::Quote, text),
            LineKind::BulletItem(text) => {
                self.list_item(&mut out, ListState::InBulletList, Block::BulletList, text)
            }
            LineKind::NumberedItem(text) => {
                self.list_item(&mut out, ListState::InNumberedList, Block::NumberedList, text)
            }
            LineKind::Bold(text) => {
                // 编辑器不会自动转换 **text**，需要选中后手动加粗，
                // 再按一次快捷键让后续输入恢复常规字重
                self.close_list(&mut out);
                out.push(EditorCommand::InsertText(text.clone()));
                out.push(EditorCommand::SelectToLineStart);
                out.push(EditorCommand::ToggleBold);
                out.push(EditorCommand::CollapseSelection);
                out.push(EditorCommand::ToggleBold);
                out.push(EditorCommand::Newline);
            }
            LineKind::Url(url) => {
                self.close_list(&mut out);
                out.push(EditorCommand::InsertText(url.clone()));
                out.push(EditorCommand::Newline);
                out.push(EditorCommand::Pause(LINK_CARD_PAUSE));
            }
            LineKind::Plain(text) => {
                self.close_list(&mut out);
                out.push(EditorCommand::InsertText(text.clone()));
                out.push(EditorCommand::Newline);
            }
        }
        out
    }

    /// 文档结束时关闭仍然打开的列表
    pub fn finish(&mut self) -> Vec<EditorCommand> {
        let mut out = Vec::new();
        self.close_list(&mut out);
        out
    }

    fn close_list(&mut self, out: &mut Vec<EditorCommand>) {
        if self.in_list() {
            self.list = ListState::NotInList;
            out.push(EditorCommand::CloseList);
        }
    }

    fn text_block(&mut self, out: &mut Vec<EditorCommand>, block: Block, text: &str) {
        self.close_list(out);
        out.push(EditorCommand::OpenBlock(block));
        out.push(EditorCommand::InsertText(text.to_string()));
        out.push(EditorCommand::Newline);
    }

    fn list_item(&mut self, out: &mut Vec<EditorCommand>, state: ListState, block: Block, text: &str) {
        if self.list != state {
            // 另一种列表正在进行时先结束它
            self.close_list(out);
            out.push(EditorCommand::OpenBlock(block));
            self.list = state;
        }
        out.push(EditorCommand::InsertText(text.to_string()));
        out.push(EditorCommand::Newline);
    }
}

/// 翻译整篇正文
///
/// 每个输入行对应一个 [`TranslatedLine`]；文档末尾的列表关闭命令并入最后一行。
pub fn translate_lines<S: AsRef<str>>(lines: &[S]) -> Vec<TranslatedLine> {
    let mut translator = Translator::new();
    let mut translated: Vec<TranslatedLine> = lines
        .iter()
        .map(|line| {
            let line = line.as_ref();
            TranslatedLine {
                source: line.to_string(),
                commands: translator.emit(&classify_line(line)),
            }
        })
        .collect();

    let trailing = translator.finish();
    if let Some(last) = translated.last_mut() {
        last.commands.extend(trailing);
    }
    translated
}
