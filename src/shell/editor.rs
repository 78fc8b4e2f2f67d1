//! 行入力
//!
//! REPL ループは `LineReader` 越しに入力を受け取る。
//! 実端末では reedline、テストでは台本化した入力を使う。

use std::io::{self, Write};

use reedline::{Reedline, Signal};

use crate::cli::prompt::KaiPrompt;

/// 1 回の読み取り結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// Ctrl-C: 現在の行を破棄して続行
    Interrupt,
    /// Ctrl-D / 入力終端
    Eof,
}

pub trait LineReader {
    /// プロンプトを表示して 1 行読む。
    fn read_input(&mut self, namespace: Option<&str>) -> io::Result<InputEvent>;

    /// 確認の問いかけを表示して 1 行読む。入力終端なら None。
    fn read_confirmation(&mut self, question: &str) -> io::Result<Option<String>>;
}

/// reedline による対話入力
pub struct ReedlineReader {
    editor: Reedline,
}

impl ReedlineReader {
    pub fn new() -> Self {
        Self {
            editor: Reedline::create(),
        }
    }
}

impl Default for ReedlineReader {
    fn default() -> Self {
        Self::new()
    }
}

impl LineReader for ReedlineReader {
    fn read_input(&mut self, namespace: Option<&str>) -> io::Result<InputEvent> {
        let prompt = KaiPrompt::new(namespace);
        Ok(match self.editor.read_line(&prompt)? {
            Signal::Success(line) => InputEvent::Line(line),
            Signal::CtrlC => InputEvent::Interrupt,
            Signal::CtrlD => InputEvent::Eof,
        })
    }

    fn read_confirmation(&mut self, question: &str) -> io::Result<Option<String>> {
        print!("{question}");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input))
    }
}
