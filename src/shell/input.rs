//! 入力の分類
//!
//! 1 行の入力を、空行・終了・名前空間指示・モデルへのプロンプトに振り分ける。

/// 名前空間を直接変更する指示のマーカー
pub const NAMESPACE_DIRECTIVE: &str = ":namespace";

/// 1 行の入力の分類結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput<'a> {
    /// 空行（ターンなし）
    Empty,
    /// 終了キーワード
    Exit,
    /// `:namespace <ns>`。値が空なら None。
    Namespace(Option<&'a str>),
    /// モデルに送るテキスト
    Prompt(&'a str),
}

/// 入力行を分類する。前後の空白は除去してから判定する。
///
/// 終了キーワードは大文字小文字を区別せず完全一致で比較する。
pub fn parse_input<'a, S: AsRef<str>>(line: &'a str, exit_words: &[S]) -> UserInput<'a> {
    let line = line.trim();
    if line.is_empty() {
        return UserInput::Empty;
    }

    if exit_words
        .iter()
        .any(|word| line.eq_ignore_ascii_case(word.as_ref()))
    {
        return UserInput::Exit;
    }

    if let Some(rest) = line.strip_prefix(NAMESPACE_DIRECTIVE) {
        // `:namespacefoo` のような連結は指示とみなさない
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let value = rest.trim();
            return UserInput::Namespace((!value.is_empty()).then_some(value));
        }
    }

    UserInput::Prompt(line)
}
