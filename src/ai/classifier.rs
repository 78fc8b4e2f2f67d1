//! モデル出力の分類器
//!
//! モデルはシステムプロンプトで `[CMD]` / `[EXP]` / `[FULL]` のいずれかを
//! 先頭に付けるよう指示されているが、従わないこともある。
//! タグの判定は先頭のリテラル一致のみで行い、トリムはしない。
//! どのタグにも一致しない出力は FULL として本文をそのまま説明扱いにする。

use tracing::debug;

use super::types::StructuredResponse;

pub const TAG_CMD: &str = "[CMD]";
pub const TAG_EXP: &str = "[EXP]";
pub const TAG_FULL: &str = "[FULL]";

/// FULL 応答内のコマンド見出し
const COMMAND_MARKER: &str = "## Command:";
/// FULL 応答内の説明見出し（コマンド部と説明部の区切り）
const EXPLANATION_MARKER: &str = "## Explanation:";

/// 生のモデル出力を StructuredResponse に分類する。失敗しない。
pub fn classify(raw: &str) -> StructuredResponse {
    let response = if let Some(rest) = raw.strip_prefix(TAG_CMD) {
        StructuredResponse::command(rest.trim())
    } else if let Some(rest) = raw.strip_prefix(TAG_EXP) {
        StructuredResponse::explanation(rest.trim())
    } else if let Some(rest) = raw.strip_prefix(TAG_FULL) {
        split_full(rest)
    } else {
        // タグなし → 説明として FULL に格納（生テキストのまま）
        StructuredResponse::full(String::new(), raw)
    };

    debug!(
        kind = %response.kind,
        command_length = response.command.len(),
        content_length = response.content.len(),
        raw_length = raw.len(),
        "Model output classified"
    );

    response
}

/// `[FULL]` の後ろをコマンド部と説明部に分割する。
///
/// 説明見出しがなければ全体をコマンドとみなす。
fn split_full(rest: &str) -> StructuredResponse {
    match rest.split_once(EXPLANATION_MARKER) {
        Some((command_part, explanation_part)) => {
            let command_part = command_part
                .strip_prefix(COMMAND_MARKER)
                .unwrap_or(command_part);
            StructuredResponse::full(command_part.trim(), explanation_part.trim())
        }
        None => StructuredResponse::full(rest.trim(), String::new()),
    }
}
