//! AI モジュールの公開型定義

use std::fmt;

use serde::{Deserialize, Serialize};

/// モデル出力の分類。
///
/// ワイヤ上は `"CMD"` / `"EXP"` / `"FULL"` の文字列で表現する。
/// ツールサーバー経由で未知の値が届いた場合は `Unknown` に保持し、表示側で扱う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseKind {
    /// コマンドのみ
    Command,
    /// 説明のみ
    Explanation,
    /// コマンドと説明の両方（タグなし出力のフォールバック先でもある）
    Full,
    /// 分類器は生成しない。リモートから届いた想定外の値。
    Unknown(String),
}

impl ResponseKind {
    pub fn as_tag(&self) -> &str {
        match self {
            ResponseKind::Command => "CMD",
            ResponseKind::Explanation => "EXP",
            ResponseKind::Full => "FULL",
            ResponseKind::Unknown(other) => other,
        }
    }
}

impl From<String> for ResponseKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CMD" => ResponseKind::Command,
            "EXP" => ResponseKind::Explanation,
            "FULL" => ResponseKind::Full,
            _ => ResponseKind::Unknown(value),
        }
    }
}

impl From<ResponseKind> for String {
    fn from(kind: ResponseKind) -> Self {
        kind.as_tag().to_string()
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// 分類済みのモデル応答。`ask_model` ツールの JSON ペイロードそのもの。
///
/// `command` / `content` の空文字列は「存在しない」を意味する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredResponse {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub content: String,
}

impl StructuredResponse {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Command,
            command: command.into(),
            content: String::new(),
        }
    }

    pub fn explanation(content: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Explanation,
            command: String::new(),
            content: content.into(),
        }
    }

    pub fn full(command: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Full,
            command: command.into(),
            content: content.into(),
        }
    }

    /// 提案コマンドを持つかどうか
    pub fn has_command(&self) -> bool {
        !self.command.is_empty()
    }

    /// 説明テキストを持つかどうか
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_wire_field_names() {
        let resp = StructuredResponse::command("kubectl get pods");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "CMD");
        assert_eq!(json["command"], "kubectl get pods");
        assert_eq!(json["content"], "");
    }

    #[test]
    fn deserializes_missing_fields_as_empty() {
        let resp: StructuredResponse =
            serde_json::from_str(r#"{"type":"EXP","content":"Lists pods."}"#).unwrap();
        assert_eq!(resp.kind, ResponseKind::Explanation);
        assert!(!resp.has_command());
        assert_eq!(resp.content, "Lists pods.");
    }

    #[test]
    fn unknown_type_is_preserved() {
        let resp: StructuredResponse =
            serde_json::from_str(r#"{"type":"YAML","command":"","content":"x"}"#).unwrap();
        assert_eq!(resp.kind, ResponseKind::Unknown("YAML".to_string()));
        assert_eq!(resp.kind.to_string(), "YAML");
    }

    #[test]
    fn missing_type_is_an_error() {
        let result = serde_json::from_str::<StructuredResponse>(r#"{"command":"ls"}"#);
        assert!(result.is_err());
    }
}
