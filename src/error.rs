//! エラー分類
//!
//! 1 ターン内で発生するエラーはすべてここに集約する。
//! どのエラーもセッションを終了させず、REPL ループ側で表示して次の入力に戻る。

use thiserror::Error;

/// ターン単位で回復可能なエラー
#[derive(Debug, Error)]
pub enum KaiError {
    /// モデルバックエンドとの通信・デコード失敗
    #[error("inference failed: {0}")]
    InferenceFailure(#[from] InferenceError),

    /// ツール結果のペイロードが StructuredResponse としてデコードできない
    #[error("malformed response: {source}")]
    MalformedResponse {
        /// デバッグ表示用の生テキスト
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// 確認済みコマンドの実行失敗（出力は別途表示済み）
    #[error("execution failed: {0}")]
    ExecutionFailure(String),

    /// 必須引数 `prompt` が空または欠落
    #[error("required argument 'prompt' is missing or empty")]
    EmptyArguments,

    /// ツールサーバーがエラー結果を返した
    #[error("tool error: {0}")]
    Tool(String),

    /// ツール呼び出しチャネル自体の失敗
    #[error("transport error: {0}")]
    Transport(String),
}

/// Inference Gateway の失敗要因
#[derive(Debug, Error)]
pub enum InferenceError {
    /// 接続拒否・タイムアウトなど HTTP リクエスト自体の失敗
    #[error("ollama request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 200 以外のステータス
    #[error("ollama returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// フラグメントの JSON デコード失敗
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// ストリーム中にバックエンドが `error` フィールドを返した
    #[error("ollama reported an error: {0}")]
    Backend(String),
}
