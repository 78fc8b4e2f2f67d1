//! Ollama ストリーミングレスポンス処理
//!
//! `/api/generate` は `{"response": "..."}` 形式の JSON オブジェクトを
//! 改行区切り（あるいは単純な連結）で返す。
//! ネットワークチャンクの境界はオブジェクトの境界と一致しないため、
//! 未完のオブジェクトはバッファに残して次のチャンクを待つ。

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::InferenceError;

/// ストリームの 1 フラグメント
#[derive(Debug, Deserialize)]
struct Fragment {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// 連結された JSON オブジェクト列を逐次デコードするデコーダ。
#[derive(Debug, Default)]
pub struct FragmentDecoder {
    buf: Vec<u8>,
    /// `done: true` を受信したかどうか（ログ用）
    done_seen: bool,
}

impl FragmentDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 受信バイトを追加し、完結したフラグメントのテキストを順に返す。
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, InferenceError> {
        self.buf.extend_from_slice(bytes);

        let mut texts = Vec::new();
        let mut consumed = 0;
        let mut iter = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Fragment>();

        loop {
            match iter.next() {
                Some(Ok(fragment)) => {
                    consumed = iter.byte_offset();
                    if let Some(message) = fragment.error {
                        return Err(InferenceError::Backend(message));
                    }
                    if fragment.done {
                        self.done_seen = true;
                    }
                    texts.push(fragment.response);
                }
                // 未完のオブジェクト: 次のチャンクを待つ
                Some(Err(e)) if e.is_eof() => break,
                Some(Err(e)) => return Err(InferenceError::Decode(e)),
                None => {
                    consumed = iter.byte_offset();
                    break;
                }
            }
        }

        self.buf.drain(..consumed);
        Ok(texts)
    }

    /// ストリーム終端。空白以外の未完データが残っていればデコード失敗とする。
    pub fn finish(self) -> Result<bool, InferenceError> {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            return Ok(self.done_seen);
        }
        match serde_json::from_slice::<Fragment>(&self.buf) {
            Ok(_) => Ok(self.done_seen),
            Err(e) => Err(InferenceError::Decode(e)),
        }
    }
}

/// バイトチャンクのストリームを最後まで読み、フラグメントのテキストを連結して返す。
///
/// 転送エラーもデコードエラーも即座に返す。フラグメントの順序は受信順のまま。
pub async fn collect_fragments<S, B, E>(mut stream: S) -> Result<String, InferenceError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    InferenceError: From<E>,
{
    let mut decoder = FragmentDecoder::new();
    let mut full_text = String::new();
    let mut fragment_count: usize = 0;
    let mut chunk_count: usize = 0;

    while let Some(chunk) = stream.next().await {
        chunk_count += 1;
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let err = InferenceError::from(e);
                warn!(
                    error = %err,
                    chunks_received = chunk_count,
                    text_so_far_len = full_text.len(),
                    "Stream error occurred"
                );
                return Err(err);
            }
        };

        for text in decoder.push(chunk.as_ref())? {
            fragment_count += 1;
            full_text.push_str(&text);
        }
    }

    let done_seen = decoder.finish()?;

    debug!(
        total_chunks = chunk_count,
        total_fragments = fragment_count,
        full_text_length = full_text.len(),
        done_seen = done_seen,
        "Stream processing completed"
    );

    Ok(full_text)
}
