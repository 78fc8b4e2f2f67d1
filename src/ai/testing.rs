//! テスト用の Ollama 代替サーバー

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::config::OllamaConfig;

/// 指定エンドポイントに向けたテスト用設定（モデルは固定、モデルファイルは存在しない）
pub(crate) fn test_config(endpoint: String) -> OllamaConfig {
    OllamaConfig {
        endpoint,
        model: Some("test-model".to_string()),
        model_file: "/nonexistent/kai/model.txt".into(),
        timeout_secs: 5,
    }
}

/// 1 リクエストだけ受け付けて固定レスポンスを返すテスト用サーバー。
/// 受信したリクエストボディを oneshot で返す。
pub(crate) async fn serve_once(response: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        // ヘッダー終端と Content-Length 分のボディを読み切る
        let body = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break String::new();
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                let body_start = header_end + 4;
                if buf.len() >= body_start + content_length {
                    break String::from_utf8_lossy(&buf[body_start..body_start + content_length])
                        .to_string();
                }
            }
        };

        let _ = tx.send(body);
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });

    (format!("http://{addr}/api/generate"), rx)
}
