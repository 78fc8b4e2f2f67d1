//! Ollama API クライアント: Inference Gateway
//!
//! 合成済みプロンプトを `/api/generate` に送信し、
//! ストリーミングで返るフラグメントを連結した生テキストを返す。

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::classifier::classify;
use super::stream::collect_fragments;
use super::types::StructuredResponse;
use crate::config::OllamaConfig;
use crate::error::InferenceError;

/// 接続確立までのタイムアウト
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// `/api/generate` のリクエストボディ
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Ollama クライアント
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    /// 設定から HTTP クライアントを初期化する。
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        info!(
            endpoint = %config.endpoint,
            timeout_secs = config.timeout_secs,
            "Ollama client initialized"
        );

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// プロンプトを送信し、ストリーム全体を連結したテキストを返す。
    ///
    /// モデル名はリクエストごとに解決する。
    pub async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let model = self.config.resolve_model();
        let request = GenerateRequest {
            model: &model,
            prompt,
        };

        debug!(
            endpoint = %self.config.endpoint,
            model = %model,
            prompt_length = prompt.len(),
            "Sending generate request to Ollama"
        );

        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, endpoint = %self.config.endpoint, "Ollama request failed");
                InferenceError::Request(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Ollama returned non-success status");
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let text = collect_fragments(Box::pin(response.bytes_stream())).await?;

        info!(
            model = %model,
            response_length = text.len(),
            "Generation completed"
        );
        Ok(text)
    }

    /// 生成と分類を続けて行う。`ask_model` ツールと `--cli` モードの共通処理。
    pub async fn ask(&self, prompt: &str) -> Result<StructuredResponse, InferenceError> {
        let raw = self.generate(prompt).await?;
        Ok(classify(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{serve_once, test_config};
    use tokio::net::TcpListener;

    fn client_for(endpoint: String) -> OllamaClient {
        OllamaClient::new(&test_config(endpoint)).unwrap()
    }

    #[tokio::test]
    async fn generate_concatenates_streamed_fragments() {
        let (endpoint, body_rx) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n\
             {\"response\":\"kubec\"}\n{\"response\":\"tl get \"}\n{\"response\":\"pods\",\"done\":true}\n",
        )
        .await;

        let text = client_for(endpoint).generate("list pods").await.unwrap();
        assert_eq!(text, "kubectl get pods");

        let body: serde_json::Value = serde_json::from_str(&body_rx.await.unwrap()).unwrap();
        assert_eq!(body["prompt"], "list pods");
        assert!(body["model"].is_string());
    }

    #[tokio::test]
    async fn ask_classifies_generated_text() {
        let (endpoint, _rx) = serve_once(
            "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n\
             {\"response\":\"[FULL]## Command:\\nkubectl get pods\\n\"}\n\
             {\"response\":\"## Explanation:\\nLists all pods.\\n\"}\n",
        )
        .await;

        let resp = client_for(endpoint).ask("list pods").await.unwrap();
        assert_eq!(resp.command, "kubectl get pods");
        assert_eq!(resp.content, "Lists all pods.");
    }

    #[tokio::test]
    async fn generate_reports_non_success_status() {
        let (endpoint, _rx) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 25\r\nConnection: close\r\n\r\n\
             {\"error\":\"no such model\"}",
        )
        .await;

        let err = client_for(endpoint).generate("list pods").await.unwrap_err();
        match err {
            InferenceError::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("no such model"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_reports_malformed_stream() {
        let (endpoint, _rx) = serve_once(
            "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n{\"response\":\"ok\"}\n<html>oops</html>\n",
        )
        .await;

        let err = client_for(endpoint).generate("list pods").await.unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
    }

    #[tokio::test]
    async fn generate_reports_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(format!("http://{addr}/api/generate"))
            .generate("list pods")
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Request(_)));
    }
}
