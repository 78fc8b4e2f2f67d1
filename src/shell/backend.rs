//! モデルバックエンド
//!
//! REPL ループから見たバックエンドは「合成済みプロンプト → 分類済み応答」の 1 操作のみ。
//! - `DirectBackend`: Ollama を直接呼び、ローカルで分類する（`--cli` モード）
//! - `RemoteBackend`: 子プロセスのツールサーバーの `ask_model` を呼ぶ（クライアントモード）

use std::path::PathBuf;

use anyhow::{Context, Result};
use rmcp::model::{CallToolRequestParam, CallToolResult};
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::ai::{OllamaClient, StructuredResponse};
use crate::cli::kai::kai_talk;
use crate::error::KaiError;
use crate::server::ASK_MODEL_TOOL;

/// 1 ターン分の問い合わせを行うバックエンド
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn ask(&self, prompt: &str) -> Result<StructuredResponse, KaiError>;
}

/// Ollama を直接呼び出すバックエンド
pub struct DirectBackend {
    client: OllamaClient,
}

impl DirectBackend {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

impl Backend for DirectBackend {
    async fn ask(&self, prompt: &str) -> Result<StructuredResponse, KaiError> {
        Ok(self.client.ask(prompt).await?)
    }
}

/// ツールサーバー経由のバックエンド
pub struct RemoteBackend {
    service: RunningService<RoleClient, ()>,
}

impl RemoteBackend {
    /// ツールサーバーを子プロセスとして起動し、ハンドシェイクを行う。
    ///
    /// `server_cmd` 未指定時は自分自身の実行ファイルを `--serve` で起動する。
    pub async fn connect(server_cmd: Option<PathBuf>) -> Result<Self> {
        let program = match server_cmd {
            Some(path) => path,
            None => std::env::current_exe().context("Failed to locate kai executable")?,
        };

        info!(program = %program.display(), "Spawning tool server");

        let mut cmd = Command::new(&program);
        cmd.arg("--serve");

        let transport = TokioChildProcess::new(cmd).context("Failed to spawn tool server")?;
        let service = ().serve(transport).await.context("Failed to initialize tool session")?;

        if let Some(info) = service.peer_info() {
            info!(
                server = %info.server_info.name,
                version = %info.server_info.version,
                "Tool session initialized"
            );
            kai_talk(&format!(
                "Initialized {} {}",
                info.server_info.name, info.server_info.version
            ));
        }

        Ok(Self { service })
    }
}

impl Backend for RemoteBackend {
    async fn ask(&self, prompt: &str) -> Result<StructuredResponse, KaiError> {
        let arguments = serde_json::json!({ "prompt": prompt });

        debug!(tool = ASK_MODEL_TOOL, prompt_length = prompt.len(), "Calling tool");

        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: ASK_MODEL_TOOL.into(),
                arguments: arguments.as_object().cloned(),
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "Tool call failed");
                KaiError::Transport(e.to_string())
            })?;

        decode_tool_result(&result)
    }
}

/// ツール結果から StructuredResponse を取り出す。
///
/// エラー結果・空の結果・テキスト以外の結果・JSON として壊れた結果はそれぞれエラーにする。
pub fn decode_tool_result(result: &CallToolResult) -> Result<StructuredResponse, KaiError> {
    let texts: Vec<&str> = result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.as_str()))
        .collect();

    if result.is_error == Some(true) {
        return Err(KaiError::Tool(texts.join("\n")));
    }

    if result.content.is_empty() {
        return Err(KaiError::Tool("no content in response".to_string()));
    }

    let raw = texts
        .first()
        .ok_or_else(|| KaiError::Tool("unsupported content type, expected text".to_string()))?;

    serde_json::from_str::<StructuredResponse>(raw).map_err(|source| {
        warn!(error = %source, raw = %raw, "Failed to decode tool payload");
        KaiError::MalformedResponse {
            raw: raw.to_string(),
            source,
        }
    })
}
