//! ツールサーバー: `ask_model` を stdio 上で公開する
//!
//! 受け取ったプロンプトを加工せずに Inference Gateway に渡し、
//! 分類済みの StructuredResponse を JSON テキストとして返す。
//! stdout はプロトコル専用のため、このモードでは端末に何も表示しない。

use anyhow::{Context, Result};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::ai::OllamaClient;
use crate::error::KaiError;

/// 公開するツール名
pub const ASK_MODEL_TOOL: &str = "ask_model";

const INSTRUCTIONS: &str = "Kubernetes assistant backed by a local Ollama model. \
Call `ask_model` with a fully composed prompt; the result is a JSON object \
{\"type\": \"CMD\"|\"EXP\"|\"FULL\", \"command\": string, \"content\": string}.";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AskModelRequest {
    /// モデルに送る合成済みプロンプト。
    /// スキーマ上は必須、欠落時は `EmptyArguments` のエラー結果にする。
    #[schemars(required, description = "Fully composed prompt to send to the model.")]
    pub prompt: Option<String>,
}

#[derive(Clone)]
pub struct KaiService {
    client: OllamaClient,
    tool_router: ToolRouter<Self>,
}

impl KaiService {
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    /// プロンプトを問い合わせてツール結果に変換する。
    ///
    /// 失敗はすべてエラー結果（`is_error = true`）として返し、プロトコルエラーにはしない。
    async fn answer(&self, prompt: Option<String>) -> CallToolResult {
        let prompt = match prompt.filter(|p| !p.trim().is_empty()) {
            Some(prompt) => prompt,
            None => {
                warn!("ask_model called without prompt");
                return error_result(&KaiError::EmptyArguments);
            }
        };

        debug!(prompt_length = prompt.len(), "ask_model invoked");

        let response = match self.client.ask(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                let err = KaiError::from(e);
                warn!(error = %err, "ask_model failed");
                return error_result(&err);
            }
        };

        match serde_json::to_string(&response) {
            Ok(json) => {
                info!(kind = %response.kind, "ask_model answered");
                CallToolResult::success(vec![Content::text(json)])
            }
            Err(e) => error_result(&KaiError::Tool(format!("failed to encode response: {e}"))),
        }
    }
}

fn error_result(err: &KaiError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(err.to_string())])
}

#[tool_router]
impl KaiService {
    #[tool(
        description = "Send a prompt to the local Ollama model. Returns the classified response as JSON with fields type (CMD, EXP or FULL), command and content."
    )]
    pub async fn ask_model(
        &self,
        Parameters(request): Parameters<AskModelRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.answer(request.prompt).await)
    }
}

#[tool_handler]
impl ServerHandler for KaiService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

/// stdio でツールサーバーを起動し、クライアントが切断するまで待つ。
pub async fn run(client: OllamaClient) -> Result<()> {
    info!("Starting tool server on stdio");

    let server = KaiService::new(client)
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start tool server")?;
    server.waiting().await.context("Tool server terminated abnormally")?;

    info!("Tool server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{serve_once, test_config};
    use crate::ai::{ResponseKind, StructuredResponse};

    fn service_for(endpoint: String) -> KaiService {
        KaiService::new(OllamaClient::new(&test_config(endpoint)).unwrap())
    }

    fn first_text(result: &CallToolResult) -> String {
        result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn missing_prompt_is_an_error_result() {
        let service = service_for("http://127.0.0.1:9/api/generate".to_string());

        for prompt in [None, Some(String::new()), Some("   ".to_string())] {
            let result = service.answer(prompt).await;
            assert_eq!(result.is_error, Some(true));
            assert!(first_text(&result).contains("prompt"));
        }
    }

    #[tokio::test]
    async fn answer_returns_classified_json() {
        let (endpoint, body_rx) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n\
             {\"response\":\"[FULL]## Command:\\nkubectl get pods --namespace prod\\n\"}\n\
             {\"response\":\"## Explanation:\\nLists pods in prod.\\n\",\"done\":true}\n",
        )
        .await;

        let service = service_for(endpoint);
        let result = service.answer(Some("list pods in prod".to_string())).await;
        assert_ne!(result.is_error, Some(true));

        let payload: serde_json::Value = serde_json::from_str(&first_text(&result)).unwrap();
        assert_eq!(payload["type"], "FULL");
        assert_eq!(payload["command"], "kubectl get pods --namespace prod");
        assert_eq!(payload["content"], "Lists pods in prod.");

        let decoded: StructuredResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(decoded.kind, ResponseKind::Full);

        let body: serde_json::Value = serde_json::from_str(&body_rx.await.unwrap()).unwrap();
        assert_eq!(body["prompt"], "list pods in prod");
        assert_eq!(body["model"], "test-model");
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_error_result() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = service_for(format!("http://{addr}/api/generate"));
        let result = service.answer(Some("list pods".to_string())).await;

        assert_eq!(result.is_error, Some(true));
        assert!(first_text(&result).contains("inference failed"));
    }

    #[test]
    fn router_exposes_ask_model() {
        let service = service_for("http://127.0.0.1:9/api/generate".to_string());
        let names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        assert_eq!(names, vec![ASK_MODEL_TOOL.to_string()]);
    }

    #[test]
    fn schema_marks_prompt_required() {
        let service = service_for("http://127.0.0.1:9/api/generate".to_string());
        let tool = service
            .tool_router
            .list_all()
            .into_iter()
            .find(|tool| tool.name == ASK_MODEL_TOOL)
            .unwrap();

        let required: Vec<&str> = tool
            .input_schema
            .get("required")
            .and_then(|v| v.as_array())
            .map(|values| values.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        assert!(required.contains(&"prompt"), "schema: {:?}", tool.input_schema);
    }

    #[test]
    fn server_info_enables_tools() {
        let service = service_for("http://127.0.0.1:9/api/generate".to_string());
        let info = service.get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains(ASK_MODEL_TOOL));
    }
}
