//! MCP server implementation

use crate::protocol::*;
use crate::tools;
use anyhow::Result;
use semcode_core::{AppContext, IndexProgress, ProgressCallback};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct McpServer<'a> {
    ctx: &'a AppContext,
    notifier: Option<mpsc::UnboundedSender<JsonRpcNotification>>,
}

impl<'a> McpServer<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self {
            ctx,
            notifier: None,
        }
    }

    /// Send progress notifications for tool calls that carry a progress token
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<JsonRpcNotification>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn run(self) -> Result<()> {
        let (tx, mut notifications) = mpsc::unbounded_channel();
        let server = self.with_notifier(tx);

        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();

        let mut reader = BufReader::new(stdin);
        let mut writer = BufWriter::new(stdout);
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            // notifications raised while the request runs go out before its response
            let handling = server.handle_line(trimmed);
            tokio::pin!(handling);
            let response = loop {
                tokio::select! {
                    response = &mut handling => break response,
                    Some(note) = notifications.recv() => write_message(&mut writer, &note).await?,
                }
            };
            while let Ok(note) = notifications.try_recv() {
                write_message(&mut writer, &note).await?;
            }
            if let Some(response) = response {
                write_message(&mut writer, &response).await?;
            }
        }

        debug!("stdin closed, MCP server stopping");
        Ok(())
    }

    /// Handle one line of input; `None` when nothing should be written back
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    -32700,
                    &format!("Parse error: {}", e),
                ))
            }
        };
        if request.is_notification() {
            debug!(method = %request.method, "notification received");
            return None;
        }
        Some(self.handle_request(&request).await)
    }

    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "ping" => JsonRpcResponse::success(request.id.clone(), serde_json::json!({})),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request).await,
            "resources/list" => {
                JsonRpcResponse::success(request.id.clone(), serde_json::json!({ "resources": [] }))
            }
            "prompts/list" => {
                JsonRpcResponse::success(request.id.clone(), serde_json::json!({ "prompts": [] }))
            }
            _ => JsonRpcResponse::error(
                request.id.clone(),
                -32601,
                &format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let result = serde_json::json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": "semcode",
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        JsonRpcResponse::success(request.id.clone(), result)
    }

    fn handle_tools_list(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let tools = vec![
            tools::search_code_tool_definition(),
            tools::index_codebase_tool_definition(),
            tools::index_status_tool_definition(),
        ];

        JsonRpcResponse::success(request.id.clone(), serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let name = request
            .params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let arguments = request
            .params
            .get("arguments")
            .cloned()
            .unwrap_or(serde_json::json!({}));

        let progress = self.progress_callback(&request.params);
        let result = match name {
            "search_code" => tools::handle_search_code(self.ctx, arguments, progress).await,
            "index_codebase" => {
                tools::handle_index_codebase(self.ctx, arguments, progress).await
            }
            "index_status" => tools::handle_index_status(self.ctx, arguments).await,
            _ => Err(anyhow::anyhow!("Unknown tool: {}", name)),
        };

        let tool_result = result.unwrap_or_else(|e| {
            warn!(tool = name, error = %e, "tool call failed");
            tools::error_result(&e)
        });

        match serde_json::to_value(tool_result) {
            Ok(value) => JsonRpcResponse::success(request.id.clone(), value),
            Err(e) => JsonRpcResponse::error(
                request.id.clone(),
                -32603,
                &format!("Internal error: {}", e),
            ),
        }
    }

    fn progress_callback(&self, params: &Value) -> Option<ProgressCallback> {
        let token = params.get("_meta")?.get("progressToken")?.clone();
        let notifier = self.notifier.clone()?;
        Some(Box::new(move |p: IndexProgress| {
            let note = JsonRpcNotification::progress(token.clone(), p.percent, &p.message);
            if notifier.send(note).is_err() {
                debug!("progress receiver closed");
            }
        }))
    }
}

async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(message)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub async fn start_server(ctx: &AppContext) -> Result<()> {
    let server = McpServer::new(ctx);
    server.run().await
}
