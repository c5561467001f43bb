//! MCP server lifecycle and request routing.
//!
//! The server owns the framed transport and is the process's only writer to
//! stdout. One loop reads and routes messages sequentially; `tools/call`
//! handlers run on spawned tasks so a slow download never blocks the loop
//! from answering the next request. Each spawned task writes its response
//! through the shared [`MessageWriter`], whose lock keeps lines whole.
//!
//! # Lifecycle
//!
//! `AwaitingInit` → (`initialize`) → `Initialising` →
//! (`notifications/initialized`) → `Running` → `ShuttingDown`.

use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::mcp::protocol::{
    parse_message, ErrorResponse, IncomingMessage, Notification, Request, RequestId, Response,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{FramedReader, MessageWriter};
use crate::tools::ToolRegistry;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session. It cannot:
    /// the registry is immutable after startup.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for the initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by the client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// The MCP server.
pub struct McpServer<R = tokio::io::Stdin, W = tokio::io::Stdout> {
    /// Current server state.
    state: ServerState,
    /// Incoming message reader.
    reader: FramedReader<R>,
    /// Shared outgoing message writer.
    writer: MessageWriter<W>,
    /// The registered tools.
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    /// Creates a server over stdin/stdout.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_transport(FramedReader::stdin(), MessageWriter::stdout(), registry)
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Creates a server over arbitrary streams. Used directly by tests.
    #[must_use]
    pub fn with_transport(
        reader: FramedReader<R>,
        writer: MessageWriter<W>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            reader,
            writer,
            registry,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Runs the main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Runs the main loop until end of input, without signal handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self) -> io::Result<()> {
        loop {
            let line_result = self.reader.read_line().await;
            if self.handle_transport_result(line_result).await? {
                return Ok(());
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.reader.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.reader.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from a transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: io::Result<Option<String>>,
    ) -> io::Result<bool> {
        let Some(line) = line_result? else {
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(&line).await?;

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single line of input.
    ///
    /// Malformed input never terminates the loop: it is answered with a
    /// typed error when an id could be recovered and skipped otherwise.
    async fn handle_line(&mut self, line: &str) -> io::Result<()> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => self.handle_request(req).await,
            Ok(IncomingMessage::Notification(ref notif)) => {
                self.handle_notification(notif);
                Ok(())
            }
            Err(error) => {
                if error.id.is_some() {
                    self.writer.write_message(&error).await
                } else {
                    tracing::warn!("Skipping malformed input line");
                    Ok(())
                }
            }
        }
    }

    /// Routes an incoming request.
    async fn handle_request(&mut self, req: Request) -> io::Result<()> {
        match req.method.as_str() {
            "initialize" => {
                let outcome = self.handle_initialize(&req);
                self.write_outcome(outcome).await
            }
            "tools/list" => {
                let outcome = self.handle_tools_list(&req);
                self.write_outcome(outcome).await
            }
            "ping" => {
                self.writer
                    .write_message(&Response::success(req.id.clone(), json!({})))
                    .await
            }
            "tools/call" => self.handle_tools_call(req).await,
            _ => {
                self.writer
                    .write_message(&ErrorResponse::method_not_found(req.id.clone(), &req.method))
                    .await
            }
        }
    }

    /// Handles an incoming notification. Never produces a response.
    fn handle_notification(&mut self, notif: &Notification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            tracing::debug!("client initialised, server running");
            self.state = ServerState::Running;
        }
    }

    /// Writes either side of a request outcome.
    async fn write_outcome(&self, outcome: Result<Response, ErrorResponse>) -> io::Result<()> {
        match outcome {
            Ok(response) => self.writer.write_message(&response).await,
            Err(error) => self.writer.write_message(&error).await,
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &Request) -> Result<Response, ErrorResponse> {
        if self.state != ServerState::AwaitingInit {
            return Err(ErrorResponse::invalid_params(
                req.id.clone(),
                "Server already initialised",
            ));
        }

        let _params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                ErrorResponse::invalid_params(req.id.clone(), format!("Invalid initialize params: {e}"))
            })?
            .ok_or_else(|| {
                ErrorResponse::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(Response::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &Request) -> Result<Response, ErrorResponse> {
        self.require_running(&req.id)?;

        Ok(Response::success(
            req.id.clone(),
            json!({ "tools": self.registry.descriptors() }),
        ))
    }

    /// Handles a tools/call request.
    ///
    /// The invocation itself runs on a spawned task; the loop returns to
    /// reading immediately, so concurrent requests keep getting answered
    /// while a download is in flight.
    async fn handle_tools_call(&mut self, req: Request) -> io::Result<()> {
        if let Err(error) = self.require_running(&req.id) {
            return self.writer.write_message(&error).await;
        }

        let params: ToolCallParams = match req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
        {
            Ok(Some(params)) => params,
            Ok(None) => {
                return self
                    .writer
                    .write_message(&ErrorResponse::invalid_params(
                        req.id.clone(),
                        "Missing tool call params",
                    ))
                    .await;
            }
            Err(e) => {
                return self
                    .writer
                    .write_message(&ErrorResponse::invalid_params(
                        req.id.clone(),
                        format!("Invalid tool call params: {e}"),
                    ))
                    .await;
            }
        };

        let registry = Arc::clone(&self.registry);
        let writer = self.writer.clone();
        let id = req.id;

        tokio::spawn(async move {
            let result = registry.invoke(&params.name, params.arguments).await;

            let write_result = match serde_json::to_value(&result) {
                Ok(value) => writer.write_message(&Response::success(id, value)).await,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialise tool call result");
                    writer
                        .write_message(&ErrorResponse::internal_error(
                            id,
                            "Internal error: failed to serialise result",
                        ))
                        .await
                }
            };

            if let Err(e) = write_result {
                tracing::error!(error = %e, "Failed to write tool call response");
            }
        });

        Ok(())
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), ErrorResponse> {
        if self.state == ServerState::Running {
            Ok(())
        } else {
            Err(ErrorResponse::invalid_params(
                id.clone(),
                "Server not initialised",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_serialise_without_list_changed() {
        let json = serde_json::to_string(&ServerCapabilities::default()).unwrap();
        assert_eq!(json, r#"{"tools":{}}"#);
    }

    #[test]
    fn server_info_uses_crate_metadata() {
        let info = ServerInfo::default();
        assert_eq!(info.name, "video-downloader-mcp");
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn new_server_awaits_init() {
        let server = McpServer::with_transport(
            FramedReader::new(&b""[..]),
            MessageWriter::new(Vec::new()),
            Arc::new(ToolRegistry::new()),
        );
        assert_eq!(server.state(), ServerState::AwaitingInit);
    }
}
