//! Tool registry and invocation.
//!
//! Tools are registered once at startup and immutable afterwards;
//! `descriptors()` returns them in registration order, stable across the
//! whole session. Tool-level failures (unknown tool, bad arguments, download
//! errors) are protocol-valid responses carrying an error content block —
//! never transport errors. That distinction keeps the JSON-RPC error surface
//! reserved for genuinely malformed traffic.

pub mod download;
pub mod hello;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Describes one tool for `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
///
/// Only the text variant is produced by this server; it carries both
/// human-readable status and the sentinel-framed inline payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// A registered tool: descriptor plus handler.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Returns the tool's descriptor.
    fn descriptor(&self) -> ToolDescriptor;

    /// Invokes the tool with the given arguments.
    ///
    /// Implementations report failures through [`ToolCallResult::error`],
    /// never by panicking.
    async fn call(&self, arguments: Value) -> ToolCallResult;
}

/// Registration-ordered collection of tools, fixed for the process lifetime.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. Order of registration is the order of listing.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.tools.push(handler);
    }

    /// Returns all tool descriptors in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Invokes the named tool.
    ///
    /// An unknown name yields an error content block, not a transport error.
    pub async fn invoke(&self, name: &str, arguments: Value) -> ToolCallResult {
        let Some(tool) = self
            .tools
            .iter()
            .find(|t| t.descriptor().name == name)
        else {
            let available: Vec<String> = self
                .tools
                .iter()
                .map(|t| t.descriptor().name)
                .collect();
            return ToolCallResult::error(format!(
                "Unknown tool: {name}. Available tools: {}",
                available.join(", ")
            ));
        };

        tool.call(arguments).await
    }
}
