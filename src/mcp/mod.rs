//! Model Context Protocol (MCP) server implementation.
//!
//! Exposes the download pipeline as tools to AI assistants over stdio
//! transport, speaking JSON-RPC 2.0 one message per line.
//!
//! # Architecture
//!
//! ```text
//! stdin ──▶ FramedReader ──▶ McpServer ──▶ ToolRegistry ──▶ Downloader
//!                                │                              │
//! stdout ◀── MessageWriter ◀─────┴──────── spawned tool task ◀──┘
//! ```
//!
//! `MessageWriter` is the only path to stdout; everything else in the
//! process logs to stderr.
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{ErrorResponse, Request, Response, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::{FramedReader, MessageWriter};
