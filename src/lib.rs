//! video-downloader-mcp: MCP server exposing a video download tool over stdio.
//!
//! A single-process JSON-RPC 2.0 server that lets AI assistants download
//! remote media through yt-dlp and receive the result either inlined as
//! base64 or as a path in a shared downloads directory.
//!
//! # Architecture
//!
//! - **`mcp`** — framed stdio transport, JSON-RPC types, server lifecycle
//! - **`tools`** — the tool registry and the `download_video` /
//!   `hello-world` handlers
//! - **`download`** — the orchestrator, the yt-dlp extraction seam, and
//!   payload encoding
//! - **`config`** — configuration loading and validation
//! - **`error`** — error types
//!
//! stdout carries protocol messages and nothing else; all diagnostics go to
//! stderr via `tracing`.

pub mod config;
pub mod download;
pub mod error;
pub mod mcp;
pub mod tools;
