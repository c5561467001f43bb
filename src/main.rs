//! video-downloader-mcp: MCP server exposing a video download tool over stdio.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use video_downloader_mcp::config;
use video_downloader_mcp::download::extractor::YtDlpExtractor;
use video_downloader_mcp::download::Downloader;
use video_downloader_mcp::mcp::McpServer;
use video_downloader_mcp::tools::download::DownloadVideoTool;
use video_downloader_mcp::tools::hello::HelloWorldTool;
use video_downloader_mcp::tools::ToolRegistry;

/// MCP server exposing a yt-dlp backed video download tool.
///
/// Speaks JSON-RPC 2.0 over stdin/stdout; all diagnostics go to stderr so
/// the protocol channel stays clean.
#[derive(Parser, Debug)]
#[command(name = "video-downloader-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Output goes to stderr; stdout belongs to the protocol.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves the downloads directory for shared-directory mode.
fn resolve_downloads_dir(configured: Option<PathBuf>) -> PathBuf {
    configured
        .or_else(|| config::default_config_dir().map(|p| p.join("downloads")))
        .unwrap_or_else(std::env::temp_dir)
}

/// Entry point for the video-downloader-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting video-downloader-mcp server"
    );

    let downloads_dir = resolve_downloads_dir(cfg.downloads.directory.clone());
    info!(
        downloads_dir = %downloads_dir.display(),
        payload_mode = ?cfg.downloads.payload_mode,
        extractor = %cfg.extractor.binary,
        "Download pipeline configured"
    );

    let downloader = Arc::new(Downloader::new(
        Arc::new(YtDlpExtractor::new(cfg.extractor.binary.clone())),
        downloads_dir,
        cfg.downloads.payload_mode,
    ));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(HelloWorldTool));
    registry.register(Arc::new(DownloadVideoTool::new(downloader)));

    let mut server = McpServer::new(Arc::new(registry));

    info!("MCP server ready, waiting for client connection...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = runtime.block_on(server.run());

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_mapping() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "nonsense"), Level::WARN);
        assert_eq!(get_log_level(1, false, "warn"), Level::INFO);
        assert_eq!(get_log_level(3, false, "warn"), Level::TRACE);
    }

    #[test]
    fn downloads_dir_prefers_configured_path() {
        let dir = resolve_downloads_dir(Some(PathBuf::from("/srv/media")));
        assert_eq!(dir, PathBuf::from("/srv/media"));
    }
}
