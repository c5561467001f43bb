//! The download_video tool.
//!
//! Parses and validates client arguments, hands them to the orchestrator,
//! and renders the result as a single text content block: human-readable
//! summary, progress log, then the payload (inline sentinel block or shared
//! path).

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::download::payload::{render_inline_block, Payload};
use crate::download::{DownloadOptions, DownloadSuccess, Downloader, Quality};

use super::{ToolCallResult, ToolDescriptor, ToolHandler};

/// Client-supplied arguments for download_video.
///
/// `quality` stays a free string here; unrecognised values fall back to the
/// 720p ceiling during parsing instead of rejecting the request.
#[derive(Debug, Deserialize)]
struct DownloadArgs {
    #[serde(default)]
    url: String,
    #[serde(default = "default_quality")]
    quality: String,
    #[serde(default)]
    audio_only: bool,
}

fn default_quality() -> String {
    "720p".to_string()
}

/// Downloads remote media via the extraction capability.
pub struct DownloadVideoTool {
    downloader: Arc<Downloader>,
}

impl DownloadVideoTool {
    /// Creates the tool around a configured downloader.
    #[must_use]
    pub fn new(downloader: Arc<Downloader>) -> Self {
        Self { downloader }
    }
}

#[async_trait]
impl ToolHandler for DownloadVideoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "download_video".to_string(),
            description: Some(
                "Download videos from various platforms (YouTube, Vimeo, etc.) using yt-dlp. \
                 Supports quality selection, audio-only extraction, and progress tracking. \
                 Returns the downloaded file's metadata together with its content, either \
                 inlined as base64 or as a path in the shared downloads directory."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL of the video to download. Supports YouTube, Vimeo, and many other platforms."
                    },
                    "quality": {
                        "type": "string",
                        "enum": ["best", "worst", "720p", "480p", "360p"],
                        "description": "Video quality preference. 'best' downloads highest available quality, others limit maximum resolution.",
                        "default": "720p"
                    },
                    "audio_only": {
                        "type": "boolean",
                        "description": "If true, extracts audio only (MP3 format). If false, downloads video.",
                        "default": false
                    }
                },
                "required": ["url"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> ToolCallResult {
        let args: DownloadArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return ToolCallResult::error(format!("Invalid arguments: {e}")),
        };

        if args.url.trim().is_empty() {
            return ToolCallResult::error(
                "Error: Invalid URL provided. Please provide a valid video URL.",
            );
        }

        let options = DownloadOptions {
            url: args.url,
            quality: Quality::parse(&args.quality),
            audio_only: args.audio_only,
        };
        let audio_only = options.audio_only;

        match self.downloader.download(options).await {
            Ok(success) => ToolCallResult::text(render_success(&success, audio_only)),
            Err(e) => ToolCallResult::error(format!("Video download error: {e}")),
        }
    }
}

/// Renders the success summary, progress log, and payload.
#[allow(clippy::cast_precision_loss)]
fn render_success(success: &DownloadSuccess, audio_only: bool) -> String {
    let mut text = String::from("Video downloaded successfully!\n\n");

    let _ = writeln!(text, "Title: {}", success.info.title);
    let _ = writeln!(text, "Uploader: {}", success.info.uploader);
    if success.info.duration_seconds > 0 {
        let _ = writeln!(
            text,
            "Duration: {:.1} minutes",
            success.info.duration_seconds as f64 / 60.0
        );
    }
    if success.info.view_count > 0 {
        let _ = writeln!(text, "Views: {}", success.info.view_count);
    }
    let _ = writeln!(text, "File: {}", success.file_name);
    let _ = writeln!(
        text,
        "Size: {:.1} MB",
        success.file_size_bytes as f64 / (1024.0 * 1024.0)
    );
    let _ = writeln!(
        text,
        "Mode: {}",
        if audio_only { "Audio Only (MP3)" } else { "Video" }
    );

    if !success.progress_log.is_empty() {
        text.push_str("\nProgress log:\n");
        for entry in &success.progress_log {
            let _ = writeln!(text, "  - {entry}");
        }
    }

    text.push('\n');
    match &success.payload {
        Payload::Inline { data } => {
            text.push_str(&render_inline_block(
                data,
                &success.file_name,
                success.mime_type,
                success.file_size_bytes,
            ));
        }
        Payload::FileRef { path } => {
            let _ = write!(text, "Saved to: {}", path.display());
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::extractor::MediaInfo;

    fn sample_success(payload: Payload) -> DownloadSuccess {
        DownloadSuccess {
            info: MediaInfo {
                title: "Test Video".to_string(),
                uploader: "Test Channel".to_string(),
                duration_seconds: 213,
                view_count: 1024,
            },
            file_name: "Test Video.mp4".to_string(),
            file_size_bytes: 2 * 1024 * 1024,
            mime_type: "video/mp4",
            progress_log: vec![
                "Downloading Test Video.mp4: 10.0% at 1.00MiB/s".to_string(),
                "Download completed: Test Video.mp4".to_string(),
            ],
            payload,
        }
    }

    #[test]
    fn render_inline_success() {
        let text = render_success(
            &sample_success(Payload::Inline {
                data: "SGVsbG8=".to_string(),
            }),
            false,
        );

        assert!(text.starts_with("Video downloaded successfully!"));
        assert!(text.contains("Title: Test Video"));
        assert!(text.contains("Uploader: Test Channel"));
        assert!(text.contains("Duration: 3.6 minutes"));
        assert!(text.contains("Views: 1024"));
        assert!(text.contains("Size: 2.0 MB"));
        assert!(text.contains("Mode: Video"));
        assert!(text.contains("  - Downloading Test Video.mp4: 10.0% at 1.00MiB/s"));
        assert!(text.contains("FILE_DATA_START\nSGVsbG8=\nFILE_DATA_END"));
        assert!(text.contains("FILENAME: Test Video.mp4"));
        assert!(text.contains("MIME_TYPE: video/mp4"));
        assert!(text.contains("SIZE: 2097152"));
    }

    #[test]
    fn render_file_ref_success() {
        let text = render_success(
            &sample_success(Payload::FileRef {
                path: "/srv/media/downloads/Test Video.mp4".into(),
            }),
            true,
        );

        assert!(text.contains("Mode: Audio Only (MP3)"));
        assert!(text.contains("Saved to: /srv/media/downloads/Test Video.mp4"));
        assert!(!text.contains("FILE_DATA_START"));
    }
}
