//! The external extraction capability.
//!
//! The orchestrator talks to media-hosting sites exclusively through the
//! [`MediaExtractor`] trait. The production implementation drives the
//! `yt-dlp` binary; tests substitute a scripted extractor. Either way the
//! extractor's own stdout/stderr are captured, never inherited — extraction
//! output leaking onto the server's stdout would corrupt the protocol
//! channel.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::error::DownloadError;

/// A single progress event emitted during one download.
///
/// Events are appended to an in-memory log owned by the in-flight invocation
/// and surface in the final result text. They are never written to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Bytes are arriving.
    Downloading {
        /// Percentage string as reported, e.g. "42.5%".
        percent: String,
        /// Transfer speed string as reported, e.g. "1.23MiB/s".
        speed: String,
        /// Basename of the file being written.
        filename: String,
    },
    /// The transfer (including post-processing) completed.
    Finished {
        /// Basename of the finished file.
        filename: String,
    },
    /// The extractor reported an error.
    Error {
        /// The error message, verbatim.
        message: String,
    },
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downloading {
                percent,
                speed,
                filename,
            } => write!(f, "Downloading {filename}: {percent} at {speed}"),
            Self::Finished { filename } => write!(f, "Download completed: {filename}"),
            Self::Error { message } => write!(f, "Download error: {message}"),
        }
    }
}

/// Callback invoked for each [`ProgressEvent`].
pub type ProgressFn = dyn Fn(ProgressEvent) + Send + Sync;

/// Format constraint handed to the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    /// yt-dlp format selector string, e.g. `best[height<=720]`.
    pub selector: String,
    /// Extract audio only (MP3) instead of downloading the video stream.
    pub extract_audio: bool,
}

/// Metadata describing the media at a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    /// Media title.
    pub title: String,
    /// Channel or uploader name.
    pub uploader: String,
    /// Duration in whole seconds.
    pub duration_seconds: u64,
    /// View count, when the platform exposes one.
    pub view_count: u64,
}

/// A completed extraction: metadata plus the path the extractor believes it
/// wrote. The path is a prediction — post-processing may rename the file, so
/// the orchestrator re-resolves it against the scratch directory.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Media metadata.
    pub info: MediaInfo,
    /// Predicted artifact path, if the extractor reported one.
    pub file_path: Option<PathBuf>,
}

/// The external extraction capability contract.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Downloads the media at `url` into `scratch_dir`, honouring `format`
    /// and reporting progress through `on_progress`.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] when the media cannot be retrieved.
    async fn extract(
        &self,
        url: &str,
        format: &FormatSpec,
        scratch_dir: &Path,
        on_progress: &ProgressFn,
    ) -> Result<Extraction, DownloadError>;
}

/// Raw metadata shape of `yt-dlp -J` output (only the fields we read).
#[derive(Debug, Deserialize)]
struct RawMediaInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    /// yt-dlp reports fractional seconds for some platforms.
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    view_count: Option<u64>,
}

impl From<RawMediaInfo> for MediaInfo {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from(raw: RawMediaInfo) -> Self {
        Self {
            title: raw.title.unwrap_or_else(|| "Unknown Title".to_string()),
            uploader: raw.uploader.unwrap_or_else(|| "Unknown".to_string()),
            duration_seconds: raw.duration.unwrap_or(0.0).max(0.0).round() as u64,
            view_count: raw.view_count.unwrap_or(0),
        }
    }
}

/// Production extractor backed by the `yt-dlp` binary.
///
/// Two subprocess invocations per download, mirroring probe-then-download:
/// `yt-dlp -J` for metadata, then the actual transfer with `--newline` so
/// progress arrives one event per line.
pub struct YtDlpExtractor {
    binary: String,
}

impl YtDlpExtractor {
    /// Creates an extractor using the given yt-dlp binary name or path.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Fetches media metadata without downloading.
    async fn probe(&self, url: &str) -> Result<MediaInfo, DownloadError> {
        let output = Command::new(&self.binary)
            .args(["-J", "--no-playlist", "--no-warnings"])
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DownloadError::Spawn {
                binary: self.binary.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(DownloadError::Metadata {
                message: last_stderr_line(&output.stderr),
            });
        }

        let raw: RawMediaInfo =
            serde_json::from_slice(&output.stdout).map_err(|e| DownloadError::Metadata {
                message: format!("unparseable yt-dlp metadata: {e}"),
            })?;

        Ok(raw.into())
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract(
        &self,
        url: &str,
        format: &FormatSpec,
        scratch_dir: &Path,
        on_progress: &ProgressFn,
    ) -> Result<Extraction, DownloadError> {
        let info = self.probe(url).await?;

        let output_template = scratch_dir.join("%(title)s.%(ext)s");

        let mut cmd = Command::new(&self.binary);
        cmd.args(["--no-playlist", "--no-warnings", "--newline"])
            .arg("-f")
            .arg(if format.extract_audio {
                "bestaudio/best"
            } else {
                format.selector.as_str()
            })
            .arg("-o")
            .arg(&output_template);

        if format.extract_audio {
            cmd.args(["-x", "--audio-format", "mp3", "--audio-quality", "192K"]);
        }

        cmd.arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| DownloadError::Spawn {
            binary: self.binary.clone(),
            source: e,
        })?;

        // The child's pipes were requested above, so take() cannot fail here.
        let stdout = child.stdout.take().ok_or_else(|| DownloadError::Extraction {
            message: "extractor stdout unavailable".to_string(),
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| DownloadError::Extraction {
            message: "extractor stderr unavailable".to_string(),
        })?;

        // Drain stderr concurrently so a chatty extractor cannot stall on a
        // full pipe while we read progress from stdout.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut destination: Option<PathBuf> = None;

        while let Some(line) = lines.next_line().await.map_err(|e| DownloadError::Artifact {
            path: scratch_dir.to_path_buf(),
            source: e,
        })? {
            if let Some(dest) = parse_destination(&line) {
                destination = Some(dest);
            } else if let Some(event) = parse_progress_line(&line, destination.as_deref()) {
                on_progress(event);
            }
        }

        // Best effort: stderr only feeds error messages.
        let stderr_buf = stderr_task.await.unwrap_or_default();

        let status = child.wait().await.map_err(|e| DownloadError::Spawn {
            binary: self.binary.clone(),
            source: e,
        })?;

        if !status.success() {
            let message = last_stderr_line(stderr_buf.as_bytes());
            on_progress(ProgressEvent::Error {
                message: message.clone(),
            });
            return Err(DownloadError::Extraction { message });
        }

        on_progress(ProgressEvent::Finished {
            filename: destination
                .as_deref()
                .map_or_else(|| info.title.clone(), basename),
        });

        Ok(Extraction {
            info,
            file_path: destination,
        })
    }
}

/// Extracts the destination path from a `[download] Destination:` or
/// `[ExtractAudio] Destination:` line.
fn parse_destination(line: &str) -> Option<PathBuf> {
    let rest = line
        .strip_prefix("[download]")
        .or_else(|| line.strip_prefix("[ExtractAudio]"))
        .or_else(|| line.strip_prefix("[Merger]"))?
        .trim_start();
    rest.strip_prefix("Destination:")
        .map(|p| PathBuf::from(p.trim()))
}

/// Parses a `--newline` progress line into a [`ProgressEvent`].
///
/// Typical shape: `[download]  42.5% of 10.00MiB at 1.23MiB/s ETA 00:05`.
/// The final `100% of ... in ...` summary line carries no speed and is
/// skipped; completion is reported once after the process exits.
fn parse_progress_line(line: &str, destination: Option<&Path>) -> Option<ProgressEvent> {
    let rest = line.strip_prefix("[download]")?.trim_start();
    let mut tokens = rest.split_whitespace();

    let percent = tokens.next()?;
    if !percent.ends_with('%') {
        return None;
    }

    let mut speed = None;
    let mut prev = "";
    for token in tokens {
        if prev == "at" {
            speed = Some(token);
            break;
        }
        prev = token;
    }
    let speed = speed?;

    Some(ProgressEvent::Downloading {
        percent: percent.to_string(),
        speed: speed.to_string(),
        filename: destination.map_or_else(|| "Unknown".to_string(), basename),
    })
}

/// Returns the basename of a path as a string.
fn basename(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Picks the last non-empty stderr line as the user-facing error message.
fn last_stderr_line(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map_or_else(|| "extractor exited with failure".to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_destination_line() {
        let dest = parse_destination("[download] Destination: /tmp/scratch/My Video.mp4");
        assert_eq!(dest, Some(PathBuf::from("/tmp/scratch/My Video.mp4")));
    }

    #[test]
    fn parse_extract_audio_destination() {
        let dest = parse_destination("[ExtractAudio] Destination: /tmp/scratch/My Video.mp3");
        assert_eq!(dest, Some(PathBuf::from("/tmp/scratch/My Video.mp3")));
    }

    #[test]
    fn parse_progress_with_speed() {
        let dest = PathBuf::from("/tmp/scratch/clip.mp4");
        let event = parse_progress_line(
            "[download]  42.5% of 10.00MiB at 1.23MiB/s ETA 00:05",
            Some(&dest),
        );
        assert_eq!(
            event,
            Some(ProgressEvent::Downloading {
                percent: "42.5%".to_string(),
                speed: "1.23MiB/s".to_string(),
                filename: "clip.mp4".to_string(),
            })
        );
    }

    #[test]
    fn skip_summary_line_without_speed() {
        let event = parse_progress_line("[download] 100% of 10.00MiB in 00:05", None);
        assert!(event.is_none());
    }

    #[test]
    fn skip_non_progress_lines() {
        assert!(parse_progress_line("[youtube] abc: Downloading webpage", None).is_none());
        assert!(parse_progress_line("[download] Destination: /x.mp4", None).is_none());
    }

    #[test]
    fn progress_event_rendering() {
        let event = ProgressEvent::Downloading {
            percent: "10.0%".to_string(),
            speed: "2.00MiB/s".to_string(),
            filename: "clip.mp4".to_string(),
        };
        assert_eq!(event.to_string(), "Downloading clip.mp4: 10.0% at 2.00MiB/s");

        let event = ProgressEvent::Finished {
            filename: "clip.mp4".to_string(),
        };
        assert_eq!(event.to_string(), "Download completed: clip.mp4");

        let event = ProgressEvent::Error {
            message: "network unreachable".to_string(),
        };
        assert_eq!(event.to_string(), "Download error: network unreachable");
    }

    #[test]
    fn raw_metadata_defaults() {
        let raw: RawMediaInfo = serde_json::from_str("{}").unwrap();
        let info = MediaInfo::from(raw);
        assert_eq!(info.title, "Unknown Title");
        assert_eq!(info.uploader, "Unknown");
        assert_eq!(info.duration_seconds, 0);
        assert_eq!(info.view_count, 0);
    }

    #[test]
    fn raw_metadata_fractional_duration() {
        let raw: RawMediaInfo =
            serde_json::from_str(r#"{"title": "T", "duration": 212.6}"#).unwrap();
        let info = MediaInfo::from(raw);
        assert_eq!(info.duration_seconds, 213);
    }

    #[test]
    fn last_stderr_line_picks_final_error() {
        let stderr = b"WARNING: something\nERROR: [youtube] abc: Video unavailable\n\n";
        assert_eq!(
            last_stderr_line(stderr),
            "ERROR: [youtube] abc: Video unavailable"
        );
    }

    #[test]
    fn last_stderr_line_fallback() {
        assert_eq!(last_stderr_line(b"  \n"), "extractor exited with failure");
    }
}
