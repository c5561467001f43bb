//! Download orchestration.
//!
//! One [`Downloader`] instance serves the whole process, but every
//! invocation is self-contained: its own scratch directory (removed on every
//! exit path via `TempDir`), its own progress log, no shared mutable state.
//! Concurrent downloads therefore cannot cross-contaminate each other.
//!
//! The downloads directory and payload mode are constructor inputs, not
//! process-wide globals.

pub mod extractor;
pub mod payload;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::PayloadMode;
use crate::error::DownloadError;

use extractor::{FormatSpec, MediaExtractor, MediaInfo, ProgressEvent};
use payload::Payload;

/// Client-facing quality selector.
///
/// Unrecognised values fall back to the 720p ceiling rather than failing;
/// clients sending a bogus quality get the documented default behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Highest available quality.
    Best,
    /// Lowest available quality.
    Worst,
    /// Best stream up to 720p.
    #[default]
    P720,
    /// Best stream up to 480p.
    P480,
    /// Best stream up to 360p.
    P360,
}

impl Quality {
    /// Parses a client-supplied quality string, falling back to 720p.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "best" => Self::Best,
            "worst" => Self::Worst,
            "480p" => Self::P480,
            "360p" => Self::P360,
            // "720p" and anything unrecognised
            _ => Self::P720,
        }
    }

    /// Returns the yt-dlp format selector for this quality.
    #[must_use]
    pub const fn format_selector(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Worst => "worst",
            Self::P720 => "best[height<=720]",
            Self::P480 => "best[height<=480]",
            Self::P360 => "best[height<=360]",
        }
    }
}

/// Validated arguments for one download invocation.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// The media URL.
    pub url: String,
    /// Quality selector.
    pub quality: Quality,
    /// Extract audio only (MP3).
    pub audio_only: bool,
}

/// A completed download, ready to be rendered into a tool response.
#[derive(Debug, Clone)]
pub struct DownloadSuccess {
    /// Media metadata from the extractor.
    pub info: MediaInfo,
    /// Final artifact filename (post-processing may have changed it).
    pub file_name: String,
    /// Artifact size in bytes.
    pub file_size_bytes: u64,
    /// MIME type derived from the final extension.
    pub mime_type: &'static str,
    /// Rendered progress log, in emission order.
    pub progress_log: Vec<String>,
    /// The transport payload.
    pub payload: Payload,
}

/// Drives the extraction capability and produces transport-ready results.
pub struct Downloader {
    extractor: Arc<dyn MediaExtractor>,
    downloads_dir: PathBuf,
    payload_mode: PayloadMode,
}

impl Downloader {
    /// Creates a downloader.
    ///
    /// `downloads_dir` is only written to in shared-directory mode.
    #[must_use]
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        downloads_dir: PathBuf,
        payload_mode: PayloadMode,
    ) -> Self {
        Self {
            extractor,
            downloads_dir,
            payload_mode,
        }
    }

    /// Runs one download invocation end to end.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] for any failure; callers convert it into
    /// a tool-level error content block. Nothing escapes as a panic and the
    /// scratch directory is removed on every path out of this function.
    pub async fn download(&self, options: DownloadOptions) -> Result<DownloadSuccess, DownloadError> {
        if options.url.trim().is_empty() {
            return Err(DownloadError::InvalidUrl {
                message: "URL must not be empty".to_string(),
            });
        }

        // Dropped on every exit path, success or failure.
        let scratch = tempfile::Builder::new()
            .prefix("video-downloader-mcp-")
            .tempdir()
            .map_err(|e| DownloadError::Scratch { source: e })?;

        let format = FormatSpec {
            selector: options.quality.format_selector().to_string(),
            extract_audio: options.audio_only,
        };

        // Owned exclusively by this invocation; becomes part of the result.
        let log: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let log = Arc::clone(&log);
            move |event: ProgressEvent| {
                if let Ok(mut entries) = log.lock() {
                    entries.push(event);
                }
            }
        };

        tracing::debug!(url = %options.url, selector = %format.selector, "starting download");

        let extraction = self
            .extractor
            .extract(&options.url, &format, scratch.path(), &sink)
            .await?;

        let artifact = resolve_artifact(scratch.path(), extraction.file_path.as_deref())?;

        let file_size_bytes = std::fs::metadata(&artifact)
            .map_err(|e| DownloadError::Artifact {
                path: artifact.clone(),
                source: e,
            })?
            .len();

        let file_name = artifact
            .file_name()
            .map_or_else(|| "downloaded_file".to_string(), |n| n.to_string_lossy().into_owned());
        let mime_type = payload::mime_type_for(&artifact);

        let payload = match self.payload_mode {
            PayloadMode::Inline => {
                let bytes = tokio::fs::read(&artifact)
                    .await
                    .map_err(|e| DownloadError::Artifact {
                        path: artifact.clone(),
                        source: e,
                    })?;
                Payload::Inline {
                    data: payload::encode_inline(&bytes),
                }
            }
            PayloadMode::SharedDirectory => {
                let dest = self.place_in_shared_dir(&artifact, &file_name).await?;
                Payload::FileRef { path: dest }
            }
        };

        let progress_log = log
            .lock()
            .map_or_else(|_| Vec::new(), |entries| {
                entries.iter().map(ToString::to_string).collect()
            });

        tracing::info!(file = %file_name, bytes = file_size_bytes, "download complete");

        Ok(DownloadSuccess {
            info: extraction.info,
            file_name,
            file_size_bytes,
            mime_type,
            progress_log,
            payload,
        })
    }

    /// Moves the artifact out of the scratch directory before it is removed.
    async fn place_in_shared_dir(
        &self,
        artifact: &Path,
        file_name: &str,
    ) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(&self.downloads_dir)
            .await
            .map_err(|e| DownloadError::Artifact {
                path: self.downloads_dir.clone(),
                source: e,
            })?;

        let dest = self.downloads_dir.join(file_name);

        // Copy rather than rename: scratch lives on tmpfs on many systems
        // and rename fails across filesystems.
        tokio::fs::copy(artifact, &dest)
            .await
            .map_err(|e| DownloadError::Artifact {
                path: dest.clone(),
                source: e,
            })?;
        tokio::fs::remove_file(artifact)
            .await
            .map_err(|e| DownloadError::Artifact {
                path: artifact.to_path_buf(),
                source: e,
            })?;

        Ok(dest)
    }
}

/// Locates the downloaded artifact.
///
/// Post-processing may change the extension of the predicted path (e.g.
/// `.webm` remuxed to `.mp4`, or audio extraction producing `.mp3`), so when
/// the prediction is absent we glob the expected stem; with no prediction at
/// all, any regular file in the scratch directory qualifies.
fn resolve_artifact(
    scratch_dir: &Path,
    predicted: Option<&Path>,
) -> Result<PathBuf, DownloadError> {
    if let Some(path) = predicted {
        if path.exists() {
            return Ok(path.to_path_buf());
        }

        if let Some(stem) = path.file_stem() {
            let pattern = format!(
                "{}/{}.*",
                glob::Pattern::escape(&scratch_dir.to_string_lossy()),
                glob::Pattern::escape(&stem.to_string_lossy())
            );
            if let Some(found) = first_glob_match(&pattern) {
                return Ok(found);
            }
        }
    }

    let pattern = format!("{}/*", glob::Pattern::escape(&scratch_dir.to_string_lossy()));
    first_glob_match(&pattern).ok_or_else(|| DownloadError::ArtifactMissing {
        dir: scratch_dir.to_path_buf(),
    })
}

fn first_glob_match(pattern: &str) -> Option<PathBuf> {
    glob::glob(pattern)
        .ok()?
        .filter_map(Result::ok)
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_parsing() {
        assert_eq!(Quality::parse("best"), Quality::Best);
        assert_eq!(Quality::parse("worst"), Quality::Worst);
        assert_eq!(Quality::parse("720p"), Quality::P720);
        assert_eq!(Quality::parse("480p"), Quality::P480);
        assert_eq!(Quality::parse("360p"), Quality::P360);
    }

    #[test]
    fn bogus_quality_falls_back_to_720p() {
        assert_eq!(Quality::parse("bogus-value"), Quality::P720);
        assert_eq!(
            Quality::parse("bogus-value").format_selector(),
            Quality::parse("720p").format_selector()
        );
    }

    #[test]
    fn format_selectors() {
        assert_eq!(Quality::Best.format_selector(), "best");
        assert_eq!(Quality::Worst.format_selector(), "worst");
        assert_eq!(Quality::P720.format_selector(), "best[height<=720]");
        assert_eq!(Quality::P480.format_selector(), "best[height<=480]");
        assert_eq!(Quality::P360.format_selector(), "best[height<=360]");
    }

    #[test]
    fn resolve_artifact_prefers_predicted_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"data").unwrap();

        let resolved = resolve_artifact(dir.path(), Some(&path)).unwrap();
        assert_eq!(resolved, path);
    }

    #[test]
    fn resolve_artifact_globs_renamed_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp3"), b"data").unwrap();

        // Predicted .webm, post-processing produced .mp3.
        let predicted = dir.path().join("clip.webm");
        let resolved = resolve_artifact(dir.path(), Some(&predicted)).unwrap();
        assert_eq!(resolved, dir.path().join("clip.mp3"));
    }

    #[test]
    fn resolve_artifact_without_prediction() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("whatever.mp4"), b"data").unwrap();

        let resolved = resolve_artifact(dir.path(), None).unwrap();
        assert_eq!(resolved, dir.path().join("whatever.mp4"));
    }

    #[test]
    fn resolve_artifact_empty_scratch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_artifact(dir.path(), None);
        assert!(matches!(result, Err(DownloadError::ArtifactMissing { .. })));
    }
}
