//! Error types for video-downloader-mcp.
//!
//! Tool-level failures (bad arguments, extractor failures) are reported back
//! to the client as error content blocks, so every variant keeps the original
//! message from the failing layer intact.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by the download pipeline.
///
/// The orchestrator never lets one of these escape past its own boundary:
/// every variant ends up as text inside a tool-level error content block.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The URL argument was missing, empty, or unusable.
    #[error("invalid URL: {message}")]
    InvalidUrl {
        /// Why the URL was rejected.
        message: String,
    },

    /// The extractor binary could not be launched.
    #[error("failed to launch extractor '{binary}'")]
    Spawn {
        /// The binary that could not be started.
        binary: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The extraction capability reported a failure.
    #[error("extraction failed: {message}")]
    Extraction {
        /// The extractor's own error message, preserved verbatim.
        message: String,
    },

    /// Media metadata could not be obtained or parsed.
    #[error("could not extract video information: {message}")]
    Metadata {
        /// Description of the metadata failure.
        message: String,
    },

    /// The download finished but no artifact could be located.
    #[error("download completed but file not found in {dir}")]
    ArtifactMissing {
        /// The scratch directory that was searched.
        dir: PathBuf,
    },

    /// The invocation-scoped scratch directory could not be created.
    #[error("failed to create scratch directory")]
    Scratch {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or moving the downloaded artifact failed.
    #[error("failed to process downloaded file: {path}")]
    Artifact {
        /// The artifact path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn download_error_preserves_extractor_message() {
        let error = DownloadError::Extraction {
            message: "ERROR: [youtube] abc: Video unavailable".to_string(),
        };
        assert!(error.to_string().contains("Video unavailable"));
    }

    #[test]
    fn artifact_missing_names_directory() {
        let error = DownloadError::ArtifactMissing {
            dir: PathBuf::from("/tmp/scratch-42"),
        };
        assert!(error.to_string().contains("/tmp/scratch-42"));
    }
}
