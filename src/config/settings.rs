//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// How downloaded artifacts travel back to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadMode {
    /// Base64-encode the file and embed it in the tool response.
    ///
    /// No filesystem coupling with the client, at a ~4/3 size cost on the
    /// wire. This is the default.
    #[default]
    Inline,

    /// Leave the artifact in the shared downloads directory and return its
    /// path. Requires client and server to see the same filesystem.
    SharedDirectory,
}

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Download settings.
    #[serde(default)]
    pub downloads: DownloadsConfig,

    /// Extractor settings.
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extractor.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "extractor.binary must not be empty".to_string(),
            });
        }

        if self.downloads.payload_mode == PayloadMode::SharedDirectory
            && self.downloads.directory.is_none()
        {
            return Err(ConfigError::ValidationError {
                message: "downloads.directory is required when payload_mode is shared-directory"
                    .to_string(),
            });
        }

        Ok(())
    }
}

/// Download pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadsConfig {
    /// Directory where artifacts land in shared-directory mode.
    ///
    /// Unused in inline mode, where artifacts never outlive the request.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Payload strategy: "inline" or "shared-directory".
    #[serde(default)]
    pub payload_mode: PayloadMode,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: None,
            payload_mode: PayloadMode::Inline,
        }
    }
}

/// Extraction capability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Name or path of the yt-dlp binary.
    #[serde(default = "default_extractor_binary")]
    pub binary: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: default_extractor_binary(),
        }
    }
}

fn default_extractor_binary() -> String {
    "yt-dlp".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
