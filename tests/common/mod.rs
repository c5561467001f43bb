//! Shared test doubles for integration tests.
#![allow(dead_code)] // each test binary uses a different subset

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use video_downloader_mcp::download::extractor::{
    Extraction, FormatSpec, MediaExtractor, MediaInfo, ProgressEvent, ProgressFn,
};
use video_downloader_mcp::error::DownloadError;

/// One recorded call into the scripted extractor.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub selector: String,
    pub extract_audio: bool,
    pub scratch_dir: PathBuf,
}

/// A scripted stand-in for the extraction capability.
///
/// Emits a fixed event sequence, writes a fixed artifact into the scratch
/// directory, and records every call for assertions.
pub struct ScriptedExtractor {
    pub file_name: String,
    pub content: Vec<u8>,
    pub events: Vec<ProgressEvent>,
    pub info: MediaInfo,
    /// When set, fail with this message instead of producing an artifact.
    pub fail_with: Option<String>,
    /// Artificial latency before anything happens.
    pub delay: Option<Duration>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedExtractor {
    pub fn success(file_name: &str, content: &[u8], events: Vec<ProgressEvent>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content: content.to_vec(),
            events,
            info: MediaInfo {
                title: "Test Video".to_string(),
                uploader: "Test Channel".to_string(),
                duration_seconds: 212,
                view_count: 31337,
            },
            fail_with: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        let mut extractor = Self::success("unused.mp4", b"", Vec::new());
        extractor.fail_with = Some(message.to_string());
        extractor
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        url: &str,
        format: &FormatSpec,
        scratch_dir: &Path,
        on_progress: &ProgressFn,
    ) -> Result<Extraction, DownloadError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            selector: format.selector.clone(),
            extract_audio: format.extract_audio,
            scratch_dir: scratch_dir.to_path_buf(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        for event in &self.events {
            on_progress(event.clone());
        }

        if let Some(message) = &self.fail_with {
            return Err(DownloadError::Extraction {
                message: message.clone(),
            });
        }

        let path = scratch_dir.join(&self.file_name);
        std::fs::write(&path, &self.content).expect("write scripted artifact");

        Ok(Extraction {
            info: self.info.clone(),
            file_path: Some(path),
        })
    }
}
