//! Payload encoding for downloaded artifacts.
//!
//! A finished artifact has to travel back through a text-only JSON channel.
//! Two strategies exist:
//!
//! - **Inline**: the file's bytes are base64-encoded between sentinel lines,
//!   followed by metadata lines. Costs ~4/3 the file size on the wire but
//!   needs no shared filesystem. Default.
//! - **Shared directory**: the artifact is moved to a well-known directory
//!   and only its path is returned.
//!
//! Decoding the sentinel-delimited block must reproduce the original bytes
//! exactly, including empty files and content containing newline bytes.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};

/// Opening sentinel for an inline base64 block.
pub const FILE_DATA_START: &str = "FILE_DATA_START";
/// Closing sentinel for an inline base64 block.
pub const FILE_DATA_END: &str = "FILE_DATA_END";

/// The transport-safe representation of a downloaded artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Base64-encoded file content for embedding in the response text.
    Inline {
        /// The encoded bytes.
        data: String,
    },
    /// Path to the artifact in the shared downloads directory.
    FileRef {
        /// Where the artifact was left.
        path: PathBuf,
    },
}

/// Maps a file extension to a MIME type.
///
/// Unknown extensions fall back to `application/octet-stream`.
#[must_use]
pub fn mime_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
        return "application/octet-stream";
    };

    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "flv" => "video/x-flv",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Base64-encodes raw file content for inline transport.
#[must_use]
pub fn encode_inline(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

/// Renders the sentinel-framed data block plus metadata lines.
///
/// ```text
/// FILE_DATA_START
/// <base64>
/// FILE_DATA_END
/// FILENAME: clip.mp4
/// MIME_TYPE: video/mp4
/// SIZE: 1024
/// ```
#[must_use]
pub fn render_inline_block(data: &str, file_name: &str, mime_type: &str, size: u64) -> String {
    format!(
        "{FILE_DATA_START}\n{data}\n{FILE_DATA_END}\n\
         FILENAME: {file_name}\nMIME_TYPE: {mime_type}\nSIZE: {size}"
    )
}

/// Extracts and decodes the base64 block from a response text.
///
/// Returns `None` when the text contains no complete sentinel pair or the
/// content between them is not valid base64. Counterpart of
/// [`render_inline_block`]; clients use the same framing to recover files.
#[must_use]
pub fn decode_inline_block(text: &str) -> Option<Vec<u8>> {
    let start = text.find(FILE_DATA_START)? + FILE_DATA_START.len();
    let end = text[start..].find(FILE_DATA_END)? + start;
    let encoded = text[start..end].trim();
    BASE64_STANDARD.decode(encoded).ok()
}
