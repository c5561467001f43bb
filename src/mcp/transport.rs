//! Framed stdio transport.
//!
//! Messages are UTF-8 JSON-RPC documents, one per line. stdin carries
//! requests and notifications in; stdout carries responses out and nothing
//! else — logging and extractor output go to stderr or are captured. Any
//! stray byte on stdout is a protocol-breaking defect, which is why every
//! write goes through [`MessageWriter`]: the full message is serialised
//! first, then written and flushed under an exclusive lock, so concurrent
//! tool tasks can never interleave partial lines.
//!
//! Both halves are generic over the underlying streams; production uses
//! stdin/stdout, tests substitute in-memory pipes.

use std::io;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Buffered line reader for incoming messages.
pub struct FramedReader<R = tokio::io::Stdin> {
    inner: BufReader<R>,
}

impl FramedReader {
    /// Creates a reader over stdin.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl Default for FramedReader {
    fn default() -> Self {
        Self::stdin()
    }
}

impl<R: AsyncRead + Unpin> FramedReader<R> {
    /// Wraps an arbitrary byte stream.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
        }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.inner.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }
}

/// Exclusive, cloneable writer for outgoing messages.
///
/// Cloning shares the same underlying stream and lock, so any number of
/// concurrent tool tasks still produce one whole line per message.
pub struct MessageWriter<W = tokio::io::Stdout> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for MessageWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MessageWriter {
    /// Creates a writer over stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl Default for MessageWriter {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<W: AsyncWrite + Unpin + Send> MessageWriter<W> {
    /// Wraps an arbitrary byte stream.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Serialises a message and writes it as exactly one newline-terminated
    /// line, flushed before the lock is released.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_message<T: Serialize + Sync>(&self, message: &T) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Serialised JSON-RPC never contains raw newlines; embedded ones are
        // escaped by serde_json.
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        let mut writer = self.inner.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{ErrorResponse, RequestId, Response};

    #[tokio::test]
    async fn reads_lines_and_strips_terminators() {
        let input: &[u8] = b"first\nsecond\r\nthird";
        let mut reader = FramedReader::new(input);

        assert_eq!(reader.read_line().await.unwrap(), Some("first".to_string()));
        assert_eq!(reader.read_line().await.unwrap(), Some("second".to_string()));
        assert_eq!(reader.read_line().await.unwrap(), Some("third".to_string()));
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn writes_one_line_per_message() {
        let writer = MessageWriter::new(Vec::new());

        let response = Response::success(
            RequestId::Number(1),
            serde_json::json!({"message": "hello\nworld"}),
        );
        writer.write_message(&response).await.unwrap();
        writer
            .write_message(&ErrorResponse::method_not_found(
                RequestId::Number(2),
                "x/y",
            ))
            .await
            .unwrap();

        let buffer = writer.inner.lock().await;
        let text = String::from_utf8(buffer.clone()).unwrap();
        let lines: Vec<&str> = text.trim_end().split('\n').collect();
        assert_eq!(lines.len(), 2, "each message is exactly one line");
        for line in lines {
            assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
        }
    }

    #[tokio::test]
    async fn clones_share_the_same_stream() {
        let writer = MessageWriter::new(Vec::new());
        let clone = writer.clone();

        clone
            .write_message(&Response::success(RequestId::Number(1), serde_json::json!({})))
            .await
            .unwrap();

        let buffer = writer.inner.lock().await;
        assert!(!buffer.is_empty());
    }
}
