//! The `Content-Length` framing codec.
//!
//! Every LSP message travels as `Content-Length: <N>\r\n\r\n<N bytes of
//! JSON>`. Additional headers are tolerated and skipped; only the length
//! header matters. The reader distinguishes recoverable framing problems
//! (missing length, short body) from terminal ones (closed stream) so a
//! receiver loop can keep going through garbage until the stream dies.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Header key carrying the body length. Matching is case-sensitive.
const CONTENT_LENGTH: &str = "Content-Length:";

/// Errors produced while reading or writing frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream reached EOF or the connection was closed.
    #[error("end of file or broken connection")]
    Closed,

    /// A header block ended without a usable `Content-Length`.
    #[error("header had no content length")]
    MissingLength,

    /// The body ended before the declared length was read.
    #[error("read {got} bytes instead of {wanted}")]
    ShortRead { wanted: usize, got: usize },

    /// Any other I/O failure.
    #[error("frame io: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// Terminal errors end the stream; anything else lets the caller resume
    /// at the next header block.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FrameError::Closed | FrameError::Io(_))
    }
}

/// Extract the length from a header line.
///
/// Equivalent to scanning for `Content-Length:\s*(\d+)`: the key may appear
/// anywhere in the line, whitespace after the colon is skipped, and the
/// leading digit run is the value.
fn parse_content_length(line: &str) -> Option<usize> {
    let start = line.find(CONTENT_LENGTH)? + CONTENT_LENGTH.len();
    let rest = line[start..].trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Reads framed payloads off a buffered byte stream.
pub struct FrameReader<R> {
    inner: R,
    line: String,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
        }
    }

    /// Read one frame: header lines up to the blank separator, then exactly
    /// the declared number of body bytes.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, FrameError> {
        let mut content_len = 0usize;
        loop {
            self.line.clear();
            let read = self.inner.read_line(&mut self.line).await?;
            if read == 0 {
                return Err(FrameError::Closed);
            }
            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }
            match parse_content_length(line) {
                Some(len) => content_len = len,
                None => trace!(header = %line, "skipping header line"),
            }
        }

        if content_len == 0 {
            return Err(FrameError::MissingLength);
        }

        let mut body = vec![0u8; content_len];
        let mut filled = 0usize;
        while filled < content_len {
            let n = self.inner.read(&mut body[filled..]).await?;
            if n == 0 {
                return Err(FrameError::ShortRead {
                    wanted: content_len,
                    got: filled,
                });
            }
            filled += n;
        }
        Ok(body)
    }
}

/// Writes framed payloads onto a byte stream.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Emit `Content-Length: <len>\r\n\r\n` followed by the payload.
    ///
    /// Header and body go out in a single write; the protocol permits
    /// splitting but receivers on the other side may be intolerant.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<(), FrameError> {
        let header = format!("Content-Length: {}\r\n\r\n", payload.len());
        let mut message = Vec::with_capacity(header.len() + payload.len());
        message.extend_from_slice(header.as_bytes());
        message.extend_from_slice(payload);
        self.inner.write_all(&message).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shut down the write side of the stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn read_all(input: &[u8]) -> Result<Vec<u8>, FrameError> {
        FrameReader::new(BufReader::new(input)).read_frame().await
    }

    #[tokio::test]
    async fn round_trip_preserves_payload() {
        let payload = br#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
        let mut wire = Vec::new();
        FrameWriter::new(&mut wire).write_frame(payload).await.unwrap();

        let expected_header = format!("Content-Length: {}\r\n\r\n", payload.len());
        assert!(wire.starts_with(expected_header.as_bytes()));

        let body = read_all(&wire).await.unwrap();
        assert_eq!(body, payload);
    }

    #[tokio::test]
    async fn unknown_headers_are_skipped() {
        let wire = b"Content-Type: application/json\r\nContent-Length: 2\r\nX-Custom: yes\r\n\r\n{}";
        let body = read_all(wire).await.unwrap();
        assert_eq!(body, b"{}");
    }

    #[tokio::test]
    async fn malformed_lines_before_valid_header() {
        let wire = b"garbage without colon\r\nContent-Length: nope\r\nContent-Length: 4\r\n\r\ntrue";
        let body = read_all(wire).await.unwrap();
        assert_eq!(body, b"true");
    }

    #[tokio::test]
    async fn whitespace_after_colon_is_tolerated() {
        let wire = b"Content-Length:    5\r\n\r\nhello";
        let body = read_all(wire).await.unwrap();
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn blank_line_without_length_is_recoverable() {
        let wire = b"\r\nContent-Length: 2\r\n\r\n{}";
        let mut reader = FrameReader::new(BufReader::new(&wire[..]));

        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, FrameError::MissingLength));
        assert!(!err.is_terminal());

        // The next attempt resumes at the following header block.
        let body = reader.read_frame().await.unwrap();
        assert_eq!(body, b"{}");
    }

    #[tokio::test]
    async fn zero_length_is_recoverable() {
        let err = read_all(b"Content-Length: 0\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, FrameError::MissingLength));
        assert!(!err.is_terminal());
    }

    #[tokio::test]
    async fn short_body_reports_counts() {
        let err = read_all(b"Content-Length: 10\r\n\r\nabc").await.unwrap_err();
        match err {
            FrameError::ShortRead { wanted, got } => {
                assert_eq!(wanted, 10);
                assert_eq!(got, 3);
            }
            other => panic!("expected short read, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn eof_is_terminal() {
        let err = read_all(b"").await.unwrap_err();
        assert!(matches!(err, FrameError::Closed));
        assert!(err.is_terminal());
    }

    #[tokio::test]
    async fn consecutive_frames_on_one_stream() {
        let mut wire = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut wire);
            writer.write_frame(b"first").await.unwrap();
            writer.write_frame(b"second").await.unwrap();
        }
        let mut reader = FrameReader::new(BufReader::new(&wire[..]));
        assert_eq!(reader.read_frame().await.unwrap(), b"first");
        assert_eq!(reader.read_frame().await.unwrap(), b"second");
        assert!(matches!(
            reader.read_frame().await.unwrap_err(),
            FrameError::Closed
        ));
    }

    #[test]
    fn content_length_matching_is_case_sensitive() {
        assert_eq!(parse_content_length("Content-Length: 42"), Some(42));
        assert_eq!(parse_content_length("content-length: 42"), None);
        assert_eq!(parse_content_length("Content-Length:7"), Some(7));
        assert_eq!(parse_content_length("Content-Length: 12extra"), Some(12));
        assert_eq!(parse_content_length("Content-Length: "), None);
    }
}
