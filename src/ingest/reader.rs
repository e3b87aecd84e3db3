//! Source reader
//!
//! Streams one coupon source line by line without loading it into memory.
//! The underlying handle is owned by the reader and closed when the reader is
//! dropped, whichever way the load ends.
//!
//! Lines are read as raw bytes. A line that is not valid UTF-8 is decoded
//! lossily and logged; it never ends the stream. A read error in the middle
//! of the stream is not fatal either: it is logged, the stream is treated as
//! finished and [`SourceReader::interrupted`] reports it.

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::ingest::error::{IngestError, IngestResult};
use crate::models::SourceId;

/// Locator meaning "read from standard input"
pub const STDIN_LOCATOR: &str = "-";

type BoxedStream = Box<dyn AsyncBufRead + Send + Unpin>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Streaming,
    Finished,
    Interrupted,
}

/// Lazy, finite, non-restartable sequence of codes from one source
pub struct SourceReader {
    source: SourceId,
    locator: String,
    stream: BoxedStream,
    /// Bytes of the current line; survives a cancelled `next_code`
    buf: Vec<u8>,
    lines_read: u64,
    state: ReadState,
}

impl SourceReader {
    /// Open the source at `path` (`-` reads standard input)
    pub async fn open(source: SourceId, path: impl AsRef<Path>) -> IngestResult<Self> {
        let path = path.as_ref();

        if path == Path::new(STDIN_LOCATOR) {
            tracing::info!(source = %source, "Reading coupon source from stdin");
            return Ok(Self::from_reader(
                source,
                STDIN_LOCATOR,
                BufReader::new(tokio::io::stdin()),
            ));
        }

        let file = File::open(path)
            .await
            .map_err(|error| IngestError::SourceOpen {
                source_id: source,
                path: PathBuf::from(path),
                error,
            })?;

        tracing::debug!(source = %source, path = %path.display(), "Opened coupon source");
        Ok(Self::from_reader(
            source,
            path.display().to_string(),
            BufReader::new(file),
        ))
    }

    /// Wrap an already opened buffered stream
    pub fn from_reader<R>(source: SourceId, locator: impl Into<String>, reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            source,
            locator: locator.into(),
            stream: Box::new(reader),
            buf: Vec::new(),
            lines_read: 0,
            state: ReadState::Streaming,
        }
    }

    /// Next code, or `None` at end of stream or after a read error
    ///
    /// Cancel safe: bytes of a partially read line stay in the buffer and
    /// the next call continues the same line.
    pub async fn next_code(&mut self) -> Option<String> {
        if self.state != ReadState::Streaming {
            return None;
        }

        match self.stream.read_until(b'\n', &mut self.buf).await {
            Ok(0) if self.buf.is_empty() => {
                self.state = ReadState::Finished;
                None
            }
            Ok(_) => {
                self.lines_read += 1;
                let line = std::mem::take(&mut self.buf);
                Some(self.decode(line))
            }
            Err(e) => {
                tracing::warn!(
                    source = %self.source,
                    locator = %self.locator,
                    lines_read = self.lines_read,
                    error = %e,
                    "Read error in coupon source, treating as end of stream"
                );
                crate::metrics::record_read_error(self.source.as_str());
                self.buf.clear();
                self.state = ReadState::Interrupted;
                None
            }
        }
    }

    /// Strip the `\n` or `\r\n` terminator and decode
    fn decode(&self, mut line: Vec<u8>) -> String {
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }

        match String::from_utf8(line) {
            Ok(code) => code,
            Err(e) => {
                let code = String::from_utf8_lossy(e.as_bytes()).into_owned();
                tracing::warn!(
                    source = %self.source,
                    locator = %self.locator,
                    line = self.lines_read,
                    code = %code,
                    "Coupon line is not valid UTF-8, decoded lossily"
                );
                code
            }
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Lines yielded so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Whether the stream ended because of a read error
    pub fn interrupted(&self) -> bool {
        self.state == ReadState::Interrupted
    }
}

impl std::fmt::Debug for SourceReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceReader")
            .field("source", &self.source)
            .field("locator", &self.locator)
            .field("lines_read", &self.lines_read)
            .field("state", &self.state)
            .finish()
    }
}
