/*!
 * Line-oriented decoding of streamed HTTP bodies.
 *
 * Both SSE (OpenAI, Anthropic) and NDJSON (Ollama) responses are sequences
 * of lines. Network chunks can end anywhere, including inside a multi-byte
 * UTF-8 sequence, so bytes are buffered until a full line is available.
 */

use bytes::{Buf, BytesMut};
use futures::Stream;
use futures_util::StreamExt;

use crate::errors::LlmError;
use crate::providers::FragmentCallback;

/// Buffers raw bytes and yields complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk and return every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line = self.pending.split_to(pos);
            self.pending.advance(1);
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Flush whatever is left once the body has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        if line.is_empty() { None } else { Some(line) }
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end_matches('\r').to_string()
}

/// Payload of an SSE `data:` line
pub fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// Feed every line of `stream` to `handle` until it returns false or the body ends
pub async fn for_each_line<S, E, F>(mut stream: S, mut handle: F) -> Result<(), LlmError>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Into<LlmError>,
    F: FnMut(&str) -> Result<bool, LlmError>,
{
    let mut buffer = LineBuffer::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        for line in buffer.push(&chunk) {
            if line.trim().is_empty() {
                continue;
            }
            if !handle(&line)? {
                return Ok(());
            }
        }
    }

    if let Some(line) = buffer.finish() {
        handle(&line)?;
    }
    Ok(())
}

/// Accumulates streamed fragments and forwards each one to the caller
pub struct FragmentSink {
    text: String,
    on_fragment: Option<FragmentCallback>,
}

impl FragmentSink {
    pub fn new(on_fragment: Option<FragmentCallback>) -> Self {
        Self {
            text: String::new(),
            on_fragment,
        }
    }

    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.text.push_str(fragment);
        if let Some(callback) = &self.on_fragment {
            callback(fragment);
        }
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
