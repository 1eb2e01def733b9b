//! # SSE Decoder
//!
//! Turns a chunked byte stream into server-sent event frames, then into typed
//! events. Handles:
//! - Lines split across chunks (bytes are buffered until `\n`)
//! - `\r\n` line endings and `:` comment lines
//! - Multiple `data:` lines per frame (joined with `\n`)
//! - Payloads that fail to parse (logged and dropped, never surfaced)
//! - A frame cut off before its blank separator line (discarded at end of input)
//!
//! Read errors from the byte source end the stream with an `Err` item.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use serde::de::DeserializeOwned;
use tokio_stream::StreamExt;
use tracing::{debug, trace, warn};
use vtx_core::text::{sanitize_wtf8, truncate_str};

use crate::provider::ProviderError;

/// One decoded SSE frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` line, if any.
    pub event: Option<String>,
    /// Concatenated `data:` lines.
    pub data: String,
}

/// Incremental frame parser. Feed bytes with [`push`](Self::push), drain
/// frames with [`next_frame`](Self::next_frame).
#[derive(Debug, Default)]
pub struct SseFrameParser {
    buffer: BytesMut,
    event: Option<String>,
    data: Vec<String>,
}

impl SseFrameParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            ..Self::default()
        }
    }

    /// Append a chunk of raw bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete frame from buffered lines, if any.
    pub fn next_frame(&mut self) -> Option<SseFrame> {
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line_bytes = self.buffer.split_to(newline_pos + 1);
            line_bytes.truncate(newline_pos);
            if line_bytes.last() == Some(&b'\r') {
                line_bytes.truncate(line_bytes.len() - 1);
            }
            let line = sanitize_wtf8(&line_bytes).into_owned();
            if let Some(frame) = self.process_line(&line) {
                return Some(frame);
            }
        }
        None
    }

    /// End of input. A frame completes only on its blank separator line, so
    /// an unterminated tail and any pending fields are discarded.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if let Some(frame) = self.next_frame() {
            return Some(frame);
        }
        if !self.buffer.is_empty() || !self.data.is_empty() {
            debug!(
                buffered_bytes = self.buffer.len(),
                pending_data_lines = self.data.len(),
                "discarding unterminated SSE frame at end of stream"
            );
        }
        self.buffer.clear();
        self.event = None;
        self.data.clear();
        None
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            let event = self.event.take();
            if self.data.is_empty() {
                return None;
            }
            let data = std::mem::take(&mut self.data).join("\n");
            return Some(SseFrame { event, data });
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => trace!(field, "ignoring SSE field"),
        }
        None
    }
}

/// Decode a byte stream into SSE frames.
pub fn decode_sse_frames<S, E>(byte_stream: S) -> impl Stream<Item = Result<SseFrame, ProviderError>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<ProviderError>,
{
    futures::stream::unfold(
        (byte_stream, SseFrameParser::new(), false),
        |(mut stream, mut parser, done)| async move {
            if done {
                return None;
            }
            loop {
                if let Some(frame) = parser.next_frame() {
                    return Some((Ok(frame), (stream, parser, false)));
                }
                match stream.next().await {
                    Some(Ok(chunk)) => parser.push(&chunk),
                    Some(Err(e)) => {
                        let err: ProviderError = e.into();
                        warn!(error = %err, "SSE stream read error");
                        return Some((Err(err), (stream, parser, true)));
                    }
                    None => {
                        return parser
                            .finish()
                            .map(|frame| (Ok(frame), (stream, parser, true)));
                    }
                }
            }
        },
    )
}

/// Decode a byte stream into typed events, dropping frames whose payload
/// does not parse as `T`.
pub fn decode_sse_events<T, S, E>(byte_stream: S) -> impl Stream<Item = Result<T, ProviderError>>
where
    T: DeserializeOwned,
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<ProviderError>,
{
    decode_sse_frames(byte_stream).filter_map(|item| match item {
        Ok(frame) => parse_sse_data(&frame).map(Ok),
        Err(e) => Some(Err(e)),
    })
}

/// Parse a frame's payload, logging and returning `None` on failure.
pub fn parse_sse_data<T: DeserializeOwned>(frame: &SseFrame) -> Option<T> {
    match serde_json::from_str(&frame.data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(
                event = frame.event.as_deref(),
                error = %e,
                data_preview = truncate_str(&frame.data, 100),
                "Failed to parse SSE data, dropping frame"
            );
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
