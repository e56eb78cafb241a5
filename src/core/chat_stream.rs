//! Incremental decoding of streamed chat responses.
//!
//! A response body is split into lines, each line is reduced to a payload
//! according to its [`Framing`], and a backend-specific [`FrameDecoder`]
//! turns payloads into text deltas. The result is exposed as a pull-based
//! [`DeltaStream`] that is drained by exactly one consumer.

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::error::ChatError;

/// What a single payload means for the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Delta(String),
    /// Explicit end-of-stream marker.
    Done,
    /// Keep-alives, role-only deltas and malformed payloads.
    Skip,
    /// The backend reported an error inside the stream.
    Failed(ChatError),
}

pub trait FrameDecoder: Send + Sync + 'static {
    fn decode(&self, payload: &str) -> Frame;
}

/// How payloads are carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Server-sent events: only `data:` lines carry payloads.
    ServerSentEvents,
    /// One JSON document per line; a `data:` prefix is tolerated.
    JsonLines,
}

impl Framing {
    /// Whether a body that closes without [`Frame::Done`] was cut off.
    /// JSON-lines bodies end when the connection closes.
    pub fn requires_end_marker(self) -> bool {
        matches!(self, Framing::ServerSentEvents)
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Reduce one line to its payload, or `None` for lines that carry nothing.
pub fn line_payload(line: &str, framing: Framing) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    match framing {
        Framing::ServerSentEvents => extract_data_payload(line),
        Framing::JsonLines => Some(extract_data_payload(line).unwrap_or(line)),
    }
}

/// Accumulates raw bytes and hands out complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete line. Lines that are not valid UTF-8 are dropped.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let newline_pos = memchr(b'\n', &self.buffer)?;
            let line = std::str::from_utf8(&self.buffer[..newline_pos]).map(str::to_owned);
            self.buffer.drain(..=newline_pos);
            match line {
                Ok(line) => return Some(line),
                Err(err) => warn!("Skipping stream line with invalid UTF-8: {err}"),
            }
        }
    }

    /// Whatever is left once the body has ended without a final newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        String::from_utf8(rest).ok()
    }
}

/// Decode every complete line currently buffered.
///
/// Returns the frames in order and stops early after `Done` or `Failed`.
pub fn drain_frames(
    lines: &mut LineBuffer,
    framing: Framing,
    decoder: &dyn FrameDecoder,
) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Some(line) = lines.next_line() {
        if let Some(frame) = decode_line(&line, framing, decoder) {
            let terminal = matches!(frame, Frame::Done | Frame::Failed(_));
            frames.push(frame);
            if terminal {
                break;
            }
        }
    }
    frames
}

fn decode_line(line: &str, framing: Framing, decoder: &dyn FrameDecoder) -> Option<Frame> {
    let payload = line_payload(line, framing)?;
    match decoder.decode(payload) {
        Frame::Skip => None,
        frame => Some(frame),
    }
}

type DeltaItems = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// Cancellable, single-consumer sequence of text deltas.
///
/// The stream ends after the end-of-stream marker, when the body closes, on
/// the first error, or once cancelled. Dropping it releases the underlying
/// connection.
pub struct DeltaStream {
    inner: DeltaItems,
    cancel: CancellationToken,
    finished: bool,
}

impl DeltaStream {
    pub fn new(
        inner: impl Stream<Item = Result<String, ChatError>> + Send + 'static,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Box::pin(inner),
            cancel,
            finished: false,
        }
    }

    /// Decode a streaming HTTP response body.
    pub fn from_response<D: FrameDecoder>(
        provider: &'static str,
        response: reqwest::Response,
        framing: Framing,
        decoder: D,
        cancel: CancellationToken,
    ) -> Self {
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|err| ChatError::from_reqwest(provider, err)));
        Self::from_body(provider, body, framing, decoder, cancel)
    }

    /// Decode any chunked body. A body that closes before the end-of-stream
    /// marker its framing requires yields a decode error.
    pub fn from_body<B, S, D>(
        provider: &'static str,
        body: S,
        framing: Framing,
        decoder: D,
        cancel: CancellationToken,
    ) -> Self
    where
        B: AsRef<[u8]> + Send,
        S: Stream<Item = Result<B, ChatError>> + Send + 'static,
        D: FrameDecoder,
    {
        let token = cancel.clone();
        let stream = async_stream::stream! {
            let mut body = Box::pin(body);
            let mut lines = LineBuffer::default();
            'read: loop {
                let chunk = tokio::select! {
                    _ = token.cancelled() => {
                        debug!("{provider} stream cancelled");
                        break 'read;
                    }
                    chunk = body.next() => chunk,
                };

                match chunk {
                    Some(Ok(bytes)) => {
                        lines.push(bytes.as_ref());
                        for frame in drain_frames(&mut lines, framing, &decoder) {
                            match frame {
                                Frame::Delta(text) => yield Ok(text),
                                Frame::Done => break 'read,
                                Frame::Failed(err) => {
                                    yield Err(err);
                                    break 'read;
                                }
                                Frame::Skip => {}
                            }
                        }
                    }
                    Some(Err(err)) => {
                        yield Err(err);
                        break 'read;
                    }
                    None => {
                        let mut saw_done = false;
                        if let Some(frame) = lines
                            .finish()
                            .and_then(|line| decode_line(&line, framing, &decoder))
                        {
                            match frame {
                                Frame::Delta(text) => yield Ok(text),
                                Frame::Failed(err) => {
                                    yield Err(err);
                                    break 'read;
                                }
                                Frame::Done => saw_done = true,
                                Frame::Skip => {}
                            }
                        }
                        if framing.requires_end_marker() && !saw_done {
                            warn!("{provider} stream closed before its end-of-stream marker");
                            yield Err(ChatError::decode(
                                provider,
                                "stream ended before end-of-stream marker",
                            ));
                        } else {
                            debug!("{provider} stream body closed");
                        }
                        break 'read;
                    }
                }
            }
        };
        Self::new(stream, cancel)
    }

    /// A stream over already-known deltas.
    pub fn from_deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<Result<String, ChatError>> =
            deltas.into_iter().map(|d| Ok(d.into())).collect();
        Self::new(futures_util::stream::iter(items), CancellationToken::new())
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Stream for DeltaStream {
    type Item = Result<String, ChatError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished || self.cancel.is_cancelled() {
            self.finished = true;
            return Poll::Ready(None);
        }
        let next = self.inner.as_mut().poll_next(cx);
        if let Poll::Ready(None) = next {
            self.finished = true;
        }
        next
    }
}

impl std::fmt::Debug for DeltaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeltaStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.finished)
            .finish()
    }
}
