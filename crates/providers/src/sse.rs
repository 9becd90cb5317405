//! Shared SSE streaming infrastructure for all provider adapters.
//!
//! Every adapter follows the same pattern: receive a `reqwest::Response`,
//! buffer chunks, split on `\n\n`, extract `data:` payloads, and feed each
//! payload to a backend-specific parser that returns `Vec<StreamEvent>`.
//!
//! This module extracts that shared logic:
//! - [`drain_data_lines`] — pull complete `data:` payloads from an SSE buffer
//! - [`sse_event_stream`] — build a `BoxStream` from a response + parser closure

use troupe_domain::stream::{BoxStream, StreamEvent};

/// Extract complete `data:` payloads from an SSE buffer.
///
/// SSE events are delimited by `\n\n`. Each event block may contain
/// `event:`, `data:`, `id:`, or `retry:` lines; only `data:` lines matter
/// here. The buffer is drained in-place: consumed bytes are removed and any
/// trailing partial event remains for the next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2); // remove the \n\n delimiter

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

/// Build a [`BoxStream`] from an SSE `reqwest::Response` and a
/// backend-specific parser closure.
///
/// The closure receives each `data:` payload string and returns zero or more
/// stream events. It is `FnMut` because adapters keep mutable assembly state
/// across calls (tool-call argument buffers).
///
/// The stream guarantees the [`StreamEvent`] contract:
/// 1. chunks are buffered and complete SSE events drained in order
/// 2. the remaining buffer is flushed when the response body closes
/// 3. transport failures yield a terminal `Error` event — never a hung stream
/// 4. exactly one `Done` is emitted (a fallback is synthesized if the parser
///    never produced one and no error terminated the stream)
pub(crate) fn sse_event_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, StreamEvent>
where
    F: FnMut(&str) -> Vec<StreamEvent> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();
        let mut done_emitted = false;
        let mut error_emitted = false;

        'read: loop {
            match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));

                    for data in drain_data_lines(&mut buffer) {
                        for event in parse_data(&data) {
                            match &event {
                                StreamEvent::Done { .. } => done_emitted = true,
                                StreamEvent::Error { .. } => error_emitted = true,
                                _ => {}
                            }
                            yield event;
                            if error_emitted {
                                break 'read;
                            }
                        }
                    }
                }
                Ok(None) => {
                    // Stream ended — flush any remaining partial event.
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                        for data in drain_data_lines(&mut buffer) {
                            for event in parse_data(&data) {
                                match &event {
                                    StreamEvent::Done { .. } => done_emitted = true,
                                    StreamEvent::Error { .. } => error_emitted = true,
                                    _ => {}
                                }
                                yield event;
                                if error_emitted {
                                    break 'read;
                                }
                            }
                        }
                    }
                    break;
                }
                Err(e) => {
                    error_emitted = true;
                    yield StreamEvent::Error {
                        message: format!("transport: {e}"),
                    };
                    break;
                }
            }
        }

        if !done_emitted && !error_emitted {
            yield StreamEvent::Done { usage: None };
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
