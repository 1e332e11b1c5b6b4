//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! A streaming chat completion is a sequence of `data: {json}` events, each
//! followed by a blank line, and terminated by `data: [DONE]`.  This module
//! turns the raw response body into [`ChatStreamEvent`]s.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::types::{ChatCompletionChunk, ChatStreamEvent};
use crate::{Error, Result};

const DONE: &str = "[DONE]";

/// Process a stream of bytes into a stream of server-sent events.
///
/// Bytes are buffered until a complete event (terminated by a blank line) is
/// available, so events and multi-byte characters may be split across network
/// reads.  Comment lines and events without data are skipped.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<ChatStreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                // First check if we have a complete event in the buffer
                match extract_event(&mut buffer) {
                    Some(Ok(None)) => continue,
                    Some(Ok(Some(event))) => {
                        STREAM_EVENTS.click();
                        return Some((Ok(event), (stream, buffer)));
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {}
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend(bytes.iter().copied().filter(|&b| b != b'\r'));
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {
                        // End of stream: a final event may lack its blank line.
                        if buffer.iter().all(u8::is_ascii_whitespace) {
                            return None;
                        }
                        buffer.extend_from_slice(b"\n\n");
                        match extract_event(&mut buffer) {
                            Some(Ok(Some(event))) => {
                                STREAM_EVENTS.click();
                                buffer.clear();
                                return Some((Ok(event), (stream, buffer)));
                            }
                            Some(Err(e)) => {
                                STREAM_ERRORS.click();
                                buffer.clear();
                                return Some((Err(e), (stream, buffer)));
                            }
                            _ => return None,
                        }
                    }
                }
            }
        },
    )
}

/// Remove one complete event from the front of `buffer` and decode it.
///
/// Returns `None` when the buffer holds no complete event yet and
/// `Some(Ok(None))` for an event that carries nothing to report.
fn extract_event(buffer: &mut Vec<u8>) -> Option<Result<Option<ChatStreamEvent>>> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let raw: Vec<u8> = buffer.drain(..end + 2).collect();
    let event_text = match std::str::from_utf8(&raw[..end]) {
        Ok(text) => text,
        Err(e) => return Some(Err(e.into())),
    };

    let mut data: Option<String> = None;
    for line in event_text.lines() {
        // Comments keep idle connections open.
        if line.starts_with(':') {
            continue;
        }
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    match data.as_deref().map(str::trim) {
        None | Some("") => Some(Ok(None)),
        Some(DONE) => Some(Ok(Some(ChatStreamEvent::Done))),
        Some(json_str) => Some(parse_data(json_str).map(Some)),
    }
}

/// Decode the JSON payload of one event.
fn parse_data(json_str: &str) -> Result<ChatStreamEvent> {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        #[serde(rename = "type")]
        error_type: Option<String>,
        message: Option<String>,
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(json_str) {
        return Err(Error::api(
            500,
            Some(
                envelope
                    .error
                    .error_type
                    .unwrap_or_else(|| "stream_error".to_string()),
            ),
            envelope
                .error
                .message
                .unwrap_or_else(|| json_str.to_string()),
            None,
        ));
    }

    serde_json::from_str::<ChatCompletionChunk>(json_str)
        .map(ChatStreamEvent::Chunk)
        .map_err(|e| {
            Error::serialization(
                format!("Failed to parse event JSON: {e}"),
                Some(Box::new(e)),
            )
        })
}
