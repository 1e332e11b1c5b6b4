//! One request/response round-trip.
//!
//! The driver turns stdin into a request, opens the completion stream and
//! relays every fragment to two sinks: the terminal and the transcript log.
//! Fragments are written in arrival order, each flushed to both sinks before
//! the next is pulled from the stream.

use std::io::Write;
use std::time::Instant;

use futures::StreamExt;

use crate::client::{ChatStream, CompletionService};
use crate::config::Config;
use crate::error::Result;
use crate::observability::{STREAM_DURATION, TRANSCRIPT_MESSAGES};
use crate::transcript::{CONTINUE_SEPARATOR, PROMPT_SEPARATOR, parse};
use crate::transcript_log::TranscriptLog;
use crate::types::{ChatCompletionRequest, ChatMessage, ChatStreamEvent};

/// Trim and parse stdin.  `None` means there is nothing to send.
pub fn prepare(input: &str) -> Option<Vec<ChatMessage>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let messages = parse(input);
    TRANSCRIPT_MESSAGES.count(messages.len() as u64);
    Some(messages)
}

/// The streaming request for `messages` under `config`.
pub fn build_request(config: &Config, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
    ChatCompletionRequest::new(config.model.clone(), messages)
        .with_max_tokens(config.max_tokens)
        .with_temperature(config.temperature)
        .with_top_p(config.top_p)
        .with_frequency_penalty(config.frequency_penalty)
        .with_presence_penalty(config.presence_penalty)
}

/// What a completed relay delivered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Non-empty text fragments relayed.
    pub fragments: usize,
    /// Bytes of response text relayed.
    pub bytes: usize,
}

/// Drives one round-trip against a completion service.
pub struct Session<'a, S: CompletionService + ?Sized> {
    service: &'a S,
    vim: bool,
}

impl<'a, S: CompletionService + ?Sized> Session<'a, S> {
    /// A session against `service`; `vim` frames the response with
    /// separators on the terminal.
    pub fn new(service: &'a S, vim: bool) -> Self {
        Self { service, vim }
    }

    /// Send `request` and relay the response.
    ///
    /// The log is opened only once the service has accepted the request, so
    /// a rejected request leaves nothing on disk.  A stream error after that
    /// point is returned with the partial log left in place.
    pub async fn run<T, L, F>(
        &self,
        request: ChatCompletionRequest,
        terminal: &mut T,
        open_log: F,
    ) -> Result<RelayStats>
    where
        T: Write,
        L: Write,
        F: FnOnce() -> Result<TranscriptLog<L>>,
    {
        let messages = request.messages.clone();
        let stream = self.service.stream(request).await?;
        let mut log = open_log()?;
        log.write_header(&messages)?;
        relay(stream, terminal, &mut log, self.vim).await
    }
}

/// Copy every text fragment of `stream` to `terminal` and `log` until the
/// end-of-stream event or the end of the stream itself.
pub async fn relay<T: Write, L: Write>(
    mut stream: ChatStream,
    terminal: &mut T,
    log: &mut TranscriptLog<L>,
    vim: bool,
) -> Result<RelayStats> {
    let started = Instant::now();
    if vim {
        write!(terminal, "\n{CONTINUE_SEPARATOR}\n")?;
        terminal.flush()?;
    }

    let mut stats = RelayStats::default();
    loop {
        let Some(event) = stream.next().await else {
            tracing::debug!(
                fragments = stats.fragments,
                "stream closed without an end marker"
            );
            break;
        };
        match event? {
            ChatStreamEvent::Done => break,
            ChatStreamEvent::Chunk(chunk) => {
                let Some(text) = chunk.text().filter(|text| !text.is_empty()) else {
                    continue;
                };
                terminal.write_all(text.as_bytes())?;
                terminal.flush()?;
                log.append(text)?;
                stats.fragments += 1;
                stats.bytes += text.len();
            }
        }
    }

    writeln!(terminal)?;
    if vim {
        write!(terminal, "\n{PROMPT_SEPARATOR}\n")?;
    }
    terminal.flush()?;
    log.finish()?;

    STREAM_DURATION.add(started.elapsed().as_secs_f64());
    tracing::debug!(
        fragments = stats.fragments,
        bytes = stats.bytes,
        "response complete"
    );
    Ok(stats)
}
