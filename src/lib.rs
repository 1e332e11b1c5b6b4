//! Pipe a chat transcript through an OpenAI-compatible completion service.
//!
//! A transcript is plain text split into turns by marker lines: a tab or
//! spaces followed by three or more `>` (a user turn follows) or `<` (an
//! assistant turn follows).  Text before the first marker is the system
//! prompt.  The response is streamed to the terminal and appended to a log
//! file written in the same format, so a log can be edited and piped back in
//! to continue the conversation.

// Public modules
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod observability;
pub mod session;
pub mod sse;
pub mod transcript;
pub mod transcript_log;
pub mod types;

// Re-exports
pub use client::{ChatStream, CompletionService, OpenAi};
pub use config::{Args, Config, Environment, Invocation};
pub use credentials::{CredentialStore, Keyring, resolve_api_key};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use session::{RelayStats, Session, build_request, prepare};
pub use transcript::{CONTINUE_SEPARATOR, PROMPT_SEPARATOR, parse, render};
pub use transcript_log::TranscriptLog;
pub use types::*;
