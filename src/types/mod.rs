// Public modules
pub mod chat_completion_chunk;
pub mod chat_completion_request;
pub mod chat_message;
pub mod chat_stream_event;
pub mod model;
pub mod role;

// Re-exports
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta, FinishReason};
pub use chat_completion_request::ChatCompletionRequest;
pub use chat_message::ChatMessage;
pub use chat_stream_event::ChatStreamEvent;
pub use model::{KnownModel, Model};
pub use role::{Role, RoleParseError};
