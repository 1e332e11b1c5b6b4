use crate::types::ChatCompletionChunk;

/// One decoded event of a streaming chat completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatStreamEvent {
    /// A chunk of the response.
    Chunk(ChatCompletionChunk),

    /// The explicit end-of-stream marker (`data: [DONE]`).
    Done,
}

impl ChatStreamEvent {
    /// The text fragment carried by this event, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ChatStreamEvent::Chunk(chunk) => chunk.text(),
            ChatStreamEvent::Done => None,
        }
    }

    /// Returns true for the end-of-stream marker.
    pub fn is_done(&self) -> bool {
        matches!(self, ChatStreamEvent::Done)
    }
}
