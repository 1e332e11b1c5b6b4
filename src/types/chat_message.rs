use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One turn of a conversation as sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking.
    pub role: Role,

    /// What they said.
    pub content: String,
}

impl ChatMessage {
    /// Create a new `ChatMessage` with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&str> for ChatMessage {
    fn from(content: &str) -> Self {
        Self::user(content)
    }
}

impl From<String> for ChatMessage {
    fn from(content: String) -> Self {
        Self::user(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn serializes_role_and_content() {
        let message = ChatMessage::assistant("Hello!");
        assert_eq!(
            to_value(&message).unwrap(),
            json!({
                "role": "assistant",
                "content": "Hello!"
            })
        );
    }

    #[test]
    fn from_str_is_user() {
        let message: ChatMessage = "hi".into();
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content, "hi");
    }
}
