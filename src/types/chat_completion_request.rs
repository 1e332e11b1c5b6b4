use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, Model};

/// Parameters for a chat-completion request.
///
/// Sampling fields left as `None` are omitted from the request body so the
/// service applies its own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// The model that will complete the conversation.
    pub model: Model,

    /// The conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,

    /// Upper bound on generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling mass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Penalty applied to tokens in proportion to how often they appeared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    /// Penalty applied to tokens that appeared at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Whether the service should stream the response.
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Create a new streaming request with service-default sampling.
    pub fn new(model: Model, messages: Vec<ChatMessage>) -> Self {
        Self {
            model,
            messages,
            max_tokens: None,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            stream: true,
        }
    }

    /// Set the token limit; zero means "no limit".
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = (max_tokens > 0).then_some(max_tokens);
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top-p.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the frequency penalty.
    pub fn with_frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    /// Set the presence penalty.
    pub fn with_presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnownModel;
    use serde_json::{json, to_value};

    #[test]
    fn minimal_request_omits_sampling() {
        let request = ChatCompletionRequest::new(
            Model::Known(KnownModel::Gpt4),
            vec![ChatMessage::user("hi")],
        );
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "gpt-4",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn zero_max_tokens_is_omitted() {
        let request = ChatCompletionRequest::new(Model::from("m"), vec![]).with_max_tokens(0);
        assert_eq!(request.max_tokens, None);
        let request = request.with_max_tokens(256);
        assert_eq!(request.max_tokens, Some(256));
    }

    #[test]
    fn sampling_fields_serialize() {
        let request = ChatCompletionRequest::new(
            Model::Known(KnownModel::Gpt35Turbo),
            vec![ChatMessage::system("terse"), ChatMessage::user("hi")],
        )
        .with_max_tokens(64)
        .with_temperature(0.5)
        .with_top_p(1.0)
        .with_frequency_penalty(0.25)
        .with_presence_penalty(0.0);
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "terse"},
                    {"role": "user", "content": "hi"}
                ],
                "max_tokens": 64,
                "temperature": 0.5,
                "top_p": 1.0,
                "frequency_penalty": 0.25,
                "presence_penalty": 0.0,
                "stream": true
            })
        );
    }
}
