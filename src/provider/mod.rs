//! LLM client capability.
//!
//! The loop only ever sees [`LlmClient`]: history in, one decoded
//! [`AssistantMessage`] out. Ships with [`OpenAiClient`] for any
//! OpenAI-compatible chat-completions endpoint and [`MockLlmClient`] for
//! tests.

use async_trait::async_trait;

use crate::error::{AccordError, AccordResult};
use crate::schema::{AssistantMessage, MessageHistory};

/// LLM transport trait — abstracts the API call and structured-output
/// decoding. Implementations must not interpret the conversation; decoding
/// failures surface as protocol errors, transport failures as transport
/// errors.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, history: &MessageHistory) -> AccordResult<AssistantMessage>;
}

mod openai;
pub use openai::OpenAiClient;

/// Test client with scripted responses, in emission order.
pub struct MockLlmClient {
    responses: std::sync::Mutex<Vec<AssistantMessage>>,
}

impl MockLlmClient {
    pub fn new(responses: Vec<AssistantMessage>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _history: &MessageHistory) -> AccordResult<AssistantMessage> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(AccordError::Transport("no more scripted responses".into()));
        }
        Ok(responses.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_pops_in_order() {
        let client = MockLlmClient::new(vec![
            AssistantMessage::with_answer(None, "first"),
            AssistantMessage::with_answer(None, "second"),
        ]);
        let history = MessageHistory::new("sys");
        assert_eq!(
            client.complete(&history).await.unwrap().answer.as_deref(),
            Some("first")
        );
        assert_eq!(
            client.complete(&history).await.unwrap().answer.as_deref(),
            Some("second")
        );
        assert!(matches!(
            client.complete(&history).await,
            Err(AccordError::Transport(_))
        ));
    }

    #[test]
    fn llm_client_is_object_safe() {
        fn _assert_object_safe(_: &dyn LlmClient) {}
    }
}
