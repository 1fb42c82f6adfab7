use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::AccordConfig;
use crate::error::{AccordError, AccordResult};
use crate::schema::{AssistantMessage, MessageHistory};

use super::LlmClient;

/// Client for OpenAI-compatible chat-completions endpoints (OpenAI proper,
/// koboldcpp, llama.cpp server, vLLM, ...). The assistant is instructed via
/// the system prompt to answer in the requirement/answer JSON schema; this
/// client only transports and decodes.
pub struct OpenAiClient {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            model: model.into(),
            api_key: None,
            temperature: 0.5,
        }
    }

    pub fn from_config(config: &AccordConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn build_body(&self, history: &MessageHistory) -> Value {
        json!({
            "model": self.model,
            "messages": history.to_wire_format(),
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, history: &MessageHistory) -> AccordResult<AssistantMessage> {
        let mut request = self.client.post(&self.url).json(&self.build_body(history));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: Value = response.json().await?;

        let content = body["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| {
                AccordError::Transport("completion response has no message content".into())
            })?;

        AssistantMessage::from_json(content)
    }
}
