//! Ollama-backed text generator

use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    Ollama,
};

use super::{GenerationError, TextGenerator};

/// Ollama client wrapper
pub struct OllamaGenerator {
    client: Ollama,
    model: String,
}

impl OllamaGenerator {
    /// Create a new Ollama generator
    pub fn new(url: &str, model: &str) -> Self {
        // Parse URL to extract host and port
        let url = url::Url::parse(url)
            .unwrap_or_else(|_| url::Url::parse("http://localhost:11434").unwrap());

        let host = url.host_str().unwrap_or("localhost").to_string();
        let port = url.port().unwrap_or(11434);

        Self {
            client: Ollama::new(format!("http://{}", host), port),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatMessageRequest::new(
            self.model.clone(),
            vec![ChatMessage::user(prompt.to_string())],
        );

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| GenerationError::Provider(e.to_string()))?;

        Ok(response.message.content)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
