use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::config::AdvisorConfig;
use super::prompts::Prompt;
use super::Advisor;
use crate::error::AdvisorError;

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone)]
pub struct ChatAdvisor {
    client: Client,
    config: AdvisorConfig,
}

impl ChatAdvisor {
    #[must_use]
    pub fn new(config: AdvisorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }
}

#[async_trait]
impl Advisor for ChatAdvisor {
    async fn complete(&self, prompt: &Prompt) -> Result<String, AdvisorError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &prompt.system {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt.user.clone(),
        });
        let payload = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: prompt.temperature,
        };

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdvisorError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .ok_or(AdvisorError::EmptyResponse)?;

        tracing::debug!(model = %self.config.model, chars = content.len(), "advisor replied");
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
