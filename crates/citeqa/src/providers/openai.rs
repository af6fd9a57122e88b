//! OpenAI-compatible chat completion client (Groq and similar hosted APIs)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::http::{build_client, check_status, retry_request};
use super::llm::LlmProvider;

/// Chat completion client for `/chat/completions` endpoints
pub struct OpenAiCompatLlm {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatLlm {
    /// Create a client; the API key is read from `config.api_key_env`
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            Error::Config(format!(
                "{} is not set; hosted LLM backends need an API key",
                config.api_key_env
            ))
        })?;

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }
}

fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::llm("completion response had no content"))
}

#[async_trait]
impl LlmProvider for OpenAiCompatLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let (client, url, api_key) = (&self.client, url.as_str(), self.api_key.as_str());
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            stream: false,
        };
        let request = &request;

        tracing::debug!("Requesting completion from {} with model {}", self.base_url, self.model);

        retry_request(self.max_retries, || async move {
            let response = client
                .post(url)
                .bearer_auth(api_key)
                .json(request)
                .send()
                .await
                .map_err(|e| Error::llm(format!("Completion request failed: {}", e)))?;

            let response = check_status(response, "Completion", Error::Llm).await?;
            let body: ChatResponse = response
                .json()
                .await
                .map_err(|e| Error::llm(format!("Failed to parse completion response: {}", e)))?;

            first_choice(body)
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);

        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
