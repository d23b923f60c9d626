use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::engine::CompletionEngine;
use crate::error::{CompletionError, ConfigError};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat completions client for OpenAI and compatible APIs.
pub struct OpenAiEngine {
    client: Client,
    endpoint: Url,
    model: String,
    temperature: f32,
}

impl OpenAiEngine {
    #[tracing::instrument(skip(config), fields(model = %config.model, base_url = %config.base_url))]
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let endpoint = chat_endpoint(&config.base_url)?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| ConfigError::InvalidApiKey)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ConfigError::ClientBuild)?;

        tracing::info!(endpoint = %endpoint, "Completion client ready");
        Ok(Self {
            client,
            endpoint,
            model: config.model,
            temperature: config.temperature,
        })
    }
}

fn chat_endpoint(base_url: &str) -> Result<Url, ConfigError> {
    let joined = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| ConfigError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl CompletionEngine for OpenAiEngine {
    fn model(&self) -> &str {
        &self.model
    }

    #[tracing::instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Completion service returned an error");
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::MalformedResponse("no choices returned".into()))?;

        choice
            .message
            .content
            .ok_or_else(|| CompletionError::MalformedResponse("first choice has no text".into()))
    }
}
