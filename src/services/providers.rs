// AI Provider Service
// Implements Titan (Bedrock invoke) and OpenAI-compatible chat completion calls

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::config_store::LlmSettings;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
}

/// Wire format spoken by the explanation provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFormat {
    #[default]
    Titan,
    Chat,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanRequest {
    input_text: String,
    text_generation_config: TitanGenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanGenerationConfig {
    max_token_count: i32,
    temperature: f64,
    stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TitanResponse {
    results: Option<Vec<TitanResult>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitanResult {
    output_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

pub struct ProviderClient {
    client: Client,
    settings: LlmSettings,
    api_key: Option<String>,
}

impl ProviderClient {
    pub fn new(settings: LlmSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        let api_key = get_api_key(&settings);

        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    pub fn endpoint(&self) -> String {
        let base = self.settings.base_url.trim_end_matches('/');
        match self.settings.format {
            ProviderFormat::Titan => format!("{}/model/{}/invoke", base, self.settings.model_id),
            ProviderFormat::Chat => format!("{}/chat/completions", base),
        }
    }

    /// Send one prompt and return the raw completion text
    pub async fn complete(&self, prompt: &str) -> Result<ChatResult, ProviderError> {
        match self.settings.format {
            ProviderFormat::Titan => self.call_titan_api(prompt).await,
            ProviderFormat::Chat => self.call_chat_api(prompt).await,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    async fn call_titan_api(&self, prompt: &str) -> Result<ChatResult, ProviderError> {
        let request = TitanRequest {
            input_text: prompt.to_string(),
            text_generation_config: TitanGenerationConfig {
                max_token_count: self.settings.max_token_count,
                temperature: self.settings.temperature,
                stop_sequences: self.settings.stop_sequences.clone(),
            },
        };

        let start = Instant::now();

        let response = self
            .authorized(self.client.post(self.endpoint()))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: TitanResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data
            .results
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.output_text)
            .ok_or(ProviderError::MissingContent)?;

        Ok(ChatResult { content, latency_ms })
    }

    async fn call_chat_api(&self, prompt: &str) -> Result<ChatResult, ProviderError> {
        let request = ChatRequest {
            model: self.settings.model_id.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.settings.max_token_count,
            temperature: self.settings.temperature,
            stop: self.settings.stop_sequences.clone(),
        };

        let start = Instant::now();

        let response = self
            .authorized(self.client.post(self.endpoint()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or(ProviderError::MissingContent)?;

        Ok(ChatResult { content, latency_ms })
    }
}

/// Get API key from environment or the config settings
pub fn get_api_key(settings: &LlmSettings) -> Option<String> {
    let env_keys = match settings.format {
        ProviderFormat::Titan => ["REVIEWTRUST_LLM_API_KEY", "AWS_BEARER_TOKEN_BEDROCK"],
        ProviderFormat::Chat => ["REVIEWTRUST_LLM_API_KEY", "OPENAI_API_KEY"],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    settings
        .api_key
        .as_ref()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
