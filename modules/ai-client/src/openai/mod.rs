mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use crate::error::{AiError, Result};
use crate::util::strip_code_blocks;

use client::{OpenAiClient, OPENAI_API_URL};
use types::{ChatRequest, JsonSchemaFormat, ResponseFormat, WireMessage};

/// Default `max_tokens` when the caller does not cap it.
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Same credentials, different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> OpenAiClient {
        OpenAiClient::new(&self.api_key, &self.base_url)
    }

    /// Plain chat completion returning the assistant text.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .limits(max_tokens.unwrap_or(DEFAULT_MAX_TOKENS));

        self.client()
            .chat(&request)
            .await?
            .into_content()
            .ok_or(AiError::EmptyResponse)
    }

    /// Chat completion constrained to a JSON object (no schema enforcement).
    pub async fn json_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<serde_json::Value> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .limits(DEFAULT_MAX_TOKENS)
            .response_format(ResponseFormat::JsonObject);

        let content = self
            .client()
            .chat(&request)
            .await?
            .into_content()
            .ok_or(AiError::EmptyResponse)?;

        Ok(serde_json::from_str(strip_code_blocks(&content))?)
    }

    /// Type-safe structured output using a strict JSON schema derived from `T`.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<T> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .limits(DEFAULT_MAX_TOKENS)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name: T::output_name(),
                    strict: true,
                    schema: T::openai_schema(),
                },
            });

        let content = self
            .client()
            .chat(&request)
            .await?
            .into_content()
            .ok_or(AiError::EmptyResponse)?;

        serde_json::from_str(strip_code_blocks(&content))
            .map_err(|e| AiError::Parse(format!("Failed to deserialize {}: {e}", T::output_name())))
    }
}
