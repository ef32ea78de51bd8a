use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ResponseFormat,
    },
};
use async_trait::async_trait;

/// How the model is asked to shape its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Text,
    /// The reply must be a single JSON object.
    Json,
}

/// A generic client for single-shot chat completions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends one system + user exchange and returns the reply text.
    async fn complete(
        &self,
        system_prompt: String,
        user_prompt: String,
        mode: ResponseMode,
    ) -> Result<String>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The specific model identifier to use for chat completions (e.g., "gpt-4o").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn complete(
        &self,
        system_prompt: String,
        user_prompt: String,
        mode: ResponseMode,
    ) -> Result<String> {
        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(&self.model).messages(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()?
                .into(),
        ]);
        if mode == ResponseMode::Json {
            request.response_format(ResponseFormat::JsonObject);
        }
        let request = request.build()?;

        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;
        Ok(content)
    }
}
