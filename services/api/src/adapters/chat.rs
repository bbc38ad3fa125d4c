//! services/api/src/adapters/chat.rs
//!
//! The single chat-completion call both generative flows are built on.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use life_engine_core::ports::{PortError, PortResult};
use tracing::debug;

/// Sends one system + user exchange and returns the text of the first choice.
pub async fn complete(
    client: &Client<OpenAIConfig>,
    model: &str,
    system: &str,
    user: String,
) -> PortResult<String> {
    let messages = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(user)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
    ];

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(messages)
        .n(1)
        .temperature(0.7)
        .build()
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

    // Call the API and manually map the error if it occurs, which respects the orphan rule.
    let response = client
        .chat()
        .create(request)
        .await
        .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| PortError::MalformedResponse("Model returned no content".to_string()))?;
    debug!("Model {} replied with {} chars", model, content.len());
    Ok(content)
}
