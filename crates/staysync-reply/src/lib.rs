// SPDX-FileCopyrightText: 2026 Staysync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply-generation adapter for the staysync engine.
//!
//! Implements [`ReplyGenerator`] over the Anthropic Messages API. The engine
//! treats this collaborator as opaque: one call per guest message, no retry
//! or backoff beyond the client's transient-status retry, failures surface
//! as [`SyncError::ReplyGeneration`].

pub mod client;

use async_trait::async_trait;
use staysync_config::model::ReplyConfig;
use staysync_core::types::ListingContext;
use staysync_core::{ReplyGenerator, SyncError};
use tracing::debug;

use crate::client::{AnthropicClient, ChatMessage, MessageRequest};

/// Anthropic-backed reply generator.
pub struct AnthropicReplyGenerator {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
}

impl AnthropicReplyGenerator {
    /// Creates a new generator.
    ///
    /// Requires `config.api_key` (or the `ANTHROPIC_API_KEY` environment
    /// variable) to be set.
    pub fn new(config: &ReplyConfig) -> Result<Self, SyncError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                SyncError::Config("reply.api_key is required for reply generation".into())
            })?;

        let client = AnthropicClient::new(&api_key, &config.api_version)?;
        Ok(Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Wrap an existing client (for testing with wiremock).
    pub fn from_client(client: AnthropicClient, model: String, max_tokens: u32) -> Self {
        Self {
            client,
            model,
            max_tokens,
        }
    }

    fn system_prompt(context: &ListingContext) -> String {
        format!(
            "You are replying on behalf of {host} to a guest message about the \
             listing \"{listing}\". The guest's name is {guest}. Write only the \
             reply text, ready to send, in the language of the guest's message.",
            host = context.host_name,
            listing = context.listing_name,
            guest = context.guest_display_name,
        )
    }
}

#[async_trait]
impl ReplyGenerator for AnthropicReplyGenerator {
    async fn generate_reply(
        &self,
        guest_message: &str,
        context: &ListingContext,
    ) -> Result<String, SyncError> {
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Self::system_prompt(context),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: guest_message.to_string(),
            }],
        };

        let response = self.client.complete_message(&request).await?;
        let reply: String = response
            .content
            .iter()
            .filter(|block| block.type_ == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if reply.trim().is_empty() {
            return Err(SyncError::ReplyGeneration {
                message: "model returned no text content".into(),
                source: None,
            });
        }

        debug!(chars = reply.len(), "reply generated");
        Ok(reply)
    }
}
