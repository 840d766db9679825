//! REST client for the subset of the Discord API the bot uses.

use std::time::Duration;

use async_trait::async_trait;
use harvest_fetch_core::{MessagePayload, NotificationSink};
use reqwest::{Client, Method, RequestBuilder};
use tracing::debug;
use url::Url;

use crate::error::{DiscordError, DiscordResult};
use crate::wire::{
    AllowedMentions, CreateMessage, CreatedMessage, EditMessage, Embed, MessageReference,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for the Discord REST API.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// API base, e.g. `https://discord.com/api/v10`.
    pub api_base: Url,
    /// Bot token sent as `Authorization: Bot <token>`.
    pub token: String,
}

/// Discord REST client implementing [`NotificationSink`].
pub struct DiscordClient {
    http: Client,
    config: DiscordConfig,
}

impl DiscordClient {
    /// Build a client for the configured API base.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: DiscordConfig) -> DiscordResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| DiscordError::ClientBuild { source })?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, segments: &[&str]) -> DiscordResult<Url> {
        let mut url = self.config.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| DiscordError::InvalidBaseUrl {
                base: self.config.api_base.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("authorization", format!("Bot {}", self.config.token))
    }

    async fn create_message(
        &self,
        channel_id: &str,
        body: &CreateMessage<'_>,
    ) -> DiscordResult<String> {
        let operation = "discord.create_message";
        let url = self.endpoint(&["channels", channel_id, "messages"])?;
        let created: CreatedMessage = self
            .request(Method::POST, url)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| DiscordError::Http { operation, source })?
            .json()
            .await
            .map_err(|source| DiscordError::Http { operation, source })?;
        debug!(channel_id, message_id = %created.id, "discord message created");
        Ok(created.id)
    }

    /// Replace the embed of an existing message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Discord rejects it.
    pub async fn edit_embed(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessagePayload,
    ) -> DiscordResult<()> {
        let operation = "discord.edit_message";
        let url = self.endpoint(&["channels", channel_id, "messages", message_id])?;
        let body = EditMessage {
            embeds: [Embed::from(payload)],
        };
        self.request(Method::PATCH, url)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| DiscordError::Http { operation, source })?;
        Ok(())
    }

    /// React to a message as the bot user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Discord rejects it.
    pub async fn create_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> DiscordResult<()> {
        let operation = "discord.create_reaction";
        let url = self.endpoint(&[
            "channels",
            channel_id,
            "messages",
            message_id,
            "reactions",
            emoji,
            "@me",
        ])?;
        self.request(Method::PUT, url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| DiscordError::Http { operation, source })?;
        Ok(())
    }
}

fn mention_body<'a>(user_id: &'a str, text: &str) -> CreateMessage<'a> {
    CreateMessage {
        content: Some(format!("<@{user_id}> {text}")),
        allowed_mentions: Some(AllowedMentions { users: [user_id] }),
        ..CreateMessage::default()
    }
}

#[async_trait]
impl NotificationSink for DiscordClient {
    async fn post_message(
        &self,
        channel_id: &str,
        reply_to: Option<&str>,
        payload: &MessagePayload,
    ) -> anyhow::Result<String> {
        let body = CreateMessage {
            embeds: vec![Embed::from(payload)],
            message_reference: reply_to.map(|message_id| MessageReference { message_id }),
            ..CreateMessage::default()
        };
        Ok(self.create_message(channel_id, &body).await?)
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessagePayload,
    ) -> anyhow::Result<()> {
        Ok(self.edit_embed(channel_id, message_id, payload).await?)
    }

    async fn send_mention(&self, channel_id: &str, user_id: &str, text: &str) -> anyhow::Result<()> {
        self.create_message(channel_id, &mention_body(user_id, text))
            .await?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> anyhow::Result<()> {
        Ok(self.create_reaction(channel_id, message_id, emoji).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use harvest_fetch_core::MessageField;
    use harvest_fetch_core::render::PRIMARY_COLOR;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> Result<DiscordClient> {
        Ok(DiscordClient::new(DiscordConfig {
            api_base: Url::parse(&format!("{}/api/v10", server.base_url()))?,
            token: "bot-token".to_string(),
        })?)
    }

    fn payload() -> MessagePayload {
        MessagePayload {
            title: "🌾 demo".to_string(),
            description: None,
            fields: vec![MessageField {
                name: "Status".to_string(),
                value: "Queued".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn post_message_replies_with_embed() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v10/channels/42/messages")
                .header("authorization", "Bot bot-token")
                .json_body(json!({
                    "embeds": [{
                        "title": "🌾 demo",
                        "color": PRIMARY_COLOR,
                        "fields": [{ "name": "Status", "value": "Queued", "inline": true }]
                    }],
                    "message_reference": { "message_id": "7" }
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "id": "1001", "channel_id": "42" }));
        });

        let client = client_for(&server)?;
        let id = client.post_message("42", Some("7"), &payload()).await?;
        assert_eq!(id, "1001");
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn edit_message_patches_in_place() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/api/v10/channels/42/messages/1001")
                .header("authorization", "Bot bot-token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "id": "1001" }));
        });

        let client = client_for(&server)?;
        client.edit_message("42", "1001", &payload()).await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn mention_restricts_allowed_mentions_to_user() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v10/channels/42/messages")
                .json_body(json!({
                    "content": "<@99> done",
                    "allowed_mentions": { "users": ["99"] }
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "id": "1002" }));
        });

        let client = client_for(&server)?;
        client.send_mention("42", "99", "done").await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn reaction_emoji_is_percent_encoded() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT).header("authorization", "Bot bot-token");
            then.status(204);
        });

        let client = client_for(&server)?;
        let emoji = "1\u{fe0f}\u{20e3}";
        let url = client.endpoint(&["channels", "42", "messages", "1001", "reactions", emoji, "@me"])?;
        assert_eq!(
            url.path(),
            "/api/v10/channels/42/messages/1001/reactions/1%EF%B8%8F%E2%83%A3/@me"
        );
        client.add_reaction("42", "1001", emoji).await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn rejected_request_surfaces_http_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(PATCH);
            then.status(403);
        });

        let client = client_for(&server)?;
        let err = client
            .edit_embed("42", "1001", &payload())
            .await
            .expect_err("forbidden edit");
        assert!(matches!(
            err,
            DiscordError::Http {
                operation: "discord.edit_message",
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn cannot_be_a_base_url_is_rejected() -> Result<()> {
        let client = DiscordClient::new(DiscordConfig {
            api_base: Url::parse("mailto:bot@example.com")?,
            token: String::new(),
        })?;
        assert!(matches!(
            client.endpoint(&["channels"]),
            Err(DiscordError::InvalidBaseUrl { .. })
        ));
        Ok(())
    }
}
