//! Discord REST payload shapes.

use harvest_fetch_core::MessagePayload;
use harvest_fetch_core::render::PRIMARY_COLOR;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct EmbedField<'a> {
    pub(crate) name: &'a str,
    pub(crate) value: &'a str,
    pub(crate) inline: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct Embed<'a> {
    pub(crate) title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<&'a str>,
    pub(crate) color: u32,
    pub(crate) fields: Vec<EmbedField<'a>>,
}

impl<'a> From<&'a MessagePayload> for Embed<'a> {
    fn from(payload: &'a MessagePayload) -> Self {
        Self {
            title: &payload.title,
            description: payload.description.as_deref(),
            color: PRIMARY_COLOR,
            fields: payload
                .fields
                .iter()
                .map(|field| EmbedField {
                    name: &field.name,
                    value: &field.value,
                    inline: true,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageReference<'a> {
    pub(crate) message_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AllowedMentions<'a> {
    pub(crate) users: [&'a str; 1],
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct CreateMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) embeds: Vec<Embed<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message_reference: Option<MessageReference<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) allowed_mentions: Option<AllowedMentions<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EditMessage<'a> {
    pub(crate) embeds: [Embed<'a>; 1],
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedMessage {
    pub(crate) id: String,
}
