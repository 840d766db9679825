//! Chat command parsing and the request lifecycle handlers behind them.
//!
//! Users type `/h fetch <query>`, pick a candidate by reacting to the listing with a
//! keycap emoji, and the engine takes over from there.

use std::sync::Arc;

use async_trait::async_trait;
use harvest_config::ChannelFilter;
use harvest_fetch_core::{
    FetchError, FetchRequest, FetchResult, MAX_SEARCH_RESULTS, MessagePayload, RequestId,
    Requester, SearchResult, render,
};
use tracing::{debug, info, warn};

use crate::engine::{DriveOutcome, FetchEngine};

/// Prefix every command message starts with.
pub const COMMAND_PREFIX: &str = "/h";

/// Permission bits requested by the invite link.
pub const BOT_PERMISSIONS: u64 = 3_271_232;

/// Keycap emoji used to select candidates, indexed by position.
pub const REACTIONS: [&str; MAX_SEARCH_RESULTS] = [
    "0\u{fe0f}\u{20e3}",
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
    "6\u{fe0f}\u{20e3}",
    "7\u{fe0f}\u{20e3}",
    "8\u{fe0f}\u{20e3}",
    "9\u{fe0f}\u{20e3}",
];

const HELP_TEXT: &str = "`/h fetch <query>` search for a resource and pick one to download\n\
`/h invite` get a link to add the bot to another server\n\
`/h help` show this message";

/// Parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search for `query` and list candidates.
    Fetch {
        /// Free-text search query.
        query: String,
    },
    /// Reply with the bot invite link.
    Invite,
    /// Reply with usage help.
    Help,
    /// Prefixed message that matched no command.
    Invalid {
        /// Text after the prefix.
        input: String,
    },
}

/// Parse a chat message; returns `None` when it is not addressed to the bot.
#[must_use]
pub fn parse_command(content: &str) -> Option<Command> {
    let rest = content.trim().strip_prefix(COMMAND_PREFIX)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    let (verb, args) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(verb, args)| (verb, args.trim()));
    let command = match verb {
        "fetch" if !args.is_empty() => Command::Fetch {
            query: args.to_string(),
        },
        "invite" => Command::Invite,
        "help" | "" => Command::Help,
        _ => Command::Invalid {
            input: rest.to_string(),
        },
    };
    Some(command)
}

/// OAuth2 link that adds the bot to a server.
#[must_use]
pub fn invite_url(client_id: &str) -> String {
    format!(
        "https://discord.com/oauth2/authorize?client_id={client_id}&scope=bot&permissions={BOT_PERMISSIONS}"
    )
}

/// Position of a keycap selection emoji, if `emoji` is one.
#[must_use]
pub fn reaction_index(emoji: &str) -> Option<usize> {
    REACTIONS.iter().position(|candidate| *candidate == emoji)
}

/// Source of search candidates for a free-text query.
#[async_trait]
pub trait MediaSearch: Send + Sync {
    /// Search for candidates matching `query`, best first.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchResult>>;
}

/// Chat message delivered to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Message identifier.
    pub message_id: String,
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Author of the message.
    pub author_id: String,
    /// Raw message text.
    pub content: String,
}

/// Identity and scoping of the bot in chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    /// The bot's own user id; its messages and reactions are ignored.
    pub user_id: String,
    /// Application client id used for invite links.
    pub client_id: String,
    /// Channel the bot listens in.
    pub channel: ChannelFilter,
}

/// Turns chat events into fetch requests and selections.
pub struct CommandHandler {
    engine: Arc<FetchEngine>,
    search: Arc<dyn MediaSearch>,
    identity: BotIdentity,
}

impl CommandHandler {
    /// Build a handler over a shared engine.
    #[must_use]
    pub const fn new(
        engine: Arc<FetchEngine>,
        search: Arc<dyn MediaSearch>,
        identity: BotIdentity,
    ) -> Self {
        Self {
            engine,
            search,
            identity,
        }
    }

    /// React to a chat message.
    ///
    /// Messages from the bot itself, from other channels, or without the command prefix
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when the search, the store, or a reply post fails.
    pub async fn handle_message(&self, message: &IncomingMessage) -> FetchResult<()> {
        if message.author_id == self.identity.user_id
            || !self.identity.channel.allows(&message.channel_id)
        {
            return Ok(());
        }
        let Some(command) = parse_command(&message.content) else {
            return Ok(());
        };
        debug!(author_id = %message.author_id, ?command, "command received");

        match command {
            Command::Fetch { query } => {
                let results = self
                    .search
                    .search(&query)
                    .await
                    .map_err(|err| FetchError::operation("search.query", None, err))?;
                let requester = Requester {
                    author_id: message.author_id.clone(),
                    channel_id: message.channel_id.clone(),
                };
                self.on_search_submitted(requester, &message.message_id, &query, results)
                    .await?;
            }
            Command::Invite => {
                let payload = MessagePayload {
                    title: "Invite".to_string(),
                    description: Some(invite_url(&self.identity.client_id)),
                    fields: Vec::new(),
                };
                self.reply(message, &payload).await?;
            }
            Command::Help => {
                let payload = MessagePayload {
                    title: "Help".to_string(),
                    description: Some(HELP_TEXT.to_string()),
                    fields: Vec::new(),
                };
                self.reply(message, &payload).await?;
            }
            Command::Invalid { input } => {
                let payload = MessagePayload {
                    title: "Unknown command".to_string(),
                    description: Some(format!("`{input}` is not a valid command.\n\n{HELP_TEXT}")),
                    fields: Vec::new(),
                };
                self.reply(message, &payload).await?;
            }
        }
        Ok(())
    }

    /// Post the candidate listing and persist a request awaiting a choice.
    ///
    /// An empty result set posts "No results." and persists nothing.
    ///
    /// # Errors
    ///
    /// Returns an error when posting the listing or inserting the request fails.
    pub async fn on_search_submitted(
        &self,
        requester: Requester,
        request_message_id: &str,
        query: &str,
        mut results: Vec<SearchResult>,
    ) -> FetchResult<Option<RequestId>> {
        results.truncate(MAX_SEARCH_RESULTS);
        let listing = render::search_listing(query, &results);
        let list_message_id = self
            .engine
            .sink()
            .post_message(&requester.channel_id, Some(request_message_id), &listing)
            .await
            .map_err(|err| FetchError::operation("sink.post_message", None, err))?;
        if results.is_empty() {
            debug!(query, "search returned no candidates");
            return Ok(None);
        }

        let candidates = results.len();
        let channel_id = requester.channel_id.clone();
        let request = FetchRequest::new(requester, request_message_id, &list_message_id, results);
        self.engine
            .store()
            .insert(&request)
            .await
            .map_err(|err| FetchError::operation("store.insert", Some(request.id), err))?;
        info!(request_id = %request.id, candidates, "fetch request created");

        for emoji in REACTIONS.iter().take(candidates) {
            if let Err(err) = self
                .engine
                .sink()
                .add_reaction(&channel_id, &list_message_id, emoji)
                .await
            {
                self.engine.metrics().inc_notification_failure("add_reaction");
                warn!(
                    request_id = %request.id,
                    error = %format!("{err:#}"),
                    "adding selection reaction failed"
                );
                break;
            }
        }
        Ok(Some(request.id))
    }

    /// Record the requester's pick and start the download.
    ///
    /// If the pick cannot be recorded after the status message went out, that message is
    /// edited to say so.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidChoice`] for an out-of-range index,
    /// [`FetchError::ChoiceAlreadyMade`] when a choice is already recorded, and operation
    /// errors when the store, chat, or daemon fails.
    pub async fn on_user_selected_choice(
        &self,
        id: RequestId,
        index: usize,
    ) -> FetchResult<DriveOutcome> {
        let _guard = self.engine.locks().acquire(id).await;
        let request = self
            .engine
            .store()
            .find_by_id(id)
            .await
            .map_err(|err| FetchError::operation("store.find_by_id", Some(id), err))?
            .ok_or(FetchError::RequestNotFound { request_id: id })?;
        let choice = request.candidate(index)?;

        let status_message_id = self
            .engine
            .sink()
            .post_message(
                &request.requester.channel_id,
                Some(&request.message_refs.list_message_id),
                &render::initial_status(choice),
            )
            .await
            .map_err(|err| FetchError::operation("sink.post_message", Some(id), err))?;
        let recorded = self
            .engine
            .store()
            .record_choice(id, choice, &status_message_id)
            .await
            .map_err(|err| FetchError::operation("store.record_choice", Some(id), err));
        match recorded {
            Ok(true) => {}
            Ok(false) => {
                self.retract_status(&request, choice, &status_message_id)
                    .await;
                return Err(FetchError::ChoiceAlreadyMade { request_id: id });
            }
            Err(err) => {
                self.retract_status(&request, choice, &status_message_id)
                    .await;
                return Err(err);
            }
        }
        info!(request_id = %id, index, name = %choice.name, "choice recorded");

        self.engine.drive_locked(id).await
    }

    /// Treat a keycap reaction on a listing as a selection.
    ///
    /// Returns `Ok(None)` when the reaction is not a valid selection: the bot's own reaction,
    /// a non-keycap emoji, an unknown listing, someone other than the requester, or a
    /// request that already has a choice.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Self::on_user_selected_choice`] and the listing lookup.
    pub async fn on_reaction_added(
        &self,
        list_message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> FetchResult<Option<DriveOutcome>> {
        if user_id == self.identity.user_id {
            return Ok(None);
        }
        let Some(index) = reaction_index(emoji) else {
            return Ok(None);
        };
        let Some(request) = self
            .engine
            .store()
            .find_by_list_message(list_message_id)
            .await
            .map_err(|err| FetchError::operation("store.find_by_list_message", None, err))?
        else {
            return Ok(None);
        };
        if request.requester.author_id != user_id || request.choice.is_some() {
            return Ok(None);
        }
        self.on_user_selected_choice(request.id, index)
            .await
            .map(Some)
    }

    /// Overwrite a status message whose selection was not recorded so it never reads as pending.
    async fn retract_status(
        &self,
        request: &FetchRequest,
        choice: &SearchResult,
        status_message_id: &str,
    ) {
        if let Err(err) = self
            .engine
            .sink()
            .edit_message(
                &request.requester.channel_id,
                status_message_id,
                &render::selection_rejected(choice),
            )
            .await
        {
            self.engine.metrics().inc_notification_failure("edit_message");
            warn!(
                request_id = %request.id,
                error = %format!("{err:#}"),
                "retracting status message failed"
            );
        }
    }

    async fn reply(&self, message: &IncomingMessage, payload: &MessagePayload) -> FetchResult<()> {
        self.engine
            .sink()
            .post_message(&message.channel_id, Some(&message.message_id), payload)
            .await
            .map(|_| ())
            .map_err(|err| FetchError::operation("sink.post_message", None, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_require_the_prefix_as_a_word() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/hfetch x"), None);
        assert_eq!(parse_command("/h"), Some(Command::Help));
        assert_eq!(parse_command("  /h help "), Some(Command::Help));
        assert_eq!(parse_command("/h invite"), Some(Command::Invite));
    }

    #[test]
    fn fetch_keeps_the_full_query() {
        assert_eq!(
            parse_command("/h fetch  big buck bunny 1080p "),
            Some(Command::Fetch {
                query: "big buck bunny 1080p".to_string()
            })
        );
        assert_eq!(
            parse_command("/h fetch"),
            Some(Command::Invalid {
                input: "fetch".to_string()
            })
        );
        assert_eq!(
            parse_command("/h dance now"),
            Some(Command::Invalid {
                input: "dance now".to_string()
            })
        );
    }

    #[test]
    fn invite_url_carries_client_and_permissions() {
        assert_eq!(
            invite_url("12345"),
            "https://discord.com/oauth2/authorize?client_id=12345&scope=bot&permissions=3271232"
        );
    }

    #[test]
    fn reactions_map_to_indices() {
        assert_eq!(reaction_index("0\u{fe0f}\u{20e3}"), Some(0));
        assert_eq!(reaction_index("9\u{fe0f}\u{20e3}"), Some(9));
        assert_eq!(reaction_index("👍"), None);
        assert_eq!(REACTIONS.len(), MAX_SEARCH_RESULTS);
    }
}
