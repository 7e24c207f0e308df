//! The slice of the Discord API the bot needs, behind a trait so the delivery
//! pipeline and history helpers can run against a fake in tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::{ChannelId, GetMessages, GuildId, Http, MessageId, UserId};
use thiserror::Error;
use tracing::debug;

/// Discord returns at most this many messages per history request.
const HISTORY_PAGE_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Discord request failed: {0}")]
    Serenity(#[from] ::serenity::Error),

    #[error("Discord request rejected: {0}")]
    Rejected(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// A channel message, reduced to the fields the bot reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub guild_id: Option<GuildId>,
    pub author_id: UserId,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub attachment_urls: Vec<String>,
    /// The message this one replies to, if any.
    pub reply_to: Option<MessageId>,
}

impl From<&serenity::Message> for ChatMessage {
    fn from(msg: &serenity::Message) -> Self {
        Self {
            id: msg.id,
            guild_id: msg.guild_id,
            author_id: msg.author.id,
            author_name: msg.author.name.clone(),
            author_is_bot: msg.author.bot,
            content: msg.content.clone(),
            timestamp: DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0)
                .unwrap_or_default(),
            attachment_urls: msg.attachments.iter().map(|a| a.url.clone()).collect(),
            reply_to: msg.message_reference.as_ref().and_then(|r| r.message_id),
        }
    }
}

/// A guild member, reduced to the fields the bot reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberInfo {
    pub nick: Option<String>,
}

/// Operations the bot performs against the chat platform.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, channel: ChannelId, text: &str) -> GatewayResult<MessageId>;

    /// Shows the typing indicator; Discord keeps it visible for about ten seconds.
    async fn show_typing(&self, channel: ChannelId) -> GatewayResult<()>;

    /// Returns up to `limit` of the most recent messages, oldest first.
    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> GatewayResult<Vec<ChatMessage>>;

    async fn fetch_message(&self, channel: ChannelId, id: MessageId)
    -> GatewayResult<ChatMessage>;

    async fn fetch_member(&self, guild: GuildId, user: UserId) -> GatewayResult<MemberInfo>;
}

/// [`ChatGateway`] over serenity's shared HTTP client.
#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<Http>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatGateway for SerenityGateway {
    async fn send_message(&self, channel: ChannelId, text: &str) -> GatewayResult<MessageId> {
        let message = channel.say(&self.http, text).await?;
        Ok(message.id)
    }

    async fn show_typing(&self, channel: ChannelId) -> GatewayResult<()> {
        channel.broadcast_typing(&self.http).await?;
        Ok(())
    }

    async fn fetch_recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> GatewayResult<Vec<ChatMessage>> {
        let mut collected: Vec<ChatMessage> = Vec::with_capacity(limit);
        let mut before: Option<MessageId> = None;

        while collected.len() < limit {
            let page = (limit - collected.len()).min(HISTORY_PAGE_SIZE);
            let mut request = GetMessages::new().limit(page as u8);
            if let Some(id) = before {
                request = request.before(id);
            }

            // Newest first within each page.
            let batch = channel.messages(&self.http, request).await?;
            let exhausted = batch.len() < page;
            before = batch.last().map(|m| m.id);
            collected.extend(batch.iter().map(ChatMessage::from));

            if exhausted || before.is_none() {
                break;
            }
        }

        debug!(
            "fetched {} messages from channel {} (limit {})",
            collected.len(),
            channel,
            limit
        );
        collected.reverse();
        Ok(collected)
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        id: MessageId,
    ) -> GatewayResult<ChatMessage> {
        let message = channel.message(&self.http, id).await?;
        Ok(ChatMessage::from(&message))
    }

    async fn fetch_member(&self, guild: GuildId, user: UserId) -> GatewayResult<MemberInfo> {
        let member = guild.member(&self.http, user).await?;
        Ok(MemberInfo { nick: member.nick })
    }
}
