//! Helpers that turn channel history into prompt context.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use poise::serenity_prelude::UserId;
use tracing::debug;

use super::gateway::{ChatGateway, ChatMessage};

/// Maps each author in `messages` to their guild nickname, or their username
/// when they have none (or outside a guild). Each author is looked up once.
pub async fn resolve_display_names<G>(
    gateway: &G,
    messages: &[ChatMessage],
) -> HashMap<UserId, String>
where
    G: ChatGateway + ?Sized,
{
    let mut authors: HashMap<UserId, &ChatMessage> = HashMap::new();
    for msg in messages {
        authors.entry(msg.author_id).or_insert(msg);
    }

    let lookups = authors.into_values().map(|msg| async move {
        let nick = match msg.guild_id {
            Some(guild) => match gateway.fetch_member(guild, msg.author_id).await {
                Ok(member) => member.nick.filter(|n| !n.is_empty()),
                Err(e) => {
                    debug!("no member info for {}: {}", msg.author_id, e);
                    None
                }
            },
            None => None,
        };
        (msg.author_id, nick.unwrap_or_else(|| msg.author_name.clone()))
    });

    join_all(lookups).await.into_iter().collect()
}

fn line(names: &HashMap<UserId, String>, msg: &ChatMessage) -> String {
    let name = names
        .get(&msg.author_id)
        .map_or(msg.author_name.as_str(), String::as_str);
    format!("{}: {}", name, msg.content)
}

/// Renders messages as `name: content` lines, in the order given.
pub async fn format_history<G>(gateway: &G, messages: &[ChatMessage]) -> String
where
    G: ChatGateway + ?Sized,
{
    let names = resolve_display_names(gateway, messages).await;
    messages
        .iter()
        .map(|msg| line(&names, msg))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Transcript of the human side of a conversation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Activity {
    /// `name: content` lines, oldest first, bots excluded.
    pub lines: Vec<String>,
    /// Messages per display name.
    pub counts: HashMap<String, usize>,
}

/// Builds the transcript and per-user message counts, skipping bots.
pub async fn summarize_activity<G>(gateway: &G, messages: &[ChatMessage]) -> Activity
where
    G: ChatGateway + ?Sized,
{
    let humans: Vec<ChatMessage> = messages
        .iter()
        .filter(|m| !m.author_is_bot)
        .cloned()
        .collect();
    let names = resolve_display_names(gateway, &humans).await;

    let mut activity = Activity::default();
    for msg in &humans {
        activity.lines.push(line(&names, msg));
        let name = names
            .get(&msg.author_id)
            .cloned()
            .unwrap_or_else(|| msg.author_name.clone());
        *activity.counts.entry(name).or_default() += 1;
    }
    activity
}

/// The `n` names with the most messages, busiest first. Ties are broken by
/// name so the result is stable.
pub fn top_active_users(counts: &HashMap<String, usize>, n: usize) -> Vec<String> {
    let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(n)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Messages written by `user` strictly after `since`, in the order given.
pub fn messages_from_since(
    messages: &[ChatMessage],
    user: UserId,
    since: DateTime<Utc>,
) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter(|m| m.author_id == user && m.timestamp > since)
        .cloned()
        .collect()
}
