use chrono::{Duration, Utc};

use super::*;
use crate::utils::gateway::ChatGateway;
use crate::utils::history::{format_history, messages_from_since};
use crate::utils::personas::persona;

const DEFAULT_DAYS: u32 = 3;
const DEFAULT_MAX_MESSAGES: usize = 200;
/// Longest look-back window, in days.
pub const MAX_DAYS: u32 = 365;

/// Parsed arguments of `!user_opinion`, mention tokens excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserOpinionArgs {
    pub provider: Provider,
    pub days: u32,
    pub max_messages: usize,
}

impl UserOpinionArgs {
    /// Reads `[provider] [days] [max_messages]`, skipping `<@...>` mentions
    /// wherever they appear. Days are clamped to `1..=MAX_DAYS`.
    pub fn parse(args: &[String]) -> Self {
        let tokens: Vec<String> = args
            .iter()
            .filter(|arg| !arg.starts_with("<@"))
            .cloned()
            .collect();

        let (provider, rest) = extract_provider(&tokens, Provider::OpenAi);
        // A token that isn't a number is not consumed.
        let (days, rest) = match rest.split_first() {
            Some((first, tail)) => match first.parse::<u32>() {
                Ok(days) => (days.clamp(1, MAX_DAYS), tail),
                Err(_) => (DEFAULT_DAYS, rest),
            },
            None => (DEFAULT_DAYS, rest),
        };
        let max_messages = rest
            .first()
            .and_then(|t| t.parse::<usize>().ok())
            .map_or(DEFAULT_MAX_MESSAGES, |n| n.clamp(1, MAX_HISTORY_MESSAGES));

        Self {
            provider,
            days,
            max_messages,
        }
    }
}

/// What does Coonbot think of someone?
///
/// Usage: `!user_opinion @user [grok|openai] [days] [max_messages]`
#[poise::command(prefix_command, category = "AI")]
pub async fn user_opinion(
    ctx: Context<'_>,
    #[description = "A mention, then optional provider, days and message limit"]
    #[rest]
    args: Option<String>,
) -> CommandResult {
    let tokens = split_args(args.as_deref());
    let Some(target) = invoking_message(ctx).and_then(|msg| msg.mentions.first()) else {
        ctx.say(format!(
            "Usage: {}user_opinion @user [grok|openai] [days] [max_messages]",
            ctx.prefix()
        ))
        .await?;
        return Ok(());
    };

    let name = display_name(ctx, target).await;
    ctx.say(format!("Analyzing {name}...")).await?;

    let UserOpinionArgs {
        provider,
        days,
        max_messages,
    } = UserOpinionArgs::parse(&tokens);

    let gateway = gateway(ctx);
    let recent = match gateway
        .fetch_recent_messages(ctx.channel_id(), max_messages)
        .await
    {
        Ok(messages) => messages,
        Err(e) => {
            error!(error = %e, "failed to fetch user messages");
            ctx.say(format!("Error fetching messages: {e}")).await?;
            return Ok(());
        }
    };

    let since = Utc::now() - Duration::days(i64::from(days));
    let theirs = messages_from_since(&recent, target.id, since);
    if theirs.is_empty() {
        ctx.say(format!(
            "No messages found for {name} in the last {days} days."
        ))
        .await?;
        return Ok(());
    }
    let history = format_history(&gateway, &theirs).await;

    let system = format!(
        "{}\nHere are all the messages sent by {name} in the last {days} days in this channel:\n{history}\n",
        persona(provider)
    );
    let request = CompletionRequest::new(
        provider,
        system,
        format!("What is your opinion of {name}?"),
    );

    answer(ctx, provider, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("<@123456>" => (Provider::OpenAi, 3, 200); "mention only")]
    #[test_case("<@123456> grok" => (Provider::Grok, 3, 200); "provider")]
    #[test_case("<@123456> openai 7" => (Provider::OpenAi, 7, 200); "provider and days")]
    #[test_case("<@123456> grok 10 400" => (Provider::Grok, 10, 400); "everything")]
    #[test_case("<@123456> 5" => (Provider::OpenAi, 5, 200); "days only")]
    #[test_case("grok <@!123456> 2 50" => (Provider::Grok, 2, 50); "mention after provider")]
    #[test_case("<@1> openai soon 9" => (Provider::OpenAi, 3, 200); "non-numeric days")]
    #[test_case("<@1> 1 100000" => (Provider::OpenAi, 1, MAX_HISTORY_MESSAGES); "limit clamped")]
    #[test_case("<@1> 4000000000" => (Provider::OpenAi, MAX_DAYS, 200); "huge days clamped")]
    #[test_case("<@1> grok 0 20" => (Provider::Grok, 1, 20); "zero days clamped up")]
    fn test_parse(input: &str) -> (Provider, u32, usize) {
        let parsed = UserOpinionArgs::parse(&split_args(Some(input)));
        (parsed.provider, parsed.days, parsed.max_messages)
    }
}
