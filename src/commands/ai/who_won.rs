use super::*;
use crate::utils::gateway::ChatGateway;
use crate::utils::history::format_history;
use crate::utils::personas::persona;

const DEFAULT_MESSAGE_COUNT: usize = 100;

/// Settle the recent arguments
///
/// Usage: `!who_won [grok|openai] [messages]`
#[poise::command(prefix_command, category = "AI")]
pub async fn who_won(
    ctx: Context<'_>,
    #[description = "Optional provider and number of messages to read"]
    #[rest]
    args: Option<String>,
) -> CommandResult {
    ctx.say("Analyzing the last arguments...").await?;

    let tokens = split_args(args.as_deref());
    let (provider, rest) = extract_provider(&tokens, Provider::Grok);
    let (count, _) = extract_count(rest, DEFAULT_MESSAGE_COUNT);

    let gateway = gateway(ctx);
    let messages = match gateway.fetch_recent_messages(ctx.channel_id(), count).await {
        Ok(messages) => messages,
        Err(e) => {
            error!(error = %e, "failed to fetch channel history");
            ctx.say(format!("Error fetching messages: {e}")).await?;
            return Ok(());
        }
    };
    let history = format_history(&gateway, &messages).await;

    let system = format!(
        "{}\nHere are the last {count} messages in this channel:\n{history}\n\
         Based on the arguments and discussions, determine who won the arguments and why. \
         Be specific and fair, and explain your reasoning.",
        persona(provider)
    );
    let request = CompletionRequest::new(
        provider,
        system,
        "Who won the arguments in the recent conversation?",
    );

    answer(ctx, provider, request).await
}
