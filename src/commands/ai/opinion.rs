use super::*;
use crate::utils::gateway::ChatGateway;
use crate::utils::history::format_history;
use crate::utils::personas::persona;

/// Messages read when no count is given.
const DEFAULT_MESSAGE_COUNT: usize = 10;

/// Have Coonbot weigh in on the recent conversation
///
/// Usage: `!opinion [grok|openai] [messages]`
#[poise::command(prefix_command, category = "AI")]
pub async fn opinion(
    ctx: Context<'_>,
    #[description = "Optional provider and number of messages to read"]
    #[rest]
    args: Option<String>,
) -> CommandResult {
    ctx.say("Let me think about what everyone has been saying...")
        .await?;

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
         Form an opinion or summary about the conversation.",
        persona(provider)
    );
    let request = CompletionRequest::new(
        provider,
        system,
        "What is your opinion on the recent conversation?",
    );

    answer(ctx, provider, request).await
}
