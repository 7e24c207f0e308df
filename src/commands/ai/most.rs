use super::*;
use crate::utils::gateway::ChatGateway;
use crate::utils::history::{summarize_activity, top_active_users};
use crate::utils::personas::persona;

const MESSAGE_COUNT: usize = 100;
const TOP_USERS: usize = 5;

/// Turns a bare adjective into a full question; longer questions pass through.
pub fn most_prompt(question: &str) -> String {
    let mut words = question.split_whitespace();
    match (words.next(), words.next()) {
        (Some(word), None) => format!("Who is the most {word} in the recent conversation?"),
        _ => question.to_string(),
    }
}

/// Ask who is the most ... in the chat
///
/// Usage: `!most [grok|openai] <question>`, e.g. `!most dramatic`
#[poise::command(prefix_command, category = "AI")]
pub async fn most(
    ctx: Context<'_>,
    #[description = "Optional provider followed by a question or an adjective"]
    #[rest]
    args: Option<String>,
) -> CommandResult {
    let tokens = split_args(args.as_deref());
    let (provider, rest) = extract_provider(&tokens, Provider::OpenAi);
    let Some(question) = join_args(rest) else {
        ctx.say(format!("Usage: {}most [grok|openai] <question>", ctx.prefix()))
            .await?;
        return Ok(());
    };

    ctx.say(format!(
        "Analyzing: {} (last {MESSAGE_COUNT} messages)...",
        tokens.join(" ")
    ))
    .await?;

    let gateway = gateway(ctx);
    let messages = match gateway
        .fetch_recent_messages(ctx.channel_id(), MESSAGE_COUNT)
        .await
    {
        Ok(messages) => messages,
        Err(e) => {
            error!(error = %e, "failed to fetch messages");
            ctx.say(format!("Error fetching messages: {e}")).await?;
            return Ok(());
        }
    };

    let activity = summarize_activity(&gateway, &messages).await;
    let active = top_active_users(&activity.counts, TOP_USERS);

    let system = format!(
        "{}\nHere are the last {MESSAGE_COUNT} messages in this channel:\n{}\n\
         Among the most active users ({}), answer the following question: {question}. \
         Explain your reasoning as Coonbot.",
        persona(provider),
        activity.lines.join("\n"),
        active.join(", "),
    );
    let request = CompletionRequest::new(provider, system, most_prompt(&question));

    answer(ctx, provider, request).await
}
