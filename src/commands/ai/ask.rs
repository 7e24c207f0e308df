use super::*;
use crate::utils::personas::persona;

/// Ask Coonbot a question
///
/// Usage: `!ask [grok|openai] <question>`. Grok answers unless another
/// provider is named.
#[poise::command(prefix_command, category = "AI")]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Optional provider followed by your question"]
    #[rest]
    question: Option<String>,
) -> CommandResult {
    let tokens = split_args(question.as_deref());
    if tokens.is_empty() {
        ctx.say(format!("Usage: {}ask [grok|openai] <question>", ctx.prefix()))
            .await?;
        return Ok(());
    }

    let (provider, rest) = extract_provider(&tokens, Provider::Grok);
    let Some(prompt) = join_args(rest) else {
        ctx.say(format!("Usage: {}ask [grok|openai] <question>", ctx.prefix()))
            .await?;
        return Ok(());
    };

    let request = CompletionRequest::new(provider, persona(provider), prompt);
    send_thinking_message(ctx, provider, &request.model).await?;

    answer(ctx, provider, request).await
}
