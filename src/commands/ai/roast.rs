use super::*;
use crate::utils::gateway::ChatGateway;
use crate::utils::history::resolve_display_names;
use crate::utils::personas::persona;

/// Who gets roasted, and for what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoastTarget {
    Person(String),
    /// A specific message and its author's display name.
    Message { author: String, content: String },
}

impl RoastTarget {
    pub fn name(&self) -> &str {
        match self {
            Self::Person(name) | Self::Message { author: name, .. } => name,
        }
    }

    /// System and user prompts for this roast.
    pub fn prompts(&self, provider: Provider) -> (String, String) {
        let persona = persona(provider);
        match self {
            Self::Person(name) => (
                format!(
                    "{persona}\nRoast {name} like a Boston comedian who grew up in the Bronx. \
                     Be really mean; it's a joke and everyone's in on it."
                ),
                format!("Roast {name}."),
            ),
            Self::Message { author, content } => (
                format!(
                    "{persona}\nRoast {author} based on this message: '{content}'. \
                     Be a Boston comedian from the Bronx; it's a joke and everyone's in on it."
                ),
                format!("Roast {author} for saying: {content}"),
            ),
        }
    }
}

/// Roast someone
///
/// Mention a user, or reply to a message with `!roast`.
#[poise::command(prefix_command, category = "AI")]
pub async fn roast(
    ctx: Context<'_>,
    #[description = "A mention, optionally with a provider"]
    #[rest]
    args: Option<String>,
) -> CommandResult {
    let tokens: Vec<String> = split_args(args.as_deref())
        .into_iter()
        .filter(|t| !t.starts_with("<@"))
        .collect();
    let (provider, _) = extract_provider(&tokens, Provider::OpenAi);

    let msg = invoking_message(ctx);
    let mentioned = msg.and_then(|m| m.mentions.first());
    let reply_id = msg
        .and_then(|m| m.message_reference.as_ref())
        .and_then(|r| r.message_id);

    let target = match (mentioned, reply_id) {
        (Some(user), _) => RoastTarget::Person(display_name(ctx, user).await),
        (None, Some(reply_id)) => {
            let gateway = gateway(ctx);
            let replied = match gateway.fetch_message(ctx.channel_id(), reply_id).await {
                Ok(replied) => replied,
                Err(e) => {
                    error!(error = %e, "failed to fetch referenced message");
                    ctx.say(format!("Could not fetch replied message: {e}"))
                        .await?;
                    return Ok(());
                }
            };
            let names = resolve_display_names(&gateway, std::slice::from_ref(&replied)).await;
            RoastTarget::Message {
                author: names
                    .get(&replied.author_id)
                    .cloned()
                    .unwrap_or(replied.author_name),
                content: replied.content,
            }
        }
        (None, None) => {
            ctx.say("Please mention a user or reply to a message to roast.")
                .await?;
            return Ok(());
        }
    };

    ctx.say(format!("Cooking up a roast for {}...", target.name()))
        .await?;

    let (system, prompt) = target.prompts(provider);
    answer(ctx, provider, CompletionRequest::new(provider, system, prompt)).await
}
