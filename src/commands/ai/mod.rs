//! This module contains the commands that ask a language model something and
//! relay the answer through the delivery pipeline.
//!
//! Every command here is a prefix command: they read mentions, attachments and
//! the replied-to message off the invoking message.

/// Submodule defining the `!ask` command.
pub mod ask;
/// Submodule defining the `!image_opinion` command.
pub mod image_opinion;
/// Submodule defining the `!most` command.
pub mod most;
/// Submodule defining the `!opinion` command.
pub mod opinion;
/// Submodule defining the `!roast` command.
pub mod roast;
/// Submodule defining the `!user_opinion` command.
pub mod user_opinion;
/// Submodule defining the `!who_won` command.
pub mod who_won;

use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::utils::ai_client::{
    AiError, COMPLETION_TIMEOUT, CompletionRequest, IMAGE_TIMEOUT, ImageRequest, LanguageModel,
    Provider, guarded,
};
use crate::utils::delivery::DeliveryPipeline;
use crate::utils::gateway::SerenityGateway;
use crate::{CommandResult, Context};

/// Upper bound on how much history a single command may pull.
pub const MAX_HISTORY_MESSAGES: usize = 500;

/// Splits the raw argument string into whitespace-separated tokens.
pub fn split_args(args: Option<&str>) -> Vec<String> {
    args.unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Takes a leading `grok`/`openai` token off `args`, if there is one.
pub fn extract_provider(args: &[String], default: Provider) -> (Provider, &[String]) {
    match args.split_first() {
        Some((first, rest)) => match Provider::from_token(first) {
            Some(provider) => (provider, rest),
            None => (default, args),
        },
        None => (default, args),
    }
}

/// Takes a leading message count off `args`, clamped to
/// `1..=MAX_HISTORY_MESSAGES`. Non-numeric tokens are left alone.
pub fn extract_count(args: &[String], default: usize) -> (usize, &[String]) {
    match args.split_first() {
        Some((first, rest)) => match first.parse::<usize>() {
            Ok(n) => (n.clamp(1, MAX_HISTORY_MESSAGES), rest),
            Err(_) => (default, args),
        },
        None => (default, args),
    }
}

/// Joins tokens back into free text; `None` when there are none.
pub fn join_args(args: &[String]) -> Option<String> {
    (!args.is_empty()).then(|| args.join(" "))
}

/// The message that invoked a prefix command.
pub(crate) fn invoking_message<'a>(ctx: Context<'a>) -> Option<&'a serenity::Message> {
    match ctx {
        poise::Context::Prefix(prefix) => Some(prefix.msg),
        _ => None,
    }
}

pub(crate) fn gateway(ctx: Context<'_>) -> SerenityGateway {
    SerenityGateway::new(ctx.serenity_context().http.clone())
}

/// Guild nickname of `user`, or their username.
pub(crate) async fn display_name(ctx: Context<'_>, user: &serenity::User) -> String {
    if let Some(guild_id) = ctx.guild_id() {
        if let Ok(member) = guild_id.member(ctx, user.id).await {
            if let Some(nick) = member.nick.filter(|n| !n.is_empty()) {
                return nick;
            }
        }
    }
    user.name.clone()
}

/// Tells the channel which model is working on the answer.
pub(crate) async fn send_thinking_message(
    ctx: Context<'_>,
    provider: Provider,
    model: &str,
) -> CommandResult {
    let version = provider.model_version(model).unwrap_or_default();
    info!(
        channel_id = %ctx.channel_id(),
        provider = %provider,
        model,
        version,
        "sending thinking message"
    );
    ctx.say(format!("Thinking with {model} - knowledge cutoff {version} ..."))
        .await?;
    Ok(())
}

/// Reports a failed provider call to the channel as one short message.
async fn report_failure(ctx: Context<'_>, prefix: &str, err: &AiError) -> CommandResult {
    error!(
        command = %ctx.command().name,
        error = %err,
        "AI request failed"
    );
    ctx.say(format!("{prefix}: {err}")).await?;
    Ok(())
}

/// Runs the reply through segmentation and paced delivery. Tracked so a
/// shutdown waits for it, and cancelled if the grace period runs out.
pub(crate) async fn deliver_reply(ctx: Context<'_>, reply: &str) -> CommandResult {
    let data = ctx.data();
    let gateway = gateway(ctx);
    let cancel = data.shutdown.child_token();
    let channel = ctx.channel_id();

    let delivery = async {
        DeliveryPipeline::new(&gateway, data.ai.as_ref(), &data.pacing)
            .deliver(channel, reply, &cancel)
            .await
    };
    data.deliveries.track_future(delivery).await;
    Ok(())
}

/// Completes `request` with `provider` and delivers the answer, or reports
/// the failure.
pub(crate) async fn answer(
    ctx: Context<'_>,
    provider: Provider,
    request: CompletionRequest,
) -> CommandResult {
    let data = ctx.data();
    let cancel = data.shutdown.child_token();

    let response = guarded(
        &cancel,
        COMPLETION_TIMEOUT,
        provider,
        data.ai.complete(provider, request),
    )
    .await;

    match response {
        Ok(reply) => deliver_reply(ctx, &reply).await,
        Err(e) => report_failure(ctx, "Error", &e).await,
    }
}

/// Image counterpart of [`answer`].
pub(crate) async fn answer_image(
    ctx: Context<'_>,
    provider: Provider,
    request: ImageRequest,
) -> CommandResult {
    let data = ctx.data();
    let cancel = data.shutdown.child_token();

    let response = guarded(
        &cancel,
        IMAGE_TIMEOUT,
        provider,
        data.ai.complete_with_image(provider, request),
    )
    .await;

    match response {
        Ok(reply) => deliver_reply(ctx, &reply).await,
        Err(e) => report_failure(ctx, "Error analyzing image", &e).await,
    }
}
