use poise::{CreateReply, serenity_prelude as serenity};
use ::serenity::all::CreateEmbed;
use std::time::Duration;

use crate::{CommandResult, Context};

/// Ping the bot to check its latency
#[poise::command(prefix_command, slash_command, category = "General")]
pub async fn ping(ctx: Context<'_>) -> CommandResult {
    let latency = get_shard_latency(&ctx)
        .await
        .unwrap_or_default()
        .as_millis();

    let embed = CreateEmbed::new()
        .title("Pong!")
        .field("API Latency", format!("{} ms", latency), false);

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Heartbeat latency of the shard this command arrived on. `None` until the
/// first heartbeat has been acknowledged.
async fn get_shard_latency(ctx: &Context<'_>) -> Option<Duration> {
    let shard_manager = ctx.framework().shard_manager();
    let runners = shard_manager.runners.lock().await;

    let runner = runners.get(&serenity::ShardId(ctx.serenity_context().shard_id.0))?;

    runner.latency
}
