use std::sync::Arc;
use std::time::Duration;

use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use coonbot::commands::{
    ai::{
        ask::*, image_opinion::*, most::*, opinion::*, roast::*, user_opinion::*, who_won::*,
    },
    general::ping::*,
};
use coonbot::utils::{ai_client::AiClient, config::Config, delivery::PacingConfig};
use coonbot::{CommandResult, Context, Data, Error};

/// How long cancelled deliveries get to wind down before the shards stop.
const ABANDON_TIMEOUT: Duration = Duration::from_secs(5);

#[poise::command(prefix_command, slash_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coonbot=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = Config::from_env()?;
    let ai = Arc::new(AiClient::new(&config));
    let shutdown = CancellationToken::new();
    let deliveries = TaskTracker::new();

    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let commands = vec![
        // Default commands
        register(),
        help(),
        // General commands
        ping(),
        // AI-centric commands
        ask(),
        opinion(),
        who_won(),
        user_opinion(),
        most(),
        image_opinion(),
        roast(),
    ];

    let data = Data {
        ai,
        pacing: PacingConfig::default(),
        shutdown: shutdown.clone(),
        deliveries: deliveries.clone(),
    };

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("{} is connected", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        });

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework.build())
        .await?;

    let shard_manager = client.shard_manager.clone();
    let grace = config.shutdown_grace;
    tokio::spawn(async move {
        wait_for_signal().await;
        drain_deliveries(&deliveries, &shutdown, grace).await;
        shard_manager.shutdown_all().await;
    });

    client.start().await.map_err(Into::into)
}

/// Lets in-flight deliveries finish within `grace`, then cancels whatever is
/// left.
async fn drain_deliveries(tracker: &TaskTracker, shutdown: &CancellationToken, grace: Duration) {
    tracker.close();
    info!(
        in_flight = tracker.len(),
        grace_secs = grace.as_secs(),
        "shutting down, waiting for deliveries"
    );

    if tokio::time::timeout(grace, tracker.wait()).await.is_ok() {
        return;
    }

    warn!(
        in_flight = tracker.len(),
        "grace period elapsed, cancelling deliveries"
    );
    shutdown.cancel();
    if tokio::time::timeout(ABANDON_TIMEOUT, tracker.wait())
        .await
        .is_err()
    {
        error!("deliveries did not stop after cancellation");
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
