//! Coonbot: a Discord bot that answers through Grok or OpenAI and delivers
//! long replies as paced, human-sized messages.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub mod commands;
pub mod utils;

use utils::ai_client::AiClient;
use utils::delivery::PacingConfig;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// State shared by every command invocation.
pub struct Data {
    pub ai: Arc<AiClient>,
    pub pacing: PacingConfig,
    /// Cancelled when the grace period after a shutdown signal runs out.
    pub shutdown: CancellationToken,
    /// In-flight deliveries, awaited on shutdown.
    pub deliveries: TaskTracker,
}
