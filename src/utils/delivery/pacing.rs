//! Human-paced delivery: delays between chunks with a typing indicator.

use std::time::Duration;

use poise::serenity_prelude::ChannelId;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::utils::gateway::ChatGateway;

/// Shortest pause before a follow-up chunk.
pub const MIN_MESSAGE_DELAY: Duration = Duration::from_millis(5000);
/// Longest pause before a follow-up chunk.
pub const MAX_MESSAGE_DELAY: Duration = Duration::from_millis(8000);
/// Typing time per character before scaling.
pub const TYPING_SPEED: Duration = Duration::from_millis(50);
/// Divisor applied to [`TYPING_SPEED`]; 50 ms / 80 is about 0.6 ms per character.
pub const TYPING_SCALE: u32 = 80;
/// Discord shows a typing indicator for ~10 s, so refresh it a bit sooner.
pub const TYPING_REFRESH: Duration = Duration::from_secs(8);

/// Timing knobs for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub typing_speed: Duration,
    pub typing_scale: u32,
    pub typing_refresh: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay: MIN_MESSAGE_DELAY,
            max_delay: MAX_MESSAGE_DELAY,
            typing_speed: TYPING_SPEED,
            typing_scale: TYPING_SCALE,
            typing_refresh: TYPING_REFRESH,
        }
    }
}

impl PacingConfig {
    /// How long a person would take to type `chunk`, clamped to
    /// `[min_delay, max_delay]`.
    pub fn delay_for(&self, chunk: &str) -> Duration {
        let chars = u32::try_from(chunk.chars().count()).unwrap_or(u32::MAX);
        let typing = self.typing_speed * chars / self.typing_scale.max(1);
        (self.min_delay + typing).min(self.max_delay).max(self.min_delay)
    }
}

/// One message of a plan and the pause that precedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChunk {
    pub text: String,
    pub delay: Duration,
}

/// Ordered chunks with their delays. The first chunk never waits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub steps: Vec<PlannedChunk>,
}

impl DeliveryPlan {
    pub fn new(chunks: Vec<String>, pacing: &PacingConfig) -> Self {
        let steps = chunks
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let delay = if i == 0 {
                    Duration::ZERO
                } else {
                    pacing.delay_for(&text)
                };
                PlannedChunk { text, delay }
            })
            .collect();
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn total_delay(&self) -> Duration {
        self.steps.iter().map(|s| s.delay).sum()
    }
}

/// What happened to a delivery, for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// The caller cancelled before every chunk was attempted.
    pub cancelled: bool,
}

/// Executes delivery plans against a gateway.
pub struct Pacer<'a, G: ChatGateway + ?Sized> {
    gateway: &'a G,
    config: &'a PacingConfig,
}

impl<'a, G: ChatGateway + ?Sized> Pacer<'a, G> {
    pub fn new(gateway: &'a G, config: &'a PacingConfig) -> Self {
        Self { gateway, config }
    }

    /// Sends every chunk in order. Send failures are logged and skipped;
    /// cancellation stops before the next chunk.
    pub async fn execute(
        &self,
        channel: ChannelId,
        plan: DeliveryPlan,
        cancel: &CancellationToken,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for (index, step) in plan.steps.into_iter().enumerate() {
            if !step.delay.is_zero() {
                info!(
                    delay_ms = step.delay.as_millis() as u64,
                    chunk_length = step.text.chars().count(),
                    "waiting before next message chunk"
                );
                if !self.type_for(channel, step.delay, cancel).await {
                    report.cancelled = true;
                    break;
                }
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            report.attempted += 1;
            match self.gateway.send_message(channel, &step.text).await {
                Ok(id) => {
                    debug!("sent chunk {} as message {}", index, id);
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(channel_id = %channel, chunk = index, error = %e, "failed to send message chunk");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Waits `delay` while keeping the typing indicator up. Returns `false`
    /// if the caller cancelled first.
    async fn type_for(
        &self,
        channel: ChannelId,
        delay: Duration,
        cancel: &CancellationToken,
    ) -> bool {
        let typing = cancel.child_token();

        let wait = async {
            let elapsed = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            };
            typing.cancel();
            elapsed
        };

        let (elapsed, ()) = tokio::join!(wait, self.keep_typing(channel, &typing));
        elapsed
    }

    /// Shows the typing indicator now and every `typing_refresh` until
    /// `stop` fires. A failed call ends the loop.
    async fn keep_typing(&self, channel: ChannelId, stop: &CancellationToken) {
        let period = self.config.typing_refresh;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut first = true;
        loop {
            if !first {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => return,
                    _ = ticker.tick() => {}
                }
            }

            let result = tokio::select! {
                biased;
                _ = stop.cancelled() => return,
                result = self.gateway.show_typing(channel) => result,
            };
            if let Err(e) = result {
                let phase = if first { "send" } else { "refresh" };
                warn!(error = %e, "failed to {} typing indicator", phase);
                return;
            }
            first = false;
        }
    }
}
