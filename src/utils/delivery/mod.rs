//! Turns one generated reply into a series of human-paced Discord messages.
//!
//! The pipeline runs in four steps:
//!
//! 1. [`segmentation`] asks the fast provider for natural breakpoints, falling
//!    back to the [`fallback`] paragraph splitter on any failure;
//! 2. chunks that are blank after trimming are dropped;
//! 3. [`length`] cuts anything over Discord's 2000-character limit;
//! 4. [`pacing`] sends the first chunk at once and each later one after a
//!    typing delay.
//!
//! Chunks are never reordered. Delivery is best effort: a failed send is
//! logged and the next chunk still goes out, because a partial reply beats
//! silence.

pub mod fallback;
pub mod length;
pub mod pacing;
pub mod segmentation;

use poise::serenity_prelude::ChannelId;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::utils::ai_client::LanguageModel;
use crate::utils::gateway::ChatGateway;

pub use pacing::{DeliveryPlan, DeliveryReport, PacingConfig, PlannedChunk};
pub use segmentation::Segmentation;

use length::enforce_length;
use pacing::Pacer;
use segmentation::Segmenter;

/// Delivers replies to a channel through `gateway`, using `model` for
/// segmentation hints.
pub struct DeliveryPipeline<'a, G, L>
where
    G: ChatGateway + ?Sized,
    L: LanguageModel + ?Sized,
{
    gateway: &'a G,
    model: &'a L,
    pacing: &'a PacingConfig,
}

impl<'a, G, L> DeliveryPipeline<'a, G, L>
where
    G: ChatGateway + ?Sized,
    L: LanguageModel + ?Sized,
{
    pub fn new(gateway: &'a G, model: &'a L, pacing: &'a PacingConfig) -> Self {
        Self {
            gateway,
            model,
            pacing,
        }
    }

    /// Segments, sizes and plans `reply` without sending anything.
    pub async fn plan(&self, reply: &str, cancel: &CancellationToken) -> DeliveryPlan {
        let segmentation = Segmenter::new(self.model).segment(reply, cancel).await;

        let chunks: Vec<String> = segmentation
            .into_chunks()
            .into_iter()
            .filter(|chunk| !chunk.trim().is_empty())
            .collect();

        DeliveryPlan::new(enforce_length(chunks), self.pacing)
    }

    /// Plans and sends `reply`. Never fails; the report says how it went.
    pub async fn deliver(
        &self,
        channel: ChannelId,
        reply: &str,
        cancel: &CancellationToken,
    ) -> DeliveryReport {
        let plan = self.plan(reply, cancel).await;
        if plan.is_empty() {
            info!(channel_id = %channel, "nothing to deliver");
            return DeliveryReport::default();
        }
        if cancel.is_cancelled() {
            warn!(channel_id = %channel, "delivery cancelled before the first chunk");
            return DeliveryReport {
                cancelled: true,
                ..DeliveryReport::default()
            };
        }

        info!(
            channel_id = %channel,
            chunk_count = plan.len(),
            total_delay_ms = plan.total_delay().as_millis() as u64,
            "delivering reply"
        );

        let report = Pacer::new(self.gateway, self.pacing)
            .execute(channel, plan, cancel)
            .await;

        if report.failed > 0 || report.cancelled {
            warn!(
                channel_id = %channel,
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed,
                cancelled = report.cancelled,
                "reply only partially delivered"
            );
        } else {
            info!(
                channel_id = %channel,
                delivered = report.delivered,
                "reply delivered"
            );
        }
        report
    }
}
