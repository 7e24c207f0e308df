//! Provider-assisted splitting of a reply into conversational turns.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fallback::split_paragraphs;
use super::length::MAX_MESSAGE_LENGTH;
use crate::utils::ai_client::{CompletionRequest, LanguageModel, Provider, guarded};

/// Replies up to this many characters are delivered as one message.
pub const SHORT_REPLY_THRESHOLD: usize = 500;
/// Marker the provider places between suggested chunks.
pub const BREAK_DELIMITER: &str = "<<<BREAK>>>";
/// Bound on the segmentation request, inside the caller's cancellation.
pub const SEGMENTATION_TIMEOUT: Duration = Duration::from_secs(30);

const MIN_TOKEN_BUDGET: u32 = 1000;
const MAX_TOKEN_BUDGET: u32 = 4096;
/// Share of the reply's visible characters a suggestion must carry once the
/// token budget is capped.
const MIN_COVERAGE_PERCENT: usize = 90;

/// Segments of the worked example in the instructions. A response that
/// contains one of these without the reply containing it is the provider
/// parroting the example.
const EXAMPLE_SEGMENTS: [&str; 3] = [
    "I think pizza is great. It has cheese and sauce.",
    "But honestly, the best part is the crust when it's done right.",
    "Brooklyn style is my favorite.",
];

fn instructions() -> String {
    format!(
        "You are a message chunking assistant. Your job is to break up messages into natural, \
conversational chunks that feel like how humans text: following up one message with more \
messages as they flesh out their thoughts.

Rules:
1. Split at natural thought boundaries (paragraphs, topic shifts, etc.)
2. Each chunk should be a complete thought or idea
3. Aim for 3-5 chunks for longer messages
4. Preserve the exact original text - no changes to content
5. Respond ONLY with the chunks separated by the delimiter: {BREAK_DELIMITER}
6. Do not add any explanations or commentary

Example input: \"{example_input}\"

Example output: \"{example_output}\"",
        example_input = EXAMPLE_SEGMENTS.join(" "),
        example_output = EXAMPLE_SEGMENTS.join(BREAK_DELIMITER),
    )
}

/// How a reply was split. Exactly one strategy produced the chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segmentation {
    /// Short enough to send whole; no provider call was made.
    Unsplit(String),
    /// Validated provider suggestion.
    Suggested(Vec<String>),
    /// Output of the paragraph splitter.
    Fallback(Vec<String>),
}

impl Segmentation {
    pub fn into_chunks(self) -> Vec<String> {
        match self {
            Self::Unsplit(reply) => vec![reply],
            Self::Suggested(chunks) | Self::Fallback(chunks) => chunks,
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Unsplit(_) => "unsplit",
            Self::Suggested(_) => "suggested",
            Self::Fallback(_) => "fallback",
        }
    }
}

/// Token budget for the segmentation call.
///
/// The provider has to echo nearly the whole reply back, so the budget grows
/// with it (about three characters per token plus room for delimiters).
pub fn segmentation_token_budget(reply_chars: usize) -> u32 {
    let estimate = u32::try_from(reply_chars.div_ceil(3))
        .unwrap_or(u32::MAX)
        .saturating_add(256);
    estimate.clamp(MIN_TOKEN_BUDGET, MAX_TOKEN_BUDGET)
}

fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Validates a raw provider response. `None` means the response is unusable.
pub fn parse_suggested_breaks(response: &str, reply: &str) -> Option<Vec<String>> {
    let chunks: Vec<String> = response
        .split(BREAK_DELIMITER)
        .map(str::trim)
        .filter(|piece| !piece.is_empty() && piece.chars().count() <= MAX_MESSAGE_LENGTH)
        .map(str::to_string)
        .collect();

    let parroted = chunks
        .iter()
        .any(|c| EXAMPLE_SEGMENTS.contains(&c.as_str()) && !reply.contains(c.as_str()));
    if parroted {
        warn!("segmentation response echoed the instruction example");
        return None;
    }

    // Only a capped budget can cut the echo short.
    if segmentation_token_budget(reply.chars().count()) == MAX_TOKEN_BUDGET {
        let covered: usize = chunks.iter().map(|c| visible_chars(c)).sum();
        let expected = visible_chars(reply);
        if covered * 100 < expected * MIN_COVERAGE_PERCENT {
            warn!(covered, expected, "segmentation response looks truncated");
            return None;
        }
    }

    (chunks.len() > 1).then_some(chunks)
}

/// Splits replies with help from the fast provider, falling back to the
/// paragraph splitter on any failure.
pub struct Segmenter<'a, L: LanguageModel + ?Sized> {
    model: &'a L,
    provider: Provider,
}

impl<'a, L: LanguageModel + ?Sized> Segmenter<'a, L> {
    pub fn new(model: &'a L) -> Self {
        Self {
            model,
            provider: Provider::Grok,
        }
    }

    /// Never fails: degraded output beats no output.
    pub async fn segment(&self, reply: &str, cancel: &CancellationToken) -> Segmentation {
        let reply_chars = reply.chars().count();
        if reply_chars <= SHORT_REPLY_THRESHOLD {
            debug!("reply of {} characters is short, not splitting", reply_chars);
            return Segmentation::Unsplit(reply.to_string());
        }

        info!(message_length = reply_chars, "requesting message break suggestions");

        let request = CompletionRequest {
            system: instructions(),
            prompt: format!("Break this message into natural conversational chunks:\n\n{reply}"),
            model: self.provider.default_model().to_string(),
            max_tokens: segmentation_token_budget(reply_chars),
        };

        let response = guarded(
            cancel,
            SEGMENTATION_TIMEOUT,
            self.provider,
            self.model.complete(self.provider, request),
        )
        .await;

        let outcome = match response {
            Ok(raw) => match parse_suggested_breaks(&raw, reply) {
                Some(chunks) => Segmentation::Suggested(chunks),
                None => {
                    warn!("segmentation response had fewer than two usable chunks, using fallback");
                    Segmentation::Fallback(split_paragraphs(reply))
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to get message breaks, using fallback");
                Segmentation::Fallback(split_paragraphs(reply))
            }
        };

        let chunk_count = match &outcome {
            Segmentation::Unsplit(_) => 1,
            Segmentation::Suggested(c) | Segmentation::Fallback(c) => c.len(),
        };
        info!(
            original_length = reply_chars,
            chunk_count,
            strategy = outcome.strategy(),
            "message broken into chunks"
        );
        outcome
    }
}
