//! This module aggregates the utility submodules the commands are built on.

/// Client for the Grok and OpenAI chat-completion APIs.
pub mod ai_client;
/// Environment configuration.
pub mod config;
/// Segmentation, length enforcement and paced delivery of replies.
pub mod delivery;
/// The Discord operations the bot needs, behind a trait.
pub mod gateway;
/// Channel history formatting and activity counts.
pub mod history;
pub mod personas;
