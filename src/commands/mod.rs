//! This module aggregates all the command modules for the bot.

/// Commands that ask a language model something (ask, opinion, roast, ...).
pub mod ai;
/// General purpose commands (e.g., ping, help).
pub mod general;
