//! General purpose commands.

/// Submodule defining the `ping` command.
pub mod ping;
