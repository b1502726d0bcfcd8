//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, profiles) and shared utilities (open_db)
//! - `parse` - Statement parse command
//! - `serve` - Web server command

pub mod core;
pub mod parse;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use parse::*;
pub use serve::*;

/// Truncate a string to a maximum number of chars, adding "..." if truncated.
/// Counts chars, not bytes, so multibyte narrations never split mid-character.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
