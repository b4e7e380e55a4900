//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config loading, categorizer construction)
//! - `categorize` - Categorize and explain a single transaction
//! - `mappings` - Mapping table and category listing/editing

pub mod categorize;
pub mod core;
pub mod mappings;

// Re-export command functions for main.rs
pub use categorize::*;
pub use core::*;
pub use mappings::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
