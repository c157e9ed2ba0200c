//! Library entry for bytefield-cli used by integration tests and embedding.

pub mod commands;
pub mod convert;
pub mod input;

// Re-export commands for convenience
pub use commands::*;

// Re-export commonly used items
pub use crate::input::{ExtentArg, FieldPath};
