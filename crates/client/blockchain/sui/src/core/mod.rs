//! Core types and errors for the Sui JSON-RPC integration.

pub mod error;
pub mod types;

// Re-export commonly used items
pub use error::{Result, SuiError};
