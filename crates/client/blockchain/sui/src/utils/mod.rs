//! Utility functions for the Sui integration.

pub mod conversion;

// Re-export commonly used conversion functions
pub use conversion::{coin_from_rpc, gas_used, object_from_rpc, owner_address, struct_tag_parts};
