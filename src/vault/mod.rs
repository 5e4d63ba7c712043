//! Vault module — sealed folders and their encrypted registry.
//!
//! This module provides:
//! - `VaultRecord`, `Protection`, and the in-memory `Registry` (`record`)
//! - Versioned binary envelopes for the registry and containers (`format`)
//! - The encrypted registry artifact, `VaultStore` (`store`)
//! - Directory packing and the seal/unseal pipeline (`archive`)
//! - `VaultEngine`, which ties it all together (`engine`)

pub mod archive;
pub mod engine;
pub mod format;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use engine::VaultEngine;
pub use record::{Protection, Registry, VaultRecord, VaultSummary};
pub use store::{RegistryStatus, VaultStore};
