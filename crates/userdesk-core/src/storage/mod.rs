//! Durable storage for the access/refresh credential pair.
//!
//! This module provides:
//! - `CredentialStore`: the key-value persistence capability the session uses
//! - `FileStore`: JSON file in the cache directory
//! - `KeyringStore`: OS keychain entry via keyring
//! - `MemoryStore`: process-local, nothing survives a restart
//!
//! Every backend writes the pair as a single record, so a save either
//! replaces both values or neither.

pub mod file;
pub mod keychain;
pub mod memory;

use anyhow::Result;

use crate::models::Tokens;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

pub trait CredentialStore: Send + Sync {
    /// Read the persisted pair, `None` when nothing is stored.
    fn load(&self) -> Result<Option<Tokens>>;

    /// Replace the persisted pair.
    fn save(&self, tokens: &Tokens) -> Result<()>;

    /// Remove the persisted pair. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}
