//! Authentication state for the current user.
//!
//! This module provides:
//! - `SessionStore`: credentials, cached identity and their persistence
//! - `RenewOutcome`: result of a serialized credential renewal
//!
//! The access and refresh credentials are always set, replaced and cleared
//! together, and the persisted copy is written before memory changes.

pub mod session;

pub use session::{RenewOutcome, SessionStore};
