//! userdesk core - client-side session management for the user-management
//! service.
//!
//! - `auth`: the session store (credentials, identity, persistence, renewal)
//! - `api`: transport, request pipeline and the `ApiClient` facade
//! - `guard`: navigation guard over the route table
//! - `storage`: credential persistence backends
//! - `events`: session-expired and notice signals for the front end

pub mod api;
pub mod auth;
pub mod config;
pub mod events;
pub mod guard;
pub mod models;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ApiError};
pub use auth::SessionStore;
pub use config::{Config, StorageKind};
pub use events::{ClientEvent, Notice};
pub use guard::{Access, Navigation, NavigationGuard, Route, RouteTable};
