//! Data models for the user-management service.
//!
//! - `User`: the identity record returned by the auth and user endpoints
//! - `UpdateUser`: partial update payload (profile and admin updates)
//! - Auth payloads: `LoginRequest`, `RegisterRequest`, `Tokens`, ...

pub mod auth;
pub mod user;

pub use auth::{LoginRequest, LoginResponse, MessageResponse, RefreshRequest, RegisterRequest, Tokens};
pub use user::{UpdateUser, User, UsersPage};
