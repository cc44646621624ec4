//! REST API client module for the user-management service.
//!
//! This module provides the `ApiClient` facade and the pieces it is built
//! from: the `Transport` wire layer, the `ApiRequest` descriptor and the
//! `RequestPipeline` that attaches credentials and recovers from expired
//! ones.
//!
//! The API uses bearer token authentication with a rotating refresh token
//! obtained from `/auth/login` and renewed through `/auth/refresh`.

pub mod client;
pub mod error;
pub mod pipeline;
pub mod request;
pub mod transport;

pub use client::ApiClient;
pub use error::{ApiError, Result};
pub use pipeline::RequestPipeline;
pub use request::ApiRequest;
pub use transport::{HttpTransport, RawResponse, Transport};
