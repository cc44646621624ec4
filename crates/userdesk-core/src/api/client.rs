//! API client facade for the user-management service.
//!
//! `ApiClient` wires the transport, session store and request pipeline
//! together and exposes the session operations plus the user endpoints.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::debug;

use super::{ApiRequest, HttpTransport, RequestPipeline, Result, Transport};
use crate::auth::SessionStore;
use crate::config::Config;
use crate::events::{ClientEvent, EventBus};
use crate::models::{LoginRequest, MessageResponse, RegisterRequest, UpdateUser, User, UsersPage};
use crate::storage::CredentialStore;

/// Default page size of `GET /users`, also used when an invalid one is asked for
const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page size the service accepts
const MAX_PAGE_LIMIT: u32 = 100;

/// Clone is cheap - everything inside is shared.
#[derive(Clone)]
pub struct ApiClient {
    session: Arc<SessionStore>,
    pipeline: RequestPipeline,
    events: EventBus,
}

impl ApiClient {
    /// Create a client talking HTTP to the configured service.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.base_url, Duration::from_secs(config.timeout_secs))?;
        let storage = config.credential_store()?;
        Ok(Self::with_parts(Arc::new(transport), storage))
    }

    /// Create a client over any transport and credential store.
    pub fn with_parts(transport: Arc<dyn Transport>, storage: Arc<dyn CredentialStore>) -> Self {
        let events = EventBus::new();
        let session = Arc::new(SessionStore::new(transport.clone(), storage, events.clone()));
        let pipeline = RequestPipeline::new(session.clone(), transport, events.clone());
        Self {
            session,
            pipeline,
            events,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn watch_authenticated(&self) -> watch::Receiver<bool> {
        self.session.watch_authenticated()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    /// Cached identity, `None` until signed in or fetched
    pub async fn identity(&self) -> Option<User> {
        self.session.identity().await
    }

    // ===== Session =====

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let credentials = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.session.login(&credentials).await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let new_user = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.session.register(&new_user).await
    }

    pub async fn logout(&self) {
        self.session.logout().await
    }

    pub async fn renew(&self) -> Result<()> {
        self.session.renew().await
    }

    /// Fetch the signed-in user's profile and refresh the cached identity.
    pub async fn fetch_identity(&self) -> Result<User> {
        let user: User = self.pipeline.fetch(ApiRequest::get("/users/profile")).await?;
        self.session.set_identity(user.clone()).await;
        Ok(user)
    }

    /// Update the signed-in user's profile; the server's copy replaces the
    /// cached identity.
    pub async fn update_identity(&self, changes: &UpdateUser) -> Result<User> {
        let request = ApiRequest::put("/users/profile").with_json(changes)?;
        let user: User = self.pipeline.fetch(request).await?;
        self.session.set_identity(user.clone()).await;
        Ok(user)
    }

    // ===== Users =====

    pub async fn list_users(&self, page: u32, limit: u32) -> Result<UsersPage> {
        let (page, limit) = Self::clamp_page(page, limit);
        debug!(page, limit, "Listing users");
        let request = ApiRequest::get("/users")
            .with_query("page", page)
            .with_query("limit", limit);
        self.pipeline.fetch(request).await
    }

    pub async fn get_user(&self, id: u64) -> Result<User> {
        self.pipeline.fetch(ApiRequest::get(format!("/users/{}", id))).await
    }

    pub async fn update_user(&self, id: u64, changes: &UpdateUser) -> Result<User> {
        let request = ApiRequest::put(format!("/users/{}", id)).with_json(changes)?;
        self.pipeline.fetch(request).await
    }

    pub async fn delete_user(&self, id: u64) -> Result<String> {
        let response: MessageResponse = self
            .pipeline
            .fetch(ApiRequest::delete(format!("/users/{}", id)))
            .await?;
        Ok(response.message)
    }

    /// Same bounds the service applies to `page` and `limit`
    fn clamp_page(page: u32, limit: u32) -> (u32, u32) {
        let page = page.max(1);
        let limit = if (1..=MAX_PAGE_LIMIT).contains(&limit) {
            limit
        } else {
            DEFAULT_PAGE_LIMIT
        };
        (page, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::Tokens;
    use crate::storage::MemoryStore;
    use crate::test_support::*;

    fn client(tokens: Option<Tokens>) -> (Arc<ScriptedTransport>, ApiClient) {
        let transport = ScriptedTransport::new();
        let storage = Arc::new(match tokens {
            Some(tokens) => MemoryStore::with_tokens(tokens),
            None => MemoryStore::new(),
        });
        let client = ApiClient::with_parts(transport.clone(), storage);
        (transport, client)
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(ApiClient::clamp_page(0, 0), (1, 10));
        assert_eq!(ApiClient::clamp_page(3, 25), (3, 25));
        assert_eq!(ApiClient::clamp_page(2, 101), (2, 10));
        assert_eq!(ApiClient::clamp_page(1, 100), (1, 100));
    }

    #[tokio::test]
    async fn test_list_users_sends_query() {
        let (transport, client) = client(Some(Tokens::new("acc", "ref")));
        let body = format!(r#"{{"users":[{}],"total":1,"page":1,"limit":10}}"#, user_json(1, "ada"));
        transport.reply("GET /users", 200, &body);

        let page = client.list_users(0, 500).await.expect("list");

        assert_eq!(page.users.len(), 1);
        let sent = &transport.requests()[0];
        assert_eq!(sent.path, "/users");
        assert_eq!(
            sent.query,
            vec![("page".to_string(), "1".to_string()), ("limit".to_string(), "10".to_string())]
        );
        assert_eq!(sent.bearer.as_deref(), Some("acc"));
    }

    #[tokio::test]
    async fn test_fetch_identity_caches_profile() {
        let (transport, client) = client(Some(Tokens::new("acc", "ref")));
        transport.reply("GET /users/profile", 200, &user_json(4, "dana"));
        assert!(client.identity().await.is_none());

        let user = client.fetch_identity().await.expect("profile");

        assert_eq!(client.identity().await, Some(user));
    }

    #[tokio::test]
    async fn test_update_identity_replaces_cache_with_server_copy() {
        let (transport, client) = client(None);
        transport
            .reply("POST /auth/login", 200, &login_json("acc", "ref", 4, "dana"))
            .reply("PUT /users/profile", 200, &user_json(4, "dana2"));
        client.login("dana@example.com", "pw").await.expect("login");

        let changes = UpdateUser {
            username: Some("dana2".to_string()),
            ..Default::default()
        };
        let user = client.update_identity(&changes).await.expect("update");

        assert_eq!(user.username, "dana2");
        assert_eq!(client.identity().await.map(|u| u.username), Some("dana2".to_string()));
        let sent = transport.requests();
        assert_eq!(sent[1].body, Some(serde_json::json!({"username": "dana2"})));
    }

    #[tokio::test]
    async fn test_failed_profile_update_keeps_cached_identity() {
        let (transport, client) = client(None);
        transport
            .reply("POST /auth/login", 200, &login_json("acc", "ref", 4, "dana"))
            .reply("PUT /users/profile", 400, r#"{"error":"username already exists"}"#);
        client.login("dana@example.com", "pw").await.expect("login");

        let changes = UpdateUser {
            username: Some("taken".to_string()),
            ..Default::default()
        };
        let err = client.update_identity(&changes).await.unwrap_err();

        assert!(matches!(err, ApiError::Client { status: 400, .. }));
        assert_eq!(client.identity().await.map(|u| u.username), Some("dana".to_string()));
    }

    #[tokio::test]
    async fn test_delete_user_returns_message() {
        let (transport, client) = client(Some(Tokens::new("acc", "ref")));
        transport.reply("DELETE /users/5", 200, r#"{"message":"User deleted successfully"}"#);

        let message = client.delete_user(5).await.expect("delete");
        assert_eq!(message, "User deleted successfully");
    }

    #[tokio::test]
    async fn test_watch_follows_login_and_logout() {
        let (transport, client) = client(None);
        transport
            .reply("POST /auth/login", 200, &login_json("acc", "ref", 1, "ada"))
            .reply("POST /auth/logout", 200, r#"{"message":"Logged out successfully"}"#);
        let watch = client.watch_authenticated();
        let mut events = client.subscribe();

        client.login("ada@example.com", "pw").await.expect("login");
        assert!(*watch.borrow());
        client.logout().await;
        assert!(!*watch.borrow());

        assert!(matches!(events.try_recv(), Ok(ClientEvent::SignedIn(_))));
        assert!(matches!(events.try_recv(), Ok(ClientEvent::SignedOut)));
    }
}
