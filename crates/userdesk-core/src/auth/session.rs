use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiRequest, RawResponse, Result, Transport};
use crate::events::{ClientEvent, EventBus, Notice};
use crate::models::{LoginRequest, LoginResponse, RefreshRequest, RegisterRequest, Tokens, User};
use crate::storage::CredentialStore;

#[derive(Debug, Default)]
struct SessionState {
    tokens: Option<Tokens>,
    identity: Option<User>,
    /// Bumped on every credential change (login, renewal, clear)
    generation: u64,
}

/// How a renewal request ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    /// This call exchanged the refresh credential and applied the new pair.
    Renewed,
    /// Credentials changed since the caller looked (another renewal, a
    /// logout or a fresh login); nothing was exchanged or applied.
    Superseded,
}

/// Single source of truth for the authentication state.
pub struct SessionStore {
    state: RwLock<SessionState>,
    /// Held for the whole duration of a renewal, at most one is in flight
    renewal: Mutex<()>,
    storage: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    authenticated: watch::Sender<bool>,
    events: EventBus,
}

impl SessionStore {
    /// Create the store, hydrated from whatever `storage` holds.
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn CredentialStore>,
        events: EventBus,
    ) -> Self {
        let tokens = match storage.load() {
            Ok(tokens) => tokens.filter(Tokens::is_complete),
            Err(e) => {
                warn!(error = %e, "Failed to load stored credentials, starting signed out");
                None
            }
        };
        debug!(has_credentials = tokens.is_some(), "Session hydrated");

        let (authenticated, _) = watch::channel(tokens.is_some());
        Self {
            state: RwLock::new(SessionState {
                tokens,
                identity: None,
                generation: 0,
            }),
            renewal: Mutex::new(()),
            storage,
            transport,
            authenticated,
            events,
        }
    }

    // ===== Readers =====

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.tokens.is_some()
    }

    /// Watch the authenticated flag, e.g. to re-run the navigation guard
    pub fn watch_authenticated(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    pub async fn identity(&self) -> Option<User> {
        self.state.read().await.identity.clone()
    }

    pub async fn tokens(&self) -> Option<Tokens> {
        self.state.read().await.tokens.clone()
    }

    pub async fn has_refresh_token(&self) -> bool {
        self.state
            .read()
            .await
            .tokens
            .as_ref()
            .is_some_and(|t| !t.refresh_token.is_empty())
    }

    /// Current access credential together with the generation it belongs to.
    pub async fn bearer(&self) -> (Option<String>, u64) {
        let state = self.state.read().await;
        (state.tokens.as_ref().map(|t| t.token.clone()), state.generation)
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    // ===== Auth endpoints =====

    /// Send to an auth endpoint. These calls skip renewal but still raise
    /// notices for server faults and server messages.
    async fn send_auth(&self, request: &ApiRequest) -> Result<RawResponse> {
        let (bearer, _) = self.bearer().await;
        self.transport
            .send(request, bearer.as_deref())
            .await
            .and_then(RawResponse::check)
            .inspect_err(|e| self.events.notify(e))
    }

    /// Sign in and store the issued credential pair and identity.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<User> {
        let request = ApiRequest::post("/auth/login").with_json(credentials)?;
        let response = self
            .send_auth(&request)
            .await
            .map_err(ApiError::into_login_error)?;
        let login: LoginResponse = response.json()?;

        let tokens = Tokens::new(login.token, login.refresh_token);
        if !tokens.is_complete() {
            return Err(ApiError::InvalidResponse(
                "Login response is missing a credential".to_string(),
            ));
        }

        {
            let mut state = self.state.write().await;
            self.storage
                .save(&tokens)
                .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
            state.tokens = Some(tokens);
            state.identity = Some(login.user.clone());
            state.generation += 1;
        }
        self.authenticated.send_replace(true);

        info!(user_id = login.user.id, username = %login.user.username, "Signed in");
        self.events.emit(ClientEvent::SignedIn(login.user.clone()));
        Ok(login.user)
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, new_user: &RegisterRequest) -> Result<User> {
        let request = ApiRequest::post("/auth/register").with_json(new_user)?;
        let response = self
            .send_auth(&request)
            .await
            .map_err(ApiError::into_register_error)?;
        let user: User = response.json()?;
        info!(user_id = user.id, username = %user.username, "Registered account");
        Ok(user)
    }

    /// Tell the server we are leaving, then clear local state whatever it
    /// answered.
    pub async fn logout(&self) {
        let (bearer, _) = self.bearer().await;
        if let Some(token) = bearer {
            let request = ApiRequest::post("/auth/logout");
            match self.send_auth(&request).await {
                Ok(_) => debug!("Server acknowledged logout"),
                Err(e) => warn!(error = %e, "Logout request failed, clearing session anyway"),
            }
        }

        if self.clear().await {
            info!("Signed out");
            self.events.emit(ClientEvent::SignedOut);
        }
    }

    /// Exchange the refresh credential for a new pair.
    ///
    /// A failed renewal clears the session.
    pub async fn renew(&self) -> Result<()> {
        let seen = self.generation().await;
        match self.renew_after(seen).await? {
            RenewOutcome::Renewed => Ok(()),
            // Someone else renewed or signed in meanwhile
            RenewOutcome::Superseded => {
                if self.is_authenticated().await {
                    Ok(())
                } else {
                    Err(ApiError::Renewal("session was cleared".to_string()))
                }
            }
        }
    }

    /// Renew on behalf of a caller that last saw credentials of generation
    /// `seen`.
    ///
    /// Renewals are serialized. A caller queued behind another renewal gets
    /// `Superseded` instead of spending the already-rotated refresh
    /// credential a second time. A result that arrives after the session was
    /// cleared or replaced is discarded. A rejected renewal clears the
    /// session it was started for and returns the error.
    pub async fn renew_after(&self, seen: u64) -> Result<RenewOutcome> {
        let _gate = self.renewal.lock().await;

        let (token, refresh_token) = {
            let state = self.state.read().await;
            if state.generation != seen {
                debug!(seen, current = state.generation, "Credentials changed while waiting, skipping renewal");
                return Ok(RenewOutcome::Superseded);
            }
            match state.tokens.as_ref().filter(|t| !t.refresh_token.is_empty()) {
                Some(t) => (t.token.clone(), t.refresh_token.clone()),
                None => return Err(ApiError::Renewal("no refresh credential".to_string())),
            }
        };

        info!("Renewing session credentials");
        let exchanged = self.exchange(&token, &refresh_token).await;

        let mut state = self.state.write().await;
        if state.generation != seen {
            debug!("Session changed during renewal, discarding result");
            return Ok(RenewOutcome::Superseded);
        }

        let applied = exchanged.and_then(|tokens| {
            self.storage
                .save(&tokens)
                .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
            Ok(tokens)
        });

        match applied {
            Ok(tokens) => {
                state.tokens = Some(tokens);
                state.generation += 1;
                drop(state);
                info!("Session renewed");
                self.events.emit(ClientEvent::Renewed);
                Ok(RenewOutcome::Renewed)
            }
            Err(e) => {
                warn!(error = %e, "Session renewal failed, clearing session");
                self.clear_locked(&mut state);
                drop(state);
                self.authenticated.send_replace(false);
                Err(e)
            }
        }
    }

    async fn exchange(&self, token: &str, refresh_token: &str) -> Result<Tokens> {
        let request = ApiRequest::post("/auth/refresh").with_json(&RefreshRequest { refresh_token })?;
        let tokens: Tokens = self
            .transport
            .send(&request, Some(token))
            .await
            .and_then(RawResponse::check)
            .and_then(|r| r.json())
            .map_err(ApiError::into_renewal_error)?;

        if tokens.is_complete() {
            Ok(tokens)
        } else {
            Err(ApiError::Renewal("server returned an incomplete credential pair".to_string()))
        }
    }

    // ===== Mutations =====

    /// Replace the cached identity with the server's copy. Ignored once the
    /// session is gone.
    pub async fn set_identity(&self, user: User) -> bool {
        let mut state = self.state.write().await;
        if state.tokens.is_none() {
            debug!("Session cleared before identity arrived, dropping it");
            return false;
        }
        state.identity = Some(user);
        true
    }

    /// Clear the session if its credentials are still those of `generation`.
    ///
    /// Returns false when a newer login or renewal replaced them, in which
    /// case nothing is touched.
    pub async fn expire(&self, generation: u64) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(generation, current = state.generation, "Session already replaced, not expiring");
            return false;
        }
        self.clear_locked(&mut state);
        drop(state);
        self.authenticated.send_replace(false);
        true
    }

    /// Drop credentials and identity in memory and storage. Returns whether
    /// there was anything to clear.
    pub async fn clear(&self) -> bool {
        let mut state = self.state.write().await;
        let had_session = self.clear_locked(&mut state);
        drop(state);
        self.authenticated.send_replace(false);
        had_session
    }

    /// Remove the persisted pair. If removal fails, overwrite it with an
    /// empty pair, which every backend loads as nothing, so a restart does
    /// not bring the session back.
    fn clear_storage(&self) {
        let Err(e) = self.storage.clear() else {
            return;
        };
        warn!(error = %e, "Failed to remove stored credentials, overwriting them");
        if let Err(e) = self.storage.save(&Tokens::new("", "")) {
            warn!(error = %e, "Stored credentials are still present after sign out");
            self.events.emit(ClientEvent::Notice(Notice::Message(
                "Signed out, but stored credentials could not be removed".to_string(),
            )));
        }
    }

    fn clear_locked(&self, state: &mut SessionState) -> bool {
        self.clear_storage();
        let had_session = state.tokens.is_some() || state.identity.is_some();
        state.tokens = None;
        state.identity = None;
        if had_session {
            state.generation += 1;
        }
        had_session
    }
}
