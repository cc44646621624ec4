//! Signals the core raises for whoever drives navigation and the UI.

use std::fmt;

use tokio::sync::broadcast;
use tracing::debug;

use crate::api::ApiError;
use crate::models::User;

/// Buffered events per subscriber before the oldest are dropped
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    SignedIn(User),
    Renewed,
    SignedOut,
    /// Credentials were lost and could not be renewed; the listener should
    /// send the user to the login entry point.
    SessionExpired,
    Notice(Notice),
}

/// User-visible notification raised by the request pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ServerUnavailable,
    Message(String),
}

impl Notice {
    /// Notice a failed request should raise, if any.
    ///
    /// Authorization failures raise none; they are handled by renewal or
    /// end in a session-expired signal.
    pub fn for_error(err: &ApiError) -> Option<Self> {
        if err.is_unauthorized() {
            None
        } else if err.is_server_error() {
            Some(Notice::ServerUnavailable)
        } else {
            err.server_message().map(|m| Notice::Message(m.to_string()))
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ServerUnavailable => write!(f, "Server error, please try again later"),
            Notice::Message(message) => write!(f, "{}", message),
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Raise the notice matching a failed request.
    pub fn notify(&self, err: &ApiError) {
        if let Some(notice) = Notice::for_error(err) {
            debug!(%notice, "Raising notice");
            self.emit(ClientEvent::Notice(notice));
        }
    }

    pub fn emit(&self, event: ClientEvent) {
        // No subscribers is fine, nobody is listening yet
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
