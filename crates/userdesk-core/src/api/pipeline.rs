//! Authenticated request pipeline.
//!
//! Every outbound call goes through `RequestPipeline::execute` exactly once
//! per logical attempt: the current access credential is attached, an
//! authorization failure triggers one serialized renewal and a single
//! re-dispatch, and other failures raise user-visible notices before being
//! handed back unchanged.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::{ApiError, ApiRequest, RawResponse, Result, Transport};
use crate::auth::{RenewOutcome, SessionStore};
use crate::events::{ClientEvent, EventBus};

#[derive(Clone)]
pub struct RequestPipeline {
    session: Arc<SessionStore>,
    transport: Arc<dyn Transport>,
    events: EventBus,
}

impl RequestPipeline {
    pub fn new(session: Arc<SessionStore>, transport: Arc<dyn Transport>, events: EventBus) -> Self {
        Self {
            session,
            transport,
            events,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Run a request and decode its JSON body.
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.execute(request).await?.json()
    }

    pub async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
        let (bearer, generation) = self.session.bearer().await;
        match self.dispatch(&request, bearer.as_deref()).await {
            Ok(response) => Ok(response),
            Err(err) if err.is_unauthorized() && !request.retried => {
                self.recover(&request, generation, err).await
            }
            Err(err) => {
                self.notify(&err);
                Err(err)
            }
        }
    }

    async fn dispatch(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse> {
        self.transport.send(request, bearer).await?.check()
    }

    /// Handle a 401 on a first attempt. `original` is what the caller sees
    /// if the session cannot be recovered.
    async fn recover(&self, request: &ApiRequest, generation: u64, original: ApiError) -> Result<RawResponse> {
        if !self.session.has_refresh_token().await {
            warn!(request = %request, "Unauthorized without a refresh credential");
            if self.session.expire(generation).await {
                self.events.emit(ClientEvent::SessionExpired);
            }
            return Err(original);
        }

        debug!(request = %request, "Unauthorized, renewing credentials");
        match self.session.renew_after(generation).await {
            Ok(RenewOutcome::Renewed) => self.retry(request).await,
            Ok(RenewOutcome::Superseded) => {
                if self.session.is_authenticated().await {
                    self.retry(request).await
                } else {
                    debug!(request = %request, "Session cleared elsewhere, not retrying");
                    Err(original)
                }
            }
            Err(renewal_err) => {
                warn!(request = %request, error = %renewal_err, "Renewal failed, session expired");
                self.events.emit(ClientEvent::SessionExpired);
                Err(original)
            }
        }
    }

    async fn retry(&self, request: &ApiRequest) -> Result<RawResponse> {
        let retry = request.as_retry();
        let (bearer, _) = self.session.bearer().await;
        info!(request = %retry, "Retrying with renewed credentials");
        self.dispatch(&retry, bearer.as_deref()).await.map_err(|err| {
            self.notify(&err);
            err
        })
    }

    fn notify(&self, err: &ApiError) {
        self.events.notify(err);
    }
}
