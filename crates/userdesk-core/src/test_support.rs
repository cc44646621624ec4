//! Scripted transport and JSON fixtures shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

use crate::api::{ApiError, ApiRequest, RawResponse, Result, Transport};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub retried: bool,
    pub body: Option<serde_json::Value>,
}

enum Step {
    Reply(Result<RawResponse>),
    Delayed(Duration, RawResponse),
}

/// Canned replies keyed by `"METHOD /path"`, served in FIFO order.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Step>>>,
    log: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, key: &str, step: Step) {
        self.replies
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(step);
    }

    pub fn reply(&self, key: &str, status: u16, body: &str) -> &Self {
        self.push(key, Step::Reply(Ok(RawResponse::new(status, body))));
        self
    }

    /// Reply only after `delay`, so sibling requests can run in between
    pub fn reply_after(&self, key: &str, delay: Duration, status: u16, body: &str) -> &Self {
        self.push(key, Step::Delayed(delay, RawResponse::new(status, body)));
        self
    }

    pub fn fail(&self, key: &str, err: ApiError) -> &Self {
        self.push(key, Step::Reply(Err(err)));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn calls_to(&self, key: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| format!("{} {}", r.method, r.path) == key)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RawResponse> {
        let key = format!("{} {}", request.method, request.path);
        self.log.lock().unwrap().push(Recorded {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            bearer: bearer.map(str::to_string),
            retried: request.retried,
            body: request.body.clone(),
        });

        let step = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        match step {
            Some(Step::Reply(reply)) => reply,
            Some(Step::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            None => Err(ApiError::Network(format!("no scripted reply for {}", key))),
        }
    }
}

pub fn user_json(id: u64, username: &str) -> String {
    format!(
        r#"{{"id":{id},"username":"{username}","email":"{username}@example.com","is_active":true,"created_at":"2024-05-01T08:00:00Z","updated_at":"2024-05-01T08:00:00Z"}}"#
    )
}

pub fn login_json(token: &str, refresh_token: &str, id: u64, username: &str) -> String {
    format!(
        r#"{{"token":"{token}","refresh_token":"{refresh_token}","user":{}}}"#,
        user_json(id, username)
    )
}

pub fn tokens_json(token: &str, refresh_token: &str) -> String {
    format!(r#"{{"token":"{token}","refresh_token":"{refresh_token}"}}"#)
}

pub const UNAUTHORIZED: &str = r#"{"error":"Invalid or expired token"}"#;
