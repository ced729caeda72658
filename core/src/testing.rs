//! In-memory [`Transport`] for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportError};

type Reply = Result<HttpResponse, TransportError>;

/// Replies to requests by path from per-path scripts. The last reply of a
/// script repeats once the earlier ones are used up.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request waits this long (on the tokio clock) before replying.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn respond(self, path: &str, status: u16, body: &str) -> Self {
        self.push(
            path,
            Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn fail(self, path: &str, error: TransportError) -> Self {
        self.push(path, Err(error));
        self
    }

    /// Append a reply for `path` after construction.
    pub fn push(&self, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Number of requests received for `path`, any method.
    pub fn calls(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| path_of(&r.url) == path)
            .count()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_reply(&self, path: &str) -> Reply {
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        match replies.get_mut(path) {
            Some(script) if script.len() > 1 => script
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("empty script".to_string()))),
            Some(script) => script
                .front()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Other("empty script".to_string()))),
            None => Ok(HttpResponse {
                status: 404,
                headers: Vec::new(),
                body: "{}".to_string(),
            }),
        }
    }
}

fn path_of(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => url,
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = path_of(&request.url).to_string();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.next_reply(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_strips_scheme_and_host() {
        assert_eq!(path_of("http://localhost:3000/users/1"), "/users/1");
        assert_eq!(path_of("http://localhost:3000"), "/");
        assert_eq!(path_of("/posts"), "/posts");
    }
}
