//! Resource clients for the users/posts/todos API.
//!
//! # Design
//! Each resource client is split the same way: `build_*` methods produce an
//! [`HttpRequest`] without touching the network, and async methods run that
//! request through the shared [`Transport`] and the result normalizer. The
//! clients hold no mutable state; clones share one transport and can be used
//! concurrently.

pub mod endpoints;
mod posts;
mod todos;
mod users;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::result::{execute, ApiResult};
use crate::transport::{ReqwestTransport, Transport, TransportError};
use crate::validate::ValidationFallback;

pub use posts::PostsClient;
pub use todos::TodosClient;
pub use users::UsersClient;

/// Base URL plus transport, shared by every resource client.
#[derive(Clone)]
struct Requester {
    base_url: Arc<str>,
    transport: Arc<dyn Transport>,
}

impl Requester {
    fn new(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            transport,
        }
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
            ..self.request(method, path)
        })
    }

    async fn send<T, V>(&self, request: HttpRequest, validator: V) -> ApiResult<T>
    where
        V: FnOnce(&Value) -> Result<T, ValidationFallback>,
    {
        execute(self.transport.as_ref(), request, validator).await
    }

    async fn send_built<T, V>(&self, request: Result<HttpRequest, ApiError>, validator: V) -> ApiResult<T>
    where
        V: FnOnce(&Value) -> Result<T, ValidationFallback>,
    {
        match request {
            Ok(request) => self.send(request, validator).await,
            Err(e) => e.into(),
        }
    }
}

/// Delete responses carry no data worth validating.
fn ignore_body(_: &Value) -> Result<(), ValidationFallback> {
    Ok(())
}

/// All resource clients over one base URL and transport.
#[derive(Clone)]
pub struct ApiClient {
    pub users: UsersClient,
    pub posts: PostsClient,
    pub todos: TodosClient,
}

impl ApiClient {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        let requester = Requester::new(base_url, transport);
        Self {
            users: UsersClient::new(requester.clone()),
            posts: PostsClient::new(requester.clone()),
            todos: TodosClient::new(requester),
        }
    }

    /// Client over a [`ReqwestTransport`] configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::new(&config.api_url, Arc::new(transport)))
    }

    pub fn base_url(&self) -> &str {
        self.users.base_url()
    }
}
