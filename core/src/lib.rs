//! Typed request, validation and cache pipeline for the users/posts/todos
//! placeholder API.
//!
//! # Overview
//! Resource clients build plain-data [`HttpRequest`] values and run them
//! through a [`Transport`]. Every response body is checked against a
//! [`Schema`] before it becomes typed data, and every outcome is normalized
//! into an [`ApiResult`]. On top of that, [`QueryCache`] serves results by
//! [`QueryKey`], coalesces identical requests, retries and invalidates, and
//! reports failures to the [`ErrorChannel`].
//!
//! # Design
//! - Request building (`build_*`) is pure; only the transport does I/O, so
//!   everything above it is testable with an in-memory transport.
//! - Server records never carry client-only flags; those live in
//!   [`Annotated`].
//! - The cache and error channel are constructed once and passed around;
//!   nothing is a global.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod cache;
pub mod client;
pub mod config;
pub mod draft;
pub mod error;
pub mod error_channel;
pub mod http;
pub mod keys;
pub mod logging;
pub mod messages;
pub mod queries;
pub mod result;
pub mod retry;
pub mod schema;
pub mod transport;
pub mod types;
pub mod validate;

#[cfg(test)]
mod testing;

pub use cache::{
    ErrorCallback, QueryCache, QueryObserver, QueryOptions, QueryState, QueryStatus,
    SuccessCallback,
};
pub use client::{ApiClient, PostsClient, TodosClient, UsersClient};
pub use config::{AppConfig, AppVariant, CacheConfig, LogLevel, RetryPolicy};
pub use draft::{update, Annotated, ClientMeta};
pub use error::{ApiError, ConfigError};
pub use error_channel::{ErrorChannel, ErrorState, Presentation};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use keys::{KeySegment, QueryKey};
pub use queries::Queries;
pub use result::{ApiFailure, ApiResult, FailureKind};
pub use schema::{Field, Schema};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use types::{NewPost, NewTodo, Post, PostUpdate, Todo, TodoUpdate, User};
pub use validate::{validate, validate_with_fallback, Validated, ValidationResult};
