//! HTTP transport abstraction for the OIDC client
//!
//! Defines the `HttpClient` trait that decouples discovery and token exchange
//! from the concrete HTTP library. `ReqwestClient` is the production
//! implementation; tests substitute recording fakes to assert which requests
//! were (or were not) issued.

pub mod reqwest_client;

pub use reqwest_client::ReqwestClient;

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by `HttpClient` methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised below the HTTP status layer (DNS, TLS, connect, timeout).
///
/// Non-2xx responses are NOT errors at this layer; callers inspect
/// `HttpResponse::status` and decide how to classify them.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("client construction failed: {0}")]
    Build(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as UTF-8 text, lossy. Intended for error messages only.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Abstraction over the HTTP capability used by discovery and token exchange.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn HttpClient>`).
/// Implementations must not retry: each call maps to exactly one request.
pub trait HttpClient: Send + Sync {
    /// Issue a GET and buffer at most `max_body` bytes of the response.
    ///
    /// A longer body fails with `TransportError::BodyTooLarge` without being
    /// read past the limit.
    fn get<'a>(&'a self, url: &'a str, max_body: usize) -> BoxFuture<'a, Result<HttpResponse>>;

    /// Issue a POST with an `application/x-www-form-urlencoded` body.
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        form: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<HttpResponse>>;
}
