//! `reqwest`-backed HTTP client.
//!
//! Buffers the body so callers can decode it with `serde_json`. GET bodies
//! are read chunk by chunk and abandoned once they pass the caller's limit.
//! No retries, no custom headers beyond `Accept: application/json`.

use std::time::Duration;

use reqwest::header::ACCEPT;
use tracing::debug;

use crate::{BoxFuture, HttpClient, HttpResponse, Result, TransportError};

/// Production `HttpClient` built on a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Build a client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest::Client` (shares its connection pool).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

async fn buffer(mut response: reqwest::Response, max_body: usize) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    if response
        .content_length()
        .is_some_and(|len| len > max_body as u64)
    {
        return Err(TransportError::BodyTooLarge(max_body));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TransportError::Body(e.to_string()))?
    {
        if body.len() + chunk.len() > max_body {
            return Err(TransportError::BodyTooLarge(max_body));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(HttpResponse::new(status, body))
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str, max_body: usize) -> BoxFuture<'a, Result<HttpResponse>> {
        Box::pin(async move {
            debug!(url, max_body, "GET");
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(classify)?;
            buffer(response, max_body).await
        })
    }

    fn post_form<'a>(
        &'a self,
        url: &'a str,
        form: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, Result<HttpResponse>> {
        Box::pin(async move {
            debug!(url, "POST form");
            let response = self
                .client
                .post(url)
                .header(ACCEPT, "application/json")
                .form(form)
                .send()
                .await
                .map_err(classify)?;
            buffer(response, usize::MAX).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIMIT: usize = 1024 * 1024;

    fn client() -> ReqwestClient {
        ReqwestClient::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn get_buffers_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/env123/.well-known"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/env123/.well-known", server.uri());
        let response = client().get(&url, LIMIT).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn non_success_status_is_not_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let response = client().get(&server.uri(), LIMIT).await.unwrap();
        assert_eq!(response.status, 503);
        assert!(!response.is_success());
        assert_eq!(response.text(), "down");
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 64 * 1024]))
            .mount(&server)
            .await;

        let result = client().get(&server.uri(), 1024).await;
        assert!(matches!(result, Err(TransportError::BodyTooLarge(1024))));
    }

    #[tokio::test]
    async fn body_at_limit_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 1024]))
            .mount(&server)
            .await;

        let response = client().get(&server.uri(), 1024).await.unwrap();
        assert_eq!(response.body.len(), 1024);
    }

    #[tokio::test]
    async fn post_form_encodes_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/token", server.uri());
        let form = [("grant_type", "authorization_code"), ("code", "abc")];
        let response = client().post_form(&url, &form).await.unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn connection_refused_is_request_error() {
        // Port 9 (discard) on localhost is not listening in test environments
        let result = client().get("http://127.0.0.1:9/", LIMIT).await;
        assert!(matches!(
            result,
            Err(TransportError::Request(_)) | Err(TransportError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = ReqwestClient::new(Duration::from_millis(100)).unwrap();
        let result = client.get(&server.uri(), LIMIT).await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }
}
