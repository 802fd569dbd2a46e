//! Fakes and fixtures shared by unit tests.

use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use transport::{BoxFuture, HttpClient, HttpResponse, TransportError};

/// `HttpClient` fake that records every request and replays canned responses.
#[derive(Default)]
pub struct RecordingHttpClient {
    get_response: Option<HttpResponse>,
    post_response: Option<HttpResponse>,
    hang: bool,
    requests: Mutex<Vec<String>>,
    get_limits: Mutex<Vec<usize>>,
    forms: Mutex<Vec<Vec<(String, String)>>>,
}

impl RecordingHttpClient {
    pub fn with_get(response: HttpResponse) -> Self {
        Self {
            get_response: Some(response),
            ..Self::default()
        }
    }

    pub fn with_get_and_post(get: HttpResponse, post: HttpResponse) -> Self {
        Self {
            get_response: Some(get),
            post_response: Some(post),
            ..Self::default()
        }
    }

    /// Every request fails at the transport layer.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Every request records itself and then never completes.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Requests issued so far, as `"METHOD url"`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Body limits passed with each GET.
    pub fn get_limits(&self) -> Vec<usize> {
        self.get_limits.lock().unwrap().clone()
    }

    /// Form bodies of POST requests issued so far.
    pub fn forms(&self) -> Vec<Vec<(String, String)>> {
        self.forms.lock().unwrap().clone()
    }

    async fn respond(&self, canned: Option<HttpResponse>) -> transport::Result<HttpResponse> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        canned.ok_or_else(|| TransportError::Request("connection refused".into()))
    }
}

impl HttpClient for RecordingHttpClient {
    fn get<'a>(
        &'a self,
        url: &'a str,
        max_body: usize,
    ) -> BoxFuture<'a, transport::Result<HttpResponse>> {
        self.requests.lock().unwrap().push(format!("GET {url}"));
        self.get_limits.lock().unwrap().push(max_body);
        Box::pin(self.respond(self.get_response.clone()))
    }

    fn post_form<'a>(
        &'a self,
        url: &'a str,
        form: &'a [(&'a str, &'a str)],
    ) -> BoxFuture<'a, transport::Result<HttpResponse>> {
        self.requests.lock().unwrap().push(format!("POST {url}"));
        self.forms.lock().unwrap().push(
            form.iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        );
        Box::pin(self.respond(self.post_response.clone()))
    }
}

/// A discovery document whose endpoints hang off `issuer`.
pub fn discovery_json(issuer: &str) -> String {
    serde_json::json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/authorize"),
        "token_endpoint": format!("{issuer}/token"),
        "jwks_uri": format!("{issuer}/jwks"),
        "userinfo_endpoint": format!("{issuer}/userinfo"),
        "response_types_supported": ["code"],
        "code_challenge_methods_supported": ["S256"],
        "claims_parameter_supported": false
    })
    .to_string()
}

/// Unsigned JWT with the given payload (signature segment is a dummy).
pub fn jwt(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT","kid":"k1"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

/// Claims payload carrying every field the identity mapping reads.
pub fn full_claims() -> serde_json::Value {
    serde_json::json!({
        "sub": "u1",
        "iss": "https://idp.example/env123/as",
        "aud": "client-1",
        "exp": 1700000000,
        "iat": 1699996400,
        "auth_time": 1699996300,
        "email": "a@b.com",
        "given_name": "Ada",
        "preferred_username": "ada",
        "nonce": "nonce-1",
        "acr": "Single_Factor",
        "at_hash": "hash-1",
        "updated_at": 1690000000
    })
}
