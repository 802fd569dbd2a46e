//! OpenID Connect provider discovery
//!
//! Fetches the provider's published metadata from the discovery URL derived
//! from the environment descriptor. One GET per call, no retries; every
//! failure (transport, status, size, decode, missing endpoint) surfaces as
//! `DiscoveryFailed` and no partial metadata is ever returned.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use transport::HttpClient;
use url::Url;

use crate::config::EnvironmentConfig;
use crate::constants::MAX_DISCOVERY_RESPONSE_SIZE;
use crate::error::{Error, Result};

/// Provider metadata from the discovery document.
///
/// The endpoints this client drives are typed; everything else the provider
/// publishes is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_types_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ProviderMetadata {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("issuer", &self.issuer),
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(Error::DiscoveryFailed(format!(
                    "discovery document has empty {name}"
                )));
            }
        }
        Ok(())
    }
}

/// Knobs for the discovery fetch.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Permit plain-HTTP discovery URLs. Test servers only.
    pub allow_http: bool,
    pub max_response_size: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            allow_http: false,
            max_response_size: MAX_DISCOVERY_RESPONSE_SIZE,
        }
    }
}

/// Fetches `ProviderMetadata` over the injected HTTP capability.
#[derive(Clone)]
pub struct DiscoveryClient {
    http: Arc<dyn HttpClient>,
    options: DiscoveryOptions,
}

impl DiscoveryClient {
    pub fn new(http: Arc<dyn HttpClient>, options: DiscoveryOptions) -> Self {
        Self { http, options }
    }

    /// Fetch and decode the provider metadata for `config`.
    pub async fn fetch_provider_metadata(
        &self,
        config: &EnvironmentConfig,
    ) -> Result<ProviderMetadata> {
        let url = self.discovery_url(config)?;

        let response = self
            .http
            .get(url.as_str(), self.options.max_response_size)
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "discovery request failed");
                Error::DiscoveryFailed(e.to_string())
            })?;

        if !response.is_success() {
            warn!(url = %url, status = response.status, "discovery returned non-success status");
            return Err(Error::DiscoveryFailed(format!(
                "discovery endpoint returned {}",
                response.status
            )));
        }

        if response.body.len() > self.options.max_response_size {
            return Err(Error::DiscoveryFailed(format!(
                "discovery document exceeds {} bytes",
                self.options.max_response_size
            )));
        }

        let metadata: ProviderMetadata = serde_json::from_slice(&response.body).map_err(|e| {
            warn!(url = %url, error = %e, "discovery document did not decode");
            Error::DiscoveryFailed(format!("invalid discovery document: {e}"))
        })?;
        metadata.validate()?;

        debug!(issuer = %metadata.issuer, "discovered provider metadata");
        Ok(metadata)
    }

    fn discovery_url(&self, config: &EnvironmentConfig) -> Result<Url> {
        let raw = config.discovery_url();
        let url = Url::parse(&raw)
            .map_err(|e| Error::DiscoveryFailed(format!("invalid discovery URL {raw}: {e}")))?;
        match url.scheme() {
            "https" => Ok(url),
            "http" if self.options.allow_http => Ok(url),
            other => Err(Error::DiscoveryFailed(format!(
                "discovery URL scheme {other} not allowed (only https)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingHttpClient, discovery_json};
    use transport::HttpResponse;

    fn config(template: &str) -> EnvironmentConfig {
        EnvironmentConfig::from_json(&format!(
            r#"{{"discovery_uri":"{template}","environment_id":"env123"}}"#
        ))
        .unwrap()
    }

    fn client(http: Arc<RecordingHttpClient>) -> DiscoveryClient {
        DiscoveryClient::new(http, DiscoveryOptions::default())
    }

    #[tokio::test]
    async fn fetches_substituted_url_and_decodes() {
        let http = Arc::new(RecordingHttpClient::with_get(HttpResponse::new(
            200,
            discovery_json("https://idp.example/env123/as"),
        )));
        let metadata = client(http.clone())
            .fetch_provider_metadata(&config("https://idp.example/{}/.well-known"))
            .await
            .unwrap();

        assert_eq!(http.requests(), vec!["GET https://idp.example/env123/.well-known"]);
        assert_eq!(metadata.issuer, "https://idp.example/env123/as");
        assert_eq!(
            metadata.token_endpoint,
            "https://idp.example/env123/as/token"
        );
        assert_eq!(
            metadata.extra.get("claims_parameter_supported"),
            Some(&serde_json::Value::Bool(false))
        );
    }

    #[tokio::test]
    async fn non_success_status_fails() {
        let http = Arc::new(RecordingHttpClient::with_get(HttpResponse::new(404, "nope")));
        let result = client(http)
            .fetch_provider_metadata(&config("https://idp.example/{}/.well-known"))
            .await;
        assert!(matches!(result, Err(Error::DiscoveryFailed(msg)) if msg.contains("404")));
    }

    #[tokio::test]
    async fn undecodable_body_fails() {
        let http = Arc::new(RecordingHttpClient::with_get(HttpResponse::new(
            200,
            r#"{"issuer":"https://idp"}"#,
        )));
        let result = client(http)
            .fetch_provider_metadata(&config("https://idp.example/{}/.well-known"))
            .await;
        assert!(matches!(result, Err(Error::DiscoveryFailed(_))));
    }

    #[tokio::test]
    async fn empty_endpoint_fails() {
        let body = r#"{"issuer":"https://idp","authorization_endpoint":"","token_endpoint":"https://idp/token"}"#;
        let http = Arc::new(RecordingHttpClient::with_get(HttpResponse::new(200, body)));
        let result = client(http)
            .fetch_provider_metadata(&config("https://idp.example/{}/.well-known"))
            .await;
        assert!(
            matches!(result, Err(Error::DiscoveryFailed(msg)) if msg.contains("authorization_endpoint"))
        );
    }

    #[tokio::test]
    async fn transport_error_fails() {
        let http = Arc::new(RecordingHttpClient::failing());
        let result = client(http.clone())
            .fetch_provider_metadata(&config("https://idp.example/{}/.well-known"))
            .await;
        assert!(matches!(result, Err(Error::DiscoveryFailed(_))));
        assert_eq!(http.requests().len(), 1, "no retries");
    }

    #[tokio::test]
    async fn oversized_body_fails() {
        let http = Arc::new(RecordingHttpClient::with_get(HttpResponse::new(
            200,
            discovery_json("https://idp.example/env123/as"),
        )));
        let discovery = DiscoveryClient::new(
            http.clone(),
            DiscoveryOptions {
                max_response_size: 16,
                ..DiscoveryOptions::default()
            },
        );
        let result = discovery
            .fetch_provider_metadata(&config("https://idp.example/{}/.well-known"))
            .await;
        assert!(matches!(result, Err(Error::DiscoveryFailed(msg)) if msg.contains("exceeds")));
        assert_eq!(http.get_limits(), vec![16], "limit handed to the transport");
    }

    #[tokio::test]
    async fn plain_http_rejected_unless_allowed() {
        let http = Arc::new(RecordingHttpClient::with_get(HttpResponse::new(
            200,
            discovery_json("http://idp.local/env123"),
        )));
        let result = client(http.clone())
            .fetch_provider_metadata(&config("http://idp.local/{}/.well-known"))
            .await;
        assert!(matches!(result, Err(Error::DiscoveryFailed(_))));
        assert!(http.requests().is_empty(), "rejected before any request");

        let permissive = DiscoveryClient::new(
            http.clone(),
            DiscoveryOptions {
                allow_http: true,
                ..DiscoveryOptions::default()
            },
        );
        assert!(
            permissive
                .fetch_provider_metadata(&config("http://idp.local/{}/.well-known"))
                .await
                .is_ok()
        );
    }

    #[test]
    fn metadata_round_trips_unknown_fields() {
        let metadata: ProviderMetadata =
            serde_json::from_str(&discovery_json("https://idp.example/env123/as")).unwrap();
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["claims_parameter_supported"], false);
        assert_eq!(json["issuer"], "https://idp.example/env123/as");
    }
}
