//! Authorization code exchange
//!
//! Second leg of the PKCE flow: the user authorized in the browser and the
//! redirect delivered an authorization code. We POST the code together with
//! the PKCE verifier to the provider's discovered token endpoint to prove we
//! initiated the flow. The response body is the `CredentialBundle`.

use tracing::{debug, warn};
use transport::HttpClient;

use crate::credentials::CredentialBundle;
use crate::error::{Error, Result};

/// Client-side parameters for the code exchange.
#[derive(Debug, Clone)]
pub struct CodeExchange<'a> {
    pub token_endpoint: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub code: &'a str,
    pub verifier: &'a str,
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    http: &dyn HttpClient,
    exchange: &CodeExchange<'_>,
) -> Result<CredentialBundle> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", exchange.code),
        ("code_verifier", exchange.verifier),
        ("client_id", exchange.client_id),
        ("redirect_uri", exchange.redirect_uri),
    ];

    let response = http
        .post_form(exchange.token_endpoint, &form)
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    if !response.is_success() {
        warn!(status = response.status, "token endpoint rejected code exchange");
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {}: {}",
            response.status,
            response.text()
        )));
    }

    let bundle: CredentialBundle = serde_json::from_slice(&response.body)
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;
    debug!(
        token_type = %bundle.token_type,
        expires_in = bundle.expires_in,
        "exchanged authorization code"
    );
    Ok(bundle)
}
