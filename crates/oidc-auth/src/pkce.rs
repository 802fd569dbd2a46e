//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the code verifier and S256 challenge used during the
//! authorization code flow. The verifier is drawn once per session and held
//! in memory only; the challenge goes into the authorization URL so the
//! provider can bind the later code exchange to this client.
//!
//! Two different alphabet rewrites are in play and must stay distinct:
//! - verifier: standard base64, then `+`, `/` and `=` all become `-`
//! - challenge: base64url without padding (`+`→`-`, `/`→`_`, `=` stripped)

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use common::Secret;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use url::Url;

use crate::constants::VERIFIER_ENTROPY_BYTES;
use crate::error::{Error, Result};

/// Generate a cryptographically random PKCE code verifier.
///
/// Draws 64 bytes from the operating system RNG. There is deliberately no
/// fallback generator: if the OS source fails, session start-up fails with
/// `SecureRandomUnavailable`.
pub fn generate_verifier() -> Result<String> {
    let mut bytes = [0u8; VERIFIER_ENTROPY_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::SecureRandomUnavailable(e.to_string()))?;
    Ok(encode_verifier(&bytes))
}

/// Encode raw verifier entropy into the verifier alphabet.
///
/// 64 bytes encode to 88 characters drawn from `[A-Za-z0-9-]`.
pub fn encode_verifier(bytes: &[u8]) -> String {
    STANDARD
        .encode(bytes)
        .replace('+', "-")
        .replace('/', "-")
        .replace('=', "-")
        .trim()
        .to_owned()
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`, no padding. Pure: the same
/// verifier always yields the same challenge.
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Per-session PKCE material.
///
/// The verifier is fixed for the lifetime of the value; the challenge is
/// derived on demand.
#[derive(Debug, Clone)]
pub struct PkceState {
    verifier: Secret<String>,
}

impl PkceState {
    /// Draw a fresh verifier from the OS RNG.
    pub fn generate() -> Result<Self> {
        Ok(Self::from_verifier(generate_verifier()?))
    }

    /// Wrap an externally supplied verifier.
    pub fn from_verifier(verifier: String) -> Self {
        Self {
            verifier: Secret::new(verifier),
        }
    }

    pub fn verifier(&self) -> &str {
        self.verifier.expose()
    }

    pub fn challenge(&self) -> String {
        compute_challenge(self.verifier.expose())
    }
}

/// Parameters for the front-channel authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationParams<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub scope: &'a str,
    pub state: &'a str,
    pub nonce: &'a str,
    pub challenge: &'a str,
}

/// Build the full authorization URL with all required OAuth parameters.
///
/// Query values are form-encoded by `url`; any query already present on the
/// discovered endpoint is preserved.
pub fn build_authorization_url(
    endpoint: &str,
    params: &AuthorizationParams<'_>,
) -> Result<String> {
    let mut url = Url::parse(endpoint).map_err(|e| {
        Error::DiscoveryFailed(format!("invalid authorization_endpoint {endpoint}: {e}"))
    })?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", params.client_id)
        .append_pair("redirect_uri", params.redirect_uri)
        .append_pair("scope", params.scope)
        .append_pair("state", params.state)
        .append_pair("nonce", params.nonce)
        .append_pair("code_challenge", params.challenge)
        .append_pair("code_challenge_method", "S256");
    Ok(url.into())
}
