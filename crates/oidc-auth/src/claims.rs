//! ID token claim extraction
//!
//! Decodes the stored ID token's payload into `IdentityClaims` with
//! `jsonwebtoken`. Decoding is strict: a token that does not parse as a JWS
//! compact serialization, or whose payload lacks or mis-types any identity
//! claim, is rejected with `MalformedToken`. Nothing is defaulted.
//!
//! The signature is NOT verified here. `IdentityClaims::validate` adds the
//! issuer, audience, expiry and nonce checks for callers that want them.

use jsonwebtoken::dangerous::insecure_decode;
use jsonwebtoken::decode_header;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::error::{Error, Result};

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AudienceRepr", into = "Vec<String>")]
pub struct Audience(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    One(String),
    Many(Vec<String>),
}

impl From<AudienceRepr> for Audience {
    fn from(repr: AudienceRepr) -> Self {
        match repr {
            AudienceRepr::One(aud) => Audience(vec![aud]),
            AudienceRepr::Many(auds) => Audience(auds),
        }
    }
}

impl From<Audience> for Vec<String> {
    fn from(aud: Audience) -> Self {
        aud.0
    }
}

impl Audience {
    pub fn contains(&self, client_id: &str) -> bool {
        self.0.iter().any(|a| a == client_id)
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

/// Identity claims carried by the ID token.
///
/// Every field is mandatory. Timestamps are seconds since the unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub iss: String,
    pub aud: Audience,
    pub exp: i64,
    pub iat: i64,
    pub auth_time: i64,
    pub email: String,
    pub given_name: String,
    pub preferred_username: String,
    pub nonce: String,
    /// Authentication context class reference
    pub acr: String,
    /// Access token hash
    pub at_hash: String,
    pub updated_at: i64,
}

/// Expected values for `IdentityClaims::validate`.
#[derive(Debug, Clone)]
pub struct ClaimsValidation<'a> {
    pub issuer: &'a str,
    pub client_id: Option<&'a str>,
    pub nonce: Option<&'a str>,
    /// Current time, seconds since the unix epoch
    pub now: i64,
    pub leeway_secs: i64,
}

impl IdentityClaims {
    /// Check issuer, audience, expiry and nonce.
    pub fn validate(&self, expected: &ClaimsValidation<'_>) -> Result<()> {
        if self.iss.trim_end_matches('/') != expected.issuer.trim_end_matches('/') {
            return Err(Error::MalformedToken(format!(
                "issuer mismatch: expected {}, got {}",
                expected.issuer, self.iss
            )));
        }

        if let Some(client_id) = expected.client_id
            && !self.aud.contains(client_id)
        {
            return Err(Error::MalformedToken(format!(
                "audience does not include {client_id}"
            )));
        }

        if self.exp.saturating_add(expected.leeway_secs) < expected.now {
            return Err(Error::MalformedToken(format!(
                "token expired at {} (now {})",
                self.exp, expected.now
            )));
        }

        if let Some(nonce) = expected.nonce
            && self.nonce != nonce
        {
            return Err(Error::MalformedToken("nonce mismatch".into()));
        }

        Ok(())
    }
}

/// Decode an ID token into claims without verifying its signature.
pub fn decode_id_token(id_token: &str) -> Result<IdentityClaims> {
    let id_token = id_token.trim();
    let header = decode_header(id_token)
        .map_err(|e| Error::MalformedToken(format!("invalid token header: {e}")))?;
    let data = insecure_decode::<IdentityClaims>(id_token)
        .map_err(|e| Error::MalformedToken(format!("invalid token claims: {e}")))?;
    debug!(alg = ?header.alg, kid = ?header.kid, "decoded id token");
    Ok(data.claims)
}

/// Produces `IdentityClaims` from the currently stored credential.
#[derive(Clone)]
pub struct ClaimsExtractor {
    credentials: CredentialStore,
}

impl ClaimsExtractor {
    pub fn new(credentials: CredentialStore) -> Self {
        Self { credentials }
    }

    /// Decode the stored ID token.
    ///
    /// `MissingCredential` when nothing (decodable) is stored,
    /// `MalformedToken` when the ID token itself is bad.
    pub async fn extract_claims(&self) -> Result<IdentityClaims> {
        let bundle = self
            .credentials
            .load()
            .await?
            .ok_or(Error::MissingCredential)?;
        decode_id_token(bundle.id_token.expose()).inspect_err(|e| {
            warn!(error = %e, "stored id token rejected");
        })
    }
}
