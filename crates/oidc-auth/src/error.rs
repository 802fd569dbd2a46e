//! Error types for the OIDC client

/// Errors from configuration, discovery, credential and claim operations.
///
/// `ConfigMissing` and `SecureRandomUnavailable` are fatal: the caller must
/// block and show the message rather than continue in a degraded state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment not configured: {0}")]
    ConfigMissing(String),

    #[error("provider discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("no stored credential, login required")]
    MissingCredential,

    #[error("malformed id token: {0}")]
    MalformedToken(String),

    #[error("secure session could not be started: {0}")]
    SecureRandomUnavailable(String),

    #[error("session not ready: {0}")]
    NotReady(&'static str),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("secret store error: {0}")]
    SecretStore(String),
}

impl Error {
    /// Whether the stored session is corrupt and should be discarded.
    ///
    /// Distinguishes "never logged in" (`MissingCredential`) from a stored
    /// token that no longer decodes (`MalformedToken`).
    pub fn forces_logout(&self) -> bool {
        matches!(self, Error::MalformedToken(_))
    }

    /// Whether the failure must abort session use entirely.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigMissing(_) | Error::SecureRandomUnavailable(_)
        )
    }
}

/// Result alias for OIDC client operations.
pub type Result<T> = std::result::Result<T, Error>;
