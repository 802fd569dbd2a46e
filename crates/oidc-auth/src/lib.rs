//! OpenID Connect authorization code + PKCE client
//!
//! Discovers a provider's configuration, runs the PKCE authorization code
//! flow, keeps the resulting credential in a secret store and exposes the
//! ID token's identity claims. The HTTP client and the secret store are
//! injected capabilities, so the library has no global state and no I/O of
//! its own beyond reading the environment descriptor.
//!
//! Session flow:
//! 1. Host constructs `session::AuthSession` (draws the PKCE verifier)
//! 2. `AuthSession::setup()` loads `auth_config.json` and fetches discovery
//! 3. `AuthSession::begin_login()` yields the authorization URL
//! 4. `AuthSession::complete_login()` exchanges the code via `token::exchange_code()`
//!    and stores the bundle via `credentials::CredentialStore::save()`
//! 5. `AuthSession::claims()` decodes the stored ID token
//! 6. `AuthSession::logout()` removes the session's keys

pub mod claims;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod discovery;
pub mod error;
pub mod pkce;
pub mod secret_store;
pub mod session;
pub mod token;

#[cfg(test)]
mod test_support;

pub use claims::{ClaimsExtractor, ClaimsValidation, IdentityClaims, decode_id_token};
pub use config::EnvironmentConfig;
pub use constants::*;
pub use credentials::{CredentialBundle, CredentialStore};
pub use discovery::{DiscoveryClient, DiscoveryOptions, ProviderMetadata};
pub use error::{Error, Result};
pub use pkce::{PkceState, compute_challenge, generate_verifier};
pub use secret_store::{FileSecretStore, MemorySecretStore, SecretStore};
pub use session::{AuthSession, AuthorizationRequest, SessionState};
pub use token::{CodeExchange, exchange_code};
