//! Fixed identifiers and defaults for the OIDC client
//!
//! None of these are secrets. Secret values (tokens, the PKCE verifier) only
//! ever live in the secret store or behind `common::Secret`.

use std::time::Duration;

/// Secret-store key holding the JSON-serialized `CredentialBundle`.
/// Presence of this key is the sole "is authenticated" signal.
pub const ACCESS_CODE_KEY: &str = "access_code";

/// Every secret-store key owned by a session. Logout removes exactly these.
pub const SESSION_KEYS: &[&str] = &[ACCESS_CODE_KEY];

/// File name of the bundled environment descriptor.
pub const CONFIG_FILE_NAME: &str = "auth_config.json";

/// Scopes requested when the descriptor does not name any.
pub const DEFAULT_SCOPES: &str = "openid profile email";

/// Random bytes drawn for each PKCE code verifier (88 characters once encoded).
pub const VERIFIER_ENTROPY_BYTES: usize = 64;

/// Caller-side deadline for the discovery fetch during setup.
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a discovery document body.
pub const MAX_DISCOVERY_RESPONSE_SIZE: usize = 1024 * 1024;

/// Tolerated clock skew when checking `exp` during claim validation.
pub const CLOCK_SKEW_LEEWAY_SECS: i64 = 60;
