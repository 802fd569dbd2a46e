//! Credential persistence for the current session
//!
//! Exactly one `CredentialBundle` exists at a time, stored as JSON under the
//! fixed `access_code` key. Presence of that key is the sole source of truth
//! for "is the user authenticated"; expiry and structure are not consulted.

use std::sync::Arc;

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{ACCESS_CODE_KEY, SESSION_KEYS};
use crate::error::{Error, Result};
use crate::secret_store::SecretStore;

/// Token bundle returned by the token endpoint.
///
/// `expires_in` is the provider's delta in seconds, stored as received.
/// Token values are held in `Secret`, so `Debug` output stays redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub access_token: Secret<String>,
    /// JWT-encoded ID token
    pub id_token: Secret<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Secret<String>>,
    pub token_type: String,
    pub expires_in: u64,
}

/// Session credential manager over an injected secret store.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn SecretStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Serialize and store `bundle`, replacing any previous session.
    pub async fn save(&self, bundle: &CredentialBundle) -> Result<()> {
        let json = serde_json::to_string(bundle)
            .map_err(|e| Error::SecretStore(format!("serializing credential: {e}")))?;
        self.store.set(ACCESS_CODE_KEY, json).await?;
        debug!(token_type = %bundle.token_type, "saved credential");
        Ok(())
    }

    /// Read the stored bundle.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored value no longer
    /// decodes; only backend failures are errors.
    pub async fn load(&self) -> Result<Option<CredentialBundle>> {
        let Some(raw) = self.store.get(ACCESS_CODE_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(bundle) => Ok(Some(bundle)),
            Err(e) => {
                warn!(error = %e, "stored credential is undecodable, treating as no session");
                Ok(None)
            }
        }
    }

    /// Remove every key this session owns. Idempotent.
    pub async fn delete(&self) -> Result<()> {
        for key in SESSION_KEYS {
            self.store.remove(key).await?;
        }
        debug!("deleted session credentials");
        Ok(())
    }

    /// Whether a credential is present (existence check only).
    ///
    /// Backend failures are logged and reported as unauthenticated.
    pub async fn is_authenticated(&self) -> bool {
        match self.store.get(ACCESS_CODE_KEY).await {
            Ok(value) => value.is_some(),
            Err(e) => {
                warn!(error = %e, "secret store unavailable, reporting unauthenticated");
                false
            }
        }
    }
}
