//! Authentication session facade
//!
//! Orchestrates config loading, discovery, PKCE, credential storage and
//! claim extraction behind one explicitly constructed object. The host
//! application owns it (there is no global instance) and passes it by
//! reference.
//!
//! State machine:
//! `Uninitialized -> ConfigLoaded -> MetadataReady -> (Authenticated | Unauthenticated)`
//!
//! `setup` holds the session lock for its whole duration, so overlapping
//! calls are serialized instead of racing on the stored config/metadata.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use transport::HttpClient;
use uuid::Uuid;

use crate::claims::{ClaimsExtractor, ClaimsValidation, IdentityClaims};
use crate::config::EnvironmentConfig;
use crate::constants::{CLOCK_SKEW_LEEWAY_SECS, DEFAULT_SETUP_TIMEOUT};
use crate::credentials::CredentialStore;
use crate::discovery::{DiscoveryClient, DiscoveryOptions, ProviderMetadata};
use crate::error::{Error, Result};
use crate::pkce::{AuthorizationParams, PkceState, build_authorization_url};
use crate::secret_store::SecretStore;
use crate::token::{CodeExchange, exchange_code};

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// `setup` has not succeeded in loading the descriptor
    Uninitialized,
    /// Descriptor loaded but discovery has not (yet) succeeded
    ConfigLoaded,
    /// Metadata ready and a credential is stored
    Authenticated,
    /// Metadata ready and no credential is stored
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    ConfigLoaded,
    MetadataReady,
}

#[derive(Debug, Clone)]
struct PendingLogin {
    state: String,
    nonce: String,
}

#[derive(Debug)]
struct SessionInner {
    phase: Phase,
    config: Option<EnvironmentConfig>,
    metadata: Option<ProviderMetadata>,
    pending_login: Option<PendingLogin>,
    /// Nonce of the last completed login, checked by `validate_claims`
    login_nonce: Option<String>,
}

/// Front-channel request for the browser leg of the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub nonce: String,
}

/// The authentication session.
pub struct AuthSession {
    config_path: PathBuf,
    http: Arc<dyn HttpClient>,
    discovery: DiscoveryClient,
    credentials: CredentialStore,
    claims: ClaimsExtractor,
    pkce: PkceState,
    setup_timeout: Duration,
    inner: Mutex<SessionInner>,
}

impl AuthSession {
    /// Construct a session. Draws the PKCE verifier immediately.
    ///
    /// Fails with `SecureRandomUnavailable` if the OS RNG is unusable; the
    /// session must not be used in that case.
    pub fn new(
        config_path: PathBuf,
        http: Arc<dyn HttpClient>,
        secret_store: Arc<dyn SecretStore>,
    ) -> Result<Self> {
        let pkce = PkceState::generate()?;
        let credentials = CredentialStore::new(secret_store);
        Ok(Self {
            config_path,
            discovery: DiscoveryClient::new(http.clone(), DiscoveryOptions::default()),
            http,
            claims: ClaimsExtractor::new(credentials.clone()),
            credentials,
            pkce,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
            inner: Mutex::new(SessionInner {
                phase: Phase::Uninitialized,
                config: None,
                metadata: None,
                pending_login: None,
                login_nonce: None,
            }),
        })
    }

    /// Deadline applied to the discovery fetch inside `setup`.
    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    pub fn with_discovery_options(mut self, options: DiscoveryOptions) -> Self {
        self.discovery = DiscoveryClient::new(self.http.clone(), options);
        self
    }

    /// Load the descriptor and fetch provider metadata.
    ///
    /// Always resolves exactly once: `Ok(())` when metadata is ready,
    /// `ConfigMissing` (no network call made) or `DiscoveryFailed` (including
    /// timeout) otherwise. Safe to call again to refresh metadata.
    pub async fn setup(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let config = match EnvironmentConfig::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.config_path.display(), error = %e, "setup halted");
                inner.phase = Phase::Uninitialized;
                inner.config = None;
                inner.metadata = None;
                return Err(e);
            }
        };
        inner.phase = Phase::ConfigLoaded;
        inner.config = Some(config.clone());
        inner.metadata = None;
        debug!(environment_id = %config.environment_id, "state: ConfigLoaded");

        let fetched = tokio::time::timeout(
            self.setup_timeout,
            self.discovery.fetch_provider_metadata(&config),
        )
        .await
        .map_err(|_| {
            Error::DiscoveryFailed(format!(
                "no response within {}s",
                self.setup_timeout.as_secs_f64()
            ))
        })
        .and_then(|result| result);

        match fetched {
            Ok(metadata) => {
                info!(issuer = %metadata.issuer, "state: MetadataReady");
                inner.metadata = Some(metadata);
                inner.phase = Phase::MetadataReady;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "discovery failed, session stays ConfigLoaded");
                Err(e)
            }
        }
    }

    pub async fn state(&self) -> SessionState {
        let phase = self.inner.lock().await.phase;
        match phase {
            Phase::Uninitialized => SessionState::Uninitialized,
            Phase::ConfigLoaded => SessionState::ConfigLoaded,
            Phase::MetadataReady => {
                if self.credentials.is_authenticated().await {
                    SessionState::Authenticated
                } else {
                    SessionState::Unauthenticated
                }
            }
        }
    }

    /// Whether a credential is stored.
    pub async fn is_authorized(&self) -> bool {
        self.credentials.is_authenticated().await
    }

    /// Claims of the stored ID token (decode only, see `validate_claims`).
    pub async fn claims(&self) -> Result<IdentityClaims> {
        self.claims.extract_claims().await
    }

    /// Forget the stored credential. Idempotent.
    pub async fn logout(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.credentials.delete().await?;
        inner.pending_login = None;
        inner.login_nonce = None;
        info!("logged out");
        Ok(())
    }

    pub async fn provider_metadata(&self) -> Option<ProviderMetadata> {
        self.inner.lock().await.metadata.clone()
    }

    pub fn code_challenge(&self) -> String {
        self.pkce.challenge()
    }

    pub fn credential_store(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Start a login: mint `state`/`nonce` and build the authorization URL.
    ///
    /// Starting again replaces any login still in progress.
    pub async fn begin_login(&self) -> Result<AuthorizationRequest> {
        let mut inner = self.inner.lock().await;
        let (config, metadata) = ready(&inner)?;
        let (client_id, redirect_uri) = client_registration(config)?;

        let state = Uuid::new_v4().simple().to_string();
        let nonce = Uuid::new_v4().simple().to_string();
        let challenge = self.pkce.challenge();
        let url = build_authorization_url(
            &metadata.authorization_endpoint,
            &AuthorizationParams {
                client_id,
                redirect_uri,
                scope: &config.scopes,
                state: &state,
                nonce: &nonce,
                challenge: &challenge,
            },
        )?;

        inner.pending_login = Some(PendingLogin {
            state: state.clone(),
            nonce: nonce.clone(),
        });
        debug!("login started");
        Ok(AuthorizationRequest { url, state, nonce })
    }

    /// Finish a login by exchanging `code` and storing the credential.
    ///
    /// `returned_state` is the `state` echoed on the redirect and must match
    /// the one minted by `begin_login`. A mismatch abandons the login without
    /// contacting the token endpoint.
    pub async fn complete_login(&self, code: &str, returned_state: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let pending = inner
            .pending_login
            .take()
            .ok_or(Error::NotReady("no login in progress"))?;

        if returned_state != pending.state {
            warn!("authorization response state mismatch");
            return Err(Error::TokenExchange("state mismatch".into()));
        }

        let (config, metadata) = ready(&inner)?;
        let (client_id, redirect_uri) = client_registration(config)?;
        let bundle = exchange_code(
            self.http.as_ref(),
            &CodeExchange {
                token_endpoint: &metadata.token_endpoint,
                client_id,
                redirect_uri,
                code,
                verifier: self.pkce.verifier(),
            },
        )
        .await?;

        self.credentials.save(&bundle).await?;
        inner.login_nonce = Some(pending.nonce);
        info!("login completed");
        Ok(())
    }

    /// Check decoded claims against the discovered issuer, the configured
    /// client id, the clock and the nonce of the last login.
    ///
    /// Signature verification is not performed.
    pub async fn validate_claims(&self, claims: &IdentityClaims) -> Result<()> {
        let inner = self.inner.lock().await;
        let (config, metadata) = ready(&inner)?;
        claims.validate(&ClaimsValidation {
            issuer: &metadata.issuer,
            client_id: config.client_id.as_deref(),
            nonce: inner.login_nonce.as_deref(),
            now: unix_now(),
            leeway_secs: CLOCK_SKEW_LEEWAY_SECS,
        })
    }
}

fn ready(inner: &SessionInner) -> Result<(&EnvironmentConfig, &ProviderMetadata)> {
    match (inner.phase, &inner.config, &inner.metadata) {
        (Phase::MetadataReady, Some(config), Some(metadata)) => Ok((config, metadata)),
        _ => Err(Error::NotReady("provider metadata not loaded, run setup first")),
    }
}

fn client_registration(config: &EnvironmentConfig) -> Result<(&str, &str)> {
    let client_id = config
        .client_id
        .as_deref()
        .ok_or_else(|| Error::ConfigMissing("client_id is not set".into()))?;
    let redirect_uri = config
        .redirect_uri
        .as_deref()
        .ok_or_else(|| Error::ConfigMissing("redirect_uri is not set".into()))?;
    Ok((client_id, redirect_uri))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
