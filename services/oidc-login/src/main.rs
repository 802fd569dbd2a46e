//! OIDC login client
//!
//! Composition root for the `oidc-auth` session:
//! 1. Parses the command line (`clap`; CLI > env > defaults)
//! 2. Opens the file-backed secret store
//! 3. Constructs the session (PKCE verifier drawn here)
//! 4. Runs one command: login, status, claims or logout

mod config;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use oidc_auth::{AuthSession, Error as AuthError, FileSecretStore, SessionState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::ReqwestClient;

use crate::config::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        command = ?cli.command(),
        config = %cli.config.display(),
        store = %cli.store.display(),
        timeout_secs = cli.timeout_secs,
        "starting oidc-login"
    );

    let http =
        Arc::new(ReqwestClient::new(cli.setup_timeout()).context("failed to build HTTP client")?);
    let store = Arc::new(
        FileSecretStore::open(cli.store.clone())
            .await
            .with_context(|| format!("failed to open secret store {}", cli.store.display()))?,
    );

    // SecureRandomUnavailable is fatal: its Display carries the user message
    let session =
        AuthSession::new(cli.config.clone(), http, store)?.with_setup_timeout(cli.setup_timeout());

    match cli.command() {
        Command::Login => login(&session).await,
        Command::Status => status(&session).await,
        Command::Claims => claims(&session).await,
        Command::Logout => {
            session.logout().await?;
            println!("logged out");
            Ok(())
        }
    }
}

async fn setup(session: &AuthSession) -> Result<()> {
    match session.setup().await {
        Ok(()) => Ok(()),
        Err(e @ AuthError::ConfigMissing(_)) => bail!(e),
        Err(e) => Err(e).context("identity provider unavailable, try again later"),
    }
}

async fn login(session: &AuthSession) -> Result<()> {
    setup(session).await?;
    let request = session.begin_login().await?;

    println!("Open this URL in a browser and sign in:\n\n  {}\n", request.url);
    println!("Paste the full redirect URL here:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read authorization response")?;

    let (code, state) = parse_authorization_response(line.trim())?;
    session
        .complete_login(&code, &state)
        .await
        .context("login failed")?;

    let claims = session.claims().await?;
    if let Err(e) = session.validate_claims(&claims).await {
        warn!(error = %e, "id token failed validation, discarding session");
        session.logout().await?;
        bail!(e);
    }
    println!("signed in as {} <{}>", claims.preferred_username, claims.email);
    Ok(())
}

async fn status(session: &AuthSession) -> Result<()> {
    if let Err(e) = setup(session).await {
        warn!(error = %e, "setup failed");
        if !session.is_authorized().await {
            return Err(e);
        }
    }
    let label = match session.state().await {
        SessionState::Authenticated => "authenticated",
        SessionState::Unauthenticated => "not signed in",
        SessionState::ConfigLoaded => "provider unreachable (credential stored)",
        SessionState::Uninitialized => "environment not configured",
    };
    println!("{label}");
    Ok(())
}

async fn claims(session: &AuthSession) -> Result<()> {
    match session.claims().await {
        Ok(claims) => {
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(())
        }
        Err(e) if e.forces_logout() => {
            warn!(error = %e, "stored session is corrupt, forcing logout");
            session.logout().await?;
            bail!("stored session was corrupt and has been cleared, please log in again");
        }
        Err(AuthError::MissingCredential) => bail!("not signed in, run `oidc-login login`"),
        Err(e) => Err(e.into()),
    }
}

/// Pull `code` and `state` out of the pasted redirect URL.
///
/// Both are required: a bare code carries no `state` to bind it to this login.
fn parse_authorization_response(input: &str) -> Result<(String, String)> {
    if input.is_empty() {
        bail!("no redirect URL entered");
    }
    let url = url::Url::parse(input)
        .context("expected the full redirect URL, including its state parameter")?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };
    if let Some(error) = param("error") {
        bail!("provider returned error: {error}");
    }
    let code = param("code").context("redirect URL has no code parameter")?;
    let state = param("state").context("redirect URL has no state parameter")?;
    Ok((code, state))
}
