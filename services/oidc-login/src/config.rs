//! Command-line settings
//!
//! Precedence for every setting: CLI flag > env var > default.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use oidc_auth::{CONFIG_FILE_NAME, DEFAULT_SETUP_TIMEOUT};

/// Default secret store file, relative to the working directory.
pub const DEFAULT_STORE_FILE: &str = "secrets.json";

#[derive(Debug, Parser)]
#[command(name = "oidc-login")]
#[command(about = "Sign in to an OpenID Connect provider with authorization code + PKCE")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Environment descriptor (discovery URI template, client registration)
    #[arg(long, global = true, env = "AUTH_CONFIG_PATH", default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// JSON file holding the stored credential
    #[arg(long, global = true, env = "SECRET_STORE_PATH", default_value = DEFAULT_STORE_FILE)]
    pub store: PathBuf,

    /// Seconds to wait for provider discovery
    #[arg(
        long = "timeout",
        global = true,
        env = "SETUP_TIMEOUT_SECS",
        default_value_t = DEFAULT_SETUP_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,
}

/// What the binary was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the authorization code flow interactively
    Login,
    /// Report session state (default)
    Status,
    /// Print the identity claims of the stored ID token
    Claims,
    /// Remove the stored credential
    Logout,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Status)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
