//! Environment descriptor loading
//!
//! The descriptor (`auth_config.json`) ships alongside the application and
//! names the provider's discovery URI template plus the environment (tenant)
//! id substituted into it. Any problem reading it maps to `ConfigMissing`,
//! which callers treat as a fatal setup precondition.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::DEFAULT_SCOPES;
use crate::error::{Error, Result};

/// Placeholder forms accepted in `discovery_uri`.
const PLACEHOLDERS: [&str; 2] = ["{}", "%@"];

/// Static environment descriptor. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvironmentConfig {
    /// Discovery URI with exactly one `{}` or `%@` placeholder
    #[serde(rename = "discovery_uri")]
    pub discovery_uri_template: String,
    pub environment_id: String,
    /// Public client id registered with the provider (needed for login)
    #[serde(default)]
    pub client_id: Option<String>,
    /// Redirect URI registered with the provider (needed for login)
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: String,
}

fn default_scopes() -> String {
    DEFAULT_SCOPES.to_owned()
}

impl EnvironmentConfig {
    /// Read and validate the descriptor at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "environment descriptor unreadable");
            Error::ConfigMissing(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_json(&contents)?;
        debug!(
            path = %path.display(),
            environment_id = %config.environment_id,
            "loaded environment descriptor"
        );
        Ok(config)
    }

    /// Parse and validate a descriptor from JSON text.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: EnvironmentConfig = serde_json::from_str(contents)
            .map_err(|e| Error::ConfigMissing(format!("invalid descriptor: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let placeholders: usize = PLACEHOLDERS
            .iter()
            .map(|p| self.discovery_uri_template.matches(p).count())
            .sum();
        if placeholders != 1 {
            return Err(Error::ConfigMissing(format!(
                "discovery_uri must contain exactly one {{}} or %@ placeholder, found {placeholders}"
            )));
        }

        if self.environment_id.trim().is_empty() {
            return Err(Error::ConfigMissing("environment_id is empty".into()));
        }

        Ok(())
    }

    /// Discovery URL with the environment id substituted.
    pub fn discovery_url(&self) -> String {
        PLACEHOLDERS
            .iter()
            .copied()
            .find(|p| self.discovery_uri_template.contains(p))
            .map(|p| {
                self.discovery_uri_template
                    .replacen(p, &self.environment_id, 1)
            })
            .unwrap_or_else(|| self.discovery_uri_template.clone())
    }
}
