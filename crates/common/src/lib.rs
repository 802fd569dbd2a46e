//! Shared types for the OIDC client workspace

mod secret;

pub use secret::Secret;
