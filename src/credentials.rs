//! Credential types for the bootstrap procedure.
//!
//! Secrets are held in `SecretString` so that `Debug` output, tracing fields
//! and error messages can never carry them. The only ways out are the git
//! credential callback and the standard input of `docker login`.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Source-control personal access token
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Container registry username and password
#[derive(Clone)]
pub struct RegistryCredentials {
    pub username: String,
    password: SecretString,
}

impl RegistryCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Password as a stdin payload; callers never see it as a `&str`
    pub fn password(&self) -> SecretString {
        self.password.clone()
    }
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
