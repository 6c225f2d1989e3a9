//! Connection configuration.

use mongowrap_core::error::{StoreError, StoreResult};
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "localhost";
/// MongoDB's default port.
pub const DEFAULT_PORT: u16 = 27017;
pub const DEFAULT_DB_NAME: &str = "test";

/// A username/password pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Configuration for a document store client.
///
/// Unset or empty values fall back to the defaults when read through the
/// accessor methods. Keys deserialize from camelCase (`dbName`,
/// `unauthenticatedUser`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_name: Option<String>,
    /// Username for authenticating the connection itself.
    pub username: Option<String>,
    /// Password for authenticating the connection itself.
    pub password: Option<String>,
    /// Account created on first connect to allow unauthenticated API
    /// access. Required.
    pub unauthenticated_user: Option<Credentials>,
}

impl StoreConfig {
    /// Shorthand for a default configuration with the required
    /// unauthenticated user set.
    pub fn with_unauthenticated_user(username: &str, password: &str) -> Self {
        Self {
            unauthenticated_user: Some(Credentials::new(username, password)),
            ..Self::default()
        }
    }

    pub fn host(&self) -> &str {
        non_empty(self.host.as_deref()).unwrap_or(DEFAULT_HOST)
    }

    /// Port zero is treated as unset.
    pub fn port(&self) -> u16 {
        self.port.filter(|&port| port != 0).unwrap_or(DEFAULT_PORT)
    }

    pub fn db_name(&self) -> &str {
        non_empty(self.db_name.as_deref()).unwrap_or(DEFAULT_DB_NAME)
    }

    /// Build `mongodb://[username:password@]host:port/dbname`.
    ///
    /// Credentials are included only when both are set and non-empty.
    /// They are inserted verbatim; reserved characters must already be
    /// percent-encoded.
    pub fn connection_uri(&self) -> String {
        let mut uri = String::from("mongodb://");
        if let (Some(username), Some(password)) = (
            non_empty(self.username.as_deref()),
            non_empty(self.password.as_deref()),
        ) {
            uri.push_str(username);
            uri.push(':');
            uri.push_str(password);
            uri.push('@');
        }
        uri.push_str(&format!("{}:{}/{}", self.host(), self.port(), self.db_name()));
        uri
    }

    /// Check the unauthenticated user is fully specified and return it.
    pub fn unauthenticated_user(&self) -> StoreResult<&Credentials> {
        let user = self
            .unauthenticated_user
            .as_ref()
            .ok_or_else(|| missing("unauthenticatedUser"))?;
        if user.username.is_empty() {
            return Err(missing("unauthenticatedUser.username"));
        }
        if user.password.is_empty() {
            return Err(missing("unauthenticatedUser.password"));
        }
        Ok(user)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn missing(field: &str) -> StoreError {
    StoreError::Config {
        message: format!("missing {field}"),
    }
}
