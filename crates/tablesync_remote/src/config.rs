//! Configuration for talking to the remote store.
//!
//! The credential is always passed in explicitly. Helpers exist to read it
//! from an environment variable or a token file, but nothing is read at load
//! time or kept in global state.

use crate::error::{RemoteError, RemoteResult};
use std::fmt;
use std::path::Path;

/// Environment variable read by [`RemoteConfig::from_env`].
pub const TOKEN_ENV_VAR: &str = "TABLESYNC_TOKEN";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// Default API version header value.
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

/// A bearer credential. Its `Debug` output never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Creates a credential, rejecting empty tokens.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Credential`] if the token is blank.
    pub fn new(token: impl Into<String>) -> RemoteResult<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(RemoteError::Credential("token is empty".into()));
        }
        Ok(Self(token))
    }

    /// The `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Configuration for the remote store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// API version header value.
    pub api_version: String,
    /// Bearer credential.
    pub credential: Credential,
    /// Records requested per query page.
    pub page_size: u32,
}

impl RemoteConfig {
    /// Creates a configuration with the given credential.
    pub fn new(credential: Credential) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            credential,
            page_size: 100,
        }
    }

    /// Reads the credential from [`TOKEN_ENV_VAR`].
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Credential`] if the variable is unset or empty.
    pub fn from_env() -> RemoteResult<Self> {
        Self::from_env_var(TOKEN_ENV_VAR)
    }

    /// Reads the credential from the named environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Credential`] if the variable is unset or empty.
    pub fn from_env_var(name: &str) -> RemoteResult<Self> {
        let token = std::env::var(name)
            .map_err(|_| RemoteError::Credential(format!("environment variable {name} is not set")))?;
        Ok(Self::new(Credential::new(token)?))
    }

    /// Reads the credential from a file containing only the token.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Credential`] if the file is unreadable or empty.
    pub fn from_token_file(path: impl AsRef<Path>) -> RemoteResult<Self> {
        let path = path.as_ref();
        let token = std::fs::read_to_string(path).map_err(|e| {
            RemoteError::Credential(format!("cannot read token file {}: {e}", path.display()))
        })?;
        Ok(Self::new(Credential::new(token)?))
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the API version header value.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the query page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_credential_is_rejected() {
        assert!(matches!(Credential::new("   "), Err(RemoteError::Credential(_))));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("secret_abc").unwrap();
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.bearer(), "Bearer secret_abc");
    }

    #[test]
    fn missing_env_var_is_credential_error() {
        let result = RemoteConfig::from_env_var("TABLESYNC_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert!(matches!(result, Err(RemoteError::Credential(_))));
    }

    #[test]
    fn token_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "secret_from_file").unwrap();
        let config = RemoteConfig::from_token_file(file.path()).unwrap();
        assert_eq!(config.credential.bearer(), "Bearer secret_from_file");
    }

    #[test]
    fn missing_token_file_is_credential_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RemoteConfig::from_token_file(dir.path().join("token"));
        assert!(matches!(result, Err(RemoteError::Credential(_))));
    }

    #[test]
    fn config_builder() {
        let config = RemoteConfig::new(Credential::new("t").unwrap())
            .with_base_url("http://localhost:9000/v1/")
            .with_api_version("2025-01-01")
            .with_page_size(25);

        assert_eq!(config.base_url, "http://localhost:9000/v1");
        assert_eq!(config.api_version, "2025-01-01");
        assert_eq!(config.page_size, 25);
    }
}
