//! AWS credentials from the TOML secret store, falling back to the environment.
//!
//! The secrets file uses the same keys as the environment variables, in
//! lowercase:
//!
//! ```toml
//! aws_access_key_id = "AKIA..."
//! aws_secret_access_key = "..."
//! # aws_session_token = "..."
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error(
        "credentials not configured: create {path} with aws_access_key_id and \
         aws_secret_access_key, or set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY"
    )]
    Missing { path: PathBuf },
    #[error("failed to read secrets file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid secrets file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Static access key pair, optionally with a session token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    #[serde(default)]
    pub aws_session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &"<redacted>")
            .field(
                "aws_session_token",
                &self.aws_session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            aws_access_key_id: access_key_id.into(),
            aws_secret_access_key: secret_access_key.into(),
            aws_session_token: None,
        }
    }

    /// Load from the secrets file, then from `AWS_*` environment variables.
    ///
    /// Absence of both is [`CredentialsError::Missing`].
    pub fn load(secrets_path: &Path) -> Result<Self, CredentialsError> {
        Self::load_with(secrets_path, |key| std::env::var(key).ok())
    }

    fn load_with(
        secrets_path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CredentialsError> {
        if let Some(creds) = Self::from_secrets_file(secrets_path)? {
            tracing::info!(path = %secrets_path.display(), "credentials loaded from secrets file");
            return Ok(creds);
        }
        if let Some(creds) = Self::from_lookup(lookup) {
            tracing::info!("credentials loaded from environment");
            return Ok(creds);
        }
        Err(CredentialsError::Missing {
            path: secrets_path.to_path_buf(),
        })
    }

    /// Parse the secrets file. A missing file, or one with blank keys, yields `None`.
    pub fn from_secrets_file(path: &Path) -> Result<Option<Self>, CredentialsError> {
        if !path.exists() {
            return Ok(None);
        }
        let src = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let creds: Credentials = toml::from_str(&src).map_err(|source| CredentialsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(creds.non_blank())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        Self {
            aws_access_key_id: lookup(ENV_ACCESS_KEY_ID)?,
            aws_secret_access_key: lookup(ENV_SECRET_ACCESS_KEY)?,
            aws_session_token: lookup(ENV_SESSION_TOKEN),
        }
        .non_blank()
    }

    fn non_blank(mut self) -> Option<Self> {
        if self.aws_access_key_id.trim().is_empty() || self.aws_secret_access_key.trim().is_empty() {
            return None;
        }
        if self.aws_session_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            self.aws_session_token = None;
        }
        Some(self)
    }
}
