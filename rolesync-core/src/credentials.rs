//! Connection settings for the GitLab API.
//!
//! The operator picks where the URL and token come from through
//! [`ConnectionSource`]:
//!
//! ```ignore
//! use rolesync_core::ConnectionSource;
//!
//! // URL and token file given directly
//! let source = ConnectionSource::Explicit {
//!     url: "https://gitlab.example.com".to_string(),
//!     token_file: "/vagrant/tmp/gitlab-root-personal-access-token.txt".into(),
//!     ca_bundle: Some("/vagrant/tmp/gitlab.example.com-crt.pem".into()),
//! };
//!
//! // `[gitlab]` section of a config file
//! let source = ConnectionSource::ConfigFile { path: "rolesync.toml".into() };
//!
//! let settings = source.resolve()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::{Error, Result};

/// A GitLab personal access token that prevents accidental logging.
///
/// The token is wrapped in `SecretString` which:
/// - Implements `Debug` as `"[REDACTED]"`
/// - Zeroizes memory on drop
/// - Requires explicit `.expose_secret()` to access the value
///
/// Serializing a token writes `"[REDACTED]"`, so printing a config never
/// leaks it.
#[derive(Clone)]
pub struct PrivateToken(SecretString);

impl PrivateToken {
    /// Create a new token from a string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Expose the secret token value.
    ///
    /// Use sparingly - only when actually sending to the API.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for PrivateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateToken([REDACTED])")
    }
}

impl From<&str> for PrivateToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for PrivateToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for PrivateToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// The `[gitlab]` section of a rolesync config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitLabSection {
    /// Base URL of the GitLab instance
    pub url: Option<String>,

    /// Token given inline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_token: Option<PrivateToken>,

    /// File holding the token
    pub token_file: Option<PathBuf>,

    /// PEM bundle of extra trusted root certificates
    pub ca_bundle: Option<PathBuf>,
}

impl GitLabSection {
    /// Combine two sections; fields set in `overlay` replace those in `self`.
    pub fn merged_with(self, overlay: GitLabSection) -> Self {
        Self {
            url: overlay.url.or(self.url),
            private_token: overlay.private_token.or(self.private_token),
            token_file: overlay.token_file.or(self.token_file),
            ca_bundle: overlay.ca_bundle.or(self.ca_bundle),
        }
    }

    /// Turn the section into connection settings.
    ///
    /// Relative `token_file` and `ca_bundle` paths are taken relative to
    /// `base_dir` when given. An inline `private_token` wins over
    /// `token_file`.
    pub fn resolve(&self, base_dir: Option<&Path>) -> Result<ConnectionSettings> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("gitlab.url is not set".to_string()))?;

        let token = match (&self.private_token, &self.token_file) {
            (Some(token), _) => token.clone(),
            (None, Some(file)) => read_token_file(&relative_to(base_dir, file))?,
            (None, None) => {
                return Err(Error::Config(
                    "no GitLab token configured: set gitlab.private_token or gitlab.token_file"
                        .to_string(),
                ));
            }
        };

        let ca_bundle_pem = self
            .ca_bundle
            .as_ref()
            .map(|path| read_ca_bundle(&relative_to(base_dir, path)))
            .transpose()?;

        ConnectionSettings::new(url, token, ca_bundle_pem)
    }
}

fn relative_to(base_dir: Option<&Path>, path: &Path) -> PathBuf {
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

/// Where the GitLab URL and credentials come from.
#[derive(Debug, Clone)]
pub enum ConnectionSource {
    /// URL, token file and trust bundle given directly.
    Explicit {
        url: String,
        token_file: PathBuf,
        ca_bundle: Option<PathBuf>,
    },
    /// The `[gitlab]` section of a config file on disk.
    ConfigFile { path: PathBuf },
    /// A `[gitlab]` section that was already loaded (and possibly merged
    /// from several config layers).
    Section(GitLabSection),
}

#[derive(Deserialize)]
struct ConfigFileContents {
    #[serde(default)]
    gitlab: GitLabSection,
}

impl ConnectionSource {
    /// Load every referenced file and produce connection settings.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for missing settings and when the token file,
    /// trust bundle or config file cannot be read; the message names the path.
    pub fn resolve(&self) -> Result<ConnectionSettings> {
        match self {
            ConnectionSource::Explicit {
                url,
                token_file,
                ca_bundle,
            } => {
                debug!(%url, "using explicit GitLab credentials");
                let token = read_token_file(token_file)?;
                let ca_bundle_pem = ca_bundle.as_deref().map(read_ca_bundle).transpose()?;
                ConnectionSettings::new(url, token, ca_bundle_pem)
            }
            ConnectionSource::ConfigFile { path } => {
                debug!(path = %path.display(), "reading GitLab credentials from config file");
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read config file {}: {e}", path.display()))
                })?;
                let parsed: ConfigFileContents = toml::from_str(&contents).map_err(|e| {
                    Error::Config(format!("invalid config file {}: {e}", path.display()))
                })?;
                parsed.gitlab.resolve(path.parent())
            }
            ConnectionSource::Section(section) => section.resolve(None),
        }
    }
}

fn read_token_file(path: &Path) -> Result<PrivateToken> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("cannot read token file {}: {e}", path.display()))
    })?;
    let token = contents.trim();
    if token.is_empty() {
        return Err(Error::Config(format!("token file {} is empty", path.display())));
    }
    Ok(PrivateToken::new(token))
}

fn read_ca_bundle(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::Config(format!("cannot read CA bundle {}: {e}", path.display())))
}

/// Everything needed to talk to one GitLab instance.
#[derive(Clone)]
pub struct ConnectionSettings {
    url: String,
    token: PrivateToken,
    ca_bundle_pem: Option<Vec<u8>>,
}

impl ConnectionSettings {
    /// Create settings, validating the URL.
    pub fn new(
        url: impl Into<String>,
        token: PrivateToken,
        ca_bundle_pem: Option<Vec<u8>>,
    ) -> Result<Self> {
        let url = url.into();
        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| Error::Config(format!("invalid GitLab URL {url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "GitLab URL must use http or https: {url}"
            )));
        }
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            token,
            ca_bundle_pem,
        })
    }

    /// Base URL without a trailing slash.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &PrivateToken {
        &self.token
    }

    /// PEM-encoded extra root certificates, if configured.
    pub fn ca_bundle_pem(&self) -> Option<&[u8]> {
        self.ca_bundle_pem.as_deref()
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url)
            .field("token", &self.token)
            .field("ca_bundle", &self.ca_bundle_pem.as_ref().map(Vec::len))
            .finish()
    }
}
