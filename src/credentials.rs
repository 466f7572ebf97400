use crate::error_utils::{parse_yaml_with_context, serialize_to_yaml_with_context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const PLACEHOLDER_AUTH_TOKEN: &str = "YOUR_AUTH_TOKEN_HERE";
pub const PLACEHOLDER_CT0: &str = "YOUR_CT0_TOKEN_HERE";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Created credentials template at {path}. Please fill in your Twitter authentication tokens (auth_token and ct0) and run again")]
    TemplateCreated { path: PathBuf },

    #[error("Credentials file {path} still contains placeholder values. Please fill in your Twitter authentication tokens")]
    Placeholder { path: PathBuf },

    #[error("Malformed credentials file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Failed to access credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Session cookies used to authenticate against the Twitter web API
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Value of the `auth_token` session cookie
    pub auth_token: String,

    /// Value of the `ct0` cookie, also sent as the CSRF header
    pub ct0: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_token", &"<redacted>")
            .field("ct0", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    fn placeholder() -> Self {
        Self {
            auth_token: PLACEHOLDER_AUTH_TOKEN.to_string(),
            ct0: PLACEHOLDER_CT0.to_string(),
        }
    }

    fn is_placeholder(&self) -> bool {
        self.auth_token == PLACEHOLDER_AUTH_TOKEN || self.ct0 == PLACEHOLDER_CT0
    }
}

/// Loads credentials from `path`, writing a template there first if the file is missing.
///
/// A freshly written template is reported as [`CredentialsError::TemplateCreated`] so the
/// caller stops before touching the network. An existing file is never rewritten.
pub fn load_or_bootstrap(path: &Path) -> Result<Credentials, CredentialsError> {
    if !path.exists() {
        write_template(path)?;
        info!(
            "Credentials file created at {path}. Fill in auth_token and ct0 from your browser session",
            path = path.display()
        );
        return Err(CredentialsError::TemplateCreated {
            path: path.to_path_buf(),
        });
    }

    load(path)
}

/// Parses an existing credentials file
pub fn load(path: &Path) -> Result<Credentials, CredentialsError> {
    let contents = fs::read_to_string(path).map_err(|source| CredentialsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let credentials: Credentials =
        parse_yaml_with_context(&contents, "credentials").map_err(|e| {
            CredentialsError::Malformed {
                path: path.to_path_buf(),
                message: format!("{e:#}"),
            }
        })?;

    if credentials.auth_token.trim().is_empty() || credentials.ct0.trim().is_empty() {
        return Err(CredentialsError::Malformed {
            path: path.to_path_buf(),
            message: "auth_token and ct0 must not be empty".to_string(),
        });
    }

    if credentials.is_placeholder() {
        return Err(CredentialsError::Placeholder {
            path: path.to_path_buf(),
        });
    }

    debug!("Loaded credentials from {path}", path = path.display());
    Ok(credentials)
}

fn write_template(path: &Path) -> Result<(), CredentialsError> {
    let yaml = serialize_to_yaml_with_context(&Credentials::placeholder(), "credentials template")
        .map_err(|e| CredentialsError::Malformed {
            path: path.to_path_buf(),
            message: format!("{e:#}"),
        })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CredentialsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, yaml).map_err(|source| CredentialsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_creates_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("AUTH.yaml");

        let err = load_or_bootstrap(&path).unwrap_err();
        assert!(matches!(err, CredentialsError::TemplateCreated { .. }));

        let written: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["auth_token"].as_str(), Some(PLACEHOLDER_AUTH_TOKEN));
        assert_eq!(written["ct0"].as_str(), Some(PLACEHOLDER_CT0));
    }

    #[test]
    fn test_template_is_rejected_on_next_run() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("AUTH.yaml");

        let _ = load_or_bootstrap(&path);
        let err = load_or_bootstrap(&path).unwrap_err();
        assert!(matches!(err, CredentialsError::Placeholder { .. }));
    }

    #[test]
    fn test_load_valid_credentials() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("AUTH.yaml");
        fs::write(&path, "auth_token: abc123\nct0: def456\n").unwrap();

        let credentials = load_or_bootstrap(&path).unwrap();
        assert_eq!(
            credentials,
            Credentials {
                auth_token: "abc123".to_string(),
                ct0: "def456".to_string(),
            }
        );
    }

    #[test]
    fn test_debug_output_hides_tokens() {
        let credentials = Credentials {
            auth_token: "abc123".to_string(),
            ct0: "def456".to_string(),
        };

        let debug = format!("{credentials:?}");
        assert!(debug.contains("auth_token"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("abc123"));
        assert!(!debug.contains("def456"));
    }

    #[test]
    fn test_existing_file_is_not_rewritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("AUTH.yaml");
        let contents = "# my tokens\nauth_token: abc123\nct0: def456\n";
        fs::write(&path, contents).unwrap();

        load_or_bootstrap(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn test_missing_key_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("AUTH.yaml");
        fs::write(&path, "auth_token: abc123\n").unwrap();

        let err = load_or_bootstrap(&path).unwrap_err();
        match err {
            CredentialsError::Malformed { message, .. } => assert!(message.contains("ct0")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_yaml_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("AUTH.yaml");
        fs::write(&path, "auth_token: [abc\n").unwrap();

        let err = load_or_bootstrap(&path).unwrap_err();
        assert!(matches!(err, CredentialsError::Malformed { .. }));
    }

    #[test]
    fn test_empty_token_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("AUTH.yaml");
        fs::write(&path, "auth_token: ''\nct0: def456\n").unwrap();

        let err = load_or_bootstrap(&path).unwrap_err();
        assert!(matches!(err, CredentialsError::Malformed { .. }));
    }
}
