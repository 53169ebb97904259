//! Registry credentials and docker-style auth file lookup

use crate::error::{Result, SyncError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// User/token pair handed to the copy tool
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    #[serde(default)]
    pub token: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }

    /// `user:token`, the form skopeo expects for `--creds`
    pub fn to_arg(&self) -> String {
        format!("{}:{}", self.user, self.token)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user.is_empty() {
            return Err(SyncError::Validation(
                "Credentials user cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Decode a docker `auth` entry (base64 of `user:token`)
    pub fn from_basic_auth(encoded: &str) -> Result<Self> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SyncError::Parse(format!("Invalid base64 auth entry: {}", e)))?;
        let decoded = String::from_utf8(decoded)?;
        let (user, token) = decoded.split_once(':').ok_or_else(|| {
            SyncError::Parse("Auth entry is not of the form user:token".to_string())
        })?;
        Ok(Self::new(user, token))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct AuthEntry {
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// Parsed `config.json` / `auth.json` as written by `docker login` or `skopeo login`
#[derive(Debug, Default, Deserialize)]
pub struct AuthFile {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

impl AuthFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Cannot read auth file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Find credentials for a registry host.
    ///
    /// Keys may carry a scheme or path (`https://index.docker.io/v1/`), so
    /// both sides are reduced to the bare host before comparing.
    pub fn lookup(&self, host: &str) -> Result<Option<Credentials>> {
        let wanted = normalize_key(host);
        let entry = self
            .auths
            .iter()
            .find(|(key, _)| normalize_key(key) == wanted)
            .map(|(_, entry)| entry);

        let Some(entry) = entry else {
            return Ok(None);
        };

        if let Some(auth) = &entry.auth {
            return Credentials::from_basic_auth(auth).map(Some);
        }
        match (&entry.username, &entry.password) {
            (Some(user), Some(password)) => Ok(Some(Credentials::new(user, password))),
            _ => Ok(None),
        }
    }
}

fn normalize_key(key: &str) -> String {
    let key = key
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = key.split('/').next().unwrap_or(key);
    match host {
        "index.docker.io" | "registry-1.docker.io" => "docker.io".to_string(),
        other => other.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTH_JSON: &str = r#"{
        "auths": {
            "https://index.docker.io/v1/": { "auth": "ZG9ja2VydXNlcjpzM2NyM3Q=" },
            "quay.io": { "auth": "cXVheXVzZXI6dG9rZW46d2l0aDpjb2xvbnM=" },
            "registry.local:5000": { "username": "admin", "password": "pw" }
        }
    }"#;

    #[test]
    fn test_credentials_arg_and_debug() {
        let creds = Credentials::new("user", "secret");
        assert_eq!(creds.to_arg(), "user:secret");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_lookup_basic_auth() {
        let file = AuthFile::parse(AUTH_JSON).unwrap();
        let creds = file.lookup("docker.io").unwrap().unwrap();
        assert_eq!(creds, Credentials::new("dockeruser", "s3cr3t"));
    }

    #[test]
    fn test_lookup_token_with_colons() {
        let file = AuthFile::parse(AUTH_JSON).unwrap();
        let creds = file.lookup("quay.io").unwrap().unwrap();
        assert_eq!(creds.user, "quayuser");
        assert_eq!(creds.token, "token:with:colons");
    }

    #[test]
    fn test_lookup_username_password_and_missing() {
        let file = AuthFile::parse(AUTH_JSON).unwrap();
        let creds = file.lookup("registry.local:5000").unwrap().unwrap();
        assert_eq!(creds, Credentials::new("admin", "pw"));
        assert!(file.lookup("ghcr.io").unwrap().is_none());
    }

    #[test]
    fn test_invalid_auth_entry() {
        assert!(Credentials::from_basic_auth("not base64!").is_err());
        // "nocolon"
        assert!(Credentials::from_basic_auth("bm9jb2xvbg==").is_err());
    }
}
