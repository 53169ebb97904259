//! Configuration module for loading the sync file and applying overrides

use crate::error::{Result, SyncError};
use crate::registry::{self, AuthFile, Credentials, Endpoint};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "sample-config.yml";
pub const DEFAULT_SKOPEO_PATH: &str = "/bin/skopeo";
pub const DEFAULT_TRANSPORT: &str = "docker://";
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// One image to sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEntry {
    /// Source reference, usually including a tag
    pub imagename: String,
    /// Overrides `destination_registry_namespace` for this image
    #[serde(default)]
    pub destination_namespace: Option<String>,
    /// Overrides the latest-style tags for this image
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl ImageEntry {
    pub fn new(imagename: impl Into<String>) -> Self {
        Self {
            imagename: imagename.into(),
            destination_namespace: None,
            tags: None,
        }
    }
}

/// Sync configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub source_registry_credentials: Option<Credentials>,
    #[serde(default)]
    pub destination_registry_credentials: Option<Credentials>,
    #[serde(default)]
    pub auth_file: Option<PathBuf>,

    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub source_tls_verify: bool,
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub destination_tls_verify: bool,
    #[serde(default = "default_transport")]
    pub source_registry_type: String,
    #[serde(default = "default_transport")]
    pub destination_registry_type: String,

    #[serde(default)]
    pub destination_registry_namespace: String,
    #[serde(default = "default_image_tag")]
    pub destination_image_tag: String,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub rename_old_tag: bool,
    #[serde(default)]
    pub tag_to_rename: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub write_image_export_list: bool,
    #[serde(default)]
    pub image_export_list: Option<PathBuf>,

    #[serde(default = "default_skopeo_path")]
    pub skopeo_path: PathBuf,

    #[serde(default)]
    pub container_images: Vec<ImageEntry>,
}

fn default_true() -> bool {
    true
}

fn default_transport() -> String {
    DEFAULT_TRANSPORT.to_string()
}

fn default_image_tag() -> String {
    DEFAULT_IMAGE_TAG.to_string()
}

fn default_skopeo_path() -> PathBuf {
    PathBuf::from(DEFAULT_SKOPEO_PATH)
}

/// Accepts YAML booleans as well as the quoted `"true"`/`"false"` strings
/// older config files use.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected true or false, found {:?}",
                other
            ))),
        },
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content).map_err(|e| {
            SyncError::Config(format!("Invalid YAML for config file {}: {}", path.display(), e))
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Full check for syncing, covering both registries
    pub fn validate(&self) -> Result<()> {
        self.validate_source()?;
        if self.destination_registry_namespace.trim().is_empty() {
            return Err(SyncError::Validation(
                "destination_registry_namespace cannot be empty".to_string(),
            ));
        }
        if self.destination_image_tag.trim().is_empty() {
            return Err(SyncError::Validation(
                "destination_image_tag cannot be empty".to_string(),
            ));
        }
        if self.rename_old_tag
            && self.tag_to_rename.as_deref().is_none_or(|t| t.trim().is_empty())
        {
            return Err(SyncError::Validation(
                "tag_to_rename is required when rename_old_tag is enabled".to_string(),
            ));
        }
        if self.write_image_export_list && self.image_export_list.is_none() {
            return Err(SyncError::Validation(
                "image_export_list is required when write_image_export_list is enabled"
                    .to_string(),
            ));
        }
        if let Some(creds) = &self.destination_registry_credentials {
            creds.validate()?;
        }
        Ok(())
    }

    /// Checks needed to read from the source registry only, as `dump` does
    pub fn validate_source(&self) -> Result<()> {
        for (i, entry) in self.container_images.iter().enumerate() {
            if entry.imagename.trim().is_empty() {
                return Err(SyncError::Validation(format!(
                    "container_images[{}] has an empty imagename",
                    i
                )));
            }
            if let Some(tags) = &entry.tags {
                if tags.is_empty() {
                    return Err(SyncError::Validation(format!(
                        "container_images[{}] needs at least one tag in tags",
                        i
                    )));
                }
                if tags.iter().any(|t| t.trim().is_empty()) {
                    return Err(SyncError::Validation(format!(
                        "container_images[{}] has an empty tag",
                        i
                    )));
                }
            }
        }
        if let Some(creds) = &self.source_registry_credentials {
            creds.validate()?;
        }
        Ok(())
    }

    /// Override settings from `REGISTRY_SYNC_*` environment variables
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(user) = lookup("REGISTRY_SYNC_SOURCE_USER") {
            let token = lookup("REGISTRY_SYNC_SOURCE_TOKEN").unwrap_or_default();
            self.source_registry_credentials = Some(Credentials::new(user, token));
        }
        if let Some(user) = lookup("REGISTRY_SYNC_DEST_USER") {
            let token = lookup("REGISTRY_SYNC_DEST_TOKEN").unwrap_or_default();
            self.destination_registry_credentials = Some(Credentials::new(user, token));
        }
        if let Some(path) = lookup("REGISTRY_SYNC_SKOPEO") {
            self.skopeo_path = PathBuf::from(path);
        }
        self
    }

    /// Fill missing credentials from `auth_file`, keyed by registry host
    pub fn resolve_credentials(mut self) -> Result<Self> {
        let Some(path) = self.auth_file.clone() else {
            return Ok(self);
        };
        let auth_file = AuthFile::load(&path)?;

        if self.source_registry_credentials.is_none() {
            if let Some(first) = self.container_images.first() {
                let host = registry::registry_host(&first.imagename);
                self.source_registry_credentials = auth_file.lookup(&host)?;
            }
        }
        if self.destination_registry_credentials.is_none() {
            let host = self.destination_host();
            self.destination_registry_credentials = auth_file.lookup(&host)?;
        }
        Ok(self)
    }

    pub fn destination_host(&self) -> String {
        // A namespace may be just a host, so give it a name to split off
        registry::registry_host(&registry::join_namespace(
            &self.destination_registry_namespace,
            "image",
        ))
    }

    pub fn source_endpoint(&self) -> Endpoint {
        Endpoint::new(&self.source_registry_type, self.source_tls_verify)
            .with_credentials(self.source_registry_credentials.clone())
    }

    pub fn destination_endpoint(&self) -> Endpoint {
        Endpoint::new(&self.destination_registry_type, self.destination_tls_verify)
            .with_credentials(self.destination_registry_credentials.clone())
    }

    /// Namespace used for an entry
    pub fn namespace_for<'a>(&'a self, entry: &'a ImageEntry) -> &'a str {
        entry
            .destination_namespace
            .as_deref()
            .unwrap_or(&self.destination_registry_namespace)
    }

    /// Latest-style tags applied to an entry
    pub fn tags_for(&self, entry: &ImageEntry) -> Vec<String> {
        match &entry.tags {
            Some(tags) => tags.clone(),
            None => vec![self.destination_image_tag.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
source_registry_credentials:
  user: "1234|svc-account"
  token: "abc"
source_tls_verify: "true"
source_registry_type: "docker://"
destination_tls_verify: "false"
destination_registry_type: "docker://"
destination_registry_namespace: "registry.example.com/"
destination_image_tag: "latest"
rename_old_tag: "false"
tag_to_rename: "previous"
write_image_export_list: true
image_export_list: "export.yml"
container_images:
  - imagename: registry.access.redhat.com/rhosp13/openstack-aodh-api:latest
  - imagename: registry.access.redhat.com/rhosp13/openstack-nova-api:13.0
    destination_namespace: "mirror.example.com/"
    tags: ["latest", "stable"]
"#;

    #[test]
    fn test_parse_sample() {
        let config = SyncConfig::parse(SAMPLE).unwrap();
        assert!(config.source_tls_verify);
        assert!(!config.destination_tls_verify);
        assert!(!config.rename_old_tag);
        assert!(config.write_image_export_list);
        assert_eq!(config.skopeo_path, PathBuf::from(DEFAULT_SKOPEO_PATH));
        assert_eq!(config.container_images.len(), 2);
        assert!(config.validate().is_ok());

        let second = &config.container_images[1];
        assert_eq!(config.namespace_for(second), "mirror.example.com/");
        assert_eq!(config.tags_for(second), vec!["latest", "stable"]);
        let first = &config.container_images[0];
        assert_eq!(config.namespace_for(first), "registry.example.com/");
        assert_eq!(config.tags_for(first), vec!["latest"]);
    }

    #[test]
    fn test_defaults() {
        let config =
            SyncConfig::parse("destination_registry_namespace: reg.local/\n").unwrap();
        assert!(config.source_tls_verify);
        assert_eq!(config.source_registry_type, "docker://");
        assert_eq!(config.destination_image_tag, "latest");
        assert!(config.container_images.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_flag() {
        let result = SyncConfig::parse(
            "destination_registry_namespace: reg.local/\nsource_tls_verify: maybe\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_failures() {
        let base = SyncConfig::parse(SAMPLE).unwrap();

        let mut config = base.clone();
        config.destination_registry_namespace = String::new();
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.rename_old_tag = true;
        config.tag_to_rename = None;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.image_export_list = None;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.container_images.push(ImageEntry::new(" "));
        assert!(config.validate().is_err());

        let mut config = base;
        config.source_registry_credentials = Some(Credentials::new("", "x"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_tag_list_rejected() {
        let mut config = SyncConfig::parse(SAMPLE).unwrap();
        config.container_images[1].tags = Some(Vec::new());
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(err.to_string().contains("container_images[1]"));
        assert!(config.validate_source().is_err());
    }

    #[test]
    fn test_source_only_config() {
        let config = SyncConfig::parse(
            "container_images:\n  - imagename: quay.io/org/app:latest\n",
        )
        .unwrap();
        assert!(config.validate_source().is_ok());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("REGISTRY_SYNC_DEST_USER", "pusher"),
            ("REGISTRY_SYNC_DEST_TOKEN", "t0k3n"),
            ("REGISTRY_SYNC_SKOPEO", "/usr/local/bin/skopeo"),
        ]
        .into_iter()
        .collect();

        let config = SyncConfig::parse(SAMPLE)
            .unwrap()
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(
            config.destination_registry_credentials,
            Some(Credentials::new("pusher", "t0k3n"))
        );
        assert_eq!(
            config.source_registry_credentials.as_ref().map(|c| c.user.as_str()),
            Some("1234|svc-account")
        );
        assert_eq!(config.skopeo_path, PathBuf::from("/usr/local/bin/skopeo"));
    }

    #[test]
    fn test_destination_host() {
        let mut config = SyncConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.destination_host(), "registry.example.com");
        config.destination_registry_namespace = "registry.example.com".to_string();
        assert_eq!(config.destination_host(), "registry.example.com");
    }

    #[test]
    fn test_load_missing_file() {
        let err = SyncConfig::load(Path::new("/nonexistent/sync.yml")).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/sync.yml"));
    }
}
