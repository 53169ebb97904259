//! Parsed `inspect` output

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Subset of the tool's `inspect` document the sync relies on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageInfo {
    /// Repository without tag, e.g. `registry.access.redhat.com/rhosp13/openstack-nova-api`
    pub name: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub repo_tags: Vec<String>,
    // Images built without labels report `null`
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub labels: HashMap<String, String>,
}

fn deserialize_labels<'de, D>(
    deserializer: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ImageInfo {
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let info: ImageInfo = serde_json::from_slice(json)
            .map_err(|e| SyncError::Parse(format!("Invalid inspect output: {}", e)))?;
        if info.name.is_empty() {
            return Err(SyncError::Image("inspect output has no Name".to_string()));
        }
        Ok(info)
    }

    pub fn label(&self, key: &str) -> Result<&str> {
        self.labels
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                SyncError::Image(format!("{} has no '{}' label", self.name, key))
            })
    }

    /// Repository path the image publishes itself under, e.g. `rhosp13/openstack-nova-api`
    pub fn label_name(&self) -> Result<&str> {
        self.label("name")
    }

    /// `<version>-<release>` tag
    pub fn version_release(&self) -> Result<String> {
        Ok(format!("{}-{}", self.label("version")?, self.label("release")?))
    }

    /// Immutable source reference, `Name:version-release`
    pub fn source_reference(&self) -> Result<String> {
        Ok(format!("{}:{}", self.name, self.version_release()?))
    }
}
