//! Export list of synced images with their resolved tag and digest

use crate::error::{Result, SyncError};
use crate::image::ImageInfo;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    /// `Name:version-release`
    pub imagename: String,
    pub digest: String,
}

impl ExportEntry {
    pub fn from_info(info: &ImageInfo) -> Result<Self> {
        Ok(Self {
            imagename: info.source_reference()?,
            digest: info.digest.clone(),
        })
    }
}

/// Same shape as the `container_images` list of a sync config, so an export
/// can be fed back in to pin a later sync to these exact versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportList {
    pub container_images: Vec<ExportEntry>,
}

impl ExportList {
    pub fn new(container_images: Vec<ExportEntry>) -> Self {
        Self { container_images }
    }

    pub fn len(&self) -> usize {
        self.container_images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.container_images.is_empty()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Io(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, self.to_yaml()?).map_err(|e| {
            SyncError::Io(format!("Failed to write export list {}: {}", path.display(), e))
        })
    }
}
