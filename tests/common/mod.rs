//! In-memory stand-in for skopeo shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use registry_sync::image::ImageInfo;
use registry_sync::registry::Endpoint;
use registry_sync::{ImageTool, Result, SyncError};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCall {
    pub source: String,
    pub dest: String,
    pub source_creds: Option<String>,
    pub dest_creds: Option<String>,
}

#[derive(Default)]
pub struct FakeRegistry {
    /// Inspect results keyed by fully located reference
    images: HashMap<String, ImageInfo>,
    /// Destination references that already exist
    existing: Mutex<HashSet<String>>,
    /// Located references whose copy always fails with the given error
    broken: HashMap<String, SyncError>,
    /// Located destination references that fail transiently this many times
    flaky: Mutex<HashMap<String, u32>>,
    pub inspected: Mutex<Vec<String>>,
    pub copies: Mutex<Vec<CopyCall>>,
}

pub fn image(name: &str, label_name: &str, version: &str, release: &str, digest: &str) -> ImageInfo {
    let json = serde_json::json!({
        "Name": name,
        "Digest": digest,
        "Labels": {
            "name": label_name,
            "version": version,
            "release": release,
        }
    });
    ImageInfo::from_json(json.to_string().as_bytes()).unwrap()
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, reference: &str, info: ImageInfo) -> Self {
        self.images.insert(reference.to_string(), info);
        self
    }

    pub fn with_existing(self, reference: &str) -> Self {
        self.existing.lock().unwrap().insert(reference.to_string());
        self
    }

    pub fn with_broken_copy(mut self, dest: &str, error: SyncError) -> Self {
        self.broken.insert(dest.to_string(), error);
        self
    }

    pub fn with_flaky_copy(self, dest: &str, failures: u32) -> Self {
        self.flaky.lock().unwrap().insert(dest.to_string(), failures);
        self
    }

    pub fn copy_calls(&self) -> Vec<CopyCall> {
        self.copies.lock().unwrap().clone()
    }

    pub fn copied_to(&self) -> Vec<String> {
        self.copy_calls().into_iter().map(|c| c.dest).collect()
    }
}

#[async_trait]
impl ImageTool for FakeRegistry {
    async fn inspect(&self, endpoint: &Endpoint, reference: &str) -> Result<ImageInfo> {
        let located = endpoint.locate(reference);
        self.inspected.lock().unwrap().push(located.clone());
        self.images
            .get(&located)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("manifest unknown: {}", located)))
    }

    async fn copy(
        &self,
        source: &Endpoint,
        source_ref: &str,
        dest: &Endpoint,
        dest_ref: &str,
    ) -> Result<()> {
        let from = source.locate(source_ref);
        let to = dest.locate(dest_ref);

        if let Some(err) = self.broken.get(&to) {
            return Err(err.clone());
        }
        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(&to) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SyncError::Command {
                        command: "skopeo copy".to_string(),
                        status: "exit code 1".to_string(),
                        stderr: "connection reset by peer".to_string(),
                    });
                }
            }
        }

        let mut existing = self.existing.lock().unwrap();
        let from_is_source = self.images.values().any(|info| from.contains(&info.name));
        if !from_is_source && !existing.contains(&from) {
            return Err(SyncError::NotFound(format!("manifest unknown: {}", from)));
        }
        existing.insert(to.clone());

        self.copies.lock().unwrap().push(CopyCall {
            source: from,
            dest: to,
            source_creds: source.credentials.as_ref().map(|c| c.to_arg()),
            dest_creds: dest.credentials.as_ref().map(|c| c.to_arg()),
        });
        Ok(())
    }
}
