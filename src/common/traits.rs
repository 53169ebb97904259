//! Common traits and interfaces
//!
//! [`ImageTool`] is the seam between the sync logic and the external copy
//! utility. The production implementation shells out to skopeo; tests plug
//! in an in-memory registry.

use crate::error::Result;
use crate::image::ImageInfo;
use crate::registry::Endpoint;
use async_trait::async_trait;
use std::time::Duration;

/// External image-copy service
#[async_trait]
pub trait ImageTool: Send + Sync {
    /// Read metadata for `reference` on `endpoint`
    async fn inspect(&self, endpoint: &Endpoint, reference: &str) -> Result<ImageInfo>;

    /// Copy `source_ref` from `source` to `dest_ref` on `dest`
    async fn copy(
        &self,
        source: &Endpoint,
        source_ref: &str,
        dest: &Endpoint,
        dest_ref: &str,
    ) -> Result<()>;
}

/// Retry configuration for copy operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub retries: u32,
    pub base_delay: Duration,
}

impl RetryConfig {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 0,
            base_delay: Duration::from_secs(1),
        }
    }
}
