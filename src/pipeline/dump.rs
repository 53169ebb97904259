//! Tag and digest dump for the configured images

use crate::common::ImageTool;
use crate::concurrency::WorkerPool;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::image::ExportEntry;
use crate::logging::Logger;
use crate::registry;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct DumpReport {
    /// Resolved images in config order
    pub entries: Vec<ExportEntry>,
    pub failures: Vec<(String, SyncError)>,
}

impl DumpReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Block-style YAML list of `imagename`/`digest` pairs
    pub fn to_yaml(&self) -> Result<String> {
        if self.entries.is_empty() {
            return Ok(String::new());
        }
        Ok(serde_yaml::to_string(&self.entries)?)
    }
}

pub struct DumpPipeline {
    tool: Arc<dyn ImageTool>,
    logger: Logger,
    workers: usize,
}

impl DumpPipeline {
    pub fn new(tool: Arc<dyn ImageTool>, logger: Logger) -> Self {
        Self {
            tool,
            logger,
            workers: 5,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Inspect every configured image, optionally at `tag` instead of its configured tag
    pub async fn run(&self, config: &SyncConfig, tag: Option<&str>) -> Result<DumpReport> {
        let pool = WorkerPool::new(self.workers)?;
        let references: Vec<String> = config
            .container_images
            .iter()
            .map(|entry| match tag {
                Some(tag) => registry::with_tag(&entry.imagename, tag),
                None => entry.imagename.clone(),
            })
            .collect();

        self.logger.verbose(&format!(
            "Inspecting {} images with {} workers",
            references.len(),
            pool.workers()
        ));

        let tool = Arc::clone(&self.tool);
        let source = Arc::new(config.source_endpoint());
        let results = pool
            .run(references.clone(), move |_, reference| {
                let tool = Arc::clone(&tool);
                let source = Arc::clone(&source);
                async move {
                    let info = tool.inspect(&source, &reference).await?;
                    ExportEntry::from_info(&info)
                }
            })
            .await;

        let mut report = DumpReport::default();
        for (result, reference) in results.into_iter().zip(references) {
            match result {
                Ok(entry) => report.entries.push(entry),
                Err(e) => {
                    self.logger.error(&format!("{}: {}", reference, e));
                    report.failures.push((reference, e));
                }
            }
        }
        Ok(report)
    }
}
