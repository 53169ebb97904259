//! Sync pipeline
//!
//! Runs one task per configured image on the worker pool. A task inspects
//! the source image, optionally preserves the destination's current moving
//! tag, then copies the image under its version-release tag and every
//! latest-style tag. Failures are recorded per image and never stop the
//! batch.

pub mod dump;

pub use dump::{DumpPipeline, DumpReport};

use crate::common::{ImageTool, RetryConfig, Timer};
use crate::concurrency::{SyncStats, WorkerPool};
use crate::config::{ImageEntry, SyncConfig};
use crate::error::handlers::CommandErrorHandler;
use crate::error::{Result, SyncError};
use crate::image::{ExportEntry, ExportList, ImageInfo};
use crate::logging::Logger;
use crate::registry::{self, Endpoint};
use std::path::PathBuf;
use std::sync::Arc;

/// Runtime options that do not come from the config file
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub workers: usize,
    /// Inspect only, leave the destination registry untouched
    pub no_modify: bool,
    pub retry: RetryConfig,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            workers: 8,
            no_modify: false,
            retry: RetryConfig::default(),
        }
    }
}

/// What a successful task did to the destination
#[derive(Debug, Clone, Default)]
pub struct TaskReport {
    /// Destination references written, version-release tag first
    pub copied: Vec<String>,
    pub renamed: bool,
}

/// Result of one image task
#[derive(Debug)]
pub struct ImageOutcome {
    pub imagename: String,
    /// Present whenever the inspect succeeded, even if a later copy failed
    pub info: Option<ImageInfo>,
    pub result: Result<TaskReport>,
}

impl ImageOutcome {
    fn failed(imagename: String, info: Option<ImageInfo>, error: SyncError) -> Self {
        Self {
            imagename,
            info,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&SyncError> {
        self.result.as_ref().err()
    }
}

#[derive(Debug)]
pub struct SyncReport {
    /// One outcome per configured image, in config order
    pub outcomes: Vec<ImageOutcome>,
    pub stats: SyncStats,
    pub export_path: Option<PathBuf>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        !self.stats.has_failures()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Every inspected image with a resolvable version-release tag
    pub fn export_list(&self) -> ExportList {
        let entries = self
            .outcomes
            .iter()
            .filter_map(|o| o.info.as_ref())
            .filter_map(|info| ExportEntry::from_info(info).ok())
            .collect();
        ExportList::new(entries)
    }
}

/// Everything a task needs, shared across workers
struct SyncContext {
    tool: Arc<dyn ImageTool>,
    logger: Logger,
    config: SyncConfig,
    source: Endpoint,
    destination: Endpoint,
    no_modify: bool,
    retry: RetryConfig,
    total: usize,
}

pub struct SyncPipeline {
    tool: Arc<dyn ImageTool>,
    logger: Logger,
    options: SyncOptions,
}

impl SyncPipeline {
    pub fn new(tool: Arc<dyn ImageTool>, logger: Logger) -> Self {
        Self {
            tool,
            logger,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn run(&self, config: &SyncConfig) -> Result<SyncReport> {
        let pool = WorkerPool::new(self.options.workers)?;
        let entries = config.container_images.clone();
        let total = entries.len();
        let mut stats = SyncStats::new(total);

        self.logger.info(&format!(
            "Syncing {} images with {} workers{}",
            total,
            pool.workers(),
            if self.options.no_modify {
                " (no-modify: destination is left untouched)"
            } else {
                ""
            }
        ));

        let context = Arc::new(SyncContext {
            tool: Arc::clone(&self.tool),
            logger: self.logger.clone(),
            source: config.source_endpoint(),
            destination: config.destination_endpoint(),
            config: config.clone(),
            no_modify: self.options.no_modify,
            retry: self.options.retry.clone(),
            total,
        });

        let results = pool
            .run(entries.clone(), move |index, entry| {
                let context = Arc::clone(&context);
                async move { Ok(Self::sync_image(context, index, entry).await) }
            })
            .await;

        let mut outcomes = Vec::with_capacity(total);
        for (result, entry) in results.into_iter().zip(entries) {
            let outcome = result.unwrap_or_else(|e| {
                self.logger.error(&format!("Task for {} did not finish: {}", entry.imagename, e));
                ImageOutcome::failed(entry.imagename, None, e)
            });
            match &outcome.result {
                Ok(report) if report.copied.is_empty() => stats.mark_inspected_only(),
                Ok(report) => {
                    stats.mark_succeeded();
                    stats.record_copies(report.copied.len(), report.renamed);
                }
                Err(_) => stats.mark_failed(),
            }
            outcomes.push(outcome);
        }

        let mut report = SyncReport {
            outcomes,
            stats,
            export_path: None,
        };

        if config.write_image_export_list {
            if let Some(path) = &config.image_export_list {
                let list = report.export_list();
                self.logger
                    .info(&format!("Writing out YAML file {}", path.display()));
                list.write(path)?;
                self.logger.detail(&format!("{} images exported", list.len()));
                report.export_path = Some(path.clone());
            }
        }

        Ok(report)
    }

    async fn sync_image(context: Arc<SyncContext>, index: usize, entry: ImageEntry) -> ImageOutcome {
        let timer = Timer::start();
        let logger = &context.logger;
        logger.notify_task_start(index, context.total, &entry.imagename);

        let info = match context
            .tool
            .inspect(&context.source, &entry.imagename)
            .await
        {
            Ok(info) => info,
            Err(e) => {
                logger.notify_task_failed(index, context.total, &entry.imagename, &e.to_string());
                return ImageOutcome::failed(entry.imagename, None, e);
            }
        };
        logger.info(&format!("Read container image: {}", entry.imagename));

        if context.no_modify {
            logger.notify_task_complete(index, context.total, &entry.imagename, timer.stop());
            return ImageOutcome {
                imagename: entry.imagename,
                info: Some(info),
                result: Ok(TaskReport::default()),
            };
        }

        let result = Self::publish(&context, &entry, &info).await;
        match &result {
            Ok(report) => {
                logger.info(&format!(
                    "Copied container image: {} to {}",
                    entry.imagename,
                    context.config.namespace_for(&entry)
                ));
                for dest in &report.copied {
                    logger.detail(&format!("-> {}", dest));
                }
                logger.notify_task_complete(index, context.total, &entry.imagename, timer.stop());
            }
            Err(e) => {
                logger.notify_task_failed(index, context.total, &entry.imagename, &e.to_string())
            }
        }

        ImageOutcome {
            imagename: entry.imagename,
            info: Some(info),
            result,
        }
    }

    /// Write the inspected image to the destination under all its tags
    async fn publish(
        context: &SyncContext,
        entry: &ImageEntry,
        info: &ImageInfo,
    ) -> Result<TaskReport> {
        let config = &context.config;
        let source_ref = info.source_reference()?;
        let version_release = info.version_release()?;
        let dest_repo = registry::join_namespace(config.namespace_for(entry), info.label_name()?);
        let tags = config.tags_for(entry);

        let mut report = TaskReport::default();

        // The preserved tag is always destination_image_tag, whatever the entry's tags are
        if config.rename_old_tag {
            if let Some(keep_as) = &config.tag_to_rename {
                report.renamed =
                    Self::rename_tag(context, &dest_repo, &config.destination_image_tag, keep_as)
                        .await?;
            }
        }

        let dest_ref = format!("{}:{}", dest_repo, version_release);
        Self::copy_with_retry(context, &context.source, &source_ref, &context.destination, &dest_ref)
            .await?;
        report.copied.push(dest_ref);

        // Layers already exist at this point, so these copies only create tags
        for tag in tags.iter().filter(|t| **t != version_release) {
            let dest_ref = format!("{}:{}", dest_repo, tag);
            Self::copy_with_retry(
                context,
                &context.source,
                &source_ref,
                &context.destination,
                &dest_ref,
            )
            .await?;
            report.copied.push(dest_ref);
        }

        Ok(report)
    }

    /// Preserve the destination's current `from` tag as `to`.
    ///
    /// Returns false when there is nothing to preserve yet.
    async fn rename_tag(context: &SyncContext, dest_repo: &str, from: &str, to: &str) -> Result<bool> {
        let from_ref = format!("{}:{}", dest_repo, from);
        let to_ref = format!("{}:{}", dest_repo, to);
        let dest = &context.destination;

        match Self::copy_with_retry(context, dest, &from_ref, dest, &to_ref).await {
            Ok(()) => {
                context.logger.info(&format!(
                    "Renamed old container image tags from {} to {} for {}",
                    from, to, dest_repo
                ));
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                context.logger.warning(&format!(
                    "{} not present yet, nothing to rename",
                    from_ref
                ));
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn copy_with_retry(
        context: &SyncContext,
        source: &Endpoint,
        source_ref: &str,
        dest: &Endpoint,
        dest_ref: &str,
    ) -> Result<()> {
        let mut attempt = 0;
        loop {
            match context.tool.copy(source, source_ref, dest, dest_ref).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < context.retry.retries => {
                    attempt += 1;
                    let delay = CommandErrorHandler::retry_delay(attempt, context.retry.base_delay);
                    context.logger.warning(&format!(
                        "Copy to {} failed ({}), retry {}/{} in {}",
                        dest_ref,
                        e,
                        attempt,
                        context.retry.retries,
                        context.logger.format_duration(delay)
                    ));
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
