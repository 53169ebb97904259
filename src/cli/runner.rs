//! Runner wiring arguments, config, logger and pipelines together

use crate::cli::args::{Args, Command, DumpArgs, SyncArgs};
use crate::common::{ImageTool, RetryConfig};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::logging::Logger;
use crate::pipeline::{DumpPipeline, SyncOptions, SyncPipeline};
use crate::registry::SkopeoClient;
use std::path::Path;
use std::sync::Arc;

pub struct Runner {
    args: Args,
    output: Logger,
    config: SyncConfig,
}

impl Runner {
    /// Validate arguments and load the config file. Every error from here
    /// is a startup error, before any registry is contacted.
    pub fn new(args: Args) -> Result<Self> {
        args.validate().map_err(SyncError::Validation)?;

        // Dump writes YAML to stdout, keep progress chatter out of it
        let dumping = matches!(args.command, Command::Dump(_));
        let output = if args.quiet || (dumping && !args.verbose) {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        let config = Self::load_config(&args.command, &output, Path::new(args.config_path()))?;
        Ok(Self {
            args,
            output,
            config,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Command::Sync(args) => self.run_sync(args, &self.config).await,
            Command::Dump(args) => self.run_dump(args, &self.config).await,
        }
    }

    fn load_config(command: &Command, output: &Logger, path: &Path) -> Result<SyncConfig> {
        output.verbose(&format!("Loading configuration from {}", path.display()));
        let config = SyncConfig::load(path)?.apply_env().resolve_credentials()?;

        // Dump only reads from the source registry
        match command {
            Command::Sync(_) => config.validate()?,
            Command::Dump(_) => config.validate_source()?,
        }

        if config.container_images.is_empty() {
            output.warning("No container_images configured, nothing to do");
        }
        output.detail(&format!("Source transport: {}", config.source_registry_type));
        output.detail(&format!(
            "Source credentials: {}",
            Self::describe(&config.source_registry_credentials)
        ));
        if let Command::Sync(_) = command {
            output.detail(&format!(
                "Destination: {}{}",
                config.destination_registry_type, config.destination_registry_namespace
            ));
            output.detail(&format!(
                "Destination credentials: {}",
                Self::describe(&config.destination_registry_credentials)
            ));
        }
        Ok(config)
    }

    fn describe(credentials: &Option<crate::registry::Credentials>) -> String {
        match credentials {
            Some(creds) => format!("user {}", creds.user),
            None => "anonymous".to_string(),
        }
    }

    fn create_tool(&self, config: &SyncConfig, timeout: u64) -> Result<Arc<dyn ImageTool>> {
        let client = SkopeoClient::builder(config.skopeo_path.clone())
            .with_timeout(timeout)
            .with_logger(self.output.clone())
            .build()?;
        Ok(Arc::new(client))
    }

    async fn run_sync(&self, args: &SyncArgs, config: &SyncConfig) -> Result<()> {
        self.output.section("Initiating registry sync");
        let tool = self.create_tool(config, args.timeout)?;

        let options = SyncOptions {
            workers: args.threads,
            no_modify: args.no_modify,
            retry: RetryConfig::new(args.retry),
        };
        let report = SyncPipeline::new(tool, self.output.clone())
            .with_options(options)
            .run(config)
            .await?;

        report.stats.report(&self.output);

        if report.is_success() {
            self.output.success(&format!(
                "Registry sync completed in {}",
                self.output.elapsed()
            ));
            Ok(())
        } else {
            let failed: Vec<String> = report
                .failures()
                .map(|o| match o.error() {
                    Some(e) => format!("{}: {}", o.imagename, e),
                    None => o.imagename.clone(),
                })
                .collect();
            self.output.list("Failed images", &failed);
            Err(SyncError::Worker(format!(
                "{} of {} images failed to sync",
                report.stats.failed, report.stats.total_images
            )))
        }
    }

    async fn run_dump(&self, args: &DumpArgs, config: &SyncConfig) -> Result<()> {
        let tool = self.create_tool(config, args.timeout)?;
        let report = DumpPipeline::new(tool, self.output.clone())
            .with_workers(args.threads)
            .run(config, args.tag.as_deref())
            .await?;

        print!("{}", report.to_yaml()?);

        if report.is_success() {
            Ok(())
        } else {
            Err(SyncError::Worker(format!(
                "{} of {} images could not be inspected",
                report.failures.len(),
                config.container_images.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const SOURCE_ONLY: &str = "container_images:\n  - imagename: quay.io/org/app:latest\n";

    fn args(subcommand: &str, path: &Path) -> Args {
        Args::try_parse_from([
            "registry-sync",
            subcommand,
            "-c",
            path.to_str().unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_dump_accepts_source_only_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.yml");
        std::fs::write(&path, SOURCE_ONLY).unwrap();

        let runner = Runner::new(args("dump", &path)).unwrap();
        assert_eq!(runner.config().container_images.len(), 1);
    }

    #[test]
    fn test_sync_rejects_source_only_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.yml");
        std::fs::write(&path, SOURCE_ONLY).unwrap();

        let err = Runner::new(args("sync", &path)).err().unwrap();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(err.to_string().contains("destination_registry_namespace"));
    }

    #[test]
    fn test_missing_config_fails_at_startup() {
        let err = Runner::new(args("sync", Path::new("/nonexistent/sync.yml")))
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
