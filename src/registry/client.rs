//! Registry client backed by the skopeo command-line tool
//!
//! Every registry operation is one skopeo invocation. Argument vectors are
//! built by plain functions so they can be checked without spawning anything.

use crate::common::{ImageTool, redact_args};
use crate::error::handlers::CommandErrorHandler;
use crate::error::{Result, SyncError};
use crate::image::ImageInfo;
use crate::logging::Logger;
use crate::registry::Endpoint;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub struct SkopeoClientBuilder {
    program: PathBuf,
    timeout: Option<Duration>,
    logger: Option<Logger>,
}

impl SkopeoClientBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
            logger: None,
        }
    }

    /// Per-invocation timeout in seconds, 0 disables it
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<SkopeoClient> {
        if self.program.as_os_str().is_empty() {
            return Err(SyncError::Config("skopeo path cannot be empty".to_string()));
        }
        Ok(SkopeoClient {
            program: self.program,
            timeout: self.timeout,
            logger: self.logger.unwrap_or_else(Logger::new_quiet),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SkopeoClient {
    program: PathBuf,
    timeout: Option<Duration>,
    logger: Logger,
}

impl SkopeoClient {
    pub fn builder(program: impl Into<PathBuf>) -> SkopeoClientBuilder {
        SkopeoClientBuilder::new(program)
    }

    /// `inspect --tls-verify=<bool> [--creds user:token] <transport><ref>`
    pub fn inspect_args(endpoint: &Endpoint, reference: &str) -> Vec<String> {
        let mut args = vec![
            "inspect".to_string(),
            format!("--tls-verify={}", endpoint.tls_verify),
        ];
        if let Some(creds) = &endpoint.credentials {
            args.push("--creds".to_string());
            args.push(creds.to_arg());
        }
        args.push(endpoint.locate(reference));
        args
    }

    /// `copy --src-tls-verify=.. [--src-creds ..] --dest-tls-verify=.. [--dest-creds ..] <src> <dest>`
    pub fn copy_args(
        source: &Endpoint,
        source_ref: &str,
        dest: &Endpoint,
        dest_ref: &str,
    ) -> Vec<String> {
        let mut args = vec![
            "copy".to_string(),
            format!("--src-tls-verify={}", source.tls_verify),
        ];
        if let Some(creds) = &source.credentials {
            args.push("--src-creds".to_string());
            args.push(creds.to_arg());
        }
        args.push(format!("--dest-tls-verify={}", dest.tls_verify));
        if let Some(creds) = &dest.credentials {
            args.push("--dest-creds".to_string());
            args.push(creds.to_arg());
        }
        args.push(source.locate(source_ref));
        args.push(dest.locate(dest_ref));
        args
    }

    /// Run the tool and return its stdout
    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>> {
        let program = self.program.display().to_string();
        let rendered = redact_args(&program, &args);
        let subcommand = format!("{} {}", program, args.first().map(String::as_str).unwrap_or(""));
        self.logger.debug(&format!("Running: {}", rendered));

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            // Dropping the output future on timeout kills the child
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| SyncError::Timeout {
                    command: rendered.clone(),
                    seconds: limit.as_secs(),
                })?,
            None => command.output().await,
        }
        .map_err(|e| CommandErrorHandler::handle_spawn(&program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CommandErrorHandler::handle_exit(
                &subcommand,
                output.status,
                &stderr,
            ));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl ImageTool for SkopeoClient {
    async fn inspect(&self, endpoint: &Endpoint, reference: &str) -> Result<ImageInfo> {
        let stdout = self.run(Self::inspect_args(endpoint, reference)).await?;
        ImageInfo::from_json(&stdout)
    }

    async fn copy(
        &self,
        source: &Endpoint,
        source_ref: &str,
        dest: &Endpoint,
        dest_ref: &str,
    ) -> Result<()> {
        self.run(Self::copy_args(source, source_ref, dest, dest_ref))
            .await
            .map(|_| ())
    }
}
