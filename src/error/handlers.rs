//! Standardized mapping of failed tool invocations to typed errors

use crate::error::SyncError;
use std::process::ExitStatus;
use std::time::Duration;

/// Standard error handler for external command output
pub struct CommandErrorHandler;

impl CommandErrorHandler {
    /// Classify a non-zero exit using the tool's stderr
    pub fn handle_exit(command: &str, status: ExitStatus, stderr: &str) -> SyncError {
        let status = match status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        Self::classify(command, &status, stderr)
    }

    pub fn classify(command: &str, status: &str, stderr: &str) -> SyncError {
        let detail = Self::last_line(stderr);
        let lower = stderr.to_lowercase();

        if lower.contains("unauthorized")
            || lower.contains("authentication required")
            || lower.contains("invalid username/password")
        {
            SyncError::Auth(format!("{} rejected credentials: {}", command, detail))
        } else if lower.contains("manifest unknown")
            || lower.contains("not found")
            || lower.contains("name unknown")
        {
            SyncError::NotFound(format!("{}: {}", command, detail))
        } else if lower.contains("x509") || lower.contains("certificate") {
            SyncError::Tls(format!(
                "{}: {}. Set the tls_verify flag to false for plain-http registries",
                command, detail
            ))
        } else {
            SyncError::Command {
                command: command.to_string(),
                status: status.to_string(),
                stderr: detail,
            }
        }
    }

    /// Map a spawn failure, distinguishing a missing binary
    pub fn handle_spawn(program: &str, err: std::io::Error) -> SyncError {
        match err.kind() {
            std::io::ErrorKind::NotFound => SyncError::ToolNotFound(format!(
                "{} (set skopeo_path in the config or REGISTRY_SYNC_SKOPEO)",
                program
            )),
            std::io::ErrorKind::PermissionDenied => {
                SyncError::ToolNotFound(format!("{} is not executable", program))
            }
            _ => SyncError::Io(format!("Failed to start {}: {}", program, err)),
        }
    }

    /// Linear backoff between attempts of a failed copy
    pub fn retry_delay(attempt: u32, base: Duration) -> Duration {
        base * attempt.max(1)
    }

    // skopeo prints the useful message last, after any retry chatter
    fn last_line(stderr: &str) -> String {
        stderr
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .unwrap_or("no error output")
            .to_string()
    }
}
