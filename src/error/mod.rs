//! Error types and handlers for sync operations

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Configuration file or argument problems
    #[error("Configuration error: {0}")]
    Config(String),
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    /// Registry rejected the supplied credentials
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Image or tag missing on the registry
    #[error("Not found: {0}")]
    NotFound(String),
    /// TLS handshake or certificate problems
    #[error("TLS error: {0}")]
    Tls(String),
    /// External tool exited unsuccessfully
    #[error("Command `{command}` failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },
    /// External tool binary could not be started
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
    /// External tool did not finish in time
    #[error("Timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },
    /// Inspect output missing fields the sync depends on
    #[error("Image error: {0}")]
    Image(String),
    /// File IO errors
    #[error("IO error: {0}")]
    Io(String),
    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),
    /// Worker task panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}

impl SyncError {
    /// Transient errors worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Command { .. } | SyncError::Timeout { .. } | SyncError::Io(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for SyncError {
    fn from(err: serde_yaml::Error) -> Self {
        SyncError::Parse(format!("YAML error: {}", err))
    }
}

impl From<std::string::FromUtf8Error> for SyncError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        SyncError::Parse(format!("UTF-8 conversion error: {}", err))
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        SyncError::Worker(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let transient = SyncError::Command {
            command: "skopeo copy".to_string(),
            status: "exit code 1".to_string(),
            stderr: "connection reset by peer".to_string(),
        };
        assert!(transient.is_retryable());
        assert!(
            SyncError::Timeout {
                command: "skopeo copy".to_string(),
                seconds: 5
            }
            .is_retryable()
        );
        assert!(!SyncError::Auth("unauthorized".to_string()).is_retryable());
        assert!(!SyncError::NotFound("manifest unknown".to_string()).is_retryable());
        assert!(!SyncError::Tls("x509".to_string()).is_retryable());
    }
}
