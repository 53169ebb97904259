//! Registry Sync Library
//!
//! This file serves as the library root for the registry-sync crate,
//! organizing and exposing the modules that copy container images between
//! registries through skopeo.

pub mod cli;
pub mod common;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod image;
pub mod logging;
pub mod pipeline;
pub mod registry;

pub use common::ImageTool;
pub use config::{ImageEntry, SyncConfig};
pub use error::{Result, SyncError};
pub use logging::Logger;
pub use pipeline::{SyncOptions, SyncPipeline, SyncReport};
