//! Common module - shared traits, utilities and interfaces
//!
//! This module contains common functionality that can be reused across the codebase
//! to improve modularity and reduce code duplication.

pub mod traits;
pub mod utils;

pub use traits::*;
pub use utils::*;
