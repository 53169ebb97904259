//! Image metadata module
//!
//! This module interprets what the copy tool reports about a source image
//! (see [`ImageInfo`]) and derives the tags the sync writes from it. It also
//! owns the export list ([`ExportList`]) that records which version-release
//! tag and digest each synced image resolved to.

pub mod export;
pub mod info;

pub use export::{ExportEntry, ExportList};
pub use info::ImageInfo;
