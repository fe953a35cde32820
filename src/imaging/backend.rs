//! Artifact generator trait and shared types.
//!
//! The [`ArtifactGenerator`] trait is the seam between the resolver and the
//! pixel work: identify a source, and write one version described by
//! [`VersionParams`]. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).
//!
//! Generators are shared across the resolver's worker pool, so they must be
//! `Send + Sync + 'static`.

use super::params::VersionParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for version generators.
pub trait ArtifactGenerator: Send + Sync + 'static {
    /// Get image dimensions without a full decode where possible.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Write the version described by `params` to `params.output`.
    ///
    /// The resolver always hands out a fresh temporary output path, so
    /// implementations write unconditionally. `params.force` only reports
    /// whether an existing version is being replaced.
    fn generate(&self, params: &VersionParams) -> Result<(), BackendError>;
}
