//! Parameter types for version generation.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between [`operations`](super::operations), which plans a
//! version from a preset, and the [`backend`](super::backend), which does the
//! pixel work. Swapping the backend (e.g. a recording mock in tests) leaves
//! planning untouched.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Everything needed to generate one version.
///
/// The output format is taken from the extension of `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Final output dimensions.
    pub width: u32,
    pub height: u32,
    /// Fill `width`×`height` and center-crop instead of a plain resize.
    pub crop: bool,
    pub quality: Quality,
    /// Set when an existing version is being replaced because its source changed.
    pub force: bool,
}
