//! High-level version operations.
//!
//! These functions combine calculations with backend execution.
//! They take a preset, compute parameters, and call the backend.

use super::backend::{ArtifactGenerator, BackendError};
use super::calculations::calculate_version_dimensions;
use super::params::{Quality, VersionParams};
use crate::config::VersionPreset;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions<G: ArtifactGenerator + ?Sized>(backend: &G, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Plan a version without executing it.
///
/// `default_quality` applies when the preset carries no quality of its own.
pub fn plan_version(
    source: &Path,
    output: &Path,
    source_dims: (u32, u32),
    preset: &VersionPreset,
    default_quality: Quality,
    force: bool,
) -> VersionParams {
    let size = calculate_version_dimensions(
        source_dims,
        (preset.width, preset.height),
        preset.crop,
        preset.upscale,
    );

    VersionParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width: size.width,
        height: size.height,
        crop: size.crop,
        quality: preset.quality.map(Quality::new).unwrap_or(default_quality),
        force,
    }
}

/// Identify the source, plan the version, and have the backend write it.
pub fn create_version<G: ArtifactGenerator + ?Sized>(
    backend: &G,
    source: &Path,
    output: &Path,
    preset: &VersionPreset,
    default_quality: Quality,
    force: bool,
) -> Result<VersionParams> {
    let dims = get_dimensions(backend, source)?;
    let params = plan_version(source, output, dims, preset, default_quality, force);
    backend.generate(&params)?;
    Ok(params)
}
