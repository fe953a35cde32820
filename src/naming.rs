//! Path and URL naming for sources and their versions.
//!
//! Everything here is pure: no filesystem access. Paths are media-relative
//! (`photos/dog.jpg`), never absolute, and always use `/` in URLs.
//!
//! ## Version Layout
//!
//! A version lives in a `versions_dirname` subdirectory next to its source,
//! named `<stem>_<preset>.<ext>`:
//!
//! ```text
//! media/
//! └── photos/
//!     ├── dog.jpg
//!     └── _versions/
//!         ├── dog_medium.jpg
//!         └── dog_thumbnail.jpg
//! ```
//!
//! The extension is the source's own extension unless the preset sets an
//! output format. A preset format keeps the whole source file name in front
//! of the preset, so `dog.jpg` and `dog.png` stay apart:
//!
//! ```text
//! dog.jpg + hero (webp) → _versions/dog.jpg_hero.webp
//! dog.png + hero (webp) → _versions/dog.png_hero.webp
//! ```

use crate::config::OutputFormat;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Why a source reference could not be turned into a media-relative path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceRefError {
    #[error("empty source reference")]
    Empty,
    #[error("'{0}' is not under the media URL")]
    OutsideMedia(String),
    #[error("'{0}' is an absolute path")]
    Absolute(String),
    #[error("'{0}' escapes the media root")]
    Traversal(String),
    #[error("'{0}' does not name a file")]
    NoFileName(String),
}

/// Turn a source reference into a media-relative path.
///
/// Accepts either a URL under `media_url` (`/media/photos/dog.jpg`) or a
/// path already relative to the media root (`photos/dog.jpg`). References
/// with a scheme or host must also start with `media_url` to be accepted.
pub fn url_to_path(reference: &str, media_url: &str) -> Result<PathBuf, SourceRefError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(SourceRefError::Empty);
    }

    let relative = if let Some(rest) = trimmed.strip_prefix(media_url) {
        rest
    } else if trimmed.contains("://") || trimmed.starts_with('/') {
        return Err(SourceRefError::OutsideMedia(trimmed.to_string()));
    } else {
        trimmed
    };

    let path = Path::new(relative);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(SourceRefError::Traversal(trimmed.to_string())),
            Component::RootDir | Component::Prefix(_) => {
                return Err(SourceRefError::Absolute(trimmed.to_string()));
            }
        }
    }
    if clean.file_name().is_none() || relative.ends_with('/') {
        return Err(SourceRefError::NoFileName(trimmed.to_string()));
    }
    Ok(clean)
}

/// URL for a media-relative path.
pub fn path_to_url(path: &Path, media_url: &str) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!("{}{}", media_url, parts.join("/"))
}

/// Derived path of a version, relative to the media root.
///
/// `photos/dog.jpg` + `medium` → `photos/_versions/dog_medium.jpg`, and with
/// a `webp` preset format, `photos/_versions/dog.jpg_medium.webp`.
pub fn version_path(
    source: &Path,
    preset_name: &str,
    format: Option<OutputFormat>,
    versions_dirname: &str,
) -> PathBuf {
    let lossy = |s: &std::ffi::OsStr| s.to_string_lossy().into_owned();
    let filename = match format {
        Some(format) => {
            let name = source.file_name().map(lossy).unwrap_or_default();
            format!("{name}_{preset_name}.{}", format.extension())
        }
        None => {
            let stem = source.file_stem().map(lossy).unwrap_or_default();
            match source.extension().map(lossy) {
                Some(ext) => format!("{stem}_{preset_name}.{ext}"),
                None => format!("{stem}_{preset_name}"),
            }
        }
    };
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    dir.join(versions_dirname).join(filename)
}

/// Whether a media-relative path points inside a versions directory.
///
/// Used to keep versions from being treated as sources themselves.
pub fn is_version_path(path: &Path, versions_dirname: &str) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(part) if part == versions_dirname))
}
