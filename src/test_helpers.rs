//! Shared test utilities for the media-versions test suite.
//!
//! Provides media-tree setup, synthetic images, mtime control, and a small
//! preset set that exercises crop, width-only, and format-override presets.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let source = touch_source(tmp.path(), "photos/dog.jpg");
//! let config = test_config(tmp.path());
//!
//! set_mtime(&source, SystemTime::now() + Duration::from_secs(60));
//! assert_eq!(list_dir(&tmp.path().join("photos")), vec!["dog.jpg"]);
//! ```

use image::{ImageEncoder, RgbImage};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::{OutputFormat, ResolverConfig, VersionPreset};

// =========================================================================
// Fixture setup
// =========================================================================

/// Config rooted at `media_root` with a small, fixed preset set:
///
/// | preset | parameters |
/// |---|---|
/// | `medium` | 300×300 crop |
/// | `small` | width 140 |
/// | `hero` | width 800, WebP |
pub fn test_config(media_root: &Path) -> ResolverConfig {
    let mut hero = VersionPreset::width("Hero", 800);
    hero.format = Some(OutputFormat::Webp);
    ResolverConfig {
        media_root: media_root.to_path_buf(),
        versions: BTreeMap::from([
            (
                "medium".to_string(),
                VersionPreset::cropped("Medium (4col)", 300, 300),
            ),
            ("small".to_string(), VersionPreset::width("Small (2 col)", 140)),
            ("hero".to_string(), hero),
        ]),
        ..ResolverConfig::default()
    }
}

/// Create a placeholder source file at `root/relative`, with parents.
///
/// The content is not an image; use with a mock generator.
pub fn touch_source(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, b"source bytes").unwrap();
    path
}

/// Write a real gradient JPEG of the given size, with parents.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

// =========================================================================
// Filesystem inspection
// =========================================================================

/// Set a file's modification time.
pub fn set_mtime(path: &Path, mtime: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}

/// Sorted entry names in `dir`, hidden files included. Empty if `dir` is missing.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
