//! Pre-generating versions for a media tree.
//!
//! Walks `media_root` (or a subdirectory of it), collects every supported
//! source image, and resolves each one against the selected presets in
//! parallel. Versions that are already fresh cost one `stat` each, so a warm
//! run doubles as a cheap staleness sweep.
//!
//! ```text
//! media/
//! ├── photos/
//! │   ├── dog.jpg          ← source
//! │   ├── notes.txt        ← skipped (unsupported)
//! │   └── _versions/       ← skipped (never a source)
//! └── .trash/              ← skipped (hidden)
//! ```
//!
//! Resolutions are spread over rayon's global pool with
//! [`par_iter`](rayon::iter::IntoParallelRefIterator::par_iter); the actual
//! encoding still runs on the resolver's own generation pool, bounded by its
//! timeout. Progress is reported per source × preset through an optional
//! channel so the CLI can print while work continues.

use crate::cache::ResolveStats;
use crate::imaging::{ArtifactGenerator, is_supported_source};
use crate::naming;
use crate::resolver::{VersionError, VersionResolver};
use crate::types::Resolution;
use rayon::prelude::*;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum WarmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("unknown version preset '{0}'")]
    UnknownPreset(String),
    #[error("'{}' is not a directory under the media root", .0.display())]
    InvalidDir(PathBuf),
}

/// Progress reported for each source × preset pair.
#[derive(Debug, Clone)]
pub enum WarmEvent {
    Resolved {
        source: String,
        preset: String,
        resolution: Resolution,
    },
    Failed {
        source: String,
        preset: String,
        error: VersionError,
    },
}

/// What to warm.
#[derive(Debug, Clone, Default)]
pub struct WarmOptions {
    /// Subdirectory of the media root to restrict the walk to.
    pub dir: Option<PathBuf>,
    /// Presets to generate. Empty means every configured preset.
    pub presets: Vec<String>,
}

/// Media-relative paths of all supported sources under `media_root/dir`,
/// sorted.
pub fn collect_sources(
    media_root: &Path,
    dir: Option<&Path>,
    versions_dirname: &str,
) -> Result<Vec<PathBuf>, WarmError> {
    let start = match dir {
        Some(dir) => {
            let clean = dir
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if !clean {
                return Err(WarmError::InvalidDir(dir.to_path_buf()));
            }
            media_root.join(dir)
        }
        None => media_root.to_path_buf(),
    };
    if !start.is_dir() {
        return Err(WarmError::InvalidDir(
            dir.map_or_else(|| media_root.to_path_buf(), Path::to_path_buf),
        ));
    }

    let mut sources = Vec::new();
    let walker = WalkDir::new(&start)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e, versions_dirname));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_supported_source(entry.path()) {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(media_root) {
            sources.push(relative.to_path_buf());
        }
    }
    Ok(sources)
}

fn is_skipped(entry: &DirEntry, versions_dirname: &str) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && name == versions_dirname)
}

/// Resolve every source under the selected directory against the selected
/// presets. Individual failures are counted, not returned.
pub fn warm<G: ArtifactGenerator>(
    resolver: &VersionResolver<G>,
    options: &WarmOptions,
    events: Option<Sender<WarmEvent>>,
) -> Result<ResolveStats, WarmError> {
    let presets: Vec<String> = if options.presets.is_empty() {
        resolver.registry().names().map(str::to_string).collect()
    } else {
        for name in &options.presets {
            if !resolver.registry().contains(name) {
                return Err(WarmError::UnknownPreset(name.clone()));
            }
        }
        options.presets.clone()
    };

    let config = resolver.config();
    let sources = collect_sources(
        &config.media_root,
        options.dir.as_deref(),
        &config.versions_dirname,
    )?;
    tracing::info!(
        sources = sources.len(),
        presets = presets.len(),
        "warming versions"
    );

    let jobs: Vec<(String, &str)> = sources
        .iter()
        .map(|path| naming::path_to_url(path, ""))
        .flat_map(|source| presets.iter().map(move |p| (source.clone(), p.as_str())))
        .collect();

    let stats = jobs
        .par_iter()
        .map(|(source, preset)| {
            let mut stats = ResolveStats::default();
            let event = match resolver.resolve(source, preset) {
                Ok(resolution) => {
                    stats.record(resolution.outcome);
                    WarmEvent::Resolved {
                        source: source.clone(),
                        preset: preset.to_string(),
                        resolution,
                    }
                }
                Err(error) => {
                    stats.fail();
                    WarmEvent::Failed {
                        source: source.clone(),
                        preset: preset.to_string(),
                        error,
                    }
                }
            };
            if let Some(tx) = &events {
                tx.send(event).ok();
            }
            stats
        })
        .reduce(ResolveStats::default, ResolveStats::merge);

    Ok(stats)
}
