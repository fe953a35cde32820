//! Freshness checks for generated versions.
//!
//! A version is a pure function of its source and preset, so the only state
//! worth tracking is whether the file on disk still reflects the source.
//! That is decided from modification times alone:
//!
//! - no file at the derived path → [`Freshness::Missing`]
//! - source modified strictly after the version → [`Freshness::Stale`]
//! - otherwise → [`Freshness::Fresh`]
//!
//! ## Timestamps
//!
//! Comparisons use the full precision the filesystem reports. To keep a
//! freshly written version from looking stale when the source carries a
//! timestamp in the future (clock skew, restored backups, `touch -d`),
//! [`stamp`] sets the version's mtime to `max(now, source mtime)` right
//! after it is written. Coarse-grained filesystems (FAT's 2-second mtime)
//! can still miss a source edited within the same tick as its version.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::types::Outcome;

/// State of a derived file relative to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Stale,
    Fresh,
}

/// Modification time of a source file.
///
/// Returns `Ok(None)` when nothing usable exists at `path` (missing, or a
/// directory), so callers can report the reference as unresolvable rather
/// than as an I/O failure.
pub fn source_modified(path: &Path) -> io::Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.modified().map(Some),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Compare a derived file against its source's modification time.
pub fn check_freshness(source_modified: SystemTime, derived: &Path) -> io::Result<Freshness> {
    let meta = match fs::metadata(derived) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Freshness::Missing),
        Err(e) => return Err(e),
    };
    if !meta.is_file() {
        return Ok(Freshness::Missing);
    }
    if source_modified > meta.modified()? {
        Ok(Freshness::Stale)
    } else {
        Ok(Freshness::Fresh)
    }
}

/// Set a just-written version's mtime to `max(now, source mtime)`.
pub fn stamp(derived: &Path, source_modified: SystemTime) -> io::Result<()> {
    let mtime = SystemTime::now().max(source_modified);
    let file = fs::File::options().write(true).open(derived)?;
    file.set_modified(mtime)
}

/// Summary of resolution outcomes for a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolveStats {
    pub fresh: u32,
    pub created: u32,
    pub regenerated: u32,
    pub failed: u32,
}

impl ResolveStats {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Fresh => self.fresh += 1,
            Outcome::Created => self.created += 1,
            Outcome::Regenerated => self.regenerated += 1,
        }
    }

    pub fn fail(&mut self) {
        self.failed += 1;
    }

    pub fn merge(mut self, other: ResolveStats) -> Self {
        self.fresh += other.fresh;
        self.created += other.created;
        self.regenerated += other.regenerated;
        self.failed += other.failed;
        self
    }

    pub fn generated(&self) -> u32 {
        self.created + self.regenerated
    }

    pub fn total(&self) -> u32 {
        self.fresh + self.generated() + self.failed
    }
}

impl fmt::Display for ResolveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fresh, {} created, {} regenerated",
            self.fresh, self.created, self.regenerated
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        write!(f, " ({} total)", self.total())
    }
}
