//! # Media Versions
//!
//! On-demand image versions (thumbnails, resized and cropped copies) for a
//! media tree. A template or a script asks for `photos/dog.jpg` in preset
//! `medium`; the resolver answers with `photos/_versions/dog_medium.jpg`,
//! generating or regenerating it first when needed.
//!
//! # Architecture: A Version-Resolution Cache
//!
//! ```text
//! source ref + preset
//!   │
//!   ├─ preset lookup        (config::PresetRegistry)
//!   ├─ ref → media path     (naming)
//!   ├─ derived path         (naming)
//!   ├─ freshness by mtime   (cache)
//!   │    fresh → done
//!   │    missing / stale → single-flight (flight) → generate (imaging)
//!   └─ Resolution { path, url, outcome }
//! ```
//!
//! The derived file is the only state. Whether it exists, and whether it is
//! older than its source, decides everything; there is no manifest or index
//! to drift out of sync with the filesystem.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`resolver`] | `resolve`, `resolve_into`, `setting`: the cache itself |
//! | [`config`] | `versions.toml` loading, validation, and the preset registry |
//! | [`naming`] | Source reference ↔ media path ↔ URL, version path layout |
//! | [`cache`] | Freshness checks by modification time, batch stats |
//! | [`flight`] | Per-key single-flight so concurrent callers generate once |
//! | [`imaging`] | Pure-Rust decode, resize, crop, and encode behind a trait |
//! | [`template`] | `version`, `version_object`, `version_setting` tags |
//! | [`warm`] | Parallel pre-generation over a media tree |
//! | [`types`] | Shared result types (`Resolution`, `VersionObject`, `Context`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Deterministic Paths
//!
//! A version's path is a pure function of source path and preset name
//! (plus the preset's output format). Two processes that never talk to each
//! other agree on where a version lives, and a web server can serve versions
//! straight from disk without consulting this crate.
//!
//! ## Fail Soft in Templates, Fail Loud at Compile Time
//!
//! A broken image reference must not take a page down, so rendering never
//! returns an error: it logs and falls back. A misspelled literal preset is
//! a programming error, so it is rejected when the tag is compiled.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling, AVIF
//! via `rav1e`). No ImageMagick, no system libraries; the binary is
//! self-contained.
//!
//! ## Writes Are Atomic
//!
//! Versions are written to a hidden temporary file and renamed into place,
//! so a concurrent reader (or a web server) sees either the old version or
//! the complete new one.

pub mod cache;
pub mod config;
pub mod flight;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod resolver;
pub mod template;
pub mod types;
pub mod warm;

#[cfg(test)]
pub(crate) mod test_helpers;
