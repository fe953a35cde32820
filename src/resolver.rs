//! Version resolution: source + preset → up-to-date version on disk.
//!
//! [`VersionResolver::resolve`] computes the deterministic version path,
//! compares modification times, and generates the version when it is
//! missing or older than its source:
//!
//! ```text
//! resolve("photos/dog.jpg", "medium")
//!   preset lookup          → UnknownPreset
//!   source path + mtime    → SourceUnresolvable
//!   photos/_versions/dog_medium.jpg
//!     missing              → generate              (Created)
//!     older than source    → generate, force       (Regenerated)
//!     otherwise            → return as is          (Fresh)
//! ```
//!
//! ## Concurrency
//!
//! Generation is single-flight per version path: concurrent callers for the
//! same missing or stale version share one generation and its result. The
//! leader re-checks freshness inside the flight, so a caller that arrives
//! just after a generation finished does not repeat it.
//!
//! Generators write into a hidden temporary file next to the final path,
//! which is renamed into place once complete. Readers never observe a
//! partially written version.
//!
//! ## Timeouts
//!
//! Generation runs on a dedicated rayon pool and the caller waits at most
//! `generation.timeout_secs` (time spent queued behind other generations
//! counts). A job that finishes after its caller gave up discards its
//! temporary file.

use crate::cache::{self, Freshness};
use crate::config::{self, ConfigError, PresetRegistry, ResolverConfig, VersionPreset};
use crate::flight::SingleFlight;
use crate::imaging::{self, ArtifactGenerator, BackendError, Quality, RustBackend};
use crate::naming;
use crate::types::{Context, Outcome, Resolution, VersionObject};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

/// Why a version could not be resolved.
///
/// `Clone` so a single generation result can be handed to every caller
/// waiting on it.
#[derive(Error, Debug, Clone)]
pub enum VersionError {
    #[error("cannot resolve source: {0}")]
    SourceUnresolvable(String),
    #[error("unknown version preset '{0}'")]
    UnknownPreset(String),
    #[error("generating {} failed: {source}", path.display())]
    GenerationFailed {
        path: PathBuf,
        source: Arc<BackendError>,
    },
    #[error("generating {} timed out after {}s", path.display(), timeout.as_secs())]
    Timeout { path: PathBuf, timeout: Duration },
}

fn generation_failed(path: &Path, error: BackendError) -> VersionError {
    VersionError::GenerationFailed {
        path: path.to_path_buf(),
        source: Arc::new(error),
    }
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start generation pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Resolves versions against an immutable configuration.
pub struct VersionResolver<G: ArtifactGenerator = RustBackend> {
    config: ResolverConfig,
    registry: PresetRegistry,
    generator: Arc<G>,
    pool: rayon::ThreadPool,
    flights: SingleFlight<PathBuf, Result<Resolution, VersionError>>,
}

impl VersionResolver<RustBackend> {
    pub fn new(config: ResolverConfig) -> Result<Self, SetupError> {
        Self::with_generator(config, RustBackend::new())
    }
}

impl<G: ArtifactGenerator> VersionResolver<G> {
    /// Build a resolver around a specific generator (allows testing with a mock).
    pub fn with_generator(config: ResolverConfig, generator: G) -> Result<Self, SetupError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config::effective_threads(&config.generation))
            .thread_name(|i| format!("version-gen-{i}"))
            .panic_handler(|_| tracing::error!("version generation job panicked"))
            .build()?;
        let registry = config.registry();
        Ok(Self {
            config,
            registry,
            generator: Arc::new(generator),
            pool,
            flights: SingleFlight::new(),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn registry(&self) -> &PresetRegistry {
        &self.registry
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Absolute path of a media-relative path.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.config.media_root.join(relative)
    }

    /// Look up a preset's parameters. No filesystem access.
    pub fn setting(&self, preset: &str) -> Result<&VersionPreset, VersionError> {
        self.registry
            .lookup(preset)
            .ok_or_else(|| VersionError::UnknownPreset(preset.to_string()))
    }

    /// URL of the source itself, normalized. No filesystem access.
    pub fn source_url(&self, source: &str) -> Result<String, VersionError> {
        let path = self.source_path(source)?;
        Ok(naming::path_to_url(&path, &self.config.media_url))
    }

    /// Resolve `source` to its `preset` version, generating it if needed.
    pub fn resolve(&self, source: &str, preset_name: &str) -> Result<Resolution, VersionError> {
        let preset = self.setting(preset_name)?;
        let source_rel = self.source_path(source)?;
        let derived_rel = naming::version_path(
            &source_rel,
            preset_name,
            preset.format,
            &self.config.versions_dirname,
        );
        let source_abs = self.absolute(&source_rel);
        let derived_abs = self.absolute(&derived_rel);

        let source_mtime = self.source_modified(&source_abs, source)?;
        let freshness = cache::check_freshness(source_mtime, &derived_abs)
            .map_err(|e| generation_failed(&derived_rel, e.into()))?;
        if freshness == Freshness::Fresh {
            tracing::debug!(
                source = %source_rel.display(),
                preset = preset_name,
                "version is fresh"
            );
            return Ok(self.resolution(derived_rel, Outcome::Fresh));
        }

        self.flights.run(derived_abs.clone(), || {
            let source_mtime = self.source_modified(&source_abs, source)?;
            let outcome = match cache::check_freshness(source_mtime, &derived_abs)
                .map_err(|e| generation_failed(&derived_rel, e.into()))?
            {
                Freshness::Fresh => return Ok(self.resolution(derived_rel.clone(), Outcome::Fresh)),
                Freshness::Missing => Outcome::Created,
                Freshness::Stale => Outcome::Regenerated,
            };

            let started = Instant::now();
            let force = outcome == Outcome::Regenerated;
            if let Err(e) = self.generate(
                &source_abs,
                &derived_abs,
                &derived_rel,
                preset,
                source_mtime,
                force,
            ) {
                tracing::warn!(
                    source = %source_rel.display(),
                    preset = preset_name,
                    error = %e,
                    "version generation failed"
                );
                return Err(e);
            }
            tracing::info!(
                source = %source_rel.display(),
                preset = preset_name,
                version = %derived_rel.display(),
                outcome = outcome.label(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "generated version"
            );
            Ok(self.resolution(derived_rel.clone(), outcome))
        })
    }

    /// Resolve and bind the result into `context[slot]`.
    ///
    /// On success the slot holds a [`VersionObject`]; on failure an empty
    /// string, and the error is returned to the caller.
    pub fn resolve_into(
        &self,
        source: &str,
        preset: &str,
        context: &mut Context,
        slot: &str,
    ) -> Result<Resolution, VersionError> {
        match self.resolve(source, preset) {
            Ok(resolution) => {
                let object = self.version_object(&resolution);
                let value =
                    serde_json::to_value(object).expect("version object must serialize");
                context.insert(slot.to_string(), value);
                Ok(resolution)
            }
            Err(e) => {
                context.insert(slot.to_string(), serde_json::Value::String(String::new()));
                Err(e)
            }
        }
    }

    /// Describe a resolved version for template use.
    pub fn version_object(&self, resolution: &Resolution) -> VersionObject {
        let dims = self
            .generator
            .identify(&self.absolute(&resolution.path))
            .ok();
        VersionObject {
            path: resolution
                .url
                .strip_prefix(&self.config.media_url)
                .unwrap_or(&resolution.url)
                .to_string(),
            url: resolution.url.clone(),
            filename: resolution
                .path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
            extension: resolution
                .path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            width: dims.map(|d| d.width),
            height: dims.map(|d| d.height),
        }
    }

    fn source_path(&self, source: &str) -> Result<PathBuf, VersionError> {
        let path = naming::url_to_path(source, &self.config.media_url)
            .map_err(|e| VersionError::SourceUnresolvable(e.to_string()))?;
        if naming::is_version_path(&path, &self.config.versions_dirname) {
            return Err(VersionError::SourceUnresolvable(format!(
                "'{}' is itself a version",
                path.display()
            )));
        }
        Ok(path)
    }

    fn source_modified(&self, source_abs: &Path, reference: &str) -> Result<SystemTime, VersionError> {
        match cache::source_modified(source_abs) {
            Ok(Some(mtime)) => Ok(mtime),
            Ok(None) => Err(VersionError::SourceUnresolvable(format!(
                "'{}' does not exist",
                reference.trim()
            ))),
            Err(e) => Err(VersionError::SourceUnresolvable(format!(
                "cannot read '{}': {e}",
                reference.trim()
            ))),
        }
    }

    fn resolution(&self, path: PathBuf, outcome: Outcome) -> Resolution {
        Resolution {
            url: naming::path_to_url(&path, &self.config.media_url),
            path,
            outcome,
        }
    }

    /// Generate into a temp file on the pool, then rename into place.
    fn generate(
        &self,
        source_abs: &Path,
        derived_abs: &Path,
        derived_rel: &Path,
        preset: &VersionPreset,
        source_mtime: SystemTime,
        force: bool,
    ) -> Result<(), VersionError> {
        let failed = |e: BackendError| generation_failed(derived_rel, e);

        let dir = derived_abs.parent().unwrap_or(&self.config.media_root);
        std::fs::create_dir_all(dir).map_err(|e| failed(e.into()))?;
        let suffix = derived_abs
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let mut builder = tempfile::Builder::new();
        builder.prefix(".").suffix(&suffix);
        // Temp files default to 0o600; versions get what `File::create` would give them.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let temp = builder.tempfile_in(dir).map_err(|e| failed(e.into()))?;

        let (tx, rx) = mpsc::channel();
        let generator = Arc::clone(&self.generator);
        let source = source_abs.to_path_buf();
        let preset = preset.clone();
        let quality = Quality::new(self.config.quality);
        self.pool.spawn(move || {
            let output = temp.path().to_path_buf();
            let result =
                imaging::create_version(&*generator, &source, &output, &preset, quality, force)
                    .map(|_| temp);
            // Send fails once the caller has timed out; the temp file is dropped with it.
            let _ = tx.send(result);
        });

        let timeout = self.config.generation.timeout();
        let temp = match rx.recv_timeout(timeout) {
            Ok(Ok(temp)) => temp,
            Ok(Err(e)) => return Err(failed(e)),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(VersionError::Timeout {
                    path: derived_rel.to_path_buf(),
                    timeout,
                });
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(failed(BackendError::ProcessingFailed(
                    "generation job panicked".into(),
                )));
            }
        };

        temp.persist(derived_abs)
            .map_err(|e| failed(e.error.into()))?;
        cache::stamp(derived_abs, source_mtime).map_err(|e| failed(e.into()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockGenerator, RecordedOp};
    use crate::test_helpers::{list_dir, set_mtime, test_config, touch_source};
    use std::fs;
    use std::sync::Barrier;
    use tempfile::TempDir;

    fn resolver(tmp: &TempDir, generator: MockGenerator) -> VersionResolver<MockGenerator> {
        VersionResolver::with_generator(test_config(tmp.path()), generator).unwrap()
    }

    // =========================================================================
    // Create / fresh / regenerate
    // =========================================================================

    #[test]
    fn creates_missing_version_at_deterministic_path() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::new());
        let before = SystemTime::now() - Duration::from_secs(1);

        let res = r.resolve("photos/dog.jpg", "medium").unwrap();

        assert_eq!(res.path, PathBuf::from("photos/_versions/dog_medium.jpg"));
        assert_eq!(res.url, "/media/photos/_versions/dog_medium.jpg");
        assert_eq!(res.outcome, Outcome::Created);
        assert_eq!(r.generator().generate_count(), 1);

        let derived = tmp.path().join("photos/_versions/dog_medium.jpg");
        assert!(derived.is_file());
        let mtime = fs::metadata(&derived).unwrap().modified().unwrap();
        assert!(mtime >= before);
    }

    #[test]
    fn generator_writes_to_temp_path_not_final() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::new());

        r.resolve("photos/dog.jpg", "medium").unwrap();

        let ops = r.generator().get_operations();
        let output = ops
            .iter()
            .find_map(|op| match op {
                RecordedOp::Generate { output, force, .. } => Some((output.clone(), *force)),
                _ => None,
            })
            .unwrap();
        let final_path = tmp.path().join("photos/_versions/dog_medium.jpg");
        assert_ne!(PathBuf::from(&output.0), final_path);
        assert!(output.0.ends_with(".jpg"));
        assert!(!output.1, "create branch must not force");
        // Only the final file remains; the temp file was renamed away.
        assert_eq!(
            list_dir(&tmp.path().join("photos/_versions")),
            vec!["dog_medium.jpg"]
        );
    }

    #[test]
    fn second_resolve_is_fresh_without_regeneration() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::new());

        let first = r.resolve("photos/dog.jpg", "medium").unwrap();
        let derived = tmp.path().join(&first.path);
        let mtime = fs::metadata(&derived).unwrap().modified().unwrap();

        let second = r.resolve("photos/dog.jpg", "medium").unwrap();

        assert_eq!(second.path, first.path);
        assert_eq!(second.outcome, Outcome::Fresh);
        assert_eq!(r.generator().generate_count(), 1);
        assert_eq!(fs::metadata(&derived).unwrap().modified().unwrap(), mtime);
    }

    #[test]
    fn newer_source_regenerates_with_force() {
        let tmp = TempDir::new().unwrap();
        let source = touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::new());

        let first = r.resolve("photos/dog.jpg", "medium").unwrap();
        let derived = tmp.path().join(&first.path);
        let derived_mtime = fs::metadata(&derived).unwrap().modified().unwrap();
        let t1 = derived_mtime + Duration::from_secs(60);
        set_mtime(&source, t1);

        let again = r.resolve("photos/dog.jpg", "medium").unwrap();

        assert_eq!(again.path, first.path);
        assert_eq!(again.outcome, Outcome::Regenerated);
        assert_eq!(r.generator().generate_count(), 2);
        let new_mtime = fs::metadata(&derived).unwrap().modified().unwrap();
        assert!(new_mtime >= t1);
        assert!(r.generator().get_operations().iter().any(|op| matches!(
            op,
            RecordedOp::Generate { force: true, .. }
        )));

        // And it settles again.
        let third = r.resolve("photos/dog.jpg", "medium").unwrap();
        assert_eq!(third.outcome, Outcome::Fresh);
        assert_eq!(r.generator().generate_count(), 2);
    }

    #[test]
    fn presets_produce_distinct_versions() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "dog.jpg");
        let r = resolver(&tmp, MockGenerator::new());

        let medium = r.resolve("dog.jpg", "medium").unwrap();
        let small = r.resolve("dog.jpg", "small").unwrap();

        assert_ne!(medium.path, small.path);
        assert_eq!(small.path, PathBuf::from("_versions/dog_small.jpg"));
        assert_eq!(r.generator().generate_count(), 2);
    }

    #[test]
    fn preset_format_changes_extension() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::new());

        let res = r.resolve("photos/dog.jpg", "hero").unwrap();
        assert_eq!(res.path, PathBuf::from("photos/_versions/dog.jpg_hero.webp"));
    }

    #[test]
    fn same_stem_sources_get_separate_format_versions() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        touch_source(tmp.path(), "photos/dog.png");
        let r = resolver(&tmp, MockGenerator::new());

        let jpg = r.resolve("photos/dog.jpg", "hero").unwrap();
        let png = r.resolve("photos/dog.png", "hero").unwrap();

        assert_ne!(jpg.path, png.path);
        assert_eq!(jpg.outcome, Outcome::Created);
        assert_eq!(png.outcome, Outcome::Created);
        assert_eq!(r.generator().generate_count(), 2);
        assert_eq!(
            list_dir(&tmp.path().join("photos/_versions")),
            vec!["dog.jpg_hero.webp", "dog.png_hero.webp"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn version_gets_default_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::new());

        let res = r.resolve("photos/dog.jpg", "medium").unwrap();

        let plain = tmp.path().join("photos/plain.txt");
        fs::File::create(&plain).unwrap();
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&tmp.path().join(&res.path)), mode(&plain));
    }

    #[test]
    fn media_url_reference_resolves() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::new());

        let res = r.resolve("/media/photos/dog.jpg", "medium").unwrap();
        assert_eq!(res.path, PathBuf::from("photos/_versions/dog_medium.jpg"));
    }

    #[test]
    fn crop_preset_planned_from_source_dimensions() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::with_dimensions(1200, 800));

        r.resolve("photos/dog.jpg", "medium").unwrap();

        assert!(r.generator().get_operations().iter().any(|op| matches!(
            op,
            RecordedOp::Generate {
                width: 300,
                height: 300,
                crop: true,
                quality: 90,
                ..
            }
        )));
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn unknown_preset_fails_without_writing() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::new());

        let err = r.resolve("photos/dog.jpg", "nonexistent").unwrap_err();

        assert!(matches!(err, VersionError::UnknownPreset(ref p) if p == "nonexistent"));
        assert!(!tmp.path().join("photos/_versions").exists());
        assert!(r.generator().get_operations().is_empty());
    }

    #[test]
    fn unknown_preset_checked_before_source() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockGenerator::new());
        assert!(matches!(
            r.resolve("", "nonexistent"),
            Err(VersionError::UnknownPreset(_))
        ));
    }

    #[test]
    fn empty_source_is_unresolvable() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockGenerator::new());

        let err = r.resolve("", "medium").unwrap_err();

        assert!(matches!(err, VersionError::SourceUnresolvable(_)));
        assert!(list_dir(tmp.path()).is_empty());
    }

    #[test]
    fn missing_source_is_unresolvable() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockGenerator::new());

        let err = r.resolve("photos/ghost.jpg", "medium").unwrap_err();

        assert!(matches!(err, VersionError::SourceUnresolvable(ref m) if m.contains("does not exist")));
        assert!(list_dir(tmp.path()).is_empty());
        assert_eq!(r.generator().generate_count(), 0);
    }

    #[test]
    fn version_as_source_is_unresolvable() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/_versions/dog_medium.jpg");
        let r = resolver(&tmp, MockGenerator::new());

        assert!(matches!(
            r.resolve("photos/_versions/dog_medium.jpg", "small"),
            Err(VersionError::SourceUnresolvable(_))
        ));
    }

    #[test]
    fn generation_failure_leaves_no_files() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::failing("unsupported format"));

        let err = r.resolve("photos/dog.jpg", "medium").unwrap_err();

        match err {
            VersionError::GenerationFailed { path, source } => {
                assert_eq!(path, PathBuf::from("photos/_versions/dog_medium.jpg"));
                assert!(source.to_string().contains("unsupported format"));
            }
            other => panic!("expected GenerationFailed, got {other:?}"),
        }
        assert!(list_dir(&tmp.path().join("photos/_versions")).is_empty());
    }

    #[test]
    fn slow_generation_times_out() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let mut config = test_config(tmp.path());
        config.generation.timeout_secs = 1;
        let r = VersionResolver::with_generator(
            config,
            MockGenerator::slow(Duration::from_millis(2500)),
        )
        .unwrap();

        let err = r.resolve("photos/dog.jpg", "medium").unwrap_err();

        assert!(matches!(
            err,
            VersionError::Timeout { ref path, timeout }
                if path == Path::new("photos/_versions/dog_medium.jpg")
                    && timeout == Duration::from_secs(1)
        ));
        assert!(!tmp.path().join("photos/_versions/dog_medium.jpg").exists());
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    #[test]
    fn concurrent_resolves_generate_once() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::slow(Duration::from_millis(200)));
        let barrier = Barrier::new(8);

        let paths: Vec<PathBuf> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        r.resolve("photos/dog.jpg", "medium").unwrap().path
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(r.generator().generate_count(), 1);
        assert!(
            paths
                .iter()
                .all(|p| p == Path::new("photos/_versions/dog_medium.jpg"))
        );
    }

    #[test]
    fn concurrent_failures_are_shared() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let mut generator = MockGenerator::slow(Duration::from_millis(200));
        generator.fail_with = Some("corrupt".into());
        let r = resolver(&tmp, generator);
        let barrier = Barrier::new(4);

        let errors: Vec<VersionError> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        r.resolve("photos/dog.jpg", "medium").unwrap_err()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(r.generator().generate_count(), 1);
        assert!(
            errors
                .iter()
                .all(|e| matches!(e, VersionError::GenerationFailed { .. }))
        );
    }

    // =========================================================================
    // Secondary entry points
    // =========================================================================

    #[test]
    fn resolve_into_binds_version_object() {
        let tmp = TempDir::new().unwrap();
        touch_source(tmp.path(), "photos/dog.jpg");
        let r = resolver(&tmp, MockGenerator::with_dimensions(300, 300));
        let mut ctx = Context::new();

        r.resolve_into("photos/dog.jpg", "medium", &mut ctx, "thumb")
            .unwrap();

        let object: VersionObject = serde_json::from_value(ctx["thumb"].clone()).unwrap();
        assert_eq!(object.path, "photos/_versions/dog_medium.jpg");
        assert_eq!(object.url, "/media/photos/_versions/dog_medium.jpg");
        assert_eq!(object.filename, "dog_medium.jpg");
        assert_eq!(object.extension, "jpg");
        assert_eq!((object.width, object.height), (Some(300), Some(300)));
    }

    #[test]
    fn resolve_into_binds_empty_string_on_failure() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockGenerator::new());
        let mut ctx = Context::new();

        let err = r
            .resolve_into("photos/ghost.jpg", "medium", &mut ctx, "thumb")
            .unwrap_err();

        assert!(matches!(err, VersionError::SourceUnresolvable(_)));
        assert_eq!(ctx["thumb"], serde_json::json!(""));
    }

    #[test]
    fn setting_is_pure_lookup() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockGenerator::new());

        let preset = r.setting("medium").unwrap();
        assert_eq!((preset.width, preset.height), (Some(300), Some(300)));
        assert!(matches!(
            r.setting("huge"),
            Err(VersionError::UnknownPreset(_))
        ));
        assert!(list_dir(tmp.path()).is_empty());
        assert!(r.generator().get_operations().is_empty());
    }

    #[test]
    fn source_url_normalizes() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockGenerator::new());
        assert_eq!(
            r.source_url("./photos/dog.jpg").unwrap(),
            "/media/photos/dog.jpg"
        );
        assert!(r.source_url("").is_err());
    }

    #[test]
    fn invalid_config_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(tmp.path());
        config.quality = 0;
        assert!(matches!(
            VersionResolver::with_generator(config, MockGenerator::new()),
            Err(SetupError::Config(_))
        ));
    }
}
