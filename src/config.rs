//! Resolver configuration and the version preset registry.
//!
//! Configuration is loaded once at startup from a `versions.toml` file and is
//! immutable afterwards. Stock defaults are overridden by the user file; the
//! result is validated before anything else sees it.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! media_root = "media"          # Directory holding sources and versions
//! media_url = "/media/"         # URL prefix that maps onto media_root
//! static_url = "/static/"       # Prefix for template fallback references
//! versions_dirname = "_versions"
//! quality = 90                  # Default encoding quality (1-100)
//!
//! [generation]
//! timeout_secs = 30             # Upper bound for a single generation
//! max_processes = 4             # Generation workers (omit for CPU cores)
//!
//! [versions.medium]
//! verbose_name = "Medium (4col)"
//! width = 300
//! height = 300
//! crop = true
//! upscale = false
//! quality = 85                  # Overrides the top-level quality
//! format = "webp"               # Output format (default: same as source)
//! ```
//!
//! ## Presets Replace, Everything Else Merges
//!
//! Tables are merged key by key on top of the stock defaults, except
//! `[versions]`: a user file that defines any preset defines the whole set.
//! Otherwise the stock presets could never be removed.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name looked up by the CLI.
pub const CONFIG_FILENAME: &str = "versions.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Directory holding both source media and generated versions.
    pub media_root: PathBuf,
    /// URL prefix under which `media_root` is served.
    pub media_url: String,
    /// URL prefix prepended to template fallback references.
    pub static_url: String,
    /// Name of the per-directory subdirectory that holds versions.
    pub versions_dirname: String,
    /// Default encoding quality for lossy formats.
    pub quality: u32,
    pub generation: GenerationConfig,
    /// Preset name → transformation parameters.
    pub versions: BTreeMap<String, VersionPreset>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("media"),
            media_url: "/media/".to_string(),
            static_url: "/static/".to_string(),
            versions_dirname: "_versions".to_string(),
            quality: 90,
            generation: GenerationConfig::default(),
            versions: stock_versions(),
        }
    }
}

impl ResolverConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if !self.media_url.ends_with('/') {
            return Err(ConfigError::Validation(
                "media_url must end with '/'".into(),
            ));
        }
        if !self.static_url.ends_with('/') {
            return Err(ConfigError::Validation(
                "static_url must end with '/'".into(),
            ));
        }
        if self.versions_dirname.is_empty()
            || self.versions_dirname.contains(['/', '\\'])
            || self.versions_dirname == "."
            || self.versions_dirname == ".."
        {
            return Err(ConfigError::Validation(
                "versions_dirname must be a single directory name".into(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "generation.timeout_secs must be greater than zero".into(),
            ));
        }
        for (name, preset) in &self.versions {
            if !is_valid_preset_name(name) {
                return Err(ConfigError::Validation(format!(
                    "versions.{name}: preset names may only contain letters, digits, '_' and '-'"
                )));
            }
            preset.validate(name)?;
        }
        Ok(())
    }

    /// Build the preset registry for this config.
    pub fn registry(&self) -> PresetRegistry {
        PresetRegistry::new(self.versions.clone())
    }
}

fn is_valid_preset_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Generation bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Seconds a single generation may take before it is reported as timed out.
    pub timeout_secs: u64,
    /// Maximum number of parallel generation workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_processes: None,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &GenerationConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Output encoding for a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
        }
    }
}

/// A named set of transformation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionPreset {
    /// Human-readable label shown in admin listings.
    #[serde(default)]
    pub verbose_name: String,
    /// Target width. Omit to scale by height only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Target height. Omit to scale by width only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Fill the width×height box and center-crop to it.
    #[serde(default)]
    pub crop: bool,
    /// Allow enlarging sources smaller than the target.
    #[serde(default)]
    pub upscale: bool,
    /// Encoding quality override for this preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    /// Output format. Defaults to the source file's format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

impl VersionPreset {
    /// A preset bounded by width only, like most of the stock set.
    pub fn width(verbose_name: &str, width: u32) -> Self {
        Self {
            verbose_name: verbose_name.to_string(),
            width: Some(width),
            height: None,
            crop: false,
            upscale: false,
            quality: None,
            format: None,
        }
    }

    /// A fixed-size cropped preset.
    pub fn cropped(verbose_name: &str, width: u32, height: u32) -> Self {
        Self {
            verbose_name: verbose_name.to_string(),
            width: Some(width),
            height: Some(height),
            crop: true,
            upscale: false,
            quality: None,
            format: None,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(format!("versions.{name}: {msg}")));
        match (self.width, self.height) {
            (None, None) => return invalid("width or height is required"),
            (Some(0), _) | (_, Some(0)) => return invalid("width and height must be non-zero"),
            (Some(_), None) | (None, Some(_)) if self.crop => {
                return invalid("crop requires both width and height");
            }
            _ => {}
        }
        if let Some(q) = self.quality
            && !(1..=100).contains(&q)
        {
            return invalid("quality must be 1-100");
        }
        Ok(())
    }
}

/// The stock preset set shipped with the media browser.
fn stock_versions() -> BTreeMap<String, VersionPreset> {
    BTreeMap::from([
        (
            "admin_thumbnail".to_string(),
            VersionPreset::cropped("Admin Thumbnail", 60, 60),
        ),
        (
            "thumbnail".to_string(),
            VersionPreset::cropped("Thumbnail (1 col)", 60, 60),
        ),
        ("small".to_string(), VersionPreset::width("Small (2 col)", 140)),
        ("medium".to_string(), VersionPreset::width("Medium (4col )", 300)),
        ("big".to_string(), VersionPreset::width("Big (6 col)", 460)),
        ("large".to_string(), VersionPreset::width("Large (8 col)", 680)),
    ])
}

/// Immutable name → preset lookup.
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: BTreeMap<String, VersionPreset>,
}

impl PresetRegistry {
    pub fn new(presets: BTreeMap<String, VersionPreset>) -> Self {
        Self { presets }
    }

    pub fn lookup(&self, name: &str) -> Option<&VersionPreset> {
        self.presets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    /// Preset names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VersionPreset)> {
        self.presets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ResolverConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge a user config on top of the stock defaults, then deserialize and
/// validate. A user `[versions]` table replaces the stock presets.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ResolverConfig, ConfigError> {
    let mut base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => {
            if ov.get("versions").is_some()
                && let toml::Value::Table(table) = &mut base
            {
                table.remove("versions");
            }
            merge_toml(base, ov)
        }
        None => base,
    };
    let config: ResolverConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// A missing file yields the stock defaults. A file that exists but is
/// malformed, has unknown keys, or fails validation is an error.
pub fn load_config(path: &Path) -> Result<ResolverConfig, ConfigError> {
    if !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `versions.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Media Versions Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory holding source media and generated versions.
media_root = "media"

# URL prefix under which media_root is served. Source references that are
# URLs must start with this prefix.
media_url = "/media/"

# Prefix for template fallback references (e.g. a placeholder image).
static_url = "/static/"

# Versions of photos/dog.jpg live in photos/<versions_dirname>/.
versions_dirname = "_versions"

# Default encoding quality for JPEG and AVIF output (1-100).
quality = 90

# ---------------------------------------------------------------------------
# Generation
# ---------------------------------------------------------------------------
[generation]
# A generation that takes longer than this is reported as timed out.
timeout_secs = 30

# Maximum parallel generation workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Version presets
# ---------------------------------------------------------------------------
# Defining any preset here replaces this whole set.
#
# width / height  target box; give one to scale proportionally
# crop            fill the box and center-crop (needs width and height)
# upscale         enlarge sources smaller than the target
# quality         per-preset quality override
# format          jpeg | png | gif | webp | avif (default: keep source format)

[versions.admin_thumbnail]
verbose_name = "Admin Thumbnail"
width = 60
height = 60
crop = true

[versions.thumbnail]
verbose_name = "Thumbnail (1 col)"
width = 60
height = 60
crop = true

[versions.small]
verbose_name = "Small (2 col)"
width = 140

[versions.medium]
verbose_name = "Medium (4col )"
width = 300

[versions.big]
verbose_name = "Big (6 col)"
width = 460

[versions.large]
verbose_name = "Large (8 col)"
width = 680
"##
}
