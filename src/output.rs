//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Presets
//!
//! ```text
//! admin_thumbnail  60x60 crop    Admin Thumbnail
//! big              w460          Big (6 col)
//! hero             w800 webp q80 Hero
//! ```
//!
//! ## Warm
//!
//! ```text
//! photos/dog.jpg [medium] created → /media/photos/_versions/dog_medium.jpg
//! photos/cat.png [medium] fresh → /media/photos/_versions/cat_medium.png
//! photos/bad.jpg [medium] FAILED: generating photos/_versions/bad_medium.jpg failed: ...
//!
//! Versions: 1 fresh, 1 created, 0 regenerated, 1 failed (3 total)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::ResolveStats;
use crate::config::{PresetRegistry, VersionPreset};
use crate::warm::WarmEvent;

// ============================================================================
// Presets
// ============================================================================

/// Compact geometry summary of a preset: `60x60 crop`, `w300`, `h200 up`.
pub fn preset_geometry(preset: &VersionPreset) -> String {
    let mut parts = vec![match (preset.width, preset.height) {
        (Some(w), Some(h)) if preset.crop => format!("{w}x{h} crop"),
        (Some(w), Some(h)) => format!("{w}x{h} fit"),
        (Some(w), None) => format!("w{w}"),
        (None, Some(h)) => format!("h{h}"),
        (None, None) => "original".to_string(),
    }];
    if preset.upscale {
        parts.push("up".to_string());
    }
    if let Some(format) = preset.format {
        parts.push(format.extension().to_string());
    }
    if let Some(q) = preset.quality {
        parts.push(format!("q{q}"));
    }
    parts.join(" ")
}

/// One aligned line per preset, sorted by name.
pub fn format_presets(registry: &PresetRegistry) -> Vec<String> {
    let rows: Vec<(&str, String, &str)> = registry
        .iter()
        .map(|(name, preset)| (name, preset_geometry(preset), preset.verbose_name.as_str()))
        .collect();
    let name_width = rows.iter().map(|(n, _, _)| n.len()).max().unwrap_or(0);
    let geometry_width = rows.iter().map(|(_, g, _)| g.len()).max().unwrap_or(0);
    rows.into_iter()
        .map(|(name, geometry, verbose)| {
            format!("{name:<name_width$}  {geometry:<geometry_width$}  {verbose}")
                .trim_end()
                .to_string()
        })
        .collect()
}

pub fn print_presets(registry: &PresetRegistry) {
    for line in format_presets(registry) {
        println!("{}", line);
    }
}

// ============================================================================
// Warm
// ============================================================================

/// Format a single warm progress event.
pub fn format_warm_event(event: &WarmEvent) -> String {
    match event {
        WarmEvent::Resolved {
            source,
            preset,
            resolution,
        } => format!(
            "{} [{}] {} \u{2192} {}",
            source,
            preset,
            resolution.outcome.label(),
            resolution.url
        ),
        WarmEvent::Failed {
            source,
            preset,
            error,
        } => format!("{} [{}] FAILED: {}", source, preset, error),
    }
}

pub fn format_warm_summary(stats: &ResolveStats) -> Vec<String> {
    vec![String::new(), format!("Versions: {}", stats)]
}

pub fn print_warm_summary(stats: &ResolveStats) {
    for line in format_warm_summary(stats) {
        println!("{}", line);
    }
}
