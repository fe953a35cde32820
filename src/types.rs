//! Shared types returned by the resolver and bound into template contexts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Template variable context: name → JSON value.
///
/// Nested values are reachable from tag arguments with dotted names
/// (`image.url`).
pub type Context = BTreeMap<String, serde_json::Value>;

/// What `resolve` had to do to produce a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The version on disk was already up to date.
    Fresh,
    /// No version existed; one was generated.
    Created,
    /// The source was newer than the version; it was generated again.
    Regenerated,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Fresh => "fresh",
            Outcome::Created => "created",
            Outcome::Regenerated => "regenerated",
        }
    }
}

/// A resolved version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Path relative to the media root.
    pub path: PathBuf,
    /// Public URL under the media URL.
    pub url: String,
    pub outcome: Outcome,
}

/// A version as bound into a template context slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionObject {
    /// Path relative to the media root, `/`-separated.
    pub path: String,
    pub url: String,
    pub filename: String,
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}
