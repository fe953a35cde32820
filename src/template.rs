//! Template tags over the resolver.
//!
//! Three tags, compiled once and rendered against a [`Context`]:
//!
//! ```text
//! {% version image.path 'medium' %}               → URL of the version
//! {% version image.path size 'img/missing.png' %} → ... or static fallback
//! {% version_object image.path 'medium' as thumb %}  binds `thumb`
//! {% version_setting 'medium' %}                     binds `version_setting`
//! ```
//!
//! Quoted arguments are literals; bare words are context variables, with
//! dotted names reaching into nested values. Literal presets are checked
//! against the registry when the tag is compiled, so a typo fails before
//! any page renders.
//!
//! Rendering never fails. Runtime problems (missing variables, unknown
//! presets from variables, unresolvable sources, generation errors) are
//! logged and produce the fallback or nothing.

use crate::config::PresetRegistry;
use crate::imaging::ArtifactGenerator;
use crate::resolver::VersionResolver;
use crate::types::Context;
use serde_json::Value;
use thiserror::Error;

/// Context slot bound by `version_setting`.
pub const SETTING_SLOT: &str = "version_setting";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("empty tag")]
    Empty,
    #[error("unknown tag '{0}'")]
    UnknownTag(String),
    #[error("{tag} tag requires {expected}")]
    MissingArguments { tag: String, expected: &'static str },
    #[error("{tag} tag had invalid arguments: {reason}")]
    InvalidArguments { tag: String, reason: String },
    #[error("{tag} tag received bad version preset '{preset}'")]
    BadPreset { tag: String, preset: String },
    #[error("unterminated quote in '{0}'")]
    UnterminatedQuote(String),
}

/// A tag argument: a quoted literal or a context variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Literal(String),
    Variable(String),
}

/// Value of an argument at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Lookup {
    Missing,
    Null,
    Text(String),
}

impl Arg {
    pub fn parse(token: &str) -> Arg {
        let bytes = token.as_bytes();
        if bytes.len() >= 2
            && bytes[0] == bytes[bytes.len() - 1]
            && matches!(bytes[0], b'"' | b'\'')
        {
            Arg::Literal(token[1..token.len() - 1].to_string())
        } else {
            Arg::Variable(token.to_string())
        }
    }

    fn lookup(&self, context: &Context) -> Lookup {
        match self {
            Arg::Literal(s) => Lookup::Text(s.clone()),
            Arg::Variable(name) => match lookup_variable(context, name) {
                None => Lookup::Missing,
                Some(Value::Null) => Lookup::Null,
                Some(value) => value_text(value).map_or(Lookup::Missing, Lookup::Text),
            },
        }
    }

    fn text(&self, context: &Context) -> Option<String> {
        match self.lookup(context) {
            Lookup::Text(s) => Some(s),
            Lookup::Missing | Lookup::Null => None,
        }
    }
}

/// Resolve a dotted variable name (`image.path`, `images.0.url`).
fn lookup_variable<'a>(context: &'a Context, name: &str) -> Option<&'a Value> {
    let mut parts = name.split('.');
    let mut value = context.get(parts.next()?)?;
    for part in parts {
        value = match value {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

/// Text form of a context value. Objects stand for themselves by `url`.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
        Value::Null | Value::Array(_) => None,
    }
}

/// Split tag contents on whitespace, keeping quoted runs together.
pub fn split_contents(contents: &str) -> Result<Vec<String>, TagError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in contents.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                current.push(c);
            }
        }
    }
    if quote.is_some() {
        return Err(TagError::UnterminatedQuote(contents.trim().to_string()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// `{% version src preset [fallback] %}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    pub source: Arg,
    pub preset: Arg,
    pub fallback: Option<Arg>,
}

/// `{% version_object src preset as var %}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionObjectTag {
    pub source: Arg,
    pub preset: Arg,
    pub var: String,
}

/// `{% version_setting preset %}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSettingTag {
    pub preset: Arg,
}

/// A compiled tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Version(VersionTag),
    VersionObject(VersionObjectTag),
    VersionSetting(VersionSettingTag),
}

impl Tag {
    /// Compile tag contents, with or without the `{% %}` delimiters.
    pub fn compile(contents: &str, registry: &PresetRegistry) -> Result<Tag, TagError> {
        let inner = contents.trim();
        let inner = inner
            .strip_prefix("{%")
            .and_then(|s| s.strip_suffix("%}"))
            .unwrap_or(inner);
        let tokens = split_contents(inner)?;
        let Some((name, args)) = tokens.split_first() else {
            return Err(TagError::Empty);
        };

        let tag = match name.as_str() {
            "version" => {
                if args.len() < 2 {
                    return Err(missing(name, "a source and a preset"));
                }
                if args.len() > 3 {
                    return Err(invalid(name, "expected at most 3 arguments"));
                }
                Tag::Version(VersionTag {
                    source: Arg::parse(&args[0]),
                    preset: Arg::parse(&args[1]),
                    fallback: args.get(2).map(|a| Arg::parse(a)),
                })
            }
            "version_object" => {
                let var = match args {
                    [_, _, kw, var] if kw == "as" => {
                        if !is_identifier(var) {
                            return Err(invalid(name, &format!("'{var}' is not a variable name")));
                        }
                        var.clone()
                    }
                    [] | [_] => return Err(missing(name, "a source and a preset")),
                    _ => return Err(invalid(name, "expected 'src preset as var'")),
                };
                Tag::VersionObject(VersionObjectTag {
                    source: Arg::parse(&args[0]),
                    preset: Arg::parse(&args[1]),
                    var,
                })
            }
            "version_setting" => match args {
                [preset] => Tag::VersionSetting(VersionSettingTag {
                    preset: Arg::parse(preset),
                }),
                [] => return Err(missing(name, "a preset")),
                _ => return Err(invalid(name, "expected exactly 1 argument")),
            },
            other => return Err(TagError::UnknownTag(other.to_string())),
        };

        if let Arg::Literal(preset) = tag.preset()
            && !registry.contains(preset)
        {
            return Err(TagError::BadPreset {
                tag: name.clone(),
                preset: preset.clone(),
            });
        }
        Ok(tag)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tag::Version(_) => "version",
            Tag::VersionObject(_) => "version_object",
            Tag::VersionSetting(_) => "version_setting",
        }
    }

    fn preset(&self) -> &Arg {
        match self {
            Tag::Version(t) => &t.preset,
            Tag::VersionObject(t) => &t.preset,
            Tag::VersionSetting(t) => &t.preset,
        }
    }

    /// Render against `context`. Binding tags write into `context` and
    /// render as an empty string.
    pub fn render<G: ArtifactGenerator>(
        &self,
        resolver: &VersionResolver<G>,
        context: &mut Context,
    ) -> String {
        match self {
            Tag::Version(t) => t.render(resolver, context),
            Tag::VersionObject(t) => {
                t.render(resolver, context);
                String::new()
            }
            Tag::VersionSetting(t) => {
                t.render(resolver, context);
                String::new()
            }
        }
    }
}

fn missing(tag: &str, expected: &'static str) -> TagError {
    TagError::MissingArguments {
        tag: tag.to_string(),
        expected,
    }
}

fn invalid(tag: &str, reason: &str) -> TagError {
    TagError::InvalidArguments {
        tag: tag.to_string(),
        reason: reason.to_string(),
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

impl VersionTag {
    fn render<G: ArtifactGenerator>(&self, resolver: &VersionResolver<G>, context: &Context) -> String {
        let Some(source) = self.source.text(context) else {
            tracing::debug!(source = ?self.source, "version source variable is unset");
            return self.fallback(resolver, context);
        };
        let preset = match self.preset.lookup(context) {
            Lookup::Text(preset) => preset,
            Lookup::Null => {
                return match resolver.source_url(&source) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::warn!(source = %source, error = %e, "version source unusable");
                        self.fallback(resolver, context)
                    }
                };
            }
            Lookup::Missing => {
                tracing::debug!(preset = ?self.preset, "version preset variable is unset");
                return self.fallback(resolver, context);
            }
        };

        match resolver.resolve(&source, &preset) {
            Ok(resolution) => resolution.url,
            Err(e) => {
                tracing::warn!(source = %source, preset = %preset, error = %e, "version unavailable, rendering fallback");
                self.fallback(resolver, context)
            }
        }
    }

    fn fallback<G: ArtifactGenerator>(&self, resolver: &VersionResolver<G>, context: &Context) -> String {
        self.fallback
            .as_ref()
            .and_then(|arg| arg.text(context))
            .map(|reference| format!("{}{}", resolver.config().static_url, reference))
            .unwrap_or_default()
    }
}

impl VersionObjectTag {
    fn render<G: ArtifactGenerator>(&self, resolver: &VersionResolver<G>, context: &mut Context) {
        let Some(source) = self.source.text(context) else {
            tracing::debug!(source = ?self.source, "version_object source variable is unset");
            return;
        };
        let preset = match self.preset.lookup(context) {
            Lookup::Text(preset) => preset,
            Lookup::Missing => {
                tracing::debug!(preset = ?self.preset, "version_object preset variable is unset");
                return;
            }
            Lookup::Null => {
                tracing::warn!(source = %source, "version_object preset is null");
                context.insert(self.var.clone(), Value::String(String::new()));
                return;
            }
        };

        if let Err(e) = resolver.resolve_into(&source, &preset, context, &self.var) {
            tracing::warn!(source = %source, preset = %preset, error = %e, "version_object unavailable");
        }
    }
}

impl VersionSettingTag {
    fn render<G: ArtifactGenerator>(&self, resolver: &VersionResolver<G>, context: &mut Context) {
        let Some(preset) = self.preset.text(context) else {
            tracing::debug!(preset = ?self.preset, "version_setting preset variable is unset");
            return;
        };
        match resolver.setting(&preset) {
            Ok(setting) => {
                let value = serde_json::to_value(setting).expect("preset must serialize");
                context.insert(SETTING_SLOT.to_string(), value);
            }
            Err(e) => tracing::warn!(preset = %preset, error = %e, "version_setting unavailable"),
        }
    }
}
