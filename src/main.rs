use clap::{Parser, Subcommand};
use media_versions::resolver::VersionResolver;
use media_versions::template::Tag;
use media_versions::types::Context;
use media_versions::warm::{self, WarmOptions};
use media_versions::{config, output};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "media-versions")]
#[command(about = "Resolve and pre-generate image versions for a media tree")]
#[command(long_about = "\
Resolve and pre-generate image versions for a media tree

A version is a resized or cropped copy of a source image, named by a preset
and stored next to its source:

  media/
  └── photos/
      ├── dog.jpg                  # Source
      └── _versions/
          ├── dog_medium.jpg       # Version (preset 'medium')
          └── dog_thumbnail.jpg    # Version (preset 'thumbnail')

Versions are generated on first use and regenerated whenever the source is
modified after them. Presets, paths, and limits come from versions.toml.

Run 'media-versions gen-config' to generate a documented versions.toml.")]
#[command(version)]
struct Cli {
    /// Config file (stock defaults when missing)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Media root directory (overrides the config file)
    #[arg(long, global = true)]
    media_root: Option<PathBuf>,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one version and print its URL, generating it if needed
    Resolve {
        /// Source path under the media root, or URL under media_url
        source: String,
        /// Preset name
        preset: String,
        /// Static reference printed (prefixed with static_url) on failure
        #[arg(long)]
        fallback: Option<String>,
    },
    /// Print a preset's parameters as JSON
    Setting {
        /// Preset name
        preset: String,
    },
    /// List configured presets
    Presets,
    /// Compile and render a template tag, e.g. "version image 'medium'"
    Render {
        /// Tag contents, with or without {% %}
        tag: String,
        /// Context variable as name=value (value parsed as JSON, else string)
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, serde_json::Value)>,
    },
    /// Generate every missing or stale version under a directory
    Warm {
        /// Only these presets (repeatable; default: all)
        #[arg(long = "preset")]
        presets: Vec<String>,
        /// Directory under the media root (default: whole media root)
        dir: Option<PathBuf>,
    },
    /// Print a stock versions.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let load = || -> Result<VersionResolver, Box<dyn std::error::Error>> {
        let mut cfg = config::load_config(&cli.config)?;
        if let Some(root) = &cli.media_root {
            cfg.media_root = root.clone();
        }
        Ok(VersionResolver::new(cfg)?)
    };

    match cli.command {
        Command::Resolve {
            source,
            preset,
            fallback,
        } => {
            let resolver = load()?;
            match resolver.resolve(&source, &preset) {
                Ok(resolution) => println!("{}", resolution.url),
                Err(e) => match fallback {
                    Some(fallback) => {
                        tracing::warn!(source = %source, preset = %preset, error = %e, "printing fallback");
                        println!("{}{}", resolver.config().static_url, fallback);
                    }
                    None => return Err(e.into()),
                },
            }
        }
        Command::Setting { preset } => {
            let resolver = load()?;
            let setting = resolver.setting(&preset)?;
            println!("{}", serde_json::to_string_pretty(setting)?);
        }
        Command::Presets => output::print_presets(load()?.registry()),
        Command::Render { tag, set } => {
            let resolver = load()?;
            let tag = Tag::compile(&tag, resolver.registry())?;
            let mut context: Context = set.into_iter().collect();
            let before = context.clone();
            let rendered = tag.render(&resolver, &mut context);
            if !rendered.is_empty() {
                println!("{}", rendered);
            }
            for (name, value) in &context {
                if before.get(name) != Some(value) {
                    println!("{} = {}", name, serde_json::to_string_pretty(value)?);
                }
            }
        }
        Command::Warm { presets, dir } => {
            let resolver = load()?;
            let options = WarmOptions { dir, presets };
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    println!("{}", output::format_warm_event(&event));
                }
            });
            let stats = warm::warm(&resolver, &options, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let stats = stats?;
            output::print_warm_summary(&stats);
            if stats.failed > 0 {
                return Err(format!("{} version(s) failed", stats.failed).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` applies when no `-v` is given.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse `name=value`; the value is JSON when it parses as JSON, else a string.
fn parse_assignment(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    if name.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}
