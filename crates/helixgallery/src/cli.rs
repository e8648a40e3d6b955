use std::path::PathBuf;

use clap::{Parser, Subcommand};
use galleryconfig::DebugMode;
use renderer::Antialiasing;

#[derive(Parser, Debug)]
#[command(
    name = "helixgallery",
    author,
    version,
    about = "Rotating helical image gallery",
    arg_required_else_help = false,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Images to show, in display order. Repeats share one atlas tile.
    #[arg(value_name = "IMAGE")]
    pub images: Vec<String>,

    /// TOML manifest listing `images = [...]`, relative to the manifest file.
    #[arg(long, value_name = "PATH", conflicts_with = "images")]
    pub manifest: Option<PathBuf>,

    /// Gallery configuration file; defaults to `gallery.toml` in the config directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Apply a named preset (built-in `default`, `green-scifi`, or one from the config).
    #[arg(long, value_name = "NAME", global = true)]
    pub preset: Option<String>,

    /// Diagnostic view: none, wireframe, flat, colors, atlas, or depth.
    #[arg(long, value_name = "MODE", value_parser = parse_debug_mode)]
    pub debug_mode: Option<DebugMode>,

    /// Override a numeric parameter, e.g. `--set gallery.radius=4.5`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_param_override, global = true)]
    pub overrides: Vec<ParamOverride>,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_antialias,
        default_value = "auto"
    )]
    pub antialias: Antialiasing,

    /// Directory the export hotkey writes atlas PNGs into.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Work with the texture atlas without opening a window.
    Atlas(AtlasCommand),
    /// Print the parameter schema, presets and enum names as JSON.
    Params,
}

#[derive(Parser, Debug)]
pub struct AtlasCommand {
    #[command(subcommand)]
    pub action: AtlasAction,
}

#[derive(Subcommand, Debug)]
pub enum AtlasAction {
    /// Build the atlas for a set of images and write it as PNG.
    Export(AtlasExportArgs),
}

#[derive(Parser, Debug)]
pub struct AtlasExportArgs {
    /// Destination PNG file.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Images to pack, in display order.
    #[arg(value_name = "IMAGE")]
    pub images: Vec<String>,

    /// TOML manifest listing `images = [...]`.
    #[arg(long, value_name = "PATH", conflicts_with = "images")]
    pub manifest: Option<PathBuf>,
}

/// One `--set key=value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamOverride {
    pub key: String,
    pub value: f32,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    if value.trim().is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }
    let parsed: Antialiasing = value.parse()?;
    if let Antialiasing::Samples(samples) = parsed {
        if !matches!(samples, 2 | 4 | 8 | 16) {
            return Err(format!(
                "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
            ));
        }
    }
    Ok(parsed)
}

pub fn parse_debug_mode(value: &str) -> Result<DebugMode, String> {
    value.parse()
}

pub fn parse_param_override(value: &str) -> Result<ParamOverride, String> {
    let (key, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{value}'"))?;
    let key = key.trim();
    if galleryconfig::param_spec(key).is_none() {
        return Err(format!(
            "unknown parameter '{key}'; run `helixgallery params` for the list"
        ));
    }
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid number '{}' for {key}", raw.trim()))?;
    Ok(ParamOverride {
        key: key.to_string(),
        value,
    })
}
