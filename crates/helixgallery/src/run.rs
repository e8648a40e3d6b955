use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use gallery::{build_atlas, FsImageSource};
use galleryconfig::{DebugMode, DitherMode, DitherShape, GalleryConfig, PARAMS};
use renderer::{Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{AtlasAction, AtlasCommand, AtlasExportArgs, Cli, Command, RunArgs};
use crate::manifest::ImageList;
use crate::paths::AppPaths;
use crate::settings::{finalise_config, read_config_file, ConfigOverrides};

const DEFAULT_SURFACE_SIZE: (u32, u32) = (1600, 900);

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(
        config = %paths.config_dir().display(),
        data = %paths.data_dir().display(),
        "resolved helixgallery paths"
    );

    match cli.command {
        Some(Command::Atlas(AtlasCommand {
            action: AtlasAction::Export(args),
        })) => export_atlas(&args),
        Some(Command::Params) => print_params(&cli.run, &paths),
        None => run_gallery(&cli.run, &paths),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &RunArgs, paths: &AppPaths) -> Result<GalleryConfig> {
    let config = match args.config.as_deref() {
        Some(path) => read_config_file(path, true)?,
        None => read_config_file(&paths.config_file(), false)?,
    };
    finalise_config(
        config,
        &ConfigOverrides {
            preset: args.preset.as_deref(),
            debug: args.debug_mode,
            params: &args.overrides,
        },
    )
}

fn run_gallery(args: &RunArgs, paths: &AppPaths) -> Result<()> {
    let gallery = load_config(args, paths)?;
    let images = ImageList::resolve(args.manifest.as_deref(), &args.images)?;
    let surface_size = args
        .size
        .as_deref()
        .map(parse_surface_size)
        .transpose()?
        .unwrap_or(DEFAULT_SURFACE_SIZE);
    let export_dir = args
        .export_dir
        .clone()
        .unwrap_or_else(|| paths.export_dir());

    tracing::info!(
        images = images.images.len(),
        preset = gallery.preset.as_deref().unwrap_or("none"),
        debug = %gallery.debug,
        width = surface_size.0,
        height = surface_size.1,
        "starting helix gallery"
    );

    let config = RendererConfig {
        surface_size,
        images: images.images,
        image_source: Arc::new(FsImageSource::new(images.root)),
        gallery,
        antialiasing: args.antialias,
        export_dir,
        title: "helixgallery".to_string(),
    };
    Renderer::new(config).run()
}

fn export_atlas(args: &AtlasExportArgs) -> Result<()> {
    let images = ImageList::resolve(args.manifest.as_deref(), &args.images)?;
    if images.images.is_empty() {
        bail!("no images to pack; pass image paths or --manifest");
    }

    let source = FsImageSource::new(images.root);
    let atlas = build_atlas(&images.images, &source);
    for id in &atlas.failed {
        tracing::warn!(image = %id, "image left blank in exported atlas");
    }
    atlas
        .export_png(&args.output)
        .with_context(|| format!("failed to export atlas to {}", args.output.display()))?;
    Ok(())
}

fn print_params(args: &RunArgs, paths: &AppPaths) -> Result<()> {
    let config = load_config(args, paths)?;
    let presets: BTreeMap<String, _> = config
        .preset_names()
        .into_iter()
        .filter_map(|name| config.find_preset(&name).map(|preset| (name, preset)))
        .collect();
    let values: BTreeMap<&str, f32> = PARAMS
        .iter()
        .filter_map(|spec| config.get(spec.key).map(|value| (spec.key, value)))
        .collect();

    let dump = serde_json::json!({
        "version": config.version,
        "params": PARAMS,
        "values": values,
        "instances": config.gallery.instances,
        "presets": presets,
        "debug_modes": DebugMode::ALL.iter().map(|mode| mode.name()).collect::<Vec<_>>(),
        "dither_modes": DitherMode::ALL.iter().map(|mode| mode.name()).collect::<Vec<_>>(),
        "dither_shapes": DitherShape::ALL.iter().map(|shape| shape.name()).collect::<Vec<_>>(),
    });
    let text = serde_json::to_string_pretty(&dump).context("failed to encode parameter schema")?;
    println!("{text}");
    Ok(())
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32)> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH format, e.g. 1600x900"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        bail!("surface dimensions must be greater than zero");
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_parses_common_forms() {
        assert_eq!(parse_surface_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_surface_size(" 800 X 600 ").unwrap(), (800, 600));
        assert!(parse_surface_size("1280").is_err());
        assert!(parse_surface_size("0x720").is_err());
        assert!(parse_surface_size("widexhigh").is_err());
    }
}
