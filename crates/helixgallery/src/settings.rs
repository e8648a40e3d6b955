use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use galleryconfig::{DebugMode, GalleryConfig};

use crate::cli::ParamOverride;

/// Command-line adjustments layered over the configuration file.
#[derive(Debug, Default)]
pub struct ConfigOverrides<'a> {
    pub preset: Option<&'a str>,
    pub debug: Option<DebugMode>,
    pub params: &'a [ParamOverride],
}

/// Reads `path`, or returns defaults when `required` is false and the file
/// does not exist.
pub fn read_config_file(path: &Path, required: bool) -> Result<GalleryConfig> {
    if !required && !path.exists() {
        tracing::debug!(path = %path.display(), "no gallery config found; using defaults");
        return Ok(GalleryConfig::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read gallery config {}", path.display()))?;
    let config = GalleryConfig::from_toml_str(&text)
        .with_context(|| format!("invalid gallery config {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded gallery config");
    Ok(config)
}

/// Applies the preset, clamps every parameter, then lays the explicit
/// `--set` values and the debug view on top.
pub fn finalise_config(mut config: GalleryConfig, overrides: &ConfigOverrides<'_>) -> Result<GalleryConfig> {
    if let Some(name) = overrides.preset {
        config.preset = Some(name.to_string());
    }
    config.validate()?;
    let clamped = config.prepare()?;
    if !clamped.is_empty() {
        tracing::info!(count = clamped.len(), "configuration values clamped into range");
    }

    for param in overrides.params {
        let applied = config
            .set(&param.key, param.value)
            .with_context(|| format!("failed to apply --set {}", param.key))?;
        tracing::debug!(param = %param.key, value = applied, "parameter override");
    }

    if let Some(mode) = overrides.debug {
        config.debug = mode;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_optional_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = read_config_file(&dir.path().join("gallery.toml"), false).unwrap();
        assert_eq!(config, GalleryConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_config_file(&dir.path().join("nope.toml"), true).is_err());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gallery.toml");
        fs::write(&path, "version = 1\n[gallery]\nradius = 40.0\ninstances = 900\n").unwrap();

        let config = read_config_file(&path, true).unwrap();
        let config = finalise_config(config, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.gallery.radius, 10.0);
        assert_eq!(config.gallery.instances, 256);
    }

    #[test]
    fn command_line_overrides_win() {
        let params = [ParamOverride {
            key: "gallery.radius".into(),
            value: 4.5,
        }];
        let overrides = ConfigOverrides {
            preset: Some("green-scifi"),
            debug: Some(DebugMode::Wireframe),
            params: &params,
        };
        let config = finalise_config(GalleryConfig::default(), &overrides).unwrap();
        assert_eq!(config.preset.as_deref(), Some("green-scifi"));
        assert_eq!(config.debug, DebugMode::Wireframe);
        assert_eq!(config.gallery.radius, 4.5);
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let overrides = ConfigOverrides {
            preset: Some("sepia"),
            ..ConfigOverrides::default()
        };
        assert!(finalise_config(GalleryConfig::default(), &overrides).is_err());
    }
}
