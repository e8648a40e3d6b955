use std::path::PathBuf;
use std::sync::Arc;

use gallery::ImageSource;
use galleryconfig::GalleryConfig;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl std::str::FromStr for Antialiasing {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "off" | "none" | "0" | "1" => Ok(Self::Off),
            other => other
                .parse::<u32>()
                .ok()
                .filter(|count| count.is_power_of_two())
                .map(Self::Samples)
                .ok_or_else(|| format!("expected auto, off or a power-of-two sample count, got '{value}'")),
        }
    }
}

/// What we learned about the adapter wgpu picked.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    /// CPU rasterizers (llvmpipe, WARP, SwiftShader) report as `Cpu`.
    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Mirrors the CLI flags: which images to show, how large the window should
/// be and the gallery parameters to start from.
#[derive(Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Image identifiers in display order, resolved by `image_source`.
    pub images: Vec<String>,
    /// Decoder the atlas worker reads images through.
    pub image_source: Arc<dyn ImageSource>,
    /// Starting gallery parameters (already validated and clamped).
    pub gallery: GalleryConfig,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Where the export hotkey writes the atlas PNG.
    pub export_dir: PathBuf,
    /// Window title.
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antialiasing_parses_cli_values() {
        assert_eq!("auto".parse::<Antialiasing>(), Ok(Antialiasing::Auto));
        assert_eq!("OFF".parse::<Antialiasing>(), Ok(Antialiasing::Off));
        assert_eq!("1".parse::<Antialiasing>(), Ok(Antialiasing::Off));
        assert_eq!("4".parse::<Antialiasing>(), Ok(Antialiasing::Samples(4)));
        assert!("3".parse::<Antialiasing>().is_err());
        assert!("many".parse::<Antialiasing>().is_err());
    }
}
