use gallery::Atlas;
use image::imageops::FilterType;
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

/// GPU side of the texture atlas plus the bind group the fragment stage
/// samples it through.
pub(crate) struct AtlasTexture {
    _texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
    pub size: (u32, u32),
}

impl AtlasTexture {
    /// Stand-in bound until the first atlas build lands.
    pub fn placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let texel = RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]));
        Self::from_image(device, queue, layout, &texel, "placeholder atlas")
    }

    pub fn from_atlas(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        atlas: &Atlas,
    ) -> Self {
        let (width, height) = atlas.bitmap.dimensions();
        if width == 0 || height == 0 {
            return Self::placeholder(device, queue, layout);
        }

        let max_dimension = device.limits().max_texture_dimension_2d;
        match fit_within(width, height, max_dimension) {
            Some((fit_width, fit_height)) => {
                tracing::warn!(
                    width,
                    height,
                    max_dimension,
                    fit_width,
                    fit_height,
                    "texture atlas exceeds GPU limits; downscaling"
                );
                let scaled =
                    image::imageops::resize(&atlas.bitmap, fit_width, fit_height, FilterType::Triangle);
                Self::from_image(device, queue, layout, &scaled, "gallery atlas")
            }
            None => Self::from_image(device, queue, layout, &atlas.bitmap, "gallery atlas"),
        }
    }

    fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        bitmap: &RgbaImage,
        label: &str,
    ) -> Self {
        let (width, height) = bitmap.dimensions();
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                // colours go to a gamma surface untouched, so no sRGB decode
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            bitmap.as_raw(),
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("atlas bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            _texture: texture,
            bind_group,
            size: (width, height),
        }
    }
}

/// Uniformly scaled size that fits `max_dimension`, or `None` when the
/// bitmap already fits. Tile UVs are normalised, so scaling keeps them valid.
fn fit_within(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_dimension {
        return None;
    }
    let scaled = |value: u32| {
        let value = u64::from(value) * u64::from(max_dimension) / u64::from(longest);
        (value as u32).clamp(1, max_dimension)
    };
    Some((scaled(width), scaled(height)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atlas_within_limits_is_left_alone() {
        assert_eq!(fit_within(4096, 2048, 8192), None);
        assert_eq!(fit_within(8192, 8192, 8192), None);
    }

    #[test]
    fn oversized_atlas_keeps_aspect() {
        assert_eq!(fit_within(10280, 5140, 8192), Some((8192, 4096)));
        assert_eq!(fit_within(20000, 1, 8192), Some((8192, 1)));
    }
}
