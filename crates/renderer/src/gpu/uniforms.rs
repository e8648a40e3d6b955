use bytemuck::{Pod, Zeroable};
use gallery::ShaderParams;
use glam::Mat4;

/// Uniform block shared by both stages. Every member is a `vec4` (or the
/// matrix) so the Rust layout is std140 without padding fields; the GLSL
/// comments in `common.glsl` name each lane.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug)]
pub(crate) struct GalleryUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub geometry: [f32; 4],
    pub motion: [f32; 4],
    pub frame: [f32; 4],
    pub tile: [f32; 4],
    pub image: [f32; 4],
    pub grading: [f32; 4],
    pub fade: [f32; 4],
    pub border_color: [f32; 4],
    pub border: [f32; 4],
    pub corners: [f32; 4],
    pub dither: [f32; 4],
    pub dither_style: [f32; 4],
    pub dither_bg: [f32; 4],
    pub dither_fg: [f32; 4],
}

unsafe impl Zeroable for GalleryUniforms {}
unsafe impl Pod for GalleryUniforms {}

/// Declaration order of the GLSL block members.
#[cfg(test)]
pub(crate) const UNIFORM_FIELDS: [&str; 15] = [
    "view_proj",
    "geometry",
    "motion",
    "frame",
    "tile",
    "image",
    "grading",
    "fade",
    "border_color",
    "border",
    "corners",
    "dither",
    "dither_style",
    "dither_bg",
    "dither_fg",
];

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl GalleryUniforms {
    pub fn new(params: &ShaderParams, view_proj: Mat4) -> Self {
        let vertex = &params.vertex;
        let surface = &params.surface;
        let border = &params.border;
        let corners = &params.corners;
        let dither = &params.dither;
        let grid = &params.grid;

        Self {
            view_proj: view_proj.to_cols_array_2d(),
            geometry: [vertex.scale, vertex.radius, vertex.curvature, vertex.rotation],
            motion: [
                vertex.scroll_offset,
                vertex.total_height,
                vertex.squeeze_amount,
                vertex.squeeze_width,
            ],
            frame: [
                params.time,
                params.debug.code() as f32,
                grid.cols,
                grid.tile_count,
            ],
            tile: [grid.stride.x, grid.stride.y, grid.extent.x, grid.extent.y],
            image: [
                surface.chromatic_aberration,
                surface.opacity,
                surface.emission,
                surface.saturation,
            ],
            grading: [
                surface.brightness,
                surface.scan_lines,
                surface.scan_line_speed,
                surface.scan_line_density,
            ],
            fade: [
                surface.fade_start,
                surface.fade_end,
                surface.flicker_intensity,
                surface.flicker_speed,
            ],
            border_color: border.color.extend(border.emission).to_array(),
            border: [border.width, border.radius, border.offset, 0.0],
            corners: [corners.size, corners.width, corners.offset, 0.0],
            dither: [
                flag(dither.is_active()),
                dither.cell_size,
                dither.gap,
                dither.contrast,
            ],
            dither_style: [
                dither.mode.code() as f32,
                dither.shape.code() as f32,
                dither.base_scale,
                dither.intensity,
            ],
            dither_bg: dither.bg_color.extend(flag(dither.use_color)).to_array(),
            dither_fg: dither.fg_color.extend(dither.aspect).to_array(),
        }
    }
}
