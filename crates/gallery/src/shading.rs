//! CPU mirror of the gallery shader program.
//!
//! The GLSL in the renderer crate is the source of truth on screen; the
//! functions here evaluate the same math on the CPU so placement, masking and
//! dithering can be unit tested and inspected without a GPU.
//!
//! Fragment stages run in a fixed order: tile lookup, chromatic sampling,
//! dither, colour grading, scan lines, edge darkening, emission, border and
//! corner overlay, then distance fade and flicker.

use std::f32::consts::PI;

use glam::{Vec2, Vec3, Vec4};
use galleryconfig::{DebugMode, DitherMode, DitherShape};
use image::RgbaImage;

use crate::atlas::{Atlas, AtlasLayout};
use crate::mesh::PLANE_ASPECT;

const LUMA: Vec3 = Vec3::new(0.299, 0.587, 0.114);
/// Anti-aliasing band of the card outline, in card UV units.
const EDGE_AA: f32 = 0.005;

/// Anything the fragment stage can read texels from.
pub trait TextureSampler {
    /// Nearest texel at `uv` (`v` pointing down), RGBA in `[0, 1]`.
    fn sample(&self, uv: Vec2) -> Vec4;
}

impl TextureSampler for RgbaImage {
    fn sample(&self, uv: Vec2) -> Vec4 {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return Vec4::ZERO;
        }
        let x = ((uv.x * width as f32).floor() as i64).clamp(0, width as i64 - 1) as u32;
        let y = ((uv.y * height as f32).floor() as i64).clamp(0, height as i64 - 1) as u32;
        let [r, g, b, a] = self.get_pixel(x, y).0;
        Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
    }
}

impl TextureSampler for Atlas {
    fn sample(&self, uv: Vec2) -> Vec4 {
        self.bitmap.sample(uv)
    }
}

/// Tile addressing in normalised atlas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub cols: f32,
    pub tile_count: f32,
    /// Distance between tile origins, gutter included.
    pub stride: Vec2,
    /// Size of the drawable part of one tile.
    pub extent: Vec2,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            cols: 1.0,
            tile_count: 1.0,
            stride: Vec2::ONE,
            extent: Vec2::ONE,
        }
    }
}

impl TileGrid {
    pub fn from_layout(layout: &AtlasLayout) -> Self {
        let size = Vec2::new(layout.width() as f32, layout.height() as f32);
        let tile = Vec2::new(layout.tile_width as f32, layout.tile_height as f32);
        Self {
            cols: layout.cols as f32,
            tile_count: layout.unique_count.max(1) as f32,
            stride: (tile + layout.padding as f32) / size,
            extent: tile / size,
        }
    }

    /// Atlas UV for a plane-local UV inside `tile`. Local coordinates are
    /// clamped so offset lookups stay inside the tile.
    pub fn uv(&self, tile: f32, local: Vec2) -> Vec2 {
        let index = (tile + 0.5).floor().clamp(0.0, self.tile_count - 1.0);
        let col = glsl_mod(index, self.cols);
        let row = (index / self.cols).floor();
        let local = local.clamp(Vec2::ZERO, Vec2::ONE);
        Vec2::new(
            col * self.stride.x + local.x * self.extent.x,
            row * self.stride.y + (1.0 - local.y) * self.extent.y,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexParams {
    pub scale: f32,
    pub radius: f32,
    pub curvature: f32,
    pub rotation: f32,
    pub scroll_offset: f32,
    pub total_height: f32,
    pub squeeze_amount: f32,
    pub squeeze_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceParams {
    pub chromatic_aberration: f32,
    pub opacity: f32,
    pub emission: f32,
    pub saturation: f32,
    pub brightness: f32,
    pub scan_lines: f32,
    pub scan_line_speed: f32,
    pub scan_line_density: f32,
    pub fade_start: f32,
    pub fade_end: f32,
    pub flicker_intensity: f32,
    pub flicker_speed: f32,
}

impl SurfaceParams {
    /// Leaves the sampled colour untouched.
    pub const NEUTRAL: SurfaceParams = SurfaceParams {
        chromatic_aberration: 0.0,
        opacity: 1.0,
        emission: 0.0,
        saturation: 1.0,
        brightness: 1.0,
        scan_lines: 0.0,
        scan_line_speed: 0.0,
        scan_line_density: 0.0,
        fade_start: 999.0,
        fade_end: 999.0,
        flicker_intensity: 0.0,
        flicker_speed: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderStyle {
    pub width: f32,
    pub color: Vec3,
    pub emission: f32,
    pub radius: f32,
    pub offset: f32,
}

impl BorderStyle {
    pub const HIDDEN: BorderStyle = BorderStyle {
        width: 0.0,
        color: Vec3::ONE,
        emission: 0.0,
        radius: 0.0,
        offset: 0.0,
    };

    pub fn glow(&self) -> Vec3 {
        self.color * (1.0 + self.emission)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerStyle {
    pub size: f32,
    pub width: f32,
    pub offset: f32,
}

impl CornerStyle {
    pub const HIDDEN: CornerStyle = CornerStyle {
        size: 0.0,
        width: 0.0,
        offset: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DitherStyle {
    pub enabled: bool,
    /// Cell edge as a percentage of the card height.
    pub cell_size: f32,
    pub gap: f32,
    pub contrast: f32,
    pub mode: DitherMode,
    pub shape: DitherShape,
    pub base_scale: f32,
    pub intensity: f32,
    pub bg_color: Vec3,
    pub fg_color: Vec3,
    pub use_color: bool,
    pub aspect: f32,
}

impl DitherStyle {
    /// A zero cell size has no grid to scan and behaves as disabled.
    pub fn is_active(&self) -> bool {
        self.enabled && self.cell_size > 0.0
    }
}

impl Default for DitherStyle {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_size: 2.0,
            gap: 0.0,
            contrast: 0.0,
            mode: DitherMode::Flat,
            shape: DitherShape::Circle,
            base_scale: 1.0,
            intensity: 0.0,
            bg_color: Vec3::ZERO,
            fg_color: Vec3::ONE,
            use_color: true,
            aspect: PLANE_ASPECT,
        }
    }
}

/// Everything the shader program reads for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderParams {
    pub time: f32,
    pub debug: DebugMode,
    pub vertex: VertexParams,
    pub surface: SurfaceParams,
    pub border: BorderStyle,
    pub corners: CornerStyle,
    pub dither: DitherStyle,
    pub grid: TileGrid,
}

/// Vertex stage output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedVertex {
    pub position: Vec3,
    pub depth_fade: f32,
    pub world_y: f32,
}

/// Interpolated inputs of one fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub uv: Vec2,
    pub tile: f32,
    pub depth_fade: f32,
    pub world_y: f32,
    pub instance: u32,
}

/// Wraps `y` into `[-total/2, total/2)` so cards scroll endlessly.
pub fn wrap_height(y: f32, total_height: f32) -> f32 {
    if total_height <= 0.0 {
        return y;
    }
    glsl_mod(y + total_height * 0.5, total_height) - total_height * 0.5
}

/// Radius after the hourglass pinch around `y = 0`.
pub fn squeezed_radius(params: &VertexParams, y: f32) -> f32 {
    let width = params.squeeze_width.max(f32::EPSILON);
    let gauss = (-(y * y) / (width * width)).exp();
    params.radius * (1.0 - params.squeeze_amount * gauss)
}

/// Bends a card vertex around the cylinder.
pub fn place_vertex(
    params: &VertexParams,
    local: Vec2,
    angle_offset: f32,
    position_y: f32,
) -> PlacedVertex {
    let scaled = local * params.scale;
    let y = wrap_height(position_y + params.scroll_offset, params.total_height) + scaled.y;
    let radius = squeezed_radius(params, y);
    let theta = scaled.x / (radius * params.curvature);
    let angle = angle_offset + params.rotation + theta;
    let position = Vec3::new(angle.sin() * radius, y, angle.cos() * radius);
    PlacedVertex {
        position,
        depth_fade: smoothstep(-radius, radius * 0.5, position.z),
        world_y: y,
    }
}

/// Shades one fragment the way the GPU program does.
pub fn shade_fragment(
    params: &ShaderParams,
    texture: &dyn TextureSampler,
    fragment: &Fragment,
) -> Vec4 {
    let grid = &params.grid;
    match params.debug {
        DebugMode::None => {}
        DebugMode::Wireframe => return Vec4::ONE,
        DebugMode::Flat => {
            let texel = texture.sample(grid.uv(fragment.tile, fragment.uv));
            return texel.truncate().extend(1.0);
        }
        DebugMode::Colors => return instance_color(fragment.instance).extend(1.0),
        DebugMode::Depth => return Vec3::splat(fragment.depth_fade).extend(1.0),
        DebugMode::Atlas => {
            let uv = Vec2::new(fragment.uv.x, 1.0 - fragment.uv.y);
            return texture.sample(uv).truncate().extend(1.0);
        }
    }

    let surface = &params.surface;
    let uv = fragment.uv;
    let centered = uv - 0.5;
    let half_size = Vec2::splat(0.5);

    let image_distance = sd_rounded_box(centered, half_size, params.border.radius);
    let image_mask = 1.0 - smoothstep(-EDGE_AA, EDGE_AA, image_distance);
    let border_mask = border_mask(&params.border, centered);

    let ca = surface.chromatic_aberration * (0.3 + 0.7 * (1.0 - fragment.depth_fade));
    let ca_offset = Vec2::new(ca, 0.0);
    let mut color = Vec3::new(
        texture.sample(grid.uv(fragment.tile, uv + ca_offset)).x,
        texture.sample(grid.uv(fragment.tile, uv)).y,
        texture.sample(grid.uv(fragment.tile, uv - ca_offset)).z,
    );

    let mut dither_alpha = 1.0;
    let dither_active = params.dither.is_active();
    if dither_active {
        let dithered = apply_dither(&params.dither, grid, texture, fragment.tile, uv);
        color = dithered.truncate();
        dither_alpha = dithered.w;
    }

    let lum = color.dot(LUMA);
    color = Vec3::splat(lum).lerp(color, surface.saturation);
    color *= surface.brightness;

    if surface.scan_lines > 0.0 {
        color *= scan_line_factor(surface, fragment.world_y, params.time);
    }

    let darkening = smoothstep(0.0, 0.5, fragment.depth_fade);
    color *= mix(0.15, 1.0, darkening);
    color += color * surface.emission;

    let mut image_alpha = image_mask;
    if dither_active {
        image_alpha *= dither_alpha;
    }

    let glow = params.border.glow();
    color = color.lerp(glow, border_mask);
    let corners = corner_mask(
        uv,
        params.corners.size,
        params.corners.width,
        params.corners.offset,
    );
    color = color.lerp(glow, corners);

    let distance_fade = 1.0 - smoothstep(surface.fade_start, surface.fade_end, fragment.world_y.abs());
    let flicker = flicker(surface.flicker_intensity, surface.flicker_speed, params.time);

    let alpha = image_alpha.max(border_mask.max(corners));
    (color * flicker).extend(alpha * surface.opacity * distance_fade)
}

/// Anti-aliased coverage of the card's rounded outline.
pub fn image_mask(uv: Vec2, corner_radius: f32) -> f32 {
    let distance = sd_rounded_box(uv - 0.5, Vec2::splat(0.5), corner_radius);
    1.0 - smoothstep(-EDGE_AA, EDGE_AA, distance)
}

/// Stroke band of `width` running inside an outline inset by `offset`.
pub fn border_mask(border: &BorderStyle, centered: Vec2) -> f32 {
    let distance = sd_rounded_box(centered, Vec2::splat(0.5 - border.offset), border.radius);
    let outer = 1.0 - smoothstep(-EDGE_AA, EDGE_AA, distance);
    let inner = 1.0 - smoothstep(-EDGE_AA, EDGE_AA, distance + border.width);
    (outer - inner).clamp(0.0, 1.0)
}

/// Four L-shaped brackets `len` long and `line` thick, inset by `offset`.
pub fn corner_mask(uv: Vec2, len: f32, line: f32, offset: f32) -> f32 {
    let o = offset;
    let (x, y) = (uv.x, uv.y);
    let left = |extent: f32| x >= o && x < o + extent;
    let right = |extent: f32| x > 1.0 - o - extent && x <= 1.0 - o;
    let bottom = |extent: f32| y >= o && y < o + extent;
    let top = |extent: f32| y > 1.0 - o - extent && y <= 1.0 - o;

    let hit = (left(len) && bottom(line))
        || (left(line) && bottom(len))
        || (right(len) && bottom(line))
        || (right(line) && bottom(len))
        || (left(len) && top(line))
        || (left(line) && top(len))
        || (right(len) && top(line))
        || (right(line) && top(len));
    if hit {
        1.0
    } else {
        0.0
    }
}

pub fn scan_line_factor(surface: &SurfaceParams, world_y: f32, time: f32) -> f32 {
    let wave = ((world_y * surface.scan_line_density + time * surface.scan_line_speed) * PI).sin()
        * 0.5
        + 0.5;
    1.0 - surface.scan_lines * (1.0 - wave) * 0.3
}

/// Layered sines with an occasional dim frame; `1.0` when disabled.
pub fn flicker(intensity: f32, speed: f32, time: f32) -> f32 {
    if intensity <= 0.0 {
        return 1.0;
    }
    let t = time * speed;
    let f1 = (t * 13.0).sin() * 0.5 + 0.5;
    let f2 = (t * 37.0 + 1.7).sin() * 0.5 + 0.5;
    let f3 = (t * 59.0 + 4.1).sin() * 0.5 + 0.5;
    let mut combined = f1 * f2 + f3 * 0.3;
    let seed = fract((t * 8.0).floor().sin() * 43758.547);
    if seed >= 0.92 {
        combined = 0.1;
    }
    1.0 - intensity * (1.0 - combined.clamp(0.3, 1.0))
}

/// Halftone-style dither of the tile at `local`. Returns the composited
/// colour and the shape coverage as alpha.
pub fn apply_dither(
    style: &DitherStyle,
    grid: &TileGrid,
    texture: &dyn TextureSampler,
    tile: f32,
    local: Vec2,
) -> Vec4 {
    let cell = style.cell_size / 100.0;
    let cells = 1.0 / cell;
    let aspect = style.aspect;
    let pixel = Vec2::new(local.x * aspect, local.y);
    let current = (pixel * cells).floor();
    let aa = 2.0 / (cell * 100.0);
    let contrast = 1.015 * (style.contrast + 1.0) / (1.015 - style.contrast);
    let gap_factor = 1.0 - style.gap / style.cell_size;
    let effective = 0.5 * gap_factor;

    let mut min_distance = 100.0_f32;
    let mut best_luma = -1.0_f32;
    let mut shape_color = Vec3::ZERO;

    for dy in -2..=2 {
        for dx in -2..=2 {
            let neighbour = current + Vec2::new(dx as f32, dy as f32);
            let mut center_uv = (neighbour + 0.5) / cells;
            center_uv.x /= aspect;
            if center_uv.x < 0.0 || center_uv.x > 1.0 || center_uv.y < 0.0 || center_uv.y > 1.0 {
                continue;
            }

            let sampled = cell_average(texture, grid, tile, center_uv, cell);
            let color = (contrast * (sampled - 0.5) + 0.5).clamp(Vec3::ZERO, Vec3::ONE);
            let luma = color.dot(LUMA);
            let response = mode_response(style, luma, neighbour);

            let center = (neighbour + 0.5 + response.offset) / cells;
            let mut p = pixel - center;
            if response.rotation != 0.0 {
                p = rotate(response.rotation, p);
            }
            p *= cells;

            if response.scale.x < 0.001 || response.scale.y < 0.001 {
                continue;
            }
            let distance = shape_distance(style.shape, p, effective * response.scale);
            min_distance = min_distance.min(distance);

            if distance < aa && luma > best_luma {
                best_luma = luma;
                shape_color = if style.use_color { color } else { style.fg_color };
            }
        }
    }

    let mask = 1.0 - smoothstep(0.0, aa, min_distance);
    style.bg_color.lerp(shape_color, mask).extend(mask)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CellResponse {
    scale: Vec2,
    rotation: f32,
    offset: Vec2,
}

fn mode_response(style: &DitherStyle, luma: f32, cell: Vec2) -> CellResponse {
    let base = style.base_scale;
    let mut response = CellResponse {
        scale: Vec2::splat(base),
        rotation: 0.0,
        offset: Vec2::ZERO,
    };
    match style.mode {
        DitherMode::Flat => {}
        DitherMode::Halftone => response.scale = Vec2::splat(luma * base * 1.5),
        DitherMode::InvHalftone => response.scale = Vec2::splat((1.0 - luma) * base * 1.5),
        DitherMode::Rotation => response.rotation = luma * PI * style.intensity,
        DitherMode::StretchV => response.scale = Vec2::new(base * 0.4, luma * base * 3.0),
        DitherMode::StretchH => response.scale = Vec2::new(luma * base * 3.0, base * 0.4),
        DitherMode::Checkerboard => {
            let level = if glsl_mod(cell.x + cell.y, 2.0) < 0.5 { luma } else { 1.0 - luma };
            response.scale = Vec2::splat(level * base * 1.5);
        }
        DitherMode::Glitch => response.offset.x = (luma - 0.5) * style.intensity,
        DitherMode::Melt => response.offset.y = luma * style.intensity,
        DitherMode::EdgeDetect => response.scale = Vec2::splat((luma - 0.5).abs() * 2.0 * base),
        DitherMode::Quantize => {
            response.scale = Vec2::splat((luma * 4.0).floor() / 4.0 * base * 1.5);
        }
        DitherMode::Noise => {
            let noise = fract((cell.dot(Vec2::new(12.9898, 78.233))).sin() * 43758.547);
            response.scale = Vec2::splat((luma + noise * 0.5) * base);
        }
        DitherMode::Threshold => {
            response.scale = if luma < 0.5 { Vec2::ZERO } else { Vec2::splat(base) };
        }
    }
    response
}

/// Signed distance of `p` to a dither dot of `shape` sized by `size`.
pub fn shape_distance(shape: DitherShape, p: Vec2, size: Vec2) -> f32 {
    match shape {
        DitherShape::Circle => sd_circle(p, size.x),
        DitherShape::Square => sd_box(p, size),
        DitherShape::Diamond => sd_diamond(p, size.x),
        DitherShape::Hexagon => sd_hex(p, size.x),
        DitherShape::RectV => sd_box(p, Vec2::new(size.x * 0.2, size.y)),
        DitherShape::RectH => sd_box(p, Vec2::new(size.x, size.y * 0.2)),
        DitherShape::Diagonal => sd_box(rotate(0.785, p), Vec2::new(size.x * 0.2, size.y * 1.5)),
        DitherShape::Octagon => sd_octagon(p, size.x),
        DitherShape::Star => sd_star5(Vec2::new(p.x, -p.y), size.x, 0.5),
        DitherShape::HollowRect => {
            sd_box(p, Vec2::splat(size.x)).max(-sd_box(p, Vec2::splat(size.x * 0.8)))
        }
        DitherShape::Plus => sd_box(p, Vec2::new(size.x * 0.2, size.y))
            .min(sd_box(p, Vec2::new(size.x, size.y * 0.2))),
    }
}

fn cell_average(
    texture: &dyn TextureSampler,
    grid: &TileGrid,
    tile: f32,
    center: Vec2,
    cell: f32,
) -> Vec3 {
    let d = Vec2::splat(1.0 / 64.0 * cell * 0.25);
    let taps = [
        center,
        center + Vec2::new(d.x, d.y),
        center + Vec2::new(-d.x, d.y),
        center + Vec2::new(d.x, -d.y),
        center + Vec2::new(-d.x, -d.y),
    ];
    let total = taps.iter().fold(Vec3::ZERO, |sum, tap| {
        sum + texture.sample(grid.uv(tile, *tap)).truncate()
    });
    total / taps.len() as f32
}

/// Distinct, stable colour per gallery slot.
pub fn instance_color(index: u32) -> Vec3 {
    let hue = fract(index as f32 * 0.618_034);
    hsv_to_rgb(Vec3::new(hue, 0.65, 0.95))
}

fn hsv_to_rgb(hsv: Vec3) -> Vec3 {
    let channel = |k: f32| ((fract(hsv.x + k) * 6.0 - 3.0).abs() - 1.0).clamp(0.0, 1.0);
    let rgb = Vec3::new(channel(1.0), channel(2.0 / 3.0), channel(1.0 / 3.0));
    hsv.z * Vec3::ONE.lerp(rgb, hsv.y)
}

pub fn sd_rounded_box(p: Vec2, half_size: Vec2, radius: f32) -> f32 {
    let q = p.abs() - half_size + radius;
    q.max(Vec2::ZERO).length() + q.x.max(q.y).min(0.0) - radius
}

pub fn sd_circle(p: Vec2, r: f32) -> f32 {
    p.length() - r
}

pub fn sd_box(p: Vec2, half_size: Vec2) -> f32 {
    let d = p.abs() - half_size;
    d.max(Vec2::ZERO).length() + d.x.max(d.y).min(0.0)
}

pub fn sd_diamond(p: Vec2, r: f32) -> f32 {
    let q = p.abs() / r;
    (q.x + q.y - 1.0) * r * 0.7071
}

pub fn sd_hex(p: Vec2, r: f32) -> f32 {
    let k = Vec3::new(-0.866_025_4, 0.5, 0.577_350_26);
    let kxy = Vec2::new(k.x, k.y);
    let mut p = Vec2::new(p.y.abs(), p.x.abs());
    p -= 2.0 * kxy.dot(p).min(0.0) * kxy;
    // min/max instead of clamp: a negative radius flips the bounds
    p -= Vec2::new(p.x.max(-k.z * r).min(k.z * r), r);
    p.length() * glsl_sign(p.y)
}

pub fn sd_octagon(p: Vec2, r: f32) -> f32 {
    let a = Vec2::new(-0.923_879_5, 0.382_683_43);
    let b = Vec2::new(0.923_879_5, 0.382_683_43);
    let mut p = p.abs();
    p -= 2.0 * a.dot(p).min(0.0) * a;
    p -= 2.0 * b.dot(p).min(0.0) * b;
    p.length() - r
}

pub fn sd_star5(p: Vec2, r: f32, ratio: f32) -> f32 {
    let k1 = Vec2::new(0.809_017, -0.587_785_24);
    let k2 = Vec2::new(-0.809_017, -0.587_785_24);
    let mut q = p / r;
    q.x = q.x.abs();
    q -= 2.0 * k1.dot(q).max(0.0) * k1;
    q -= 2.0 * k2.dot(q).max(0.0) * k2;
    q.x = q.x.abs();
    q.y -= 1.0;
    let ba = ratio * Vec2::new(0.587_785_24, 0.809_017) - Vec2::new(0.0, 1.0);
    let h = (q.dot(ba) / ba.dot(ba)).clamp(0.0, 1.0);
    (q - ba * h).length() * glsl_sign(q.y * ba.x - q.x * ba.y) * r
}

/// Same rotation as GLSL `mat2(c, -s, s, c) * p`.
fn rotate(angle: f32, p: Vec2) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(c * p.x + s * p.y, -s * p.x + c * p.y)
}

/// GLSL `smoothstep`; equal or inverted edges degrade to a hard step.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn glsl_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

fn glsl_sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct Solid(Vec4);

    impl TextureSampler for Solid {
        fn sample(&self, _uv: Vec2) -> Vec4 {
            self.0
        }
    }

    fn vertex_params() -> VertexParams {
        VertexParams {
            scale: 1.0,
            radius: 6.0,
            curvature: 1.5,
            rotation: 0.0,
            scroll_offset: 0.0,
            total_height: 16.0,
            squeeze_amount: 0.0,
            squeeze_width: 7.5,
        }
    }

    fn plain_params() -> ShaderParams {
        ShaderParams {
            time: 0.0,
            debug: DebugMode::None,
            vertex: vertex_params(),
            surface: SurfaceParams::NEUTRAL,
            border: BorderStyle::HIDDEN,
            corners: CornerStyle::HIDDEN,
            dither: DitherStyle::default(),
            grid: TileGrid::default(),
        }
    }

    fn fragment(uv: Vec2) -> Fragment {
        Fragment {
            uv,
            tile: 0.0,
            depth_fade: 1.0,
            world_y: 0.0,
            instance: 0,
        }
    }

    #[test]
    fn wrap_keeps_heights_in_half_open_band() {
        assert!((wrap_height(8.5, 16.0) + 7.5).abs() < 1e-5);
        assert!((wrap_height(-8.5, 16.0) - 7.5).abs() < 1e-5);
        assert!((wrap_height(3.0, 16.0) - 3.0).abs() < 1e-5);
        assert!((wrap_height(40.0, 16.0) + 8.0).abs() < 1e-4);
        assert_eq!(wrap_height(5.0, 0.0), 5.0);
    }

    #[test]
    fn card_centre_sits_on_cylinder_surface() {
        let params = vertex_params();
        let placed = place_vertex(&params, Vec2::ZERO, 0.0, 2.0);
        assert!((placed.position.length_squared() - 4.0 - 36.0).abs() < 1e-3);
        assert!((placed.position.z - 6.0).abs() < 1e-5);
        assert!((placed.world_y - 2.0).abs() < 1e-6);
        assert!((placed.depth_fade - 1.0).abs() < 1e-6);

        let behind = place_vertex(&params, Vec2::ZERO, PI, 2.0);
        assert!(behind.depth_fade.abs() < 1e-6);
    }

    #[test]
    fn card_edges_wrap_by_arc_length() {
        let params = vertex_params();
        let edge = place_vertex(&params, Vec2::new(3.0, 0.0), 0.0, 0.0);
        let expected = 3.0 / (6.0 * 1.5);
        let angle = edge.position.x.atan2(edge.position.z);
        assert!((angle - expected).abs() < 1e-5);
    }

    #[test]
    fn squeeze_pinches_the_middle_most() {
        let mut params = vertex_params();
        params.squeeze_amount = 0.5;
        assert!((squeezed_radius(&params, 0.0) - 3.0).abs() < 1e-5);
        assert!(squeezed_radius(&params, 6.0) > squeezed_radius(&params, 1.0));
        assert!(squeezed_radius(&params, 100.0) > 5.99);
    }

    #[test]
    fn scroll_offset_moves_cards_and_wraps() {
        let mut params = vertex_params();
        params.scroll_offset = 10.0;
        let placed = place_vertex(&params, Vec2::ZERO, 0.0, 0.0);
        assert!((placed.world_y + 6.0).abs() < 1e-5);
    }

    #[test]
    fn tile_grid_agrees_with_atlas_layout() {
        let layout = AtlasLayout::new(5, 32, 20);
        let grid = TileGrid::from_layout(&layout);
        for tile in 0..5 {
            for local in [Vec2::ZERO, Vec2::new(0.25, 0.75), Vec2::ONE] {
                let expected = layout.tile_uv(tile, local);
                let actual = grid.uv(tile as f32, local);
                assert!((expected - actual).length() < 1e-5, "tile {tile} {local:?}");
            }
        }
        // fractional indices round to the nearest tile
        assert_eq!(grid.uv(1.2, Vec2::ZERO), grid.uv(1.0, Vec2::ZERO));
    }

    #[test]
    fn dither_disabled_alpha_equals_rounded_rect_mask() {
        let texture = Solid(Vec4::new(0.2, 0.4, 0.6, 1.0));
        for radius in [0.0, 0.1, 0.25] {
            let mut params = plain_params();
            params.border.radius = radius;
            for uv in [
                Vec2::new(0.5, 0.5),
                Vec2::new(0.001, 0.5),
                Vec2::new(0.02, 0.02),
                Vec2::new(0.998, 0.997),
                Vec2::new(0.9, 0.1),
            ] {
                let out = shade_fragment(&params, &texture, &fragment(uv));
                assert!(
                    (out.w - image_mask(uv, radius)).abs() < 1e-6,
                    "radius {radius} uv {uv:?}"
                );
            }
        }
    }

    #[test]
    fn neutral_surface_passes_colour_through() {
        let texture = Solid(Vec4::new(0.2, 0.4, 0.6, 1.0));
        let out = shade_fragment(&plain_params(), &texture, &fragment(Vec2::splat(0.5)));
        assert!((out.truncate() - Vec3::new(0.2, 0.4, 0.6)).length() < 1e-5);
        assert!((out.w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn edge_darkening_dims_far_side() {
        let texture = Solid(Vec4::ONE);
        let mut far = fragment(Vec2::splat(0.5));
        far.depth_fade = 0.0;
        let out = shade_fragment(&plain_params(), &texture, &far);
        assert!((out.x - 0.15).abs() < 1e-5);
    }

    #[test]
    fn border_band_paints_glow_colour() {
        let texture = Solid(Vec4::new(0.0, 0.0, 0.0, 1.0));
        let mut params = plain_params();
        params.border = BorderStyle {
            width: 0.05,
            color: Vec3::new(1.0, 0.0, 0.0),
            emission: 1.0,
            radius: 0.0,
            offset: 0.0,
        };
        let out = shade_fragment(&params, &texture, &fragment(Vec2::new(0.5, 0.975)));
        assert!((out.x - 2.0).abs() < 1e-4);
        let inside = shade_fragment(&params, &texture, &fragment(Vec2::splat(0.5)));
        assert!(inside.x.abs() < 1e-6);
    }

    #[test]
    fn corner_brackets_cover_only_the_corners() {
        let (len, line, offset) = (0.1, 0.02, 0.03);
        assert_eq!(corner_mask(Vec2::new(0.05, 0.035), len, line, offset), 1.0);
        assert_eq!(corner_mask(Vec2::new(0.035, 0.1), len, line, offset), 1.0);
        assert_eq!(corner_mask(Vec2::new(0.96, 0.96), len, line, offset), 1.0);
        assert_eq!(corner_mask(Vec2::new(0.5, 0.035), len, line, offset), 0.0);
        assert_eq!(corner_mask(Vec2::new(0.1, 0.1), len, line, offset), 0.0);
        assert_eq!(corner_mask(Vec2::new(0.01, 0.01), len, line, offset), 0.0);
    }

    #[test]
    fn distance_fade_hides_far_cards() {
        let texture = Solid(Vec4::ONE);
        let mut params = plain_params();
        params.surface.fade_start = 3.0;
        params.surface.fade_end = 8.0;
        let mut far = fragment(Vec2::splat(0.5));
        far.world_y = -9.0;
        assert_eq!(shade_fragment(&params, &texture, &far).w, 0.0);
        far.world_y = 2.0;
        assert_eq!(shade_fragment(&params, &texture, &far).w, 1.0);
    }

    #[test]
    fn flicker_stays_within_intensity_band() {
        assert_eq!(flicker(0.0, 5.0, 12.3), 1.0);
        for step in 0..500 {
            let value = flicker(0.4, 5.0, step as f32 * 0.013);
            assert!((0.6 - 1e-5..=1.0 + 1e-5).contains(&value), "{value}");
        }
    }

    #[test]
    fn scan_lines_only_darken() {
        let mut surface = SurfaceParams::NEUTRAL;
        surface.scan_lines = 1.0;
        surface.scan_line_density = 25.0;
        for step in 0..100 {
            let factor = scan_line_factor(&surface, step as f32 * 0.01, 0.0);
            assert!((0.7 - 1e-5..=1.0 + 1e-5).contains(&factor));
        }
    }

    #[test]
    fn debug_modes_bypass_effects() {
        let texture = Solid(Vec4::new(0.3, 0.3, 0.3, 0.5));
        let mut params = plain_params();
        params.surface.opacity = 0.0;

        params.debug = DebugMode::Depth;
        let mut frag = fragment(Vec2::splat(0.5));
        frag.depth_fade = 0.25;
        assert_eq!(shade_fragment(&params, &texture, &frag), Vec4::new(0.25, 0.25, 0.25, 1.0));

        params.debug = DebugMode::Flat;
        assert_eq!(shade_fragment(&params, &texture, &frag), Vec4::new(0.3, 0.3, 0.3, 1.0));

        params.debug = DebugMode::Wireframe;
        assert_eq!(shade_fragment(&params, &texture, &frag), Vec4::ONE);

        params.debug = DebugMode::Colors;
        let a = shade_fragment(&params, &texture, &frag);
        frag.instance = 1;
        let b = shade_fragment(&params, &texture, &frag);
        assert_ne!(a, b);
        assert_eq!(a.w, 1.0);
    }

    #[test]
    fn atlas_debug_maps_whole_texture() {
        let mut bitmap = RgbaImage::new(2, 2);
        bitmap.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        bitmap.put_pixel(1, 1, Rgba([0, 0, 255, 255]));
        let mut params = plain_params();
        params.debug = DebugMode::Atlas;
        let top_left = shade_fragment(&params, &bitmap, &fragment(Vec2::new(0.1, 0.9)));
        assert_eq!(top_left, Vec4::new(1.0, 0.0, 0.0, 1.0));
        let bottom_right = shade_fragment(&params, &bitmap, &fragment(Vec2::new(0.9, 0.1)));
        assert_eq!(bottom_right, Vec4::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn flat_dither_on_white_covers_cell_centres() {
        let texture = Solid(Vec4::ONE);
        let style = DitherStyle {
            enabled: true,
            cell_size: 10.0,
            gap: 0.0,
            mode: DitherMode::Flat,
            shape: DitherShape::Square,
            base_scale: 1.0,
            bg_color: Vec3::ZERO,
            ..DitherStyle::default()
        };
        let grid = TileGrid::default();
        // the cell at (0, 0) spans x in [0, 0.1 / aspect), y in [0, 0.1)
        let centre = Vec2::new(0.05 / style.aspect, 0.05);
        let out = apply_dither(&style, &grid, &texture, 0.0, centre);
        assert!((out.w - 1.0).abs() < 1e-6);
        assert!((out.truncate() - Vec3::ONE).length() < 1e-5);
    }

    #[test]
    fn inverse_halftone_leaves_white_uncovered() {
        let texture = Solid(Vec4::ONE);
        let style = DitherStyle {
            enabled: true,
            cell_size: 10.0,
            gap: 0.0,
            mode: DitherMode::InvHalftone,
            bg_color: Vec3::new(0.1, 0.1, 0.1),
            ..DitherStyle::default()
        };
        let out = apply_dither(&style, &TileGrid::default(), &texture, 0.0, Vec2::splat(0.5));
        assert_eq!(out.w, 0.0);
        assert!((out.truncate() - Vec3::splat(0.1)).length() < 1e-6);
    }

    #[test]
    fn foreground_colour_replaces_cell_colour_when_requested() {
        let texture = Solid(Vec4::new(0.9, 0.9, 0.9, 1.0));
        let style = DitherStyle {
            enabled: true,
            cell_size: 10.0,
            mode: DitherMode::Flat,
            shape: DitherShape::Circle,
            use_color: false,
            fg_color: Vec3::new(0.0, 1.0, 0.0),
            ..DitherStyle::default()
        };
        let centre = Vec2::new(0.05 / style.aspect, 0.05);
        let out = apply_dither(&style, &TileGrid::default(), &texture, 0.0, centre);
        assert!((out.truncate() - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn zero_cell_size_disables_dither() {
        let style = DitherStyle {
            enabled: true,
            cell_size: 0.0,
            ..DitherStyle::default()
        };
        assert!(!style.is_active());
    }

    #[test]
    fn shape_distances_are_negative_inside() {
        let size = Vec2::splat(0.4);
        for shape in DitherShape::ALL {
            // the hollow rect is empty in the middle, so test its rim
            let inside = match shape {
                DitherShape::HollowRect => Vec2::new(0.36, 0.0),
                _ => Vec2::new(0.0, 0.01),
            };
            let d = shape_distance(shape, inside, size);
            assert!(d < 0.0, "{shape} centre distance {d}");
            let far = shape_distance(shape, Vec2::new(3.0, 3.0), size);
            assert!(far > 0.0, "{shape} far distance {far}");
        }
    }

    #[test]
    fn default_dither_settings_shade_every_shape() {
        // the shipped gap is wider than the cell, so shapes get a negative size
        let defaults = galleryconfig::GalleryConfig::default().dither;
        assert!(defaults.gap > defaults.cell_size);
        let texture = Solid(Vec4::new(0.8, 0.4, 0.2, 1.0));
        for mode in DitherMode::ALL {
            for shape in DitherShape::ALL {
                let style = DitherStyle {
                    enabled: true,
                    cell_size: defaults.cell_size,
                    gap: defaults.gap,
                    contrast: defaults.contrast,
                    mode,
                    shape,
                    base_scale: defaults.base_scale,
                    intensity: defaults.intensity,
                    ..DitherStyle::default()
                };
                for uv in [Vec2::ZERO, Vec2::splat(0.25), Vec2::new(0.7, 0.1), Vec2::ONE] {
                    let out = apply_dither(&style, &TileGrid::default(), &texture, 0.0, uv);
                    assert!(out.is_finite(), "{mode} {shape} at {uv}: {out}");
                }
            }
        }
    }

    #[test]
    fn hex_distance_accepts_negative_radius() {
        assert!(sd_hex(Vec2::new(0.3, 0.1), -0.2).is_finite());
        assert!((sd_hex(Vec2::ZERO, 0.5) + 0.5).abs() < 1e-5);
    }

    #[test]
    fn rounded_box_distance_matches_geometry() {
        assert!((sd_rounded_box(Vec2::ZERO, Vec2::splat(0.5), 0.0) + 0.5).abs() < 1e-6);
        assert!((sd_rounded_box(Vec2::new(1.0, 0.0), Vec2::splat(0.5), 0.0) - 0.5).abs() < 1e-6);
        // a rounded corner pulls the outline inward along the diagonal
        assert!(sd_rounded_box(Vec2::splat(0.48), Vec2::splat(0.5), 0.2) > 0.0);
        assert!(sd_rounded_box(Vec2::splat(0.48), Vec2::splat(0.5), 0.0) < 0.0);
    }
}
