//! Per-frame state machine tying scroll physics, rotation, layout and the
//! atlas together into one [`ShaderParams`] per frame.

use std::f64::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use galleryconfig::{DebugMode, GalleryConfig, Rgb};

use crate::atlas::{Atlas, AtlasError, ImageSource};
use crate::instances::InstanceStore;
use crate::layout::{spiral_layout, total_height};
use crate::mesh::PLANE_ASPECT;
use crate::scroll::ScrollState;
use crate::shading::{
    BorderStyle, CornerStyle, DitherStyle, ShaderParams, SurfaceParams, TileGrid, VertexParams,
};
use crate::worker::AtlasWorker;

/// Per-frame approach rate of the squeeze towards its target.
pub const SQUEEZE_SMOOTHING: f32 = 0.08;
/// Velocities below this do not change the remembered scroll direction.
pub const DIRECTION_THRESHOLD: f64 = 0.001;
/// Rotation speed before the first frame.
pub const INITIAL_ROTATION_SPEED: f64 = 0.001;
/// Rotation speeds are tuned per frame at this rate.
const REFERENCE_FPS: f64 = 60.0;

/// What one [`GalleryState::tick`] produced.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub params: ShaderParams,
    /// A new atlas landed this frame; the GPU texture must be replaced.
    pub atlas_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LayoutKey {
    spiral_step: f32,
    images_per_turn: f32,
}

pub struct GalleryState {
    scroll: ScrollState,
    rotation: f64,
    rotation_speed: f64,
    squeeze: f32,
    last_direction: f64,
    instances: InstanceStore,
    layout_key: Option<LayoutKey>,
    atlas: Option<Atlas>,
    atlas_generation: u64,
    worker: AtlasWorker,
}

impl GalleryState {
    pub fn new(config: &GalleryConfig, source: Arc<dyn ImageSource>) -> Self {
        let mut state = Self {
            scroll: ScrollState::new(f64::from(config.motion.momentum)),
            rotation: 0.0,
            rotation_speed: INITIAL_ROTATION_SPEED,
            squeeze: 0.0,
            last_direction: 1.0,
            instances: InstanceStore::new(config.gallery.instances as usize),
            layout_key: None,
            atlas: None,
            atlas_generation: 0,
            worker: AtlasWorker::new(source),
        };
        state.sync_layout(config);
        state
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    /// Input handlers feed impulses through here.
    pub fn scroll_mut(&mut self) -> &mut ScrollState {
        &mut self.scroll
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn rotation_speed(&self) -> f64 {
        self.rotation_speed
    }

    pub fn squeeze(&self) -> f32 {
        self.squeeze
    }

    pub fn instances(&self) -> &InstanceStore {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut InstanceStore {
        &mut self.instances
    }

    pub fn atlas(&self) -> Option<&Atlas> {
        self.atlas.as_ref()
    }

    pub fn atlas_generation(&self) -> u64 {
        self.atlas_generation
    }

    pub fn is_loading(&self) -> bool {
        self.worker.is_building()
    }

    /// Starts a background atlas build; the result is swapped in by a later
    /// [`tick`](Self::tick). A newer call supersedes any build in flight.
    pub fn load_images(&mut self, images: Vec<String>) -> Result<u64, AtlasError> {
        let count = images.len();
        let generation = self.worker.request(images)?;
        tracing::info!(images = count, generation, "loading gallery images");
        Ok(generation)
    }

    /// Replaces the current atlas and points every slot at its tiles.
    pub fn install_atlas(&mut self, atlas: Atlas) {
        self.instances.set_texture_indices(&atlas.index_map);
        tracing::info!(
            tiles = atlas.layout.unique_count,
            width = atlas.bitmap.width(),
            height = atlas.bitmap.height(),
            failed = atlas.failed.len(),
            "texture atlas ready"
        );
        self.atlas = Some(atlas);
        self.atlas_generation += 1;
    }

    /// Writes the current atlas as PNG. Without an atlas this does nothing
    /// and returns `Ok(None)`.
    pub fn export_atlas(&self, path: &Path) -> Result<Option<PathBuf>, AtlasError> {
        let Some(atlas) = &self.atlas else {
            tracing::debug!(path = %path.display(), "no texture atlas to export yet");
            return Ok(None);
        };
        atlas.export_png(path)?;
        Ok(Some(path.to_path_buf()))
    }

    /// Advances one frame. `dt` is the frame time and `time` the elapsed
    /// time, both in seconds.
    pub fn tick(&mut self, dt: f32, time: f32, config: &GalleryConfig) -> Frame {
        let atlas_changed = match self.worker.poll() {
            Some(build) => {
                tracing::debug!(generation = build.generation, "swapping in atlas build");
                self.install_atlas(build.atlas);
                true
            }
            None => false,
        };

        self.scroll.set_friction(f64::from(config.motion.momentum));
        self.scroll.advance();
        let velocity = self.scroll.velocity();

        self.update_rotation(velocity, f64::from(dt), config);

        let debug = config.debug.is_debug();
        if !debug {
            let target = (velocity.abs() as f32 * 3.0).min(1.0) * config.effects.squeeze_max;
            self.squeeze += (target - self.squeeze) * SQUEEZE_SMOOTHING;
        }

        self.sync_layout(config);

        Frame {
            params: self.shader_params(config, time),
            atlas_changed,
        }
    }

    fn update_rotation(&mut self, velocity: f64, dt: f64, config: &GalleryConfig) {
        let motion = &config.motion;
        if velocity.abs() > DIRECTION_THRESHOLD {
            self.last_direction = velocity.signum();
        }
        let max = f64::from(motion.max_rotation_speed);
        let target = (f64::from(motion.auto_rotate_speed) * self.last_direction
            + velocity * f64::from(motion.scroll_rotate_force))
        .clamp(-max, max);
        self.rotation_speed += (target - self.rotation_speed) * f64::from(motion.rotation_smoothing);
        self.rotation = (self.rotation + self.rotation_speed * dt * REFERENCE_FPS).rem_euclid(TAU);
    }

    fn sync_layout(&mut self, config: &GalleryConfig) {
        let key = LayoutKey {
            spiral_step: config.gallery.spiral_step,
            images_per_turn: config.gallery.images_per_turn,
        };
        if self.layout_key == Some(key) {
            return;
        }
        let placements = spiral_layout(self.instances.len(), key.spiral_step, key.images_per_turn);
        self.instances.set_layout(&placements);
        tracing::debug!(
            slots = self.instances.len(),
            spiral_step = key.spiral_step,
            images_per_turn = key.images_per_turn,
            "recomputed spiral layout"
        );
        self.layout_key = Some(key);
    }

    fn shader_params(&self, config: &GalleryConfig, time: f32) -> ShaderParams {
        let gallery = &config.gallery;
        let height = total_height(self.instances.len(), gallery.spiral_step);
        let advance = self.scroll.position() * f64::from(config.motion.scroll_advance_speed);
        // the vertex stage wraps by `height`, so only the remainder matters
        let scroll_offset = if height > 0.0 {
            advance.rem_euclid(f64::from(height))
        } else {
            advance
        };

        let debug = config.debug;
        let decorated = !debug.is_debug();

        let vertex = VertexParams {
            scale: gallery.image_scale,
            radius: gallery.radius,
            curvature: gallery.curvature,
            rotation: self.rotation as f32,
            scroll_offset: scroll_offset as f32,
            total_height: height,
            squeeze_amount: if decorated { self.squeeze } else { 0.0 },
            squeeze_width: config.effects.squeeze_width,
        };

        let grid = self
            .atlas
            .as_ref()
            .map(|atlas| TileGrid::from_layout(&atlas.layout))
            .unwrap_or_default();

        if !decorated {
            return ShaderParams {
                time,
                debug,
                vertex,
                surface: SurfaceParams::NEUTRAL,
                border: BorderStyle::HIDDEN,
                corners: CornerStyle::HIDDEN,
                dither: DitherStyle {
                    enabled: false,
                    ..dither_style(config)
                },
                grid,
            };
        }

        let effects = &config.effects;
        ShaderParams {
            time,
            debug: DebugMode::None,
            vertex,
            surface: SurfaceParams {
                chromatic_aberration: effects.chromatic_aberration,
                opacity: effects.opacity,
                emission: effects.emission,
                saturation: effects.saturation,
                brightness: effects.brightness,
                scan_lines: effects.scan_lines,
                scan_line_speed: effects.scan_line_speed,
                scan_line_density: effects.scan_line_density,
                fade_start: effects.distance_fade_start,
                fade_end: effects.distance_fade_end,
                flicker_intensity: effects.flicker_intensity,
                flicker_speed: effects.flicker_speed,
            },
            border: BorderStyle {
                width: config.border.width,
                color: unit(config.border.color),
                emission: config.border.emission,
                radius: config.border.radius,
                offset: config.border.offset,
            },
            corners: CornerStyle {
                size: config.corners.size,
                width: config.corners.width,
                offset: config.corners.offset,
            },
            dither: dither_style(config),
            grid,
        }
    }
}

fn dither_style(config: &GalleryConfig) -> DitherStyle {
    let dither = &config.dither;
    DitherStyle {
        enabled: dither.enabled,
        cell_size: dither.cell_size,
        gap: dither.gap,
        contrast: dither.contrast,
        mode: dither.mode,
        shape: dither.shape,
        base_scale: dither.base_scale,
        intensity: dither.intensity,
        bg_color: unit(dither.bg_color),
        fg_color: unit(dither.fg_color),
        use_color: dither.use_color,
        aspect: PLANE_ASPECT,
    }
}

fn unit(color: Rgb) -> Vec3 {
    Vec3::from_array(color.to_unit())
}
