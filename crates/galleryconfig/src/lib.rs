//! Configuration schema for the helix gallery.
//!
//! A [`GalleryConfig`] is the plain parameter bag the renderer reads every
//! frame. Every numeric knob has a [`ParamSpec`] with a declared range;
//! out-of-range values are clamped (and logged) rather than rejected, so a
//! hand-edited file can never stop the render loop. Presets are partial
//! overrides of the border, dither and bloom groups applied in one step.

mod color;
mod presets;
mod schema;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use color::Rgb;
pub use presets::{
    builtin_preset, BloomOverrides, BorderOverrides, DitherOverrides, Preset, BUILTIN_PRESETS,
};
pub use schema::{param_spec, ParamSpec, PARAMS};

pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_INSTANCE_COUNT: u32 = 20;
pub const MAX_INSTANCE_COUNT: u32 = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("unknown parameter '{0}'")]
    UnknownParam(String),
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DitherMode {
    Flat,
    Halftone,
    #[default]
    InvHalftone,
    Rotation,
    StretchV,
    StretchH,
    Checkerboard,
    Glitch,
    Melt,
    EdgeDetect,
    Quantize,
    Noise,
    Threshold,
}

impl DitherMode {
    pub const ALL: [DitherMode; 13] = [
        DitherMode::Flat,
        DitherMode::Halftone,
        DitherMode::InvHalftone,
        DitherMode::Rotation,
        DitherMode::StretchV,
        DitherMode::StretchH,
        DitherMode::Checkerboard,
        DitherMode::Glitch,
        DitherMode::Melt,
        DitherMode::EdgeDetect,
        DitherMode::Quantize,
        DitherMode::Noise,
        DitherMode::Threshold,
    ];

    /// Integer selector understood by the fragment shader.
    pub fn code(self) -> i32 {
        match self {
            DitherMode::Flat => 0,
            DitherMode::Halftone => 1,
            DitherMode::InvHalftone => 2,
            DitherMode::Rotation => 3,
            DitherMode::StretchV => 4,
            DitherMode::StretchH => 5,
            DitherMode::Checkerboard => 6,
            DitherMode::Glitch => 8,
            DitherMode::Melt => 9,
            DitherMode::EdgeDetect => 10,
            DitherMode::Quantize => 12,
            DitherMode::Noise => 13,
            DitherMode::Threshold => 15,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DitherMode::Flat => "flat",
            DitherMode::Halftone => "halftone",
            DitherMode::InvHalftone => "inv-halftone",
            DitherMode::Rotation => "rotation",
            DitherMode::StretchV => "stretch-v",
            DitherMode::StretchH => "stretch-h",
            DitherMode::Checkerboard => "checkerboard",
            DitherMode::Glitch => "glitch",
            DitherMode::Melt => "melt",
            DitherMode::EdgeDetect => "edge-detect",
            DitherMode::Quantize => "quantize",
            DitherMode::Noise => "noise",
            DitherMode::Threshold => "threshold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DitherShape {
    #[default]
    Circle,
    Square,
    Diamond,
    Hexagon,
    RectV,
    RectH,
    Diagonal,
    Octagon,
    Star,
    HollowRect,
    Plus,
}

impl DitherShape {
    pub const ALL: [DitherShape; 11] = [
        DitherShape::Circle,
        DitherShape::Square,
        DitherShape::Diamond,
        DitherShape::Hexagon,
        DitherShape::RectV,
        DitherShape::RectH,
        DitherShape::Diagonal,
        DitherShape::Octagon,
        DitherShape::Star,
        DitherShape::HollowRect,
        DitherShape::Plus,
    ];

    pub fn code(self) -> i32 {
        match self {
            DitherShape::Circle => 0,
            DitherShape::Square => 1,
            DitherShape::Diamond => 2,
            DitherShape::Hexagon => 3,
            DitherShape::RectV => 4,
            DitherShape::RectH => 5,
            DitherShape::Diagonal => 6,
            DitherShape::Octagon => 7,
            DitherShape::Star => 8,
            DitherShape::HollowRect => 9,
            DitherShape::Plus => 10,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DitherShape::Circle => "circle",
            DitherShape::Square => "square",
            DitherShape::Diamond => "diamond",
            DitherShape::Hexagon => "hexagon",
            DitherShape::RectV => "rect-v",
            DitherShape::RectH => "rect-h",
            DitherShape::Diagonal => "diagonal",
            DitherShape::Octagon => "octagon",
            DitherShape::Star => "star",
            DitherShape::HollowRect => "hollow-rect",
            DitherShape::Plus => "plus",
        }
    }
}

/// Diagnostic visualisation selector. Anything but `None` bypasses the
/// decorative effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DebugMode {
    #[default]
    None,
    Wireframe,
    Flat,
    Colors,
    Atlas,
    Depth,
}

impl DebugMode {
    pub const ALL: [DebugMode; 6] = [
        DebugMode::None,
        DebugMode::Wireframe,
        DebugMode::Flat,
        DebugMode::Colors,
        DebugMode::Atlas,
        DebugMode::Depth,
    ];

    pub fn code(self) -> i32 {
        match self {
            DebugMode::None => 0,
            DebugMode::Colors => 1,
            DebugMode::Depth => 2,
            DebugMode::Flat => 3,
            DebugMode::Atlas => 4,
            DebugMode::Wireframe => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DebugMode::None => "none",
            DebugMode::Wireframe => "wireframe",
            DebugMode::Flat => "flat",
            DebugMode::Colors => "colors",
            DebugMode::Atlas => "atlas",
            DebugMode::Depth => "depth",
        }
    }

    pub fn is_debug(self) -> bool {
        !matches!(self, DebugMode::None)
    }

    /// The mode after this one, wrapping back to `None`.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|mode| *mode == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

fn normalise_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '-' | '_'))
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

impl FromStr for DitherMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalise_name(value).as_str() {
            "flat" => Ok(DitherMode::Flat),
            "halftone" => Ok(DitherMode::Halftone),
            "invhalftone" | "inversehalftone" => Ok(DitherMode::InvHalftone),
            "rotation" => Ok(DitherMode::Rotation),
            "stretchv" => Ok(DitherMode::StretchV),
            "stretchh" => Ok(DitherMode::StretchH),
            "checkerboard" => Ok(DitherMode::Checkerboard),
            "glitch" => Ok(DitherMode::Glitch),
            "melt" => Ok(DitherMode::Melt),
            "edgedetect" | "edge" => Ok(DitherMode::EdgeDetect),
            "quantize" => Ok(DitherMode::Quantize),
            "noise" => Ok(DitherMode::Noise),
            "threshold" => Ok(DitherMode::Threshold),
            _ => Err(format!("unknown dither mode '{}'", value.trim())),
        }
    }
}

impl FromStr for DitherShape {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalise_name(value).as_str() {
            "circle" => Ok(DitherShape::Circle),
            "square" => Ok(DitherShape::Square),
            "diamond" => Ok(DitherShape::Diamond),
            "hexagon" | "hex" => Ok(DitherShape::Hexagon),
            "rectv" => Ok(DitherShape::RectV),
            "recth" => Ok(DitherShape::RectH),
            "diagonal" => Ok(DitherShape::Diagonal),
            "octagon" => Ok(DitherShape::Octagon),
            "star" => Ok(DitherShape::Star),
            "hollowrect" => Ok(DitherShape::HollowRect),
            "plus" => Ok(DitherShape::Plus),
            _ => Err(format!("unknown dither shape '{}'", value.trim())),
        }
    }
}

impl FromStr for DebugMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalise_name(value).as_str() {
            "none" | "off" | "" => Ok(DebugMode::None),
            "wireframe" => Ok(DebugMode::Wireframe),
            "flat" => Ok(DebugMode::Flat),
            "colors" | "colours" => Ok(DebugMode::Colors),
            "atlas" => Ok(DebugMode::Atlas),
            "depth" => Ok(DebugMode::Depth),
            _ => Err(format!(
                "unknown debug mode '{}'; expected none, wireframe, flat, colors, atlas, or depth",
                value.trim()
            )),
        }
    }
}

macro_rules! string_enum_conversions {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = String;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.name().to_string()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }
        )*
    };
}

string_enum_conversions!(DitherMode, DitherShape, DebugMode);

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometryParams {
    pub instances: u32,
    pub image_scale: f32,
    pub radius: f32,
    pub spiral_step: f32,
    pub images_per_turn: f32,
    pub curvature: f32,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            instances: DEFAULT_INSTANCE_COUNT,
            image_scale: 0.83,
            radius: 6.0,
            spiral_step: 0.8,
            images_per_turn: 7.0,
            curvature: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionParams {
    pub momentum: f32,
    pub scroll_advance_speed: f32,
    pub auto_rotate_speed: f32,
    pub scroll_rotate_force: f32,
    pub max_rotation_speed: f32,
    pub rotation_smoothing: f32,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            momentum: 0.87,
            scroll_advance_speed: 0.17,
            auto_rotate_speed: 0.002,
            scroll_rotate_force: 1.75,
            max_rotation_speed: 0.15,
            rotation_smoothing: 0.09,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EffectParams {
    pub squeeze_max: f32,
    pub squeeze_width: f32,
    pub chromatic_aberration: f32,
    pub opacity: f32,
    pub emission: f32,
    pub saturation: f32,
    pub brightness: f32,
    pub scan_lines: f32,
    pub scan_line_speed: f32,
    pub scan_line_density: f32,
    pub distance_fade_start: f32,
    pub distance_fade_end: f32,
    pub flicker_intensity: f32,
    pub flicker_speed: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            squeeze_max: 0.5,
            squeeze_width: 7.5,
            chromatic_aberration: 0.02,
            opacity: 1.0,
            emission: 0.65,
            saturation: 1.5,
            brightness: 1.15,
            scan_lines: 0.6,
            scan_line_speed: 3.9,
            scan_line_density: 25.0,
            distance_fade_start: 3.0,
            distance_fade_end: 8.0,
            flicker_intensity: 0.18,
            flicker_speed: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BorderParams {
    pub width: f32,
    pub color: Rgb,
    pub emission: f32,
    pub radius: f32,
    pub offset: f32,
}

impl Default for BorderParams {
    fn default() -> Self {
        Self {
            width: 0.005,
            color: Rgb::WHITE,
            emission: 0.0,
            radius: 0.0,
            offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CornerParams {
    pub size: f32,
    pub width: f32,
    pub offset: f32,
}

impl Default for CornerParams {
    fn default() -> Self {
        Self {
            size: 0.06,
            width: 0.005,
            offset: 0.03,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DitherParams {
    pub enabled: bool,
    pub cell_size: f32,
    pub gap: f32,
    pub contrast: f32,
    pub mode: DitherMode,
    pub shape: DitherShape,
    pub base_scale: f32,
    pub intensity: f32,
    pub bg_color: Rgb,
    pub use_color: bool,
    pub fg_color: Rgb,
}

impl Default for DitherParams {
    fn default() -> Self {
        Self {
            enabled: true,
            cell_size: 2.0,
            gap: 2.75,
            contrast: 0.0,
            mode: DitherMode::InvHalftone,
            shape: DitherShape::Circle,
            base_scale: 0.76,
            intensity: 2.61,
            bg_color: Rgb::new(0x11, 0x11, 0x11),
            use_color: true,
            fg_color: Rgb::WHITE,
        }
    }
}

/// Post-processing values carried for an external bloom pass.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BloomParams {
    pub intensity: f32,
    pub threshold: f32,
    pub smoothing: f32,
    pub radius: f32,
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            intensity: 1.2,
            threshold: 0.01,
            smoothing: 0.45,
            radius: 0.65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraParams {
    pub fov_degrees: f32,
    pub distance: f32,
    pub look_at_y: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            distance: 11.0,
            look_at_y: 0.1,
        }
    }
}

/// A value that was pulled back into its declared range.
#[derive(Debug, Clone, PartialEq)]
pub struct ClampedParam {
    pub key: String,
    pub requested: f32,
    pub applied: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    pub debug: DebugMode,
    pub gallery: GeometryParams,
    pub motion: MotionParams,
    pub effects: EffectParams,
    pub border: BorderParams,
    pub corners: CornerParams,
    pub dither: DitherParams,
    pub bloom: BloomParams,
    pub camera: CameraParams,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub presets: BTreeMap<String, Preset>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            preset: None,
            debug: DebugMode::None,
            gallery: GeometryParams::default(),
            motion: MotionParams::default(),
            effects: EffectParams::default(),
            border: BorderParams::default(),
            corners: CornerParams::default(),
            dither: DitherParams::default(),
            bloom: BloomParams::default(),
            camera: CameraParams::default(),
            presets: BTreeMap::new(),
        }
    }
}

macro_rules! numeric_slots {
    ($($key:literal => $group:ident . $field:ident),* $(,)?) => {
        impl GalleryConfig {
            fn slot(&self, key: &str) -> Option<f32> {
                match key {
                    $($key => Some(self.$group.$field),)*
                    _ => None,
                }
            }

            fn slot_mut(&mut self, key: &str) -> Option<&mut f32> {
                match key {
                    $($key => Some(&mut self.$group.$field),)*
                    _ => None,
                }
            }
        }
    };
}

numeric_slots! {
    "gallery.image_scale" => gallery.image_scale,
    "gallery.radius" => gallery.radius,
    "gallery.spiral_step" => gallery.spiral_step,
    "gallery.images_per_turn" => gallery.images_per_turn,
    "gallery.curvature" => gallery.curvature,
    "motion.momentum" => motion.momentum,
    "motion.scroll_advance_speed" => motion.scroll_advance_speed,
    "motion.auto_rotate_speed" => motion.auto_rotate_speed,
    "motion.scroll_rotate_force" => motion.scroll_rotate_force,
    "motion.max_rotation_speed" => motion.max_rotation_speed,
    "motion.rotation_smoothing" => motion.rotation_smoothing,
    "effects.squeeze_max" => effects.squeeze_max,
    "effects.squeeze_width" => effects.squeeze_width,
    "effects.chromatic_aberration" => effects.chromatic_aberration,
    "effects.opacity" => effects.opacity,
    "effects.emission" => effects.emission,
    "effects.saturation" => effects.saturation,
    "effects.brightness" => effects.brightness,
    "effects.scan_lines" => effects.scan_lines,
    "effects.scan_line_speed" => effects.scan_line_speed,
    "effects.scan_line_density" => effects.scan_line_density,
    "effects.distance_fade_start" => effects.distance_fade_start,
    "effects.distance_fade_end" => effects.distance_fade_end,
    "effects.flicker_intensity" => effects.flicker_intensity,
    "effects.flicker_speed" => effects.flicker_speed,
    "border.width" => border.width,
    "border.emission" => border.emission,
    "border.radius" => border.radius,
    "border.offset" => border.offset,
    "corners.size" => corners.size,
    "corners.width" => corners.width,
    "corners.offset" => corners.offset,
    "dither.cell_size" => dither.cell_size,
    "dither.gap" => dither.gap,
    "dither.contrast" => dither.contrast,
    "dither.base_scale" => dither.base_scale,
    "dither.intensity" => dither.intensity,
    "bloom.intensity" => bloom.intensity,
    "bloom.threshold" => bloom.threshold,
    "bloom.smoothing" => bloom.smoothing,
    "bloom.radius" => bloom.radius,
    "camera.fov_degrees" => camera.fov_degrees,
    "camera.distance" => camera.distance,
    "camera.look_at_y" => camera.look_at_y,
}

impl GalleryConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: GalleryConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Structural checks only; numeric ranges are handled by [`Self::sanitize`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        for name in self.presets.keys() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("preset names may not be empty".into()));
            }
        }

        if let Some(name) = &self.preset {
            if self.find_preset(name).is_none() {
                return Err(ConfigError::UnknownPreset(name.clone()));
            }
        }

        Ok(())
    }

    /// Applies the selected preset (if any) then clamps every parameter.
    pub fn prepare(&mut self) -> Result<Vec<ClampedParam>, ConfigError> {
        if let Some(name) = self.preset.clone() {
            self.apply_preset(&name)?;
        }
        Ok(self.sanitize())
    }

    /// Clamps every numeric parameter into its declared range, logging each
    /// adjustment.
    pub fn sanitize(&mut self) -> Vec<ClampedParam> {
        let mut clamped = Vec::new();
        for spec in PARAMS {
            let Some(slot) = self.slot_mut(spec.key) else {
                continue;
            };
            let requested = *slot;
            let applied = spec.clamp(requested);
            if applied.to_bits() != requested.to_bits() {
                *slot = applied;
                tracing::warn!(
                    param = spec.key,
                    requested,
                    applied,
                    min = spec.min,
                    max = spec.max,
                    "parameter out of range; clamped"
                );
                clamped.push(ClampedParam {
                    key: spec.key.to_string(),
                    requested,
                    applied,
                });
            }
        }

        let instances = self.gallery.instances;
        let applied = instances.clamp(1, MAX_INSTANCE_COUNT);
        if applied != instances {
            tracing::warn!(
                param = "gallery.instances",
                requested = instances,
                applied,
                "instance count out of range; clamped"
            );
            self.gallery.instances = applied;
            clamped.push(ClampedParam {
                key: "gallery.instances".into(),
                requested: instances as f32,
                applied: applied as f32,
            });
        }

        clamped
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.slot(key)
    }

    /// Sets a numeric parameter, clamping it into range.
    pub fn set(&mut self, key: &str, value: f32) -> Result<f32, ConfigError> {
        let spec = param_spec(key).ok_or_else(|| ConfigError::UnknownParam(key.to_string()))?;
        let slot = self
            .slot_mut(key)
            .ok_or_else(|| ConfigError::UnknownParam(key.to_string()))?;
        let applied = spec.clamp(value);
        if applied.to_bits() != value.to_bits() {
            tracing::warn!(param = key, requested = value, applied, "parameter out of range; clamped");
        }
        *slot = applied;
        Ok(applied)
    }

    /// User presets shadow the built-in ones of the same name.
    pub fn find_preset(&self, name: &str) -> Option<Preset> {
        self.presets
            .get(name)
            .cloned()
            .or_else(|| builtin_preset(name))
    }

    pub fn preset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_PRESETS.iter().map(|name| name.to_string()).collect();
        for name in self.presets.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Applies a preset as a single update: either every override lands or,
    /// for an unknown name, nothing changes.
    pub fn apply_preset(&mut self, name: &str) -> Result<(), ConfigError> {
        let preset = self
            .find_preset(name)
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;

        let mut next = self.clone();
        if let Some(value) = preset.bloom.intensity {
            next.bloom.intensity = value;
        }
        if let Some(value) = preset.bloom.threshold {
            next.bloom.threshold = value;
        }
        if let Some(value) = preset.border.color {
            next.border.color = value;
        }
        if let Some(value) = preset.border.emission {
            next.border.emission = value;
        }
        if let Some(value) = preset.dither.use_color {
            next.dither.use_color = value;
        }
        if let Some(value) = preset.dither.fg_color {
            next.dither.fg_color = value;
        }
        if let Some(value) = preset.dither.gap {
            next.dither.gap = value;
        }
        if let Some(value) = preset.dither.contrast {
            next.dither.contrast = value;
        }
        if let Some(value) = preset.dither.base_scale {
            next.dither.base_scale = value;
        }
        next.preset = Some(name.to_string());
        next.sanitize();

        tracing::debug!(preset = name, "applied preset");
        *self = next;
        Ok(())
    }
}
