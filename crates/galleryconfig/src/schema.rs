use serde::Serialize;

/// Declared range and default of a tunable numeric parameter.
///
/// Keys are `<group>.<field>` and match the TOML layout of [`crate::GalleryConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl ParamSpec {
    const fn new(
        key: &'static str,
        label: &'static str,
        default: f32,
        min: f32,
        max: f32,
        step: f32,
    ) -> Self {
        Self {
            key,
            label,
            min,
            max,
            step,
            default,
        }
    }

    pub fn group(&self) -> &'static str {
        self.key.split_once('.').map(|(group, _)| group).unwrap_or(self.key)
    }

    /// Clamps `value` into range. Whole-step parameters are rounded and
    /// non-finite input falls back to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.default;
        }
        let value = if self.step == 1.0 { value.round() } else { value };
        value.clamp(self.min, self.max)
    }
}

pub static PARAMS: &[ParamSpec] = &[
    ParamSpec::new("gallery.image_scale", "Image Scale", 0.83, 0.3, 2.0, 0.01),
    ParamSpec::new("gallery.radius", "Radius", 6.0, 1.0, 10.0, 0.1),
    ParamSpec::new("gallery.spiral_step", "Spiral Step", 0.8, 0.3, 5.0, 0.05),
    ParamSpec::new("gallery.images_per_turn", "Images / Turn", 7.0, 2.0, 10.0, 1.0),
    ParamSpec::new("gallery.curvature", "Curvature", 1.5, 0.5, 4.0, 0.05),
    ParamSpec::new("motion.momentum", "Momentum", 0.87, 0.5, 0.99, 0.01),
    ParamSpec::new("motion.scroll_advance_speed", "Scroll Advance", 0.17, 0.0, 2.0, 0.01),
    ParamSpec::new("motion.auto_rotate_speed", "Auto Rotate", 0.002, 0.0, 0.02, 0.0005),
    ParamSpec::new("motion.scroll_rotate_force", "Scroll Rotate Force", 1.75, 0.0, 5.0, 0.05),
    ParamSpec::new("motion.max_rotation_speed", "Max Rotation Speed", 0.15, 0.005, 0.2, 0.005),
    ParamSpec::new("motion.rotation_smoothing", "Rotation Smoothing", 0.09, 0.005, 0.2, 0.005),
    ParamSpec::new("effects.squeeze_max", "Squeeze Max", 0.5, 0.0, 0.8, 0.01),
    ParamSpec::new("effects.squeeze_width", "Squeeze Width", 7.5, 1.0, 15.0, 0.5),
    ParamSpec::new("effects.chromatic_aberration", "Chromatic Aberration", 0.02, 0.0, 0.15, 0.005),
    ParamSpec::new("effects.opacity", "Opacity", 1.0, 0.0, 1.0, 0.01),
    ParamSpec::new("effects.emission", "Emission", 0.65, 0.0, 3.0, 0.05),
    ParamSpec::new("effects.saturation", "Saturation", 1.5, 0.0, 3.0, 0.01),
    ParamSpec::new("effects.brightness", "Brightness", 1.15, 0.2, 3.0, 0.01),
    ParamSpec::new("effects.scan_lines", "Scan Lines", 0.6, 0.0, 1.0, 0.01),
    ParamSpec::new("effects.scan_line_speed", "Scan Line Speed", 3.9, 0.0, 5.0, 0.1),
    ParamSpec::new("effects.scan_line_density", "Scan Line Density", 25.0, 5.0, 100.0, 1.0),
    ParamSpec::new("effects.distance_fade_start", "Fade Start", 3.0, 0.0, 20.0, 0.5),
    ParamSpec::new("effects.distance_fade_end", "Fade End", 8.0, 1.0, 30.0, 0.5),
    ParamSpec::new("effects.flicker_intensity", "Flicker", 0.18, 0.0, 1.0, 0.01),
    ParamSpec::new("effects.flicker_speed", "Flicker Speed", 5.0, 0.1, 5.0, 0.1),
    ParamSpec::new("border.width", "Border Width", 0.005, 0.005, 0.1, 0.005),
    ParamSpec::new("border.emission", "Border Emission", 0.0, 0.0, 5.0, 0.1),
    ParamSpec::new("border.radius", "Border Radius", 0.0, 0.0, 0.25, 0.005),
    ParamSpec::new("border.offset", "Border Offset", 0.0, -0.1, 0.1, 0.005),
    ParamSpec::new("corners.size", "Corner Size", 0.06, 0.0, 0.4, 0.01),
    ParamSpec::new("corners.width", "Corner Width", 0.005, 0.005, 0.08, 0.005),
    ParamSpec::new("corners.offset", "Corner Offset", 0.03, -0.1, 0.15, 0.005),
    ParamSpec::new("dither.cell_size", "Cell Size", 2.0, 0.0, 10.0, 1.0),
    ParamSpec::new("dither.gap", "Gap", 2.75, 0.0, 20.0, 0.25),
    ParamSpec::new("dither.contrast", "Contrast", 0.0, -1.0, 1.0, 0.01),
    ParamSpec::new("dither.base_scale", "Base Scale", 0.76, 0.1, 5.0, 0.01),
    ParamSpec::new("dither.intensity", "Intensity", 2.61, 0.0, 5.0, 0.01),
    ParamSpec::new("bloom.intensity", "Bloom Intensity", 1.2, 0.0, 10.0, 0.1),
    ParamSpec::new("bloom.threshold", "Bloom Threshold", 0.01, 0.0, 2.0, 0.01),
    ParamSpec::new("bloom.smoothing", "Bloom Smoothing", 0.45, 0.0, 1.0, 0.05),
    ParamSpec::new("bloom.radius", "Bloom Radius", 0.65, 0.0, 1.0, 0.05),
    ParamSpec::new("camera.fov_degrees", "Field of View", 75.0, 30.0, 120.0, 1.0),
    ParamSpec::new("camera.distance", "Distance", 11.0, 5.0, 25.0, 0.5),
    ParamSpec::new("camera.look_at_y", "Look At Y", 0.1, -5.0, 5.0, 0.1),
];

pub fn param_spec(key: &str) -> Option<&'static ParamSpec> {
    PARAMS.iter().find(|spec| spec.key == key)
}
