use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Partial override of the look-and-feel groups. Unset fields keep their
/// current value when the preset is applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Preset {
    pub bloom: BloomOverrides,
    pub border: BorderOverrides,
    pub dither: DitherOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BloomOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BorderOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emission: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DitherOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_color: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fg_color: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_scale: Option<f32>,
}

pub const BUILTIN_PRESETS: [&str; 2] = ["default", "green-scifi"];

/// Looks up one of the presets shipped with the binary.
pub fn builtin_preset(name: &str) -> Option<Preset> {
    match name {
        "default" => Some(Preset {
            bloom: BloomOverrides {
                intensity: Some(1.2),
                threshold: None,
            },
            border: BorderOverrides {
                color: Some(Rgb::WHITE),
                emission: Some(0.0),
            },
            dither: DitherOverrides {
                use_color: Some(true),
                fg_color: Some(Rgb::WHITE),
                gap: Some(2.75),
                contrast: Some(0.0),
                base_scale: Some(0.76),
            },
        }),
        "green-scifi" => Some(Preset {
            bloom: BloomOverrides {
                intensity: Some(0.9),
                threshold: None,
            },
            border: BorderOverrides {
                color: Some(Rgb::new(0x6d, 0xf4, 0xce)),
                emission: Some(1.6),
            },
            dither: DitherOverrides {
                use_color: Some(false),
                fg_color: Some(Rgb::new(0x6d, 0xf4, 0xce)),
                gap: Some(5.5),
                contrast: Some(-0.02),
                base_scale: Some(0.44),
            },
        }),
        _ => None,
    }
}
