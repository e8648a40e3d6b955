use std::borrow::Cow;

use wgpu::naga::ShaderStage;

const VERSION: &str = "#version 450";
const COMMON_GLSL: &str = include_str!("shaders/common.glsl");
const VERTEX_GLSL: &str = include_str!("shaders/gallery.vert");
const FRAGMENT_GLSL: &str = include_str!("shaders/gallery.frag");

/// Compiles the card placement stage.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("gallery vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(assemble(VERTEX_GLSL)),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Compiles the shading stage (effects, dither, overlays, debug views).
pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("gallery fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(assemble(FRAGMENT_GLSL)),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Prepends the version directive and the shared uniform block to a stage.
fn assemble(stage: &str) -> String {
    format!("{VERSION}\n{COMMON_GLSL}\n{stage}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_share_one_uniform_block() {
        for stage in [VERTEX_GLSL, FRAGMENT_GLSL] {
            let source = assemble(stage);
            assert!(source.starts_with("#version 450\n"));
            assert_eq!(source.matches("uniform GalleryParams").count(), 1);
            assert!(source.contains("void main()"));
        }
    }

    #[test]
    fn stages_parse_and_validate() {
        use wgpu::naga::front::glsl::{Frontend, Options};
        use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

        for (stage, body) in [
            (ShaderStage::Vertex, VERTEX_GLSL),
            (ShaderStage::Fragment, FRAGMENT_GLSL),
        ] {
            let source = assemble(body);
            let module = Frontend::default()
                .parse(&Options::from(stage), &source)
                .unwrap_or_else(|err| panic!("{stage:?} failed to parse: {err:?}"));
            Validator::new(ValidationFlags::all(), Capabilities::all())
                .validate(&module)
                .unwrap_or_else(|err| panic!("{stage:?} failed validation: {err:?}"));
        }
    }

    #[test]
    fn uniform_block_lists_every_uniform_field() {
        let block_start = COMMON_GLSL
            .find("uniform GalleryParams")
            .expect("uniform block present");
        let block = &COMMON_GLSL[block_start..];
        let block = &block[..block.find("} u;").expect("uniform block closed")];
        let members: Vec<&str> = block
            .lines()
            .skip(1)
            .filter_map(|line| {
                let declaration = line.split("//").next()?.trim();
                let name = declaration.strip_suffix(';')?.split_whitespace().nth(1)?;
                Some(name)
            })
            .collect();
        assert_eq!(members, crate::gpu::UNIFORM_FIELDS);
    }

    #[test]
    fn debug_codes_match_config() {
        use galleryconfig::DebugMode;

        for mode in DebugMode::ALL {
            if !mode.is_debug() {
                continue;
            }
            let define = format!("#define DEBUG_{} {}", mode.name().to_uppercase(), mode.code());
            assert!(COMMON_GLSL.contains(&define), "missing {define}");
        }
    }

    #[test]
    fn every_dither_code_has_a_case() {
        use galleryconfig::{DitherMode, DitherShape};

        for mode in DitherMode::ALL {
            if mode == DitherMode::Flat {
                continue;
            }
            assert!(FRAGMENT_GLSL.contains(&format!("case {}:", mode.code())), "{mode}");
        }
        for shape in DitherShape::ALL {
            if shape == DitherShape::Circle {
                continue;
            }
            assert!(FRAGMENT_GLSL.contains(&format!("case {}:", shape.code())), "{shape}");
        }
    }
}
