//! GPU side of the gallery.
//!
//! - `context` owns the wgpu instance/device/surface wiring and rebuilds the
//!   swapchain when the window resizes.
//! - `pipeline` compiles the GLSL program pair into a filled and a wireframe
//!   pipeline sharing one layout.
//! - `buffers` holds the card mesh and the per-instance attribute streams.
//! - `atlas` uploads the packed image atlas and its sampler.
//! - `uniforms` packs a frame's `ShaderParams` into the std140 block.
//! - `state` glues everything together behind `GpuState`.

mod atlas;
mod buffers;
mod context;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
#[cfg(test)]
pub(crate) use uniforms::UNIFORM_FIELDS;
