//! Renderer crate for the helix gallery.
//!
//! Glues the winit window, the `wgpu` pipeline and the gallery simulation
//! together. The overall flow is:
//!
//! ```text
//!   CLI / helixgallery
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ render_frame()
//!                          │                                   │
//!                          │ wheel / touch / hotkeys           ├─▶ GalleryState::tick ─▶ Frame
//!                          ▼                                   └─▶ GpuState::render ─▶ surface
//!                     ScrollState
//! ```
//!
//! `GalleryState` (from the `gallery` crate) owns scroll physics, the instance
//! store and the background atlas worker. `GpuState` owns the surface, the
//! pipelines and the GPU copies of the atlas and instance attributes, and only
//! re-uploads them when the simulation reports a change.

mod compile;
mod gpu;
mod types;
mod window;

use anyhow::Result;

pub use types::{AdapterProfile, Antialiasing, RendererConfig};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the gallery window and blocks until it closes.
    ///
    /// Fails when no window or GPU adapter can be created, for example on a
    /// headless machine.
    pub fn run(&mut self) -> Result<()> {
        window::run_window(self.config.clone())
    }
}
