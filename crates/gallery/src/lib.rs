//! Core of the helix gallery: everything that runs on the CPU.
//!
//! Input impulses feed [`scroll::ScrollState`]; [`atlas`] packs the source
//! images (on a [`worker::AtlasWorker`] thread); [`layout`] places the slots
//! on a helix and [`instances`] holds their per-instance attributes. Each
//! frame [`orchestrator::GalleryState::tick`] folds all of it into a
//! [`shading::ShaderParams`] for the GPU program, whose math
//! [`shading`] also evaluates on the CPU.

pub mod atlas;
pub mod camera;
pub mod instances;
pub mod layout;
pub mod mesh;
pub mod orchestrator;
pub mod scroll;
pub mod shading;
pub mod worker;

pub use atlas::{
    build_atlas, build_atlas_until, Atlas, AtlasError, AtlasLayout, FsImageSource, ImageSource,
    MemoryImageSource,
};
pub use camera::Camera;
pub use instances::InstanceStore;
pub use layout::{spiral_layout, SlotPlacement};
pub use mesh::{PlaneMesh, PlaneVertex};
pub use orchestrator::{Frame, GalleryState};
pub use scroll::ScrollState;
pub use shading::ShaderParams;
pub use worker::{AtlasBuild, AtlasWorker};
