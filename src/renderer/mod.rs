//! Rendering module
//!
//! The GPU sits behind [`RenderContext`]; materials and meshes only talk to
//! that trait, so the same scene renders into a real context or into a
//! [`RecordingContext`].

mod context;
mod material;
mod mesh;
mod recording;
mod shaders;
mod solid;
mod texture;
mod textured;

pub use context::{BufferId, ProgramCache, ProgramId, ProgramSource, RenderContext, RenderError, TextureId};
pub use material::{Material, MaterialId, ShadingUniforms};
pub(crate) use material::MaterialSlot;
pub use mesh::{
    DrawRange, FaceVertex, Geometry, HeightField, MaterialRange, MaterialSpec, Mesh, MeshInfo, Model,
    ModelGeometry, Shape,
};
pub use recording::{Command, RecordingContext};
pub use solid::SolidMaterial;
pub use texture::{TextureError, TextureImage};
pub use textured::TextureMaterial;
