//! A retained-mode scene graph for real-time 3D rendering
//!
//! This crate provides:
//! - Entity transforms composed into world matrices through a node hierarchy
//! - A two-phase prepare/render traversal with cameras, lights and colliders
//! - Materials and meshes drawn through a pluggable render context
//! - A view that coalesces scene changes into one traversal per frame

pub mod core;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod view;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{FrameStats, SceneDescription, SceneError, SceneEvent, ViewConfig};
    pub use crate::math::{Matrix4, Vector3, m4};
    pub use crate::renderer::{
        HeightField, Material, MaterialId, Mesh, Model, RecordingContext, RenderContext, SolidMaterial,
        TextureMaterial,
    };
    pub use crate::scene::{Camera, Light, Projection, SceneGraph, SceneInfo};
    pub use crate::view::{FrameHost, ManualFrameHost, View};
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
    pub use hecs::Entity;
}
