//! Matrix and vector math
//!
//! Thin, pure layer over glam. Matrices use the column-vector convention
//! (`M * v`), so a world matrix composes as `parent * local` and a view matrix
//! as `projection * inverse(camera_world)`.

pub mod geometry;
pub mod m4;

/// Three-component vector used for locations, axes, scales and colors
pub type Vector3 = glam::Vec3;

/// 4x4 transform matrix
pub type Matrix4 = glam::Mat4;
