//! Scene graph
//!
//! Nodes, their kinds, the change protocol and the two traversal phases.

mod camera;
mod clone;
mod collider;
mod components;
mod graph;
mod info;
mod light;
mod transform;
mod traverse;

pub use camera::{Camera, Projection};
pub use clone::CloneTarget;
pub use collider::{Aabb, BoxVolumes, Collider, CollisionQuery};
pub use components::{Deferred, Node, NodeKind, ScheduleQueue};
pub use graph::SceneGraph;
pub use info::{ColliderProbe, LightRecord, SceneInfo};
pub use light::{Light, MIN_LIGHT_RANGE};
pub use transform::Transform;

/// Deepest nesting a traversal or parent walk follows before giving up.
/// Self-referencing clones would otherwise recurse forever.
pub(crate) const MAX_DEPTH: usize = 256;
