//! Per-frame scene aggregate

use glam::Vec3;
use hecs::Entity;

use crate::math::{Matrix4, Vector3};

/// World-space light contributed by one visible light node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRecord {
    pub position: Vector3,
    pub color: Vec3,
    pub range: f32,
}

/// World-space point contributed by one visible collider node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderProbe {
    pub world_point: Vector3,
    /// Collider that receives the query result
    pub target: Entity,
}

/// State gathered by the prepare phase and read by the render phase.
///
/// Built fresh for every traversal and dropped when it ends.
#[derive(Debug, Clone)]
pub struct SceneInfo {
    /// Camera whose view this frame renders
    pub active_camera: Option<Entity>,
    /// `projection * inverse(camera world)`, identity until the camera is reached
    pub view_matrix: Matrix4,
    /// Ambient light color
    pub ambience: Vec3,
    pub lights: Vec<LightRecord>,
    pub colliders: Vec<ColliderProbe>,
    pub(crate) camera_resolved: bool,
}

impl SceneInfo {
    #[must_use]
    pub fn new(active_camera: Option<Entity>, ambience: Vec3) -> Self {
        Self {
            active_camera,
            view_matrix: Matrix4::IDENTITY,
            ambience,
            lights: Vec::new(),
            colliders: Vec::new(),
            camera_resolved: false,
        }
    }

    /// The light materials shade with.
    ///
    /// Every visible light is collected, but shading uses only the first one
    /// reached in traversal order.
    #[must_use]
    pub fn primary_light(&self) -> Option<&LightRecord> {
        self.lights.first()
    }

    /// Whether the active camera contributed the view matrix
    #[must_use]
    pub fn camera_resolved(&self) -> bool {
        self.camera_resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_light_is_first() {
        let mut info = SceneInfo::new(None, Vec3::ZERO);
        assert!(info.primary_light().is_none());

        for x in [1.0, 2.0] {
            info.lights.push(LightRecord {
                position: Vec3::new(x, 0.0, 0.0),
                color: Vec3::ONE,
                range: 100.0,
            });
        }

        assert_eq!(info.primary_light().map(|l| l.position.x), Some(1.0));
        assert!(!info.camera_resolved());
        assert_eq!(info.view_matrix, Matrix4::IDENTITY);
    }
}
