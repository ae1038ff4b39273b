//! Camera nodes

use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::{NodeKind, SceneGraph};
use crate::core::{Property, SceneError};
use crate::math::{Matrix4, m4};

/// Projection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Projection parameters of a camera node.
///
/// A camera only produces a view matrix while it is the active camera of the
/// frame being rendered; it has no notion of being active itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub(crate) projection: Projection,
    /// Vertical field of view in degrees
    pub(crate) field_of_view: f32,
    pub(crate) aspect: f32,
    pub(crate) near: f32,
    pub(crate) far: f32,
    /// Half width and half height of the orthographic box
    pub(crate) ortho_extent: f32,
    pub(crate) ortho_near: f32,
    pub(crate) ortho_far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective,
            field_of_view: 45.0,
            aspect: 1.0,
            near: 1.0,
            far: 100.0,
            ortho_extent: 10.0,
            ortho_near: -10.0,
            ortho_far: 10.0,
        }
    }
}

impl Camera {
    /// Perspective camera with the given field of view and aspect ratio
    #[must_use]
    pub fn perspective(field_of_view: f32, aspect: f32) -> Self {
        Self {
            field_of_view,
            aspect,
            ..Self::default()
        }
    }

    /// Orthographic camera over the default box
    #[must_use]
    pub fn orthographic() -> Self {
        Self {
            projection: Projection::Orthographic,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    #[must_use]
    pub fn with_ortho_box(mut self, extent: f32, near: f32, far: f32) -> Self {
        self.ortho_extent = extent;
        self.ortho_near = near;
        self.ortho_far = far;
        self
    }

    #[must_use]
    pub fn projection(&self) -> Projection {
        self.projection
    }

    #[must_use]
    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near and far clip planes of the perspective projection
    #[must_use]
    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Projection matrix for the current mode
    #[must_use]
    pub fn projection_matrix(&self) -> Matrix4 {
        match self.projection {
            Projection::Perspective => m4::perspective(self.field_of_view, self.aspect, self.near, self.far),
            Projection::Orthographic => {
                let e = self.ortho_extent;
                m4::orthographic(-e, e, -e, e, self.ortho_near, self.ortho_far)
            }
        }
    }

    /// View matrix for a camera whose world matrix is `world`
    #[must_use]
    pub fn view_matrix(&self, world: &Matrix4) -> Matrix4 {
        m4::multiply(&self.projection_matrix(), &m4::inverse(world))
    }
}

impl SceneGraph {
    /// Spawn a camera node
    pub fn spawn_camera(&mut self, name: impl Into<String>, camera: Camera) -> Entity {
        self.spawn_node_with(name, NodeKind::Camera, camera)
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a camera
    pub fn camera(&self, entity: Entity) -> Result<Camera, SceneError> {
        Ok(*self.component::<Camera>(entity)?)
    }

    fn update_camera(
        &mut self,
        entity: Entity,
        property: Property,
        f: impl FnOnce(&mut Camera),
    ) -> Result<(), SceneError> {
        f(&mut *self.component_mut::<Camera>(entity)?);
        self.notify(entity, property);
        self.invalidate(entity);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a camera
    pub fn set_aspect(&mut self, entity: Entity, aspect: f32) -> Result<(), SceneError> {
        self.update_camera(entity, Property::Aspect, |c| c.aspect = aspect)
    }

    /// Set the vertical field of view in degrees
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not a camera
    pub fn set_field_of_view(&mut self, entity: Entity, degrees: f32) -> Result<(), SceneError> {
        self.update_camera(entity, Property::FieldOfView, |c| c.field_of_view = degrees)
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a camera
    pub fn set_projection(&mut self, entity: Entity, projection: Projection) -> Result<(), SceneError> {
        self.update_camera(entity, Property::Projection, |c| c.projection = projection)
    }

    /// # Errors
    ///
    /// Returns an error if the entity is not a camera
    pub fn set_clip_planes(&mut self, entity: Entity, near: f32, far: f32) -> Result<(), SceneError> {
        self.update_camera(entity, Property::ClipPlanes, |c| {
            c.near = near;
            c.far = far;
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_defaults() {
        let camera = Camera::default();
        assert_eq!(camera.projection(), Projection::Perspective);
        assert_eq!(camera.field_of_view(), 45.0);
        assert_eq!(camera.clip_planes(), (1.0, 100.0));
        assert_eq!(camera.projection_matrix(), m4::perspective(45.0, 1.0, 1.0, 100.0));
    }

    #[test]
    fn test_orthographic_box() {
        let camera = Camera::orthographic();
        assert_eq!(
            camera.projection_matrix(),
            m4::orthographic(-10.0, 10.0, -10.0, 10.0, -10.0, 10.0)
        );
    }

    #[test]
    fn test_view_matrix_inverts_world() {
        let camera = Camera::perspective(60.0, 1.5);
        let world = m4::translation(Vec3::new(0.0, 2.0, 10.0));
        let view = camera.view_matrix(&world);

        let expected = camera.projection_matrix() * m4::translation(Vec3::new(0.0, -2.0, -10.0));
        assert!(view.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_setters_invalidate() {
        let mut graph = SceneGraph::new();
        let cam = graph.spawn_camera("cam", Camera::default());

        graph.set_aspect(cam, 2.0).unwrap();
        graph.set_projection(cam, Projection::Orthographic).unwrap();

        let camera = graph.camera(cam).unwrap();
        assert_eq!(camera.aspect(), 2.0);
        assert_eq!(camera.projection(), Projection::Orthographic);
        assert_eq!(graph.drain_events().len(), 4);
    }

    #[test]
    fn test_non_camera_is_rejected() {
        let mut graph = SceneGraph::new();
        let e = graph.spawn_entity("plain");
        assert_eq!(
            graph.set_aspect(e, 2.0),
            Err(SceneError::MissingComponent {
                entity: e,
                component: "Camera"
            })
        );
    }
}
