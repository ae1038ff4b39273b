//! Local transform with cached matrices
//!
//! The local matrix is `translation(location) * scaling(scale) *
//! rotation(quaternion(axis, angle))`. Both it and its inverse are
//! recomputed on every write, so a read never sees a stale matrix.

use glam::Vec3;

use crate::math::{Matrix4, Vector3, m4};

/// Location, axis-angle rotation and scale of a node, relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    location: Vector3,
    rotation_axis: Vector3,
    /// Degrees
    rotation_angle: f32,
    scale: Vector3,

    matrix: Matrix4,
    inverse_matrix: Matrix4,
}

impl Transform {
    /// Identity transform: origin, no rotation about +Y, unit scale
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(Vec3::ZERO, Vec3::Y, 0.0, Vec3::ONE)
    }

    /// Create a transform with just a location
    #[must_use]
    pub fn from_location(location: Vector3) -> Self {
        Self::from_parts(location, Vec3::Y, 0.0, Vec3::ONE)
    }

    /// Create from all four parts
    #[must_use]
    pub fn from_parts(location: Vector3, rotation_axis: Vector3, rotation_angle: f32, scale: Vector3) -> Self {
        let mut transform = Self {
            location,
            rotation_axis,
            rotation_angle,
            scale,
            matrix: Matrix4::IDENTITY,
            inverse_matrix: Matrix4::IDENTITY,
        };
        transform.refresh();
        transform
    }

    fn refresh(&mut self) {
        let rotation = m4::rotation_by_quaternion(m4::quaternion(self.rotation_axis, self.rotation_angle));
        self.matrix = m4::translation(self.location) * m4::scaling(self.scale) * rotation;
        self.inverse_matrix = m4::inverse(&self.matrix);
    }

    #[must_use]
    #[inline]
    pub fn location(&self) -> Vector3 {
        self.location
    }

    #[must_use]
    #[inline]
    pub fn rotation_axis(&self) -> Vector3 {
        self.rotation_axis
    }

    /// Rotation angle in degrees
    #[must_use]
    #[inline]
    pub fn rotation_angle(&self) -> f32 {
        self.rotation_angle
    }

    #[must_use]
    #[inline]
    pub fn scale(&self) -> Vector3 {
        self.scale
    }

    /// Local matrix
    #[must_use]
    #[inline]
    pub fn matrix(&self) -> Matrix4 {
        self.matrix
    }

    /// Inverse of the local matrix (identity if the matrix is singular)
    #[must_use]
    #[inline]
    pub fn inverse_matrix(&self) -> Matrix4 {
        self.inverse_matrix
    }

    pub fn set_location(&mut self, location: Vector3) {
        self.location = location;
        self.refresh();
    }

    pub fn set_rotation_axis(&mut self, axis: Vector3) {
        self.rotation_axis = axis;
        self.refresh();
    }

    /// Set the rotation angle in degrees
    pub fn set_rotation_angle(&mut self, degrees: f32) {
        self.rotation_angle = degrees;
        self.refresh();
    }

    pub fn set_scale(&mut self, scale: Vector3) {
        self.scale = scale;
        self.refresh();
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(t: &Transform) -> Matrix4 {
        m4::translation(t.location())
            * m4::scaling(t.scale())
            * m4::rotation_by_quaternion(m4::quaternion(t.rotation_axis(), t.rotation_angle()))
    }

    #[test]
    fn test_default_is_identity() {
        let t = Transform::new();
        assert_eq!(t.matrix(), Matrix4::IDENTITY);
        assert_eq!(t.inverse_matrix(), Matrix4::IDENTITY);
        assert_eq!(t.rotation_axis(), Vec3::Y);
    }

    #[test]
    fn test_setter_order_does_not_matter() {
        let mut a = Transform::new();
        a.set_location(Vec3::new(1.0, 2.0, 3.0));
        a.set_scale(Vec3::new(2.0, 1.0, 0.5));
        a.set_rotation_axis(Vec3::X);
        a.set_rotation_angle(30.0);

        let mut b = Transform::new();
        b.set_rotation_angle(30.0);
        b.set_rotation_axis(Vec3::X);
        b.set_scale(Vec3::new(2.0, 1.0, 0.5));
        b.set_location(Vec3::new(1.0, 2.0, 3.0));

        assert!(a.matrix().abs_diff_eq(b.matrix(), 1e-6));
        assert!(a.matrix().abs_diff_eq(expected(&a), 1e-6));
    }

    #[test]
    fn test_inverse_tracks_matrix() {
        let mut t = Transform::from_location(Vec3::new(0.0, 0.0, -5.0));
        t.set_rotation_angle(45.0);

        let product = t.matrix() * t.inverse_matrix();
        assert!(product.abs_diff_eq(Matrix4::IDENTITY, 1e-5));
    }

    #[test]
    fn test_zero_scale_inverse_falls_back_to_identity() {
        let mut t = Transform::new();
        t.set_scale(Vec3::ZERO);
        assert_eq!(t.inverse_matrix(), Matrix4::IDENTITY);
    }
}
