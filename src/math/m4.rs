//! 4x4 matrix algebra
//!
//! Every function is pure: it takes values, returns a freshly built matrix and
//! never touches its inputs. Angles are in degrees throughout.
//!
//! Row-major interchange (`to_row_major` / `from_row_major`) lists the sixteen
//! values row by row, so a translation occupies indices 3, 7 and 11.

use glam::{Mat4, Quat, Vec3, Vec4};

use super::{Matrix4, Vector3};

/// The identity matrix
#[must_use]
#[inline]
pub fn identity() -> Matrix4 {
    Mat4::IDENTITY
}

/// Standard matrix product `a * b`. Not commutative.
#[must_use]
#[inline]
pub fn multiply(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    *a * *b
}

/// Swap rows and columns
#[must_use]
#[inline]
pub fn transpose(m: &Matrix4) -> Matrix4 {
    m.transpose()
}

/// Determinant of `m`
#[must_use]
#[inline]
pub fn determinant(m: &Matrix4) -> f32 {
    m.determinant()
}

/// Inverse of `m`.
///
/// A singular matrix (`det == 0`) yields the identity instead of an error.
/// Callers that care must check [`determinant`] themselves.
#[must_use]
pub fn inverse(m: &Matrix4) -> Matrix4 {
    if m.determinant() == 0.0 {
        return Mat4::IDENTITY;
    }
    m.inverse()
}

/// Translation by `v`
#[must_use]
#[inline]
pub fn translation(v: Vector3) -> Matrix4 {
    Mat4::from_translation(v)
}

/// Non-uniform scale by `v`
#[must_use]
#[inline]
pub fn scaling(v: Vector3) -> Matrix4 {
    Mat4::from_scale(v)
}

/// Rotation about the X axis
#[must_use]
pub fn x_rotation(degrees: f32) -> Matrix4 {
    Mat4::from_rotation_x(degrees.to_radians())
}

/// Rotation about the Y axis
#[must_use]
pub fn y_rotation(degrees: f32) -> Matrix4 {
    Mat4::from_rotation_y(degrees.to_radians())
}

/// Rotation about the Z axis
#[must_use]
pub fn z_rotation(degrees: f32) -> Matrix4 {
    Mat4::from_rotation_z(degrees.to_radians())
}

/// Euler rotation composed as `x_rotation(rx) * y_rotation(ry) * z_rotation(rz)`
#[must_use]
pub fn rotation(rx: f32, ry: f32, rz: f32) -> Matrix4 {
    x_rotation(rx) * y_rotation(ry) * z_rotation(rz)
}

/// Quaternion for a rotation of `degrees` about `axis`.
///
/// The axis is normalized first unless it has zero length, in which case it
/// is used as given and the result degenerates to a scalar-only quaternion.
#[must_use]
pub fn quaternion(axis: Vector3, degrees: f32) -> Quat {
    let axis = if axis.length_squared() > 0.0 {
        axis.normalize()
    } else {
        axis
    };
    let half = degrees.to_radians() * 0.5;
    let (s, c) = half.sin_cos();
    Quat::from_xyzw(axis.x * s, axis.y * s, axis.z * s, c)
}

/// Rotation matrix built directly from the components of `q`
#[must_use]
pub fn rotation_by_quaternion(q: Quat) -> Matrix4 {
    let (w, x, y, z) = (q.w, q.x, q.y, q.z);
    from_row_major(&[
        1.0 - 2.0 * (y * y + z * z),
        2.0 * (x * y - w * z),
        2.0 * (x * z + w * y),
        0.0,
        2.0 * (x * y + w * z),
        1.0 - 2.0 * (x * x + z * z),
        2.0 * (y * z - w * x),
        0.0,
        2.0 * (x * z - w * y),
        2.0 * (y * z + w * x),
        1.0 - 2.0 * (x * x + y * y),
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
    ])
}

/// General perspective frustum with the given clip-plane bounds
#[must_use]
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix4 {
    from_row_major(&[
        2.0 * near / (right - left),
        0.0,
        (right + left) / (right - left),
        0.0,
        0.0,
        2.0 * near / (top - bottom),
        (top + bottom) / (top - bottom),
        0.0,
        0.0,
        0.0,
        -(far + near) / (far - near),
        -2.0 * far * near / (far - near),
        0.0,
        0.0,
        -1.0,
        0.0,
    ])
}

/// Symmetric perspective projection.
///
/// `fov` is the full vertical field of view in degrees. Requires finite
/// `near < far`.
#[must_use]
pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
    let y = (fov * std::f32::consts::PI / 360.0).tan() * near;
    let x = y * aspect;
    frustum(-x, x, -y, y, near, far)
}

/// Orthographic projection of the given box
#[must_use]
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix4 {
    from_row_major(&[
        2.0 / (right - left),
        0.0,
        0.0,
        (left + right) / (left - right),
        0.0,
        2.0 / (top - bottom),
        0.0,
        (bottom + top) / (bottom - top),
        0.0,
        0.0,
        2.0 / (near - far),
        (near + far) / (near - far),
        0.0,
        0.0,
        0.0,
        1.0,
    ])
}

/// Homogeneous product `m * v`
#[must_use]
#[inline]
pub fn multiply_vector(m: &Matrix4, v: Vec4) -> Vec4 {
    *m * v
}

/// Transform the point `p` (w = 1) and drop the w component
#[must_use]
#[inline]
pub fn transform_point(m: &Matrix4, p: Vector3) -> Vector3 {
    multiply_vector(m, p.extend(1.0)).truncate()
}

/// The sixteen values of `m`, row by row
#[must_use]
pub fn to_row_major(m: &Matrix4) -> [f32; 16] {
    m.transpose().to_cols_array()
}

/// Build a matrix from sixteen values listed row by row
#[must_use]
pub fn from_row_major(values: &[f32; 16]) -> Matrix4 {
    Mat4::from_cols_array(values).transpose()
}

/// Translation part of an affine matrix
#[must_use]
#[inline]
pub fn origin_of(m: &Matrix4) -> Vector3 {
    transform_point(m, Vec3::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn close(a: &Matrix4, b: &Matrix4) -> bool {
        a.abs_diff_eq(*b, EPS)
    }

    #[test]
    fn test_row_major_layout() {
        let m = translation(Vec3::new(1.0, 2.0, 3.0));
        let rows = to_row_major(&m);
        assert_eq!(rows[3], 1.0);
        assert_eq!(rows[7], 2.0);
        assert_eq!(rows[11], 3.0);
        assert_eq!(rows[15], 1.0);
        assert!(close(&from_row_major(&rows), &m));
    }

    #[test]
    fn test_multiply_is_not_commutative() {
        let t = translation(Vec3::new(5.0, 0.0, 0.0));
        let r = z_rotation(90.0);

        let tr = transform_point(&multiply(&t, &r), Vec3::X);
        let rt = transform_point(&multiply(&r, &t), Vec3::X);

        assert!(tr.abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), EPS));
        assert!(rt.abs_diff_eq(Vec3::new(0.0, 6.0, 0.0), EPS));
    }

    #[test]
    fn test_inverse_roundtrip() {
        let m = translation(Vec3::new(1.0, -2.0, 3.0))
            * scaling(Vec3::new(2.0, 3.0, 0.5))
            * rotation(30.0, 45.0, 60.0);

        assert!(close(&inverse(&inverse(&m)), &m));
        assert!(close(&multiply(&m, &inverse(&m)), &identity()));
    }

    #[test]
    fn test_singular_inverse_is_identity() {
        let flat = scaling(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(determinant(&flat), 0.0);
        assert_eq!(inverse(&flat), Mat4::IDENTITY);
        assert_eq!(inverse(&Mat4::ZERO), Mat4::IDENTITY);
    }

    #[test]
    fn test_quaternion_rotation_matches_axis_angle() {
        let q = quaternion(Vec3::new(0.0, 2.0, 0.0), 90.0);
        let m = rotation_by_quaternion(q);

        assert!(transform_point(&m, Vec3::X).abs_diff_eq(Vec3::NEG_Z, EPS));
        assert!(close(&m, &y_rotation(90.0)));
    }

    #[test]
    fn test_zero_axis_quaternion_degenerates() {
        let q = quaternion(Vec3::ZERO, 90.0);
        assert_eq!(q.x, 0.0);
        assert_eq!(q.y, 0.0);
        assert_eq!(q.z, 0.0);
        assert!(close(&rotation_by_quaternion(q), &identity()));
    }

    #[test]
    fn test_perspective_matches_gl_convention() {
        let ours = perspective(45.0, 1.5, 1.0, 100.0);
        let reference = Mat4::perspective_rh_gl(45.0_f32.to_radians(), 1.5, 1.0, 100.0);
        assert!(close(&ours, &reference));
    }

    #[test]
    fn test_perspective_accepts_arbitrary_planes() {
        let m = perspective(60.0, 1.0, 0.1, 5000.0);
        let near = m * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = m * Vec4::new(0.0, 0.0, -5000.0, 1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-3);
        assert!((far.z / far.w - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_orthographic_maps_box_to_clip_cube() {
        let m = orthographic(-10.0, 10.0, -5.0, 5.0, -10.0, 10.0);
        let corner = transform_point(&m, Vec3::new(10.0, 5.0, 0.0));
        assert!(corner.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), EPS));
        assert!(close(
            &m,
            &Mat4::orthographic_rh_gl(-10.0, 10.0, -5.0, 5.0, -10.0, 10.0)
        ));
    }

    #[test]
    fn test_multiply_vector_keeps_w() {
        let m = translation(Vec3::new(4.0, 3.0, 4.0));
        let v = multiply_vector(&m, Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(v, Vec4::new(4.0, 3.0, 4.0, 1.0));

        let d = multiply_vector(&m, Vec4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(d, Vec4::new(1.0, 0.0, 0.0, 0.0));
    }
}
