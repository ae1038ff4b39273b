//! Triangle helpers shared by the procedural meshes

use glam::{Vec2, Vec3};

/// Unnormalized normal of the triangle `v1 v2 v3` (counter-clockwise front face)
#[must_use]
pub fn surface_normal(v1: Vec3, v2: Vec3, v3: Vec3) -> Vec3 {
    (v2 - v1).cross(v3 - v1)
}

/// Tangent of a textured triangle.
///
/// Degenerate texture coordinates produce a zero tangent.
#[must_use]
pub fn surface_tangent(v1: Vec3, v2: Vec3, v3: Vec3, uv1: Vec2, uv2: Vec2, uv3: Vec2) -> Vec3 {
    let e1 = v2 - v1;
    let e2 = v3 - v1;
    let d1 = uv2 - uv1;
    let d2 = uv3 - uv1;

    let det = d1.x * d2.y - d2.x * d1.y;
    let f = if det == 0.0 { 0.0 } else { 1.0 / det };

    (e1 * d2.y - e2 * d1.y) * f
}

/// Split the quad `a b c d` (clockwise from top-left when seen from the
/// front) into two counter-clockwise triangles: `d c a` and `a c b`.
#[must_use]
pub fn rect_surface<T: Copy>(vs: &[T], a: usize, b: usize, c: usize, d: usize) -> [T; 6] {
    [vs[d], vs[c], vs[a], vs[a], vs[c], vs[b]]
}

/// Flatten a list of vectors into interleaved floats
#[must_use]
pub fn flatten3(vs: &[Vec3]) -> Vec<f32> {
    vs.iter().flat_map(|v| v.to_array()).collect()
}

/// Flatten a list of 2D vectors into interleaved floats
#[must_use]
pub fn flatten2(vs: &[Vec2]) -> Vec<f32> {
    vs.iter().flat_map(|v| v.to_array()).collect()
}

/// Per-vertex normals for a flat triangle list: every vertex of a triangle
/// gets that triangle's normal.
#[must_use]
pub fn flat_normals(positions: &[Vec3]) -> Vec<Vec3> {
    positions
        .chunks_exact(3)
        .flat_map(|tri| {
            let n = surface_normal(tri[0], tri[1], tri[2]);
            [n, n, n]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_normal_faces_viewer() {
        let n = surface_normal(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert_eq!(n, Vec3::Z);
    }

    #[test]
    fn test_rect_surface_order() {
        let quad = ['a', 'b', 'c', 'd'];
        assert_eq!(rect_surface(&quad, 0, 1, 2, 3), ['d', 'c', 'a', 'a', 'c', 'b']);
    }

    #[test]
    fn test_tangent_follows_u_direction() {
        let t = surface_tangent(
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
        );
        assert_eq!(t, Vec3::X);
    }

    #[test]
    fn test_degenerate_tangent_is_zero() {
        let t = surface_tangent(Vec3::ZERO, Vec3::X, Vec3::Y, Vec2::ZERO, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(t, Vec3::ZERO);
    }

    #[test]
    fn test_flat_normals_repeat_per_triangle() {
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = flat_normals(&tri);
        assert_eq!(normals, vec![Vec3::Z; 3]);
    }
}
