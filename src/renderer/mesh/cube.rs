//! Unit cube

use glam::{Vec2, Vec3};

use super::Geometry;
use crate::math::geometry::{flat_normals, rect_surface};

//     4------5
//   / |    / |
// 0------1   |
// |   |  |   |
// |   7--|---6
// | /    | /
// 3------2
const CORNERS: [Vec3; 8] = [
    Vec3::new(-0.5, 0.5, 0.5),
    Vec3::new(0.5, 0.5, 0.5),
    Vec3::new(0.5, -0.5, 0.5),
    Vec3::new(-0.5, -0.5, 0.5),
    Vec3::new(-0.5, 0.5, -0.5),
    Vec3::new(0.5, 0.5, -0.5),
    Vec3::new(0.5, -0.5, -0.5),
    Vec3::new(-0.5, -0.5, -0.5),
];

/// Quads as seen from outside: front, top, right, bottom, left, back
const FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 5, 1, 0],
    [1, 5, 6, 2],
    [3, 2, 6, 7],
    [4, 0, 3, 7],
    [5, 4, 7, 6],
];

const TEX_ANCHORS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

pub(super) fn geometry() -> Geometry {
    let positions: Vec<Vec3> = FACES
        .iter()
        .flat_map(|&[a, b, c, d]| rect_surface(&CORNERS, a, b, c, d))
        .collect();
    let tex_coords = FACES
        .iter()
        .flat_map(|_| rect_surface(&TEX_ANCHORS, 0, 1, 2, 3))
        .collect();

    Geometry {
        normals: flat_normals(&positions),
        positions,
        tex_coords,
        tangents: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_has_36_vertices() {
        let g = geometry();
        assert_eq!(g.vertex_count(), 36);
        assert_eq!(g.normals.len(), 36);
        assert_eq!(g.tex_coords.len(), 36);
    }

    #[test]
    fn test_normals_point_outwards() {
        let g = geometry();
        for (tri, normals) in g.positions.chunks(3).zip(g.normals.chunks(3)) {
            let center = (tri[0] + tri[1] + tri[2]) / 3.0;
            assert!(center.dot(normals[0]) > 0.0, "inward normal at {center}");
        }
    }
}
