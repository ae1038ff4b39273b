//! Unit sphere tessellated on a latitude/longitude grid

use glam::{Vec2, Vec3};

use super::Geometry;
use crate::math::geometry::{flat_normals, rect_surface};

const STEP: i32 = 12;

fn location(longitude: f32, latitude: f32) -> Vec3 {
    let (lon, lat) = (longitude.to_radians(), latitude.to_radians());
    Vec3::new(lat.sin() * lon.cos(), lon.sin(), lat.cos() * lon.cos())
}

fn tex_location(longitude: f32, latitude: f32) -> Vec2 {
    Vec2::new(
        latitude / 360.0,
        1.0 - ((longitude + 90.0) / 2.0).to_radians().sin(),
    )
}

pub(super) fn geometry() -> Geometry {
    let mut positions = Vec::new();
    let mut tex_coords = Vec::new();

    let step = STEP as f32;
    for longitude in (-90..90).step_by(STEP as usize) {
        for latitude in (0..360).step_by(STEP as usize) {
            let (lon, lat) = (longitude as f32, latitude as f32);
            let corners = [(lon, lat), (lon + step, lat), (lon + step, lat + step), (lon, lat + step)];

            let vs = corners.map(|(lon, lat)| location(lon, lat));
            let ts = corners.map(|(lon, lat)| tex_location(lon, lat));
            positions.extend(rect_surface(&vs, 0, 1, 2, 3));
            tex_coords.extend(rect_surface(&ts, 0, 1, 2, 3));
        }
    }

    Geometry {
        normals: flat_normals(&positions),
        positions,
        tex_coords,
        tangents: Vec::new(),
    }
}
