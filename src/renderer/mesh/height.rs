//! Height-mapped terrain grid

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use hecs::Entity;
use image::imageops::FilterType;

use super::{Geometry, Mesh, Shape};
use crate::core::SceneError;
use crate::math::geometry::{rect_surface, surface_normal};
use crate::renderer::TextureError;
use crate::scene::SceneGraph;

/// Grid of `columns x rows` vertices spanning the unit square in XZ.
///
/// Heights range over `0..=1` along Y. Until a height map is set the grid
/// is flat.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    columns: u32,
    rows: u32,
    heights: Vec<f32>,
    source: Option<PathBuf>,
}

impl Default for HeightField {
    fn default() -> Self {
        Self::new(100, 100)
    }
}

impl HeightField {
    /// Flat grid; both dimensions are clamped to at least 2
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        let columns = columns.max(2);
        let rows = rows.max(2);
        Self {
            columns,
            rows,
            heights: vec![0.0; columns as usize * rows as usize],
            source: None,
        }
    }

    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Row-major heights
    #[must_use]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Height map the current heights came from
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn height_at(&self, column: u32, row: u32) -> f32 {
        self.heights
            .get(self.index(column, row))
            .copied()
            .unwrap_or(0.0)
    }

    /// Replace the heights with raw row-major data
    ///
    /// # Errors
    ///
    /// Returns an error if `heights` does not hold one value per vertex
    pub fn set_heights(&mut self, heights: Vec<f32>) -> Result<(), SceneError> {
        let expected = self.columns as usize * self.rows as usize;
        if heights.len() != expected {
            return Err(SceneError::ImportError(format!(
                "height field is {}x{} but got {} heights",
                self.columns,
                self.rows,
                heights.len()
            )));
        }
        self.heights = heights;
        self.source = None;
        Ok(())
    }

    /// Sample heights from the luminance of an image, scaled to the grid
    pub fn set_image(&mut self, img: &image::DynamicImage) {
        let luma = image::imageops::resize(&img.to_luma8(), self.columns, self.rows, FilterType::Triangle);
        self.heights = luma.pixels().map(|p| f32::from(p.0[0]) / 255.0).collect();
    }

    /// Load the height map at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded; the current
    /// heights are kept
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<(), TextureError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| TextureError::IoError(e.to_string()))?;
        let img =
            image::load_from_memory(&bytes).map_err(|e| TextureError::DecodeError(e.to_string()))?;
        self.set_image(&img);
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    fn index(&self, column: u32, row: u32) -> usize {
        row as usize * self.columns as usize + column as usize
    }

    fn vertex(&self, column: u32, row: u32) -> Vec3 {
        Vec3::new(
            column as f32 / self.columns as f32 - 0.5,
            self.height_at(column, row),
            row as f32 / self.rows as f32 - 0.5,
        )
    }

    /// Interior vertices average the four triangles around them; border
    /// vertices point straight up.
    fn normal(&self, col: u32, row: u32) -> Vec3 {
        if col == 0 || row == 0 || col + 1 >= self.columns || row + 1 >= self.rows {
            return Vec3::Y;
        }
        let v = |c: u32, r: u32| self.vertex(c, r);
        let center = v(col, row);
        let sum = surface_normal(v(col - 1, row - 1), center, v(col, row - 1))
            + surface_normal(v(col, row - 1), center, v(col + 1, row - 1))
            + surface_normal(v(col - 1, row + 1), center, v(col - 1, row))
            + surface_normal(v(col + 1, row), center, v(col, row + 1));
        sum.try_normalize().unwrap_or(Vec3::Y)
    }

    pub(super) fn geometry(&self) -> Geometry {
        let mut grid = Vec::with_capacity(self.heights.len());
        for row in 0..self.rows {
            for col in 0..self.columns {
                let tex = Vec2::new(col as f32 / self.columns as f32, row as f32 / self.rows as f32);
                grid.push((self.vertex(col, row), self.normal(col, row), tex));
            }
        }

        let quads = (self.columns as usize - 1) * (self.rows as usize - 1);
        let mut geometry = Geometry {
            positions: Vec::with_capacity(quads * 6),
            normals: Vec::with_capacity(quads * 6),
            tex_coords: Vec::with_capacity(quads * 6),
            tangents: Vec::new(),
        };
        for row in 1..self.rows {
            for col in 1..self.columns {
                let corners = [
                    self.index(col - 1, row - 1),
                    self.index(col, row - 1),
                    self.index(col, row),
                    self.index(col - 1, row),
                ];
                for i in rect_surface(&corners, 0, 1, 2, 3) {
                    let (position, normal, tex) = grid[i];
                    geometry.positions.push(position);
                    geometry.normals.push(normal);
                    geometry.tex_coords.push(tex);
                }
            }
        }
        geometry
    }
}

impl SceneGraph {
    fn with_height_field<R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&mut HeightField) -> R,
    ) -> Result<R, SceneError> {
        let mut mesh = self.component_mut::<Mesh>(entity)?;
        match &mut mesh.shape {
            Shape::HeightField(field) => Ok(f(field)),
            _ => Err(SceneError::MissingComponent {
                entity,
                component: "HeightField",
            }),
        }
    }

    /// Load a height map into a height-field mesh.
    ///
    /// A file that fails to load is logged and the mesh keeps its current
    /// heights.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a height-field mesh
    pub fn set_height_source(&mut self, entity: Entity, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        log::debug!("Loading height map {}", path.display());
        match self.with_height_field(entity, |field| field.load_image(path))? {
            Ok(()) => self.rebuild_geometry(entity),
            Err(err) => {
                log::error!("Failed to load height map {}: {err}", path.display());
                Ok(())
            }
        }
    }

    /// Replace the heights of a height-field mesh with raw data
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a height-field mesh or the data
    /// does not match its grid
    pub fn set_heights(&mut self, entity: Entity, heights: Vec<f32>) -> Result<(), SceneError> {
        self.with_height_field(entity, |field| field.set_heights(heights))??;
        self.rebuild_geometry(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Property, SceneEvent};

    #[test]
    fn test_flat_grid() {
        let field = HeightField::new(3, 4);
        let g = field.geometry();

        assert_eq!(g.vertex_count(), 2 * 3 * 6);
        assert!(g.positions.iter().all(|p| p.y == 0.0));
        assert!(g.normals.iter().all(|&n| n == Vec3::Y));
        assert_eq!(g.positions[2], Vec3::new(-0.5, 0.0, -0.5));
    }

    #[test]
    fn test_triangles_face_up() {
        let g = HeightField::new(4, 4).geometry();
        for tri in g.positions.chunks(3) {
            assert!(surface_normal(tri[0], tri[1], tri[2]).y > 0.0);
        }
    }

    #[test]
    fn test_slope_tilts_interior_normals() {
        let mut field = HeightField::new(3, 3);
        // Rises along +X
        field
            .set_heights(vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 0.0, 0.5, 1.0])
            .unwrap();

        let n = field.normal(1, 1);
        assert!((n.length() - 1.0).abs() < 1e-5);
        assert!(n.x < 0.0 && n.y > 0.0);
        assert!(n.z.abs() < 1e-5);
        assert_eq!(field.normal(0, 1), Vec3::Y);
    }

    #[test]
    fn test_image_is_resampled_to_grid() {
        let img = image::DynamicImage::ImageLuma8(image::GrayImage::from_pixel(8, 8, image::Luma([255])));
        let mut field = HeightField::new(4, 2);
        field.set_image(&img);

        assert_eq!(field.heights().len(), 8);
        assert!(field.heights().iter().all(|&h| (h - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_wrong_height_count_is_rejected() {
        let mut field = HeightField::new(2, 2);
        assert!(field.set_heights(vec![1.0; 3]).is_err());
        assert_eq!(field.heights(), &[0.0; 4]);
    }

    #[test]
    fn test_failed_source_keeps_heights() {
        let mut graph = SceneGraph::new();
        let terrain = graph.spawn_height_field("terrain", HeightField::new(2, 2));
        graph.set_heights(terrain, vec![0.25; 4]).unwrap();
        graph.drain_events();

        graph.set_height_source(terrain, "/no/such/map.png").unwrap();

        assert!(graph.drain_events().is_empty());
        match graph.shape(terrain).unwrap() {
            Shape::HeightField(field) => assert_eq!(field.heights(), &[0.25; 4]),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_new_heights_rebuild_geometry() {
        let mut graph = SceneGraph::new();
        let terrain = graph.spawn_height_field("terrain", HeightField::new(2, 2));
        graph.drain_events();

        graph.set_heights(terrain, vec![1.0; 4]).unwrap();

        assert_eq!(graph.node(terrain).unwrap().pending_jobs(), 2);
        assert!(matches!(
            graph.drain_events()[0],
            SceneEvent::PropertyChanged { property: Property::Source, .. }
        ));
        let cube = graph.spawn_cube("cube");
        assert!(graph.set_heights(cube, vec![]).is_err());
    }
}
