//! Renderable meshes
//!
//! A mesh node keeps its shape on the CPU and uploads it lazily through a
//! `BuildGeometry` job, so meshes can be spawned before any context exists.

mod cube;
mod height;
mod model;
mod sphere;

use glam::{Vec2, Vec3};
use hecs::Entity;
use smallvec::{SmallVec, smallvec};

pub use height::HeightField;
pub use model::{FaceVertex, MaterialRange, MaterialSpec, Model, ModelGeometry};

use super::{BufferId, MaterialId, MaterialSlot, RenderContext};
use crate::core::{Property, SceneError};
use crate::math::geometry::{flatten2, flatten3};
use crate::scene::{Deferred, NodeKind, SceneGraph};

/// GPU buffers of an uploaded mesh, handed to materials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInfo {
    pub vertex: BufferId,
    pub normal: BufferId,
    pub texture: BufferId,
    pub tangent: BufferId,
    /// Number of vertices in the triangle list
    pub vertex_count: usize,
}

/// CPU-side triangle list, three vertices per triangle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    /// Empty when the shape has no tangents
    pub tangents: Vec<Vec3>,
}

impl Geometry {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Upload every attribute into its own buffer.
    ///
    /// Buffers of a `previous` upload are refilled in place; new ones are
    /// only created for the first upload. Missing tangents are uploaded as
    /// zeros so every mesh exposes the same four buffers.
    pub fn upload(&self, ctx: &mut dyn RenderContext, previous: Option<MeshInfo>) -> MeshInfo {
        let info = match previous {
            Some(previous) => MeshInfo {
                vertex_count: self.vertex_count(),
                ..previous
            },
            None => MeshInfo {
                vertex: ctx.create_buffer(),
                normal: ctx.create_buffer(),
                texture: ctx.create_buffer(),
                tangent: ctx.create_buffer(),
                vertex_count: self.vertex_count(),
            },
        };

        ctx.upload_buffer(info.vertex, &flatten3(&self.positions));
        ctx.upload_buffer(info.normal, &flatten3(&self.normals));
        ctx.upload_buffer(info.texture, &flatten2(&self.tex_coords));
        if self.tangents.is_empty() {
            ctx.upload_buffer(info.tangent, &vec![0.0; self.vertex_count() * 3]);
        } else {
            ctx.upload_buffer(info.tangent, &flatten3(&self.tangents));
        }
        info
    }
}

/// Geometry source of a mesh
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Unit cube centered on the origin
    Cube,
    /// Unit-radius sphere
    Sphere,
    /// Grid in the XZ plane with heights along Y
    HeightField(HeightField),
    /// Face-indexed model with per-range materials
    Model(Model),
}

impl Shape {
    /// Triangulate the shape
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        match self {
            Self::Cube => cube::geometry(),
            Self::Sphere => sphere::geometry(),
            Self::HeightField(field) => field.geometry(),
            Self::Model(model) => model.triangulate(),
        }
    }
}

/// Vertex range drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    pub material: Option<MaterialId>,
    pub first: usize,
    pub count: usize,
}

/// Mesh component
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub(crate) shape: Shape,
    pub(crate) material: Option<MaterialId>,
    pub(crate) info: Option<MeshInfo>,
}

impl Mesh {
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            material: None,
            info: None,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[must_use]
    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Uploaded buffers, `None` until the first prepare with a context
    #[must_use]
    pub fn info(&self) -> Option<MeshInfo> {
        self.info
    }

    pub(crate) fn build(&mut self, ctx: &mut dyn RenderContext) -> MeshInfo {
        let geometry = self.shape.geometry();
        let info = geometry.upload(ctx, self.info);
        log::debug!(
            "Uploaded {} triangles for {:?} mesh",
            geometry.triangle_count(),
            ShapeName(&self.shape)
        );
        self.info = Some(info);
        info
    }

    /// Every material this mesh draws with
    pub(crate) fn materials(&self) -> SmallVec<[MaterialId; 4]> {
        let mut ids: SmallVec<[MaterialId; 4]> = self.material.into_iter().collect();
        if let Shape::Model(model) = &self.shape {
            for id in model.library().map(|(_, id)| id) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    pub(crate) fn uses(&self, id: MaterialId) -> bool {
        self.materials().contains(&id)
    }

    /// Split the uploaded vertices into per-material draws.
    ///
    /// Models draw each closed material range with the material of that
    /// name; everything else draws all vertices with the mesh material.
    pub(crate) fn draw_ranges(&self, info: &MeshInfo) -> SmallVec<[DrawRange; 4]> {
        if let Shape::Model(model) = &self.shape {
            if !model.geometry().ranges.is_empty() {
                return model
                    .closed_ranges()
                    .map(|range| DrawRange {
                        material: model.material_for(&range.name),
                        first: range.first_face * 3,
                        count: range.face_count() * 3,
                    })
                    .collect();
            }
        }
        smallvec![DrawRange {
            material: self.material,
            first: 0,
            count: info.vertex_count,
        }]
    }
}

struct ShapeName<'a>(&'a Shape);

impl std::fmt::Debug for ShapeName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self.0 {
            Shape::Cube => "cube",
            Shape::Sphere => "sphere",
            Shape::HeightField(_) => "height field",
            Shape::Model(_) => "model",
        })
    }
}

impl SceneGraph {
    /// Spawn a mesh node. Geometry is uploaded on the next prepare.
    pub fn spawn_mesh(&mut self, name: impl Into<String>, mesh: Mesh) -> Entity {
        let is_model = matches!(mesh.shape, Shape::Model(_));
        let entity = self.spawn_node_with(name, NodeKind::Mesh, mesh);
        if let Ok(mut node) = self.node_mut(entity) {
            node.queue.push(Deferred::BuildGeometry);
        }
        if is_model {
            self.sync_model_library(entity);
        }
        entity
    }

    pub fn spawn_cube(&mut self, name: impl Into<String>) -> Entity {
        self.spawn_mesh(name, Mesh::new(Shape::Cube))
    }

    pub fn spawn_sphere(&mut self, name: impl Into<String>) -> Entity {
        self.spawn_mesh(name, Mesh::new(Shape::Sphere))
    }

    pub fn spawn_height_field(&mut self, name: impl Into<String>, field: HeightField) -> Entity {
        self.spawn_mesh(name, Mesh::new(Shape::HeightField(field)))
    }

    pub fn spawn_model(&mut self, name: impl Into<String>, model: Model) -> Entity {
        self.spawn_mesh(name, Mesh::new(Shape::Model(model)))
    }

    /// Assign the mesh material.
    ///
    /// Queues the material's program link and its `apply` step for the next
    /// prepare, then invalidates.
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a mesh or the material does not exist
    pub fn set_material(&mut self, entity: Entity, id: MaterialId) -> Result<(), SceneError> {
        self.component::<MaterialSlot>(id.0)?;
        self.component_mut::<Mesh>(entity)?.material = Some(id);
        {
            let mut node = self.node_mut(entity)?;
            node.queue.push(Deferred::InitMaterial(id));
            node.queue.push(Deferred::ApplyMaterial(id));
        }
        self.notify(entity, Property::Material);
        self.invalidate(entity);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `entity` is not a mesh
    pub fn mesh_material(&self, entity: Entity) -> Result<Option<MaterialId>, SceneError> {
        Ok(self.component::<Mesh>(entity)?.material)
    }

    /// Uploaded buffers of a mesh, `None` before its first prepare
    ///
    /// # Errors
    ///
    /// Returns an error if `entity` is not a mesh
    pub fn mesh_info(&self, entity: Entity) -> Result<Option<MeshInfo>, SceneError> {
        Ok(self.component::<Mesh>(entity)?.info)
    }

    /// # Errors
    ///
    /// Returns an error if `entity` is not a mesh
    pub fn shape(&self, entity: Entity) -> Result<Shape, SceneError> {
        Ok(self.component::<Mesh>(entity)?.shape.clone())
    }

    pub(crate) fn meshes_using(&self, id: MaterialId) -> Vec<Entity> {
        self.world
            .query::<&Mesh>()
            .iter()
            .filter(|(_, mesh)| mesh.uses(id))
            .map(|(entity, _)| entity)
            .collect()
    }

    /// Queue a fresh upload plus `apply` for every material of the mesh
    pub(crate) fn rebuild_geometry(&mut self, entity: Entity) -> Result<(), SceneError> {
        let materials = self.component::<Mesh>(entity)?.materials();
        {
            let mut node = self.node_mut(entity)?;
            node.queue.push(Deferred::BuildGeometry);
            for id in materials {
                node.queue.push(Deferred::ApplyMaterial(id));
            }
        }
        self.notify(entity, Property::Source);
        self.invalidate(entity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneEvent;
    use crate::renderer::{RecordingContext, SolidMaterial};

    #[test]
    fn test_upload_fills_missing_tangents() {
        let mut ctx = RecordingContext::new();
        let geometry = Shape::Cube.geometry();
        let info = geometry.upload(&mut ctx, None);

        assert_eq!(info.vertex_count, 36);
        assert_eq!(ctx.buffer_data(info.vertex).unwrap().len(), 36 * 3);
        assert_eq!(ctx.buffer_data(info.texture).unwrap().len(), 36 * 2);
        let tangents = ctx.buffer_data(info.tangent).unwrap();
        assert_eq!(tangents.len(), 36 * 3);
        assert!(tangents.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn test_rebuild_refills_existing_buffers() {
        let mut ctx = RecordingContext::new();
        let mut graph = SceneGraph::new();
        let terrain = graph.spawn_height_field("terrain", HeightField::new(2, 2));
        graph.flush(&mut ctx, terrain);
        let first = graph.mesh_info(terrain).unwrap().unwrap();

        graph.set_heights(terrain, vec![2.0; 4]).unwrap();
        graph.flush(&mut ctx, terrain);
        let second = graph.mesh_info(terrain).unwrap().unwrap();

        assert_eq!(first, second);
        let created = ctx
            .commands()
            .iter()
            .filter(|c| matches!(c, crate::renderer::Command::CreateBuffer(_)))
            .count();
        assert_eq!(created, 4);
        let positions = ctx.buffer_data(second.vertex).unwrap();
        assert!(positions.chunks(3).all(|p| p[1] == 2.0));
    }

    #[test]
    fn test_spawn_queues_geometry_build() {
        let mut graph = SceneGraph::new();
        let cube = graph.spawn_cube("cube");

        assert_eq!(graph.kind(cube).unwrap(), NodeKind::Mesh);
        assert_eq!(graph.node(cube).unwrap().pending_jobs(), 1);
        assert!(graph.mesh_info(cube).unwrap().is_none());
    }

    #[test]
    fn test_set_material_queues_init_and_apply() {
        let mut graph = SceneGraph::new();
        let cube = graph.spawn_cube("cube");
        let id = graph.add_material(SolidMaterial::default());
        graph.drain_events();

        graph.set_material(cube, id).unwrap();

        assert_eq!(graph.mesh_material(cube).unwrap(), Some(id));
        assert_eq!(graph.node(cube).unwrap().pending_jobs(), 3);
        let events = graph.drain_events();
        assert!(matches!(
            events[0],
            SceneEvent::PropertyChanged { property: Property::Material, .. }
        ));
        assert!(matches!(events[1], SceneEvent::Invalidate { .. }));
    }

    #[test]
    fn test_set_material_rejects_unknown_material() {
        let mut graph = SceneGraph::new();
        let cube = graph.spawn_cube("cube");
        let id = graph.add_material(SolidMaterial::default());
        graph.remove_material(id).unwrap();

        assert!(graph.set_material(cube, id).is_err());
        assert_eq!(graph.mesh_material(cube).unwrap(), None);
    }

    #[test]
    fn test_material_update_reaches_every_user() {
        let mut graph = SceneGraph::new();
        let id = graph.add_material(SolidMaterial::default());
        let a = graph.spawn_cube("a");
        let b = graph.spawn_sphere("b");
        let c = graph.spawn_cube("c");
        graph.set_material(a, id).unwrap();
        graph.set_material(b, id).unwrap();

        let mut users = graph.meshes_using(id);
        users.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(users, expected);

        graph.drain_events();
        graph
            .update_material::<SolidMaterial>(id, |m| m.set_color(Vec3::ONE))
            .unwrap();
        let invalidated = graph
            .drain_events()
            .iter()
            .filter(|e| matches!(e, SceneEvent::Invalidate { .. }))
            .count();
        assert_eq!(invalidated, 2);
        assert_eq!(graph.node(c).unwrap().pending_jobs(), 1);
    }

    #[test]
    fn test_single_range_without_model() {
        let mut ctx = RecordingContext::new();
        let mut mesh = Mesh::new(Shape::Sphere);
        let info = mesh.build(&mut ctx);

        let ranges = mesh.draw_ranges(&info);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].first, 0);
        assert_eq!(ranges[0].count, info.vertex_count);
        assert_eq!(ranges[0].material, None);
    }
}
