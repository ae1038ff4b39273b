//! Material contract
//!
//! A material turns a mesh's buffers plus the frame's [`SceneInfo`] into GPU
//! state. It never draws: the mesh issues the draw call right after `bind`.

use std::any::Any;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use hecs::Entity;

use super::{MeshInfo, RenderContext, RenderError};
use crate::core::{Property, SceneError};
use crate::math::{Matrix4, m4};
use crate::scene::{Deferred, SceneGraph, SceneInfo};

/// Handle to a material stored in a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) Entity);

impl MaterialId {
    /// Entity holding the material
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.0
    }
}

/// Shading behavior bound by meshes at render time
pub trait Material: Send + Sync + std::fmt::Debug + 'static {
    /// Link the material's program on `ctx`. Called once per mesh that uses
    /// the material; programs are memoized per context.
    ///
    /// # Errors
    ///
    /// Returns an error if the program fails to link
    fn init_gl(&mut self, ctx: &mut dyn RenderContext) -> Result<(), RenderError>;

    /// CPU-side work after the material or the mesh geometry changed
    fn apply(&mut self, ctx: &mut dyn RenderContext, info: &MeshInfo);

    /// Bind program, attributes, uniforms and textures for one draw
    ///
    /// # Errors
    ///
    /// Returns an error if the material cannot be bound on `ctx`
    fn bind(
        &mut self,
        ctx: &mut dyn RenderContext,
        world: &Matrix4,
        scene: &SceneInfo,
        info: &MeshInfo,
    ) -> Result<(), RenderError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Component holding a material inside the scene graph's world
pub(crate) struct MaterialSlot(pub(crate) Box<dyn Material>);

/// Uniform block shared by the built-in materials.
///
/// Matrices are column-major, the layout GL-style APIs expect.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadingUniforms {
    pub view_matrix: [f32; 16],
    pub object_matrix: [f32; 16],
    /// `transpose(inverse(object))`
    pub normal_matrix: [f32; 16],
    pub light_position: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient_color: [f32; 4],
    pub diffuse_color: [f32; 4],
    pub specular_color: [f32; 4],
    pub shininess: f32,
    /// 1.0 if the scene has a light, 0.0 otherwise
    pub has_light: f32,
    _padding: [f32; 2],
}

impl ShadingUniforms {
    /// Fill matrices, ambience and the primary light from the frame state
    #[must_use]
    pub fn new(world: &Matrix4, scene: &SceneInfo) -> Self {
        let (light_position, light_color, has_light) = match scene.primary_light() {
            Some(light) => (light.position.extend(1.0), light.color.extend(1.0), 1.0),
            None => (glam::Vec4::W, glam::Vec4::ZERO, 0.0),
        };
        Self {
            view_matrix: scene.view_matrix.to_cols_array(),
            object_matrix: world.to_cols_array(),
            normal_matrix: m4::transpose(&m4::inverse(world)).to_cols_array(),
            light_position: light_position.to_array(),
            light_color: light_color.to_array(),
            ambient_color: scene.ambience.extend(1.0).to_array(),
            diffuse_color: [1.0; 4],
            specular_color: [1.0; 4],
            shininess: 0.0,
            has_light,
            _padding: [0.0; 2],
        }
    }

    #[must_use]
    pub fn with_diffuse(mut self, color: Vec3) -> Self {
        self.diffuse_color = color.extend(1.0).to_array();
        self
    }

    #[must_use]
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }
}

impl SceneGraph {
    /// Store a material and return its handle
    pub fn add_material(&mut self, material: impl Material) -> MaterialId {
        MaterialId(self.world.spawn((MaterialSlot(Box::new(material)),)))
    }

    /// Read a material as its concrete type
    ///
    /// # Errors
    ///
    /// Returns an error if the material does not exist or is not an `M`
    pub fn material<M: Material + Clone>(&self, id: MaterialId) -> Result<M, SceneError> {
        let slot = self.component::<MaterialSlot>(id.0)?;
        slot.0
            .as_any()
            .downcast_ref::<M>()
            .cloned()
            .ok_or_else(|| SceneError::MissingComponent {
                entity: id.0,
                component: std::any::type_name::<M>().rsplit("::").next().unwrap_or("Material"),
            })
    }

    /// Mutate a material in place.
    ///
    /// Every mesh using it gets an `ApplyMaterial` job and is invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if the material does not exist or is not an `M`
    pub fn update_material<M: Material>(
        &mut self,
        id: MaterialId,
        f: impl FnOnce(&mut M),
    ) -> Result<(), SceneError> {
        {
            let mut slot = self.component_mut::<MaterialSlot>(id.0)?;
            let material = slot
                .0
                .as_any_mut()
                .downcast_mut::<M>()
                .ok_or(SceneError::MissingComponent {
                    entity: id.0,
                    component: "Material",
                })?;
            f(material);
        }
        self.material_changed(id);
        Ok(())
    }

    pub(crate) fn material_changed(&mut self, id: MaterialId) {
        for mesh in self.meshes_using(id) {
            if self.schedule(mesh, Deferred::ApplyMaterial(id)).is_ok() {
                self.notify(mesh, Property::Material);
                self.invalidate(mesh);
            }
        }
    }

    /// Remove a material. Meshes still using it log an error when drawn.
    ///
    /// # Errors
    ///
    /// Returns an error if the material does not exist
    pub fn remove_material(&mut self, id: MaterialId) -> Result<(), SceneError> {
        self.component::<MaterialSlot>(id.0)?;
        self.world
            .despawn(id.0)
            .map_err(|_| SceneError::NoSuchEntity(id.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::SolidMaterial;
    use crate::scene::{LightRecord, SceneInfo};

    #[test]
    fn test_uniforms_use_first_light_only() {
        let mut info = SceneInfo::new(None, Vec3::splat(0.1));
        info.lights.push(LightRecord {
            position: Vec3::new(1.0, 2.0, 3.0),
            color: Vec3::new(1.0, 0.0, 0.0),
            range: 10.0,
        });
        info.lights.push(LightRecord {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            range: 10.0,
        });

        let u = ShadingUniforms::new(&Matrix4::IDENTITY, &info);
        assert_eq!(u.light_position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.light_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(u.has_light, 1.0);
        assert_eq!(u.ambient_color, [0.1, 0.1, 0.1, 1.0]);
    }

    #[test]
    fn test_uniforms_without_light() {
        let info = SceneInfo::new(None, Vec3::ZERO);
        let u = ShadingUniforms::new(&Matrix4::IDENTITY, &info);
        assert_eq!(u.has_light, 0.0);
        assert_eq!(u.normal_matrix, Matrix4::IDENTITY.to_cols_array());
    }

    #[test]
    fn test_update_material_downcasts() {
        let mut graph = SceneGraph::new();
        let id = graph.add_material(SolidMaterial::default());

        graph
            .update_material::<SolidMaterial>(id, |m| m.set_shininess(8.0))
            .unwrap();
        assert_eq!(graph.material::<SolidMaterial>(id).unwrap().shininess(), 8.0);

        graph.remove_material(id).unwrap();
        assert!(graph.material::<SolidMaterial>(id).is_err());
    }
}
