//! Single-color material

use std::any::Any;

use glam::Vec3;

use super::{Material, MeshInfo, RenderContext, RenderError, ShadingUniforms, shaders};
use crate::math::Matrix4;
use crate::scene::SceneInfo;

/// Lit material with one diffuse color
#[derive(Debug, Clone, PartialEq)]
pub struct SolidMaterial {
    color: Vec3,
    shininess: f32,
}

impl Default for SolidMaterial {
    fn default() -> Self {
        Self {
            color: Vec3::new(1.0, 1.0, 0.0),
            shininess: 0.0,
        }
    }
}

impl SolidMaterial {
    #[must_use]
    pub fn new(color: Vec3) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    #[must_use]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// Specular exponent
    #[must_use]
    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    pub fn set_shininess(&mut self, shininess: f32) {
        self.shininess = shininess;
    }
}

impl Material for SolidMaterial {
    fn init_gl(&mut self, ctx: &mut dyn RenderContext) -> Result<(), RenderError> {
        ctx.program(&shaders::SOLID).map(|_| ())
    }

    fn apply(&mut self, _ctx: &mut dyn RenderContext, _info: &MeshInfo) {}

    fn bind(
        &mut self,
        ctx: &mut dyn RenderContext,
        world: &Matrix4,
        scene: &SceneInfo,
        info: &MeshInfo,
    ) -> Result<(), RenderError> {
        let program = ctx
            .program_cache()
            .get(shaders::SOLID.name)
            .ok_or_else(|| RenderError::MissingProgram(shaders::SOLID.name.to_string()))?;

        ctx.use_program(program);
        ctx.bind_attribute(program, "position", info.vertex, 3);
        ctx.bind_attribute(program, "normal", info.normal, 3);

        let uniforms = ShadingUniforms::new(world, scene)
            .with_diffuse(self.color)
            .with_shininess(self.shininess);
        ctx.set_uniforms(program, bytemuck::bytes_of(&uniforms));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{Command, RecordingContext};

    fn mesh_info(ctx: &mut RecordingContext) -> MeshInfo {
        MeshInfo {
            vertex: ctx.create_buffer(),
            normal: ctx.create_buffer(),
            texture: ctx.create_buffer(),
            tangent: ctx.create_buffer(),
            vertex_count: 3,
        }
    }

    #[test]
    fn test_default_is_yellow_and_matte() {
        let m = SolidMaterial::default();
        assert_eq!(m.color(), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(m.shininess(), 0.0);
    }

    #[test]
    fn test_bind_requires_init() {
        let mut ctx = RecordingContext::new();
        let info = mesh_info(&mut ctx);
        let scene = SceneInfo::new(None, Vec3::ZERO);
        let mut m = SolidMaterial::default();

        assert!(matches!(
            m.bind(&mut ctx, &Matrix4::IDENTITY, &scene, &info),
            Err(RenderError::MissingProgram(_))
        ));

        m.init_gl(&mut ctx).unwrap();
        m.bind(&mut ctx, &Matrix4::IDENTITY, &scene, &info).unwrap();

        let uniforms: ShadingUniforms = bytemuck::pod_read_unaligned(ctx.uniform_uploads().last().unwrap());
        assert_eq!(uniforms.diffuse_color, [1.0, 1.0, 0.0, 1.0]);
        assert!(ctx.commands().iter().any(|c| matches!(
            c,
            Command::BindAttribute { name, components: 3, .. } if name == "normal"
        )));
    }

    #[test]
    fn test_two_materials_share_one_program() {
        let mut ctx = RecordingContext::new();
        SolidMaterial::default().init_gl(&mut ctx).unwrap();
        SolidMaterial::new(Vec3::ONE).init_gl(&mut ctx).unwrap();
        assert_eq!(ctx.programs_created(), 1);
    }
}
