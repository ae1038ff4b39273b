//! Image-mapped material

use std::any::Any;
use std::path::{Path, PathBuf};

use super::{Material, MeshInfo, RenderContext, RenderError, ShadingUniforms, TextureId, TextureImage, shaders};
use crate::math::Matrix4;
use crate::scene::SceneInfo;

/// Lit material sampling its diffuse color from an image.
///
/// Images are decoded when the source is set and uploaded the next time the
/// material is bound. A failed load is logged and leaves the previous image
/// in place.
#[derive(Debug, Clone, Default)]
pub struct TextureMaterial {
    source: Option<PathBuf>,
    pending: Option<TextureImage>,
    texture: Option<TextureId>,
}

impl TextureMaterial {
    /// Material without an image; it samples black until one is set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Material loading its image from `path`
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let mut material = Self::new();
        material.set_source(path);
        material
    }

    /// Material over already decoded pixels
    #[must_use]
    pub fn from_image(image: TextureImage) -> Self {
        let mut material = Self::new();
        material.set_image(image);
        material
    }

    /// Path of the last image that loaded successfully
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Load a new image from `path`
    pub fn set_source(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match TextureImage::from_path(path) {
            Ok(image) => {
                log::debug!("Loaded texture {} ({}x{})", path.display(), image.width(), image.height());
                self.source = Some(path.to_path_buf());
                self.pending = Some(image);
            }
            Err(err) => log::error!("Failed to load texture {}: {err}", path.display()),
        }
    }

    /// Replace the image with decoded pixels
    pub fn set_image(&mut self, image: TextureImage) {
        self.pending = Some(image);
    }

    /// Whether an image is waiting for upload
    #[must_use]
    pub fn has_pending_upload(&self) -> bool {
        self.pending.is_some()
    }

    /// Uploaded texture, if any
    #[must_use]
    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }
}

impl Material for TextureMaterial {
    fn init_gl(&mut self, ctx: &mut dyn RenderContext) -> Result<(), RenderError> {
        ctx.program(&shaders::TEXTURED).map(|_| ())
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
            .get(shaders::TEXTURED.name)
            .ok_or_else(|| RenderError::MissingProgram(shaders::TEXTURED.name.to_string()))?;

        if let Some(image) = self.pending.take() {
            self.texture = Some(ctx.create_texture(&image));
        }

        ctx.use_program(program);
        ctx.bind_attribute(program, "position", info.vertex, 3);
        ctx.bind_attribute(program, "tex_coord", info.texture, 2);
        ctx.bind_attribute(program, "normal", info.normal, 3);
        ctx.bind_texture(0, self.texture);

        let uniforms = ShadingUniforms::new(world, scene).with_shininess(32.0);
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
    use glam::Vec3;

    use super::*;
    use crate::renderer::{Command, RecordingContext};

    fn mesh_info(ctx: &mut RecordingContext) -> MeshInfo {
        MeshInfo {
            vertex: ctx.create_buffer(),
            normal: ctx.create_buffer(),
            texture: ctx.create_buffer(),
            tangent: ctx.create_buffer(),
            vertex_count: 6,
        }
    }

    #[test]
    fn test_upload_happens_once_at_bind() {
        let mut ctx = RecordingContext::new();
        let info = mesh_info(&mut ctx);
        let scene = SceneInfo::new(None, Vec3::ZERO);
        let mut m = TextureMaterial::from_image(TextureImage::white());
        assert!(m.has_pending_upload());

        m.init_gl(&mut ctx).unwrap();
        m.bind(&mut ctx, &Matrix4::IDENTITY, &scene, &info).unwrap();
        m.bind(&mut ctx, &Matrix4::IDENTITY, &scene, &info).unwrap();

        let uploads = ctx
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::CreateTexture { .. }))
            .count();
        assert_eq!(uploads, 1);
        assert!(!m.has_pending_upload());
        assert!(ctx.commands().contains(&Command::BindTexture {
            unit: 0,
            texture: m.texture()
        }));
    }

    #[test]
    fn test_failed_load_keeps_previous_image() {
        let mut m = TextureMaterial::from_image(TextureImage::white());
        m.set_source("/no/such/image.png");

        assert!(m.source().is_none());
        assert!(m.has_pending_upload());
    }
}
