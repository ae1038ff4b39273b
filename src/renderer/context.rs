//! GPU seam
//!
//! Everything the scene graph and its materials need from a graphics API goes
//! through [`RenderContext`]. Resource handles are opaque ids minted by the
//! context; the scene graph never sees a native object.

use glam::Vec4;
use rustc_hash::FxHashMap;

use super::TextureImage;
use crate::core::RenderState;

/// Handle to a vertex attribute buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Handle to an uploaded texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Shader sources for one program.
///
/// `name` is the memoization key: two sources with the same name are the
/// same program as far as [`ProgramCache`] is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramSource {
    /// Cache key
    pub name: &'static str,
    /// Vertex stage source
    pub vertex: &'static str,
    /// Fragment stage source
    pub fragment: &'static str,
}

/// Programs already linked on one context, keyed by [`ProgramSource::name`]
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: FxHashMap<&'static str, ProgramId>,
}

impl ProgramCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a program by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ProgramId> {
        self.programs.get(name).copied()
    }

    /// Remember a linked program
    pub fn insert(&mut self, name: &'static str, program: ProgramId) {
        self.programs.insert(name, program);
    }

    /// Number of cached programs
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Check if nothing has been linked yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Forget all programs (e.g. after context loss)
    pub fn clear(&mut self) {
        self.programs.clear();
    }
}

/// Errors raised by a render context or a material
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Compiling or linking a program failed
    ProgramError {
        /// Program name
        name: String,
        /// Compiler or linker log
        log: String,
    },
    /// A material was bound before its program was initialized
    MissingProgram(String),
    /// A mesh was drawn before its geometry was built
    MissingGeometry(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProgramError { name, log } => write!(f, "Program '{name}' failed: {log}"),
            Self::MissingProgram(name) => write!(f, "Program '{name}' is not initialized"),
            Self::MissingGeometry(name) => write!(f, "Mesh '{name}' has no geometry"),
        }
    }
}

impl std::error::Error for RenderError {}

/// A rasterizer the scene graph can draw into.
///
/// Calls arrive strictly from the traversal thread, in traversal order.
pub trait RenderContext {
    /// Apply fixed-function state
    fn set_state(&mut self, state: &RenderState);

    /// Set the drawable area in pixels
    fn viewport(&mut self, width: u32, height: u32);

    /// Clear color and depth
    fn clear(&mut self, color: Vec4);

    /// Allocate an attribute buffer
    fn create_buffer(&mut self) -> BufferId;

    /// Replace the contents of `buffer`
    fn upload_buffer(&mut self, buffer: BufferId, data: &[f32]);

    /// Compile and link a program.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ProgramError`] if compilation or linking fails
    fn create_program(&mut self, source: &ProgramSource) -> Result<ProgramId, RenderError>;

    /// Make `program` current
    fn use_program(&mut self, program: ProgramId);

    /// Feed `buffer` into the named attribute, `components` floats per vertex
    fn bind_attribute(&mut self, program: ProgramId, name: &str, buffer: BufferId, components: u32);

    /// Upload the program's uniform block
    fn set_uniforms(&mut self, program: ProgramId, bytes: &[u8]);

    /// Upload an RGBA image
    fn create_texture(&mut self, image: &TextureImage) -> TextureId;

    /// Bind a texture to a sampler unit, or unbind with `None`
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);

    /// Draw `count` vertices as triangles starting at vertex `first`
    fn draw_arrays(&mut self, first: usize, count: usize);

    /// Programs linked on this context
    fn program_cache(&mut self) -> &mut ProgramCache;

    /// Program for `source`, linking it on first use.
    ///
    /// # Errors
    ///
    /// Propagates link failures from [`RenderContext::create_program`]
    fn program(&mut self, source: &ProgramSource) -> Result<ProgramId, RenderError> {
        if let Some(program) = self.program_cache().get(source.name) {
            return Ok(program);
        }
        let program = self.create_program(source)?;
        self.program_cache().insert(source.name, program);
        Ok(program)
    }
}
