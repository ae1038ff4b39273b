//! Headless render context
//!
//! [`RecordingContext`] implements [`RenderContext`] by writing every call
//! into a command list instead of talking to a GPU. It backs the demo binary
//! and the test suite, and is a convenient reference when porting the seam
//! to a real graphics API.

use glam::Vec4;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{BufferId, ProgramCache, ProgramId, ProgramSource, RenderContext, RenderError, TextureId, TextureImage};
use crate::core::RenderState;

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetState(RenderState),
    Viewport {
        width: u32,
        height: u32,
    },
    Clear(Vec4),
    CreateBuffer(BufferId),
    UploadBuffer {
        buffer: BufferId,
        len: usize,
    },
    CreateProgram {
        program: ProgramId,
        name: &'static str,
    },
    UseProgram(ProgramId),
    BindAttribute {
        program: ProgramId,
        name: String,
        buffer: BufferId,
        components: u32,
    },
    SetUniforms {
        program: ProgramId,
        bytes: Vec<u8>,
    },
    CreateTexture {
        texture: TextureId,
        width: u32,
        height: u32,
    },
    BindTexture {
        unit: u32,
        texture: Option<TextureId>,
    },
    DrawArrays {
        first: usize,
        count: usize,
    },
}

/// Render context that records instead of drawing
#[derive(Debug, Default)]
pub struct RecordingContext {
    commands: Vec<Command>,
    next_id: u32,
    programs: ProgramCache,
    programs_created: usize,
    failing: FxHashSet<&'static str>,
    buffers: FxHashMap<BufferId, Vec<f32>>,
}

impl RecordingContext {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, command: Command) {
        log::trace!("{command:?}");
        self.commands.push(command);
    }

    /// Make every future link of the named program fail
    pub fn fail_program(&mut self, name: &'static str) {
        self.failing.insert(name);
    }

    /// Commands recorded so far
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Take the recorded commands, leaving the list empty
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Number of recorded draw calls
    #[must_use]
    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawArrays { .. }))
            .count()
    }

    /// Number of programs actually linked
    #[must_use]
    pub fn programs_created(&self) -> usize {
        self.programs_created
    }

    /// Last data uploaded into `buffer`
    #[must_use]
    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[f32]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Every uniform block uploaded so far, oldest first
    pub fn uniform_uploads(&self) -> impl Iterator<Item = &[u8]> {
        self.commands.iter().filter_map(|c| match c {
            Command::SetUniforms { bytes, .. } => Some(bytes.as_slice()),
            _ => None,
        })
    }
}

impl RenderContext for RecordingContext {
    fn set_state(&mut self, state: &RenderState) {
        self.record(Command::SetState(*state));
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.record(Command::Viewport { width, height });
    }

    fn clear(&mut self, color: Vec4) {
        self.record(Command::Clear(color));
    }

    fn create_buffer(&mut self) -> BufferId {
        let buffer = BufferId(self.next());
        self.record(Command::CreateBuffer(buffer));
        buffer
    }

    fn upload_buffer(&mut self, buffer: BufferId, data: &[f32]) {
        self.buffers.insert(buffer, data.to_vec());
        self.record(Command::UploadBuffer {
            buffer,
            len: data.len(),
        });
    }

    fn create_program(&mut self, source: &ProgramSource) -> Result<ProgramId, RenderError> {
        if self.failing.contains(source.name) {
            return Err(RenderError::ProgramError {
                name: source.name.to_string(),
                log: "link failed".to_string(),
            });
        }
        let program = ProgramId(self.next());
        self.programs_created += 1;
        self.record(Command::CreateProgram {
            program,
            name: source.name,
        });
        Ok(program)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.record(Command::UseProgram(program));
    }

    fn bind_attribute(&mut self, program: ProgramId, name: &str, buffer: BufferId, components: u32) {
        self.record(Command::BindAttribute {
            program,
            name: name.to_string(),
            buffer,
            components,
        });
    }

    fn set_uniforms(&mut self, program: ProgramId, bytes: &[u8]) {
        self.record(Command::SetUniforms {
            program,
            bytes: bytes.to_vec(),
        });
    }

    fn create_texture(&mut self, image: &TextureImage) -> TextureId {
        let texture = TextureId(self.next());
        self.record(Command::CreateTexture {
            texture,
            width: image.width(),
            height: image.height(),
        });
        texture
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        self.record(Command::BindTexture { unit, texture });
    }

    fn draw_arrays(&mut self, first: usize, count: usize) {
        self.record(Command::DrawArrays { first, count });
    }

    fn program_cache(&mut self) -> &mut ProgramCache {
        &mut self.programs
    }
}
