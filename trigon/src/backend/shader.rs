//! Shader backend.

use crate::backend::Handle;
use crate::shader::StageType;

/// Shader stage and program objects.
pub unsafe trait ShaderBackend {
  /// Allocate a shader object for the given stage.
  ///
  /// Returns [`Handle::NULL`] if the object could not be allocated.
  unsafe fn create_stage(&mut self, ty: StageType) -> Handle;

  /// Submit the source text of a stage and request its compilation.
  unsafe fn compile_stage(&mut self, stage: Handle, src: &str);

  /// Whether the last compilation of the stage succeeded.
  unsafe fn stage_compiled(&mut self, stage: Handle) -> bool;

  /// Read at most `capacity` bytes of the stage info log.
  unsafe fn stage_log(&mut self, stage: Handle, capacity: usize) -> Vec<u8>;

  /// Release a shader object.
  unsafe fn delete_stage(&mut self, stage: Handle);

  /// Allocate a program object.
  ///
  /// Returns [`Handle::NULL`] if the object could not be allocated.
  unsafe fn create_program(&mut self) -> Handle;

  unsafe fn attach_stage(&mut self, program: Handle, stage: Handle);

  unsafe fn detach_stage(&mut self, program: Handle, stage: Handle);

  unsafe fn link_program(&mut self, program: Handle);

  /// Whether the last link of the program succeeded.
  unsafe fn program_linked(&mut self, program: Handle) -> bool;

  /// Read at most `capacity` bytes of the program info log.
  unsafe fn program_log(&mut self, program: Handle, capacity: usize) -> Vec<u8>;

  /// Make the program the active one.
  unsafe fn use_program(&mut self, program: Handle);

  /// Release a program object.
  unsafe fn delete_program(&mut self, program: Handle);
}
