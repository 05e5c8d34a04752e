use gl::{self, types::*};

use trigon::backend::shader::ShaderBackend;
use trigon::backend::Handle;
use trigon::shader::StageType;

use crate::gl33::GL33;

unsafe impl ShaderBackend for GL33 {
  unsafe fn create_stage(&mut self, ty: StageType) -> Handle {
    Handle(gl::CreateShader(opengl_shader_type(ty)))
  }

  unsafe fn compile_stage(&mut self, stage: Handle, src: &str) {
    // pass the length along so that the source does not need to be NUL-terminated
    let ptr = src.as_ptr() as *const GLchar;
    let len = src.len() as GLint;

    gl::ShaderSource(stage.0, 1, &ptr, &len);
    gl::CompileShader(stage.0);
  }

  unsafe fn stage_compiled(&mut self, stage: Handle) -> bool {
    let mut compiled: GLint = gl::FALSE.into();
    gl::GetShaderiv(stage.0, gl::COMPILE_STATUS, &mut compiled);

    compiled == gl::TRUE.into()
  }

  unsafe fn stage_log(&mut self, stage: Handle, capacity: usize) -> Vec<u8> {
    let mut log_len: GLint = 0;
    gl::GetShaderiv(stage.0, gl::INFO_LOG_LENGTH, &mut log_len);

    read_info_log(log_len, capacity, |len, written, ptr| {
      gl::GetShaderInfoLog(stage.0, len, written, ptr)
    })
  }

  unsafe fn delete_stage(&mut self, stage: Handle) {
    gl::DeleteShader(stage.0);
  }

  unsafe fn create_program(&mut self) -> Handle {
    Handle(gl::CreateProgram())
  }

  unsafe fn attach_stage(&mut self, program: Handle, stage: Handle) {
    gl::AttachShader(program.0, stage.0);
  }

  unsafe fn detach_stage(&mut self, program: Handle, stage: Handle) {
    gl::DetachShader(program.0, stage.0);
  }

  unsafe fn link_program(&mut self, program: Handle) {
    gl::LinkProgram(program.0);
  }

  unsafe fn program_linked(&mut self, program: Handle) -> bool {
    let mut linked: GLint = gl::FALSE.into();
    gl::GetProgramiv(program.0, gl::LINK_STATUS, &mut linked);

    linked == gl::TRUE.into()
  }

  unsafe fn program_log(&mut self, program: Handle, capacity: usize) -> Vec<u8> {
    let mut log_len: GLint = 0;
    gl::GetProgramiv(program.0, gl::INFO_LOG_LENGTH, &mut log_len);

    read_info_log(log_len, capacity, |len, written, ptr| {
      gl::GetProgramInfoLog(program.0, len, written, ptr)
    })
  }

  unsafe fn use_program(&mut self, program: Handle) {
    self.state.borrow_mut().use_program(program.0);
  }

  unsafe fn delete_program(&mut self, program: Handle) {
    self.state.borrow_mut().unuse_program(program.0);
    gl::DeleteProgram(program.0);
  }
}

fn opengl_shader_type(t: StageType) -> GLenum {
  match t {
    StageType::VertexShader => gl::VERTEX_SHADER,
    StageType::FragmentShader => gl::FRAGMENT_SHADER,
  }
}

// Number of bytes to request from an info log of `log_len` bytes (NUL included).
fn info_log_request_len(log_len: GLint, capacity: usize) -> usize {
  (log_len.max(0) as usize).min(capacity)
}

unsafe fn read_info_log(
  log_len: GLint,
  capacity: usize,
  read: impl FnOnce(GLsizei, *mut GLsizei, *mut GLchar),
) -> Vec<u8> {
  let len = info_log_request_len(log_len, capacity);

  if len == 0 {
    return Vec::new();
  }

  let mut log = vec![0u8; len];
  let mut written: GLsizei = 0;
  read(len as GLsizei, &mut written, log.as_mut_ptr() as *mut GLchar);

  log.truncate(written.max(0) as usize);
  log
}
