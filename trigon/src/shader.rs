//! Shader API.
//!
//! Shaders go through two steps before they can be used by the render loop:
//!
//! 1. Each [`ShaderSource`] is compiled into a [`CompiledShader`] by a [`ShaderCompiler`].
//! 2. A set of compiled shaders, one per stage, is linked into a [`LinkedProgram`] by a
//!    [`ProgramLinker`]. Linking consumes the compiled shaders.
//!
//! Neither step returns a `Result`. The native APIs report compile and link failures as a status
//! plus an info log, and so do the types of this module: a failed stage or program is a value
//! the caller inspects ([`CompiledShader::status`], [`LinkedProgram::status`]) and decides what
//! to do with.

pub mod program;
pub mod stage;

pub use self::program::{LinkStatus, LinkedProgram, ProgramLinker, StageSetError};
pub use self::stage::{CompileStatus, CompiledShader, ShaderCompiler, ShaderSource, StageType};

/// Maximum number of bytes read from a stage or program info log.
pub const INFO_LOG_CAPACITY: usize = 512;

/// Turn raw info log bytes into a printable log of at most [`INFO_LOG_CAPACITY`] bytes.
///
/// The input might be cut in the middle of a UTF-8 sequence or carry the NUL terminator of the
/// native API; neither is an error.
pub(crate) fn bounded_log(raw: &[u8]) -> String {
  let raw = &raw[..raw.len().min(INFO_LOG_CAPACITY)];
  let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());

  String::from_utf8_lossy(&raw[..end]).trim_end().to_owned()
}
