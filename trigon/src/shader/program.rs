//! Shader programs.

use crate::backend::shader::ShaderBackend;
use crate::backend::Handle;
use crate::shader::stage::{CompiledShader, StageType};
use crate::shader::{bounded_log, INFO_LOG_CAPACITY};

/// Outcome of a program link.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LinkStatus {
  Linked,
  Failed,
}

/// Reasons why a set of compiled shaders cannot be linked.
///
/// Those are checked before any program object is allocated.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum StageSetError {
  /// A mandatory stage is absent.
  #[error("missing {0}")]
  MissingStage(StageType),
  /// Two shaders target the same stage.
  #[error("more than one {0}")]
  DuplicateStage(StageType),
  /// A shader of the set did not compile.
  #[error("{0} did not compile")]
  UncompiledStage(StageType),
}

/// A linked (or failed) shader program.
///
/// A program whose status is [`LinkStatus::Failed`] might still carry a non-null handle; it must
/// never be activated.
#[derive(Debug)]
#[must_use = "a linked program owns a GPU object; dispose of it at shutdown"]
pub struct LinkedProgram {
  handle: Handle,
  label: String,
  status: LinkStatus,
  log: String,
  locations: Vec<u32>,
}

impl LinkedProgram {
  pub fn handle(&self) -> Handle {
    self.handle
  }

  /// Human-readable name, used in log records.
  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn status(&self) -> LinkStatus {
    self.status
  }

  pub fn is_linked(&self) -> bool {
    self.status == LinkStatus::Linked
  }

  /// Link diagnostics; empty when the program linked.
  pub fn log(&self) -> &str {
    &self.log
  }

  /// Attribute locations the vertex stage of this program reads.
  pub fn input_locations(&self) -> &[u32] {
    &self.locations
  }

  /// Release the program object.
  pub fn dispose<B>(self, backend: &mut B)
  where
    B: ?Sized + ShaderBackend,
  {
    if !self.handle.is_null() {
      log::debug!("deleting program {} {}", self.label, self.handle);
      unsafe { backend.delete_program(self.handle) };
    }
  }
}

/// Links [`CompiledShader`]s into a [`LinkedProgram`].
pub struct ProgramLinker<'a, B>
where
  B: ?Sized,
{
  backend: &'a mut B,
  label: String,
}

impl<'a, B> ProgramLinker<'a, B>
where
  B: ?Sized + ShaderBackend,
{
  pub fn new(backend: &'a mut B) -> Self {
    ProgramLinker {
      backend,
      label: "program".to_owned(),
    }
  }

  /// Name the program being linked.
  pub fn with_label(self, label: impl Into<String>) -> Self {
    ProgramLinker {
      label: label.into(),
      ..self
    }
  }

  /// Link a set of compiled shaders.
  ///
  /// The set must contain exactly one compiled vertex stage and one compiled fragment stage. This
  /// is checked first; a set that does not satisfy it yields a failed program without any program
  /// object being allocated.
  ///
  /// Whatever the outcome, every shader of the set is detached and deleted once the link attempt
  /// is over: compiled shaders are consumed here and are never reused across programs.
  pub fn link<I>(self, shaders: I) -> LinkedProgram
  where
    I: IntoIterator<Item = CompiledShader>,
  {
    let ProgramLinker { backend, label } = self;
    let shaders: Vec<CompiledShader> = shaders.into_iter().collect();

    let locations = shaders
      .iter()
      .find(|shader| shader.stage == StageType::VertexShader)
      .map(|shader| shader.locations.clone())
      .unwrap_or_default();

    if let Err(e) = check_stage_set(&shaders) {
      let log = format!("{} link failed: {}", label, e);
      log::warn!("{}", log);
      release_stages(backend, Handle::NULL, &shaders);

      return LinkedProgram {
        handle: Handle::NULL,
        label,
        status: LinkStatus::Failed,
        log,
        locations,
      };
    }

    let handle = unsafe { backend.create_program() };

    if handle.is_null() {
      let log = format!("{} link failed: unable to create program", label);
      log::warn!("{}", log);
      release_stages(backend, handle, &shaders);

      return LinkedProgram {
        handle,
        label,
        status: LinkStatus::Failed,
        log,
        locations,
      };
    }

    let linked = unsafe {
      for shader in &shaders {
        backend.attach_stage(handle, shader.handle);
      }

      backend.link_program(handle);
      backend.program_linked(handle)
    };

    let (status, log) = if linked {
      log::debug!("linked program {} {}", label, handle);
      (LinkStatus::Linked, String::new())
    } else {
      let raw = unsafe { backend.program_log(handle, INFO_LOG_CAPACITY) };
      let log = format!("{} link failed: {}", label, bounded_log(&raw));
      log::warn!("{}", log);
      (LinkStatus::Failed, log)
    };

    release_stages(backend, handle, &shaders);

    LinkedProgram {
      handle,
      label,
      status,
      log,
      locations,
    }
  }
}

fn check_stage_set(shaders: &[CompiledShader]) -> Result<(), StageSetError> {
  for ty in [StageType::VertexShader, StageType::FragmentShader] {
    let mut of_type = shaders.iter().filter(|shader| shader.stage == ty);

    match (of_type.next(), of_type.next()) {
      (None, _) => return Err(StageSetError::MissingStage(ty)),
      (Some(_), Some(_)) => return Err(StageSetError::DuplicateStage(ty)),
      (Some(shader), None) if !shader.is_compiled() => {
        return Err(StageSetError::UncompiledStage(ty))
      }
      _ => (),
    }
  }

  Ok(())
}

// Detach (if attached to a program) and delete every stage of a consumed set.
fn release_stages<B>(backend: &mut B, program: Handle, shaders: &[CompiledShader])
where
  B: ?Sized + ShaderBackend,
{
  for shader in shaders.iter().filter(|shader| !shader.handle.is_null()) {
    unsafe {
      if !program.is_null() {
        backend.detach_stage(program, shader.handle);
      }

      backend.delete_stage(shader.handle);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::shader::{ShaderCompiler, ShaderSource};
  use crate::trace::{Command, TraceBackend};

  const VS: &str = "#version 330 core\n\
                    layout (location = 0) in vec3 aPos;\n\
                    void main() { gl_Position = vec4(aPos, 1.0); }\n";
  const FS: &str = "#version 330 core\n\
                    out vec4 FragColor;\n\
                    void main() { FragColor = vec4(1.0, 0.5, 0.2, 1.0); }\n";
  const BROKEN_FS: &str = "#version 330 core\nvoid main() { \n";

  fn compile(backend: &mut TraceBackend, src: ShaderSource) -> CompiledShader {
    ShaderCompiler::new(backend).compile(&src)
  }

  #[test]
  fn vertex_and_fragment_link() {
    let mut backend = TraceBackend::new();
    let vs = compile(&mut backend, ShaderSource::vertex(VS));
    let fs = compile(&mut backend, ShaderSource::fragment(FS));

    let program = ProgramLinker::new(&mut backend).link(vec![vs, fs]);

    assert_eq!(program.status(), LinkStatus::Linked);
    assert!(program.log().is_empty());
    assert_eq!(program.input_locations(), &[0]);
    assert_eq!(program.label(), "program");
  }

  #[test]
  fn missing_fragment_stage_fails() {
    let mut backend = TraceBackend::new();
    let vs = compile(&mut backend, ShaderSource::vertex(VS));

    let program = ProgramLinker::new(&mut backend)
      .with_label("lonely")
      .link(vec![vs]);

    assert_eq!(program.status(), LinkStatus::Failed);
    assert!(program.handle().is_null());
    assert_eq!(program.log(), "lonely link failed: missing fragment shader");
  }

  #[test]
  fn duplicate_stage_fails() {
    let mut backend = TraceBackend::new();
    let vs = compile(&mut backend, ShaderSource::vertex(VS));
    let fs_a = compile(&mut backend, ShaderSource::fragment(FS));
    let fs_b = compile(&mut backend, ShaderSource::fragment(FS));

    let program = ProgramLinker::new(&mut backend).link(vec![vs, fs_a, fs_b]);

    assert_eq!(program.status(), LinkStatus::Failed);
    assert!(program.log().contains("more than one fragment shader"));
  }

  #[test]
  fn failed_stage_fails_link() {
    let mut backend = TraceBackend::new();
    let vs = compile(&mut backend, ShaderSource::vertex(VS));
    let fs = compile(&mut backend, ShaderSource::fragment(BROKEN_FS));

    let program = ProgramLinker::new(&mut backend).link(vec![vs, fs]);

    assert_eq!(program.status(), LinkStatus::Failed);
    assert!(program.log().contains("fragment shader did not compile"));
  }

  #[test]
  fn stages_are_released_after_link() {
    let mut backend = TraceBackend::new();
    let trace = backend.trace();
    let vs = compile(&mut backend, ShaderSource::vertex(VS));
    let fs = compile(&mut backend, ShaderSource::fragment(FS));
    let (vs_h, fs_h) = (vs.handle(), fs.handle());

    let program = ProgramLinker::new(&mut backend).link(vec![vs, fs]);
    let p = program.handle();
    let commands = trace.commands();

    let link_at = commands
      .iter()
      .position(|c| *c == Command::LinkProgram(p))
      .unwrap();
    let tail = &commands[link_at..];

    assert!(tail.contains(&Command::DetachStage { program: p, stage: vs_h }));
    assert!(tail.contains(&Command::DetachStage { program: p, stage: fs_h }));
    assert!(tail.contains(&Command::DeleteStage(vs_h)));
    assert!(tail.contains(&Command::DeleteStage(fs_h)));
    assert!(trace.violations().is_empty());
  }

  #[test]
  fn stages_are_released_after_rejected_set() {
    let mut backend = TraceBackend::new();
    let trace = backend.trace();
    let fs = compile(&mut backend, ShaderSource::fragment(FS));
    let fs_h = fs.handle();

    let _ = ProgramLinker::new(&mut backend).link(vec![fs]);

    assert!(trace.commands().contains(&Command::DeleteStage(fs_h)));
    assert!(!trace
      .commands()
      .iter()
      .any(|c| matches!(c, Command::CreateProgram(_))));
  }

  #[test]
  fn driver_link_failure_is_reported() {
    let mut backend = TraceBackend::new();
    backend.fail_next_link("error: varying mismatch");

    let vs = compile(&mut backend, ShaderSource::vertex(VS));
    let fs = compile(&mut backend, ShaderSource::fragment(FS));
    let program = ProgramLinker::new(&mut backend)
      .with_label("orange")
      .link(vec![vs, fs]);

    assert_eq!(program.status(), LinkStatus::Failed);
    assert!(!program.handle().is_null());
    assert_eq!(program.log(), "orange link failed: error: varying mismatch");
  }

  #[test]
  fn dispose_deletes_program() {
    let mut backend = TraceBackend::new();
    let trace = backend.trace();
    let vs = compile(&mut backend, ShaderSource::vertex(VS));
    let fs = compile(&mut backend, ShaderSource::fragment(FS));
    let program = ProgramLinker::new(&mut backend).link(vec![vs, fs]);
    let p = program.handle();

    program.dispose(&mut backend);

    assert_eq!(trace.commands().last(), Some(&Command::DeleteProgram(p)));
  }
}
