//! Shader stages.

use std::fmt;

use crate::backend::shader::ShaderBackend;
use crate::backend::Handle;
use crate::shader::{bounded_log, INFO_LOG_CAPACITY};

/// A shader stage type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StageType {
  /// Vertex shader.
  VertexShader,
  /// Fragment shader.
  FragmentShader,
}

impl fmt::Display for StageType {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StageType::VertexShader => f.write_str("vertex shader"),
      StageType::FragmentShader => f.write_str("fragment shader"),
    }
  }
}

/// Source text of a single stage.
///
/// The text is plain shading-language source and is expected to start with a `#version`
/// directive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShaderSource {
  stage: StageType,
  text: String,
}

impl ShaderSource {
  pub fn new(stage: StageType, text: impl Into<String>) -> Self {
    ShaderSource {
      stage,
      text: text.into(),
    }
  }

  /// Vertex stage source.
  pub fn vertex(text: impl Into<String>) -> Self {
    Self::new(StageType::VertexShader, text)
  }

  /// Fragment stage source.
  pub fn fragment(text: impl Into<String>) -> Self {
    Self::new(StageType::FragmentShader, text)
  }

  pub fn stage(&self) -> StageType {
    self.stage
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  /// The `#version` directive, if the first line is one.
  pub fn version_directive(&self) -> Option<&str> {
    self
      .text
      .lines()
      .next()
      .map(str::trim)
      .filter(|line| line.starts_with("#version"))
  }

  /// Attribute locations declared with `layout (location = N) in` qualifiers, sorted and
  /// deduplicated.
  ///
  /// Only meaningful for vertex stages: those are the inputs fed by vertex arrays. Declarations
  /// inside `//` and `/* */` comments are ignored.
  pub fn declared_locations(&self) -> Vec<u32> {
    let code = strip_comments(&self.text);
    let mut locations = Vec::new();
    let mut rest = code.as_str();

    while let Some(at) = rest.find("layout") {
      rest = rest[at + "layout".len()..].trim_start();

      if !rest.starts_with('(') {
        continue;
      }

      let close = match rest.find(')') {
        Some(close) => close,
        None => break,
      };

      let qualifiers = &rest[1..close];
      rest = &rest[close + 1..];

      if rest.split_whitespace().next() != Some("in") {
        continue;
      }

      if let Some(location) = parse_location(qualifiers) {
        locations.push(location);
      }
    }

    locations.sort_unstable();
    locations.dedup();
    locations
  }
}

// Replace line and block comments with a single space each, keeping line breaks.
fn strip_comments(src: &str) -> String {
  let mut code = String::with_capacity(src.len());
  let mut chars = src.chars().peekable();

  while let Some(c) = chars.next() {
    match (c, chars.peek().copied()) {
      ('/', Some('/')) => {
        while let Some(&next) = chars.peek() {
          if next == '\n' {
            break;
          }

          chars.next();
        }

        code.push(' ');
      }

      ('/', Some('*')) => {
        chars.next();
        let mut last = '\0';

        for next in chars.by_ref() {
          if last == '*' && next == '/' {
            break;
          }

          if next == '\n' {
            code.push('\n');
          }

          last = next;
        }

        code.push(' ');
      }

      _ => code.push(c),
    }
  }

  code
}

fn parse_location(qualifiers: &str) -> Option<u32> {
  qualifiers.split(',').find_map(|qualifier| {
    let mut parts = qualifier.splitn(2, '=');
    let key = parts.next()?.trim();
    let value = parts.next()?.trim();

    if key == "location" {
      value.parse().ok()
    } else {
      None
    }
  })
}

/// Outcome of a stage compilation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CompileStatus {
  Compiled,
  Failed,
}

/// A compiled (or failed) shader stage.
///
/// This type is intentionally not `Clone`: it owns a GPU shader object, which is released either
/// by [`ProgramLinker::link`](crate::shader::ProgramLinker::link), which consumes it, or by
/// [`CompiledShader::dispose`] if linking is abandoned.
#[derive(Debug)]
#[must_use = "a compiled shader owns a GPU object; link it or dispose of it"]
pub struct CompiledShader {
  pub(crate) handle: Handle,
  pub(crate) stage: StageType,
  pub(crate) status: CompileStatus,
  pub(crate) log: String,
  pub(crate) locations: Vec<u32>,
}

impl CompiledShader {
  pub fn handle(&self) -> Handle {
    self.handle
  }

  pub fn stage(&self) -> StageType {
    self.stage
  }

  pub fn status(&self) -> CompileStatus {
    self.status
  }

  pub fn is_compiled(&self) -> bool {
    self.status == CompileStatus::Compiled
  }

  /// Compilation diagnostics; empty when the stage compiled.
  pub fn log(&self) -> &str {
    &self.log
  }

  /// Input locations declared by the source this stage was compiled from.
  pub fn declared_locations(&self) -> &[u32] {
    &self.locations
  }

  /// Release the shader object without linking it.
  pub fn dispose<B>(self, backend: &mut B)
  where
    B: ?Sized + ShaderBackend,
  {
    if !self.handle.is_null() {
      log::debug!("deleting {} {}", self.stage, self.handle);
      unsafe { backend.delete_stage(self.handle) };
    }
  }
}

/// Compiles [`ShaderSource`]s into [`CompiledShader`]s.
///
/// Compilation is deterministic: there is no retry. A failed compilation is a configuration
/// problem and is reported through the returned [`CompiledShader`]'s status and log.
pub struct ShaderCompiler<'a, B>
where
  B: ?Sized,
{
  backend: &'a mut B,
}

impl<'a, B> ShaderCompiler<'a, B>
where
  B: ?Sized + ShaderBackend,
{
  pub fn new(backend: &'a mut B) -> Self {
    ShaderCompiler { backend }
  }

  /// Compile a single stage.
  ///
  /// One GPU shader object is allocated per call, even when compilation fails.
  pub fn compile(&mut self, source: &ShaderSource) -> CompiledShader {
    let stage = source.stage();
    let locations = match stage {
      StageType::VertexShader => source.declared_locations(),
      StageType::FragmentShader => Vec::new(),
    };

    if source.version_directive().is_none() {
      log::warn!("{} source does not start with a #version directive", stage);
    }

    let handle = unsafe { self.backend.create_stage(stage) };

    if handle.is_null() {
      let log = format!("{} compilation failed: unable to create shader stage", stage);
      log::warn!("{}", log);

      return CompiledShader {
        handle,
        stage,
        status: CompileStatus::Failed,
        log,
        locations,
      };
    }

    let compiled = unsafe {
      self.backend.compile_stage(handle, source.text());
      self.backend.stage_compiled(handle)
    };

    if compiled {
      log::debug!("compiled {} {}", stage, handle);

      CompiledShader {
        handle,
        stage,
        status: CompileStatus::Compiled,
        log: String::new(),
        locations,
      }
    } else {
      let raw = unsafe { self.backend.stage_log(handle, INFO_LOG_CAPACITY) };
      let log = format!("{} compilation failed: {}", stage, bounded_log(&raw));
      log::warn!("{}", log);

      CompiledShader {
        handle,
        stage,
        status: CompileStatus::Failed,
        log,
        locations,
      }
    }
  }
}
