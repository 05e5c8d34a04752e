//! Application composition.
//!
//! An [`Application`] owns a [`Surface`], every GPU object created through it and the
//! [`RenderLoop`] driving them. It is responsible for the teardown order: on
//! [`Application::shutdown`], geometry is released first, then programs, each in reverse order of
//! creation, and only then is the surface (context, then window) terminated.

use crate::context::Surface;
use crate::geometry::{GeometryBuffer, GeometryError, VertexAttribute};
use crate::render::{DrawPass, RenderLoop, RenderLoopConfig};
use crate::shader::{LinkedProgram, ProgramLinker, ShaderCompiler, ShaderSource};

/// Identifier of a program owned by an [`Application`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ProgramId(usize);

/// Identifier of a geometry buffer owned by an [`Application`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct GeometryId(usize);

/// Errors raised while scheduling a draw pass.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ScheduleError {
  #[error("unknown program {0:?}")]
  UnknownProgram(ProgramId),
  #[error("unknown geometry {0:?}")]
  UnknownGeometry(GeometryId),
  /// The vertex stage reads a location the geometry does not enable.
  #[error("program {program} reads location {location}, which the geometry does not provide")]
  LayoutMismatch { program: String, location: u32 },
}

/// Errors raised while setting up an [`Application`].
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
  #[error("geometry setup failed: {0}")]
  Geometry(#[from] GeometryError),
  #[error("cannot schedule draw pass: {0}")]
  Schedule(#[from] ScheduleError),
  /// A stage failed to compile or a program failed to link, in strict mode.
  #[error("program {label} is unusable: {log}")]
  StrictModeViolation { label: String, log: String },
}

/// Owner of a surface and of every GPU object rendered on it.
pub struct Application<S>
where
  S: Surface,
{
  surface: S,
  render_loop: RenderLoop,
  programs: Vec<LinkedProgram>,
  geometries: Vec<GeometryBuffer>,
  passes: Vec<(ProgramId, GeometryId)>,
  strict: bool,
}

impl<S> Application<S>
where
  S: Surface,
{
  pub fn new(surface: S, config: RenderLoopConfig) -> Self {
    let (width, height) = surface.framebuffer_size();
    let render_loop = RenderLoop::new(config, width, height);

    Application {
      surface,
      render_loop,
      programs: Vec::new(),
      geometries: Vec::new(),
      passes: Vec::new(),
      strict: false,
    }
  }

  /// Abort setup on the first compile or link failure instead of logging it and carrying on.
  ///
  /// Off by default: a failed program is kept, reported, and skipped by the render loop.
  pub fn strict(self, strict: bool) -> Self {
    Application { strict, ..self }
  }

  pub fn surface(&self) -> &S {
    &self.surface
  }

  pub fn surface_mut(&mut self) -> &mut S {
    &mut self.surface
  }

  pub fn render_loop(&self) -> &RenderLoop {
    &self.render_loop
  }

  pub fn program(&self, id: ProgramId) -> Option<&LinkedProgram> {
    self.programs.get(id.0)
  }

  pub fn geometry(&self, id: GeometryId) -> Option<&GeometryBuffer> {
    self.geometries.get(id.0)
  }

  /// Compile a vertex and a fragment stage and link them into a program.
  pub fn add_program(
    &mut self,
    label: &str,
    vertex: &ShaderSource,
    fragment: &ShaderSource,
  ) -> Result<ProgramId, ApplicationError> {
    let backend = self.surface.backend();

    let (vs, fs) = {
      let mut compiler = ShaderCompiler::new(&mut *backend);
      (compiler.compile(vertex), compiler.compile(fragment))
    };

    if self.strict {
      let failure = [&vs, &fs]
        .iter()
        .find(|shader| !shader.is_compiled())
        .map(|shader| shader.log().to_owned());

      if let Some(log) = failure {
        vs.dispose(&mut *backend);
        fs.dispose(&mut *backend);

        return Err(ApplicationError::StrictModeViolation {
          label: label.to_owned(),
          log,
        });
      }
    }

    let program = ProgramLinker::new(&mut *backend)
      .with_label(label)
      .link(vec![vs, fs]);

    if self.strict && !program.is_linked() {
      let log = program.log().to_owned();
      program.dispose(backend);

      return Err(ApplicationError::StrictModeViolation {
        label: label.to_owned(),
        log,
      });
    }

    if program.is_linked() {
      log::info!("program {} ready", label);
    }

    self.programs.push(program);
    Ok(ProgramId(self.programs.len() - 1))
  }

  /// Upload vertices and declare their layout.
  pub fn add_geometry(
    &mut self,
    vertices: &[f32],
    layout: &[VertexAttribute],
  ) -> Result<GeometryId, ApplicationError> {
    let geometry = GeometryBuffer::create(self.surface.backend(), vertices, layout)?;

    self.geometries.push(geometry);
    Ok(GeometryId(self.geometries.len() - 1))
  }

  /// Append a draw pass to every frame.
  ///
  /// Passes are drawn in the order they are scheduled. The geometry must enable every location
  /// the program's vertex stage declares.
  pub fn schedule(&mut self, program: ProgramId, geometry: GeometryId) -> Result<(), ScheduleError> {
    let linked = self
      .programs
      .get(program.0)
      .ok_or(ScheduleError::UnknownProgram(program))?;
    let buffer = self
      .geometries
      .get(geometry.0)
      .ok_or(ScheduleError::UnknownGeometry(geometry))?;

    if let Err(location) = DrawPass::checked(linked, buffer) {
      return Err(ScheduleError::LayoutMismatch {
        program: linked.label().to_owned(),
        location,
      });
    }

    self.passes.push((program, geometry));
    Ok(())
  }

  /// Run the render loop until a close request; returns the number of frames presented.
  pub fn run(&mut self) -> u64 {
    let programs = &self.programs;
    let geometries = &self.geometries;
    let passes: Vec<DrawPass> = self
      .passes
      .iter()
      .map(|&(program, geometry)| DrawPass::new(&programs[program.0], &geometries[geometry.0]))
      .collect();

    self.render_loop.run(&mut self.surface, &passes)
  }

  /// Release every GPU object, then terminate the surface.
  pub fn shutdown(self) {
    let Application {
      mut surface,
      programs,
      geometries,
      ..
    } = self;

    log::info!(
      "releasing {} geometry buffers and {} programs",
      geometries.len(),
      programs.len()
    );

    let backend = surface.backend();

    for geometry in geometries.into_iter().rev() {
      geometry.dispose(&mut *backend);
    }

    for program in programs.into_iter().rev() {
      program.dispose(&mut *backend);
    }

    surface.terminate();
  }
}
