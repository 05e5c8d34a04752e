//! A recording backend and surface.
//!
//! [`TraceBackend`] implements every backend trait without touching any graphics API: each call
//! is appended to a shared [`Trace`] as a [`Command`], and the bind-state a real context would
//! hold is simulated so that misuse (drawing with nothing bound, using a program that did not
//! link, deleting an object twice, issuing commands after the context is gone, …) is reported as
//! a violation rather than being silently accepted.
//!
//! [`TraceSurface`] wraps a [`TraceBackend`] into a scripted [`Surface`]: the framebuffer size,
//! the events delivered at a given frame and the frame at which the quit key gets pressed are all
//! decided up front.
//!
//! Shader compilation is a coarse approximation of a real compiler: a stage compiles if it
//! starts with a `#version` directive, has balanced braces and parentheses and defines `main`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::backend::frame::FrameBackend;
use crate::backend::geometry::GeometryBackend;
use crate::backend::shader::ShaderBackend;
use crate::backend::{BindingTracker, Handle};
use crate::context::{GraphicsContext, Key, KeyState, Surface, SurfaceEvent};
use crate::geometry::VertexAttribute;
use crate::render::Viewport;
use crate::shader::StageType;

/// A recorded call.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
  CreateStage(StageType, Handle),
  CompileStage(Handle),
  DeleteStage(Handle),
  CreateProgram(Handle),
  AttachStage { program: Handle, stage: Handle },
  DetachStage { program: Handle, stage: Handle },
  LinkProgram(Handle),
  UseProgram(Handle),
  DeleteProgram(Handle),
  CreateVertexArray(Handle),
  CreateVertexBuffer(Handle),
  BindVertexArray(Handle),
  BindVertexBuffer(Handle),
  UploadStatic {
    buffer: Handle,
    floats: usize,
  },
  AttributePointer {
    vertex_array: Handle,
    attribute: VertexAttribute,
  },
  EnableAttribute {
    vertex_array: Handle,
    location: u32,
  },
  DeleteVertexArray(Handle),
  DeleteVertexBuffer(Handle),
  SetViewport(Viewport),
  SetClearColor([f32; 4]),
  Clear,
  /// A draw call, along with the bind-state it was issued with.
  DrawTriangles {
    program: Handle,
    vertex_array: Handle,
    first: usize,
    count: usize,
  },
  PollEvents,
  SwapBuffers,
  Terminate,
}

#[derive(Debug, Default)]
struct TraceLog {
  commands: Vec<Command>,
  violations: Vec<String>,
  terminated: bool,
}

/// Shared, cloneable view on what a [`TraceBackend`] (and its [`TraceSurface`]) recorded.
#[derive(Clone, Debug, Default)]
pub struct Trace(Rc<RefCell<TraceLog>>);

impl Trace {
  /// Every command recorded so far, in call order.
  pub fn commands(&self) -> Vec<Command> {
    self.0.borrow().commands.clone()
  }

  /// Every misuse detected so far.
  pub fn violations(&self) -> Vec<String> {
    self.0.borrow().violations.clone()
  }

  /// Recorded draw calls.
  pub fn draws(&self) -> Vec<Command> {
    self
      .0
      .borrow()
      .commands
      .iter()
      .filter(|c| matches!(c, Command::DrawTriangles { .. }))
      .cloned()
      .collect()
  }

  /// Number of presented frames.
  pub fn presented(&self) -> usize {
    self
      .0
      .borrow()
      .commands
      .iter()
      .filter(|c| **c == Command::SwapBuffers)
      .count()
  }

  fn record(&self, command: Command) {
    let mut log = self.0.borrow_mut();

    if log.terminated {
      let violation = format!("{:?} issued after terminate", command);
      log.violations.push(violation);
    }

    log.commands.push(command);
  }

  fn violation(&self, violation: String) {
    log::debug!("trace violation: {}", violation);
    self.0.borrow_mut().violations.push(violation);
  }

  fn terminate(&self) {
    self.record(Command::Terminate);
    self.0.borrow_mut().terminated = true;
  }
}

#[derive(Debug)]
struct StageObject {
  ty: StageType,
  compiled: bool,
  log: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
  attached: Vec<Handle>,
  linked: bool,
  log: String,
}

/// A backend recording every call instead of issuing it.
#[derive(Debug)]
pub struct TraceBackend {
  trace: Trace,
  next_handle: u32,
  stages: HashMap<Handle, StageObject>,
  programs: HashMap<Handle, ProgramObject>,
  vertex_arrays: HashSet<Handle>,
  vertex_buffers: HashSet<Handle>,
  current_program: Handle,
  bound_vertex_array: Handle,
  bound_vertex_buffer: Handle,
  fail_allocations: bool,
  next_link_failure: Option<String>,
}

impl Default for TraceBackend {
  fn default() -> Self {
    TraceBackend {
      trace: Trace::default(),
      next_handle: 1,
      stages: HashMap::new(),
      programs: HashMap::new(),
      vertex_arrays: HashSet::new(),
      vertex_buffers: HashSet::new(),
      current_program: Handle::NULL,
      bound_vertex_array: Handle::NULL,
      bound_vertex_buffer: Handle::NULL,
      fail_allocations: false,
      next_link_failure: None,
    }
  }
}

impl TraceBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Shared handle on the recording.
  pub fn trace(&self) -> Trace {
    self.trace.clone()
  }

  /// Make every subsequent object allocation fail (return [`Handle::NULL`]).
  pub fn fail_allocations(&mut self, fail: bool) {
    self.fail_allocations = fail;
  }

  /// Make the next program link fail with the given info log.
  pub fn fail_next_link(&mut self, log: impl Into<String>) {
    self.next_link_failure = Some(log.into());
  }

  fn allocate(&mut self) -> Handle {
    if self.fail_allocations {
      return Handle::NULL;
    }

    let handle = Handle(self.next_handle);
    self.next_handle += 1;
    handle
  }
}

unsafe impl ShaderBackend for TraceBackend {
  unsafe fn create_stage(&mut self, ty: StageType) -> Handle {
    let handle = self.allocate();
    self.trace.record(Command::CreateStage(ty, handle));

    if !handle.is_null() {
      self.stages.insert(
        handle,
        StageObject {
          ty,
          compiled: false,
          log: String::new(),
        },
      );
    }

    handle
  }

  unsafe fn compile_stage(&mut self, stage: Handle, src: &str) {
    self.trace.record(Command::CompileStage(stage));

    match self.stages.get_mut(&stage) {
      Some(object) => match check_source(src) {
        Ok(()) => {
          object.compiled = true;
          object.log.clear();
        }

        Err(log) => {
          object.compiled = false;
          object.log = log;
        }
      },

      None => self.trace.violation(format!("compile of unknown stage {}", stage)),
    }
  }

  unsafe fn stage_compiled(&mut self, stage: Handle) -> bool {
    self.stages.get(&stage).map_or(false, |s| s.compiled)
  }

  unsafe fn stage_log(&mut self, stage: Handle, capacity: usize) -> Vec<u8> {
    self.stages.get(&stage).map_or_else(Vec::new, |s| {
      let mut log = s.log.clone().into_bytes();
      log.truncate(capacity);
      log
    })
  }

  unsafe fn delete_stage(&mut self, stage: Handle) {
    self.trace.record(Command::DeleteStage(stage));

    if self.stages.remove(&stage).is_none() {
      self.trace.violation(format!("delete of unknown stage {}", stage));
    }
  }

  unsafe fn create_program(&mut self) -> Handle {
    let handle = self.allocate();
    self.trace.record(Command::CreateProgram(handle));

    if !handle.is_null() {
      self.programs.insert(handle, ProgramObject::default());
    }

    handle
  }

  unsafe fn attach_stage(&mut self, program: Handle, stage: Handle) {
    self.trace.record(Command::AttachStage { program, stage });

    if !self.stages.contains_key(&stage) {
      self.trace.violation(format!("attach of unknown stage {}", stage));
      return;
    }

    match self.programs.get_mut(&program) {
      Some(object) => object.attached.push(stage),
      None => self
        .trace
        .violation(format!("attach to unknown program {}", program)),
    }
  }

  unsafe fn detach_stage(&mut self, program: Handle, stage: Handle) {
    self.trace.record(Command::DetachStage { program, stage });

    let detached = self.programs.get_mut(&program).map_or(false, |object| {
      let before = object.attached.len();
      object.attached.retain(|&s| s != stage);
      object.attached.len() != before
    });

    if !detached {
      self.trace.violation(format!(
        "detach of stage {} not attached to program {}",
        stage, program
      ));
    }
  }

  unsafe fn link_program(&mut self, program: Handle) {
    self.trace.record(Command::LinkProgram(program));

    let stages = &self.stages;
    let forced_failure = self.next_link_failure.take();

    let object = match self.programs.get_mut(&program) {
      Some(object) => object,
      None => {
        self.trace.violation(format!("link of unknown program {}", program));
        return;
      }
    };

    let has_compiled = |ty: StageType| {
      object.attached.iter().any(|stage| {
        stages
          .get(stage)
          .map_or(false, |s| s.ty == ty && s.compiled)
      })
    };

    let result = if let Some(log) = forced_failure {
      Err(log)
    } else if !has_compiled(StageType::VertexShader) {
      Err("error: no compiled vertex shader attached".to_owned())
    } else if !has_compiled(StageType::FragmentShader) {
      Err("error: no compiled fragment shader attached".to_owned())
    } else {
      Ok(())
    };

    match result {
      Ok(()) => {
        object.linked = true;
        object.log.clear();
      }

      Err(log) => {
        object.linked = false;
        object.log = log;
      }
    }
  }

  unsafe fn program_linked(&mut self, program: Handle) -> bool {
    self.programs.get(&program).map_or(false, |p| p.linked)
  }

  unsafe fn program_log(&mut self, program: Handle, capacity: usize) -> Vec<u8> {
    self.programs.get(&program).map_or_else(Vec::new, |p| {
      let mut log = p.log.clone().into_bytes();
      log.truncate(capacity);
      log
    })
  }

  unsafe fn use_program(&mut self, program: Handle) {
    self.trace.record(Command::UseProgram(program));

    if !program.is_null() && !self.programs.get(&program).map_or(false, |p| p.linked) {
      self
        .trace
        .violation(format!("use of program {} which is not linked", program));
    }

    self.current_program = program;
  }

  unsafe fn delete_program(&mut self, program: Handle) {
    self.trace.record(Command::DeleteProgram(program));

    if self.programs.remove(&program).is_none() {
      self
        .trace
        .violation(format!("delete of unknown program {}", program));
    }

    if self.current_program == program {
      self.current_program = Handle::NULL;
    }
  }
}

unsafe impl GeometryBackend for TraceBackend {
  unsafe fn create_vertex_array(&mut self) -> Handle {
    let handle = self.allocate();
    self.trace.record(Command::CreateVertexArray(handle));

    if !handle.is_null() {
      self.vertex_arrays.insert(handle);
    }

    handle
  }

  unsafe fn create_vertex_buffer(&mut self) -> Handle {
    let handle = self.allocate();
    self.trace.record(Command::CreateVertexBuffer(handle));

    if !handle.is_null() {
      self.vertex_buffers.insert(handle);
    }

    handle
  }

  unsafe fn bind_vertex_array(&mut self, vao: Handle) {
    self.trace.record(Command::BindVertexArray(vao));

    if !vao.is_null() && !self.vertex_arrays.contains(&vao) {
      self.trace.violation(format!("bind of unknown vertex array {}", vao));
    }

    self.bound_vertex_array = vao;
  }

  unsafe fn bind_vertex_buffer(&mut self, vbo: Handle) {
    self.trace.record(Command::BindVertexBuffer(vbo));

    if !vbo.is_null() && !self.vertex_buffers.contains(&vbo) {
      self
        .trace
        .violation(format!("bind of unknown vertex buffer {}", vbo));
    }

    self.bound_vertex_buffer = vbo;
  }

  unsafe fn upload_static(&mut self, data: &[f32]) {
    let buffer = self.bound_vertex_buffer;
    self.trace.record(Command::UploadStatic {
      buffer,
      floats: data.len(),
    });

    if buffer.is_null() {
      self.trace.violation("upload with no vertex buffer bound".to_owned());
    }
  }

  unsafe fn set_attribute_pointer(&mut self, attribute: &VertexAttribute) {
    let vertex_array = self.bound_vertex_array;
    self.trace.record(Command::AttributePointer {
      vertex_array,
      attribute: *attribute,
    });

    if vertex_array.is_null() || self.bound_vertex_buffer.is_null() {
      self.trace.violation(format!(
        "attribute pointer for location {} without a bound vertex array and buffer",
        attribute.location
      ));
    }
  }

  unsafe fn enable_attribute(&mut self, location: u32) {
    let vertex_array = self.bound_vertex_array;
    self.trace.record(Command::EnableAttribute {
      vertex_array,
      location,
    });

    if vertex_array.is_null() {
      self.trace.violation(format!(
        "enable of location {} with no vertex array bound",
        location
      ));
    }
  }

  unsafe fn delete_vertex_array(&mut self, vao: Handle) {
    self.trace.record(Command::DeleteVertexArray(vao));

    if !self.vertex_arrays.remove(&vao) {
      self
        .trace
        .violation(format!("delete of unknown vertex array {}", vao));
    }

    if self.bound_vertex_array == vao {
      self.bound_vertex_array = Handle::NULL;
    }
  }

  unsafe fn delete_vertex_buffer(&mut self, vbo: Handle) {
    self.trace.record(Command::DeleteVertexBuffer(vbo));

    if !self.vertex_buffers.remove(&vbo) {
      self
        .trace
        .violation(format!("delete of unknown vertex buffer {}", vbo));
    }

    if self.bound_vertex_buffer == vbo {
      self.bound_vertex_buffer = Handle::NULL;
    }
  }
}

unsafe impl FrameBackend for TraceBackend {
  unsafe fn set_viewport(&mut self, viewport: Viewport) {
    self.trace.record(Command::SetViewport(viewport));
  }

  unsafe fn set_clear_color(&mut self, color: [f32; 4]) {
    self.trace.record(Command::SetClearColor(color));
  }

  unsafe fn clear(&mut self) {
    self.trace.record(Command::Clear);
  }

  unsafe fn draw_triangles(&mut self, first: usize, count: usize) {
    let program = self.current_program;
    let vertex_array = self.bound_vertex_array;

    self.trace.record(Command::DrawTriangles {
      program,
      vertex_array,
      first,
      count,
    });

    if !self.programs.get(&program).map_or(false, |p| p.linked) {
      self.trace.violation(format!(
        "draw with program {} which is not a linked program",
        program
      ));
    }

    if !self.vertex_arrays.contains(&vertex_array) {
      self.trace.violation(format!(
        "draw with vertex array {} which is not a vertex array",
        vertex_array
      ));
    }
  }
}

impl BindingTracker for TraceBackend {
  fn current_program(&self) -> Handle {
    self.current_program
  }

  fn current_vertex_array(&self) -> Handle {
    self.bound_vertex_array
  }
}

// Mimic the diagnostics of a shading-language compiler for the few mistakes it can spot.
fn check_source(src: &str) -> Result<(), String> {
  let first = src.lines().next().map(str::trim).unwrap_or("");

  if !first.starts_with("#version") {
    return Err("0:1(1): error: missing #version directive".to_owned());
  }

  let mut depth = [0i64; 2];

  for (line, text) in src.lines().enumerate() {
    for c in text.chars() {
      let (slot, delta) = match c {
        '{' => (0, 1),
        '}' => (0, -1),
        '(' => (1, 1),
        ')' => (1, -1),
        _ => continue,
      };

      depth[slot] += delta;

      if depth[slot] < 0 {
        return Err(format!("0:{}(1): error: syntax error, unexpected '{}'", line + 1, c));
      }
    }
  }

  if depth != [0, 0] {
    let lines = src.lines().count();
    return Err(format!(
      "0:{}(1): error: syntax error, unexpected end of file",
      lines.max(1)
    ));
  }

  if !src.contains("void main") {
    return Err("error: main function not defined".to_owned());
  }

  Ok(())
}

/// A scripted window around a [`TraceBackend`].
#[derive(Debug)]
pub struct TraceSurface {
  backend: TraceBackend,
  trace: Trace,
  size: (u32, u32),
  script: Vec<(u64, SurfaceEvent)>,
  quit_after: Option<u64>,
  presented: u64,
  should_close: bool,
}

impl TraceSurface {
  /// A surface with a framebuffer of the given size, never closing on its own.
  pub fn new(width: u32, height: u32) -> Self {
    let backend = TraceBackend::new();
    let trace = backend.trace();

    TraceSurface {
      backend,
      trace,
      size: (width, height),
      script: Vec::new(),
      quit_after: None,
      presented: 0,
      should_close: false,
    }
  }

  /// Press the quit key ([`Key::Escape`]) once `frames` frames have been presented.
  pub fn close_after(self, frames: u64) -> Self {
    TraceSurface {
      quit_after: Some(frames),
      ..self
    }
  }

  /// Deliver `event` on the first poll following the presentation of `frame` frames.
  pub fn event_at(mut self, frame: u64, event: SurfaceEvent) -> Self {
    self.script.push((frame, event));
    self
  }

  pub fn trace(&self) -> Trace {
    self.trace.clone()
  }
}

impl GraphicsContext for TraceSurface {
  type Backend = TraceBackend;

  fn backend(&mut self) -> &mut Self::Backend {
    &mut self.backend
  }
}

impl Surface for TraceSurface {
  fn framebuffer_size(&self) -> (u32, u32) {
    self.size
  }

  fn poll_events(&mut self) -> Vec<SurfaceEvent> {
    self.trace.record(Command::PollEvents);

    let presented = self.presented;
    let (due, later): (Vec<_>, Vec<_>) = self
      .script
      .drain(..)
      .partition(|&(frame, _)| frame <= presented);
    self.script = later;

    let events: Vec<SurfaceEvent> = due.into_iter().map(|(_, event)| event).collect();

    for event in &events {
      if let SurfaceEvent::Resized { width, height } = *event {
        self.size = (width, height);
      }
    }

    events
  }

  fn key_state(&self, key: Key) -> KeyState {
    match (key, self.quit_after) {
      (Key::Escape, Some(frames)) if self.presented >= frames => KeyState::Pressed,
      _ => KeyState::Released,
    }
  }

  fn should_close(&self) -> bool {
    self.should_close
  }

  fn set_should_close(&mut self, close: bool) {
    self.should_close = close;
  }

  fn swap_buffers(&mut self) {
    self.trace.record(Command::SwapBuffers);
    self.presented += 1;
  }

  fn terminate(self) {
    self.trace.terminate();
  }
}
