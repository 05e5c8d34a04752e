//! The per-frame render loop.
//!
//! A [`RenderLoop`] is a two-state machine: it is [`LoopState::Running`] until the windowing
//! collaborator reports a close request, after which it is [`LoopState::Stopped`] for good. There
//! is no pause / resume.
//!
//! Every iteration runs, in this order:
//!
//! 1. Poll events. Resize notifications update the pending viewport; a close request (or the
//!    quit key being pressed) stops the loop right here, so no frame is presented after the
//!    close decision.
//! 2. Apply the pending viewport, if any, and clear the frame to the configured color.
//! 3. For each [`DrawPass`], in order: activate its program, bind its vertex array and draw its
//!    vertices as a triangle list. Depth testing is off: later passes paint over earlier ones.
//! 4. Present.

use std::collections::HashSet;

use crate::backend::frame::FrameBackend;
use crate::backend::geometry::GeometryBackend;
use crate::backend::shader::ShaderBackend;
use crate::backend::Backend;
use crate::context::{Key, KeyState, Surface, SurfaceEvent};
use crate::geometry::GeometryBuffer;
use crate::shader::LinkedProgram;

/// Background color of every frame.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.2, 0.3, 0.3, 1.0];

/// A viewport rectangle, in framebuffer pixels.
///
/// The origin might be negative when a fixed-size viewport is centered in a smaller window.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Viewport {
  pub x: i32,
  pub y: i32,
  pub width: u32,
  pub height: u32,
}

impl Viewport {
  pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
    Viewport {
      x,
      y,
      width,
      height,
    }
  }
}

/// How the viewport follows the window framebuffer when it gets resized.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ResizePolicy {
  /// The viewport covers the whole framebuffer.
  Tracking,
  /// The viewport keeps a fixed size and is centered in the framebuffer.
  Letterbox { width: u32, height: u32 },
}

impl ResizePolicy {
  /// Viewport to use for a framebuffer of the given size.
  pub fn viewport(self, fb_width: u32, fb_height: u32) -> Viewport {
    match self {
      ResizePolicy::Tracking => Viewport::new(0, 0, fb_width, fb_height),

      ResizePolicy::Letterbox { width, height } => {
        let x = (i64::from(fb_width) - i64::from(width)) / 2;
        let y = (i64::from(fb_height) - i64::from(height)) / 2;
        Viewport::new(x as i32, y as i32, width, height)
      }
    }
  }
}

impl Default for ResizePolicy {
  fn default() -> Self {
    ResizePolicy::Tracking
  }
}

/// Render loop configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderLoopConfig {
  /// Color every frame is cleared to.
  pub clear_color: [f32; 4],
  /// Viewport behavior on resize.
  pub resize_policy: ResizePolicy,
  /// Key that requests the loop to stop when pressed.
  pub quit_key: Key,
}

impl Default for RenderLoopConfig {
  /// Defaults:
  ///
  /// - `clear_color` set to [`DEFAULT_CLEAR_COLOR`].
  /// - `resize_policy` set to [`ResizePolicy::Tracking`].
  /// - `quit_key` set to [`Key::Escape`].
  fn default() -> Self {
    RenderLoopConfig {
      clear_color: DEFAULT_CLEAR_COLOR,
      resize_policy: ResizePolicy::default(),
      quit_key: Key::Escape,
    }
  }
}

/// State of a [`RenderLoop`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LoopState {
  Running,
  Stopped,
}

/// A single draw call of a frame: a program and the geometry it renders.
///
/// [`DrawPass::new`] does not check that the geometry feeds every input of the program; use
/// [`DrawPass::checked`] (or [`Application::schedule`](crate::Application::schedule), which does)
/// when the pair is not known to match.
#[derive(Clone, Copy, Debug)]
pub struct DrawPass<'a> {
  pub program: &'a LinkedProgram,
  pub geometry: &'a GeometryBuffer,
}

impl<'a> DrawPass<'a> {
  pub fn new(program: &'a LinkedProgram, geometry: &'a GeometryBuffer) -> Self {
    DrawPass { program, geometry }
  }

  /// Pair a program with a geometry, failing with the first input location of the program's
  /// vertex stage that the geometry does not enable.
  pub fn checked(program: &'a LinkedProgram, geometry: &'a GeometryBuffer) -> Result<Self, u32> {
    let pass = Self::new(program, geometry);

    match pass.missing_location() {
      Some(location) => Err(location),
      None => Ok(pass),
    }
  }

  /// First input location of the program that the geometry does not provide, if any.
  pub fn missing_location(&self) -> Option<u32> {
    self
      .program
      .input_locations()
      .iter()
      .copied()
      .find(|&location| !self.geometry.provides_location(location))
  }
}

/// The per-frame driver.
#[derive(Debug)]
pub struct RenderLoop {
  config: RenderLoopConfig,
  state: LoopState,
  pending_viewport: Option<Viewport>,
  frames: u64,
  // passes already reported as skipped, so that the warning is not repeated every frame
  skipped: HashSet<usize>,
}

impl RenderLoop {
  /// Create a running loop for a framebuffer of the given size.
  pub fn new(config: RenderLoopConfig, fb_width: u32, fb_height: u32) -> Self {
    RenderLoop {
      config,
      state: LoopState::Running,
      pending_viewport: Some(config.resize_policy.viewport(fb_width, fb_height)),
      frames: 0,
      skipped: HashSet::new(),
    }
  }

  pub fn config(&self) -> &RenderLoopConfig {
    &self.config
  }

  pub fn state(&self) -> LoopState {
    self.state
  }

  pub fn is_running(&self) -> bool {
    self.state == LoopState::Running
  }

  /// Number of frames presented so far.
  pub fn frames(&self) -> u64 {
    self.frames
  }

  /// Framebuffer resize notification.
  ///
  /// The new viewport is applied before the next clear.
  pub fn resize(&mut self, fb_width: u32, fb_height: u32) {
    let viewport = self.config.resize_policy.viewport(fb_width, fb_height);
    log::debug!("framebuffer resized to {}×{}: {:?}", fb_width, fb_height, viewport);
    self.pending_viewport = Some(viewport);
  }

  /// Run a single iteration.
  ///
  /// Returns the state of the loop after the iteration. Once stopped, further calls do nothing.
  pub fn step<S>(&mut self, surface: &mut S, passes: &[DrawPass]) -> LoopState
  where
    S: Surface,
  {
    if self.state == LoopState::Stopped {
      return LoopState::Stopped;
    }

    for event in surface.poll_events() {
      match event {
        SurfaceEvent::Resized { width, height } => self.resize(width, height),
        SurfaceEvent::CloseRequested => surface.set_should_close(true),
      }
    }

    if surface.key_state(self.config.quit_key) == KeyState::Pressed {
      surface.set_should_close(true);
    }

    if surface.should_close() {
      log::info!("close requested after {} frames", self.frames);
      self.state = LoopState::Stopped;
      return LoopState::Stopped;
    }

    self.render(surface.backend(), passes);
    surface.swap_buffers();
    self.frames += 1;

    LoopState::Running
  }

  /// Iterate until the loop stops; returns the number of frames presented.
  pub fn run<S>(&mut self, surface: &mut S, passes: &[DrawPass]) -> u64
  where
    S: Surface,
  {
    log::info!("entering render loop with {} draw passes", passes.len());
    while self.step(surface, passes) == LoopState::Running {}
    self.frames
  }

  fn render<B>(&mut self, backend: &mut B, passes: &[DrawPass])
  where
    B: ?Sized + Backend,
  {
    log::trace!("frame {}", self.frames);

    unsafe {
      if let Some(viewport) = self.pending_viewport.take() {
        FrameBackend::set_viewport(backend, viewport);
      }

      backend.set_clear_color(self.config.clear_color);
      backend.clear();
    }

    for (index, pass) in passes.iter().enumerate() {
      let program = pass.program;

      if !program.is_linked() {
        if self.skipped.insert(index) {
          log::warn!(
            "skipping draw pass {}: program {} is not linked",
            index,
            program.label()
          );
        }

        continue;
      }

      let geometry = pass.geometry;

      unsafe {
        ShaderBackend::use_program(backend, program.handle());
        GeometryBackend::bind_vertex_array(backend, geometry.vertex_array());

        debug_assert_eq!(backend.current_program(), program.handle());
        debug_assert_eq!(backend.current_vertex_array(), geometry.vertex_array());

        backend.draw_triangles(0, geometry.vertex_count());
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::VertexAttribute;
  use crate::shader::{ProgramLinker, ShaderCompiler, ShaderSource};
  use crate::trace::TraceBackend;

  const TWO_INPUTS_VS: &str = "#version 330 core\n\
                               layout (location = 0) in vec3 aPos;\n\
                               layout (location = 1) in vec3 aColor;\n\
                               void main() { gl_Position = vec4(aPos + aColor, 1.0); }\n";
  const FS: &str = "#version 330 core\n\
                    out vec4 FragColor;\n\
                    void main() { FragColor = vec4(1.0); }\n";

  fn program(backend: &mut TraceBackend) -> LinkedProgram {
    let mut compiler = ShaderCompiler::new(&mut *backend);
    let vs = compiler.compile(&ShaderSource::vertex(TWO_INPUTS_VS));
    let fs = compiler.compile(&ShaderSource::fragment(FS));

    ProgramLinker::new(backend).link(vec![vs, fs])
  }

  #[test]
  fn checked_pass_rejects_missing_input() {
    let mut backend = TraceBackend::new();
    let program = program(&mut backend);
    let positions =
      GeometryBuffer::create(&mut backend, &[0.; 9], &[VertexAttribute::packed(0, 3)]).unwrap();

    assert_eq!(DrawPass::new(&program, &positions).missing_location(), Some(1));
    assert_eq!(DrawPass::checked(&program, &positions).err(), Some(1));
  }

  #[test]
  fn checked_pass_accepts_matching_layout() {
    let mut backend = TraceBackend::new();
    let program = program(&mut backend);
    let layout = [
      VertexAttribute::new(0, 3, 24, 0),
      VertexAttribute::new(1, 3, 24, 12),
    ];
    let colored = GeometryBuffer::create(&mut backend, &[0.; 18], &layout).unwrap();

    assert!(DrawPass::checked(&program, &colored).is_ok());
  }

  #[test]
  fn tracking_viewport_covers_framebuffer() {
    assert_eq!(
      ResizePolicy::Tracking.viewport(1024, 768),
      Viewport::new(0, 0, 1024, 768)
    );
  }

  #[test]
  fn letterbox_viewport_is_centered() {
    let policy = ResizePolicy::Letterbox {
      width: 800,
      height: 600,
    };

    assert_eq!(policy.viewport(1000, 800), Viewport::new(100, 100, 800, 600));
    assert_eq!(policy.viewport(800, 600), Viewport::new(0, 0, 800, 600));
  }

  #[test]
  fn letterbox_viewport_in_smaller_window() {
    let policy = ResizePolicy::Letterbox {
      width: 800,
      height: 600,
    };

    assert_eq!(policy.viewport(600, 400), Viewport::new(-100, -100, 800, 600));
  }

  #[test]
  fn default_config() {
    let config = RenderLoopConfig::default();

    assert_eq!(config.clear_color, [0.2, 0.3, 0.3, 1.0]);
    assert_eq!(config.resize_policy, ResizePolicy::Tracking);
    assert_eq!(config.quit_key, Key::Escape);
  }

  #[test]
  fn new_loop_is_running_with_pending_viewport() {
    let render_loop = RenderLoop::new(RenderLoopConfig::default(), 800, 600);

    assert_eq!(render_loop.state(), LoopState::Running);
    assert_eq!(render_loop.frames(), 0);
    assert_eq!(
      render_loop.pending_viewport,
      Some(Viewport::new(0, 0, 800, 600))
    );
  }

  #[test]
  fn resize_replaces_pending_viewport() {
    let mut render_loop = RenderLoop::new(RenderLoopConfig::default(), 800, 600);
    render_loop.resize(640, 480);
    render_loop.resize(320, 240);

    assert_eq!(
      render_loop.pending_viewport,
      Some(Viewport::new(0, 0, 320, 240))
    );
  }
}
