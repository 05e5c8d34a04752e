//! [GLFW](https://crates.io/crates/glfw) backend for trigon.
//!
//! [`GlfwSurface`] opens a window with an OpenGL 3.3 core, forward-compatible context, makes it
//! current on the calling thread, loads the OpenGL symbols through it and wraps the whole as a
//! trigon [`Surface`].

#![deny(missing_docs)]

use glfw::{self, Action, Context as _, Glfw, InitError, Window, WindowEvent, WindowMode};
use std::{os::raw::c_void, sync::mpsc::Receiver};
use trigon::context::{GraphicsContext, Key, KeyState, Surface, SurfaceEvent};
pub use trigon_gl::gl33::StateQueryError;
use trigon_gl::GL33;

/// Error that can be risen while creating a surface.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GlfwSurfaceError {
  /// Initialization of the surface went wrong.
  ///
  /// This variant exposes a **glfw** error for further information about what went wrong.
  #[error("initialization error: {0}")]
  InitError(#[from] InitError),

  /// The window (and its context) could not be created.
  #[error("cannot create a {width}×{height} window")]
  WindowCreationFailed {
    /// Requested width.
    width: u32,
    /// Requested height.
    height: u32,
  },

  /// OpenGL symbols could not be resolved through the context.
  #[error("cannot load OpenGL symbol {0}")]
  LoaderFailed(&'static str),

  /// The graphics state is not available.
  ///
  /// This error is generated when the initialization code is called on a thread on which the
  /// graphics state has already been acquired.
  #[error("failed to get graphics state: {0}")]
  GraphicsStateError(#[from] StateQueryError),
}

/// Window options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WindowOpt {
  /// Width of the window, in screen coordinates.
  pub width: u32,
  /// Height of the window, in screen coordinates.
  pub height: u32,
  /// Window title.
  pub title: String,
}

impl Default for WindowOpt {
  /// Defaults:
  ///
  /// - `width` set to `800`.
  /// - `height` set to `600`.
  /// - `title` set to `"LearnOpenGL"`.
  fn default() -> Self {
    WindowOpt {
      width: 800,
      height: 600,
      title: "LearnOpenGL".to_owned(),
    }
  }
}

/// GLFW surface.
///
/// This type owns the GLFW window, its event receiver and the [`GL33`] backend driving the
/// window’s context.
///
/// Fields drop in declaration order, so a surface dropped without
/// [`terminate`](Surface::terminate) still releases the backend before the window.
#[derive(Debug)]
pub struct GlfwSurface {
  /// OpenGL 3.3 state.
  gl: GL33,

  /// Wrapped GLFW events queue.
  events_rx: Receiver<(f64, WindowEvent)>,

  /// Wrapped GLFW window.
  pub window: Window,
}

impl GlfwSurface {
  /// Initialize GLFW and open a window with an OpenGL 3.3 core context.
  pub fn new_gl33(opt: &WindowOpt) -> Result<Self, GlfwSurfaceError> {
    #[cfg(feature = "log-errors")]
    let error_cbk = glfw::LOG_ERRORS;
    #[cfg(not(feature = "log-errors"))]
    let error_cbk = glfw::FAIL_ON_ERRORS;

    let mut glfw = glfw::init(error_cbk)?;

    // OpenGL hints
    glfw.window_hint(glfw::WindowHint::OpenGlProfile(
      glfw::OpenGlProfileHint::Core,
    ));
    glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));
    glfw.window_hint(glfw::WindowHint::ContextVersionMajor(3));
    glfw.window_hint(glfw::WindowHint::ContextVersionMinor(3));

    let (mut window, events_rx) = create_window(&mut glfw, opt)?;

    window.make_current();
    window.set_framebuffer_size_polling(true);
    window.set_key_polling(true);
    window.set_close_polling(true);

    // init OpenGL
    gl::load_with(|s| window.get_proc_address(s) as *const c_void);

    if !gl::CreateShader::is_loaded() {
      return Err(GlfwSurfaceError::LoaderFailed("glCreateShader"));
    }

    if !gl::GenVertexArrays::is_loaded() {
      return Err(GlfwSurfaceError::LoaderFailed("glGenVertexArrays"));
    }

    let gl = GL33::new()?;

    log::info!(
      "opened {}×{} window “{}” with an OpenGL 3.3 core context",
      opt.width,
      opt.height,
      opt.title
    );

    Ok(GlfwSurface {
      gl,
      events_rx,
      window,
    })
  }
}

fn create_window(
  glfw: &mut Glfw,
  opt: &WindowOpt,
) -> Result<(Window, Receiver<(f64, WindowEvent)>), GlfwSurfaceError> {
  glfw
    .create_window(opt.width, opt.height, &opt.title, WindowMode::Windowed)
    .ok_or(GlfwSurfaceError::WindowCreationFailed {
      width: opt.width,
      height: opt.height,
    })
}

fn adapt_event(event: WindowEvent) -> Option<SurfaceEvent> {
  match event {
    WindowEvent::FramebufferSize(width, height) => Some(SurfaceEvent::Resized {
      width: width.max(0) as u32,
      height: height.max(0) as u32,
    }),

    WindowEvent::Close => Some(SurfaceEvent::CloseRequested),

    WindowEvent::Key(key, _, action, _) => {
      log::trace!("key {:?}: {:?}", key, action);
      None
    }

    _ => None,
  }
}

fn glfw_key(key: Key) -> Option<glfw::Key> {
  match key {
    Key::Escape => Some(glfw::Key::Escape),
    Key::Enter => Some(glfw::Key::Enter),
    Key::Space => Some(glfw::Key::Space),
    Key::Q => Some(glfw::Key::Q),
    _ => None,
  }
}

impl GraphicsContext for GlfwSurface {
  type Backend = GL33;

  fn backend(&mut self) -> &mut Self::Backend {
    &mut self.gl
  }
}

impl Surface for GlfwSurface {
  fn framebuffer_size(&self) -> (u32, u32) {
    let (w, h) = self.window.get_framebuffer_size();
    (w.max(0) as u32, h.max(0) as u32)
  }

  fn poll_events(&mut self) -> Vec<SurfaceEvent> {
    self.window.glfw.poll_events();

    glfw::flush_messages(&self.events_rx)
      .filter_map(|(_, event)| adapt_event(event))
      .collect()
  }

  fn key_state(&self, key: Key) -> KeyState {
    match glfw_key(key).map(|key| self.window.get_key(key)) {
      Some(Action::Press) | Some(Action::Repeat) => KeyState::Pressed,
      _ => KeyState::Released,
    }
  }

  fn should_close(&self) -> bool {
    self.window.should_close()
  }

  fn set_should_close(&mut self, close: bool) {
    self.window.set_should_close(close);
  }

  fn swap_buffers(&mut self) {
    self.window.swap_buffers();
  }

  fn terminate(self) {
    let GlfwSurface {
      gl,
      events_rx,
      window,
    } = self;

    // the backend must not outlive the context, which must not outlive the window
    drop(gl);
    drop(events_rx);
    drop(window);

    log::info!("window closed");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn framebuffer_size_events_are_resizes() {
    assert_eq!(
      adapt_event(WindowEvent::FramebufferSize(1024, 768)),
      Some(SurfaceEvent::Resized {
        width: 1024,
        height: 768
      })
    );
  }

  #[test]
  fn negative_sizes_are_clamped() {
    assert_eq!(
      adapt_event(WindowEvent::FramebufferSize(-1, 0)),
      Some(SurfaceEvent::Resized {
        width: 0,
        height: 0
      })
    );
  }

  #[test]
  fn close_events_are_close_requests() {
    assert_eq!(
      adapt_event(WindowEvent::Close),
      Some(SurfaceEvent::CloseRequested)
    );
    assert_eq!(adapt_event(WindowEvent::Focus(true)), None);
  }

  #[test]
  fn default_window_options() {
    let opt = WindowOpt::default();

    assert_eq!((opt.width, opt.height), (800, 600));
    assert_eq!(opt.title, "LearnOpenGL");
  }
}
