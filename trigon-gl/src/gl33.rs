//! OpenGL 3.3 backend.
//!
//! This module implements an OpenGL 3.3 core profile backend for trigon. The backend type is
//! [`GL33`].

mod frame;
mod geometry;
mod shader;
mod state;

pub use self::state::StateQueryError;
use std::cell::RefCell;
use std::rc::Rc;

use trigon::backend::{BindingTracker, Handle};

use self::state::{DepthTest, GLState};

/// An OpenGL 3.3 backend.
///
/// This type is to be used as a trigon backend type. It implements every backend trait.
#[derive(Debug)]
pub struct GL33 {
  pub(crate) state: Rc<RefCell<GLState>>,
}

impl GL33 {
  /// Create a new OpenGL 3.3 backend.
  ///
  /// The OpenGL symbols must have been loaded and a context must be current on the calling
  /// thread. Only one backend can be created per thread.
  pub fn new() -> Result<Self, StateQueryError> {
    let mut state = GLState::new()?;

    // triangles are painted in submission order
    unsafe { state.set_depth_test(DepthTest::Off) };

    log::debug!("acquired OpenGL 3.3 graphics state");

    Ok(GL33 {
      state: Rc::new(RefCell::new(state)),
    })
  }
}

impl BindingTracker for GL33 {
  fn current_program(&self) -> Handle {
    Handle(self.state.borrow().current_program())
  }

  fn current_vertex_array(&self) -> Handle {
    Handle(self.state.borrow().bound_vertex_array())
  }
}
