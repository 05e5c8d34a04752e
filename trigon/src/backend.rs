//! Backend interfacing.
//!
//! The traits in this module are the seam between the safe types of this crate and a concrete
//! graphics API. They are `unsafe` to implement and to call: the native APIs they wrap operate
//! on process-wide bind-state, and calling them out of order (drawing without a bound vertex
//! array, deleting an object still in use, etc.) is undefined behavior at the API boundary. The
//! safe wrappers ([`CompiledShader`](crate::shader::CompiledShader),
//! [`GeometryBuffer`](crate::geometry::GeometryBuffer), [`RenderLoop`](crate::render::RenderLoop))
//! are the only callers and enforce the ordering.

pub mod frame;
pub mod geometry;
pub mod shader;

use std::fmt;

/// Opaque GPU object identifier.
///
/// The value `0` is reserved and means “no object”; it is what a backend reports when nothing is
/// bound and what an allocation failure leaves behind.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Handle(pub u32);

impl Handle {
  /// The null object.
  pub const NULL: Handle = Handle(0);

  /// Whether this handle names an object.
  #[inline]
  pub fn is_null(self) -> bool {
    self.0 == 0
  }
}

impl fmt::Display for Handle {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Current bind-state of a graphics context.
///
/// Binds are global to the context: whatever was bound last is what the next draw call uses.
/// Backends report what they believe is currently bound so that callers (and tests) can check
/// the ordering of binds without touching a real context.
pub trait BindingTracker {
  /// Currently active program, or [`Handle::NULL`].
  fn current_program(&self) -> Handle;

  /// Currently bound vertex array, or [`Handle::NULL`].
  fn current_vertex_array(&self) -> Handle;
}

/// The whole capability set a backend must provide.
pub trait Backend:
  shader::ShaderBackend + geometry::GeometryBackend + frame::FrameBackend + BindingTracker
{
}

impl<B> Backend for B where
  B: shader::ShaderBackend + geometry::GeometryBackend + frame::FrameBackend + BindingTracker
{
}
