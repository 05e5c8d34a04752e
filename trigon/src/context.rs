//! Graphics context and windowing surface.
//!
//! A graphics context is an object that gives access to a
//! [`Backend`](crate::backend::Backend). This crate doesn’t create such contexts: windowing
//! crates do, and expose them through the [`Surface`] trait, which adds the window-side
//! operations the render loop consumes (events, key state, presentation).
//!
//! # On context and threads
//!
//! Graphics APIs bind their state to the thread that made the context current. Every operation
//! of this crate is a blocking call on that thread and there is exactly one such thread: types
//! implementing [`GraphicsContext`] are expected to be `!Send` and `!Sync`.

/// Class of graphics context.
pub trait GraphicsContext {
  type Backend: ?Sized + crate::backend::Backend;

  fn backend(&mut self) -> &mut Self::Backend;
}

/// Keyboard keys the render loop can observe.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Key {
  Escape,
  Enter,
  Space,
  Q,
}

/// State of a key at the time it is queried.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyState {
  Pressed,
  Released,
}

/// Events a surface reports when polled.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SurfaceEvent {
  /// The framebuffer got resized.
  Resized { width: u32, height: u32 },
  /// The user asked to close the window.
  CloseRequested,
}

/// A window owning a graphics context.
pub trait Surface: GraphicsContext {
  /// Current framebuffer size, in pixels.
  fn framebuffer_size(&self) -> (u32, u32);

  /// Process pending window-system events.
  fn poll_events(&mut self) -> Vec<SurfaceEvent>;

  fn key_state(&self, key: Key) -> KeyState;

  fn should_close(&self) -> bool;

  fn set_should_close(&mut self, close: bool);

  /// Present the back buffer.
  fn swap_buffers(&mut self);

  /// Tear down the graphics context, then the window.
  ///
  /// Every GPU object must have been released before calling this.
  fn terminate(self)
  where
    Self: Sized;
}
