//! Per-frame commands backend.

use crate::render::Viewport;

/// Commands issued once or several times per frame.
pub unsafe trait FrameBackend {
  unsafe fn set_viewport(&mut self, viewport: Viewport);

  unsafe fn set_clear_color(&mut self, color: [f32; 4]);

  /// Clear the color buffer with the current clear color.
  unsafe fn clear(&mut self);

  /// Draw `count` vertices of the bound vertex array as a triangle list, starting at `first`.
  unsafe fn draw_triangles(&mut self, first: usize, count: usize);
}
