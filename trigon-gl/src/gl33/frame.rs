use gl::types::*;

use trigon::backend::frame::FrameBackend;
use trigon::render::Viewport;

use crate::gl33::GL33;

unsafe impl FrameBackend for GL33 {
  unsafe fn set_viewport(&mut self, viewport: Viewport) {
    self.state.borrow_mut().set_viewport(viewport_rect(viewport));
  }

  unsafe fn set_clear_color(&mut self, color: [f32; 4]) {
    self.state.borrow_mut().set_clear_color(color);
  }

  unsafe fn clear(&mut self) {
    gl::Clear(gl::COLOR_BUFFER_BIT);
  }

  unsafe fn draw_triangles(&mut self, first: usize, count: usize) {
    gl::DrawArrays(gl::TRIANGLES, first as GLint, count as GLsizei);
  }
}

fn viewport_rect(viewport: Viewport) -> [GLint; 4] {
  [
    viewport.x,
    viewport.y,
    viewport.width.min(GLint::MAX as u32) as GLint,
    viewport.height.min(GLint::MAX as u32) as GLint,
  ]
}
