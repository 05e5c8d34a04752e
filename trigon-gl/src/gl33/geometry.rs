use gl::types::*;
use std::mem;
use std::os::raw::c_void;

use trigon::backend::geometry::GeometryBackend;
use trigon::backend::Handle;
use trigon::geometry::VertexAttribute;

use crate::gl33::GL33;

unsafe impl GeometryBackend for GL33 {
  unsafe fn create_vertex_array(&mut self) -> Handle {
    let mut vao: GLuint = 0;
    gl::GenVertexArrays(1, &mut vao);
    Handle(vao)
  }

  unsafe fn create_vertex_buffer(&mut self) -> Handle {
    let mut handle: GLuint = 0;
    gl::GenBuffers(1, &mut handle);
    Handle(handle)
  }

  unsafe fn bind_vertex_array(&mut self, vao: Handle) {
    self.state.borrow_mut().bind_vertex_array(vao.0);
  }

  unsafe fn bind_vertex_buffer(&mut self, vbo: Handle) {
    self.state.borrow_mut().bind_array_buffer(vbo.0);
  }

  unsafe fn upload_static(&mut self, data: &[f32]) {
    debug_assert_ne!(self.state.borrow().bound_array_buffer(), 0);

    gl::BufferData(
      gl::ARRAY_BUFFER,
      mem::size_of_val(data) as GLsizeiptr,
      data.as_ptr() as *const c_void,
      gl::STATIC_DRAW,
    );
  }

  unsafe fn set_attribute_pointer(&mut self, attribute: &VertexAttribute) {
    let (size, stride, offset) = attribute_format(attribute);

    gl::VertexAttribPointer(
      attribute.location,
      size,
      gl::FLOAT,
      gl::FALSE,
      stride,
      offset as *const c_void,
    );
  }

  unsafe fn enable_attribute(&mut self, location: u32) {
    gl::EnableVertexAttribArray(location);
  }

  unsafe fn delete_vertex_array(&mut self, vao: Handle) {
    self.state.borrow_mut().unbind_vertex_array(vao.0);
    gl::DeleteVertexArrays(1, &vao.0);
  }

  unsafe fn delete_vertex_buffer(&mut self, vbo: Handle) {
    self.state.borrow_mut().unbind_buffer(vbo.0);
    gl::DeleteBuffers(1, &vbo.0);
  }
}

// Component count, stride and byte offset of an attribute, as OpenGL wants them. A zero stride
// means tightly packed for OpenGL too.
fn attribute_format(attribute: &VertexAttribute) -> (GLint, GLsizei, usize) {
  (
    attribute.component_count as GLint,
    attribute.stride as GLsizei,
    attribute.offset,
  )
}
