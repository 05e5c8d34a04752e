//! Vertex array and vertex buffer backend.

use crate::backend::Handle;
use crate::geometry::VertexAttribute;

/// Vertex arrays, vertex buffers and attribute layouts.
pub unsafe trait GeometryBackend {
  /// Allocate a vertex array object; [`Handle::NULL`] on failure.
  unsafe fn create_vertex_array(&mut self) -> Handle;

  /// Allocate a vertex buffer object; [`Handle::NULL`] on failure.
  unsafe fn create_vertex_buffer(&mut self) -> Handle;

  /// Bind a vertex array. Binding [`Handle::NULL`] unbinds.
  unsafe fn bind_vertex_array(&mut self, vao: Handle);

  /// Bind a vertex buffer to the array-buffer target. Binding [`Handle::NULL`] unbinds.
  unsafe fn bind_vertex_buffer(&mut self, vbo: Handle);

  /// Upload floats into the currently bound vertex buffer, as upload-once / draw-many data.
  unsafe fn upload_static(&mut self, data: &[f32]);

  /// Declare how the currently bound vertex buffer feeds `attribute.location` of the currently
  /// bound vertex array.
  unsafe fn set_attribute_pointer(&mut self, attribute: &VertexAttribute);

  /// Enable an attribute slot on the currently bound vertex array.
  unsafe fn enable_attribute(&mut self, location: u32);

  unsafe fn delete_vertex_array(&mut self, vao: Handle);

  unsafe fn delete_vertex_buffer(&mut self, vbo: Handle);
}
