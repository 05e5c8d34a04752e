//! Vertex geometry.
//!
//! A [`GeometryBuffer`] owns a vertex array / vertex buffer pair. Raw floats are uploaded once at
//! creation time and are described by an ordered list of [`VertexAttribute`]s, each mapping a
//! region of every vertex to an input location of the vertex shader.
//!
//! Geometry is immutable once created: there is no per-frame upload.

use std::collections::HashSet;
use std::mem;

use crate::backend::geometry::GeometryBackend;
use crate::backend::Handle;

/// Size in bytes of a single vertex component.
pub const FLOAT_SIZE: usize = mem::size_of::<f32>();

/// Description of a single vertex attribute.
///
/// `stride` and `offset` are expressed in bytes. A zero stride means tightly packed: the stride
/// is then implied by the component count.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct VertexAttribute {
  /// Input location in the vertex shader.
  pub location: u32,
  /// Number of floats of the attribute, in `1..=4`.
  pub component_count: usize,
  /// Distance between two consecutive vertices, in bytes.
  pub stride: usize,
  /// Offset of the attribute in a vertex, in bytes.
  pub offset: usize,
}

impl VertexAttribute {
  pub fn new(location: u32, component_count: usize, stride: usize, offset: usize) -> Self {
    VertexAttribute {
      location,
      component_count,
      stride,
      offset,
    }
  }

  /// Tightly packed attribute (zero stride, zero offset).
  pub fn packed(location: u32, component_count: usize) -> Self {
    Self::new(location, component_count, 0, 0)
  }

  /// Size of the attribute in bytes.
  pub fn size(&self) -> usize {
    self.component_count * FLOAT_SIZE
  }

  /// Stride actually used to step from one vertex to the next.
  pub fn effective_stride(&self) -> usize {
    if self.stride == 0 {
      self.size()
    } else {
      self.stride
    }
  }

  /// Check the attribute is well-formed.
  pub fn validate(&self) -> Result<(), GeometryError> {
    if !(1..=4).contains(&self.component_count) {
      return Err(GeometryError::ComponentCount {
        location: self.location,
        count: self.component_count,
      });
    }

    if self.stride > 0 && self.offset + self.size() > self.stride {
      return Err(GeometryError::Overflow {
        location: self.location,
        end: self.offset + self.size(),
        stride: self.stride,
      });
    }

    Ok(())
  }
}

/// Errors that might occur while creating geometry.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum GeometryError {
  /// The layout has no attribute, so there is nothing to derive a vertex count from.
  #[error("geometry layout has no attribute")]
  NoAttributes,
  /// Component count out of `1..=4`.
  #[error("attribute at location {location} has {count} components (expected 1 to 4)")]
  ComponentCount { location: u32, count: usize },
  /// The attribute does not fit in its stride.
  #[error("attribute at location {location} ends at byte {end}, past its stride of {stride} bytes")]
  Overflow {
    location: u32,
    end: usize,
    stride: usize,
  },
  /// Two attributes share a location.
  #[error("location {0} is declared more than once")]
  DuplicateLocation(u32),
  /// A GPU object could not be allocated.
  #[error("unable to create {0}")]
  Allocation(&'static str),
}

/// A vertex array / vertex buffer pair holding immutable geometry.
#[derive(Debug)]
#[must_use = "a geometry buffer owns GPU objects; dispose of it at shutdown"]
pub struct GeometryBuffer {
  vertex_array: Handle,
  vertex_buffer: Handle,
  vertex_count: usize,
  attributes: Vec<VertexAttribute>,
}

impl GeometryBuffer {
  /// Upload `vertices` and declare their layout.
  ///
  /// The first attribute of `layout` is the position attribute: the vertex count is the number of
  /// whole vertices it strides over. Trailing floats that do not make a whole vertex are
  /// uploaded but never drawn.
  pub fn create<B>(
    backend: &mut B,
    vertices: &[f32],
    layout: &[VertexAttribute],
  ) -> Result<Self, GeometryError>
  where
    B: ?Sized + GeometryBackend,
  {
    let position = layout.first().ok_or(GeometryError::NoAttributes)?;
    let mut seen = HashSet::new();

    for attribute in layout {
      attribute.validate()?;

      if !seen.insert(attribute.location) {
        return Err(GeometryError::DuplicateLocation(attribute.location));
      }
    }

    let vertex_count = vertex_count(vertices.len(), position);
    let leftover = vertices.len() - vertex_count * position.effective_stride() / FLOAT_SIZE;

    if leftover != 0 {
      log::warn!(
        "{} trailing floats do not make a whole vertex and will not be drawn",
        leftover
      );
    }

    unsafe {
      let vertex_array = backend.create_vertex_array();

      if vertex_array.is_null() {
        return Err(GeometryError::Allocation("vertex array"));
      }

      let vertex_buffer = backend.create_vertex_buffer();

      if vertex_buffer.is_null() {
        backend.delete_vertex_array(vertex_array);
        return Err(GeometryError::Allocation("vertex buffer"));
      }

      backend.bind_vertex_array(vertex_array);
      backend.bind_vertex_buffer(vertex_buffer);
      backend.upload_static(vertices);

      for attribute in layout {
        backend.set_attribute_pointer(attribute);
        backend.enable_attribute(attribute.location);
      }

      // the attribute pointers captured the buffer; both can be unbound
      backend.bind_vertex_buffer(Handle::NULL);
      backend.bind_vertex_array(Handle::NULL);

      log::debug!(
        "created geometry {} / {} with {} vertices",
        vertex_array,
        vertex_buffer,
        vertex_count
      );

      Ok(GeometryBuffer {
        vertex_array,
        vertex_buffer,
        vertex_count,
        attributes: layout.to_vec(),
      })
    }
  }

  pub fn vertex_array(&self) -> Handle {
    self.vertex_array
  }

  pub fn vertex_buffer(&self) -> Handle {
    self.vertex_buffer
  }

  /// Number of vertices every draw call against this geometry renders.
  pub fn vertex_count(&self) -> usize {
    self.vertex_count
  }

  pub fn attributes(&self) -> &[VertexAttribute] {
    &self.attributes
  }

  /// Whether an attribute is enabled at `location`.
  pub fn provides_location(&self, location: u32) -> bool {
    self.attributes.iter().any(|a| a.location == location)
  }

  /// Release the vertex array, then the vertex buffer.
  pub fn dispose<B>(self, backend: &mut B)
  where
    B: ?Sized + GeometryBackend,
  {
    log::debug!(
      "deleting geometry {} / {}",
      self.vertex_array,
      self.vertex_buffer
    );

    unsafe {
      backend.delete_vertex_array(self.vertex_array);
      backend.delete_vertex_buffer(self.vertex_buffer);
    }
  }
}

// Number of whole vertices in `len` floats, as strided by the position attribute.
fn vertex_count(len: usize, position: &VertexAttribute) -> usize {
  len * FLOAT_SIZE / position.effective_stride()
}
