//! # A minimal, opinionated triangle renderer
//!
//! trigon draws flat-colored triangles into a window, and nothing else. It is the smallest
//! program that exercises a complete programmable graphics pipeline: shader compilation, program
//! linking, vertex upload and layout, and a per-frame loop that clears, binds and draws. It is
//! not a 3D engine: there is no depth testing, no texture, no uniform and no index buffer.
//!
//! # What’s included?
//!
//! - **Shaders**: [`ShaderSource`](shader::ShaderSource)s are compiled into
//!   [`CompiledShader`](shader::CompiledShader)s, which are linked into
//!   [`LinkedProgram`](shader::LinkedProgram)s. Failures are values with a status and an info log,
//!   not errors: the caller decides whether a broken program aborts the application or is merely
//!   skipped.
//! - **Geometry**: a [`GeometryBuffer`](geometry::GeometryBuffer) holds immutable vertices along
//!   with the [`VertexAttribute`](geometry::VertexAttribute)s describing them.
//! - **Render loop**: the [`RenderLoop`](render::RenderLoop) polls events, applies resizes,
//!   clears, draws every [`DrawPass`](render::DrawPass) in order and presents, until a close
//!   request.
//! - **Application**: [`Application`](application::Application) owns all of the above, and
//!   releases it in the right order at shutdown.
//!
//! # Implementation and architecture
//!
//! All the types of this crate are written against the [backend traits](backend). A backend
//! crate implements those for a concrete graphics API; a windowing crate creates a window and a
//! context and exposes them as a [`Surface`](context::Surface).
//!
//! The [`trace`] module provides a backend and a surface recording every call instead of issuing
//! it. It is what the tests of this crate run against, and what a dry-run of an application uses
//! when no display is available.
//!
//! # Threading
//!
//! Everything happens on the thread owning the graphics context; nothing here is `Send`.

pub mod application;
pub mod backend;
pub mod context;
pub mod geometry;
pub mod render;
pub mod shader;
pub mod trace;

pub use crate::application::{Application, ApplicationError, GeometryId, ProgramId, ScheduleError};
pub use crate::context::{GraphicsContext, Key, KeyState, Surface, SurfaceEvent};
pub use crate::geometry::{GeometryBuffer, GeometryError, VertexAttribute};
pub use crate::render::{
  DrawPass, LoopState, RenderLoop, RenderLoopConfig, ResizePolicy, Viewport, DEFAULT_CLEAR_COLOR,
};
