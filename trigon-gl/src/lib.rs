//! OpenGL backends.
//!
//! This crate exports [OpenGL](https://www.khronos.org/opengl/) backends for trigon. The only
//! backend so far targets the OpenGL 3.3 core profile: [`GL33`].
//!
//! Creating a backend requires a current OpenGL context and loaded symbols, which windowing
//! crates provide.

pub mod gl33;

pub use gl33::GL33;
