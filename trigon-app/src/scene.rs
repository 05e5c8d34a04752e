//! The scenes the binary can draw.

use std::fmt;
use std::str::FromStr;

use trigon::shader::ShaderSource;
use trigon::{Application, ApplicationError, Surface, VertexAttribute};

const VERTEX_SHADER: &str = include_str!("shaders/vertex.glsl");
const ORANGE_SHADER: &str = include_str!("shaders/orange.glsl");
const YELLOW_SHADER: &str = include_str!("shaders/yellow.glsl");

/// A single triangle pushed to the far plane.
pub const SINGLE_TRIANGLE: [f32; 9] = [-0.75, -0.75, -1., 0.75, -0.75, -1., 0., 0.75, -1.];

/// Left triangle of the pair.
pub const LEFT_TRIANGLE: [f32; 9] = [-0.9, -0.5, 0., 0., -0.5, 0., -0.45, 0.5, 0.];

/// Right triangle of the pair; shares its bottom-left corner with the left one.
pub const RIGHT_TRIANGLE: [f32; 9] = [0., -0.5, 0., 0.9, -0.5, 0., 0.45, 0.5, 0.];

/// Scene selectable from the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scene {
  /// One orange triangle.
  Single,
  /// An orange and a yellow triangle, side by side, each with its own program.
  Pair,
}

impl Scene {
  pub const NAMES: [&'static str; 2] = ["single", "pair"];

  /// Create the programs and geometry of the scene and schedule their draw passes.
  pub fn setup<S>(self, app: &mut Application<S>) -> Result<(), ApplicationError>
  where
    S: Surface,
  {
    log::info!("setting up scene {}", self);

    let layout = [VertexAttribute::packed(0, 3)];
    let vertex = ShaderSource::vertex(VERTEX_SHADER);

    match self {
      Scene::Single => {
        let orange = app.add_program("orange", &vertex, &ShaderSource::fragment(ORANGE_SHADER))?;
        let triangle = app.add_geometry(&SINGLE_TRIANGLE, &layout)?;

        app.schedule(orange, triangle)?;
      }

      Scene::Pair => {
        // every program compiles its own vertex stage: a compiled stage is consumed by its link
        let orange = app.add_program("orange", &vertex, &ShaderSource::fragment(ORANGE_SHADER))?;
        let yellow = app.add_program("yellow", &vertex, &ShaderSource::fragment(YELLOW_SHADER))?;
        let left = app.add_geometry(&LEFT_TRIANGLE, &layout)?;
        let right = app.add_geometry(&RIGHT_TRIANGLE, &layout)?;

        app.schedule(orange, left)?;
        app.schedule(yellow, right)?;
      }
    }

    Ok(())
  }
}

impl Default for Scene {
  fn default() -> Self {
    Scene::Single
  }
}

impl fmt::Display for Scene {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      Scene::Single => f.write_str("single"),
      Scene::Pair => f.write_str("pair"),
    }
  }
}

impl FromStr for Scene {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "single" => Ok(Scene::Single),
      "pair" => Ok(Scene::Pair),
      _ => Err(format!("unknown scene {} (expected one of: {})", s, Scene::NAMES.join(", "))),
    }
  }
}
