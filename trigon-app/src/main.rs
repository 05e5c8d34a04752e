mod scene;

use scene::Scene;
use std::{fmt, process, str::FromStr};
use structopt::StructOpt;
use trigon::trace::TraceSurface;
use trigon::{Application, ApplicationError, RenderLoopConfig, ResizePolicy, Surface};
use trigon_glfw::{GlfwSurface, WindowOpt};

/// The window or the graphics context could not be set up.
const EXIT_INIT_FAILURE: i32 = 1;

/// The scene could not be set up (a program failed to build in strict mode, for instance).
const EXIT_SETUP_FAILURE: i32 = 2;

#[derive(Debug, StructOpt)]
#[structopt(name = "hello-triangle", about = "Draw flat-colored triangles.")]
pub struct CLIOpts {
  #[structopt(long, default_value = "800")]
  /// Window width.
  width: u32,

  #[structopt(long, default_value = "600")]
  /// Window height.
  height: u32,

  #[structopt(long, default_value = "LearnOpenGL")]
  /// Window title.
  title: String,

  #[structopt(short, long, default_value = "single", possible_values = &Scene::NAMES)]
  /// Scene to draw.
  scene: Scene,

  #[structopt(short, long, default_value = "tracking", possible_values = &ResizeMode::NAMES)]
  /// How the viewport follows window resizes.
  resize: ResizeMode,

  #[structopt(long)]
  /// Abort before rendering if a shader fails to compile or a program fails to link.
  strict: bool,

  #[structopt(long)]
  /// Render that many frames without a window and print the issued commands.
  headless: Option<u64>,
}

impl CLIOpts {
  fn render_loop_config(&self) -> RenderLoopConfig {
    let resize_policy = match self.resize {
      ResizeMode::Tracking => ResizePolicy::Tracking,
      ResizeMode::Letterbox => ResizePolicy::Letterbox {
        width: self.width,
        height: self.height,
      },
    };

    RenderLoopConfig {
      resize_policy,
      ..RenderLoopConfig::default()
    }
  }

  fn window_opt(&self) -> WindowOpt {
    WindowOpt {
      width: self.width,
      height: self.height,
      title: self.title.clone(),
    }
  }
}

/// Viewport resize policy, as named on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ResizeMode {
  Tracking,
  Letterbox,
}

impl ResizeMode {
  const NAMES: [&'static str; 2] = ["tracking", "letterbox"];
}

impl fmt::Display for ResizeMode {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      ResizeMode::Tracking => f.write_str("tracking"),
      ResizeMode::Letterbox => f.write_str("letterbox"),
    }
  }
}

impl FromStr for ResizeMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "tracking" => Ok(ResizeMode::Tracking),
      "letterbox" => Ok(ResizeMode::Letterbox),
      _ => Err(format!("unknown resize mode {}", s)),
    }
  }
}

// Set the scene up, run it and release everything, even when the setup fails half-way.
fn render_scene<S>(mut app: Application<S>, scene: Scene) -> Result<u64, ApplicationError>
where
  S: Surface,
{
  let result = scene.setup(&mut app).map(|()| app.run());
  app.shutdown();
  result
}

fn report(result: Result<u64, ApplicationError>) -> i32 {
  match result {
    Ok(frames) => {
      log::info!("presented {} frames", frames);
      0
    }

    Err(e) => {
      log::error!("{}", e);
      EXIT_SETUP_FAILURE
    }
  }
}

fn run_windowed(cli_opts: &CLIOpts) -> i32 {
  let surface = match GlfwSurface::new_gl33(&cli_opts.window_opt()) {
    Ok(surface) => surface,
    Err(e) => {
      log::error!("cannot create a rendering surface: {}", e);
      return EXIT_INIT_FAILURE;
    }
  };

  let app = Application::new(surface, cli_opts.render_loop_config()).strict(cli_opts.strict);
  report(render_scene(app, cli_opts.scene))
}

fn run_headless(cli_opts: &CLIOpts, frames: u64) -> i32 {
  log::info!("dry run of {} frames", frames);

  let surface = TraceSurface::new(cli_opts.width, cli_opts.height).close_after(frames);
  let trace = surface.trace();
  let app = Application::new(surface, cli_opts.render_loop_config()).strict(cli_opts.strict);
  let code = report(render_scene(app, cli_opts.scene));

  for command in trace.commands() {
    println!("{:?}", command);
  }

  for violation in trace.violations() {
    log::warn!("{}", violation);
  }

  code
}

fn main() {
  env_logger::builder()
    .filter_level(log::LevelFilter::Info)
    .parse_default_env()
    .init();
  let cli_opts = CLIOpts::from_args();

  let code = match cli_opts.headless {
    Some(frames) => run_headless(&cli_opts, frames),
    None => run_windowed(&cli_opts),
  };

  process::exit(code);
}
