//! End-to-end runs of an application against the recording surface.

use trigon::shader::ShaderSource;
use trigon::backend::Handle;
use trigon::trace::{Command, TraceBackend, TraceSurface};
use trigon::{
  Application, ApplicationError, GeometryBuffer, RenderLoopConfig, ScheduleError, SurfaceEvent,
  VertexAttribute, Viewport,
};

const VS: &str = "#version 330 core
layout (location = 0) in vec3 aPos;
void main()
{
  gl_Position = vec4(aPos.x, aPos.y, aPos.z, 1.0);
}
";

const ORANGE_FS: &str = "#version 330 core
out vec4 FragColor;
void main()
{
  FragColor = vec4(1.0f, 0.5f, 0.2f, 1.0f);
}
";

const YELLOW_FS: &str = "#version 330 core
out vec4 FragColor;
void main()
{
  FragColor = vec4(1.0f, 1.0f, 0.0f, 1.0f);
}
";

const BROKEN_FS: &str = "#version 330 core
out vec4 FragColor;
void main()
{
  FragColor = vec4(1.0f, 1.0f, 0.0f, 1.0f;
}
";

const SINGLE: [f32; 9] = [-0.75, -0.75, -1., 0.75, -0.75, -1., 0., 0.75, -1.];
const LEFT: [f32; 9] = [-0.9, -0.5, 0., 0., -0.5, 0., -0.45, 0.5, 0.];
const RIGHT: [f32; 9] = [0., -0.5, 0., 0.9, -0.5, 0., 0.45, 0.5, 0.];

fn position() -> [VertexAttribute; 1] {
  [VertexAttribute::packed(0, 3)]
}

#[test]
fn single_triangle_one_frame() {
  let surface = TraceSurface::new(800, 600).close_after(1);
  let trace = surface.trace();
  let mut app = Application::new(surface, RenderLoopConfig::default());

  let program = app
    .add_program(
      "orange",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(ORANGE_FS),
    )
    .unwrap();
  let geometry = app.add_geometry(&SINGLE, &position()).unwrap();
  app.schedule(program, geometry).unwrap();

  let p = app.program(program).unwrap().handle();
  let vao = app.geometry(geometry).unwrap().vertex_array();

  assert!(app.program(program).unwrap().is_linked());
  assert_eq!(app.run(), 1);

  assert_eq!(
    trace.draws(),
    vec![Command::DrawTriangles {
      program: p,
      vertex_array: vao,
      first: 0,
      count: 3
    }]
  );
  assert!(trace.violations().is_empty());

  app.shutdown();
  assert!(trace.violations().is_empty());
}

#[test]
fn frame_commands_are_ordered() {
  let surface = TraceSurface::new(800, 600).close_after(1);
  let trace = surface.trace();
  let mut app = Application::new(surface, RenderLoopConfig::default());

  let program = app
    .add_program(
      "orange",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(ORANGE_FS),
    )
    .unwrap();
  let geometry = app.add_geometry(&SINGLE, &position()).unwrap();
  app.schedule(program, geometry).unwrap();

  let p = app.program(program).unwrap().handle();
  let vao = app.geometry(geometry).unwrap().vertex_array();
  let setup = trace.commands().len();

  app.run();

  assert_eq!(
    &trace.commands()[setup..],
    &[
      Command::PollEvents,
      Command::SetViewport(Viewport::new(0, 0, 800, 600)),
      Command::SetClearColor([0.2, 0.3, 0.3, 1.0]),
      Command::Clear,
      Command::UseProgram(p),
      Command::BindVertexArray(vao),
      Command::DrawTriangles {
        program: p,
        vertex_array: vao,
        first: 0,
        count: 3
      },
      Command::SwapBuffers,
      Command::PollEvents,
    ]
  );
}

#[test]
fn two_programs_two_draws_per_frame() {
  let surface = TraceSurface::new(800, 600).close_after(2);
  let trace = surface.trace();
  let mut app = Application::new(surface, RenderLoopConfig::default());

  let orange = app
    .add_program(
      "orange",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(ORANGE_FS),
    )
    .unwrap();
  let yellow = app
    .add_program(
      "yellow",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(YELLOW_FS),
    )
    .unwrap();
  let left = app.add_geometry(&LEFT, &position()).unwrap();
  let right = app.add_geometry(&RIGHT, &position()).unwrap();

  app.schedule(orange, left).unwrap();
  app.schedule(yellow, right).unwrap();

  let first = Command::DrawTriangles {
    program: app.program(orange).unwrap().handle(),
    vertex_array: app.geometry(left).unwrap().vertex_array(),
    first: 0,
    count: 3,
  };
  let second = Command::DrawTriangles {
    program: app.program(yellow).unwrap().handle(),
    vertex_array: app.geometry(right).unwrap().vertex_array(),
    first: 0,
    count: 3,
  };

  assert_ne!(
    app.program(orange).unwrap().handle(),
    app.program(yellow).unwrap().handle()
  );
  assert_eq!(app.run(), 2);
  assert_eq!(trace.draws(), vec![first.clone(), second.clone(), first, second]);
  assert!(trace.violations().is_empty());
}

#[test]
fn nothing_is_presented_after_close() {
  let surface = TraceSurface::new(800, 600).close_after(3);
  let trace = surface.trace();
  let mut app = Application::new(surface, RenderLoopConfig::default());

  let program = app
    .add_program(
      "orange",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(ORANGE_FS),
    )
    .unwrap();
  let geometry = app.add_geometry(&SINGLE, &position()).unwrap();
  app.schedule(program, geometry).unwrap();

  assert_eq!(app.run(), 3);
  assert!(!app.render_loop().is_running());
  // further runs do nothing once stopped
  assert_eq!(app.run(), 3);

  app.shutdown();

  let commands = trace.commands();
  let last_present = commands
    .iter()
    .rposition(|c| *c == Command::SwapBuffers)
    .unwrap();

  assert_eq!(trace.presented(), 3);
  assert!(!commands[last_present..]
    .iter()
    .any(|c| matches!(c, Command::DrawTriangles { .. } | Command::Clear)));
}

#[test]
fn close_request_event_stops_the_loop() {
  let surface = TraceSurface::new(800, 600).event_at(2, SurfaceEvent::CloseRequested);
  let trace = surface.trace();
  let mut app = Application::new(surface, RenderLoopConfig::default());

  assert_eq!(app.run(), 2);
  assert_eq!(trace.presented(), 2);
}

#[test]
fn teardown_releases_geometry_then_programs_then_surface() {
  let surface = TraceSurface::new(800, 600).close_after(1);
  let trace = surface.trace();
  let mut app = Application::new(surface, RenderLoopConfig::default());

  let orange = app
    .add_program(
      "orange",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(ORANGE_FS),
    )
    .unwrap();
  let yellow = app
    .add_program(
      "yellow",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(YELLOW_FS),
    )
    .unwrap();
  let left = app.add_geometry(&LEFT, &position()).unwrap();
  let right = app.add_geometry(&RIGHT, &position()).unwrap();

  app.schedule(orange, left).unwrap();
  app.schedule(yellow, right).unwrap();
  app.run();

  let (left, right) = (app.geometry(left).unwrap(), app.geometry(right).unwrap());
  let expected = vec![
    Command::DeleteVertexArray(right.vertex_array()),
    Command::DeleteVertexBuffer(right.vertex_buffer()),
    Command::DeleteVertexArray(left.vertex_array()),
    Command::DeleteVertexBuffer(left.vertex_buffer()),
    Command::DeleteProgram(app.program(yellow).unwrap().handle()),
    Command::DeleteProgram(app.program(orange).unwrap().handle()),
    Command::Terminate,
  ];
  let before = trace.commands().len();

  app.shutdown();

  assert_eq!(&trace.commands()[before..], expected.as_slice());
  assert!(trace.violations().is_empty());
}

#[test]
fn resize_is_applied_before_the_next_clear() {
  let resized = SurfaceEvent::Resized {
    width: 1024,
    height: 768,
  };
  let surface = TraceSurface::new(800, 600)
    .event_at(1, resized)
    .close_after(2);
  let trace = surface.trace();
  let mut app = Application::new(surface, RenderLoopConfig::default());

  assert_eq!(app.run(), 2);

  let commands = trace.commands();
  let viewports: Vec<_> = commands
    .iter()
    .enumerate()
    .filter(|(_, c)| matches!(c, Command::SetViewport(_)))
    .collect();

  assert_eq!(viewports.len(), 2);

  let (at, resize) = viewports[1];
  assert_eq!(
    *resize,
    Command::SetViewport(Viewport::new(0, 0, 1024, 768))
  );

  let first_present = commands
    .iter()
    .position(|c| *c == Command::SwapBuffers)
    .unwrap();
  let second_clear = commands
    .iter()
    .enumerate()
    .filter(|(_, c)| **c == Command::Clear)
    .map(|(i, _)| i)
    .nth(1)
    .unwrap();

  assert!(first_present < at && at < second_clear);
}

#[test]
fn unlinked_program_is_skipped() {
  let surface = TraceSurface::new(800, 600).close_after(2);
  let trace = surface.trace();
  let mut app = Application::new(surface, RenderLoopConfig::default());

  let broken = app
    .add_program(
      "broken",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(BROKEN_FS),
    )
    .unwrap();
  let orange = app
    .add_program(
      "orange",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(ORANGE_FS),
    )
    .unwrap();
  let left = app.add_geometry(&LEFT, &position()).unwrap();
  let right = app.add_geometry(&RIGHT, &position()).unwrap();

  app.schedule(broken, left).unwrap();
  app.schedule(orange, right).unwrap();

  assert!(!app.program(broken).unwrap().is_linked());
  assert!(app
    .program(broken)
    .unwrap()
    .log()
    .contains("fragment shader did not compile"));

  assert_eq!(app.run(), 2);

  let orange = app.program(orange).unwrap().handle();
  assert_eq!(trace.draws().len(), 2);
  assert!(trace
    .draws()
    .iter()
    .all(|c| matches!(c, Command::DrawTriangles { program, .. } if *program == orange)));
  assert!(trace.violations().is_empty());

  app.shutdown();
  assert!(trace.violations().is_empty());
}

#[test]
fn strict_mode_rejects_broken_program() {
  let surface = TraceSurface::new(800, 600);
  let trace = surface.trace();
  let mut app = Application::new(surface, RenderLoopConfig::default()).strict(true);

  let err = app
    .add_program(
      "broken",
      &ShaderSource::vertex(VS),
      &ShaderSource::fragment(BROKEN_FS),
    )
    .unwrap_err();

  match err {
    ApplicationError::StrictModeViolation { label, log } => {
      assert_eq!(label, "broken");
      assert!(log.starts_with("fragment shader compilation failed"));
    }

    e => panic!("unexpected error: {}", e),
  }

  // both stages are released, no program is created
  let commands = trace.commands();
  let created = commands
    .iter()
    .filter(|c| matches!(c, Command::CreateStage(..)))
    .count();
  let deleted = commands
    .iter()
    .filter(|c| matches!(c, Command::DeleteStage(_)))
    .count();

  assert_eq!((created, deleted), (2, 2));
  assert!(!commands
    .iter()
    .any(|c| matches!(c, Command::CreateProgram(_))));
  assert!(trace.violations().is_empty());
}

#[test]
fn schedule_checks_vertex_layout() {
  let vs = "#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aColor;
void main() { gl_Position = vec4(aPos + aColor, 1.0); }
";
  let surface = TraceSurface::new(800, 600);
  let mut app = Application::new(surface, RenderLoopConfig::default());

  let program = app
    .add_program(
      "colored",
      &ShaderSource::vertex(vs),
      &ShaderSource::fragment(ORANGE_FS),
    )
    .unwrap();
  let geometry = app.add_geometry(&SINGLE, &position()).unwrap();

  assert_eq!(
    app.schedule(program, geometry),
    Err(ScheduleError::LayoutMismatch {
      program: "colored".to_owned(),
      location: 1
    })
  );
}

#[test]
fn schedule_ignores_commented_out_inputs() {
  let vs = "#version 330 core
layout (location = 0) in vec3 aPos;
// layout (location = 1) in vec3 aColor;
/* layout (location = 2) in vec2 aUv; */
void main() { gl_Position = vec4(aPos, 1.0); }
";
  let surface = TraceSurface::new(800, 600);
  let mut app = Application::new(surface, RenderLoopConfig::default());

  let program = app
    .add_program(
      "positions",
      &ShaderSource::vertex(vs),
      &ShaderSource::fragment(ORANGE_FS),
    )
    .unwrap();
  let geometry = app.add_geometry(&SINGLE, &position()).unwrap();

  assert_eq!(app.program(program).unwrap().input_locations(), &[0]);
  assert_eq!(app.schedule(program, geometry), Ok(()));
}

// Vertex array each attribute command of a trace slice was recorded against.
fn attribute_targets(commands: &[Command]) -> Vec<Handle> {
  commands
    .iter()
    .filter_map(|c| match *c {
      Command::AttributePointer { vertex_array, .. } => Some(vertex_array),
      Command::EnableAttribute { vertex_array, .. } => Some(vertex_array),
      _ => None,
    })
    .collect()
}

#[test]
fn geometry_buffers_keep_separate_attribute_state() {
  let mut backend = TraceBackend::new();
  let trace = backend.trace();

  let left = GeometryBuffer::create(&mut backend, &LEFT, &position()).unwrap();
  let first_setup = trace.commands().len();
  let right = GeometryBuffer::create(&mut backend, &RIGHT, &position()).unwrap();
  let commands = trace.commands();

  let (left_vao, right_vao) = (left.vertex_array(), right.vertex_array());
  assert_ne!(left_vao, right_vao);
  assert_ne!(left.vertex_buffer(), right.vertex_buffer());

  let left_targets = attribute_targets(&commands[..first_setup]);
  let right_targets = attribute_targets(&commands[first_setup..]);

  assert_eq!(left_targets, vec![left_vao, left_vao]);
  assert_eq!(right_targets, vec![right_vao, right_vao]);

  // the second setup never touches the first vertex array or buffer
  assert!(!commands[first_setup..].iter().any(|c| match *c {
    Command::BindVertexArray(vao) => vao == left_vao,
    Command::BindVertexBuffer(vbo) => vbo == left.vertex_buffer(),
    Command::UploadStatic { buffer, .. } => buffer == left.vertex_buffer(),
    _ => false,
  }));
  assert!(trace.violations().is_empty());
}
