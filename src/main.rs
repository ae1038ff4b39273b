//! Headless demo: spins a small scene through a recording context

use std::path::Path;

use trellis::core::{KindDescription, MaterialDescription, NodeDescription, SceneError, TransformDescription};
use trellis::prelude::*;

const FRAMES: u32 = 120;

/// Group with a camera, a light, a collider and two instanced cubes
fn demo_scene() -> SceneDescription {
    let cube = NodeDescription::new("cube", KindDescription::Cube)
        .with_transform(TransformDescription::at(Vec3::new(-1.5, 0.0, -5.0)))
        .with_material("orange");

    let root = NodeDescription::new("root", KindDescription::Group)
        .with_child(NodeDescription::new(
            "camera",
            KindDescription::Camera {
                projection: Projection::Perspective,
                field_of_view: 45.0,
                aspect: 16.0 / 9.0,
            },
        ))
        .with_child(
            NodeDescription::new(
                "sun",
                KindDescription::Light {
                    color: Vec3::ONE,
                    range: 50.0,
                },
            )
            .with_transform(TransformDescription::at(Vec3::new(2.0, 3.0, 4.0))),
        )
        .with_child(
            NodeDescription::new("probe", KindDescription::Collider)
                .with_transform(TransformDescription::at(Vec3::new(-1.5, 0.2, -5.0))),
        )
        .with_child(cube)
        .with_child(
            NodeDescription::new(
                "twin",
                KindDescription::Clone {
                    target: "cube".to_string(),
                },
            )
            .with_transform(TransformDescription::at(Vec3::new(3.0, 0.0, 0.0))),
        )
        .with_child(
            NodeDescription::new("ball", KindDescription::Sphere)
                .with_transform(TransformDescription::at(Vec3::new(0.0, 2.0, -8.0)))
                .with_material("orange"),
        );

    SceneDescription::new("demo", root)
        .with_material(
            "orange",
            MaterialDescription::Solid {
                color: Vec3::new(1.0, 0.5, 0.0),
                shininess: 16.0,
            },
        )
        .with_active_camera("camera")
}

fn load_scene(path: &Path) -> Result<SceneDescription, SceneError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => SceneDescription::load_json(path),
        _ => SceneDescription::load_ron(path),
    }
}

fn run() -> Result<(), SceneError> {
    let description = match std::env::args().nth(1) {
        Some(path) => load_scene(Path::new(&path))?,
        None => demo_scene(),
    };
    log::info!(
        "Loaded scene '{}' ({} nodes)",
        description.name,
        description.node_count()
    );

    let host = ManualFrameHost::new();
    let config = ViewConfig::default()
        .with_size(1280, 720)
        .with_ambience(Vec3::splat(0.1))
        .with_background(Vec4::new(0.1, 0.1, 0.15, 1.0));
    let mut view = View::new(RecordingContext::new(), config, host.clone());

    let handles = view.edit(|graph| description.instantiate(graph))?;
    view.set_scene(Some(handles.root));
    view.set_camera(handles.active_camera);

    let spinner = handles.get("cube");
    if let Some(cube) = spinner {
        let volumes = trellis::scene::BoxVolumes::new().with(
            cube,
            trellis::scene::Aabb::from_center(Vec3::new(-1.5, 0.0, -5.0), Vec3::splat(0.5)),
        );
        view.graph_mut().set_collision_query(handles.root, volumes)?;
    }

    for frame in 0..FRAMES {
        if let Some(cube) = spinner {
            view.edit(|graph| graph.set_rotation_angle(cube, frame as f32 * 3.0))?;
        }
        if host.take_request() {
            view.on_frame();
            view.context_mut().take_commands();
        }
    }

    if let Some(probe) = handles.get("probe") {
        log::info!("Probe collisions: {:?}", view.graph().collisions(probe)?);
    }
    println!("{}", view.stats().format_stats());
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Demo error: {}", e);
    }
}
