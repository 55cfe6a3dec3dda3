//! Headless scene viewer
//!
//! Loads a scene, builds per-mesh bounds, then drives the evaluate/cull/
//! submit loop against the recording backend. Windowing and the GPU live
//! behind the engine's collaborator interfaces, so this shell runs a fixed
//! number of frames and reports visibility statistics instead of presenting.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use scene_engine::prelude::*;

const USAGE: &str = "usage: scene_viewer --scene <file.s72> [--camera <name>] \
[--window-size <WxH>] [--device <name>] [--config <file.toml>] [--frames <count>]";

struct Args {
    scene: Option<PathBuf>,
    camera: Option<String>,
    window: Option<(u32, u32)>,
    device: Option<String>,
    config: Option<PathBuf>,
    frames: u32,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        scene: None,
        camera: None,
        window: None,
        device: None,
        config: None,
        frames: 240,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .ok_or_else(|| format!("{name} expects a value\n{USAGE}"))
        };
        match flag.as_str() {
            "--scene" => args.scene = Some(PathBuf::from(value("--scene")?)),
            "--camera" => args.camera = Some(value("--camera")?),
            "--window-size" => {
                let size = value("--window-size")?;
                let (width, height) = size
                    .split_once('x')
                    .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)))
                    .ok_or_else(|| format!("invalid --window-size '{size}', expected WxH"))?;
                args.window = Some((width, height));
            }
            "--device" => args.device = Some(value("--device")?),
            "--config" => args.config = Some(PathBuf::from(value("--config")?)),
            "--frames" => {
                let count = value("--frames")?;
                args.frames = count
                    .parse()
                    .map_err(|_| format!("invalid --frames '{count}'"))?;
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            other => return Err(format!("unknown argument '{other}'\n{USAGE}")),
        }
    }
    Ok(args)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(scene) = &args.scene {
        config.scene = Some(scene.display().to_string());
    }
    if let Some(camera) = &args.camera {
        config.camera = Some(camera.clone());
    }
    if let Some((width, height)) = args.window {
        config.window_width = width;
        config.window_height = height;
    }
    if let Some(device) = &args.device {
        config.device = Some(device.clone());
    }
    if let Some(device) = &config.device {
        log::info!("device '{device}' requested; the headless backend ignores it");
    }

    let scene_path = PathBuf::from(
        config
            .scene
            .as_deref()
            .ok_or("no scene file given (use --scene <file.s72>)")?,
    );
    let scene_dir = scene_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    log::info!("loading scene {}", scene_path.display());
    let mut textures = DiskTextureWriter::new(&scene_dir);
    let mut structure = SceneParser::from_file(&scene_path)?.parse_structure(&mut textures)?;
    let bounds = build_mesh_bounds(&structure, &scene_dir)?;

    // First evaluation populates the render lists the upload payload needs.
    evaluate(&mut structure, 0.0)?;
    let payloads = MeshPayload::collect(&structure)?;
    let mut backend = HeadlessBackend::new();
    backend.load_scene(&payloads)?;

    let mut camera_name = config
        .camera
        .clone()
        .unwrap_or_else(|| FreeCamera::NAME.to_string());
    let mut free_camera = FreeCamera::new(config.aspect());
    let mut clock = AnimationClock::new(config.max_animation_time);

    let frame_time = 1.0 / 60.0;
    let mut instance_transforms = Vec::new();
    let mut visibility = Vec::new();
    for _ in 0..args.frames {
        // Headless run: nothing to poll, the snapshot stays empty.
        let input = InputSnapshot::default();
        if input.toggle_pause {
            clock.toggle_pause();
        }
        if input.next_camera || input.prev_camera {
            let step = if input.next_camera { 1 } else { -1 };
            if let Some(name) = cycle_camera(&structure, &camera_name, step)? {
                camera_name = name;
            }
        }
        free_camera.update(&input, frame_time);
        let time = clock.advance(frame_time);

        evaluate(&mut structure, time)?;
        let resolved = resolve_camera(&structure, &camera_name, &free_camera)?;
        backend.set_culling_frustum(resolved.frustum);

        instance_transforms.clear();
        visibility.clear();
        for info in &structure.meshes {
            let aabb = bounds.get(&info.mesh_id);
            for world in &info.transforms {
                let view_transform = resolved.view * world;
                visibility.push(
                    aabb.map_or(true, |aabb| is_visible(&resolved.frustum, &view_transform, aabb)),
                );
                instance_transforms.push(*world);
            }
        }

        backend.submit_frame(&FrameSubmission {
            instance_transforms: &instance_transforms,
            visibility: &visibility,
            view: resolved.view,
            projection: resolved.projection,
        })?;
    }
    backend.wait_idle()?;

    log::info!(
        "submitted {} frames; last frame drew {} of {} instances",
        backend.frames_submitted,
        backend.last_visible,
        instance_transforms.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}
