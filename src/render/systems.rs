use bevy::asset::io::AssetReaderError;
use bevy::asset::{AssetLoadError, LoadState};
use bevy::image::{ImageLoaderSettings, ImageSampler};
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::light::PointLightShadowMap;
use bevy::prelude::*;
use bevy::time::Real;
use bevy::window::{PrimaryWindow, WindowResized};

use error_stack::Report;

use super::components::{SceneCamera, SceneEntity, SceneLight};
use super::draw::BevyDraw;
use super::ply_loader::PlyMesh;
use super::resources::*;
use crate::SceneError;
use crate::assets::{Delivery, MeshSettings, texture_record};
use crate::config::SceneConfig;
use crate::context::{SceneContext, SurfaceInfo};
use crate::render_loop::{LightOrbit, RenderLoop};
use crate::viewport::Resize;

/// Wheel pixels that count as one line notch.
const PIXELS_PER_LINE: f32 = 100.0;

pub fn mount_scene(
    mut commands: Commands,
    config: Res<SceneConfigRes>,
    windows: Query<&Window, With<PrimaryWindow>>,
    asset_server: Res<AssetServer>,
    mut exit: MessageWriter<AppExit>,
) {
    if let Err(report) = mount_into(&mut commands, &config.0, &windows, &asset_server) {
        error!("scene mount failed: {report:?}");
        exit.write(AppExit::error());
    }
}

fn primary_surface(windows: &Query<&Window, With<PrimaryWindow>>) -> crate::Result<SurfaceInfo> {
    let window = windows
        .single()
        .map_err(|err| Report::new(SceneError::SurfaceInit).attach(format!("no primary window: {err}")))?;
    Ok(SurfaceInfo {
        width: window.width().round() as u32,
        height: window.height().round() as u32,
        pixel_ratio: window.scale_factor(),
    })
}

/// Build the scene context, start its loop and request its assets. The
/// resources land when the caller's commands are applied.
fn mount_into(
    commands: &mut Commands,
    config: &SceneConfig,
    windows: &Query<&Window, With<PrimaryWindow>>,
    asset_server: &AssetServer,
) -> crate::Result<()> {
    let context = SceneContext::mount(config, primary_surface(windows)?)?;
    let mut render_loop = RenderLoop::new(LightOrbit::from_config(&config.spot));
    render_loop.start(&context)?;

    let mesh = load_mesh(asset_server, &config.mesh.path);
    let textures = config
        .textures
        .files
        .iter()
        .map(|name| (name.clone(), load_texture(asset_server, config.texture_path(name))))
        .collect();
    info!(
        "requested mesh '{}' and {} textures",
        config.mesh.path,
        config.textures.files.len()
    );

    commands.insert_resource(PendingLoads {
        sender: context.sender(),
        mesh: Some((config.mesh.path.clone(), mesh)),
        textures,
    });
    commands.insert_resource(PointLightShadowMap {
        size: config.spot.shadow.map_size.max_element() as usize,
    });
    commands.insert_resource(SceneState {
        context,
        render_loop,
    });
    Ok(())
}

/// Request a PLY mesh; parsing and normalization happen in [`super::PlyLoader`].
pub fn load_mesh(asset_server: &AssetServer, path: &str) -> Handle<PlyMesh> {
    asset_server.load(path.to_owned())
}

/// Request a texture sampled with linear filtering as sRGB color.
pub fn load_texture(asset_server: &AssetServer, path: String) -> Handle<Image> {
    asset_server.load_with_settings(path, |settings: &mut ImageLoaderSettings| {
        settings.is_srgb = true;
        settings.sampler = ImageSampler::linear();
    })
}

fn classify(err: &AssetLoadError) -> SceneError {
    match err {
        AssetLoadError::AssetReaderError(AssetReaderError::NotFound(_))
        | AssetLoadError::AssetReaderError(AssetReaderError::HttpError(404)) => {
            SceneError::AssetNotFound
        }
        _ => SceneError::AssetDecode,
    }
}

/// Turn finished asset-server loads into deliveries for the next tick.
pub fn poll_asset_loads(
    mut commands: Commands,
    pending: Option<ResMut<PendingLoads>>,
    asset_server: Res<AssetServer>,
    ply_meshes: Res<Assets<PlyMesh>>,
    images: Res<Assets<Image>>,
    config: Res<SceneConfigRes>,
    mut loaded: ResMut<LoadedTextures>,
) {
    let Some(mut pending) = pending else { return };

    if let Some((path, handle)) = pending.mesh.take() {
        match asset_server.load_state(handle.id()) {
            LoadState::Loaded => match ply_meshes.get(&handle) {
                Some(ply) => {
                    info!(
                        "mesh '{}' ready: {} vertices, {} triangles",
                        path,
                        ply.0.vertex_count(),
                        ply.0.triangle_count()
                    );
                    let settings = MeshSettings::from_config(&config.0.mesh);
                    let node = settings.node(path, ply.0.clone());
                    pending.sender.send(Delivery::Node(node));
                }
                None => {
                    warn!("mesh '{}' reported loaded but is missing", path);
                    pending.sender.send(Delivery::Failed {
                        path,
                        error: SceneError::AssetDecode,
                    });
                }
            },
            LoadState::Failed(err) => {
                let error = classify(&err);
                warn!("mesh '{}' failed to load ({error}): {err}", path);
                pending.sender.send(Delivery::Failed { path, error });
            }
            LoadState::NotLoaded | LoadState::Loading => pending.mesh = Some((path, handle)),
        }
    }

    let waiting = std::mem::take(&mut pending.textures);
    for (name, handle) in waiting {
        match asset_server.load_state(handle.id()) {
            LoadState::Loaded => {
                let Some(image) = images.get(&handle) else {
                    pending.textures.push((name, handle));
                    continue;
                };
                debug!("texture '{}' ready ({}x{})", name, image.width(), image.height());
                pending
                    .sender
                    .send(Delivery::Texture(texture_record(&name, image.width(), image.height())));
                loaded.0.insert(name, handle);
            }
            LoadState::Failed(err) => {
                let error = classify(&err);
                let path = config.0.texture_path(&name);
                warn!("texture '{}' failed to load ({error}): {err}", path);
                pending.sender.send(Delivery::Failed { path, error });
            }
            LoadState::NotLoaded | LoadState::Loading => pending.textures.push((name, handle)),
        }
    }

    if pending.is_empty() {
        debug!("all asset loads settled");
        commands.remove_resource::<PendingLoads>();
    }
}

pub fn handle_resize(
    mut resized: MessageReader<WindowResized>,
    windows: Query<&Window, With<PrimaryWindow>>,
    state: Option<ResMut<SceneState>>,
) {
    let Some(mut state) = state else {
        resized.clear();
        return;
    };

    for event in resized.read() {
        let (width, height) = (event.width.round() as u32, event.height.round() as u32);
        match state.context.resize(width, height) {
            Resize::Applied => debug!("viewport resized to {}x{}", width, height),
            Resize::Ignored => debug!("ignoring degenerate resize {}x{}", width, height),
            Resize::Unchanged => {}
        }
    }

    if let Ok(window) = windows.single() {
        let ratio = window.scale_factor();
        if ratio != state.context.viewport().pixel_ratio {
            state.context.set_pixel_ratio(ratio);
        }
    }
}

/// Left-drag orbits, the wheel dollies.
pub fn handle_orbit_input(
    mouse: Res<ButtonInput<MouseButton>>,
    mut wheel: MessageReader<MouseWheel>,
    mut motion: MessageReader<MouseMotion>,
    state: Option<ResMut<SceneState>>,
) {
    let mut zoom_delta = 0.0;
    for event in wheel.read() {
        zoom_delta += match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / PIXELS_PER_LINE,
        };
    }

    let mut drag_delta = Vec2::ZERO;
    let dragging = mouse.pressed(MouseButton::Left);
    for event in motion.read() {
        if dragging {
            drag_delta += event.delta;
        }
    }

    let Some(mut state) = state else { return };
    if drag_delta != Vec2::ZERO || zoom_delta != 0.0 {
        state.context.orbit(drag_delta, zoom_delta);
    }
}

pub fn tick_render_loop(
    mut commands: Commands,
    time: Res<Time<Real>>,
    state: Option<ResMut<SceneState>>,
    mut entities: ResMut<NodeEntities>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    textures: Res<LoadedTextures>,
    config: Res<SceneConfigRes>,
) {
    let Some(mut state) = state else { return };
    let SceneState {
        context,
        render_loop,
    } = &mut *state;

    let mut draw = BevyDraw {
        commands: &mut commands,
        meshes: &mut *meshes,
        materials: &mut *materials,
        entities: &mut *entities,
        textures: &*textures,
        renderer: &config.0.renderer,
    };
    render_loop.tick(context, time.elapsed(), &mut draw);
}

/// Apply host mount/unmount requests. Unmounting stops the loop, drops
/// the context and despawns everything the draw spawned; the app itself
/// keeps running so a later mount reuses it.
pub fn watch_host_signal(
    mut commands: Commands,
    signal: Res<HostSignal>,
    mut state: Option<ResMut<SceneState>>,
    spawned: Query<Entity, Or<(With<SceneEntity>, With<SceneLight>, With<SceneCamera>)>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    asset_server: Res<AssetServer>,
    loader_settings: Option<Res<MeshLoaderSettings>>,
    mut exit: MessageWriter<AppExit>,
) {
    let mut mounted = state.is_some();
    for request in signal.take_requests() {
        if mounted {
            if let Some(state) = state.as_mut() {
                state.render_loop.stop();
            }
            unmount(&mut commands, &spawned);
            mounted = false;
        }

        let HostRequest::Mount(config) = request else {
            continue;
        };
        if let Some(settings) = &loader_settings {
            *settings.0.write() = MeshSettings::from_config(&config.mesh);
        }
        commands.insert_resource(ClearColor(config.background.into()));
        match mount_into(&mut commands, &config, &windows, &asset_server) {
            Ok(()) => mounted = true,
            Err(report) => {
                error!("scene remount failed: {report:?}");
                exit.write(AppExit::error());
            }
        }
        commands.insert_resource(SceneConfigRes::new(config));
    }
}

fn unmount(
    commands: &mut Commands,
    spawned: &Query<Entity, Or<(With<SceneEntity>, With<SceneLight>, With<SceneCamera>)>>,
) {
    commands.remove_resource::<PendingLoads>();
    commands.queue(|world: &mut World| {
        if let Some(state) = world.remove_resource::<SceneState>() {
            state.context.teardown();
        }
    });
    for entity in spawned {
        commands.entity(entity).despawn();
    }
    commands.insert_resource(AmbientLight::default());
    commands.insert_resource(NodeEntities::default());
    commands.insert_resource(LoadedTextures::default());
}
