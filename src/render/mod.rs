pub mod components;
pub mod draw;
pub mod ply_loader;
pub mod resources;
pub mod systems;

pub use ply_loader::{PlyLoader, PlyMesh};
pub use resources::*;
use systems::*;

use bevy::prelude::*;

use crate::assets::MeshSettings;
use crate::config::SceneConfig;

/// Mounts the scene at startup and drives it every frame.
pub struct SceneRenderPlugin {
    config: SceneConfig,
}

impl SceneRenderPlugin {
    pub fn new(config: SceneConfig) -> Self {
        Self { config }
    }
}

impl Plugin for SceneRenderPlugin {
    fn build(&self, app: &mut App) {
        let loader_settings = MeshLoaderSettings::new(MeshSettings::from_config(&self.config.mesh));
        app.insert_resource(SceneConfigRes::new(self.config.clone()))
            .insert_resource(ClearColor(self.config.background.into()))
            .init_resource::<NodeEntities>()
            .init_resource::<LoadedTextures>()
            .init_resource::<HostSignal>()
            .init_asset::<PlyMesh>()
            .register_asset_loader(PlyLoader::new(loader_settings.0.clone()))
            .insert_resource(loader_settings)
            .add_systems(Startup, mount_scene)
            .add_systems(
                Update,
                (
                    watch_host_signal,
                    poll_asset_loads,
                    handle_resize,
                    handle_orbit_input,
                    tick_render_loop,
                )
                    .chain(),
            );
    }
}
