use bevy::asset::AssetMetaCheck;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use crate::config::SceneConfig;
use crate::render::SceneRenderPlugin;

pub const LOG_FILTER: &str = "info,wgpu=error,naga=warn,spotlight_stage=debug";

#[cfg(not(target_arch = "wasm32"))]
pub fn run_scene(config: SceneConfig) -> AppExit {
    App::new()
        .add_plugins((
            DefaultPlugins
                .set(LogPlugin {
                    filter: LOG_FILTER.into(),
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "spotlight stage".into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                }),
            SceneRenderPlugin::new(config),
        ))
        .run()
}

/// Asset paths resolve against the page URL, so `textures/` and `models/`
/// must be served next to the page.
#[cfg(target_arch = "wasm32")]
pub fn run_scene(config: SceneConfig, canvas_id: &str, signal: crate::render::HostSignal) {
    App::new()
        .insert_resource(signal)
        .add_plugins((
            DefaultPlugins
                .set(LogPlugin {
                    filter: LOG_FILTER.into(),
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        canvas: Some(format!("#{}", canvas_id)),
                        fit_canvas_to_parent: true,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    file_path: String::new(),
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                }),
            SceneRenderPlugin::new(config),
        ))
        .run();
}
