use bevy::prelude::*;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use super::ply_loader::PlyMesh;
use crate::assets::{AssetSender, MeshSettings};
use crate::config::SceneConfig;
use crate::context::SceneContext;
use crate::core::{LightId, NodeId};
use crate::render_loop::RenderLoop;

#[derive(Resource, Clone)]
pub struct SceneConfigRes(pub SceneConfig);

impl SceneConfigRes {
    pub fn new(config: SceneConfig) -> Self {
        Self(config)
    }
}

/// Present from a successful mount until teardown.
#[derive(Resource)]
pub struct SceneState {
    pub context: SceneContext,
    pub render_loop: RenderLoop,
}

/// Bevy entities already spawned for scene graph items.
#[derive(Resource, Default)]
pub struct NodeEntities {
    pub nodes: HashMap<NodeId, Entity>,
    pub lights: HashMap<LightId, Entity>,
    pub camera: Option<Entity>,
    pub ambient_applied: bool,
}

/// Loads requested at mount whose outcome has not been delivered yet.
#[derive(Resource)]
pub struct PendingLoads {
    pub sender: AssetSender,
    pub mesh: Option<(String, Handle<PlyMesh>)>,
    pub textures: Vec<(String, Handle<Image>)>,
}

impl PendingLoads {
    pub fn is_empty(&self) -> bool {
        self.mesh.is_none() && self.textures.is_empty()
    }
}

/// Normalization applied by the PLY loader; replaced on remount.
#[derive(Resource, Clone, Debug)]
pub struct MeshLoaderSettings(pub Arc<RwLock<MeshSettings>>);

impl MeshLoaderSettings {
    pub fn new(settings: MeshSettings) -> Self {
        Self(Arc::new(RwLock::new(settings)))
    }
}

/// Strong handles for every decoded texture, keyed by file name.
#[derive(Resource, Default)]
pub struct LoadedTextures(pub HashMap<String, Handle<Image>>);

#[derive(Clone, Debug)]
pub enum HostRequest {
    /// Build the scene again, replacing any mounted one.
    Mount(SceneConfig),
    /// Tear the scene down; the app keeps running.
    Unmount,
}

/// Mount/unmount requests from the embedding host, handled in arrival
/// order at the start of the next frame.
#[derive(Resource, Clone, Default, Debug)]
pub struct HostSignal {
    requests: Arc<Mutex<Vec<HostRequest>>>,
}

impl HostSignal {
    pub fn request_mount(&self, config: SceneConfig) {
        self.requests.lock().push(HostRequest::Mount(config));
    }

    pub fn request_unmount(&self) {
        self.requests.lock().push(HostRequest::Unmount);
    }

    pub fn take_requests(&self) -> Vec<HostRequest> {
        std::mem::take(&mut *self.requests.lock())
    }
}
