use bevy::prelude::*;

use crate::core::{LightId, NodeId};

/// Entity mirroring a scene graph node.
#[derive(Component, Clone, Copy, Debug)]
pub struct SceneEntity {
    pub id: NodeId,
}

/// Entity mirroring a scene graph light.
#[derive(Component, Clone, Copy, Debug)]
pub struct SceneLight {
    pub id: LightId,
}

/// The one camera drawing the scene.
#[derive(Component)]
pub struct SceneCamera;
