//! The scene context: one object that owns everything a frame needs.
//!
//! Render loop, resize handling and input all receive the context
//! explicitly. Tearing the scene down is dropping the context; loads still
//! in flight then find their sender disconnected and discard their result.

use bevy::log::{debug, info};
use bevy::prelude::Transform;
use bevy_math::{Quat, UVec2, Vec2, Vec3};
use error_stack::Report;
use std::f32::consts::FRAC_PI_2;

use crate::assets::{AssetInbox, AssetSender, Delivery};
use crate::camera::{Camera, OrbitController};
use crate::config::SceneConfig;
use crate::core::{
    Ambient, Geometry, LightSource, Material, SceneNode, Spot, TextureLibrary,
};
use crate::scene::SceneGraph;
use crate::viewport::{Resize, Viewport, ViewportManager};
use crate::{Result, SceneError};

pub const GROUND_NODE: &str = "ground";

/// What the host reports about the drawable surface at mount time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

#[derive(Debug)]
pub struct SceneContext {
    viewport: ViewportManager,
    camera: Camera,
    controller: OrbitController,
    graph: SceneGraph,
    textures: TextureLibrary,
    inbox: AssetInbox,
    /// Texture file that becomes the spot light's pattern once loaded.
    spot_map: Option<String>,
    failed: Vec<(String, SceneError)>,
}

impl SceneContext {
    /// Build the synchronous part of the scene: viewport, camera, ambient
    /// and spot light, ground plane. Asset-backed content arrives later
    /// through [`SceneContext::sender`].
    pub fn mount(config: &SceneConfig, surface: SurfaceInfo) -> Result<Self> {
        if surface.width == 0 || surface.height == 0 {
            return Err(Report::new(SceneError::SurfaceInit).attach(format!(
                "surface has no area ({}x{})",
                surface.width, surface.height
            )));
        }
        if !(surface.pixel_ratio.is_finite() && surface.pixel_ratio > 0.0) {
            return Err(Report::new(SceneError::SurfaceInit)
                .attach(format!("invalid pixel ratio {}", surface.pixel_ratio)));
        }

        let viewport = Viewport {
            width: surface.width,
            height: surface.height,
            pixel_ratio: surface.pixel_ratio,
        };
        let mut camera = Camera::from_config(&config.camera, viewport.aspect());
        let controller = OrbitController::from_config(&config.camera);
        controller.clamp(&mut camera);

        let mut graph = SceneGraph::new();
        graph.add_light(LightSource::Ambient(Ambient {
            sky: config.ambient.sky,
            ground: config.ambient.ground,
            intensity: config.ambient.intensity,
        }));

        let spot = &config.spot;
        graph.add_light(LightSource::Spot(Spot {
            color: spot.color,
            intensity: spot.intensity,
            position: spot.position,
            target: Vec3::ZERO,
            angle: spot.angle,
            penumbra: spot.penumbra,
            decay: spot.decay,
            distance: spot.distance,
            map: None,
            cast_shadow: spot.cast_shadow && config.renderer.shadows,
            shadow: spot.shadow,
        }));

        let ground = &config.ground;
        graph.add_node(
            SceneNode::new(
                GROUND_NODE,
                Geometry::Plane {
                    width: ground.size,
                    height: ground.size,
                },
                Material {
                    color: ground.color,
                    map: None,
                },
            )
            .with_transform(
                Transform::from_xyz(0.0, ground.height, 0.0)
                    .with_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
            )
            .with_shadows(false, config.renderer.shadows),
        );

        info!(
            "scene mounted at {}x{} (pixel ratio {})",
            surface.width, surface.height, surface.pixel_ratio
        );

        Ok(Self {
            viewport: ViewportManager::new(viewport),
            camera,
            controller,
            graph,
            textures: TextureLibrary::default(),
            inbox: AssetInbox::new(),
            spot_map: spot.map.clone(),
            failed: Vec::new(),
        })
    }

    pub fn sender(&self) -> AssetSender {
        self.inbox.sender()
    }

    /// Merge every finished load into the scene. Called at the start of a
    /// tick, never during a draw.
    pub fn apply_deliveries(&mut self) -> usize {
        let deliveries = self.inbox.take();
        let count = deliveries.len();
        for delivery in deliveries {
            match delivery {
                Delivery::Node(node) => {
                    debug!("inserting node '{}'", node.name);
                    self.graph.add_node(node);
                }
                Delivery::Texture(texture) => {
                    let name = texture.name.clone();
                    let shared = self.textures.insert(texture);
                    if self.spot_map.as_deref() == Some(name.as_str()) {
                        if let Some(spot) = self.graph.spot_mut() {
                            debug!("spot light pattern '{}' ready", name);
                            spot.map = Some(shared);
                        }
                    }
                }
                Delivery::Failed { path, error } => {
                    self.failed.push((path, error));
                }
            }
        }
        count
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Resize {
        self.viewport.on_resize(&mut self.camera, width, height)
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) -> bool {
        self.viewport.set_pixel_ratio(pixel_ratio)
    }

    pub fn orbit(&mut self, pointer_delta: Vec2, wheel_delta: f32) -> bool {
        self.controller
            .update(&mut self.camera, pointer_delta, wheel_delta)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    pub fn surface_size(&self) -> UVec2 {
        self.viewport.surface_size()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controller(&self) -> &OrbitController {
        &self.controller
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn textures(&self) -> &TextureLibrary {
        &self.textures
    }

    /// Loads that failed, with their error kind.
    pub fn failed_assets(&self) -> &[(String, SceneError)] {
        &self.failed
    }

    pub fn teardown(self) {
        info!(
            "scene torn down ({} nodes, {} textures)",
            self.graph.node_count(),
            self.textures.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::texture_record;

    fn surface(width: u32, height: u32) -> SurfaceInfo {
        SurfaceInfo {
            width,
            height,
            pixel_ratio: 1.0,
        }
    }

    #[test]
    fn mount_builds_synchronous_content() {
        let ctx = SceneContext::mount(&SceneConfig::default(), surface(800, 600)).unwrap();
        let graph = ctx.graph();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.light_count(), 2);
        let ground = graph.node_named(GROUND_NODE).unwrap();
        assert!(ground.receive_shadow && !ground.cast_shadow);
        assert_eq!(ground.transform.translation.y, -1.0);
        let spot = graph.spot().unwrap();
        assert_eq!(spot.position, Vec3::new(2.5, 5.0, 2.5));
        assert!(spot.map.is_none());
        assert!((ctx.camera().distance() - 7.0).abs() < 1e-4);
        assert_eq!(ctx.camera().aspect, 800.0 / 600.0);
    }

    #[test]
    fn degenerate_surface_is_fatal() {
        let err = SceneContext::mount(&SceneConfig::default(), surface(0, 600)).unwrap_err();
        assert_eq!(*err.current_context(), SceneError::SurfaceInit);

        let bad_ratio = SurfaceInfo {
            pixel_ratio: f32::NAN,
            ..surface(800, 600)
        };
        assert!(SceneContext::mount(&SceneConfig::default(), bad_ratio).is_err());
    }

    #[test]
    fn light_pattern_attaches_when_its_texture_arrives() {
        let mut ctx = SceneContext::mount(&SceneConfig::default(), surface(800, 600)).unwrap();
        let tx = ctx.sender();
        tx.send(Delivery::Texture(texture_record("colors.png", 2, 2)));
        assert_eq!(ctx.apply_deliveries(), 1);
        assert!(ctx.graph().spot().unwrap().map.is_none());

        tx.send(Delivery::Texture(texture_record("disturb.jpg", 2, 2)));
        ctx.apply_deliveries();
        let map = ctx.graph().spot().unwrap().map.clone().unwrap();
        assert_eq!(map.name, "disturb.jpg");
        assert!(std::sync::Arc::ptr_eq(
            &map,
            &ctx.textures().get("disturb.jpg").unwrap()
        ));
    }

    #[test]
    fn failed_texture_leaves_light_without_pattern() {
        let mut ctx = SceneContext::mount(&SceneConfig::default(), surface(800, 600)).unwrap();
        ctx.sender().send(Delivery::Failed {
            path: "textures/disturb.jpg".into(),
            error: SceneError::AssetNotFound,
        });
        ctx.apply_deliveries();
        assert!(ctx.graph().spot().unwrap().map.is_none());
        assert_eq!(
            ctx.failed_assets(),
            &[("textures/disturb.jpg".to_string(), SceneError::AssetNotFound)]
        );
    }

    #[test]
    fn teardown_disconnects_senders() {
        let ctx = SceneContext::mount(&SceneConfig::default(), surface(800, 600)).unwrap();
        let tx = ctx.sender();
        ctx.teardown();
        assert!(!tx.send(Delivery::Texture(texture_record("colors.png", 1, 1))));
    }
}
