//! Asset post-processing and the loader-to-render-loop handoff.
//!
//! Fetching and decoding bytes is the asset server's job (see
//! `render::ply_loader`). What happens here is backend independent: mesh
//! normalization, texture records, and the queue through which finished
//! assets reach the scene.

use bevy::log::debug;
use bevy::prelude::Transform;
use bevy_math::Quat;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::SceneError;
use crate::config::MeshConfig;
use crate::core::{ColorSpace, Geometry, Material, SceneNode, Texture, TextureFilter};
use crate::geometry::MeshData;

/// What the loader does to a freshly parsed mesh before it enters the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshSettings {
    pub scale: f32,
    pub transform: Transform,
    pub material: MaterialSpec,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// Plain-data description of a Lambert material, so settings stay `PartialEq`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialSpec {
    pub color: crate::core::Color,
}

impl MeshSettings {
    pub fn from_config(config: &MeshConfig) -> Self {
        Self {
            scale: config.scale,
            transform: Transform::from_translation(config.position)
                .with_rotation(Quat::from_rotation_y(config.rotation_y)),
            material: MaterialSpec {
                color: config.color,
            },
            cast_shadow: config.cast_shadow,
            receive_shadow: config.receive_shadow,
        }
    }

    /// Apply the fixed uniform scale and rebuild vertex normals so lighting
    /// is correct at the new size.
    pub fn normalize(&self, mut data: MeshData) -> MeshData {
        data.scale(self.scale);
        data.compute_vertex_normals();
        data
    }

    /// Wrap normalized geometry into a node ready for insertion.
    pub fn node(&self, name: impl Into<String>, data: Arc<MeshData>) -> SceneNode {
        SceneNode::new(
            name,
            Geometry::Mesh(data),
            Material {
                color: self.material.color,
                map: None,
            },
        )
        .with_transform(self.transform)
        .with_shadows(self.cast_shadow, self.receive_shadow)
    }
}

/// Texture record with the sampling fixed at load time: linear filtering,
/// sRGB color.
pub fn texture_record(name: impl Into<String>, width: u32, height: u32) -> Texture {
    Texture {
        name: name.into(),
        width,
        height,
        min_filter: TextureFilter::Linear,
        mag_filter: TextureFilter::Linear,
        color_space: ColorSpace::Srgb,
    }
}

/// A finished load, success or failure.
#[derive(Debug)]
pub enum Delivery {
    Node(SceneNode),
    Texture(Texture),
    Failed { path: String, error: SceneError },
}

type Queue = Mutex<Vec<Delivery>>;

/// Receiving end, owned by the scene context and drained once per tick.
#[derive(Default, Debug)]
pub struct AssetInbox {
    queue: Arc<Queue>,
}

impl AssetInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> AssetSender {
        AssetSender {
            queue: Arc::downgrade(&self.queue),
        }
    }

    /// Everything delivered since the last call, in arrival order.
    pub fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.queue.lock())
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

/// Sending end handed to loaders. Holds no strong reference, so a load that
/// outlives the scene cannot keep it alive or write into it.
#[derive(Clone, Debug)]
pub struct AssetSender {
    queue: Weak<Queue>,
}

impl AssetSender {
    /// Returns `false` when the scene is already gone; the delivery is
    /// dropped.
    pub fn send(&self, delivery: Delivery) -> bool {
        match self.queue.upgrade() {
            Some(queue) => {
                queue.lock().push(delivery);
                true
            }
            None => {
                debug!("scene torn down, discarding late asset delivery");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.queue.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConfig;
    use glam::Vec3;

    fn triangle() -> MeshData {
        MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1000.0, 0.0, 0.0], [0.0, 1000.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn normalize_scales_and_relights() {
        let settings = MeshSettings::from_config(&MeshConfig::default());
        let mesh = settings.normalize(triangle());
        let (_, hi) = mesh.bounds().unwrap();
        assert!((hi - Vec3::new(2.4, 2.4, 0.0)).length() < 1e-5);
        assert_eq!(mesh.normals.len(), 3);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn node_carries_pose_and_shadow_flags() {
        let config = MeshConfig::default();
        let settings = MeshSettings::from_config(&config);
        let node = settings.node("lucy", Arc::new(settings.normalize(triangle())));
        assert!(node.cast_shadow && node.receive_shadow);
        assert_eq!(node.transform.translation.y, 0.8);
        // -90deg about Y sends +X to +Z.
        let x = node.transform.rotation * bevy_math::Vec3::X;
        assert!((x - bevy_math::Vec3::Z).length() < 1e-5);
        assert!(matches!(node.geometry, Geometry::Mesh(_)));
    }

    #[test]
    fn sender_delivers_while_inbox_lives() {
        let inbox = AssetInbox::new();
        let tx = inbox.sender();
        assert!(tx.send(Delivery::Texture(texture_record("colors.png", 4, 4))));
        assert_eq!(inbox.pending(), 1);
        let taken = inbox.take();
        assert_eq!(taken.len(), 1);
        assert_eq!(inbox.pending(), 0);
    }

    #[test]
    fn sender_is_a_no_op_after_teardown() {
        let inbox = AssetInbox::new();
        let tx = inbox.sender();
        drop(inbox);
        assert!(!tx.is_connected());
        assert!(!tx.send(Delivery::Failed {
            path: "models/Lucy100k.ply".into(),
            error: SceneError::AssetNotFound,
        }));
    }

    #[test]
    fn deliveries_cross_threads() {
        let inbox = AssetInbox::new();
        let tx = inbox.sender();
        let handle = std::thread::spawn(move || {
            tx.send(Delivery::Texture(texture_record("disturb.jpg", 8, 8)))
        });
        assert!(handle.join().unwrap());
        assert!(matches!(inbox.take().as_slice(), [Delivery::Texture(t)] if t.name == "disturb.jpg"));
    }

    #[test]
    fn texture_records_use_linear_srgb() {
        let t = texture_record("uv_grid_opengl.jpg", 1024, 1024);
        assert_eq!(t.min_filter, TextureFilter::Linear);
        assert_eq!(t.mag_filter, TextureFilter::Linear);
        assert_eq!(t.color_space, ColorSpace::Srgb);
    }
}
