//! The Bevy side of [`DrawPrimitive`]: mirrors the scene graph into
//! entities. Nodes and lights spawn once and afterwards only have their
//! transforms refreshed.

use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::light::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_camera::{PerspectiveProjection, Projection};
use bevy_mesh::{Indices, PrimitiveTopology};
use std::f32::consts::PI;

use super::components::{SceneCamera, SceneEntity, SceneLight};
use super::resources::{LoadedTextures, NodeEntities};
use crate::camera::Camera as SceneCameraState;
use crate::config::RendererConfig;
use crate::core::{Ambient, Geometry, LightId, LightSource, SceneNode, Spot};
use crate::geometry::MeshData;
use crate::render_loop::DrawPrimitive;
use crate::scene::SceneGraph;

/// Lux per unit of hemisphere intensity.
const AMBIENT_BRIGHTNESS_SCALE: f32 = 1000.0;

pub struct BevyDraw<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub meshes: &'a mut Assets<Mesh>,
    pub materials: &'a mut Assets<StandardMaterial>,
    pub entities: &'a mut NodeEntities,
    pub textures: &'a LoadedTextures,
    pub renderer: &'a RendererConfig,
}

impl DrawPrimitive for BevyDraw<'_, '_, '_> {
    fn render(&mut self, scene: &SceneGraph, camera: &SceneCameraState) {
        for node in scene.renderables() {
            self.sync_node(node);
        }
        for (id, light) in scene.lights() {
            match light {
                LightSource::Ambient(ambient) => self.sync_ambient(ambient),
                LightSource::Spot(spot) => self.sync_spot(id, spot),
            }
        }
        self.sync_camera(camera);
    }
}

impl BevyDraw<'_, '_, '_> {
    fn sync_node(&mut self, node: &SceneNode) {
        if let Some(&entity) = self.entities.nodes.get(&node.id) {
            self.commands.entity(entity).insert(node.transform);
            return;
        }

        let mesh = match &node.geometry {
            Geometry::Plane { width, height } => plane_mesh(*width, *height),
            Geometry::Mesh(data) => to_bevy_mesh(data),
        };
        let base_color_texture = node
            .material
            .map
            .as_ref()
            .and_then(|texture| self.textures.0.get(&texture.name).cloned());
        let material = StandardMaterial {
            base_color: node.material.color.into(),
            base_color_texture,
            // Lambert: fully rough, no specular highlight.
            perceptual_roughness: 1.0,
            reflectance: 0.0,
            ..default()
        };
        let mesh = self.meshes.add(mesh);
        let material = self.materials.add(material);

        let mut entity = self.commands.spawn((
            Name::new(node.name.clone()),
            SceneEntity { id: node.id },
            Mesh3d(mesh),
            MeshMaterial3d(material),
            node.transform,
        ));
        if !node.cast_shadow {
            entity.insert(NotShadowCaster);
        }
        if !node.receive_shadow {
            entity.insert(NotShadowReceiver);
        }
        self.entities.nodes.insert(node.id, entity.id());
    }

    fn sync_ambient(&mut self, ambient: &Ambient) {
        if self.entities.ambient_applied {
            return;
        }
        self.commands.insert_resource(AmbientLight {
            color: hemisphere_color(ambient),
            brightness: ambient.intensity * AMBIENT_BRIGHTNESS_SCALE,
            ..default()
        });
        self.entities.ambient_applied = true;
    }

    fn sync_spot(&mut self, id: LightId, spot: &Spot) {
        let transform = Transform::from_translation(spot.position).looking_at(spot.target, Vec3::Y);
        if let Some(&entity) = self.entities.lights.get(&id) {
            self.commands.entity(entity).insert(transform);
            return;
        }
        let entity = self
            .commands
            .spawn((
                Name::new("spot"),
                SceneLight { id },
                SpotLight {
                    color: spot.color.into(),
                    // Candela to lumens over the full sphere.
                    intensity: spot.intensity * 4.0 * PI,
                    range: spot.distance,
                    radius: 0.0,
                    shadows_enabled: spot.cast_shadow,
                    shadow_map_near_z: spot.shadow.near,
                    outer_angle: spot.angle,
                    inner_angle: spot.inner_angle(),
                    ..default()
                },
                transform,
            ))
            .id();
        self.entities.lights.insert(id, entity);
    }

    fn sync_camera(&mut self, camera: &SceneCameraState) {
        let projection = Projection::Perspective(PerspectiveProjection {
            fov: camera.fov_radians(),
            aspect_ratio: camera.aspect,
            near: camera.near,
            far: camera.far,
            ..default()
        });
        let transform = camera.view_transform();

        match self.entities.camera {
            Some(entity) => {
                self.commands.entity(entity).insert((projection, transform));
            }
            None => {
                let tonemapping = if self.renderer.aces_tone_mapping {
                    Tonemapping::AcesFitted
                } else {
                    Tonemapping::None
                };
                let entity = self
                    .commands
                    .spawn((
                        Name::new("scene_camera"),
                        SceneCamera,
                        Camera3d::default(),
                        projection,
                        tonemapping,
                        transform,
                    ))
                    .id();
                self.entities.camera = Some(entity);
            }
        }
    }
}

/// Average of sky and ground color; Bevy's ambient term is not directional.
fn hemisphere_color(ambient: &Ambient) -> Color {
    let sky = LinearRgba::from(Color::from(ambient.sky));
    let ground = LinearRgba::from(Color::from(ambient.ground));
    Color::from(LinearRgba::rgb(
        (sky.red + ground.red) * 0.5,
        (sky.green + ground.green) * 0.5,
        (sky.blue + ground.blue) * 0.5,
    ))
}

/// Convert backend-neutral geometry into a Bevy mesh. Faceless geometry
/// becomes a point list.
pub fn to_bevy_mesh(data: &MeshData) -> Mesh {
    let topology = if data.is_point_cloud() {
        PrimitiveTopology::PointList
    } else {
        PrimitiveTopology::TriangleList
    };
    let mut mesh = Mesh::new(topology, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone());
    if data.normals.len() == data.positions.len() {
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, data.normals.clone());
    }
    if let Some(colors) = &data.colors {
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors.clone());
    }
    if !data.is_point_cloud() {
        mesh.insert_indices(Indices::U32(data.indices.clone()));
    }
    mesh
}

fn plane_mesh(width: f32, height: f32) -> Mesh {
    let mut mesh = to_bevy_mesh(&MeshData::plane(width, height));
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, MeshData::plane_uvs());
    mesh
}
