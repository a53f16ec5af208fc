use bevy::prelude::Transform;
use bevy_math::{UVec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::MeshData;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// `0xRRGGBB`, channels read as sRGB bytes.
    pub const fn hex(rgb: u32) -> Self {
        Self::rgb(
            ((rgb >> 16) & 0xff) as f32 / 255.0,
            ((rgb >> 8) & 0xff) as f32 / 255.0,
            (rgb & 0xff) as f32 / 255.0,
        )
    }

    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
}

impl From<Color> for bevy::prelude::Color {
    #[inline]
    fn from(c: Color) -> Self {
        bevy::prelude::Color::srgba(c.r, c.g, c.b, c.a)
    }
}

#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl Default for NodeId {
    fn default() -> Self {
        static CTR: AtomicU64 = AtomicU64::new(1);
        Self(CTR.fetch_add(1, Ordering::Relaxed))
    }
}

impl NodeId {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct LightId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

/// Decoded image metadata. Immutable once loaded; the pixels themselves live
/// with the graphics backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub color_space: ColorSpace,
}

pub type TextureRef = Arc<Texture>;

/// Textures by file name. Holds one strong reference per texture until the
/// scene is torn down.
#[derive(Default, Debug)]
pub struct TextureLibrary {
    by_name: HashMap<String, TextureRef>,
}

impl TextureLibrary {
    /// Returns the shared handle; a second insert under the same name keeps
    /// the first texture.
    pub fn insert(&mut self, texture: Texture) -> TextureRef {
        self.by_name
            .entry(texture.name.clone())
            .or_insert_with(|| Arc::new(texture))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<TextureRef> {
        self.by_name.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[derive(Clone, Debug)]
pub enum Geometry {
    Plane { width: f32, height: f32 },
    Mesh(Arc<MeshData>),
}

/// Opaque diffuse (Lambert) surface.
#[derive(Clone, Debug)]
pub struct Material {
    pub color: Color,
    pub map: Option<TextureRef>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub transform: Transform,
    pub geometry: Geometry,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            transform: Transform::IDENTITY,
            geometry,
            material,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }
}

/// Hemisphere ambient light: sky color from above, ground color from below.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ambient {
    pub sky: Color,
    pub ground: Color,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowSettings {
    pub map_size: UVec2,
    pub near: f32,
    pub far: f32,
    pub focus: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: UVec2::splat(1024),
            near: 1.0,
            far: 10.0,
            focus: 1.0,
        }
    }
}

/// Cone light aimed at `target`.
#[derive(Clone, Debug)]
pub struct Spot {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
    /// Half-angle of the cone, radians.
    pub angle: f32,
    /// Fraction of the cone softened at the edge, `0..=1`.
    pub penumbra: f32,
    pub decay: f32,
    /// Cut-off range; `0` means unlimited.
    pub distance: f32,
    /// Projected pattern mask.
    pub map: Option<TextureRef>,
    pub cast_shadow: bool,
    pub shadow: ShadowSettings,
}

impl Spot {
    /// Inner cone angle implied by the penumbra.
    pub fn inner_angle(&self) -> f32 {
        self.angle * (1.0 - self.penumbra.clamp(0.0, 1.0))
    }
}

#[derive(Clone, Debug)]
pub enum LightSource {
    Ambient(Ambient),
    Spot(Spot),
}
