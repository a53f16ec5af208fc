//! Scene description. Every constant of the scene lives here so a host can
//! override any of it with a JSON document; missing fields fall back to the
//! defaults.

use bevy_math::{UVec2, Vec3};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_6};

use crate::core::{Color, ShadowSettings};
use crate::{Result, SceneError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub background: Color,
    pub camera: CameraConfig,
    pub ambient: AmbientConfig,
    pub spot: SpotConfig,
    pub ground: GroundConfig,
    pub textures: TextureConfig,
    pub mesh: MeshConfig,
    pub renderer: RendererConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: Color::hex(0x191919),
            camera: CameraConfig::default(),
            ambient: AmbientConfig::default(),
            spot: SpotConfig::default(),
            ground: GroundConfig::default(),
            textures: TextureConfig::default(),
            mesh: MeshConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .change_context(SceneError::Config)
            .attach("scene configuration is not valid JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the scene degenerate.
    pub fn validate(&self) -> Result<()> {
        let cam = &self.camera;
        if !(cam.min_distance > 0.0 && cam.min_distance <= cam.max_distance) {
            return Err(Report::new(SceneError::Config).attach(format!(
                "orbit distance range [{}, {}] is empty",
                cam.min_distance, cam.max_distance
            )));
        }
        if !(0.0..=std::f32::consts::PI).contains(&cam.max_polar_angle) {
            return Err(Report::new(SceneError::Config)
                .attach(format!("max polar angle {} outside [0, pi]", cam.max_polar_angle)));
        }
        if !(cam.near > 0.0 && cam.near < cam.far) {
            return Err(Report::new(SceneError::Config)
                .attach(format!("clip planes near={} far={}", cam.near, cam.far)));
        }
        if !(self.spot.orbit_period > 0.0) {
            return Err(Report::new(SceneError::Config)
                .attach(format!("orbit period {} must be positive", self.spot.orbit_period)));
        }
        Ok(())
    }

    pub fn texture_path(&self, name: &str) -> String {
        format!("{}{}", self.textures.base_path, name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view, degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub max_polar_angle: f32,
    /// Radians of orbit per pixel of pointer motion.
    pub rotate_speed: f32,
    /// Distance multiplier per wheel unit is `zoom_base.powf(wheel)`.
    pub zoom_base: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 40.0,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(7.0, 4.0, 1.0),
            target: Vec3::new(0.0, 1.0, 0.0),
            min_distance: 2.0,
            max_distance: 7.0,
            max_polar_angle: FRAC_PI_2,
            rotate_speed: 0.005,
            zoom_base: 0.95,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub sky: Color,
    pub ground: Color,
    pub intensity: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            sky: Color::hex(0xffffff),
            ground: Color::hex(0x8d8d8d),
            intensity: 0.15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotConfig {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub distance: f32,
    /// File name of the projected pattern, one of `textures.files`.
    pub map: Option<String>,
    pub cast_shadow: bool,
    pub shadow: ShadowSettings,
    pub orbit_radius: f32,
    /// Seconds divisor of the orbit angle: `t = elapsed_secs / orbit_period`.
    pub orbit_period: f64,
}

impl Default for SpotConfig {
    fn default() -> Self {
        Self {
            color: Color::hex(0xff0000),
            intensity: 250.0,
            position: Vec3::new(2.5, 5.0, 2.5),
            angle: FRAC_PI_6,
            penumbra: 1.0,
            decay: 2.0,
            distance: 20.0,
            map: Some("disturb.jpg".into()),
            cast_shadow: true,
            shadow: ShadowSettings {
                map_size: UVec2::splat(1024),
                near: 1.0,
                far: 10.0,
                focus: 1.0,
            },
            orbit_radius: 2.5,
            orbit_period: 3.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    pub size: f32,
    pub height: f32,
    pub color: Color,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            size: 200.0,
            height: -1.0,
            color: Color::hex(0xbcbcbc),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    pub base_path: String,
    pub files: Vec<String>,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            base_path: "textures/".into(),
            files: vec![
                "disturb.jpg".into(),
                "colors.png".into(),
                "uv_grid_opengl.jpg".into(),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub path: String,
    pub scale: f32,
    pub position: Vec3,
    /// Rotation about +Y, radians.
    pub rotation_y: f32,
    pub color: Color,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            path: "models/Lucy100k.ply".into(),
            scale: 0.0024,
            position: Vec3::new(0.0, 0.8, 0.0),
            rotation_y: -FRAC_PI_2,
            color: Color::WHITE,
            cast_shadow: true,
            receive_shadow: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub aces_tone_mapping: bool,
    pub shadows: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            aces_tone_mapping: true,
            shadows: true,
        }
    }
}
