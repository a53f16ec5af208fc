//! Perspective camera and orbit controls.
//!
//! The controller rotates the camera around a fixed target. Pointer motion
//! changes the azimuth and the polar angle, the wheel scales the distance.
//! Both are clamped, never wrapped.

use bevy::prelude::Transform;
use bevy_math::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;

/// Keeps the polar angle off the pole so `looking_at` has a usable up axis.
const POLE_EPSILON: f32 = 1e-6;

/// Round-off allowance when deciding whether a camera is already in range.
const RANGE_SLACK: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Vertical field of view, degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Camera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov: config.fov,
            aspect,
            near: config.near,
            far: config.far,
            position: config.position,
            target: config.target,
        }
    }

    pub fn fov_radians(&self) -> f32 {
        self.fov.to_radians()
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Angle between the world up axis and the target-to-camera vector.
    pub fn polar_angle(&self) -> f32 {
        let offset = self.position - self.target;
        let r = offset.length();
        if r == 0.0 {
            return 0.0;
        }
        (offset.y / r).clamp(-1.0, 1.0).acos()
    }

    pub fn view_transform(&self) -> Transform {
        Transform::from_translation(self.position).looking_at(self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_radians(), self.aspect, self.near, self.far)
    }
}

/// Orbit state around the target in spherical coordinates.
#[derive(Clone, Copy, Debug)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius == 0.0 {
            return Self {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitController {
    pub min_distance: f32,
    pub max_distance: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub zoom_base: f32,
}

impl OrbitController {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            max_polar_angle: config.max_polar_angle,
            rotate_speed: config.rotate_speed,
            zoom_base: config.zoom_base,
        }
    }

    /// Apply one batch of pointer (pixels) and wheel (lines) input.
    ///
    /// Returns whether the camera moved. Non-finite deltas are dropped.
    pub fn update(&self, camera: &mut Camera, pointer_delta: Vec2, wheel_delta: f32) -> bool {
        let pointer = if pointer_delta.is_finite() {
            pointer_delta
        } else {
            Vec2::ZERO
        };
        let wheel = if wheel_delta.is_finite() {
            wheel_delta
        } else {
            0.0
        };

        let mut s = Spherical::from_offset(camera.position - camera.target);

        let in_range = self.distance_in_range(s.radius) && self.polar_in_range(s.phi);
        if pointer == Vec2::ZERO && wheel == 0.0 && in_range {
            return false;
        }

        s.theta -= pointer.x * self.rotate_speed;
        s.phi -= pointer.y * self.rotate_speed;
        if wheel != 0.0 {
            s.radius *= self.zoom_base.powf(wheel);
        }

        s.phi = s.phi.clamp(POLE_EPSILON, self.max_polar_angle.max(POLE_EPSILON));
        s.radius = clamp_radius(s.radius, self.min_distance, self.max_distance);

        camera.position = camera.target + s.to_offset();
        true
    }

    /// Pull the camera back inside the distance and angle limits.
    pub fn clamp(&self, camera: &mut Camera) -> bool {
        self.update(camera, Vec2::ZERO, 0.0)
    }

    fn distance_in_range(&self, r: f32) -> bool {
        r >= self.min_distance * (1.0 - RANGE_SLACK) && r <= self.max_distance * (1.0 + RANGE_SLACK)
    }

    fn polar_in_range(&self, phi: f32) -> bool {
        phi >= 0.0 && phi <= self.max_polar_angle + RANGE_SLACK
    }
}

/// `f32::clamp` that maps NaN onto the lower bound and infinities onto the
/// nearest bound.
fn clamp_radius(r: f32, min: f32, max: f32) -> f32 {
    if r.is_nan() { min } else { r.clamp(min, max) }
}
