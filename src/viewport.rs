//! Output surface size and the camera aspect ratio that follows it.

use bevy_math::UVec2;

use crate::camera::Camera;

/// Logical size plus pixel density of the drawable surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Backing-store size in physical pixels.
    pub fn physical_size(&self) -> UVec2 {
        UVec2::new(
            (self.width as f32 * self.pixel_ratio).round() as u32,
            (self.height as f32 * self.pixel_ratio).round() as u32,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resize {
    Applied,
    /// Same dimensions as before; nothing changed.
    Unchanged,
    /// A zero dimension; ignored so the aspect never becomes 0, NaN or inf.
    Ignored,
}

#[derive(Clone, Debug)]
pub struct ViewportManager {
    viewport: Viewport,
    surface: UVec2,
}

impl ViewportManager {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            surface: viewport.physical_size(),
            viewport,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn surface_size(&self) -> UVec2 {
        self.surface
    }

    /// Apply a resize from the host. Every call takes effect immediately; the
    /// caller guarantees it lands between two ticks.
    pub fn on_resize(&mut self, camera: &mut Camera, width: u32, height: u32) -> Resize {
        if width == 0 || height == 0 {
            return Resize::Ignored;
        }
        if width == self.viewport.width && height == self.viewport.height {
            return Resize::Unchanged;
        }
        self.viewport.width = width;
        self.viewport.height = height;
        camera.aspect = self.viewport.aspect();
        self.surface = self.viewport.physical_size();
        Resize::Applied
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) -> bool {
        if !(pixel_ratio.is_finite() && pixel_ratio > 0.0) || pixel_ratio == self.viewport.pixel_ratio {
            return false;
        }
        self.viewport.pixel_ratio = pixel_ratio;
        self.surface = self.viewport.physical_size();
        true
    }
}
