//! Per-frame driver.
//!
//! One tick merges finished loads, moves the spot light along its orbit and
//! draws the scene exactly once. Animation depends only on elapsed wall-clock
//! time, so slow frames are not caught up and jitter needs no interpolation.

use bevy::log::{debug, info};
use bevy_math::Vec3;
use error_stack::Report;
use std::time::Duration;

use crate::camera::Camera;
use crate::config::SpotConfig;
use crate::context::SceneContext;
use crate::scene::SceneGraph;
use crate::{Result, SceneError};

/// The graphics backend's draw call.
pub trait DrawPrimitive {
    fn render(&mut self, scene: &SceneGraph, camera: &Camera);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Running,
    Stopped,
}

/// Circular path of the animated spot light around the Y axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightOrbit {
    pub radius: f32,
    /// Seconds per radian of orbit angle.
    pub period: f64,
}

impl LightOrbit {
    pub fn from_config(config: &SpotConfig) -> Self {
        Self {
            radius: config.orbit_radius,
            period: config.orbit_period,
        }
    }

    /// Orbit angle: elapsed milliseconds / 1000 / period.
    pub fn phase(&self, elapsed: Duration) -> f64 {
        elapsed.as_secs_f64() / self.period
    }

    /// New position for a light currently at `current`; only x and z move.
    pub fn position(&self, elapsed: Duration, current: Vec3) -> Vec3 {
        let t = self.phase(elapsed);
        Vec3::new(
            (t.cos() * self.radius as f64) as f32,
            current.y,
            (t.sin() * self.radius as f64) as f32,
        )
    }
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    orbit: LightOrbit,
    frames: u64,
}

impl RenderLoop {
    pub fn new(orbit: LightOrbit) -> Self {
        Self {
            state: LoopState::Uninitialized,
            orbit,
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Enter `Running`. Starting a stopped loop is a no-op: a stopped loop
    /// never runs again, a remount builds a new one. The context proves the surface, camera and scene
    /// exist; asset-backed nodes may still be missing.
    pub fn start(&mut self, ctx: &SceneContext) -> Result<()> {
        match self.state {
            LoopState::Running => return Ok(()),
            LoopState::Stopped => {
                debug!("render loop is stopped; start ignored");
                return Ok(());
            }
            LoopState::Uninitialized => {}
        }
        let size = ctx.surface_size();
        if size.x == 0 || size.y == 0 {
            return Err(Report::new(SceneError::SurfaceInit)
                .attach(format!("surface is {}x{} physical pixels", size.x, size.y)));
        }
        self.state = LoopState::Running;
        info!("render loop running");
        Ok(())
    }

    /// Run one frame. Returns `false` without touching anything unless the
    /// loop is running.
    pub fn tick<D: DrawPrimitive>(
        &mut self,
        ctx: &mut SceneContext,
        elapsed: Duration,
        draw: &mut D,
    ) -> bool {
        if self.state != LoopState::Running {
            return false;
        }

        let merged = ctx.apply_deliveries();
        if merged > 0 {
            debug!("frame {}: merged {} asset deliveries", self.frames, merged);
        }

        let orbit = self.orbit;
        if let Some(spot) = ctx.graph_mut().spot_mut() {
            spot.position = orbit.position(elapsed, spot.position);
        }

        draw.render(ctx.graph(), ctx.camera());
        self.frames += 1;
        true
    }

    pub fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            info!("render loop stopped after {} frames", self.frames);
        }
        self.state = LoopState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Delivery, MeshSettings};
    use crate::config::SceneConfig;
    use crate::context::SurfaceInfo;
    use crate::core::NodeId;
    use crate::geometry::MeshData;
    use std::sync::Arc;

    /// Records what each draw saw.
    #[derive(Default)]
    struct Recorder {
        frames: Vec<Vec<NodeId>>,
        spots: Vec<Vec3>,
    }

    impl DrawPrimitive for Recorder {
        fn render(&mut self, scene: &SceneGraph, _camera: &Camera) {
            self.frames.push(scene.renderables().map(|n| n.id).collect());
            self.spots.extend(scene.spot().map(|s| s.position));
        }
    }

    fn mounted() -> (SceneContext, RenderLoop) {
        let config = SceneConfig::default();
        let ctx = SceneContext::mount(
            &config,
            SurfaceInfo {
                width: 800,
                height: 600,
                pixel_ratio: 1.0,
            },
        )
        .unwrap();
        let mut render_loop = RenderLoop::new(LightOrbit::from_config(&config.spot));
        render_loop.start(&ctx).unwrap();
        (ctx, render_loop)
    }

    #[test]
    fn uninitialized_loop_does_not_draw() {
        let (mut ctx, _) = mounted();
        let mut fresh = RenderLoop::new(LightOrbit {
            radius: 2.5,
            period: 3.0,
        });
        let mut rec = Recorder::default();
        assert!(!fresh.tick(&mut ctx, Duration::ZERO, &mut rec));
        assert!(rec.frames.is_empty());
        assert_eq!(fresh.state(), LoopState::Uninitialized);
    }

    #[test]
    fn each_tick_draws_exactly_once() {
        let (mut ctx, mut rl) = mounted();
        let mut rec = Recorder::default();
        for ms in [0u64, 16, 33, 50] {
            assert!(rl.tick(&mut ctx, Duration::from_millis(ms), &mut rec));
        }
        assert_eq!(rec.frames.len(), 4);
        assert_eq!(rl.frames(), 4);
    }

    #[test]
    fn spot_stays_on_its_circle_at_constant_height() {
        let (mut ctx, mut rl) = mounted();
        let mut rec = Recorder::default();
        for ms in (0..20_000u64).step_by(137) {
            rl.tick(&mut ctx, Duration::from_millis(ms), &mut rec);
        }
        for p in &rec.spots {
            assert!(((p.x * p.x + p.z * p.z) - 2.5 * 2.5).abs() < 1e-4);
            assert_eq!(p.y, 5.0);
        }
    }

    #[test]
    fn one_period_unit_is_one_radian() {
        let (mut ctx, mut rl) = mounted();
        let mut rec = Recorder::default();
        rl.tick(&mut ctx, Duration::from_millis(3000), &mut rec);
        let p = rec.spots[0];
        assert!((p.x - 1.0f32.cos() * 2.5).abs() < 1e-5);
        assert!((p.z - 1.0f32.sin() * 2.5).abs() < 1e-5);
    }

    #[test]
    fn mesh_posted_between_ticks_appears_on_the_next_one_only_once() {
        let (mut ctx, mut rl) = mounted();
        let mut rec = Recorder::default();
        rl.tick(&mut ctx, Duration::from_millis(0), &mut rec);

        let settings = MeshSettings::from_config(&SceneConfig::default().mesh);
        let node = settings.node("lucy", Arc::new(MeshData::plane(1.0, 1.0)));
        let id = node.id;
        // Tick N happened before the post, N+1 after it.
        assert!(ctx.sender().send(Delivery::Node(node)));

        rl.tick(&mut ctx, Duration::from_millis(16), &mut rec);
        rl.tick(&mut ctx, Duration::from_millis(33), &mut rec);

        assert!(!rec.frames[0].contains(&id));
        assert_eq!(rec.frames[1].iter().filter(|n| **n == id).count(), 1);
        assert_eq!(rec.frames[2].iter().filter(|n| **n == id).count(), 1);
    }

    #[test]
    fn stopped_loop_stays_stopped() {
        let (mut ctx, mut rl) = mounted();
        rl.stop();
        let mut rec = Recorder::default();
        assert!(!rl.tick(&mut ctx, Duration::from_millis(16), &mut rec));
        assert!(rl.start(&ctx).is_ok());
        assert_eq!(rl.state(), LoopState::Stopped);
        assert!(!rl.tick(&mut ctx, Duration::from_millis(33), &mut rec));
        assert!(rec.frames.is_empty());
    }
}
