use spotlight_stage::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Frames {
    nodes: Vec<Vec<String>>,
    spot: Option<bevy_math::Vec3>,
    aspect: Option<f32>,
}

impl DrawPrimitive for Frames {
    fn render(&mut self, scene: &SceneGraph, camera: &Camera) {
        self.nodes
            .push(scene.renderables().map(|n| n.name.clone()).collect());
        self.spot = scene.spot().map(|s| s.position);
        self.aspect = Some(camera.aspect);
    }
}

fn mount(width: u32, height: u32) -> (SceneContext, RenderLoop) {
    let config = SceneConfig::default();
    let ctx = SceneContext::mount(
        &config,
        SurfaceInfo {
            width,
            height,
            pixel_ratio: 1.0,
        },
    )
    .expect("mount");
    let mut render_loop = RenderLoop::new(LightOrbit::from_config(&config.spot));
    render_loop.start(&ctx).expect("start");
    (ctx, render_loop)
}

#[test]
fn resize_then_tick_moves_light_and_camera_aspect() {
    let (mut ctx, mut rl) = mount(800, 600);
    assert_eq!(ctx.resize(1600, 900), Resize::Applied);

    let mut frames = Frames::default();
    assert!(rl.tick(&mut ctx, Duration::from_millis(3000), &mut frames));

    assert!((frames.aspect.unwrap() - 1.7778).abs() < 1e-3);
    let spot = frames.spot.unwrap();
    assert!((spot.x - 1.351).abs() < 1e-3);
    assert!((spot.z - 2.104).abs() < 1e-3);
    assert_eq!(spot.y, 5.0);
}

#[test]
fn degenerate_resize_keeps_previous_aspect() {
    let (mut ctx, _) = mount(800, 600);
    assert_eq!(ctx.resize(0, 600), Resize::Ignored);
    assert_eq!(ctx.camera().aspect, 800.0 / 600.0);
}

#[test]
fn failed_mesh_leaves_the_rest_of_the_scene() {
    let (mut ctx, mut rl) = mount(800, 600);
    ctx.sender().send(Delivery::Failed {
        path: "models/Lucy100k.ply".into(),
        error: SceneError::AssetNotFound,
    });

    let mut frames = Frames::default();
    rl.tick(&mut ctx, Duration::from_millis(16), &mut frames);
    rl.tick(&mut ctx, Duration::from_millis(33), &mut frames);

    assert_eq!(frames.nodes.last().unwrap(), &vec![GROUND_NODE.to_string()]);
    assert_eq!(ctx.graph().light_count(), 2);
    assert!(ctx.graph().spot().is_some());
    assert_eq!(ctx.failed_assets().len(), 1);
}

#[test]
fn parsed_mesh_joins_the_scene_scaled_and_lit() {
    let ply = b"ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n1000 0 0\n0 1000 0\n3 0 1 2\n";
    let settings = MeshSettings::from_config(&SceneConfig::default().mesh);
    let mesh = settings.normalize(spotlight_stage::ply::parse(ply).expect("parse"));
    assert!((mesh.positions[1][0] - 2.4).abs() < 1e-4);
    assert_eq!(mesh.normals.len(), 3);

    let (mut ctx, mut rl) = mount(800, 600);
    let mut frames = Frames::default();
    rl.tick(&mut ctx, Duration::ZERO, &mut frames);
    ctx.sender()
        .send(Delivery::Node(settings.node("lucy", Arc::new(mesh))));
    rl.tick(&mut ctx, Duration::from_millis(16), &mut frames);

    assert!(!frames.nodes[0].contains(&"lucy".to_string()));
    assert!(frames.nodes[1].contains(&"lucy".to_string()));
    let lucy = ctx.graph().node_named("lucy").unwrap();
    assert!(lucy.cast_shadow && lucy.receive_shadow);
    assert!((lucy.transform.translation.y - 0.8).abs() < 1e-6);
}

#[test]
fn late_delivery_after_teardown_is_discarded() {
    let (ctx, mut rl) = mount(800, 600);
    let tx = ctx.sender();
    rl.stop();
    ctx.teardown();
    assert!(!tx.is_connected());
    assert!(!tx.send(Delivery::Texture(texture_record("disturb.jpg", 4, 4))));
}
