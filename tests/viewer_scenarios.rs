// viewer_scenarios.rs — 通过公开的 Viewer 接口驱动完整的交互场景

use glam::Vec2;
use pano360::config::FovConfig;
use pano360::projection::{central_point, project_screen_to_sphere};
use pano360::{ManualClock, ProjectionMode, Viewer, ViewerConfig};

const FRAME: f32 = 1.0 / 60.0;

fn viewer_with(config: ViewerConfig) -> (Viewer<ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    (Viewer::with_clock(config, clock.clone()), clock)
}

/// 初始 state.fov = 100 且 target.fov = 100 的配置
fn hundred_degree_config() -> ViewerConfig {
    let mut config = ViewerConfig::default();
    config.fov_stereographic.init_target = 100.0;
    config.fov_gnomonic.init_target = 100.0;
    config
}

#[test]
fn wheel_then_switch_to_gnomonic() {
    let (mut viewer, _clock) = viewer_with(hundred_degree_config());
    assert_eq!(viewer.projection_mode(), ProjectionMode::Stereographic);
    assert_eq!(viewer.state().longitude, 90.0);
    assert_eq!(viewer.state().latitude, 0.0);
    assert_eq!(viewer.state().field_of_view, 100.0);

    assert!(viewer.on_wheel(-100.0, true));
    assert!((viewer.target().field_of_view - 95.0).abs() < 1e-4);

    viewer.set_projection_mode(ProjectionMode::Gnomonic);
    assert!((viewer.target().field_of_view - 95.0).abs() < 1e-4);
    assert!(viewer.state().field_of_view <= 130.0);
    assert_eq!(viewer.get_frame_uniforms().projection_mode, ProjectionMode::Gnomonic);
}

#[test]
fn pointer_drag_sets_target_longitude() {
    let (mut viewer, _clock) = viewer_with(ViewerConfig::default());
    viewer.on_pointer_down(500.0, 500.0);
    viewer.on_pointer_move(400.0, 500.0);
    assert!((viewer.target().longitude - 100.0).abs() < 1e-4);
    viewer.on_pointer_up();
    assert!(!viewer.is_user_interacting());
}

#[test]
fn pinch_in_and_out_has_no_drift() {
    let (mut viewer, clock) = viewer_with(ViewerConfig::default());
    let before = viewer.state().field_of_view;
    let fingers = |d: f32| [Vec2::new(200.0, 300.0), Vec2::new(200.0 + d, 300.0)];

    viewer.on_touch_start(&fingers(100.0));
    for d in [90.0, 80.0, 90.0, 100.0] {
        viewer.on_touch_move(&fingers(d));
        clock.advance_secs(FRAME);
        viewer.tick().unwrap();
    }
    viewer.on_touch_end(&[]);

    assert!((viewer.state().field_of_view - before).abs() < 1e-3);
    assert_eq!(viewer.state().field_of_view, viewer.target().field_of_view);
}

#[test]
fn zero_delta_frame_stays_finite() {
    let (mut viewer, _clock) = viewer_with(ViewerConfig::default());
    viewer.on_pointer_down(0.0, 0.0);
    viewer.on_pointer_move(-5000.0, 3000.0);
    viewer.on_wheel(1.0, true);

    // 时钟没动：dt = 0
    let uniforms = viewer.tick().unwrap();
    assert!(uniforms.lon_radians.is_finite());
    assert!(uniforms.lat_radians.is_finite());
    assert!(uniforms.fov_degrees.is_finite());

    for _ in 0..5 {
        let u = viewer.tick_with(FRAME).unwrap();
        assert!(u.lon_radians.is_finite() && u.lat_radians.is_finite() && u.fov_degrees.is_finite());
    }
}

#[test]
fn smoothing_reaches_target() {
    let mut config = ViewerConfig::default();
    config.view_rotation.smoothness_constant = 200.0;
    config.zoom.smoothing_constant = 200.0;
    let (mut viewer, clock) = viewer_with(config);

    viewer.on_pointer_down(0.0, 0.0);
    viewer.on_pointer_move(-200.0, 150.0);
    viewer.on_pointer_up();
    let target = *viewer.target();

    let mut prev = *viewer.state();
    for _ in 0..500 {
        clock.advance_secs(FRAME);
        viewer.tick().unwrap();
        let s = *viewer.state();
        assert!((target.longitude - s.longitude).abs() <= (target.longitude - prev.longitude).abs() + 1e-5);
        assert!((target.latitude - s.latitude).abs() <= (target.latitude - prev.latitude).abs() + 1e-5);
        prev = s;
    }
    assert!((prev.longitude - target.longitude).abs() < 0.01);
    assert!((prev.latitude - target.latitude).abs() < 0.01);
    assert!((prev.field_of_view - target.field_of_view).abs() < 0.01);
}

#[test]
fn hidden_viewer_does_not_accumulate_delta() {
    let (mut viewer, clock) = viewer_with(ViewerConfig::default());
    viewer.on_key_down("ArrowLeft");

    viewer.on_visibility_change(false);
    clock.advance_secs(60.0);
    assert!(viewer.tick().is_none());

    viewer.on_visibility_change(true);
    clock.advance_secs(0.020);
    viewer.tick().unwrap();
    // 只走了一个 16ms 的连发 tick
    assert!((viewer.target().longitude - 88.0).abs() < 1e-4);
}

#[test]
fn render_before_bind_is_blank() {
    let (viewer, _clock) = viewer_with(ViewerConfig::default());
    let frame = viewer.render_cpu(8, 6);
    assert_eq!(frame.dimensions(), (8, 6));
    assert!(frame.pixels().all(|p| p.0 == [0, 0, 0, 255]));
}

#[test]
fn destroy_turns_everything_into_noops() {
    let (mut viewer, clock) = viewer_with(ViewerConfig::default());
    viewer.bind_panorama(image::RgbaImage::new(16, 8));
    viewer.on_key_down("ArrowUp");
    viewer.destroy();

    assert!(viewer.is_destroyed());
    assert!(viewer.panorama().is_none());
    let before = *viewer.target();
    viewer.on_pointer_down(0.0, 0.0);
    viewer.on_pointer_move(100.0, 100.0);
    assert!(!viewer.on_wheel(-1.0, true));
    clock.advance_secs(1.0);
    assert!(viewer.tick().is_none());
    assert_eq!(*viewer.target(), before);
    assert!(!viewer.is_user_interacting());
}

#[test]
fn fov_clamp_is_idempotent() {
    for fov in [FovConfig::GNOMONIC, FovConfig::STEREOGRAPHIC] {
        for x in [-1000.0f32, 0.0, 44.9, 45.0, 60.0, 129.0, 131.0, 330.0, 1e9] {
            let once = fov.clamp(x);
            assert_eq!(fov.clamp(once), once);
        }
    }
}

#[test]
fn screen_center_maps_to_view_center() {
    let (mut viewer, clock) = viewer_with(ViewerConfig::default());
    viewer.on_resize(16.0 / 9.0);
    viewer.on_pointer_down(0.0, 0.0);
    viewer.on_pointer_move(-400.0, 200.0);
    viewer.on_pointer_up();
    for _ in 0..30 {
        clock.advance_secs(FRAME);
        viewer.tick().unwrap();
    }

    let u = viewer.get_frame_uniforms();
    let cp = central_point(u.lon_radians, u.lat_radians);
    let sphere = project_screen_to_sphere(
        Vec2::splat(0.5),
        cp,
        u.fov_degrees.to_radians(),
        u.aspect,
        u.projection_mode,
    );
    let dx = (sphere.x - cp.x).abs();
    assert!(dx.min(1.0 - dx) < 1e-4);
    assert!((sphere.y - cp.y).abs() < 1e-4);
}
