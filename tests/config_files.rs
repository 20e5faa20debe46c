// config_files.rs — 配置文件与偏好文件落盘后的端到端行为

use std::io::Write;

use pano360::{ManualClock, Preferences, ProjectionMode, Viewer, ViewerConfig};

#[test]
fn legacy_config_file_drives_initial_view() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "fov_gnomonic": {{ "min": 30, "max": 110, "init": 90, "initTarget": 70 }},
            "zoom": {{ "increment": 4, "smoothing": 1000 }},
            "viewRotation": {{ "initAzimuth": 180, "initAltitude": 10, "smoothness": 500 }},
            "projection": "gnomonic"
        }}"#
    )
    .unwrap();

    let config = ViewerConfig::load_or_default(file.path());
    assert_eq!(config.zoom.increment_per_tick, 4.0);
    assert_eq!(config.view_rotation.smoothness_constant, 500.0);

    let viewer = Viewer::with_clock(config, ManualClock::new());
    assert_eq!(viewer.projection_mode(), ProjectionMode::Gnomonic);
    assert_eq!(viewer.state().longitude, 180.0);
    assert_eq!(viewer.state().latitude, 10.0);
    assert_eq!(viewer.state().field_of_view, 90.0);
    assert_eq!(viewer.target().field_of_view, 70.0);
}

#[test]
fn broken_config_file_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    assert_eq!(ViewerConfig::load_or_default(file.path()), ViewerConfig::default());

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert_eq!(ViewerConfig::load_or_default(&missing), ViewerConfig::default());
}

#[test]
fn toggled_projection_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let prefs_path = dir.path().join("pano360-preferences.json");

    let mut first = Viewer::with_clock(ViewerConfig::default(), ManualClock::new())
        .with_preferences(Preferences::new(&prefs_path));
    assert_eq!(first.projection_mode(), ProjectionMode::Stereographic);
    first.toggle_projection_mode();
    first.destroy();

    let second = Viewer::with_clock(ViewerConfig::default(), ManualClock::new())
        .with_preferences(Preferences::new(&prefs_path));
    assert_eq!(second.projection_mode(), ProjectionMode::Gnomonic);
}

#[test]
fn invalid_fov_bounds_built_in_code_are_not_fatal() {
    let mut config = ViewerConfig::default();
    config.fov_stereographic.max = f32::NAN;
    let clock = ManualClock::new();
    let mut viewer = Viewer::with_clock(config, clock.clone());
    assert_eq!(viewer.config().fov_stereographic.max, 330.0);
    assert_eq!(viewer.state().field_of_view, 100.0);

    let mut swapped = ViewerConfig::default();
    swapped.fov_stereographic.min = 200.0;
    swapped.fov_stereographic.max = 100.0;
    viewer.configure(swapped);
    assert!(viewer.on_wheel(1.0, true));
    clock.advance_secs(1.0 / 60.0);
    let uniforms = viewer.tick().unwrap();
    assert!(uniforms.fov_degrees >= 100.0 && uniforms.fov_degrees <= 200.0);
}
