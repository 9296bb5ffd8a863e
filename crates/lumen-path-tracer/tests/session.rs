mod common;

use glam::{UVec2, Vec3};
use lumen_input::InputEvent;
use lumen_path_tracer::{RenderSession, RendererConfig};

fn session(screenshot_dir: &std::path::Path, config: RendererConfig) -> RenderSession {
    let renderer = common::renderer(common::lit_room(), UVec2::new(8, 8), config);
    RenderSession::new(common::camera(), renderer, screenshot_dir.to_owned())
}

fn png_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .filter(|name| name.ends_with(".png"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn frames_accumulate_until_invalidated() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path(), RendererConfig::default());
    let mut presenter = common::CapturePresenter::default();

    for _ in 0..3 {
        session.frame(&mut presenter).unwrap();
    }
    assert_eq!(session.renderer().sample_count(), 3);
    assert_eq!(presenter.frames.len(), 3);
    assert_eq!(session.renderer().random_epoch(), 0);
}

#[test]
fn invalidating_events_collapse_into_one_reset() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path(), RendererConfig::default());
    let mut presenter = common::CapturePresenter::default();
    session.frame(&mut presenter).unwrap();
    session.frame(&mut presenter).unwrap();

    let events = session.events();
    events.push(InputEvent::MoveCamera(0.25));
    events.push(InputEvent::RotateCamera(Vec3::new(0.1, 0.0, 0.0)));
    events.push(InputEvent::ResetSamples);
    session.frame(&mut presenter).unwrap();

    assert_eq!(session.renderer().random_epoch(), 1);
    assert_eq!(session.renderer().sample_count(), 1);
    assert!(!session.reset_pending());
    assert!(!session.camera().is_image_plane_stale());
    assert!(session
        .camera()
        .position()
        .abs_diff_eq(Vec3::new(0.0, 0.0, -0.25), 1e-5));
}

#[test]
fn resize_event_reallocates_and_presents_new_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path(), RendererConfig::default());
    let mut presenter = common::CapturePresenter::default();
    session.frame(&mut presenter).unwrap();

    session.events().push(InputEvent::Resize(UVec2::new(12, 6)));
    let stats = session.frame(&mut presenter).unwrap();

    assert_eq!(stats.completed_paths, 72);
    assert_eq!(presenter.frames.last(), Some(&UVec2::new(12, 6)));
    assert_eq!(session.camera().aspect_ratio(), 2.0);
    assert_eq!(session.renderer().sample_count(), 1);
}

#[test]
fn resize_to_current_size_keeps_accumulating() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path(), RendererConfig::default());
    let mut presenter = common::CapturePresenter::default();
    session.frame(&mut presenter).unwrap();
    session.frame(&mut presenter).unwrap();

    session.events().push(InputEvent::Resize(UVec2::new(8, 8)));
    session.frame(&mut presenter).unwrap();

    assert_eq!(session.renderer().sample_count(), 3);
    assert_eq!(session.renderer().random_epoch(), 0);
}

#[test]
fn set_camera_position_restarts_accumulation() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path(), RendererConfig::default());
    let mut presenter = common::CapturePresenter::default();
    session.frame(&mut presenter).unwrap();
    session.frame(&mut presenter).unwrap();

    let position = Vec3::new(0.5, 0.25, 1.0);
    session.events().push(InputEvent::SetCameraPosition(position));
    session.frame(&mut presenter).unwrap();

    assert_eq!(session.camera().position(), position);
    assert!(!session.camera().is_image_plane_stale());
    assert_eq!(session.renderer().sample_count(), 1);
    assert_eq!(session.renderer().random_epoch(), 1);
}

#[test]
fn invalid_resize_keeps_rendering_at_previous_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path(), RendererConfig::default());
    let mut presenter = common::CapturePresenter::default();
    session.frame(&mut presenter).unwrap();

    session.events().push(InputEvent::Resize(UVec2::new(0, 6)));
    session.frame(&mut presenter).unwrap();

    assert_eq!(session.renderer().resolution(), UVec2::new(8, 8));
    assert_eq!(session.renderer().sample_count(), 2);
    assert_eq!(presenter.frames.last(), Some(&UVec2::new(8, 8)));
}

#[test]
fn screenshot_event_saves_after_presenting() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path(), RendererConfig::default());
    let mut presenter = common::CapturePresenter::default();

    session.events().push(InputEvent::Screenshot);
    session.frame(&mut presenter).unwrap();

    let files = png_files(dir.path());
    assert_eq!(files.len(), 1);
    assert!(!files[0].starts_with("reference-"));
    assert_eq!(session.renderer().sample_count(), 1);
}

#[test]
fn failed_screenshot_does_not_interrupt_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, b"").unwrap();

    let mut session = session(&blocker, RendererConfig::default());
    let mut presenter = common::CapturePresenter::default();
    session.frame(&mut presenter).unwrap();

    session.events().push(InputEvent::Screenshot);
    assert!(session.frame(&mut presenter).is_ok());
    assert!(session.frame(&mut presenter).is_ok());

    assert_eq!(session.renderer().sample_count(), 3);
    assert_eq!(presenter.frames.len(), 3);
    assert!(blocker.is_file());
}

#[test]
fn reference_event_converges_and_saves() {
    let dir = tempfile::tempdir().unwrap();
    let config = RendererConfig {
        reference_samples: 6,
        ..Default::default()
    };
    let mut session = session(dir.path(), config);
    let mut presenter = common::CapturePresenter::default();

    session.events().push(InputEvent::RenderReference);
    session.frame(&mut presenter).unwrap();

    assert_eq!(session.renderer().sample_count(), 6);
    assert_eq!(presenter.frames.len(), 2);
    let files = png_files(dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("reference-"));
}

#[test]
fn quit_event_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path(), RendererConfig::default());
    let mut presenter = common::CapturePresenter::default();

    session.events().push(InputEvent::Quit);
    session.frame(&mut presenter).unwrap();

    assert!(session.quit_requested());
}
