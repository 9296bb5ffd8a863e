use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use lumen_camera::Camera;
use lumen_input::{EventQueue, InputEvent};
use lumen_time::Timer;

use crate::{
    error::RenderError,
    presenter::Presenter,
    renderer::{ReferenceStats, Renderer},
    wavefront::FrameStats,
};

/// Explicit render-session context: the camera, the renderer and the input queue that mutates
/// them, driven one frame at a time by the control thread.
pub struct RenderSession {
    camera: Camera,
    renderer: Renderer,
    events: EventQueue,
    screenshot_dir: PathBuf,

    /// Set by invalidating events, cleared right after the reset is applied.
    reset_pending: bool,
    screenshot_requested: bool,
    reference_requested: bool,
    quit_requested: bool,
    frame_timer: Timer,
}

impl RenderSession {
    pub fn new(mut camera: Camera, renderer: Renderer, screenshot_dir: PathBuf) -> Self {
        let resolution = renderer.resolution().as_vec2();
        camera.set_aspect_ratio(resolution.x / resolution.y);
        camera.take_moved();

        Self {
            camera,
            renderer,
            events: EventQueue::new(),
            screenshot_dir,
            reset_pending: false,
            screenshot_requested: false,
            reference_requested: false,
            quit_requested: false,
            frame_timer: Timer::new(),
        }
    }

    /// Producer handle for input handling.
    pub fn events(&self) -> EventQueue {
        self.events.clone()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Drains queued input, applies at most one reset, renders and presents one sample, then
    /// serves deferred screenshot and reference requests.
    pub fn frame(&mut self, presenter: &mut dyn Presenter) -> Result<FrameStats, RenderError> {
        puffin::profile_function!();

        self.process_events();

        if self.camera.take_moved() {
            self.reset_pending = true;
        }
        if self.reset_pending {
            self.renderer.reset_samples();
            self.reset_pending = false;
        }

        if self.camera.is_image_plane_stale() {
            self.camera.generate_image_plane();
        }

        let stats = self.renderer.render_frame(&self.camera)?;
        self.renderer.present(presenter)?;

        if std::mem::take(&mut self.reference_requested) {
            match self.render_reference() {
                Ok(_) => self.renderer.present(presenter)?,
                Err(err @ RenderError::Screenshot { .. }) => {
                    log::error!("{:#}", anyhow::Error::new(err))
                }
                Err(err) => return Err(err),
            }
        }

        if std::mem::take(&mut self.screenshot_requested) {
            if let Err(err) = self.save_screenshot() {
                log::error!("{:#}", anyhow::Error::new(err));
            }
        }

        log::debug!("Frame time {:.2}ms", self.frame_timer.lap() * 1000.0);
        Ok(stats)
    }

    fn process_events(&mut self) {
        for event in self.events.drain() {
            match event {
                InputEvent::MoveCamera(distance) => self.camera.move_forward(distance),
                InputEvent::RotateCamera(delta) => self.camera.add_rotation(delta),
                InputEvent::SetCameraPosition(position) => self.camera.set_position(position),
                InputEvent::ResetSamples => self.reset_pending = true,
                InputEvent::Resize(resolution) => match self.renderer.resize(resolution) {
                    Ok(false) => {}
                    Ok(true) => {
                        let resolution = self.renderer.resolution().as_vec2();
                        self.camera.set_aspect_ratio(resolution.x / resolution.y);
                        self.reset_pending = true;
                    }
                    Err(err) => log::error!(
                        "Keeping {}x{}: {}",
                        self.renderer.resolution().x,
                        self.renderer.resolution().y,
                        err
                    ),
                },
                InputEvent::Screenshot => self.screenshot_requested = true,
                InputEvent::RenderReference => self.reference_requested = true,
                InputEvent::Quit => self.quit_requested = true,
            }
        }
    }

    /// Saves the current estimate as `<screenshot_dir>/<unix-seconds>.png`.
    pub fn save_screenshot(&mut self) -> Result<PathBuf, RenderError> {
        let path = self
            .screenshot_dir
            .join(format!("{}.png", unix_timestamp()));
        self.renderer.save_screenshot(&path)?;
        Ok(path)
    }

    /// Converges a reference image and saves it as
    /// `<screenshot_dir>/reference-<unix-seconds>.png`.
    pub fn render_reference(&mut self) -> Result<(ReferenceStats, PathBuf), RenderError> {
        if self.camera.is_image_plane_stale() {
            self.camera.generate_image_plane();
        }

        let stats = self.renderer.render_reference(&self.camera)?;
        let path = self
            .screenshot_dir
            .join(format!("reference-{}.png", unix_timestamp()));
        self.renderer.save_screenshot(&path)?;

        Ok((stats, path))
    }

    pub fn clean_up(self) {
        self.renderer.clean_up();
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}
