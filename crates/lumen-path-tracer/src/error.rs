use std::path::PathBuf;

use glam::UVec2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Not enough memory for wavefront resources at {}x{}", .resolution.x, .resolution.y)]
    ResourceExhausted { resolution: UVec2 },
    #[error("Invalid output resolution {}x{}", .0.x, .0.y)]
    InvalidResolution(UVec2),
    #[error("Camera image plane is stale, regenerate it before rendering")]
    StaleImagePlane,
    #[error("Failed to save screenshot to {}", .path.display())]
    Screenshot {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to present frame: {0:#}")]
    Present(anyhow::Error),
}
