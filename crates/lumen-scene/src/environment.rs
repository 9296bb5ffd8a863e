use std::{
    f32::consts::PI,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use glam::{UVec2, Vec2, Vec3};

use crate::Texture;

/// Radiance arriving from infinitely far away, looked up by direction.
#[derive(Debug, Clone)]
pub enum Environment {
    Constant(Vec3),
    /// Equirectangular (latitude-longitude) map.
    Panorama(Texture),
    /// Faces ordered +X, -X, +Y, -Y, +Z, -Z.
    Cubemap(Box<[Texture; 6]>),
}

impl Default for Environment {
    fn default() -> Self {
        Self::Constant(Vec3::ZERO)
    }
}

impl Environment {
    /// Loads either a cubemap descriptor (`.txt`, six face paths one per line, relative to the
    /// descriptor) or a single equirectangular image.
    pub fn load(path: &Path) -> Result<Self> {
        puffin::profile_function!();

        let is_descriptor = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("txt"));

        if !is_descriptor {
            let texture = Texture::load(path)?;
            log::info!(
                "Loaded panorama environment {} ({}x{})",
                path.display(),
                texture.width(),
                texture.height()
            );
            return Ok(Self::Panorama(texture));
        }

        let descriptor = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cubemap descriptor {}", path.display()))?;
        let base = path.parent().unwrap_or(Path::new(""));

        let faces: Vec<PathBuf> = descriptor
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| base.join(line))
            .collect();
        if faces.len() != 6 {
            bail!(
                "Cubemap descriptor {} lists {} faces, expected 6",
                path.display(),
                faces.len()
            );
        }

        let mut textures = Vec::with_capacity(6);
        for face in &faces {
            let texture = Texture::load(face)
                .with_context(|| format!("Failed to load cubemap face of {}", path.display()))?;
            textures.push(texture);
        }

        let textures: Box<[Texture; 6]> = textures
            .into_boxed_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("Cubemap face count mismatch"))?;

        log::info!("Loaded cubemap environment {}", path.display());
        Ok(Self::Cubemap(textures))
    }

    pub fn radiance(&self, direction: Vec3) -> Vec3 {
        match self {
            Self::Constant(radiance) => *radiance,
            Self::Panorama(texture) => texture.sample(direction_to_equirect(direction)),
            Self::Cubemap(faces) => {
                let (face, uv) = direction_to_cube_face(direction);
                let texture = &faces[face];
                let texel = (uv * Vec2::new(texture.width() as f32, texture.height() as f32))
                    .as_uvec2()
                    .min(UVec2::new(texture.width() - 1, texture.height() - 1));
                texture.load_texel(texel)
            }
        }
    }
}

/// `-Z` maps to the horizontal center, `+Y` to the top row.
fn direction_to_equirect(direction: Vec3) -> Vec2 {
    let d = direction.normalize_or_zero();
    Vec2::new(
        0.5 + d.x.atan2(-d.z) / (2.0 * PI),
        d.y.clamp(-1.0, 1.0).acos() / PI,
    )
}

/// Face index and `[0, 1]` face coordinates using the usual OpenGL cubemap layout.
fn direction_to_cube_face(d: Vec3) -> (usize, Vec2) {
    let a = d.abs();
    let (face, sc, tc, ma) = if a.x >= a.y && a.x >= a.z {
        if d.x > 0.0 {
            (0, -d.z, -d.y, a.x)
        } else {
            (1, d.z, -d.y, a.x)
        }
    } else if a.y >= a.z {
        if d.y > 0.0 {
            (2, d.x, d.z, a.y)
        } else {
            (3, d.x, -d.z, a.y)
        }
    } else if d.z > 0.0 {
        (4, d.x, -d.y, a.z)
    } else {
        (5, -d.x, -d.y, a.z)
    };

    if ma == 0.0 {
        return (0, Vec2::splat(0.5));
    }

    (face, (Vec2::new(sc, tc) / ma + 1.0) * 0.5)
}
