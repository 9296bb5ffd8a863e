use std::path::Path;

use anyhow::{Context, Result};
use glam::{UVec2, Vec2, Vec3};

/// Linear RGB float image used for environment lighting.
#[derive(Debug, Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    data: Box<[Vec3]>,
}

impl Texture {
    pub fn new(width: u32, height: u32, data: Box<[Vec3]>) -> Self {
        assert_eq!(data.len(), (width * height) as usize);

        Self {
            width,
            height,
            data,
        }
    }

    /// Loads an image file; 8-bit formats are treated as sRGB encoded and linearized.
    pub fn load(path: &Path) -> Result<Self> {
        puffin::profile_function!();

        let image = image::open(path)
            .with_context(|| format!("Failed to load texture {}", path.display()))?;
        let is_linear = matches!(
            image,
            image::DynamicImage::ImageRgb32F(_) | image::DynamicImage::ImageRgba32F(_)
        );

        let image = image.into_rgb32f();
        let (width, height) = image.dimensions();
        let data = image
            .pixels()
            .map(|p| {
                let rgb = Vec3::from(p.0);
                if is_linear {
                    rgb
                } else {
                    srgb_to_linear(rgb)
                }
            })
            .collect();

        Ok(Self::new(width, height, data))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn load_texel(&self, id: UVec2) -> Vec3 {
        self.data[(id.y * self.width + id.x) as usize]
    }

    /// Bilinear lookup, wrapping horizontally and clamping vertically.
    pub fn sample(&self, uv: Vec2) -> Vec3 {
        let x = uv.x * self.width as f32 - 0.5;
        let y = (uv.y * self.height as f32 - 0.5).clamp(0.0, (self.height - 1) as f32);

        let tx = x - x.floor();
        let ty = y.fract();

        let x0 = (x.floor() as i64).rem_euclid(self.width as i64) as u32;
        let x1 = (x0 + 1) % self.width;
        let y0 = y as u32;
        let y1 = (y0 + 1).min(self.height - 1);

        let c00 = self.load_texel(UVec2::new(x0, y0));
        let c10 = self.load_texel(UVec2::new(x1, y0));
        let c01 = self.load_texel(UVec2::new(x0, y1));
        let c11 = self.load_texel(UVec2::new(x1, y1));

        let a = c00.lerp(c10, tx);
        let b = c01.lerp(c11, tx);
        a.lerp(b, ty)
    }
}

fn srgb_to_linear(rgb: Vec3) -> Vec3 {
    let f = |c: f32| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(f(rgb.x), f(rgb.y), f(rgb.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_interpolates_and_wraps() {
        let texture = Texture::new(
            2,
            1,
            vec![Vec3::ZERO, Vec3::ONE].into_boxed_slice(),
        );

        assert_eq!(texture.sample(Vec2::new(0.25, 0.5)), Vec3::ZERO);
        assert_eq!(texture.sample(Vec2::new(0.75, 0.5)), Vec3::ONE);
        assert!(texture
            .sample(Vec2::new(0.5, 0.5))
            .abs_diff_eq(Vec3::splat(0.5), 1e-6));
        // Halfway between the last and the first texel.
        assert!(texture
            .sample(Vec2::new(1.0, 0.5))
            .abs_diff_eq(Vec3::splat(0.5), 1e-6));
    }

    #[test]
    fn load_linearizes_8_bit_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grey.png");
        image::RgbImage::from_pixel(2, 2, image::Rgb([188, 188, 188]))
            .save(&path)
            .unwrap();

        let texture = Texture::load(&path).unwrap();
        assert_eq!(texture.width(), 2);
        assert!((texture.load_texel(UVec2::ZERO).x - 0.5).abs() < 0.01);
    }
}
