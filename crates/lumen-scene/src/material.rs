use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialKind {
    /// Lambertian reflection.
    #[default]
    Diffuse,
    /// Perfect specular reflection.
    Mirror,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub albedo: Vec3,
    pub emission: Vec3,
    pub kind: MaterialKind,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vec3::splat(0.8),
            emission: Vec3::ZERO,
            kind: MaterialKind::Diffuse,
        }
    }
}

impl Material {
    pub fn diffuse(albedo: Vec3) -> Self {
        Self {
            albedo,
            ..Default::default()
        }
    }

    pub fn mirror(albedo: Vec3) -> Self {
        Self {
            albedo,
            kind: MaterialKind::Mirror,
            ..Default::default()
        }
    }

    pub fn emissive(emission: Vec3) -> Self {
        Self {
            albedo: Vec3::ZERO,
            emission,
            kind: MaterialKind::Diffuse,
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emission.max_element() > 0.0
    }

    pub fn is_specular(&self) -> bool {
        self.kind == MaterialKind::Mirror
    }
}
