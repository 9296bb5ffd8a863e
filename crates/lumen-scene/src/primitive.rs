use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::{bvh::Aabb, RAY_T_MIN};

/// Closest-hit record produced by the scene's intersection query.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hit {
    pub t: f32,
    pub position: Vec3,
    /// Shading normal, flipped to face the incoming ray.
    pub normal: Vec3,
    pub material: u32,
    pub primitive: u32,
    pub front_face: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub positions: [Vec3; 3],
    /// Per-vertex normals, `None` for flat shading.
    pub normals: Option<[Vec3; 3]>,
    pub material: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Sphere(Sphere),
    Triangle(Triangle),
}

/// A direction towards an emitter chosen by [`Sphere::sample_solid_angle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    pub direction: Vec3,
    pub distance: f32,
    /// Solid-angle density of `direction`.
    pub pdf: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: u32) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            self.center - Vec3::splat(self.radius),
            self.center + Vec3::splat(self.radius),
        )
    }

    /// Nearest intersection distance in `(RAY_T_MIN, t_max)`.
    pub fn intersect_t(&self, origin: Vec3, direction: Vec3, t_max: f32) -> Option<f32> {
        let oc = origin - self.center;
        let half_b = oc.dot(direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let discriminant = half_b * half_b - c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let near = -half_b - sqrt_d;
        let far = -half_b + sqrt_d;
        [near, far]
            .into_iter()
            .find(|t| *t > RAY_T_MIN && *t < t_max)
    }

    pub fn intersect(
        &self,
        origin: Vec3,
        direction: Vec3,
        t_max: f32,
        primitive: u32,
    ) -> Option<Hit> {
        let t = self.intersect_t(origin, direction, t_max)?;
        let position = origin + direction * t;
        let outward = (position - self.center) / self.radius;
        let front_face = outward.dot(direction) < 0.0;

        Some(Hit {
            t,
            position,
            normal: if front_face { outward } else { -outward },
            material: self.material,
            primitive,
            front_face,
        })
    }

    /// Samples a direction from `point` uniformly inside the cone subtended by the sphere.
    ///
    /// Returns `None` when `point` lies inside the sphere.
    pub fn sample_solid_angle(&self, point: Vec3, u: Vec2) -> Option<LightSample> {
        let to_center = self.center - point;
        let distance_squared = to_center.length_squared();
        let radius_squared = self.radius * self.radius;
        if distance_squared <= radius_squared {
            return None;
        }

        let distance_to_center = distance_squared.sqrt();
        let w = to_center / distance_to_center;

        let sin_2_theta_max = radius_squared / distance_squared;
        let cos_theta_max = (1.0 - sin_2_theta_max).max(0.0).sqrt();
        // 1 - cos_theta_max without cancellation for distant spheres.
        let one_minus_cos_theta_max = sin_2_theta_max / (1.0 + cos_theta_max);

        let cos_theta = 1.0 - u.x * one_minus_cos_theta_max;
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let phi = 2.0 * PI * u.y;

        let (tangent, bitangent) = orthonormal_basis(w);
        let direction = (tangent * (sin_theta * phi.cos())
            + bitangent * (sin_theta * phi.sin())
            + w * cos_theta)
            .normalize();

        let distance = self
            .intersect_t(point, direction, f32::INFINITY)
            .unwrap_or_else(|| (distance_squared - radius_squared).sqrt());

        Some(LightSample {
            direction,
            distance,
            pdf: 1.0 / (2.0 * PI * one_minus_cos_theta_max),
        })
    }
}

impl Triangle {
    pub fn new(positions: [Vec3; 3], normals: Option<[Vec3; 3]>, material: u32) -> Self {
        Self {
            positions,
            normals,
            material,
        }
    }

    pub fn aabb(&self) -> Aabb {
        let [p0, p1, p2] = self.positions;
        Aabb::new(p0.min(p1).min(p2), p0.max(p1).max(p2))
    }

    pub fn geometric_normal(&self) -> Vec3 {
        let [p0, p1, p2] = self.positions;
        (p1 - p0).cross(p2 - p0).normalize_or_zero()
    }

    /// Möller-Trumbore; returns `(t, u, v)`.
    pub fn intersect_t(
        &self,
        origin: Vec3,
        direction: Vec3,
        t_max: f32,
    ) -> Option<(f32, f32, f32)> {
        let [p0, p1, p2] = self.positions;
        let edge1 = p1 - p0;
        let edge2 = p2 - p0;

        let p = direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = origin - p0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        if t > RAY_T_MIN && t < t_max {
            Some((t, u, v))
        } else {
            None
        }
    }

    pub fn intersect(
        &self,
        origin: Vec3,
        direction: Vec3,
        t_max: f32,
        primitive: u32,
    ) -> Option<Hit> {
        let (t, u, v) = self.intersect_t(origin, direction, t_max)?;

        let geometric_normal = self.geometric_normal();
        let front_face = geometric_normal.dot(direction) < 0.0;

        let shading_normal = match self.normals {
            Some([n0, n1, n2]) => (n0 * (1.0 - u - v) + n1 * u + n2 * v).normalize_or_zero(),
            None => geometric_normal,
        };
        let shading_normal = if shading_normal == Vec3::ZERO {
            geometric_normal
        } else {
            shading_normal
        };

        // Keep the shading normal on the side the ray arrives from.
        let normal = if shading_normal.dot(direction) < 0.0 {
            shading_normal
        } else {
            -shading_normal
        };

        Some(Hit {
            t,
            position: origin + direction * t,
            normal,
            material: self.material,
            primitive,
            front_face,
        })
    }
}

impl Primitive {
    pub fn aabb(&self) -> Aabb {
        match self {
            Self::Sphere(sphere) => sphere.aabb(),
            Self::Triangle(triangle) => triangle.aabb(),
        }
    }

    pub fn material(&self) -> u32 {
        match self {
            Self::Sphere(sphere) => sphere.material,
            Self::Triangle(triangle) => triangle.material,
        }
    }

    pub fn intersect(
        &self,
        origin: Vec3,
        direction: Vec3,
        t_max: f32,
        primitive: u32,
    ) -> Option<Hit> {
        match self {
            Self::Sphere(sphere) => sphere.intersect(origin, direction, t_max, primitive),
            Self::Triangle(triangle) => triangle.intersect(origin, direction, t_max, primitive),
        }
    }

    pub fn intersects(&self, origin: Vec3, direction: Vec3, t_max: f32) -> bool {
        match self {
            Self::Sphere(sphere) => sphere.intersect_t(origin, direction, t_max).is_some(),
            Self::Triangle(triangle) => triangle.intersect_t(origin, direction, t_max).is_some(),
        }
    }
}

/// Builds a right-handed orthonormal basis around the unit vector `n`.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = 1f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    (
        Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x),
        Vec3::new(b, sign + n.y * n.y * a, -n.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_hit_from_outside_and_inside() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, 0);

        let hit = sphere
            .intersect(Vec3::ZERO, Vec3::NEG_Z, f32::INFINITY, 7)
            .unwrap();
        assert!((hit.t - 4.0).abs() < 1e-5);
        assert!(hit.front_face);
        assert_eq!(hit.primitive, 7);
        assert!(hit.normal.abs_diff_eq(Vec3::Z, 1e-5));

        let inside = sphere
            .intersect(sphere.center, Vec3::X, f32::INFINITY, 0)
            .unwrap();
        assert!(!inside.front_face);
        assert!(inside.normal.abs_diff_eq(Vec3::NEG_X, 1e-5));

        assert!(sphere.intersect(Vec3::ZERO, Vec3::NEG_Z, 3.5, 0).is_none());
    }

    #[test]
    fn triangle_hit_respects_edges() {
        let triangle = Triangle::new(
            [
                Vec3::new(-1.0, -1.0, -2.0),
                Vec3::new(1.0, -1.0, -2.0),
                Vec3::new(0.0, 1.0, -2.0),
            ],
            None,
            3,
        );

        let hit = triangle
            .intersect(Vec3::ZERO, Vec3::NEG_Z, f32::INFINITY, 0)
            .unwrap();
        assert!((hit.t - 2.0).abs() < 1e-6);
        assert!(hit.front_face);
        assert!(hit.normal.abs_diff_eq(Vec3::Z, 1e-6));
        assert_eq!(hit.material, 3);

        let miss_direction = Vec3::new(0.9, 0.9, -2.0).normalize();
        assert!(triangle
            .intersect(Vec3::ZERO, miss_direction, f32::INFINITY, 0)
            .is_none());
    }

    #[test]
    fn solid_angle_samples_hit_the_sphere() {
        let sphere = Sphere::new(Vec3::new(3.0, 4.0, 0.0), 1.0, 0);
        let expected_pdf = 1.0 / (2.0 * PI * (1.0 - (1.0f32 - 1.0 / 25.0).sqrt()));

        for i in 0..16 {
            let u = Vec2::new((i as f32 + 0.5) / 16.0, (i * 7 % 16) as f32 / 16.0);
            let sample = sphere.sample_solid_angle(Vec3::ZERO, u).unwrap();

            assert!((sample.direction.length() - 1.0).abs() < 1e-5);
            assert!((sample.pdf - expected_pdf).abs() / expected_pdf < 1e-3);
            let t = sphere
                .intersect_t(Vec3::ZERO, sample.direction, f32::INFINITY)
                .unwrap_or(sample.distance);
            assert!((t - sample.distance).abs() < 1e-3);
            assert!(sample.distance >= 4.0 - 1e-3 && sample.distance <= 5.0);
        }

        assert!(sphere.sample_solid_angle(sphere.center, Vec2::ZERO).is_none());
    }

    #[test]
    fn orthonormal_basis_is_orthonormal() {
        for n in [Vec3::X, Vec3::NEG_Z, Vec3::new(0.3, -0.4, 0.2).normalize()] {
            let (t, b) = orthonormal_basis(n);
            assert!(t.dot(n).abs() < 1e-5);
            assert!(b.dot(n).abs() < 1e-5);
            assert!(t.dot(b).abs() < 1e-5);
            assert!((t.length() - 1.0).abs() < 1e-5);
        }
    }
}
