use std::f32::consts::FRAC_1_PI;

use glam::Vec3;
use lumen_scene::{orthonormal_basis, Hit, Material, MaterialKind, Scene};

use crate::{
    accumulator::Accumulator,
    buffer::AtomicCounter,
    compute,
    config::RendererConfig,
    random::{random_f32, random_vec2, sample_cosine_hemisphere},
    random_state::RandomState,
    ray::{Ray, RayFlags, ShadowRay},
    ray_pool::{RayPool, ShadowQueue},
};

/// Offset along the surface normal for rays leaving a surface.
const SURFACE_OFFSET: f32 = 1e-4;
const MIN_SURVIVAL_PROBABILITY: f32 = 0.05;

pub struct ShadePassParameters<'a> {
    pub scene: &'a Scene,
    pub config: &'a RendererConfig,
    pub ray_pool: &'a RayPool,
    pub shadow_queue: &'a ShadowQueue,
    pub accumulator: &'a Accumulator,
    pub random_state: &'a RandomState,
    pub completed_paths: &'a AtomicCounter,
}

/// Shades the hit of every active ray: accumulates emission, queues a light sample for the
/// shadow pass, then either appends the scattered continuation to the next buffer or retires
/// the path.
pub fn dispatch(parameters: &ShadePassParameters) {
    puffin::profile_function!();

    let ray_pool = parameters.ray_pool;
    ray_pool.begin_pass();

    compute::dispatch(ray_pool.active_count(), |i| unsafe {
        let mut ray = ray_pool.current().read(i as usize);
        let hit = ray_pool.hits().read(i as usize);
        let scene = parameters.scene;
        let material = scene.material(hit.material);

        // Emitters that are light sampled only count when light sampling could not reach them.
        if material.is_emissive()
            && hit.front_face
            && (ray.depth == 0 || ray.after_specular() || !scene.is_light(hit.primitive))
        {
            parameters
                .accumulator
                .add(ray.pixel, ray.throughput * material.emission);
        }

        if let Some(shadow_ray) = sample_light(scene, &mut ray, &hit, material) {
            if !parameters.shadow_queue.push(shadow_ray) {
                log::warn!("Shadow queue overflow, dropping light sample");
            }
        }

        if !scatter(&mut ray, &hit, material, parameters.config) {
            retire(parameters, i, ray);
            return;
        }

        match ray_pool.next_counter().reserve() {
            Some(slot) => ray_pool.next().write(slot as usize, ray),
            None => {
                log::warn!("Ray pool overflow, retiring ray of pixel {}", ray.pixel);
                retire(parameters, i, ray);
            }
        }
    });
}

unsafe fn retire(parameters: &ShadePassParameters, slot: u32, mut ray: Ray) {
    ray.flags.insert(RayFlags::TERMINATED);
    parameters.ray_pool.current().write(slot as usize, ray);
    parameters.random_state.store(ray.pixel, ray.rng);
    parameters.completed_paths.reserve();
}

/// Next event estimation towards one uniformly chosen light sphere.
fn sample_light(
    scene: &Scene,
    ray: &mut Ray,
    hit: &Hit,
    material: &Material,
) -> Option<ShadowRay> {
    let light_count = scene.lights().len();
    if light_count == 0 || material.is_specular() || material.albedo == Vec3::ZERO {
        return None;
    }

    let light_index =
        ((random_f32(&mut ray.rng) * light_count as f32) as usize).min(light_count - 1);
    if scene.lights()[light_index] == hit.primitive {
        return None;
    }

    let light = scene.light(light_index);
    let origin = hit.position + hit.normal * SURFACE_OFFSET;
    let sample = light.sample_solid_angle(origin, random_vec2(&mut ray.rng))?;

    let cos_theta = hit.normal.dot(sample.direction);
    if cos_theta <= 0.0 || sample.pdf <= 0.0 {
        return None;
    }

    let emission = scene.material(light.material).emission;
    let bsdf = material.albedo * FRAC_1_PI;
    let contribution =
        ray.throughput * bsdf * emission * cos_theta * light_count as f32 / sample.pdf;

    Some(ShadowRay {
        origin,
        direction: sample.direction,
        distance: sample.distance * (1.0 - 1e-4),
        contribution,
        pixel: ray.pixel,
    })
}

/// Turns `ray` into its continuation. Returns `false` when the path terminates.
fn scatter(ray: &mut Ray, hit: &Hit, material: &Material, config: &RendererConfig) -> bool {
    let direction = match material.kind {
        MaterialKind::Diffuse => {
            let local = sample_cosine_hemisphere(random_vec2(&mut ray.rng));
            let (tangent, bitangent) = orthonormal_basis(hit.normal);
            ray.flags.remove(RayFlags::SPECULAR);
            (tangent * local.x + bitangent * local.y + hit.normal * local.z).normalize()
        }
        MaterialKind::Mirror => {
            ray.flags.insert(RayFlags::SPECULAR);
            ray.direction - 2.0 * ray.direction.dot(hit.normal) * hit.normal
        }
    };

    // Cosine weighted sampling cancels the cosine and the 1/pi of the lambertian lobe.
    ray.throughput *= material.albedo;
    ray.origin = hit.position + hit.normal * SURFACE_OFFSET;
    ray.direction = direction;
    ray.depth += 1;

    if ray.depth > config.max_bounces || ray.throughput.max_element() <= 0.0 {
        return false;
    }

    if ray.depth >= config.russian_roulette_depth {
        let survival = ray
            .throughput
            .max_element()
            .clamp(MIN_SURVIVAL_PROBABILITY, 1.0);
        if random_f32(&mut ray.rng) >= survival {
            return false;
        }
        ray.throughput /= survival;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_facing_up() -> Hit {
        Hit {
            t: 1.0,
            position: Vec3::ZERO,
            normal: Vec3::Y,
            material: 0,
            primitive: 0,
            front_face: true,
        }
    }

    fn incoming_ray(depth: u32) -> Ray {
        Ray {
            depth,
            ..Ray::primary(Vec3::Y, Vec3::NEG_Y, 0, 0x1234_5678)
        }
    }

    #[test]
    fn diffuse_scatter_leaves_the_surface() {
        let config = RendererConfig::default();
        let material = Material::diffuse(Vec3::splat(0.5));

        for pixel in 0..64 {
            let mut ray = incoming_ray(0);
            ray.rng = RandomState::seed_for(pixel, 0, 0);
            assert!(scatter(&mut ray, &hit_facing_up(), &material, &config));
            assert!(ray.direction.y >= 0.0);
            assert_eq!(ray.depth, 1);
            assert_eq!(ray.throughput, Vec3::splat(0.5));
            assert!(!ray.after_specular());
        }
    }

    #[test]
    fn mirror_scatter_reflects() {
        let config = RendererConfig::default();
        let material = Material::mirror(Vec3::ONE);

        let mut ray = incoming_ray(0);
        ray.direction = Vec3::new(1.0, -1.0, 0.0).normalize();
        assert!(scatter(&mut ray, &hit_facing_up(), &material, &config));

        assert!(ray
            .direction
            .abs_diff_eq(Vec3::new(1.0, 1.0, 0.0).normalize(), 1e-6));
        assert!(ray.after_specular());
    }

    #[test]
    fn only_diffuse_surfaces_sample_lights() {
        let mut builder = lumen_scene::SceneBuilder::new();
        let light = builder.material(Material::emissive(Vec3::splat(4.0)));
        builder.sphere(Vec3::new(0.0, 3.0, 0.0), 0.5, light);
        let scene = builder.build();
        let hit = Hit {
            primitive: 1,
            ..hit_facing_up()
        };

        let mut ray = incoming_ray(0);
        let shadow_ray = sample_light(&scene, &mut ray, &hit, &Material::diffuse(Vec3::ONE));
        assert!(shadow_ray.is_some_and(|shadow_ray| shadow_ray.direction.y > 0.0));

        let mut ray = incoming_ray(0);
        assert!(sample_light(&scene, &mut ray, &hit, &Material::mirror(Vec3::ONE)).is_none());
    }

    #[test]
    fn max_bounces_and_zero_throughput_terminate() {
        let config = RendererConfig {
            max_bounces: 2,
            russian_roulette_depth: 100,
            ..Default::default()
        };

        let mut ray = incoming_ray(2);
        assert!(!scatter(
            &mut ray,
            &hit_facing_up(),
            &Material::mirror(Vec3::ONE),
            &config
        ));

        let mut ray = incoming_ray(0);
        assert!(!scatter(
            &mut ray,
            &hit_facing_up(),
            &Material::emissive(Vec3::ONE),
            &config
        ));
    }

    #[test]
    fn russian_roulette_reweights_survivors() {
        let config = RendererConfig {
            max_bounces: 100,
            russian_roulette_depth: 0,
            ..Default::default()
        };
        let material = Material::mirror(Vec3::splat(0.25));

        let mut survivors = 0;
        for pixel in 0..1000 {
            let mut ray = incoming_ray(0);
            ray.rng = RandomState::seed_for(pixel, 0, 0);
            if scatter(&mut ray, &hit_facing_up(), &material, &config) {
                survivors += 1;
                assert!(ray.throughput.abs_diff_eq(Vec3::ONE, 1e-5));
            }
        }

        assert!((150..350).contains(&survivors));
    }
}
