use std::path::Path;

use anyhow::{bail, Context, Result};
use glam::Vec3;

use crate::{Material, SceneBuilder, Triangle};

/// `illum` models that describe a ray traced reflection.
const MIRROR_ILLUMINATION_MODELS: [u8; 2] = [3, 5];

pub(crate) fn load(path: &Path, builder: &mut SceneBuilder) -> Result<()> {
    puffin::profile_function!();

    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("Failed to load obj {}", path.display()))?;

    let materials = materials.unwrap_or_else(|err| {
        log::warn!("No materials for {}: {}", path.display(), err);
        vec![]
    });

    let material_offset = builder.material_count();
    for material in &materials {
        builder.material(process_material(material));
    }
    let default_material = builder.material(Material::default());

    let mut triangle_count = 0;
    for model in &models {
        let mesh = &model.mesh;
        let position = |i: usize| {
            Vec3::new(
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            )
        };
        let has_normals = mesh.normals.len() == mesh.positions.len();
        let normal = |i: usize| {
            Vec3::new(
                mesh.normals[i * 3],
                mesh.normals[i * 3 + 1],
                mesh.normals[i * 3 + 2],
            )
        };

        let material = mesh
            .material_id
            .filter(|id| *id < materials.len())
            .map(|id| material_offset + id as u32)
            .unwrap_or(default_material);

        let vertex_count = mesh.positions.len() / 3;
        for triangle in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            if a.max(b).max(c) >= vertex_count {
                bail!("Triangle index out of range in {}", model.name);
            }

            let normals = has_normals.then(|| [normal(a), normal(b), normal(c)]);
            builder.triangle(Triangle::new(
                [position(a), position(b), position(c)],
                normals,
                material,
            ));
            triangle_count += 1;
        }
    }

    log::info!(
        "Loaded {} with {} triangles and {} materials",
        path.display(),
        triangle_count,
        materials.len()
    );

    Ok(())
}

fn process_material(material: &tobj::Material) -> Material {
    let albedo = Vec3::from(material.diffuse.unwrap_or([0.8; 3]));

    // Emission is not a core MTL statement; exporters write it as `Ke`.
    let emission = material
        .unknown_param
        .get("Ke")
        .and_then(|value| parse_vec3(value))
        .unwrap_or(Vec3::ZERO);

    let is_mirror = material
        .illumination_model
        .is_some_and(|illum| MIRROR_ILLUMINATION_MODELS.contains(&illum));

    if is_mirror {
        let reflectance = material.specular.map(Vec3::from).unwrap_or(albedo);
        Material {
            emission,
            ..Material::mirror(reflectance)
        }
    } else {
        Material {
            albedo,
            emission,
            ..Default::default()
        }
    }
}

fn parse_vec3(value: &str) -> Option<Vec3> {
    let components: Vec<f32> = value
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    match components.as_slice() {
        [x, y, z] => Some(Vec3::new(*x, *y, *z)),
        [v] => Some(Vec3::splat(*v)),
        _ => None,
    }
}
