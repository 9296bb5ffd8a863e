use std::path::Path;

use anyhow::{bail, Context, Result};
use glam::{Mat3, Mat4, Vec3, Vec4, Vec4Swizzles};

use crate::{Material, MaterialKind, SceneBuilder, Triangle};

/// Metallic factors above this are loaded as mirrors.
const MIRROR_METALLIC_THRESHOLD: f32 = 0.9;

pub(crate) fn load(path: &Path, builder: &mut SceneBuilder) -> Result<()> {
    puffin::profile_function!();

    let (document, buffers, _images) = gltf::import(path)
        .with_context(|| format!("Failed to import gltf {}", path.display()))?;

    let material_offset = builder.material_count();
    for gltf_material in document.materials() {
        builder.material(process_material(&gltf_material));
    }
    let default_material = builder.material(Material::default());

    let Some(scene) = document
        .default_scene()
        .or_else(|| document.scenes().next())
    else {
        bail!("{} contains no scenes", path.display());
    };

    let mut triangle_count = 0;
    for root_node in scene.nodes() {
        process_nodes_recursive(
            &root_node,
            Mat4::IDENTITY,
            &buffers,
            material_offset,
            default_material,
            builder,
            &mut triangle_count,
        )?;
    }

    log::info!(
        "Loaded {} with {} triangles and {} materials",
        path.display(),
        triangle_count,
        document.materials().len()
    );

    Ok(())
}

fn process_material(material: &gltf::Material) -> Material {
    let pbr = material.pbr_metallic_roughness();

    let mut emission = Vec3::from(material.emissive_factor());
    emission *= material.emissive_strength().unwrap_or(1.0);

    let kind = if pbr.metallic_factor() > MIRROR_METALLIC_THRESHOLD {
        MaterialKind::Mirror
    } else {
        MaterialKind::Diffuse
    };

    Material {
        albedo: Vec4::from(pbr.base_color_factor()).xyz(),
        emission,
        kind,
    }
}

fn process_nodes_recursive(
    node: &gltf::Node,
    parent_transform: Mat4,
    buffers: &[gltf::buffer::Data],
    material_offset: u32,
    default_material: u32,
    builder: &mut SceneBuilder,
    triangle_count: &mut usize,
) -> Result<()> {
    let transform = parent_transform * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let normal_transform = Mat3::from_mat4(transform).inverse().transpose();

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping {:?} primitive in mesh {}",
                    primitive.mode(),
                    mesh.name().unwrap_or("Unnamed")
                );
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<Vec3> = reader
                .read_positions()
                .context("Vertices must have positions")?
                .map(|p| transform.transform_point3(Vec3::from(p)))
                .collect();

            let normals: Option<Vec<Vec3>> = reader.read_normals().map(|normals| {
                normals
                    .map(|n| (normal_transform * Vec3::from(n)).normalize_or_zero())
                    .collect()
            });

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            let material = primitive
                .material()
                .index()
                .map(|index| material_offset + index as u32)
                .unwrap_or(default_material);

            for triangle in indices.chunks_exact(3) {
                let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
                if a.max(b).max(c) >= positions.len() {
                    bail!("Triangle index out of range in mesh {}", mesh.index());
                }

                let vertex_normals = normals.as_ref().map(|n| [n[a], n[b], n[c]]);
                builder.triangle(Triangle::new(
                    [positions[a], positions[b], positions[c]],
                    vertex_normals,
                    material,
                ));
                *triangle_count += 1;
            }
        }
    }

    for child in node.children() {
        process_nodes_recursive(
            &child,
            transform,
            buffers,
            material_offset,
            default_material,
            builder,
            triangle_count,
        )?;
    }

    Ok(())
}
