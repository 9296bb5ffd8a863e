use std::path::Path;

use anyhow::{bail, Context, Result};
use glam::Vec3;

use crate::{
    bvh::Bvh,
    gltf_loader, obj_loader, Environment, Hit, Material, Primitive, Sphere, Triangle,
};

/// Immutable geometry, materials, emitters and environment of a render session.
#[derive(Debug, Clone)]
pub struct Scene {
    materials: Vec<Material>,
    primitives: Vec<Primitive>,
    /// Emissive spheres that are sampled explicitly by next event estimation.
    lights: Vec<u32>,
    light_flags: Vec<bool>,
    bvh: Bvh,
    environment: Environment,
}

impl Scene {
    /// Loads a mesh (`.gltf`, `.glb` or `.obj`) and an optional environment.
    pub fn load(mesh_path: &Path, environment_path: Option<&Path>) -> Result<Self> {
        puffin::profile_function!();

        let mut builder = SceneBuilder::new();
        builder
            .mesh(mesh_path)
            .with_context(|| format!("Failed to load scene {}", mesh_path.display()))?;

        if let Some(environment_path) = environment_path {
            let environment = Environment::load(environment_path).with_context(|| {
                format!("Failed to load environment {}", environment_path.display())
            })?;
            builder.environment(environment);
        }

        Ok(builder.build())
    }

    pub fn intersect(&self, origin: Vec3, direction: Vec3, t_max: f32) -> Option<Hit> {
        self.bvh.intersect(&self.primitives, origin, direction, t_max)
    }

    pub fn occluded(&self, origin: Vec3, direction: Vec3, t_max: f32) -> bool {
        self.bvh.occluded(&self.primitives, origin, direction, t_max)
    }

    pub fn material(&self, id: u32) -> &Material {
        &self.materials[id as usize]
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn primitive(&self, id: u32) -> &Primitive {
        &self.primitives[id as usize]
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn lights(&self) -> &[u32] {
        &self.lights
    }

    pub fn is_light(&self, primitive: u32) -> bool {
        self.light_flags[primitive as usize]
    }

    /// The sphere behind a light list entry.
    pub fn light(&self, index: usize) -> &Sphere {
        match &self.primitives[self.lights[index] as usize] {
            Primitive::Sphere(sphere) => sphere,
            Primitive::Triangle(_) => unreachable!("Only spheres are registered as lights"),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_radiance(&self, direction: Vec3) -> Vec3 {
        self.environment.radiance(direction)
    }
}

/// Incrementally collects a [`Scene`], used by the mesh loaders and for scenes built in code.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    materials: Vec<Material>,
    primitives: Vec<Primitive>,
    environment: Environment,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        self.materials.len() as u32 - 1
    }

    pub fn material_count(&self) -> u32 {
        self.materials.len() as u32
    }

    pub fn sphere(&mut self, center: Vec3, radius: f32, material: u32) -> u32 {
        self.primitive(Primitive::Sphere(Sphere::new(center, radius, material)))
    }

    pub fn triangle(&mut self, triangle: Triangle) -> u32 {
        self.primitive(Primitive::Triangle(triangle))
    }

    fn primitive(&mut self, primitive: Primitive) -> u32 {
        self.primitives.push(primitive);
        self.primitives.len() as u32 - 1
    }

    /// Appends the triangles and materials of a mesh file.
    pub fn mesh(&mut self, path: &Path) -> Result<&mut Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("gltf" | "glb") => gltf_loader::load(path, self)?,
            Some("obj") => obj_loader::load(path, self)?,
            _ => bail!("Unsupported mesh format {}", path.display()),
        }

        Ok(self)
    }

    pub fn environment(&mut self, environment: Environment) -> &mut Self {
        self.environment = environment;
        self
    }

    pub fn build(self) -> Scene {
        puffin::profile_function!();

        let mut primitives = self.primitives;
        let mut materials = self.materials;

        // Keep material lookups in bounds for primitives that reference nothing valid.
        if primitives
            .iter()
            .any(|primitive| primitive.material() as usize >= materials.len())
        {
            let fallback = materials.len() as u32;
            materials.push(Material::default());
            for primitive in &mut primitives {
                if primitive.material() as usize >= fallback as usize {
                    match primitive {
                        Primitive::Sphere(sphere) => sphere.material = fallback,
                        Primitive::Triangle(triangle) => triangle.material = fallback,
                    }
                }
            }
            log::warn!("Primitives with invalid material indices use the default material");
        }

        let light_flags: Vec<bool> = primitives
            .iter()
            .map(|primitive| {
                matches!(primitive, Primitive::Sphere(_))
                    && materials[primitive.material() as usize].is_emissive()
            })
            .collect();
        let lights = light_flags
            .iter()
            .enumerate()
            .filter(|(_, is_light)| **is_light)
            .map(|(i, _)| i as u32)
            .collect();

        let bvh = Bvh::new(&primitives);

        Scene {
            materials,
            primitives,
            lights,
            light_flags,
            bvh,
            environment: self.environment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MaterialKind;

    fn write_triangle_gltf(dir: &Path) -> std::path::PathBuf {
        let positions: [f32; 9] = [-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0];
        let bytes: Vec<u8> = positions.iter().flat_map(|p| p.to_le_bytes()).collect();
        std::fs::write(dir.join("triangle.bin"), &bytes).unwrap();

        let gltf = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0, "translation": [0.0, 0.0, -3.0] }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }] }],
            "materials": [{
                "pbrMetallicRoughness": { "baseColorFactor": [0.5, 0.25, 1.0, 1.0], "metallicFactor": 1.0 },
                "emissiveFactor": [1.0, 1.0, 1.0],
                "extensions": { "KHR_materials_emissive_strength": { "emissiveStrength": 4.0 } }
            }],
            "extensionsUsed": ["KHR_materials_emissive_strength"],
            "buffers": [{ "uri": "triangle.bin", "byteLength": 36 }],
            "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
            "accessors": [{
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [-1.0, -1.0, 0.0], "max": [1.0, 1.0, 0.0]
            }]
        }"#;
        let path = dir.join("triangle.gltf");
        std::fs::write(&path, gltf).unwrap();
        path
    }

    #[test]
    fn builder_registers_emissive_spheres_as_lights() {
        let mut builder = SceneBuilder::new();
        let light = builder.material(Material::emissive(Vec3::splat(5.0)));
        let diffuse = builder.material(Material::diffuse(Vec3::splat(0.5)));
        builder.sphere(Vec3::ZERO, 1.0, diffuse);
        builder.sphere(Vec3::new(0.0, 5.0, 0.0), 0.5, light);
        builder.triangle(Triangle::new([Vec3::X, Vec3::Y, Vec3::Z], None, light));
        let scene = builder.build();

        assert_eq!(scene.lights(), &[1]);
        assert!(scene.is_light(1));
        assert!(!scene.is_light(2));
        assert_eq!(scene.light(0).radius, 0.5);
    }

    #[test]
    fn intersect_returns_closest_primitive() {
        let mut builder = SceneBuilder::new();
        let material = builder.material(Material::default());
        builder.sphere(Vec3::new(0.0, 0.0, -10.0), 1.0, material);
        builder.sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, material);
        let scene = builder.build();

        let hit = scene.intersect(Vec3::ZERO, Vec3::NEG_Z, f32::INFINITY).unwrap();
        assert_eq!(hit.primitive, 1);
        assert!((hit.t - 4.0).abs() < 1e-5);

        assert!(scene.occluded(Vec3::ZERO, Vec3::NEG_Z, 5.0));
        assert!(!scene.occluded(Vec3::ZERO, Vec3::NEG_Z, 3.0));
        assert!(scene.intersect(Vec3::ZERO, Vec3::Z, f32::INFINITY).is_none());
    }

    #[test]
    fn invalid_material_indices_fall_back() {
        let mut builder = SceneBuilder::new();
        builder.sphere(Vec3::ZERO, 1.0, 42);
        let scene = builder.build();

        let material = scene.primitive(0).material();
        assert_eq!(scene.material(material), &Material::default());
    }

    #[test]
    fn load_gltf_triangle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle_gltf(dir.path());

        let scene = Scene::load(&path, None).unwrap();
        assert_eq!(scene.primitives().len(), 1);

        let hit = scene.intersect(Vec3::ZERO, Vec3::NEG_Z, f32::INFINITY).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-5);

        let material = scene.material(hit.material);
        assert_eq!(material.kind, MaterialKind::Mirror);
        assert!(material.albedo.abs_diff_eq(Vec3::new(0.5, 0.25, 1.0), 1e-6));
        assert!(material.emission.abs_diff_eq(Vec3::splat(4.0), 1e-6));
        assert!(scene.lights().is_empty());
    }

    #[test]
    fn load_obj_with_emissive_material() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("quad.mtl"),
            "newmtl lamp\nKd 0.1 0.2 0.3\nKe 2 2 2\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("quad.obj"),
            "mtllib quad.mtl\n\
             v -1 -1 -2\nv 1 -1 -2\nv 1 1 -2\nv -1 1 -2\n\
             usemtl lamp\nf 1 2 3 4\n",
        )
        .unwrap();

        let scene = Scene::load(&dir.path().join("quad.obj"), None).unwrap();
        assert_eq!(scene.primitives().len(), 2);

        let hit = scene.intersect(Vec3::ZERO, Vec3::NEG_Z, f32::INFINITY).unwrap();
        let material = scene.material(hit.material);
        assert!(material.albedo.abs_diff_eq(Vec3::new(0.1, 0.2, 0.3), 1e-6));
        assert!(material.emission.abs_diff_eq(Vec3::splat(2.0), 1e-6));
    }

    #[test]
    fn load_failures_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Scene::load(&dir.path().join("missing.obj"), None).is_err());
        assert!(Scene::load(&dir.path().join("scene.fbx"), None).is_err());

        let path = write_triangle_gltf(dir.path());
        assert!(Scene::load(&path, Some(&dir.path().join("missing.hdr"))).is_err());
    }
}
