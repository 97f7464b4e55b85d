//! OBJ import.
//!
//! Line-oriented parser with fan triangulation; face corners are expanded
//! into unique vertices since OBJ indexes positions, UVs and normals
//! independently. MTL libraries referenced by `mtllib` supply the material
//! slots; a `map_Kd` entry becomes the material's image source node.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{ImageRef, Material, MaterialNode, MeshObject, Scene, SceneObject, ShaderModel, Triangle, Vertex};

pub fn import(scene: &mut Scene, path: &Path, scale: f32) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open OBJ: {}", path.display()))?;
    let reader = BufReader::new(file);
    let obj_dir = path.parent().unwrap_or(Path::new(""));

    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut tex_coords: Vec<[f32; 2]> = Vec::new();
    let mut normals_raw: Vec<[f32; 3]> = Vec::new();

    let mut mesh = MeshObject::default();
    let mut current_slot: Option<usize> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "mtllib" if parts.len() >= 2 => {
                let materials = load_mtl(&obj_dir.join(parts[1]))?;
                mesh.materials.extend(materials);
            }
            "usemtl" if parts.len() >= 2 => {
                current_slot = mesh.materials.iter().position(|m| m.name == parts[1]);
                if current_slot.is_none() {
                    tracing::warn!("OBJ references unknown material '{}'", parts[1]);
                }
            }
            "v" if parts.len() >= 4 => {
                let x: f32 = parts[1].parse().unwrap_or(0.0);
                let y: f32 = parts[2].parse().unwrap_or(0.0);
                let z: f32 = parts[3].parse().unwrap_or(0.0);
                positions.push([x * scale, y * scale, z * scale]);
            }
            "vt" if parts.len() >= 3 => {
                let u: f32 = parts[1].parse().unwrap_or(0.0);
                let v: f32 = parts[2].parse().unwrap_or(0.0);
                tex_coords.push([u, v]);
            }
            "vn" if parts.len() >= 4 => {
                let x: f32 = parts[1].parse().unwrap_or(0.0);
                let y: f32 = parts[2].parse().unwrap_or(0.0);
                let z: f32 = parts[3].parse().unwrap_or(0.0);
                normals_raw.push([x, y, z]);
            }
            "f" if parts.len() >= 4 => {
                let face_verts: Vec<(usize, Option<usize>, Option<usize>)> = parts[1..]
                    .iter()
                    .filter_map(|v| parse_obj_vertex(v))
                    .collect();

                if face_verts.len() < 3 {
                    continue;
                }

                // Fan triangulation for convex polygons
                for i in 1..face_verts.len() - 1 {
                    let mut indices = [0u32; 3];
                    for (corner, &idx) in [0, i, i + 1].iter().enumerate() {
                        let (vi, vti, vni) = face_verts[idx];
                        indices[corner] = mesh.vertices.len() as u32;
                        mesh.vertices.push(Vertex {
                            position: positions.get(vi).copied().unwrap_or([0.0; 3]),
                            uv: vti
                                .and_then(|ti| tex_coords.get(ti).copied())
                                .unwrap_or([0.0; 2]),
                            normal: vni
                                .and_then(|ni| normals_raw.get(ni).copied())
                                .unwrap_or([0.0, 0.0, 1.0]),
                        });
                    }
                    mesh.triangles.push(Triangle {
                        indices,
                        slot: current_slot,
                    });
                }
            }
            _ => {}
        }
    }

    if mesh.vertices.is_empty() {
        bail!("No vertices found in OBJ file");
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "mesh".to_string());
    scene.add_object(SceneObject::mesh(name, mesh));

    Ok(())
}

/// Parse an OBJ face vertex reference: `v`, `v/vt`, `v//vn`, or `v/vt/vn`.
/// Indices are 1-based in the file.
fn parse_obj_vertex(s: &str) -> Option<(usize, Option<usize>, Option<usize>)> {
    let mut split = s.split('/');
    let vi = split.next()?.parse::<usize>().ok()?.checked_sub(1)?;
    let vti = split
        .next()
        .filter(|t| !t.is_empty())
        .and_then(|t| t.parse::<usize>().ok())
        .and_then(|t| t.checked_sub(1));
    let vni = split
        .next()
        .filter(|n| !n.is_empty())
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1));
    Some((vi, vti, vni))
}

/// Load materials from an MTL library.
///
/// A material with a diffuse map becomes a node material whose texture node
/// points at the image; one without any map stays a flat material.
fn load_mtl(path: &Path) -> Result<Vec<Material>> {
    let file = File::open(path).with_context(|| format!("Failed to open MTL: {}", path.display()))?;
    let reader = BufReader::new(file);
    let mtl_dir = path.parent().unwrap_or(Path::new(""));

    let mut materials = Vec::new();
    let mut current: Option<(String, Option<ImageRef>)> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = line.strip_prefix("newmtl ") {
            if let Some(material) = current.take() {
                materials.push(finish_mtl(material));
            }
            current = Some((name.trim().to_string(), None));
        } else if let Some(map) = line.strip_prefix("map_Kd ") {
            if let Some((_, image)) = current.as_mut() {
                *image = Some(ImageRef::new(mtl_dir.join(map.trim())));
            }
        }
    }
    if let Some(material) = current.take() {
        materials.push(finish_mtl(material));
    }

    Ok(materials)
}

fn finish_mtl((name, image): (String, Option<ImageRef>)) -> Material {
    match image {
        Some(image) => Material::with_nodes(
            name,
            vec![
                MaterialNode::Shader(ShaderModel::Pbr),
                MaterialNode::Texture { image },
                MaterialNode::Output,
            ],
        ),
        None => Material::flat(name),
    }
}
