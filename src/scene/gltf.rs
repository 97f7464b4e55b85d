//! glTF/GLB import.
//!
//! Each mesh primitive becomes one scene mesh object with a single material
//! slot. Material node graphs are reconstructed from the document's texture
//! bindings in a fixed document order (base color first), so the extractor's
//! first-image-wins traversal is deterministic.

use anyhow::{Context, Result};
use std::path::Path;

use super::{ImageRef, Material, MaterialNode, MeshObject, Scene, SceneObject, ShaderModel, Triangle, Vertex};

pub fn import(scene: &mut Scene, path: &Path, scale: f32) -> Result<()> {
    let (document, buffers, _images) =
        gltf::import(path).with_context(|| format!("Failed to load glTF: {:?}", path))?;

    let gltf_dir = path.parent().unwrap_or(Path::new(""));
    let mut imported = 0usize;

    for mesh in document.meshes() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh{}", mesh.index()));

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .context("No positions in mesh primitive")?
                .collect();

            let uvs: Option<Vec<[f32; 2]>> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().collect());

            let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let material = convert_material(&primitive.material(), gltf_dir);
            let slot = material.as_ref().map(|_| 0);

            let vertices: Vec<Vertex> = positions
                .iter()
                .enumerate()
                .map(|(i, &position)| Vertex {
                    position: [
                        position[0] * scale,
                        position[1] * scale,
                        position[2] * scale,
                    ],
                    normal: normals
                        .as_ref()
                        .and_then(|n| n.get(i).copied())
                        .unwrap_or([0.0, 0.0, 1.0]),
                    // glTF UVs are top-left origin
                    uv: uvs
                        .as_ref()
                        .and_then(|u| u.get(i).copied())
                        .map(|[u, v]| [u, 1.0 - v])
                        .unwrap_or([0.0, 0.0]),
                })
                .collect();

            let triangles: Vec<Triangle> = indices
                .chunks_exact(3)
                .map(|tri| Triangle {
                    indices: [tri[0], tri[1], tri[2]],
                    slot,
                })
                .collect();

            let name = if primitive.index() == 0 {
                mesh_name.clone()
            } else {
                format!("{}.{}", mesh_name, primitive.index())
            };

            scene.add_object(SceneObject::mesh(
                name,
                MeshObject {
                    vertices,
                    triangles,
                    materials: material.into_iter().collect(),
                    vertex_groups: Vec::new(),
                    modifiers: Vec::new(),
                },
            ));
            imported += 1;
        }
    }

    if imported == 0 {
        anyhow::bail!("No mesh primitives found in glTF");
    }

    tracing::debug!("Imported {} mesh object(s) from {:?}", imported, path);
    Ok(())
}

/// Rebuild a material node graph from the glTF material's texture bindings.
///
/// Node order fixes which image wins the extractor's traversal: base color,
/// metallic-roughness, normal, occlusion, emissive.
fn convert_material(material: &gltf::Material, gltf_dir: &Path) -> Option<Material> {
    material.index()?;

    let name = material
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("material{}", material.index().unwrap_or(0)));

    let mut nodes = vec![MaterialNode::Shader(ShaderModel::Pbr)];

    let pbr = material.pbr_metallic_roughness();
    let textures = [
        pbr.base_color_texture().map(|info| info.texture()),
        pbr.metallic_roughness_texture().map(|info| info.texture()),
        material.normal_texture().map(|n| n.texture()),
        material.occlusion_texture().map(|o| o.texture()),
        material.emissive_texture().map(|info| info.texture()),
    ];

    for texture in textures.into_iter().flatten() {
        // Only URI-backed images have a convertible source file; embedded
        // buffer views do not resolve to a path
        if let gltf::image::Source::Uri { uri, .. } = texture.source().source() {
            nodes.push(MaterialNode::Texture {
                image: ImageRef::new(gltf_dir.join(uri)),
            });
        }
    }
    nodes.push(MaterialNode::Output);

    Some(Material::with_nodes(name, nodes))
}
