//! SMD export.
//!
//! Writes the two interchange files the compiler consumes: the reference
//! mesh (`<asset>.smd`) and the idle animation (`anims/idle.smd`). SMD is a
//! line-oriented text format: a version header, a node table, a skeleton
//! block per frame, and for reference files one triangle block per face.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::config::{ExportConfig, ExportFormat};
use crate::scene::{Armature, MeshObject, Scene};

/// Extension of exported interchange meshes
pub const MESH_EXT: &str = "smd";

/// Material name written for triangles whose slot carries no material
const DEFAULT_MATERIAL: &str = "default";

/// Export the merged mesh and the idle animation into the configured
/// directory. Returns the reference file path.
pub fn export(
    scene: &Scene,
    mesh_index: usize,
    armature_index: usize,
    config: &ExportConfig,
    asset: &str,
) -> Result<PathBuf> {
    let mesh = scene
        .mesh(mesh_index)
        .context("Export source is not a mesh object")?;
    let armature = scene
        .armature(armature_index)
        .context("Export rig is not an armature object")?;

    match config.format {
        ExportFormat::Smd => {}
    }

    let reference = config.path.join(format!("{asset}.{MESH_EXT}"));
    let file = File::create(&reference)
        .with_context(|| format!("Failed to create mesh export: {}", reference.display()))?;
    let mut writer = BufWriter::new(file);
    write_reference(&mut writer, mesh, armature)?;
    writer.flush()?;

    let anims_dir = config.path.join("anims");
    std::fs::create_dir_all(&anims_dir)
        .with_context(|| format!("Failed to create anims directory: {}", anims_dir.display()))?;

    let action_name = armature
        .action
        .as_ref()
        .map(|a| a.name.clone())
        .context("Armature has no animation to export")?;
    let anim = anims_dir.join(format!("{action_name}.{MESH_EXT}"));
    let file = File::create(&anim)
        .with_context(|| format!("Failed to create animation export: {}", anim.display()))?;
    let mut writer = BufWriter::new(file);
    write_animation(&mut writer, armature)?;
    writer.flush()?;

    tracing::info!(
        "Exported {} triangles to {}",
        mesh.triangles.len(),
        reference.display()
    );
    Ok(reference)
}

/// Write the reference mesh: bind pose plus one triangle block per face.
pub fn write_reference<W: Write>(w: &mut W, mesh: &MeshObject, armature: &Armature) -> Result<()> {
    write_header(w, armature)?;
    write_bind_pose(w, armature)?;

    // Bone links come from the armature modifier's vertex group; a vertex
    // missing from the group falls back to its parent bone implicitly
    let group = mesh
        .modifiers
        .first()
        .and_then(|m| mesh.vertex_group(&m.vertex_group));
    let parent_bone = group
        .and_then(|g| armature.bone_index(&g.name))
        .unwrap_or(0);

    writeln!(w, "triangles")?;
    for triangle in &mesh.triangles {
        let material = triangle
            .slot
            .and_then(|s| mesh.materials.get(s))
            .map(|m| m.name.as_str())
            .unwrap_or(DEFAULT_MATERIAL);
        writeln!(w, "{material}")?;

        for &index in &triangle.indices {
            let vertex = match mesh.vertices.get(index as usize) {
                Some(v) => v,
                None => bail!("Triangle references missing vertex {index}"),
            };
            write!(
                w,
                "{parent_bone} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
                vertex.position[0],
                vertex.position[1],
                vertex.position[2],
                vertex.normal[0],
                vertex.normal[1],
                vertex.normal[2],
                vertex.uv[0],
                vertex.uv[1]
            )?;
            match group.and_then(|g| g.weight(index)) {
                Some(weight) => writeln!(w, " 1 {parent_bone} {weight:.6}")?,
                None => writeln!(w)?,
            }
        }
    }
    writeln!(w, "end")?;
    Ok(())
}

/// Write the animation file: the action sampled at frame 0.
pub fn write_animation<W: Write>(w: &mut W, armature: &Armature) -> Result<()> {
    write_header(w, armature)?;

    let pose = armature
        .action
        .as_ref()
        .map(|action| {
            armature
                .bones()
                .iter()
                .map(|bone| action.sample_position(&bone.name, 0.0))
                .collect::<Vec<_>>()
        })
        .unwrap_or_else(|| vec![[0.0; 3]; armature.bones().len()]);

    writeln!(w, "skeleton")?;
    writeln!(w, "time 0")?;
    for (i, (bone, offset)) in armature.bones().iter().zip(&pose).enumerate() {
        writeln!(
            w,
            "{i} {:.6} {:.6} {:.6} 0.000000 0.000000 0.000000",
            bone.head[0] + offset[0],
            bone.head[1] + offset[1],
            bone.head[2] + offset[2]
        )?;
    }
    writeln!(w, "end")?;
    Ok(())
}

/// Version header and node table shared by both file kinds
fn write_header<W: Write>(w: &mut W, armature: &Armature) -> Result<()> {
    writeln!(w, "version 1")?;
    writeln!(w, "nodes")?;
    for (i, bone) in armature.bones().iter().enumerate() {
        writeln!(w, "{i} \"{}\" -1", bone.name)?;
    }
    writeln!(w, "end")?;
    Ok(())
}

/// Bind-pose skeleton block for reference files
fn write_bind_pose<W: Write>(w: &mut W, armature: &Armature) -> Result<()> {
    writeln!(w, "skeleton")?;
    writeln!(w, "time 0")?;
    for (i, bone) in armature.bones().iter().enumerate() {
        writeln!(
            w,
            "{i} {:.6} {:.6} {:.6} 0.000000 0.000000 0.000000",
            bone.head[0], bone.head[1], bone.head[2]
        )?;
    }
    writeln!(w, "end")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig;
    use crate::scene::{Material, SceneObject, Triangle, Vertex};

    fn rigged_scene() -> (Scene, usize, usize) {
        let mut scene = Scene::new();
        let mesh = MeshObject {
            vertices: vec![
                Vertex {
                    position: [0.0, 0.0, 0.0],
                    normal: [0.0, 0.0, 1.0],
                    uv: [0.0, 0.0],
                },
                Vertex {
                    position: [1.0, 0.0, 0.0],
                    normal: [0.0, 0.0, 1.0],
                    uv: [1.0, 0.0],
                },
                Vertex {
                    position: [0.0, 1.0, 0.0],
                    normal: [0.0, 0.0, 1.0],
                    uv: [0.0, 1.0],
                },
            ],
            triangles: vec![Triangle {
                indices: [0, 1, 2],
                slot: Some(0),
            }],
            materials: vec![Material::flat("wood")],
            ..Default::default()
        };
        let mesh_index = scene.add_object(SceneObject::mesh("chair", mesh));
        let armature_index = rig::synthesize(&mut scene, mesh_index).unwrap();
        (scene, mesh_index, armature_index)
    }

    fn render_reference(scene: &Scene, mesh_index: usize, armature_index: usize) -> String {
        let mut buf = Vec::new();
        write_reference(
            &mut buf,
            scene.mesh(mesh_index).unwrap(),
            scene.armature(armature_index).unwrap(),
        )
        .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn reference_has_header_nodes_and_triangles() {
        let (scene, mesh_index, armature_index) = rigged_scene();
        let smd = render_reference(&scene, mesh_index, armature_index);

        assert!(smd.starts_with("version 1\n"));
        assert!(smd.contains("nodes\n0 \"root\" -1\nend\n"));
        assert!(smd.contains("skeleton\ntime 0\n0 0.000000 0.000000 0.000000"));
        assert!(smd.contains("\nwood\n"));
        // Every vertex line is fully weighted to the root bone
        assert_eq!(smd.matches(" 1 0 1.000000\n").count(), 3);
    }

    #[test]
    fn triangles_without_materials_use_the_default_name() {
        let mut scene = Scene::new();
        let mesh = MeshObject {
            vertices: vec![
                Vertex {
                    position: [0.0; 3],
                    normal: [0.0, 0.0, 1.0],
                    uv: [0.0; 2],
                },
                Vertex {
                    position: [1.0, 0.0, 0.0],
                    normal: [0.0, 0.0, 1.0],
                    uv: [0.0; 2],
                },
                Vertex {
                    position: [0.0, 1.0, 0.0],
                    normal: [0.0, 0.0, 1.0],
                    uv: [0.0; 2],
                },
            ],
            triangles: vec![Triangle {
                indices: [0, 1, 2],
                slot: None,
            }],
            ..Default::default()
        };
        let mesh_index = scene.add_object(SceneObject::mesh("bare", mesh));
        let armature_index = rig::synthesize(&mut scene, mesh_index).unwrap();

        let smd = render_reference(&scene, mesh_index, armature_index);
        assert!(smd.contains("\ndefault\n"));
    }

    #[test]
    fn animation_is_a_single_rest_frame() {
        let (scene, _, armature_index) = rigged_scene();
        let mut buf = Vec::new();
        write_animation(&mut buf, scene.armature(armature_index).unwrap()).unwrap();
        let smd = String::from_utf8(buf).unwrap();

        assert_eq!(
            smd,
            "version 1\nnodes\n0 \"root\" -1\nend\nskeleton\ntime 0\n\
             0 0.000000 0.000000 0.000000 0.000000 0.000000 0.000000\nend\n"
        );
    }
}
