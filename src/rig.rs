//! Single-bone rig synthesis.
//!
//! The target format requires every vertex to carry a bone binding and every
//! model to ship at least one sequence, so the merged mesh gets a minimal
//! rig: one root bone, one vertex group spanning the whole mesh at full
//! weight, one armature modifier, and a one-keyframe idle action.

use anyhow::{Context, Result};

use crate::scene::{
    Action, Armature, ArmatureModifier, FCurve, Keyframe, Scene, SceneObject, TransformComponent,
    VertexGroup,
};

pub const BONE_NAME: &str = "root";
pub const ARMATURE_NAME: &str = "armature";
pub const ACTION_NAME: &str = "idle";

/// Build the rig for the merged mesh at `mesh_index` and return the index of
/// the new armature object.
///
/// Precondition: merging has already happened; binding an unmerged scene
/// would rig only one sub-mesh. Postcondition: no unweighted vertex exists
/// (an empty mesh is vacuously total) and the armature has exactly one
/// playable animation.
pub fn synthesize(scene: &mut Scene, mesh_index: usize) -> Result<usize> {
    let mut armature = Armature::default();
    armature
        .add_bone(BONE_NAME, [0.0, 0.0, 0.0], [0.0, 0.0, 1.0])
        .context("Failed to create root bone")?;

    armature.action = Some(Action {
        name: ACTION_NAME.to_string(),
        channels: vec![FCurve {
            bone: BONE_NAME.to_string(),
            component: TransformComponent::LocationZ,
            keyframes: vec![Keyframe {
                frame: 0.0,
                value: 0.0,
            }],
        }],
    });

    let armature_index = scene.add_object(SceneObject::armature(ARMATURE_NAME, armature));

    let mesh = scene
        .mesh_mut(mesh_index)
        .context("Rig target is not a mesh object")?;

    let mut group = VertexGroup::new(BONE_NAME);
    group.assign(0..mesh.vertices.len() as u32, 1.0);
    mesh.vertex_groups.push(group);

    mesh.modifiers.push(ArmatureModifier {
        name: "Armature".to_string(),
        object: ARMATURE_NAME.to_string(),
        vertex_group: BONE_NAME.to_string(),
        use_vertex_groups: true,
    });

    Ok(armature_index)
}
