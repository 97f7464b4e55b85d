//! Explicit scene context.
//!
//! The pipeline owns its scene state: a flat list of objects (meshes and
//! armatures) threaded mutably through each stage. `reset` replaces the
//! implicit scene clearing an authoring host would do between runs.

mod gltf;
mod obj;

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Scene-level failure modes the pipeline treats as fatal
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("no mesh objects in the active view layer")]
    NoMeshObjects,
    #[error("bone '{0}' already exists in armature")]
    DuplicateBone(String),
}

/// A single mesh vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// One triangle: three vertex indices plus the material slot it is shaded
/// with (`None` when the mesh carries no materials)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub indices: [u32; 3],
    pub slot: Option<usize>,
}

/// Reference to a source image file backing a texture node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: PathBuf,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Extension-stripped basename, the canonical texture name
    pub fn stem(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
    }
}

/// Shading models a node graph can terminate in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderModel {
    Pbr,
    Unlit,
}

/// A node in a material's shading graph.
///
/// Every variant answers `as_image_source` uniformly, so callers never probe
/// for variant-specific attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialNode {
    Shader(ShaderModel),
    Texture { image: ImageRef },
    Output,
}

impl MaterialNode {
    /// The image this node samples, if it is an image source at all
    pub fn as_image_source(&self) -> Option<&ImageRef> {
        match self {
            MaterialNode::Texture { image } => Some(image),
            MaterialNode::Shader(_) | MaterialNode::Output => None,
        }
    }
}

/// One material slot on a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    nodes: Option<Vec<MaterialNode>>,
}

impl Material {
    /// A material without a node graph; the extractor skips these
    pub fn flat(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: None,
        }
    }

    pub fn with_nodes(name: impl Into<String>, nodes: Vec<MaterialNode>) -> Self {
        Self {
            name: name.into(),
            nodes: Some(nodes),
        }
    }

    pub fn use_nodes(&self) -> bool {
        self.nodes.is_some()
    }

    pub fn nodes(&self) -> &[MaterialNode] {
        self.nodes.as_deref().unwrap_or_default()
    }

    /// First node in document order exposing an image source
    pub fn first_image_source(&self) -> Option<&ImageRef> {
        self.nodes().iter().find_map(|n| n.as_image_source())
    }
}

/// Named vertex group with per-vertex weights.
///
/// Assignment overwrites: re-assigning an index keeps the weight bounded
/// instead of accumulating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexGroup {
    pub name: String,
    weights: BTreeMap<u32, f32>,
}

impl VertexGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weights: BTreeMap::new(),
        }
    }

    pub fn assign(&mut self, indices: impl IntoIterator<Item = u32>, weight: f32) {
        for index in indices {
            self.weights.insert(index, weight);
        }
    }

    pub fn weight(&self, index: u32) -> Option<f32> {
        self.weights.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.weights.iter().map(|(&i, &w)| (i, w))
    }
}

/// Modifier binding a mesh to an armature through a vertex group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmatureModifier {
    pub name: String,
    /// Name of the armature object in the scene
    pub object: String,
    pub vertex_group: String,
    pub use_vertex_groups: bool,
}

/// Mesh geometry plus everything hanging off it
#[derive(Debug, Clone, Default)]
pub struct MeshObject {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub materials: Vec<Material>,
    pub vertex_groups: Vec<VertexGroup>,
    pub modifiers: Vec<ArmatureModifier>,
}

impl MeshObject {
    /// Find a vertex group by name
    pub fn vertex_group(&self, name: &str) -> Option<&VertexGroup> {
        self.vertex_groups.iter().find(|g| g.name == name)
    }
}

/// A deformation joint
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub head: [f32; 3],
    pub tail: [f32; 3],
}

/// Transform component an animation channel drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformComponent {
    LocationX,
    LocationY,
    LocationZ,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
}

/// One animation channel: a single transform component of a single bone
#[derive(Debug, Clone, PartialEq)]
pub struct FCurve {
    pub bone: String,
    pub component: TransformComponent,
    pub keyframes: Vec<Keyframe>,
}

/// Animation clip container
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub channels: Vec<FCurve>,
}

impl Action {
    /// Pose of `bone` at `frame`: local position offset from the bind pose.
    ///
    /// Channels with no keyframe at or before `frame` contribute nothing.
    pub fn sample_position(&self, bone: &str, frame: f32) -> [f32; 3] {
        let mut position = [0.0f32; 3];
        for channel in self.channels.iter().filter(|c| c.bone == bone) {
            let value = channel
                .keyframes
                .iter()
                .filter(|k| k.frame <= frame)
                .map(|k| k.value)
                .next_back();
            if let Some(value) = value {
                match channel.component {
                    TransformComponent::LocationX => position[0] = value,
                    TransformComponent::LocationY => position[1] = value,
                    TransformComponent::LocationZ => position[2] = value,
                }
            }
        }
        position
    }
}

/// Skeleton object: bones plus an optional animation clip
#[derive(Debug, Clone, Default)]
pub struct Armature {
    bones: Vec<Bone>,
    pub action: Option<Action>,
}

impl Armature {
    /// Add a bone; bone names are unique within one armature.
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        head: [f32; 3],
        tail: [f32; 3],
    ) -> Result<(), SceneError> {
        let name = name.into();
        if self.bones.iter().any(|b| b.name == name) {
            return Err(SceneError::DuplicateBone(name));
        }
        self.bones.push(Bone { name, head, tail });
        Ok(())
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }
}

/// Payload of a scene object
#[derive(Debug, Clone)]
pub enum ObjectData {
    Mesh(MeshObject),
    Armature(Armature),
}

/// One object in the scene
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    /// Objects outside the active view layer are excluded from merging
    pub in_view_layer: bool,
    pub data: ObjectData,
}

impl SceneObject {
    pub fn mesh(name: impl Into<String>, mesh: MeshObject) -> Self {
        Self {
            name: name.into(),
            in_view_layer: true,
            data: ObjectData::Mesh(mesh),
        }
    }

    pub fn armature(name: impl Into<String>, armature: Armature) -> Self {
        Self {
            name: name.into(),
            in_view_layer: true,
            data: ObjectData::Armature(armature),
        }
    }
}

/// The scene context threaded through the pipeline stages
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all scene content; run before an asset is loaded so successive
    /// invocations sharing one scene cannot contaminate each other.
    pub fn reset(&mut self) {
        self.objects.clear();
    }

    pub fn add_object(&mut self, object: SceneObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> Option<&SceneObject> {
        self.objects.get(index)
    }

    pub fn object_mut(&mut self, index: usize) -> Option<&mut SceneObject> {
        self.objects.get_mut(index)
    }

    pub fn mesh(&self, index: usize) -> Option<&MeshObject> {
        match self.objects.get(index)?.data {
            ObjectData::Mesh(ref mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self, index: usize) -> Option<&mut MeshObject> {
        match self.objects.get_mut(index)?.data {
            ObjectData::Mesh(ref mut mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn armature(&self, index: usize) -> Option<&Armature> {
        match self.objects.get(index)?.data {
            ObjectData::Armature(ref armature) => Some(armature),
            _ => None,
        }
    }

    /// Merge every mesh object in the active view layer into exactly one mesh
    /// object, and return its index.
    ///
    /// Vertex and triangle ranges are appended in object order, material slot
    /// tables are unioned (deduplicated by material name) with triangle slots
    /// remapped, and vertex indices are stable afterwards. The merged object
    /// keeps the first contributing object's name.
    pub fn merge_meshes(&mut self) -> Result<usize, SceneError> {
        let mut sources = Vec::new();
        let mut kept = Vec::new();

        for object in self.objects.drain(..) {
            match object.data {
                ObjectData::Mesh(mesh) if object.in_view_layer => {
                    sources.push((object.name, mesh));
                }
                _ => kept.push(object),
            }
        }

        if sources.is_empty() {
            self.objects = kept;
            return Err(SceneError::NoMeshObjects);
        }

        let name = sources[0].0.clone();
        let mut merged = MeshObject::default();

        for (_, mesh) in sources {
            let vertex_base = merged.vertices.len() as u32;

            // Union material slots, remembering where each source slot landed
            let mut slot_map = Vec::with_capacity(mesh.materials.len());
            for material in mesh.materials {
                let index = match merged.materials.iter().position(|m| m.name == material.name) {
                    Some(index) => index,
                    None => {
                        merged.materials.push(material);
                        merged.materials.len() - 1
                    }
                };
                slot_map.push(index);
            }

            merged.vertices.extend(mesh.vertices);
            for triangle in mesh.triangles {
                merged.triangles.push(Triangle {
                    indices: [
                        triangle.indices[0] + vertex_base,
                        triangle.indices[1] + vertex_base,
                        triangle.indices[2] + vertex_base,
                    ],
                    slot: triangle.slot.and_then(|s| slot_map.get(s).copied()),
                });
            }
        }

        self.objects = kept;
        Ok(self.add_object(SceneObject::mesh(name, merged)))
    }
}

/// Import a mesh file into the scene, dispatching on the file extension.
///
/// `scale` is applied uniformly to vertex positions.
pub fn import(scene: &mut Scene, path: &Path, scale: f32) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "obj" => obj::import(scene, path, scale)
            .with_context(|| format!("Failed to import OBJ: {}", path.display())),
        "gltf" | "glb" => gltf::import(scene, path, scale)
            .with_context(|| format!("Failed to import glTF: {}", path.display())),
        _ => bail!(
            "Unsupported mesh format '{}': {} (use .obj, .gltf, or .glb)",
            ext,
            path.display()
        ),
    }
}
