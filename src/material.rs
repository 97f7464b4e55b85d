//! Per-material texture extraction.
//!
//! Walks each material slot in order, derives the canonical texture name from
//! the first image-bearing node, writes the VMT descriptor, and converts the
//! source image unless the converted texture already exists. Two slots
//! resolving to the same image stem overwrite each other's descriptor; the
//! later slot wins.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::scene::MeshObject;
use crate::tools::TextureConverter;

/// Extension of material descriptor files
pub const DESCRIPTOR_EXT: &str = "vmt";
/// Extension of converted engine textures
pub const TEXTURE_EXT: &str = "vtf";

/// Outcome of extracting one material slot
#[derive(Debug, Clone)]
pub struct ExtractedMaterial {
    /// Canonical texture name (image file stem); the material is renamed to
    /// this
    pub texture_name: String,
    /// Written VMT descriptor path
    pub descriptor: PathBuf,
    /// Whether the converter ran (false when the texture already existed)
    pub converted: bool,
}

/// Render the VMT descriptor for one texture of an asset
pub fn render_vmt(asset: &str, texture_name: &str) -> String {
    format!(
        r#""VertexLitGeneric"
{{
    "$model" "1"
    "$basetexture" "models/{asset}/{texture_name}"
}}"#
    )
}

/// Extract every material slot on the mesh.
///
/// Non-node materials and node materials without a discoverable image are
/// silently skipped; they leave no descriptor behind.
pub fn extract_all(
    mesh: &mut MeshObject,
    asset: &str,
    materials_dir: &Path,
    converter: &dyn TextureConverter,
) -> Result<Vec<ExtractedMaterial>> {
    let mut extracted = Vec::new();

    for material in mesh.materials.iter_mut() {
        if !material.use_nodes() {
            tracing::debug!("Skipping material '{}': no node graph", material.name);
            continue;
        }

        let Some(image) = material.first_image_source() else {
            tracing::debug!("Skipping material '{}': no image source", material.name);
            continue;
        };
        let source = image.path.clone();
        let Some(texture_name) = image.stem() else {
            tracing::warn!(
                "Skipping material '{}': image path has no stem: {}",
                material.name,
                source.display()
            );
            continue;
        };

        material.name = texture_name.clone();

        let descriptor = materials_dir.join(format!("{texture_name}.{DESCRIPTOR_EXT}"));
        std::fs::write(&descriptor, render_vmt(asset, &texture_name))
            .with_context(|| format!("Failed to write material descriptor: {}", descriptor.display()))?;

        // Presence check, not a content hash: an already-converted texture is
        // never re-converted
        let target = materials_dir.join(format!("{texture_name}.{TEXTURE_EXT}"));
        let converted = if target.exists() {
            tracing::debug!("Texture already converted: {}", target.display());
            false
        } else {
            converter.convert(&source, materials_dir)?;
            true
        };

        tracing::info!("Material '{}' -> {}", texture_name, descriptor.display());
        extracted.push(ExtractedMaterial {
            texture_name,
            descriptor,
            converted,
        });
    }

    Ok(extracted)
}
