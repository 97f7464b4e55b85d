//! Per-asset output directory layout.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The three directories every bundle is built into.
///
/// Creation is recursive and idempotent; all three exist before any stage
/// writes a file.
#[derive(Debug, Clone)]
pub struct AssetWorkspace {
    /// `<dest>/<asset>`
    pub root: PathBuf,
    /// Build descriptor and mesh exports: `<root>/descriptors`
    pub descriptors: PathBuf,
    /// Material descriptors and converted textures:
    /// `<root>/materials/models/<asset>`
    pub materials: PathBuf,
    /// Compiled model artifacts after relocation: `<root>/models`
    pub models: PathBuf,
}

impl AssetWorkspace {
    /// Compute and create the workspace for an asset under `dest_root`.
    pub fn create(dest_root: &Path, asset: &str) -> Result<Self> {
        let root = dest_root.join(asset);
        let workspace = Self {
            descriptors: root.join("descriptors"),
            materials: root.join("materials").join("models").join(asset),
            models: root.join("models"),
            root,
        };

        for dir in [
            &workspace.descriptors,
            &workspace.materials,
            &workspace.models,
        ] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create workspace directory: {}", dir.display()))?;
        }

        Ok(workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_all_three_directories() {
        let dir = tempdir().unwrap();
        let workspace = AssetWorkspace::create(dir.path(), "chair").unwrap();

        assert!(workspace.descriptors.is_dir());
        assert!(workspace.materials.is_dir());
        assert!(workspace.models.is_dir());
        assert_eq!(workspace.root, dir.path().join("chair"));
        assert_eq!(
            workspace.materials,
            dir.path().join("chair/materials/models/chair")
        );
    }

    #[test]
    fn creation_is_idempotent() {
        let dir = tempdir().unwrap();
        AssetWorkspace::create(dir.path(), "chair").unwrap();
        // Pre-existing directories are not an error
        let workspace = AssetWorkspace::create(dir.path(), "chair").unwrap();
        assert!(workspace.models.is_dir());
    }
}
