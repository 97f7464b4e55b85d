//! Pipeline orchestration.
//!
//! Strictly sequential stages, each consuming the previous stage's
//! postcondition:
//! reset -> layout -> descriptor draft -> import -> merge -> rig ->
//! materials -> export -> compile -> relocate.
//!
//! There is no rollback; a failed one-shot run leaves the workspace
//! partially populated, and re-running regenerates everything except
//! already-converted textures.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{ExportConfig, ExportFormat, ModelConstants, PipelineConfig};
use crate::material::{self, ExtractedMaterial};
use crate::qc;
use crate::rig;
use crate::scene::{self, Scene};
use crate::smd;
use crate::tools::{ModelCompiler, TextureConverter};
use crate::workspace::AssetWorkspace;

/// What a completed run produced
#[derive(Debug)]
pub struct BuildSummary {
    pub asset: String,
    pub workspace: AssetWorkspace,
    pub descriptor: PathBuf,
    pub materials: Vec<ExtractedMaterial>,
    /// Relocated compiled-model directory inside the workspace
    pub model_dir: PathBuf,
}

/// The asset conversion pipeline
pub struct Pipeline<'t> {
    config: PipelineConfig,
    constants: ModelConstants,
    converter: &'t dyn TextureConverter,
    compiler: &'t dyn ModelCompiler,
}

impl<'t> Pipeline<'t> {
    pub fn new(
        config: PipelineConfig,
        constants: ModelConstants,
        converter: &'t dyn TextureConverter,
        compiler: &'t dyn ModelCompiler,
    ) -> Self {
        Self {
            config,
            constants,
            converter,
            compiler,
        }
    }

    /// Run every stage for the configured asset.
    pub fn run(&self, scene: &mut Scene) -> Result<BuildSummary> {
        let asset = self.config.asset_name()?;
        tracing::info!("Building asset '{}'", asset);

        // Reset: no cross-asset contamination when one scene serves
        // successive runs
        scene.reset();

        // Layout
        let workspace = AssetWorkspace::create(&self.config.dest_root, &asset)?;

        // Descriptor draft
        let descriptor = qc::write(&workspace, &asset, &self.constants)?;

        // Import + merge
        tracing::info!("Importing {}", self.config.source.display());
        scene::import(scene, &self.config.source, self.config.import_scale)?;
        let mesh_index = scene.merge_meshes().context("Merge failed")?;

        // Rig
        let armature_index = rig::synthesize(scene, mesh_index)?;

        // Materials
        let mesh = scene
            .mesh_mut(mesh_index)
            .context("Merged mesh disappeared from the scene")?;
        let materials = material::extract_all(mesh, &asset, &workspace.materials, self.converter)?;

        // Export
        let export_config = ExportConfig {
            format: ExportFormat::Smd,
            path: workspace.descriptors.clone(),
            engine_path: self.config.engine_path.clone(),
        };
        smd::export(scene, mesh_index, armature_index, &export_config, &asset)?;

        // Compile
        tracing::info!("Compiling {}", descriptor.display());
        self.compiler.compile(&descriptor)?;

        // Relocate
        let model_dir = self.relocate(&workspace)?;

        Ok(BuildSummary {
            asset,
            workspace,
            descriptor,
            materials,
            model_dir,
        })
    }

    /// Move the compiler's output tree from the game content directory into
    /// the workspace.
    fn relocate(&self, workspace: &AssetWorkspace) -> Result<PathBuf> {
        let subtree = self.constants.prefix_root();
        let source = self
            .config
            .game_content_dir()
            .join("models")
            .join(subtree);
        let dest = workspace.models.join(subtree);

        move_tree(&source, &dest).with_context(|| {
            format!(
                "Failed to relocate compiled models from {}",
                source.display()
            )
        })?;
        tracing::info!("Relocated compiled models to {}", dest.display());
        Ok(dest)
    }
}

/// Move a directory tree, falling back to copy + delete when a plain rename
/// is not possible (cross-device destinations, pre-existing output from a
/// prior run).
fn move_tree(source: &Path, dest: &Path) -> Result<()> {
    if std::fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    for entry in walkdir::WalkDir::new(source) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .expect("walkdir yields children of its root");
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy to {}", target.display()))?;
        }
    }
    std::fs::remove_dir_all(source)
        .with_context(|| format!("Failed to remove {}", source.display()))?;
    Ok(())
}
