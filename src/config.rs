//! Pipeline configuration and the optional mdlforge.toml manifest.
//!
//! Every descriptor constant the QC template uses lives in [`ModelConstants`]
//! so a manifest can override it; the defaults are the values the pipeline has
//! always emitted.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Manifest file looked up next to the source asset when `--manifest` is not
/// given.
pub const MANIFEST_FILE: &str = "mdlforge.toml";

/// Top-level pipeline inputs: the three order-fixed invocation parameters plus
/// the import scale.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source mesh file (glTF/GLB/OBJ)
    pub source: PathBuf,
    /// Destination root; the bundle is written to `<dest>/<asset>/`
    pub dest_root: PathBuf,
    /// Engine installation directory (contains the model compiler)
    pub engine_path: PathBuf,
    /// Uniform scale applied to imported vertex positions
    pub import_scale: f32,
    /// Game content directory name, resolved as a sibling of the engine
    /// installation
    pub game: String,
}

impl PipelineConfig {
    /// Derive the asset stem name from the source file path
    pub fn asset_name(&self) -> Result<String> {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty());
        stem.with_context(|| {
            format!(
                "Cannot derive an asset name from source path: {}",
                self.source.display()
            )
        })
    }

    /// Game content directory next to the engine installation
    /// (e.g. `<engine>/../garrysmod`)
    pub fn game_content_dir(&self) -> PathBuf {
        match self.engine_path.parent() {
            Some(parent) => parent.join(&self.game),
            None => PathBuf::from(&self.game),
        }
    }
}

/// Interchange format for the mesh export stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Studiomdl data (text) - the only format the compiler consumes
    #[default]
    Smd,
}

/// Export-stage configuration, threaded into the exporter instead of being
/// assigned onto scene globals
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// Directory the exporter writes into (the workspace descriptor dir)
    pub path: PathBuf,
    pub engine_path: PathBuf,
}

/// Axis-aligned box used for the fixed descriptor bounds
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    pub const ZERO: BoundingBox = BoundingBox {
        min: [0.0; 3],
        max: [0.0; 3],
    };
}

/// Root bone definition line parameters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DefineBone {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub fixup_position: [f32; 3],
    pub fixup_rotation: [f32; 3],
}

impl Default for DefineBone {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [-0.0, 0.0, 89.999985],
            fixup_position: [0.0, 0.0, 0.0],
            fixup_rotation: [-0.0, 0.0, 0.0],
        }
    }
}

/// Descriptor constants.
///
/// These are deliberately independent of the mesh geometry; the bounds fit the
/// fixed-size asset class the pipeline was built for. Override them through
/// the `[model]` manifest section when that assumption does not hold.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConstants {
    /// Model path prefix inside the game content tree
    pub prefix: String,
    pub surface_prop: String,
    pub contents: String,
    pub illum_position: [f32; 3],
    pub content_box: BoundingBox,
    pub bounding_box: BoundingBox,
    pub define_bone: DefineBone,
    pub fade_in: f32,
    pub fade_out: f32,
    pub fps: u32,
    #[serde(rename = "loop")]
    pub loop_sequence: bool,
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self {
            prefix: "dynamic/objects".to_string(),
            surface_prop: "default".to_string(),
            contents: "solid".to_string(),
            illum_position: [33.674, 0.007, 13.301],
            content_box: BoundingBox::ZERO,
            bounding_box: BoundingBox {
                min: [-57.067, -42.419, -14.332],
                max: [57.053, 109.766, 40.933],
            },
            define_bone: DefineBone::default(),
            fade_in: 0.2,
            fade_out: 0.2,
            fps: 1,
            loop_sequence: true,
        }
    }
}

impl ModelConstants {
    /// First path component of the model prefix; the compiler writes its
    /// output under `<game>/models/<root>` and relocation moves that tree.
    pub fn prefix_root(&self) -> &str {
        self.prefix.split('/').next().unwrap_or(self.prefix.as_str())
    }
}

/// Import section of the manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    /// Uniform scale applied to imported vertex positions.
    /// Default converts meters to engine units.
    pub scale: f32,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self { scale: 39.35 }
    }
}

/// External tool overrides
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// Texture converter executable (found on PATH when unset)
    pub vtfcmd: Option<PathBuf>,
    /// Model compiler executable (found in the engine directory when unset)
    pub studiomdl: Option<PathBuf>,
    /// Game content directory name next to the engine installation
    pub game: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            vtfcmd: None,
            studiomdl: None,
            game: "garrysmod".to_string(),
        }
    }
}

/// mdlforge.toml manifest structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForgeManifest {
    pub model: ModelConstants,
    pub import: ImportSection,
    pub tools: ToolsSection,
}

impl ForgeManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse mdlforge.toml")
    }

    /// Resolve the manifest for a run.
    ///
    /// An explicit path must load; otherwise a `mdlforge.toml` next to the
    /// source asset is picked up, and defaults apply when neither exists.
    pub fn resolve(explicit: Option<&Path>, source: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let sibling = source
            .parent()
            .map(|dir| dir.join(MANIFEST_FILE))
            .filter(|p| p.exists());

        match sibling {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}
