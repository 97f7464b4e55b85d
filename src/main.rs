//! mdlforge - Source model build tool
//!
//! Converts one authored mesh file (glTF/GLB/OBJ) into a packaged engine
//! model bundle: rigged SMD export, VMT/VTF materials, QC build descriptor,
//! and the compiled MDL relocated into a per-asset directory tree.
//!
//! # Usage
//!
//! ```bash
//! # Build a bundle under ./out/chair/ using the engine in /engine/bin
//! mdlforge assets/chair.glb out /engine/bin
//!
//! # Override descriptor constants and tool paths
//! mdlforge assets/chair.glb out /engine/bin --manifest chair.toml
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use mdlforge::{ForgeManifest, Pipeline, PipelineConfig, Scene, StudioMdl, VtfCmd};

/// Source model build tool
#[derive(Parser)]
#[command(name = "mdlforge")]
#[command(about = "Converts authored meshes into compiled engine model bundles")]
#[command(version)]
struct Cli {
    /// Source mesh file (glTF/GLB/OBJ)
    source: PathBuf,

    /// Destination root; the bundle is written to <dest>/<asset>/
    dest: PathBuf,

    /// Engine installation directory (contains studiomdl)
    engine: PathBuf,

    /// Manifest overriding descriptor constants and tool paths
    /// (defaults to mdlforge.toml next to the source, when present)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Import scale applied to vertex positions (overrides the manifest)
    #[arg(long)]
    scale: Option<f32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    let manifest = ForgeManifest::resolve(cli.manifest.as_deref(), &cli.source)?;

    let config = PipelineConfig {
        source: cli.source,
        dest_root: cli.dest,
        engine_path: cli.engine,
        import_scale: cli.scale.unwrap_or(manifest.import.scale),
        game: manifest.tools.game.clone(),
    };

    let converter = VtfCmd::locate(manifest.tools.vtfcmd.as_deref())?;
    let compiler = StudioMdl::locate(
        &config.engine_path,
        config.game_content_dir(),
        manifest.tools.studiomdl.as_deref(),
    )?;

    let pipeline = Pipeline::new(config, manifest.model, &converter, &compiler);
    let mut scene = Scene::new();
    let summary = pipeline.run(&mut scene)?;

    println!();
    println!("Packaged: {}", summary.workspace.root.display());
    println!("  Descriptor: {}", summary.descriptor.display());
    println!("  Materials: {}", summary.materials.len());
    println!("  Models: {}", summary.model_dir.display());

    Ok(())
}
