//! External tool invocation.
//!
//! The texture converter and model compiler run synchronously through
//! `std::process::Command`; exit status is checked and captured output rides
//! along in the error chain instead of being dropped.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Converts a source image into the engine texture format, producing one
/// file in the destination directory with the source's stem and a `.vtf`
/// extension.
pub trait TextureConverter {
    fn convert(&self, source: &Path, dest_dir: &Path) -> Result<()>;
}

/// Compiles a build descriptor into the game content tree.
pub trait ModelCompiler {
    fn compile(&self, qc_path: &Path) -> Result<()>;
}

/// The VTFCmd texture converter
#[derive(Debug, Clone)]
pub struct VtfCmd {
    exe: PathBuf,
}

impl VtfCmd {
    pub fn new(exe: PathBuf) -> Self {
        Self { exe }
    }

    /// Use the explicit executable when configured, otherwise find `vtfcmd`
    /// on PATH.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(exe) => Ok(Self::new(exe.to_path_buf())),
            None => {
                let exe = which::which("vtfcmd")
                    .context("vtfcmd not found on PATH (set [tools].vtfcmd in mdlforge.toml)")?;
                Ok(Self::new(exe))
            }
        }
    }
}

impl TextureConverter for VtfCmd {
    fn convert(&self, source: &Path, dest_dir: &Path) -> Result<()> {
        let output = Command::new(&self.exe)
            .arg("-file")
            .arg(source)
            .arg("-output")
            .arg(dest_dir)
            .output()
            .with_context(|| format!("Failed to execute {}", self.exe.display()))?;

        tracing::debug!(
            "vtfcmd {}: {}",
            source.display(),
            String::from_utf8_lossy(&output.stdout).trim()
        );

        if !output.status.success() {
            bail!(
                "Texture conversion failed for {} (exit: {}):\n{}",
                source.display(),
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// The studiomdl model compiler
#[derive(Debug, Clone)]
pub struct StudioMdl {
    exe: PathBuf,
    game_dir: PathBuf,
}

impl StudioMdl {
    pub fn new(exe: PathBuf, game_dir: PathBuf) -> Self {
        Self { exe, game_dir }
    }

    /// Use the explicit executable when configured, otherwise look for
    /// `studiomdl` (or `studiomdl.exe`) inside the engine installation,
    /// falling back to PATH.
    pub fn locate(engine_path: &Path, game_dir: PathBuf, explicit: Option<&Path>) -> Result<Self> {
        if let Some(exe) = explicit {
            return Ok(Self::new(exe.to_path_buf(), game_dir));
        }

        for candidate in ["studiomdl", "studiomdl.exe"] {
            let exe = engine_path.join(candidate);
            if exe.is_file() {
                return Ok(Self::new(exe, game_dir));
            }
        }

        let exe = which::which("studiomdl").with_context(|| {
            format!(
                "studiomdl not found in {} or on PATH",
                engine_path.display()
            )
        })?;
        Ok(Self::new(exe, game_dir))
    }
}

impl ModelCompiler for StudioMdl {
    fn compile(&self, qc_path: &Path) -> Result<()> {
        let output = Command::new(&self.exe)
            .arg("-game")
            .arg(&self.game_dir)
            .arg("-nop4")
            .arg("-verbose")
            .arg(qc_path)
            .output()
            .with_context(|| format!("Failed to execute {}", self.exe.display()))?;

        tracing::debug!(
            "studiomdl {}: {}",
            qc_path.display(),
            String::from_utf8_lossy(&output.stdout).trim()
        );

        if !output.status.success() {
            bail!(
                "Model compilation failed for {} (exit: {}):\n{}{}",
                qc_path.display(),
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                String::from_utf8_lossy(&output.stdout).trim(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
