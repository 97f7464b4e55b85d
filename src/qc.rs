//! QC build descriptor generation.
//!
//! Pure rendering from the asset name and the descriptor constants; nothing
//! in here reads mesh geometry. Paths inside the descriptor always use
//! forward slashes so the output is byte-stable across platforms.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::ModelConstants;
use crate::rig;
use crate::workspace::AssetWorkspace;

/// Extension of the build descriptor
pub const DESCRIPTOR_EXT: &str = "qc";

/// Render the build descriptor text for an asset
pub fn render(asset: &str, constants: &ModelConstants) -> String {
    let c = constants;
    let prefix = &c.prefix;
    let bone = &c.define_bone;

    let mut qc = String::new();
    let _ = writeln!(qc, "$modelname \"{prefix}/{asset}/{asset}.mdl\"");
    let _ = writeln!(qc, "$bodygroup \"{asset}\"");
    let _ = writeln!(qc, "{{");
    let _ = writeln!(qc, "    studio \"{asset}.smd\"");
    let _ = writeln!(qc, "}}");
    let _ = writeln!(qc, "$surfaceprop \"{}\"", c.surface_prop);
    let _ = writeln!(qc, "$contents \"{}\"", c.contents);
    let _ = writeln!(
        qc,
        "$illumposition {} {} {}",
        c.illum_position[0], c.illum_position[1], c.illum_position[2]
    );
    let _ = writeln!(qc, "$cdmaterials \"/models/{asset}/\"");
    let _ = writeln!(
        qc,
        "$cbox {} {} {} {} {} {}",
        c.content_box.min[0],
        c.content_box.min[1],
        c.content_box.min[2],
        c.content_box.max[0],
        c.content_box.max[1],
        c.content_box.max[2]
    );
    let _ = writeln!(
        qc,
        "$bbox {} {} {} {} {} {}",
        c.bounding_box.min[0],
        c.bounding_box.min[1],
        c.bounding_box.min[2],
        c.bounding_box.max[0],
        c.bounding_box.max[1],
        c.bounding_box.max[2]
    );
    let _ = writeln!(
        qc,
        "$definebone \"{}\" \"\" {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
        rig::BONE_NAME,
        bone.position[0],
        bone.position[1],
        bone.position[2],
        bone.rotation[0],
        bone.rotation[1],
        bone.rotation[2],
        bone.fixup_position[0],
        bone.fixup_position[1],
        bone.fixup_position[2],
        bone.fixup_rotation[0],
        bone.fixup_rotation[1],
        bone.fixup_rotation[2]
    );
    let _ = writeln!(qc, "$sequence \"{}\" {{", rig::ACTION_NAME);
    let _ = writeln!(qc, "    \"anims/{}.smd\"", rig::ACTION_NAME);
    let _ = writeln!(qc, "    fadein {}", c.fade_in);
    let _ = writeln!(qc, "    fadeout {}", c.fade_out);
    let _ = writeln!(qc, "    fps {}", c.fps);
    if c.loop_sequence {
        let _ = writeln!(qc, "    loop");
    }
    qc.push_str("}\n");
    qc
}

/// Render and write the descriptor into the workspace, returning its path
pub fn write(workspace: &AssetWorkspace, asset: &str, constants: &ModelConstants) -> Result<PathBuf> {
    let path = workspace
        .descriptors
        .join(format!("{asset}.{DESCRIPTOR_EXT}"));
    std::fs::write(&path, render(asset, constants))
        .with_context(|| format!("Failed to write build descriptor: {}", path.display()))?;
    Ok(path)
}
