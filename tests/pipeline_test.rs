//! Integration tests for the full conversion pipeline.
//!
//! External tools are replaced by mocks: the converter fakes the `.vtf`
//! output, the compiler drops a fake `.mdl` into the game content tree so
//! relocation has something to move.

use anyhow::Result;
use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

use mdlforge::{
    ModelCompiler, ModelConstants, Pipeline, PipelineConfig, Scene, TextureConverter,
};

/// Converter mock: records calls and fakes the converted texture
#[derive(Default)]
struct MockConverter {
    calls: RefCell<Vec<PathBuf>>,
}

impl TextureConverter for MockConverter {
    fn convert(&self, source: &Path, dest_dir: &Path) -> Result<()> {
        self.calls.borrow_mut().push(source.to_path_buf());
        let stem = source.file_stem().unwrap().to_string_lossy();
        std::fs::write(dest_dir.join(format!("{stem}.vtf")), b"vtf")?;
        Ok(())
    }
}

/// Compiler mock: writes a fake compiled model where studiomdl would
struct MockCompiler {
    game_dir: PathBuf,
    calls: RefCell<usize>,
}

impl MockCompiler {
    fn new(game_dir: PathBuf) -> Self {
        Self {
            game_dir,
            calls: RefCell::new(0),
        }
    }
}

impl ModelCompiler for MockCompiler {
    fn compile(&self, qc_path: &Path) -> Result<()> {
        *self.calls.borrow_mut() += 1;
        let asset = qc_path.file_stem().unwrap().to_string_lossy().to_string();
        let out_dir = self
            .game_dir
            .join("models")
            .join("dynamic")
            .join("objects")
            .join(&asset);
        std::fs::create_dir_all(&out_dir)?;
        std::fs::write(out_dir.join(format!("{asset}.mdl")), b"IDST")?;
        Ok(())
    }
}

struct TestRun {
    _dir: TempDir,
    source: PathBuf,
    dest: PathBuf,
    engine: PathBuf,
    game_dir: PathBuf,
}

impl TestRun {
    fn new(source_name: &str) -> Self {
        let dir = tempdir().expect("Failed to create temp dir");
        let engine = dir.path().join("engine/bin");
        let game_dir = dir.path().join("engine/garrysmod");
        std::fs::create_dir_all(&engine).unwrap();
        std::fs::create_dir_all(&game_dir).unwrap();
        Self {
            source: dir.path().join(source_name),
            dest: dir.path().join("out"),
            engine,
            game_dir,
            _dir: dir,
        }
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig {
            source: self.source.clone(),
            dest_root: self.dest.clone(),
            engine_path: self.engine.clone(),
            import_scale: 1.0,
            game: "garrysmod".to_string(),
        }
    }
}

/// Two-material quad: one textured, one flat
fn generate_chair_obj(run: &TestRun) {
    let mtl_path = run.source.with_extension("mtl");
    let mut mtl = File::create(&mtl_path).unwrap();
    writeln!(mtl, "newmtl wood_mat").unwrap();
    writeln!(mtl, "map_Kd wood.png").unwrap();
    writeln!(mtl, "newmtl plain").unwrap();
    writeln!(mtl, "Kd 0.8 0.8 0.8").unwrap();

    let mut obj = File::create(&run.source).unwrap();
    writeln!(obj, "mtllib chair.mtl").unwrap();
    for v in ["0 0 0", "1 0 0", "1 1 0", "0 1 0"] {
        writeln!(obj, "v {v}").unwrap();
    }
    for vt in ["0 0", "1 0", "1 1", "0 1"] {
        writeln!(obj, "vt {vt}").unwrap();
    }
    writeln!(obj, "vn 0 0 1").unwrap();
    writeln!(obj, "usemtl wood_mat").unwrap();
    writeln!(obj, "f 1/1/1 2/2/1 3/3/1").unwrap();
    writeln!(obj, "usemtl plain").unwrap();
    writeln!(obj, "f 1/1/1 3/3/1 4/4/1").unwrap();
}

/// Triangle with no materials at all
fn generate_bare_obj(run: &TestRun) {
    let mut obj = File::create(&run.source).unwrap();
    writeln!(obj, "v 0 0 0").unwrap();
    writeln!(obj, "v 1 0 0").unwrap();
    writeln!(obj, "v 0 1 0").unwrap();
    writeln!(obj, "f 1 2 3").unwrap();
}

/// Minimal glTF: one non-indexed triangle, a material without textures
fn generate_tri_gltf(run: &TestRun) {
    let bin_path = run.source.with_file_name("tri.bin");
    let mut bin = Vec::new();
    for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for c in v {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    std::fs::write(&bin_path, &bin).unwrap();

    let gltf = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "mesh": 0 }],
  "meshes": [{
    "name": "tri",
    "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }]
  }],
  "materials": [{ "name": "tri_mat" }],
  "buffers": [{ "uri": "tri.bin", "byteLength": 36 }],
  "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
  "accessors": [{
    "bufferView": 0,
    "componentType": 5126,
    "count": 3,
    "type": "VEC3",
    "min": [0.0, 0.0, 0.0],
    "max": [1.0, 1.0, 0.0]
  }]
}"#;
    std::fs::write(&run.source, gltf).unwrap();
}

#[test]
fn obj_pipeline_produces_the_full_bundle() {
    let run = TestRun::new("chair.obj");
    generate_chair_obj(&run);

    let converter = MockConverter::default();
    let compiler = MockCompiler::new(run.game_dir.clone());
    let pipeline = Pipeline::new(
        run.config(),
        ModelConstants::default(),
        &converter,
        &compiler,
    );

    let mut scene = Scene::new();
    let summary = pipeline.run(&mut scene).expect("pipeline failed");
    assert_eq!(summary.asset, "chair");

    let root = run.dest.join("chair");
    // Descriptor directory: QC plus both SMD exports
    let qc = std::fs::read_to_string(root.join("descriptors/chair.qc")).unwrap();
    assert!(qc.contains("$modelname \"dynamic/objects/chair/chair.mdl\""));
    assert_eq!(qc.matches("$sequence \"idle\"").count(), 1);
    let smd = std::fs::read_to_string(root.join("descriptors/chair.smd")).unwrap();
    assert!(smd.starts_with("version 1\n"));
    assert!(smd.contains("\nwood\n"));
    assert!(root.join("descriptors/anims/idle.smd").exists());

    // Materials: only the textured slot produced a descriptor + texture
    let materials = root.join("materials/models/chair");
    let vmt = std::fs::read_to_string(materials.join("wood.vmt")).unwrap();
    assert!(vmt.contains("\"$basetexture\" \"models/chair/wood\""));
    assert!(materials.join("wood.vtf").exists());
    assert_eq!(summary.materials.len(), 1);
    assert_eq!(converter.calls.borrow().len(), 1);

    // Compiled model relocated out of the game tree
    assert!(root.join("models/dynamic/objects/chair/chair.mdl").exists());
    assert!(!run.game_dir.join("models/dynamic").exists());
    assert_eq!(*compiler.calls.borrow(), 1);
}

#[test]
fn zero_material_mesh_still_completes() {
    let run = TestRun::new("crate.obj");
    generate_bare_obj(&run);

    let converter = MockConverter::default();
    let compiler = MockCompiler::new(run.game_dir.clone());
    let pipeline = Pipeline::new(
        run.config(),
        ModelConstants::default(),
        &converter,
        &compiler,
    );

    let summary = pipeline.run(&mut Scene::new()).expect("pipeline failed");

    assert!(summary.materials.is_empty());
    assert!(converter.calls.borrow().is_empty());
    // No material descriptors were produced
    let materials = run.dest.join("crate/materials/models/crate");
    assert_eq!(std::fs::read_dir(materials).unwrap().count(), 0);
    // The bundle still compiled and relocated
    assert!(run
        .dest
        .join("crate/models/dynamic/objects/crate/crate.mdl")
        .exists());
}

#[test]
fn rerun_skips_texture_conversion() {
    let run = TestRun::new("chair.obj");
    generate_chair_obj(&run);

    let converter = MockConverter::default();
    let compiler = MockCompiler::new(run.game_dir.clone());
    let pipeline = Pipeline::new(
        run.config(),
        ModelConstants::default(),
        &converter,
        &compiler,
    );

    pipeline.run(&mut Scene::new()).expect("first run failed");
    pipeline.run(&mut Scene::new()).expect("second run failed");

    // The existing .vtf short-circuited the second conversion
    assert_eq!(converter.calls.borrow().len(), 1);
    assert!(run
        .dest
        .join("chair/models/dynamic/objects/chair/chair.mdl")
        .exists());
}

#[test]
fn gltf_pipeline_imports_and_completes() {
    let run = TestRun::new("tri.gltf");
    generate_tri_gltf(&run);

    let converter = MockConverter::default();
    let compiler = MockCompiler::new(run.game_dir.clone());
    let pipeline = Pipeline::new(
        run.config(),
        ModelConstants::default(),
        &converter,
        &compiler,
    );

    let summary = pipeline.run(&mut Scene::new()).expect("pipeline failed");

    // A material without texture bindings yields no descriptors
    assert!(summary.materials.is_empty());

    let smd = std::fs::read_to_string(run.dest.join("tri/descriptors/tri.smd")).unwrap();
    // One triangle, every vertex bound to the root bone at full weight
    assert_eq!(smd.matches(" 1 0 1.000000\n").count(), 3);
    assert!(smd.contains("\ntri_mat\n"));
}

#[test]
fn unsupported_source_format_is_rejected() {
    let run = TestRun::new("chair.fbx");
    std::fs::write(&run.source, b"fbx").unwrap();

    let converter = MockConverter::default();
    let compiler = MockCompiler::new(run.game_dir.clone());
    let pipeline = Pipeline::new(
        run.config(),
        ModelConstants::default(),
        &converter,
        &compiler,
    );

    let err = pipeline.run(&mut Scene::new()).unwrap_err();
    assert!(err.to_string().contains("Unsupported mesh format"));
}
