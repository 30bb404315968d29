//! Scene description files through to GLB files on disk

use std::fs;

use glb_bake::{ExportSettings, PropertyTable, SkipReason};
use glb_bake_cli::{export_file, export_scene, SceneDescription};
use tempfile::tempdir;

/// Two copies of a rig sharing one clip, plus a cube mesh with a smile
const SCENE: &str = r#"{
    "nodes": [
        { "name": "Rig", "children": [1] },
        { "name": "Arm", "translation": [0.0, 1.0, 0.0] },
        { "name": "Copy", "children": [3] },
        { "name": "Arm", "translation": [0.0, 1.0, 0.0] },
        { "name": "Face", "mesh": 0 }
    ],
    "meshes": [
        {
            "name": "Face",
            "blend_shapes": ["Smile"],
            "blend_shape_weight_range": 100.0,
            "primitives": [{
                "positions": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
                "indices": [0, 1, 2],
                "material": 0,
                "targets": [{ "positions": [[0, 0, 0], [0, 0.5, 0], [0, 0, 0]] }]
            }]
        }
    ],
    "materials": [{ "name": "Skin" }],
    "clips": [
        {
            "id": 1, "name": "Raise", "length": 1.0,
            "curves": [
                { "path": "Arm", "kind": "node", "property": "m_LocalPosition.y",
                  "curve": [
                    { "time": 0.0, "value": 1.0, "in_mode": "linear", "out_mode": "linear" },
                    { "time": 1.0, "value": 2.0, "in_mode": "linear", "out_mode": "linear" }
                  ] }
            ]
        },
        {
            "id": 2, "name": "Smile", "length": 0.5,
            "curves": [
                { "kind": "skinned_mesh", "property": "blendShape.Smile",
                  "curve": [
                    { "time": 0.0, "value": 0.0, "in_mode": "linear", "out_mode": "linear" },
                    { "time": 0.5, "value": 100.0, "in_mode": "linear", "out_mode": "linear" }
                  ] }
            ]
        }
    ],
    "animations": [
        { "clip": 1, "root": 0 },
        { "clip": 1, "root": 2 },
        { "clip": 2, "root": 4 }
    ]
}"#;

fn export(source: &str, settings: ExportSettings) -> glb_bake_cli::ExportedScene {
    let description = SceneDescription::from_json_str(source).unwrap();
    export_scene(&description, settings, PropertyTable::builtin().unwrap()).unwrap()
}

#[test]
fn test_export_file_writes_importable_glb() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("scene.json");
    let output = dir.path().join("scene.glb");
    fs::write(&input, SCENE).unwrap();

    let report = export_file(
        &input,
        &output,
        ExportSettings::default(),
        PropertyTable::builtin().unwrap(),
    )
    .unwrap();
    assert!(report.is_clean(), "{:?}", report.warnings);

    let glb = fs::read(&output).unwrap();
    assert_eq!(&glb[0..4], b"glTF");
    let (document, _, _) = gltf::import_slice(&glb).expect("GLB should import");

    assert_eq!(document.nodes().count(), 5);
    assert_eq!(document.scenes().next().unwrap().nodes().count(), 3);
    assert_eq!(document.meshes().count(), 1);
    assert_eq!(document.materials().count(), 1);
    assert_eq!(document.animations().count(), 3);
}

#[test]
fn test_clip_on_second_root_targets_its_own_nodes() {
    let exported = export(SCENE, ExportSettings::default());
    let (document, _, _) = gltf::import_slice(&exported.glb).unwrap();

    let targets: Vec<Vec<usize>> = document
        .animations()
        .take(2)
        .map(|a| a.channels().map(|c| c.target().node().index()).collect())
        .collect();
    assert_eq!(targets, [vec![1], vec![3]]);
}

#[test]
fn test_blend_shape_weights_are_normalized() {
    let exported = export(SCENE, ExportSettings::default());
    let (document, buffers, _) = gltf::import_slice(&exported.glb).unwrap();

    let smile = document.animations().nth(2).unwrap();
    assert_eq!(smile.name(), Some("Smile"));
    let channel = smile.channels().next().unwrap();
    assert_eq!(channel.target().node().index(), 4);
    assert_eq!(
        channel.target().property(),
        gltf::animation::Property::MorphTargetWeights
    );

    let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
    let Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(weights)) = reader.read_outputs()
    else {
        panic!("expected weight outputs");
    };
    let weights: Vec<f32> = weights.into_f32().collect();
    assert_eq!(weights[0], 0.0);
    assert!((weights.last().unwrap() - 1.0).abs() < 1e-6);

    let mesh = document.meshes().next().unwrap();
    assert_eq!(mesh.weights(), Some(&[0.0][..]));
}

#[test]
fn test_excluded_node_is_reported() {
    let source = SCENE.replace(
        r#"{ "name": "Arm", "translation": [0.0, 1.0, 0.0] },
        { "name": "Copy""#,
        r#"{ "name": "Arm", "translation": [0.0, 1.0, 0.0], "exclude": true },
        { "name": "Copy""#,
    );
    let exported = export(&source, ExportSettings::default());

    assert_eq!(exported.report.count(&SkipReason::TargetNotExported), 1);
    let (document, _, _) = gltf::import_slice(&exported.glb).unwrap();
    assert_eq!(document.nodes().count(), 4);
    // the first rig's clip had nothing left to export
    assert_eq!(document.animations().count(), 2);
}

#[test]
fn test_missing_input_is_an_error() {
    let dir = tempdir().unwrap();
    let err = export_file(
        &dir.path().join("missing.json"),
        &dir.path().join("out.glb"),
        ExportSettings::default(),
        PropertyTable::builtin().unwrap(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("missing.json"));
}
