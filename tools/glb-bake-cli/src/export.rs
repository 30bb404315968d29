//! Scene description to GLB

use std::path::Path;

use anyhow::{Context, Result};
use glam::{Quat, Vec3, Vec4};
use glb_bake::convert::{switch_handedness_quat, switch_handedness_vec3};
use glb_bake::{
    AnimationClip, ClipId, CurveBinding, Document, ExportReport, ExportSession, ExportSettings,
    Material, Node, NodeHandle, ObjectKind, ObjectRef, PropertyTable, SceneIndex,
};
use hashbrown::HashSet;

use crate::description::{PrimitiveDescription, SceneDescription};

/// Result of exporting one scene description
#[derive(Debug)]
pub struct ExportedScene {
    pub glb: Vec<u8>,
    pub report: ExportReport,
    pub animation_count: usize,
}

/// Export a description file and write the GLB to `output`
pub fn export_file(
    input: &Path,
    output: &Path,
    settings: ExportSettings,
    table: PropertyTable,
) -> Result<ExportReport> {
    let description = SceneDescription::load(input)?;
    let exported = export_scene(&description, settings, table)?;
    std::fs::write(output, &exported.glb)
        .with_context(|| format!("Failed to write output: {:?}", output))?;

    tracing::info!(
        "Wrote {:?}: {} bytes, {} animation(s)",
        output,
        exported.glb.len(),
        exported.animation_count
    );
    Ok(exported.report)
}

pub fn export_scene(
    description: &SceneDescription,
    settings: ExportSettings,
    table: PropertyTable,
) -> Result<ExportedScene> {
    let indices = node_indices(description);
    let scene = build_scene_index(description, &indices);
    let mut session = ExportSession::new(settings, table, &scene);

    for mesh in &description.meshes {
        let primitives: Vec<_> = mesh
            .primitives
            .iter()
            .map(PrimitiveDescription::builder)
            .collect();
        session.export_mesh(&mesh.name, &primitives)?;
    }

    for animation in &description.animations {
        let Some(clip) = description.clip(animation.clip) else {
            anyhow::bail!("Unknown clip {}", animation.clip);
        };
        let curves: Vec<CurveBinding> = clip
            .curves
            .iter()
            .map(|curve| CurveBinding {
                node: description
                    .resolve_path(animation.root, &curve.path)
                    .map(NodeHandle),
                ..curve.clone()
            })
            .collect();
        let resolved = AnimationClip::from_curves(
            ClipId(clip.id),
            clip.name.clone(),
            clip.length,
            curves,
            &scene,
            session.report_mut(),
        );
        let exported =
            session.export_clip(&resolved, NodeHandle(animation.root), animation.speed)?;
        if exported.is_none() {
            tracing::warn!(
                "Clip \"{}\" on {} exported no channels",
                clip.name,
                description.nodes[animation.root as usize].name
            );
        }
    }

    let mut output = session.finish()?;
    write_hierarchy(description, &indices, &mut output.document);
    write_blend_shape_weights(description, &mut output.document);
    output.document.materials = description
        .materials
        .iter()
        .enumerate()
        .map(|(i, material)| {
            let mut written = Material {
                name: Some(material.name.clone()),
                ..Default::default()
            };
            let object = ObjectRef::new(ObjectKind::Material, i as u32);
            if let Some(extensions) = output.material_extensions.get(&object) {
                written.declare_extensions(extensions);
            }
            written
        })
        .collect();

    let glb = output.to_glb()?;
    Ok(ExportedScene {
        glb,
        report: output.report,
        animation_count: output.document.animations.len(),
    })
}

/// glTF index of every described node; excluded subtrees get `None`
fn node_indices(description: &SceneDescription) -> Vec<Option<u32>> {
    let mut excluded = HashSet::new();
    let mut stack: Vec<u32> = (0..description.nodes.len() as u32)
        .filter(|&i| description.nodes[i as usize].exclude)
        .collect();
    while let Some(node) = stack.pop() {
        if excluded.insert(node) {
            stack.extend(&description.nodes[node as usize].children);
        }
    }

    let mut next = 0;
    (0..description.nodes.len() as u32)
        .map(|i| {
            if excluded.contains(&i) {
                return None;
            }
            next += 1;
            Some(next - 1)
        })
        .collect()
}

fn build_scene_index(description: &SceneDescription, indices: &[Option<u32>]) -> SceneIndex {
    let mut scene = SceneIndex::new();

    for (i, material) in description.materials.iter().enumerate() {
        let object = ObjectRef::new(ObjectKind::Material, i as u32);
        for slot in &material.textures {
            scene.add_texture(object, slot);
        }
    }

    for (i, node) in description.nodes.iter().enumerate() {
        let handle = NodeHandle(i as u32);
        scene.add_node(handle, indices[i]).set_active(handle, node.active);

        // present transform in source space, for partially animated properties
        let object = ObjectRef::node(handle);
        let translation = node.translation.map_or(Vec3::ZERO, Vec3::from);
        let rotation = node.rotation.map_or(Quat::IDENTITY, Quat::from_array);
        let scale = node.scale.map_or(Vec3::ONE, Vec3::from);
        scene
            .set_current_value(
                object,
                "m_LocalPosition",
                switch_handedness_vec3(translation).extend(0.0),
            )
            .set_current_value(
                object,
                "m_LocalRotation",
                Vec4::from(switch_handedness_quat(rotation)),
            )
            .set_current_value(object, "m_LocalScale", scale.extend(0.0));

        let Some(mesh) = node.mesh.map(|m| &description.meshes[m as usize]) else {
            continue;
        };
        let mut materials: Vec<u32> = mesh.primitives.iter().filter_map(|p| p.material).collect();
        materials.sort_unstable();
        materials.dedup();
        for material in materials {
            scene.attach(
                handle,
                ObjectRef::new(ObjectKind::Material, material),
                Some(material),
            );
        }

        if !mesh.blend_shapes.is_empty() {
            let skinned = ObjectRef::new(ObjectKind::SkinnedMesh, i as u32);
            scene
                .attach(handle, skinned, None)
                .set_blend_shapes(skinned, mesh.blend_shapes.clone());
            if let Some(range) = mesh.blend_shape_weight_range {
                scene.set_blend_shape_weight_range(skinned, range);
            }
        }
    }
    scene
}

fn write_hierarchy(description: &SceneDescription, indices: &[Option<u32>], document: &mut Document) {
    document.nodes = description
        .nodes
        .iter()
        .zip(indices)
        .filter(|(_, index)| index.is_some())
        .map(|(node, _)| Node {
            name: Some(node.name.clone()),
            children: node
                .children
                .iter()
                .filter_map(|&c| indices[c as usize])
                .collect(),
            mesh: node.mesh,
            translation: node.translation,
            rotation: node.rotation,
            scale: node.scale,
        })
        .collect();

    let roots: Vec<u32> = description
        .roots()
        .into_iter()
        .filter_map(|r| indices[r as usize])
        .collect();
    if !roots.is_empty() {
        document.add_scene("Scene", &roots);
    }
}

/// Meshes with morph targets start at rest
fn write_blend_shape_weights(description: &SceneDescription, document: &mut Document) {
    for (mesh, written) in description.meshes.iter().zip(&mut document.meshes) {
        let targets = written
            .primitives
            .iter()
            .map(|p| p.targets.len())
            .max()
            .unwrap_or(0);
        if targets > 0 && !mesh.blend_shapes.is_empty() {
            written.weights = Some(vec![0.0; targets]);
        }
    }
}
