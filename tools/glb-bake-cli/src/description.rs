//! JSON scene descriptions
//!
//! A description lists a node hierarchy, meshes, materials and clips, plus
//! which clip plays on which root. Node transforms and mesh data are given in
//! glTF space; clip curves keep the source property names and space.

use std::path::Path;

use anyhow::{Context, Result};
use glb_bake::{CurveBinding, MorphTarget, PrimitiveBuilder};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    #[serde(default)]
    pub meshes: Vec<MeshDescription>,
    #[serde(default)]
    pub materials: Vec<MaterialDescription>,
    #[serde(default)]
    pub clips: Vec<ClipDescription>,
    /// Clip instances to export, in order
    #[serde(default)]
    pub animations: Vec<AnimationDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    #[serde(default)]
    pub children: Vec<u32>,
    #[serde(default)]
    pub mesh: Option<u32>,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    /// Quaternion as x, y, z, w
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Skip this node (and its subtree) in the written hierarchy
    #[serde(default)]
    pub exclude: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeshDescription {
    pub name: String,
    pub primitives: Vec<PrimitiveDescription>,
    /// Morph target names, in target order
    #[serde(default)]
    pub blend_shapes: Vec<String>,
    /// Largest blend shape frame weight; source weights are divided by it
    #[serde(default)]
    pub blend_shape_weight_range: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrimitiveDescription {
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Option<Vec<[f32; 3]>>,
    #[serde(default)]
    pub tangents: Option<Vec<[f32; 4]>>,
    #[serde(default)]
    pub uvs: Vec<Vec<[f32; 2]>>,
    #[serde(default)]
    pub colors: Option<Vec<[f32; 4]>>,
    #[serde(default)]
    pub joints: Option<Vec<[u16; 4]>>,
    #[serde(default)]
    pub weights: Option<Vec<[f32; 4]>>,
    #[serde(default)]
    pub indices: Option<Vec<u32>>,
    #[serde(default)]
    pub targets: Vec<TargetDescription>,
    #[serde(default)]
    pub material: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetDescription {
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Option<Vec<[f32; 3]>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialDescription {
    pub name: String,
    /// Bound texture slots, e.g. `_MainTex`
    #[serde(default)]
    pub textures: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClipDescription {
    pub id: u32,
    pub name: String,
    /// Duration in seconds
    pub length: f32,
    /// Curves with paths relative to the playing root; their `node` is resolved per root
    pub curves: Vec<CurveBinding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnimationDescription {
    pub clip: u32,
    /// Node the clip plays on
    pub root: u32,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_true() -> bool {
    true
}

fn default_speed() -> f32 {
    1.0
}

impl SceneDescription {
    pub fn from_json_str(source: &str) -> Result<Self> {
        let description: Self = serde_json::from_str(source)?;
        description.validate()?;
        Ok(description)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene description: {:?}", path))?;
        Self::from_json_str(&source).with_context(|| format!("Invalid scene description: {:?}", path))
    }

    /// Check cross references between nodes, meshes, materials and clips
    pub fn validate(&self) -> Result<()> {
        let node_count = self.nodes.len() as u32;
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(child) = node.children.iter().find(|&&c| c >= node_count) {
                anyhow::bail!("Node {} ({}) has unknown child {}", i, node.name, child);
            }
            if let Some(mesh) = node.mesh.filter(|&m| m as usize >= self.meshes.len()) {
                anyhow::bail!("Node {} ({}) references unknown mesh {}", i, node.name, mesh);
            }
        }

        for mesh in &self.meshes {
            for primitive in &mesh.primitives {
                if let Some(material) =
                    primitive.material.filter(|&m| m as usize >= self.materials.len())
                {
                    anyhow::bail!("Mesh {} references unknown material {}", mesh.name, material);
                }
            }
        }

        for animation in &self.animations {
            if animation.root >= node_count {
                anyhow::bail!("Animation root {} is not a node", animation.root);
            }
            if self.clip(animation.clip).is_none() {
                anyhow::bail!("Animation references unknown clip {}", animation.clip);
            }
        }
        Ok(())
    }

    pub fn clip(&self, id: u32) -> Option<&ClipDescription> {
        self.clips.iter().find(|c| c.id == id)
    }

    /// Nodes that are nobody's child
    pub fn roots(&self) -> Vec<u32> {
        (0..self.nodes.len() as u32)
            .filter(|i| !self.nodes.iter().any(|n| n.children.contains(i)))
            .collect()
    }

    /// Walk `/`-separated child names down from `root`
    pub fn resolve_path(&self, root: u32, path: &str) -> Option<u32> {
        let mut current = root;
        for name in path.split('/').filter(|s| !s.is_empty()) {
            current = self.nodes[current as usize]
                .children
                .iter()
                .copied()
                .find(|&c| self.nodes[c as usize].name == name)?;
        }
        Some(current)
    }
}

impl PrimitiveDescription {
    pub fn builder(&self) -> PrimitiveBuilder {
        let mut builder = PrimitiveBuilder::new().positions(&self.positions);
        if let Some(normals) = &self.normals {
            builder = builder.normals(normals);
        }
        if let Some(tangents) = &self.tangents {
            builder = builder.tangents(tangents);
        }
        for uvs in &self.uvs {
            builder = builder.uvs(uvs);
        }
        if let Some(colors) = &self.colors {
            let keep_alpha = colors.iter().any(|c| c[3] != 1.0);
            builder = builder.colors(colors, keep_alpha);
        }
        if let Some(joints) = &self.joints {
            builder = builder.joints(joints);
        }
        if let Some(weights) = &self.weights {
            builder = builder.weights(weights);
        }
        if let Some(indices) = &self.indices {
            builder = builder.indices(indices);
        }
        for target in &self.targets {
            builder = builder.morph_target(MorphTarget {
                positions: target.positions.clone(),
                normals: target.normals.clone(),
            });
        }
        if let Some(material) = self.material {
            builder = builder.material(material);
        }
        builder
    }
}
