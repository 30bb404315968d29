//! glTF document model and GLB container assembly
//!
//! The session fills buffers, bufferViews, accessors, meshes, animations and
//! `extensionsUsed`. Nodes, scenes and materials belong to the scene-graph
//! collaborator, which may fill them before writing the container.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::buffer::{calculate_alignment, BUFFER_ALIGNMENT};
use crate::error::{ExportError, Result};
use crate::schema::{Accessor, Animation, BufferView};

pub const GENERATOR: &str = concat!("glb-bake ", env!("CARGO_PKG_VERSION"));

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            version: "2.0".to_string(),
            generator: Some(GENERATOR.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Scene {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Node {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
}

/// Material stub; its properties are written by the material collaborator
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Material {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Material {
    /// Declare extensions as empty objects, e.g. those an animation targets
    pub fn declare_extensions<'a>(&mut self, names: impl IntoIterator<Item = &'a String>) {
        for name in names {
            self.extensions
                .entry(name.clone())
                .or_insert_with(|| serde_json::Value::Object(Default::default()));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Primitive {
    /// Semantic (`POSITION`, `TEXCOORD_0`, ...) to accessor index
    pub attributes: BTreeMap<String, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indices: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<BTreeMap<String, u32>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Mesh {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f32>>,
}

/// Root glTF JSON object
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub asset: Asset,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub extensions_used: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<Scene>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<Mesh>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<Material>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub animations: Vec<Animation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scene and make it the default if it is the first
    pub fn add_scene(&mut self, name: &str, root_nodes: &[u32]) -> u32 {
        let index = self.scenes.len() as u32;
        self.scenes.push(Scene {
            name: Some(name.to_string()),
            nodes: root_nodes.to_vec(),
        });
        self.scene.get_or_insert(index);
        index
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Assemble a GLB container around the JSON and `bin`
    ///
    /// The BIN chunk is left out when `bin` is empty.
    pub fn to_glb(&self, bin: &[u8]) -> Result<Vec<u8>> {
        let json = self.to_json()?;

        let json_chunk_length = calculate_alignment(json.len(), BUFFER_ALIGNMENT);
        let bin_chunk_length = calculate_alignment(bin.len(), BUFFER_ALIGNMENT);

        let mut total_length = HEADER_LEN + CHUNK_HEADER_LEN + json_chunk_length;
        if !bin.is_empty() {
            total_length += CHUNK_HEADER_LEN + bin_chunk_length;
        }
        let total = u32::try_from(total_length).map_err(|_| ExportError::BufferTooLarge(total_length))?;

        let mut glb = Vec::with_capacity(total_length);

        // Header
        glb.extend_from_slice(GLB_MAGIC);
        glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
        glb.extend_from_slice(&total.to_le_bytes());

        // JSON chunk, padded with spaces
        glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
        glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        glb.extend_from_slice(&json);
        glb.resize(glb.len() + json_chunk_length - json.len(), b' ');

        // BIN chunk, padded with zeros
        if !bin.is_empty() {
            glb.extend_from_slice(&(bin_chunk_length as u32).to_le_bytes());
            glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
            glb.extend_from_slice(bin);
            glb.resize(glb.len() + bin_chunk_length - bin.len(), 0);
        }

        Ok(glb)
    }
}
