//! Mesh primitive encoding

use crate::accessor::{AccessorEncoder, AccessorIndex};
use crate::document::Primitive;
use crate::error::{ExportError, Result};
use crate::schema::BufferTarget;

/// Byte stride of interleavable VEC3 vertex attributes
const VEC3_STRIDE: u32 = 12;

/// Per-vertex offsets of one morph target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
}

/// Builder for one mesh primitive's vertex data
#[derive(Debug, Clone, Default)]
pub struct PrimitiveBuilder {
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    tangents: Option<Vec<[f32; 4]>>,
    uvs: Vec<Vec<[f32; 2]>>,
    colors: Option<(Vec<[f32; 4]>, bool)>,
    joints: Option<Vec<[u16; 4]>>,
    weights: Option<Vec<[f32; 4]>>,
    indices: Option<Vec<u32>>,
    targets: Vec<MorphTarget>,
    material: Option<u32>,
}

impl PrimitiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set positions (required)
    pub fn positions(mut self, positions: &[[f32; 3]]) -> Self {
        self.positions = positions.to_vec();
        self
    }

    pub fn normals(mut self, normals: &[[f32; 3]]) -> Self {
        self.normals = Some(normals.to_vec());
        self
    }

    pub fn tangents(mut self, tangents: &[[f32; 4]]) -> Self {
        self.tangents = Some(tangents.to_vec());
        self
    }

    /// Add the next UV set (`TEXCOORD_0`, `TEXCOORD_1`, ...)
    pub fn uvs(mut self, uvs: &[[f32; 2]]) -> Self {
        self.uvs.push(uvs.to_vec());
        self
    }

    /// Vertex colors; without `keep_alpha` they are written as VEC3
    pub fn colors(mut self, colors: &[[f32; 4]], keep_alpha: bool) -> Self {
        self.colors = Some((colors.to_vec(), keep_alpha));
        self
    }

    pub fn joints(mut self, joints: &[[u16; 4]]) -> Self {
        self.joints = Some(joints.to_vec());
        self
    }

    pub fn weights(mut self, weights: &[[f32; 4]]) -> Self {
        self.weights = Some(weights.to_vec());
        self
    }

    pub fn indices(mut self, indices: &[u32]) -> Self {
        self.indices = Some(indices.to_vec());
        self
    }

    pub fn morph_target(mut self, target: MorphTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn material(mut self, material: u32) -> Self {
        self.material = Some(material);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Encode every attribute and return the primitive's JSON
    pub fn encode(&self, encoder: &mut AccessorEncoder) -> Result<Primitive> {
        if self.positions.is_empty() {
            return Err(ExportError::EmptyAccessor("POSITION"));
        }

        let mut primitive = Primitive {
            material: self.material,
            ..Default::default()
        };

        let positions = pack_vertex_vec3(encoder, &self.positions)?;
        primitive.attributes.insert("POSITION".into(), positions.0);

        if let Some(normals) = &self.normals {
            let normals = pack_vertex_vec3(encoder, normals)?;
            primitive.attributes.insert("NORMAL".into(), normals.0);
        }
        if let Some(tangents) = &self.tangents {
            let tangents = encoder.pack_tangents(tangents)?;
            encoder.set_view_usage(tangents, BufferTarget::ArrayBuffer, None)?;
            primitive.attributes.insert("TANGENT".into(), tangents.0);
        }
        for (set, uvs) in self.uvs.iter().enumerate() {
            let uvs = encoder.pack_vec2(uvs)?;
            encoder.set_view_usage(uvs, BufferTarget::ArrayBuffer, None)?;
            primitive.attributes.insert(format!("TEXCOORD_{}", set), uvs.0);
        }
        if let Some((colors, keep_alpha)) = &self.colors {
            let colors = encoder.pack_colors(colors, *keep_alpha)?;
            encoder.set_view_usage(colors, BufferTarget::ArrayBuffer, None)?;
            primitive.attributes.insert("COLOR_0".into(), colors.0);
        }
        if let Some(joints) = &self.joints {
            let joints = encoder.pack_joints(joints)?;
            encoder.set_view_usage(joints, BufferTarget::ArrayBuffer, None)?;
            primitive.attributes.insert("JOINTS_0".into(), joints.0);
        }
        if let Some(weights) = &self.weights {
            let weights = encoder.pack_vec4(weights)?;
            encoder.set_view_usage(weights, BufferTarget::ArrayBuffer, None)?;
            primitive.attributes.insert("WEIGHTS_0".into(), weights.0);
        }
        if let Some(indices) = &self.indices {
            primitive.indices = Some(encoder.pack_indices(indices)?.0);
        }

        for target in &self.targets {
            let mut attributes = std::collections::BTreeMap::new();
            let positions = encoder.pack_sparse_vec3(None, &target.positions)?;
            attributes.insert("POSITION".to_string(), positions.0);
            if let Some(normals) = &target.normals {
                let normals = encoder.pack_sparse_vec3(None, normals)?;
                attributes.insert("NORMAL".to_string(), normals.0);
            }
            primitive.targets.push(attributes);
        }

        Ok(primitive)
    }
}

fn pack_vertex_vec3(encoder: &mut AccessorEncoder, data: &[[f32; 3]]) -> Result<AccessorIndex> {
    let accessor = encoder.pack_vec3(data)?;
    encoder.set_view_usage(accessor, BufferTarget::ArrayBuffer, Some(VEC3_STRIDE))?;
    Ok(accessor)
}
