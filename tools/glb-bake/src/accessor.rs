//! Accessor encoding: typed numeric arrays to aligned bufferViews
//!
//! Every `pack_*` call follows the same sequence: align the writer, record
//! the view offset, write the data, pad, then push one bufferView followed
//! by one accessor. Empty input is rejected before anything is written.

use glam::Mat4;

use crate::buffer::{calculate_alignment, BufferWriter, BUFFER_ALIGNMENT};
use crate::error::{ExportError, Result};
use crate::schema::{
    Accessor, AccessorType, BufferTarget, BufferView, ComponentType, Sparse, SparseIndices,
    SparseValues,
};

/// Accessor index returned by encoder operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessorIndex(pub u32);

/// BufferView index returned by raw view writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferViewIndex(pub u32);

/// Base data a sparse accessor is layered on
#[derive(Debug, Clone, Copy)]
pub struct SparseBase<'a> {
    pub accessor: AccessorIndex,
    pub data: &'a [[f32; 3]],
}

/// Pre-encoded bytes with a caller-declared layout
#[derive(Debug, Clone)]
pub struct RawAccessor<'a> {
    pub bytes: &'a [u8],
    pub count: usize,
    pub kind: AccessorType,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
}

/// Owns the binary buffer, bufferViews and accessors of one export session
#[derive(Debug, Default)]
pub struct AccessorEncoder {
    writer: BufferWriter,
    views: Vec<BufferView>,
    accessors: Vec<Accessor>,
}

/// Narrowest component type able to hold `[min, max]`
///
/// Index buffers reserve the type's maximum value for primitive restart, so
/// their bound is checked as `max + 1` and signed types are never chosen.
/// Negative ranges too wide for Short fall back to Float, which holds every
/// value up to 2^24 exactly.
pub fn narrowest_component_type(min: i64, max: i64, is_index: bool) -> ComponentType {
    let effective_max = if is_index { max + 1 } else { max };
    if min >= 0 && effective_max <= u8::MAX as i64 {
        ComponentType::UnsignedByte
    } else if !is_index && min >= i8::MIN as i64 && effective_max <= i8::MAX as i64 {
        ComponentType::Byte
    } else if !is_index && min >= i16::MIN as i64 && effective_max <= i16::MAX as i64 {
        ComponentType::Short
    } else if min >= 0 && effective_max <= u16::MAX as i64 {
        ComponentType::UnsignedShort
    } else if min >= 0 {
        ComponentType::UnsignedInt
    } else {
        ComponentType::Float
    }
}

/// Per-component bounds over an array of N-component elements
pub fn compute_bounds<const N: usize>(data: &[[f32; N]]) -> (Vec<f64>, Vec<f64>) {
    let mut min = [f32::MAX; N];
    let mut max = [f32::MIN; N];

    for item in data {
        for i in 0..N {
            min[i] = min[i].min(item[i]);
            max[i] = max[i].max(item[i]);
        }
    }

    (
        min.iter().map(|&v| v as f64).collect(),
        max.iter().map(|&v| v as f64).collect(),
    )
}

fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ExportError::BufferTooLarge(len))
}

impl AccessorEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[u8] {
        self.writer.data()
    }

    pub fn views(&self) -> &[BufferView] {
        &self.views
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub fn accessor(&self, index: AccessorIndex) -> Option<&Accessor> {
        self.accessors.get(index.0 as usize)
    }

    pub fn accessor_count(&self) -> u32 {
        self.accessors.len() as u32
    }

    /// Set GPU target and stride on the view behind a vertex or index accessor
    pub fn set_view_usage(
        &mut self,
        accessor: AccessorIndex,
        target: BufferTarget,
        byte_stride: Option<u32>,
    ) -> Result<()> {
        let view = self
            .accessor(accessor)
            .and_then(|a| a.buffer_view)
            .ok_or(ExportError::UnknownAccessor(accessor.0))?;
        let view = &mut self.views[view as usize];
        view.target = Some(target);
        view.byte_stride = byte_stride;
        Ok(())
    }

    /// Hand over the padded buffer and the index lists
    pub fn finish(self) -> (Vec<u8>, Vec<BufferView>, Vec<Accessor>) {
        (self.writer.into_bytes(), self.views, self.accessors)
    }

    // ========================================================================
    // Integer scalars
    // ========================================================================

    /// Pack integer scalars in the narrowest fitting component type
    pub fn pack_ints<T>(&mut self, values: &[T], is_index: bool) -> Result<AccessorIndex>
    where
        T: Copy + Into<i64>,
    {
        if values.is_empty() {
            return Err(ExportError::EmptyAccessor("SCALAR integer"));
        }

        let wide: Vec<i64> = values.iter().map(|&v| v.into()).collect();
        let min = wide.iter().copied().min().unwrap_or(0);
        let max = wide.iter().copied().max().unwrap_or(0);
        let component_type = narrowest_component_type(min, max, is_index);

        let offset = self.begin_view();
        match component_type {
            ComponentType::UnsignedByte => {
                let narrow: Vec<u8> = wide.iter().map(|&v| v as u8).collect();
                self.writer.write_pod(&narrow);
            }
            ComponentType::Byte => {
                let narrow: Vec<i8> = wide.iter().map(|&v| v as i8).collect();
                self.writer.write_pod(&narrow);
            }
            ComponentType::Short => {
                let narrow: Vec<i16> = wide.iter().map(|&v| v as i16).collect();
                self.writer.write_pod(&narrow);
            }
            ComponentType::UnsignedShort => {
                let narrow: Vec<u16> = wide.iter().map(|&v| v as u16).collect();
                self.writer.write_pod(&narrow);
            }
            ComponentType::UnsignedInt => {
                let narrow: Vec<u32> = wide.iter().map(|&v| v as u32).collect();
                self.writer.write_pod(&narrow);
            }
            ComponentType::Float => {
                let narrow: Vec<f32> = wide.iter().map(|&v| v as f32).collect();
                self.writer.write_pod(&narrow);
            }
        }
        let view = self.end_view(offset, None)?;

        if is_index {
            self.views[view as usize].target = Some(BufferTarget::ElementArrayBuffer);
        }

        self.push_accessor(Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            component_type,
            normalized: false,
            count: len_u32(values.len())?,
            kind: AccessorType::Scalar,
            min: Some(vec![min as f64]),
            max: Some(vec![max as f64]),
            sparse: None,
        })
    }

    /// Pack triangle indices
    pub fn pack_indices(&mut self, indices: &[u32]) -> Result<AccessorIndex> {
        self.pack_ints(indices, true)
    }

    /// Pack u8 scalars without narrowing
    pub fn pack_u8_scalars(&mut self, values: &[u8]) -> Result<AccessorIndex> {
        if values.is_empty() {
            return Err(ExportError::EmptyAccessor("SCALAR u8"));
        }
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);

        let offset = self.begin_view();
        self.writer.write(values);
        let view = self.end_view(offset, None)?;

        self.push_accessor(Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            component_type: ComponentType::UnsignedByte,
            normalized: false,
            count: len_u32(values.len())?,
            kind: AccessorType::Scalar,
            min: Some(vec![min as f64]),
            max: Some(vec![max as f64]),
            sparse: None,
        })
    }

    /// Pack skinning joint indices as unsigned shorts
    pub fn pack_joints(&mut self, joints: &[[u16; 4]]) -> Result<AccessorIndex> {
        if joints.is_empty() {
            return Err(ExportError::EmptyAccessor("VEC4 joints"));
        }

        let offset = self.begin_view();
        self.writer.write_pod(joints);
        let view = self.end_view(offset, None)?;

        self.push_accessor(Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            component_type: ComponentType::UnsignedShort,
            normalized: false,
            count: len_u32(joints.len())?,
            kind: AccessorType::Vec4,
            min: None,
            max: None,
            sparse: None,
        })
    }

    // ========================================================================
    // Float scalars and vectors
    // ========================================================================

    /// Pack f32 scalars with min/max (animation times, single-float outputs)
    pub fn pack_floats(&mut self, values: &[f32]) -> Result<AccessorIndex> {
        if values.is_empty() {
            return Err(ExportError::EmptyAccessor("SCALAR"));
        }
        let as_elements: Vec<[f32; 1]> = values.iter().map(|&v| [v]).collect();
        self.pack_float_elements(&as_elements, AccessorType::Scalar)
    }

    pub fn pack_vec2(&mut self, data: &[[f32; 2]]) -> Result<AccessorIndex> {
        self.pack_float_elements(data, AccessorType::Vec2)
    }

    pub fn pack_vec3(&mut self, data: &[[f32; 3]]) -> Result<AccessorIndex> {
        self.pack_float_elements(data, AccessorType::Vec3)
    }

    pub fn pack_vec4(&mut self, data: &[[f32; 4]]) -> Result<AccessorIndex> {
        self.pack_float_elements(data, AccessorType::Vec4)
    }

    /// Pack RGBA colors, optionally dropping alpha to write VEC3
    pub fn pack_colors(&mut self, colors: &[[f32; 4]], keep_alpha: bool) -> Result<AccessorIndex> {
        if keep_alpha {
            self.pack_vec4(colors)
        } else {
            let rgb: Vec<[f32; 3]> = colors.iter().map(|c| [c[0], c[1], c[2]]).collect();
            self.pack_vec3(&rgb)
        }
    }

    /// Pack tangents, replacing any containing NaN with a unit Z tangent
    pub fn pack_tangents(&mut self, tangents: &[[f32; 4]]) -> Result<AccessorIndex> {
        let clean: Vec<[f32; 4]> = tangents
            .iter()
            .map(|t| {
                if t.iter().any(|c| c.is_nan()) {
                    [0.0, 0.0, 1.0, 1.0]
                } else {
                    *t
                }
            })
            .collect();
        self.pack_vec4(&clean)
    }

    fn pack_float_elements<const N: usize>(
        &mut self,
        data: &[[f32; N]],
        kind: AccessorType,
    ) -> Result<AccessorIndex> {
        if data.is_empty() {
            return Err(ExportError::EmptyAccessor(type_name(kind)));
        }

        let offset = self.begin_view();
        for item in data {
            self.writer.write_pod(item);
        }
        let view = self.end_view(offset, None)?;

        let (min, max) = compute_bounds(data);
        self.push_accessor(Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            component_type: ComponentType::Float,
            normalized: false,
            count: len_u32(data.len())?,
            kind,
            min: Some(min),
            max: Some(max),
            sparse: None,
        })
    }

    // ========================================================================
    // Matrices
    // ========================================================================

    /// Pack 4x4 matrices column by column; MAT4 accessors carry no bounds
    pub fn pack_mat4(&mut self, matrices: &[Mat4]) -> Result<AccessorIndex> {
        if matrices.is_empty() {
            return Err(ExportError::EmptyAccessor("MAT4"));
        }

        let offset = self.begin_view();
        for matrix in matrices {
            for column in 0..4 {
                self.writer.write_pod(&matrix.col(column).to_array());
            }
        }
        let view = self.end_view(offset, None)?;

        self.push_accessor(Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            component_type: ComponentType::Float,
            normalized: false,
            count: len_u32(matrices.len())?,
            kind: AccessorType::Mat4,
            min: None,
            max: None,
            sparse: None,
        })
    }

    /// Pack matrices stored row by row, as most scene graphs keep them
    pub fn pack_mat4_row_major(&mut self, rows: &[[f32; 16]]) -> Result<AccessorIndex> {
        let matrices: Vec<Mat4> = rows
            .iter()
            .map(|m| Mat4::from_cols_array(m).transpose())
            .collect();
        self.pack_mat4(&matrices)
    }

    // ========================================================================
    // Raw data
    // ========================================================================

    /// Write bytes into their own bufferView without an accessor
    pub fn pack_buffer_view(&mut self, bytes: &[u8]) -> Result<BufferViewIndex> {
        if bytes.is_empty() {
            return Err(ExportError::EmptyAccessor("raw bufferView"));
        }
        let offset = self.begin_view();
        self.writer.write(bytes);
        Ok(BufferViewIndex(self.end_view(offset, None)?))
    }

    /// Pack pre-encoded bytes under a caller-supplied layout
    pub fn pack_raw(&mut self, raw: &RawAccessor<'_>) -> Result<AccessorIndex> {
        if raw.count == 0 || raw.bytes.is_empty() {
            return Err(ExportError::EmptyAccessor(type_name(raw.kind)));
        }
        let view = self.pack_buffer_view(raw.bytes)?;

        self.push_accessor(Accessor {
            buffer_view: Some(view.0),
            byte_offset: 0,
            component_type: raw.component_type,
            normalized: raw.normalized,
            count: len_u32(raw.count)?,
            kind: raw.kind,
            min: raw.min.clone(),
            max: raw.max.clone(),
            sparse: None,
        })
    }

    // ========================================================================
    // Sparse
    // ========================================================================

    /// Pack a sparse VEC3 accessor holding `overlay` on top of an optional base
    ///
    /// Elements equal to the base (or to zero without one) are left out. At
    /// least one index is always written. Bounds cover `base + overlay` over
    /// the whole range.
    pub fn pack_sparse_vec3(
        &mut self,
        base: Option<SparseBase<'_>>,
        overlay: &[[f32; 3]],
    ) -> Result<AccessorIndex> {
        if overlay.is_empty() {
            return Err(ExportError::EmptyAccessor("sparse VEC3"));
        }

        let (base_view, base_offset) = match &base {
            Some(base) => {
                if base.data.len() != overlay.len() {
                    return Err(ExportError::SparseLengthMismatch {
                        base: base.data.len(),
                        overlay: overlay.len(),
                    });
                }
                let accessor = self
                    .accessor(base.accessor)
                    .ok_or(ExportError::UnknownAccessor(base.accessor.0))?;
                (accessor.buffer_view, accessor.byte_offset)
            }
            None => (None, 0),
        };

        let baseline = |i: usize| base.map_or([0.0; 3], |b| b.data[i]);

        let mut indices: Vec<u32> = (0..overlay.len())
            .filter(|&i| overlay[i] != baseline(i))
            .map(|i| i as u32)
            .collect();
        if indices.is_empty() {
            indices.push(0);
        }

        let combined: Vec<[f32; 3]> = match &base {
            Some(base) => overlay
                .iter()
                .zip(base.data)
                .map(|(o, b)| [b[0] + o[0], b[1] + o[1], b[2] + o[2]])
                .collect(),
            None => overlay.to_vec(),
        };
        let (min, max) = compute_bounds(&combined);

        let offset = self.begin_view();
        self.writer.write_pod(&indices);
        let indices_view = self.end_view(offset, None)?;

        let offset = self.begin_view();
        for &i in &indices {
            self.writer.write_pod(&overlay[i as usize]);
        }
        let values_view = self.end_view(offset, None)?;

        self.push_accessor(Accessor {
            buffer_view: base_view,
            byte_offset: base_offset,
            component_type: ComponentType::Float,
            normalized: false,
            count: len_u32(overlay.len())?,
            kind: AccessorType::Vec3,
            min: Some(min),
            max: Some(max),
            sparse: Some(Sparse {
                count: len_u32(indices.len())?,
                indices: SparseIndices {
                    buffer_view: indices_view,
                    component_type: ComponentType::UnsignedInt,
                },
                values: SparseValues {
                    buffer_view: values_view,
                },
            }),
        })
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    fn begin_view(&mut self) -> usize {
        self.writer.align(BUFFER_ALIGNMENT, 0);
        self.writer.position()
    }

    fn end_view(&mut self, offset: usize, byte_stride: Option<u32>) -> Result<u32> {
        let written = self.writer.position() - offset;
        let byte_length = calculate_alignment(written, BUFFER_ALIGNMENT);
        self.writer.align(BUFFER_ALIGNMENT, 0);

        let index = len_u32(self.views.len())?;
        self.views.push(BufferView {
            buffer: 0,
            byte_offset: len_u32(offset)?,
            byte_length: len_u32(byte_length)?,
            byte_stride,
            target: None,
        });
        Ok(index)
    }

    fn push_accessor(&mut self, accessor: Accessor) -> Result<AccessorIndex> {
        let index = len_u32(self.accessors.len())?;
        self.accessors.push(accessor);
        Ok(AccessorIndex(index))
    }
}

fn type_name(kind: AccessorType) -> &'static str {
    match kind {
        AccessorType::Scalar => "SCALAR",
        AccessorType::Vec2 => "VEC2",
        AccessorType::Vec3 => "VEC3",
        AccessorType::Vec4 => "VEC4",
        AccessorType::Mat4 => "MAT4",
    }
}
