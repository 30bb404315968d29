//! Append-only binary buffer with alignment control

use crate::error::{ExportError, Result};

/// glTF requires every bufferView offset and length to be a multiple of this
pub const BUFFER_ALIGNMENT: usize = 4;

// Accessor data is written with native-endian casts; glTF is little-endian.
#[cfg(target_endian = "big")]
compile_error!("glb-bake writes accessor data in native byte order and requires a little-endian target");

/// Round `size` up to the next multiple of `boundary`
pub fn calculate_alignment(size: usize, boundary: usize) -> usize {
    debug_assert!(boundary > 0);
    size.div_ceil(boundary) * boundary
}

/// Byte sink for the single glTF binary buffer
///
/// Writes only ever append. Offsets for bufferViews must be taken from
/// [`position`](Self::position) right after an [`align`](Self::align) call.
#[derive(Debug, Clone, Default)]
pub struct BufferWriter {
    bytes: Vec<u8>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes at the current position
    pub fn write(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Append a slice of plain-old-data values
    pub fn write_pod<T: bytemuck::Pod>(&mut self, values: &[T]) {
        self.write(bytemuck::cast_slice(values));
    }

    /// Pad with `pad` until the length is a multiple of `boundary`
    pub fn align(&mut self, boundary: usize, pad: u8) {
        let target = calculate_alignment(self.bytes.len(), boundary);
        self.bytes.resize(target, pad);
    }

    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    /// Current position as a glTF offset
    pub fn offset(&self) -> Result<u32> {
        u32::try_from(self.bytes.len()).map_err(|_| ExportError::BufferTooLarge(self.bytes.len()))
    }

    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Finish writing, padding the tail to the buffer alignment
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.align(BUFFER_ALIGNMENT, 0);
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_alignment() {
        assert_eq!(calculate_alignment(0, 4), 0);
        assert_eq!(calculate_alignment(1, 4), 4);
        assert_eq!(calculate_alignment(4, 4), 4);
        assert_eq!(calculate_alignment(5, 4), 8);
        assert_eq!(calculate_alignment(13, 8), 16);
        for size in 0..64 {
            for boundary in 1..9 {
                let aligned = calculate_alignment(size, boundary);
                assert_eq!(aligned % boundary, 0);
                assert!(aligned >= size && aligned - size < boundary);
            }
        }
    }

    #[test]
    fn test_align_pads_with_given_byte() {
        let mut writer = BufferWriter::new();
        writer.write(&[1, 2, 3]);
        writer.align(4, 0);
        assert_eq!(writer.data(), &[1, 2, 3, 0]);

        writer.align(4, 0);
        assert_eq!(writer.position(), 4); // already aligned

        writer.write(&[9]);
        writer.align(4, b' ');
        assert_eq!(&writer.data()[4..], &[9, b' ', b' ', b' ']);
    }

    #[test]
    fn test_write_pod_is_little_endian() {
        let mut writer = BufferWriter::new();
        writer.write_pod(&[1.0f32]);
        writer.write_pod(&[0x0102u16]);
        assert_eq!(writer.data(), &[0x00, 0x00, 0x80, 0x3F, 0x02, 0x01]);
        assert_eq!(writer.offset().unwrap(), 6);
    }

    #[test]
    fn test_into_bytes_pads_tail() {
        let mut writer = BufferWriter::new();
        writer.write(&[7; 6]);
        assert_eq!(writer.into_bytes().len(), 8);
    }
}
