//! Sequential binary packer for GPU buffer regions.
//!
//! GPU-visible data (instance records, the physics settings uniform) has a
//! fixed byte layout shared with WGSL, so it is packed by hand rather than
//! through a derive. The writer tracks a monotonically increasing offset;
//! callers are responsible for staying in bounds — an out-of-range write is
//! a programming error and panics immediately.

use glam::{Mat4, Vec3};

/// Write-only, offset-tracked packer over a fixed-size byte region.
///
/// All scalars are written little-endian (the only byte order wgpu devices
/// expose). Matrices are written in column-major component order, matching
/// [`glam::Mat4::to_cols_array`] and WGSL `mat4x4<f32>`.
pub struct BufferWriter {
    buf: Vec<u8>,
    offset: usize,
}

impl BufferWriter {
    /// Create a zero-filled writer of `byte_len` bytes with the cursor at 0.
    #[must_use]
    pub fn new(byte_len: usize) -> Self {
        Self {
            buf: vec![0; byte_len],
            offset: 0,
        }
    }

    /// Write a `u32` and advance the cursor by 4.
    pub fn write_u32(&mut self, value: u32) {
        self.buf[self.offset..self.offset + 4].copy_from_slice(&value.to_le_bytes());
        self.offset += 4;
    }

    /// Write an `f32` and advance the cursor by 4.
    pub fn write_f32(&mut self, value: f32) {
        self.buf[self.offset..self.offset + 4].copy_from_slice(&value.to_le_bytes());
        self.offset += 4;
    }

    /// Write three `f32` components with no implicit padding.
    ///
    /// WGSL `vec3<f32>` fields are 16-byte aligned; callers add the trailing
    /// [`pad`](Self::pad) themselves where the layout requires it.
    pub fn write_vec3(&mut self, value: Vec3) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
    }

    /// Write all 16 matrix components in column-major order.
    pub fn write_mat4(&mut self, value: &Mat4) {
        for component in value.to_cols_array() {
            self.write_f32(component);
        }
    }

    /// Advance the cursor by `bytes` without writing (the region is
    /// zero-initialized, so skipped bytes stay zero).
    pub fn pad(&mut self, bytes: usize) {
        self.offset += bytes;
    }

    /// Current cursor position in bytes.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The packed bytes, full region regardless of cursor position.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_writes_advance_offset() {
        let mut writer = BufferWriter::new(16);
        writer.write_u32(7);
        writer.write_f32(1.5);
        assert_eq!(writer.offset(), 8);

        let bytes = writer.as_bytes();
        assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 7);
        assert_eq!(f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 1.5);
    }

    #[test]
    fn test_vec3_has_no_implicit_padding() {
        let mut writer = BufferWriter::new(12);
        writer.write_vec3(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(writer.offset(), 12);
    }

    #[test]
    fn test_pad_skips_without_writing() {
        let mut writer = BufferWriter::new(12);
        writer.write_f32(4.0);
        writer.pad(4);
        writer.write_f32(8.0);
        assert_eq!(writer.offset(), 12);

        let bytes = writer.as_bytes();
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(
            f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            8.0
        );
    }

    #[test]
    fn test_mat4_is_column_major() {
        let mat = Mat4::from_translation(Vec3::new(5.0, 6.0, 7.0));
        let mut writer = BufferWriter::new(64);
        writer.write_mat4(&mat);

        // Translation lands in the fourth column (components 12..15).
        let bytes = writer.as_bytes();
        let component = |i: usize| {
            f32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };
        assert_eq!(component(12), 5.0);
        assert_eq!(component(13), 6.0);
        assert_eq!(component(14), 7.0);
        assert_eq!(component(15), 1.0);
    }
}
