//! Capacity-bounded instance pool backed by a region of the shared scene
//! buffer.
//!
//! A pool holds the host-side state for every drawable copy of one mesh.
//! Instances are append-only; the GPU copy is kept current with *tail*
//! syncs that re-upload only the most recently added records, so spawning
//! a wave of balls costs O(wave), not O(population).

use glam::{Mat4, Quat, Vec3};

use crate::{gpu::buffer_writer::BufferWriter, scene::CapacityError};

/// Packed size of one instance record: a 4x4 f32 matrix plus a padded
/// vec3 color.
pub const RECORD_SIZE: usize = 80;

/// Size of the count header at the start of every pool region.
pub const HEADER_SIZE: usize = 16;

/// Host-side state of one renderable instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    /// World-space position.
    pub position: Vec3,
    /// Orientation.
    pub rotation: Quat,
    /// Per-axis scale (uniform for spheres).
    pub scale: Vec3,
    /// Color in 0–255 channels; normalized to [0, 1] when packed.
    pub color: Vec3,
}

impl Instance {
    /// Sphere-shaped instance: uniform scale, identity rotation.
    #[must_use]
    pub fn sphere(position: Vec3, radius: f32, color: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(radius),
            color,
        }
    }

    /// Compose position, rotation, and scale into a model matrix.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Pack the 80-byte record: column-major matrix, then color scaled to
    /// [0, 1], then 4 bytes of padding to the 16-byte vec3 stride.
    pub(crate) fn pack_into(&self, writer: &mut BufferWriter) {
        writer.write_mat4(&self.model_matrix());
        writer.write_vec3(self.color / 255.0);
        writer.pad(4);
    }
}

/// Opaque handle to a pool's slice of the shared scene buffer.
///
/// Issued exactly once when the owning [`SceneAggregator`] binds to the
/// GPU; the offset is never recomputed afterwards.
///
/// [`SceneAggregator`]: crate::scene::SceneAggregator
#[derive(Debug, Clone)]
pub struct Region {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) offset: u64,
}

/// Append-only collection of instances of one shared mesh.
#[derive(Debug)]
pub struct ObjectPool {
    instances: Vec<Instance>,
    capacity: usize,
    region: Option<Region>,
}

impl ObjectPool {
    /// Empty pool able to hold up to `capacity` instances.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
            capacity,
            region: None,
        }
    }

    /// Append an instance.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::PoolFull`] without mutating anything when
    /// the pool is at capacity. This is non-fatal; callers decide whether
    /// to warn or ignore.
    pub fn add_instance(&mut self, instance: Instance) -> Result<(), CapacityError> {
        if self.instances.len() >= self.capacity {
            return Err(CapacityError::PoolFull {
                capacity: self.capacity,
            });
        }
        self.instances.push(instance);
        Ok(())
    }

    /// Number of instances currently in the pool.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Maximum number of instances this pool can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All instances in insertion order.
    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Whether the pool has been issued its GPU region.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.region.is_some()
    }

    /// The pool's region, once bound.
    #[must_use]
    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    pub(crate) fn bind(&mut self, region: Region) {
        self.region = Some(region);
    }

    /// Re-upload the last `last` instance records plus the count header.
    ///
    /// Silently does nothing before the pool is bound — initialization
    /// order is the caller's responsibility and must not crash an early
    /// frame.
    pub fn sync_tail(&self, queue: &wgpu::Queue, last: usize) {
        let Some(region) = &self.region else {
            return;
        };

        let count = self.instances.len();
        let last = last.min(count);

        let mut header = BufferWriter::new(HEADER_SIZE);
        header.write_u32(count as u32);
        queue.write_buffer(&region.buffer, region.offset, header.as_bytes());

        if last == 0 {
            return;
        }

        let first = count - last;
        let mut records = BufferWriter::new(last * RECORD_SIZE);
        for instance in &self.instances[first..] {
            instance.pack_into(&mut records);
        }

        log::debug!("pool sync: {last} records at instance offset {first}");
        queue.write_buffer(
            &region.buffer,
            region.offset + HEADER_SIZE as u64 + (first * RECORD_SIZE) as u64,
            records.as_bytes(),
        );
    }

    /// Re-upload every record and the header.
    pub fn sync_all(&self, queue: &wgpu::Queue) {
        self.sync_tail(queue, self.instances.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_f32(bytes: &[u8], index: usize) -> f32 {
        f32::from_le_bytes([
            bytes[index * 4],
            bytes[index * 4 + 1],
            bytes[index * 4 + 2],
            bytes[index * 4 + 3],
        ])
    }

    #[test]
    fn test_capacity_invariant() {
        let mut pool = ObjectPool::new(3);
        for _ in 0..3 {
            assert!(pool
                .add_instance(Instance::sphere(Vec3::ZERO, 1.0, Vec3::ZERO))
                .is_ok());
        }
        assert_eq!(pool.instance_count(), 3);

        let rejected = pool.add_instance(Instance::sphere(Vec3::ONE, 1.0, Vec3::ZERO));
        assert!(rejected.is_err());
        assert_eq!(pool.instance_count(), 3);
    }

    #[test]
    fn test_unbound_pool_reports_unbound() {
        let pool = ObjectPool::new(1);
        assert!(!pool.is_bound());
        assert!(pool.region().is_none());
    }

    #[test]
    fn test_record_round_trip() {
        let instance = Instance::sphere(
            Vec3::new(1.0, -2.0, 3.0),
            0.5,
            Vec3::new(255.0, 127.5, 0.0),
        );

        let mut writer = BufferWriter::new(RECORD_SIZE);
        instance.pack_into(&mut writer);
        assert_eq!(writer.offset(), RECORD_SIZE);
        let bytes = writer.as_bytes();

        // Matrix diagonal carries the uniform scale.
        assert_eq!(read_f32(bytes, 0), 0.5);
        assert_eq!(read_f32(bytes, 5), 0.5);
        assert_eq!(read_f32(bytes, 10), 0.5);

        // Fourth column carries the translation.
        assert_eq!(read_f32(bytes, 12), 1.0);
        assert_eq!(read_f32(bytes, 13), -2.0);
        assert_eq!(read_f32(bytes, 14), 3.0);
        assert_eq!(read_f32(bytes, 15), 1.0);

        // Color is normalized to [0, 1] on write.
        assert_eq!(read_f32(bytes, 16), 1.0);
        assert_eq!(read_f32(bytes, 17), 0.5);
        assert_eq!(read_f32(bytes, 18), 0.0);
    }

    #[test]
    fn test_record_size_matches_layout() {
        // 64-byte matrix + 12-byte color + 4-byte padding.
        assert_eq!(RECORD_SIZE, 16 * 4 + 3 * 4 + 4);
    }
}
