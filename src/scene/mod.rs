//! Multi-pool scene store sharing one GPU buffer.
//!
//! The aggregator owns a fixed number of [`ObjectPool`]s, each assigned a
//! disjoint fixed-size region inside a single storage buffer. Registration
//! order is permanent and fixes each pool's byte offset; there is no
//! compaction or reordering. The physics dispatcher writes the balls'
//! region in place on the GPU and the render stage reads the same buffer,
//! so instance data never makes a host round-trip after upload.

pub mod pool;

use std::fmt;

pub use pool::{Instance, ObjectPool, Region, HEADER_SIZE, RECORD_SIZE};

use crate::gpu::render_context::RenderContext;

/// Non-fatal capacity overflow conditions.
///
/// These never interrupt the frame loop; callers inspect or ignore them
/// (the board logs a warning and continues with prior state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    /// An instance was added to a pool already at capacity.
    PoolFull {
        /// The pool's fixed capacity.
        capacity: usize,
    },
    /// A pool was registered beyond the aggregator's pool ceiling.
    TooManyPools {
        /// The aggregator's fixed pool ceiling.
        max_pools: usize,
    },
    /// A registered pool's capacity exceeds what one region can hold.
    PoolTooLarge {
        /// The rejected pool's capacity.
        capacity: usize,
        /// Instances one region can hold.
        region_capacity: usize,
    },
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolFull { capacity } => {
                write!(f, "pool is at capacity ({capacity}); instance not added")
            }
            Self::TooManyPools { max_pools } => write!(
                f,
                "maximum number of pools reached ({max_pools}); pool not registered"
            ),
            Self::PoolTooLarge {
                capacity,
                region_capacity,
            } => write!(
                f,
                "pool capacity {capacity} exceeds region capacity {region_capacity}"
            ),
        }
    }
}

impl std::error::Error for CapacityError {}

/// Identifier of a registered pool; stable for the aggregator's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolId(pub(crate) usize);

/// Owner of the shared scene buffer and its pools.
pub struct SceneAggregator {
    pools: Vec<ObjectPool>,
    max_pools: usize,
    pool_capacity: usize,
    buffer: Option<wgpu::Buffer>,
}

impl SceneAggregator {
    /// Aggregator for up to `max_pools` pools of up to `pool_capacity`
    /// instances each.
    #[must_use]
    pub fn new(max_pools: usize, pool_capacity: usize) -> Self {
        Self {
            pools: Vec::with_capacity(max_pools),
            max_pools,
            pool_capacity,
            buffer: None,
        }
    }

    /// Byte size of one pool region: count header plus capacity records.
    #[must_use]
    pub fn region_size(&self) -> u64 {
        (HEADER_SIZE + self.pool_capacity * RECORD_SIZE) as u64
    }

    /// Byte size of the shared buffer.
    #[must_use]
    pub fn buffer_size(&self) -> u64 {
        self.max_pools as u64 * self.region_size()
    }

    /// Register a pool, assigning it the next free region.
    ///
    /// The returned id is permanent, and so is the byte offset it implies
    /// (`index × region_size`). Pools registered after [`bind`](Self::bind)
    /// are issued their region immediately; the caller performs their first
    /// sync.
    ///
    /// # Errors
    ///
    /// Returns a [`CapacityError`] (and does not register the pool) when
    /// the pool ceiling is reached or the pool is larger than a region.
    pub fn register(&mut self, mut pool: ObjectPool) -> Result<PoolId, CapacityError> {
        if self.pools.len() >= self.max_pools {
            return Err(CapacityError::TooManyPools {
                max_pools: self.max_pools,
            });
        }
        if pool.capacity() > self.pool_capacity {
            return Err(CapacityError::PoolTooLarge {
                capacity: pool.capacity(),
                region_capacity: self.pool_capacity,
            });
        }

        let index = self.pools.len();
        if let Some(buffer) = &self.buffer {
            pool.bind(Region {
                buffer: buffer.clone(),
                offset: index as u64 * self.region_size(),
            });
        }
        self.pools.push(pool);
        Ok(PoolId(index))
    }

    /// Allocate the shared buffer and issue every registered pool its
    /// region, triggering an initial full sync of each. Idempotent.
    pub fn bind(&mut self, gpu: &RenderContext) {
        if self.buffer.is_some() {
            return;
        }

        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Buffer"),
            size: self.buffer_size(),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let region_size = self.region_size();
        for (index, pool) in self.pools.iter_mut().enumerate() {
            pool.bind(Region {
                buffer: buffer.clone(),
                offset: index as u64 * region_size,
            });
            pool.sync_all(&gpu.queue);
        }

        log::debug!(
            "scene buffer bound: {} pools, {} bytes",
            self.pools.len(),
            self.buffer_size()
        );
        self.buffer = Some(buffer);
    }

    /// The shared buffer, once bound.
    #[must_use]
    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Number of registered pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Instances one region can hold.
    #[must_use]
    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    /// Shared access to a registered pool.
    #[must_use]
    pub fn pool(&self, id: PoolId) -> &ObjectPool {
        &self.pools[id.0]
    }

    /// Exclusive access to a registered pool.
    #[must_use]
    pub fn pool_mut(&mut self, id: PoolId) -> &mut ObjectPool {
        &mut self.pools[id.0]
    }

    /// Registration index of a pool; fixed at registration, and the
    /// pool's position in the shared buffer.
    #[must_use]
    pub fn pool_index(&self, id: PoolId) -> usize {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_ceiling() {
        let mut aggregator = SceneAggregator::new(2, 8);
        assert!(aggregator.register(ObjectPool::new(8)).is_ok());
        assert!(aggregator.register(ObjectPool::new(8)).is_ok());

        let rejected = aggregator.register(ObjectPool::new(8));
        assert_eq!(rejected, Err(CapacityError::TooManyPools { max_pools: 2 }));
        assert_eq!(aggregator.pool_count(), 2);
    }

    #[test]
    fn test_oversized_pool_rejected() {
        let mut aggregator = SceneAggregator::new(2, 4);
        let rejected = aggregator.register(ObjectPool::new(5));
        assert_eq!(
            rejected,
            Err(CapacityError::PoolTooLarge {
                capacity: 5,
                region_capacity: 4
            })
        );
        assert_eq!(aggregator.pool_count(), 0);
    }

    #[test]
    fn test_registration_order_fixes_ids() {
        let mut aggregator = SceneAggregator::new(3, 4);
        let a = aggregator.register(ObjectPool::new(4));
        let b = aggregator.register(ObjectPool::new(4));
        assert_eq!(a, Ok(PoolId(0)));
        assert_eq!(b, Ok(PoolId(1)));
    }

    #[test]
    fn test_region_and_buffer_sizing() {
        let aggregator = SceneAggregator::new(3, 100);
        assert_eq!(aggregator.region_size(), 16 + 100 * 80);
        assert_eq!(aggregator.buffer_size(), 3 * (16 + 100 * 80));
    }
}
