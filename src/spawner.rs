//! Incremental ball activation.
//!
//! Rather than creating the full population in one frame (a large one-time
//! upload, plus a physics explosion from thousands of perfectly overlapping
//! spawns), balls are activated in small waves, one [`step`](Spawner::step)
//! per frame, each followed by a tail sync covering only the new records.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::scene::{Instance, ObjectPool};

/// Step-wise ball spawner.
///
/// Driven externally one step per frame; once the configured total has
/// been activated, further steps are no-ops.
pub struct Spawner {
    origin: Vec3,
    jitter_radius: f32,
    ball_radius: f32,
    color: Vec3,
    wave_size: usize,
    remaining: usize,
    rng: StdRng,
}

impl Spawner {
    /// Spawner for `total` balls dropped near `origin`, activated
    /// `wave_size` at a time with horizontal jitter inside a disk of
    /// `jitter_radius`.
    #[must_use]
    pub fn new(
        origin: Vec3,
        jitter_radius: f32,
        ball_radius: f32,
        color: Vec3,
        total: usize,
        wave_size: usize,
    ) -> Self {
        Self::seeded(
            origin,
            jitter_radius,
            ball_radius,
            color,
            total,
            wave_size,
            StdRng::from_os_rng(),
        )
    }

    /// Spawner with a caller-supplied RNG, for reproducible runs and tests.
    #[must_use]
    pub fn seeded(
        origin: Vec3,
        jitter_radius: f32,
        ball_radius: f32,
        color: Vec3,
        total: usize,
        wave_size: usize,
        rng: StdRng,
    ) -> Self {
        Self {
            origin,
            jitter_radius,
            ball_radius,
            color,
            wave_size: wave_size.max(1),
            remaining: total,
            rng,
        }
    }

    /// Balls not yet activated.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Whether every configured ball has been activated.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Activate the next wave: append up to `wave_size` balls to `pool`.
    /// Returns the number activated (0 once done, or if the pool rejects
    /// the append).
    pub fn step(&mut self, pool: &mut ObjectPool) -> usize {
        let wave = self.wave_size.min(self.remaining);
        if wave == 0 {
            return 0;
        }

        let mut added = 0;
        for _ in 0..wave {
            let position = self.origin + self.jitter();
            if pool
                .add_instance(Instance::sphere(position, self.ball_radius, self.color))
                .is_err()
            {
                break;
            }
            added += 1;
        }

        self.remaining -= added;
        added
    }

    /// [`step`](Self::step), then tail-sync just the newly added records —
    /// the upload stays O(wave size), not O(population).
    pub fn step_and_sync(&mut self, pool: &mut ObjectPool, queue: &wgpu::Queue) -> usize {
        let added = self.step(pool);
        if added > 0 {
            pool.sync_tail(queue, added);
        }
        added
    }

    /// Uniform sample in a horizontal disk of `jitter_radius`, so
    /// simultaneous spawns never overlap exactly.
    fn jitter(&mut self) -> Vec3 {
        let radius = self.jitter_radius * self.rng.random_range(0.0f32..1.0).sqrt();
        let angle = self.rng.random_range(0.0f32..TAU);
        Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawner(total: usize, wave: usize) -> Spawner {
        Spawner::seeded(
            Vec3::new(0.0, 10.0, 0.0),
            1.5,
            0.35,
            Vec3::splat(235.0),
            total,
            wave,
            StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_jitter_stays_in_disk() {
        let mut s = spawner(100, 1);
        for _ in 0..100 {
            let offset = s.jitter();
            assert_eq!(offset.y, 0.0);
            assert!(offset.length() <= 1.5 + 1e-6);
        }
    }

    #[test]
    fn test_step_monotonicity_and_saturation() {
        let mut pool = ObjectPool::new(10);
        let mut s = spawner(10, 1);

        for n in 1..=10 {
            assert_eq!(s.step(&mut pool), 1);
            assert_eq!(pool.instance_count(), n);
        }
        assert!(s.is_done());

        // Steps past the configured total are no-ops.
        assert_eq!(s.step(&mut pool), 0);
        assert_eq!(pool.instance_count(), 10);
    }

    #[test]
    fn test_waves_respect_remaining() {
        let mut pool = ObjectPool::new(16);
        let mut s = spawner(10, 4);

        assert_eq!(s.step(&mut pool), 4);
        assert_eq!(s.step(&mut pool), 4);
        assert_eq!(s.step(&mut pool), 2);
        assert_eq!(s.step(&mut pool), 0);
        assert_eq!(pool.instance_count(), 10);
    }

    #[test]
    fn test_full_pool_stops_wave() {
        let mut pool = ObjectPool::new(3);
        let mut s = spawner(10, 5);

        assert_eq!(s.step(&mut pool), 3);
        assert_eq!(pool.instance_count(), 3);
        assert_eq!(s.remaining(), 7);
        assert_eq!(s.step(&mut pool), 0);
    }

    #[test]
    fn test_spawns_centered_on_origin() {
        let mut pool = ObjectPool::new(8);
        let mut s = spawner(8, 8);
        assert_eq!(s.step(&mut pool), 8);

        for instance in pool.instances() {
            assert_eq!(instance.position.y, 10.0);
            let horizontal = Vec3::new(instance.position.x, 0.0, instance.position.z);
            assert!(horizontal.length() <= 1.5 + 1e-6);
        }
    }

    #[test]
    fn test_wave_size_floor() {
        let s = spawner(10, 0);
        assert_eq!(s.wave_size, 1);
    }
}
