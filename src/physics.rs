//! GPU physics dispatch for falling balls.
//!
//! One compute dispatch per frame advances every active ball in place
//! inside the shared scene buffer: gravity integration, collision against
//! the (immutable) peg lattice, and a floor clamp. Each invocation touches
//! only its own ball's record and velocity slot, so no synchronization is
//! needed between the tens of thousands of parallel units.
//!
//! The WGSL kernel in `assets/shaders/ball_physics.wgsl` is mirrored by
//! [`step_ball`], a CPU reference implementation that backs the simulation
//! tests; the two must be kept in lockstep.

use glam::Vec3;

use crate::{
    error::GaltonError,
    gpu::{BufferWriter, RenderContext},
    scene::{HEADER_SIZE, RECORD_SIZE},
};

/// Compute workgroup size; dispatch covers `ceil(active / 64)` groups.
pub const WORKGROUP_SIZE: u32 = 64;

/// Byte size of the settings uniform rewritten before every dispatch.
const SETTINGS_SIZE: usize = 48;

/// Tunable collision and integration constants.
///
/// The collision response is a representative positional-correction plus
/// restitution scheme; the constants are configuration, not fixed behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Downward gravitational acceleration, world units per second squared.
    pub gravity: f32,
    /// Peg collision radius.
    pub peg_radius: f32,
    /// Ball radius (collision and render).
    pub ball_radius: f32,
    /// World-space height of the floor plane.
    pub floor_height: f32,
    /// Velocity kept along the contact normal after a peg bounce, in [0, 1].
    pub restitution: f32,
    /// Fraction of peg overlap corrected per step, in (0, 1].
    pub correction: f32,
}

struct GpuState {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    settings_buffer: wgpu::Buffer,
}

/// Per-frame compute dispatcher over the balls' scene region.
///
/// State machine: `Uninitialized → Ready`, one-way. [`tick`](Self::tick)
/// before [`initialize`](Self::initialize) is a silent no-op so the
/// surrounding setup can sequence itself without crashing on an early
/// frame; `initialize` on a `Ready` dispatcher is also a no-op.
pub struct BallPhysics {
    params: SimulationParams,
    peg_count: u32,
    pool_capacity: u32,
    gpu: Option<GpuState>,
}

impl BallPhysics {
    /// Dispatcher in the `Uninitialized` state.
    #[must_use]
    pub fn new(params: SimulationParams, peg_count: u32, pool_capacity: u32) -> Self {
        Self {
            params,
            peg_count,
            pool_capacity,
            gpu: None,
        }
    }

    /// Whether the dispatcher has reached the `Ready` state.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.gpu.is_some()
    }

    /// Current simulation parameters.
    #[must_use]
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Build the compute pipeline, settings uniform, and velocity-state
    /// buffer against the shared scene buffer. No-op when already `Ready`.
    pub fn initialize(
        &mut self,
        gpu: &RenderContext,
        scene_buffer: &wgpu::Buffer,
        max_balls: u32,
    ) {
        if self.gpu.is_some() {
            return;
        }

        let device = &gpu.device;

        let settings_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ball Physics Settings"),
            size: SETTINGS_SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // One vec4 of velocity state per configured ball, zero-initialized
        // (balls spawn at rest).
        let velocity_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ball Velocity Buffer"),
            size: u64::from(max_balls.max(1)) * 16,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Ball Physics Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Ball Physics Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: settings_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: scene_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: velocity_buffer.as_entire_binding(),
                },
            ],
        });

        let shader = device
            .create_shader_module(wgpu::include_wgsl!("../assets/shaders/ball_physics.wgsl"));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Ball Physics Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Ball Physics Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        self.gpu = Some(GpuState {
            pipeline,
            bind_group,
            settings_buffer,
        });
    }

    /// Advance every active ball by `delta_time_ms`.
    ///
    /// Rewrites the settings uniform, then issues one dispatch covering
    /// `active_balls` invocations. Inactive (not-yet-spawned) balls and
    /// pegs are outside the dispatch range. No-op while `Uninitialized`.
    ///
    /// # Errors
    ///
    /// Returns [`GaltonError::DeviceLost`] when the device has reported an
    /// unrecoverable error; skipping frames silently would desynchronize
    /// the physics time base, so this is fatal to the simulation.
    pub fn tick(
        &mut self,
        gpu: &RenderContext,
        delta_time_ms: f32,
        active_balls: u32,
    ) -> Result<(), GaltonError> {
        let Some(state) = &self.gpu else {
            return Ok(());
        };

        let mut settings = BufferWriter::new(SETTINGS_SIZE);
        settings.write_f32(delta_time_ms / 1000.0);
        settings.write_f32(self.params.gravity);
        settings.write_f32(self.params.peg_radius);
        settings.write_f32(self.params.ball_radius);
        settings.write_u32(self.peg_count);
        settings.write_u32(active_balls);
        settings.write_u32(self.pool_capacity);
        settings.write_f32(self.params.floor_height);
        settings.write_f32(self.params.restitution);
        settings.write_f32(self.params.correction);
        settings.pad(8);
        gpu.queue
            .write_buffer(&state.settings_buffer, 0, settings.as_bytes());

        let mut encoder = gpu.create_encoder();
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ball Physics Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&state.pipeline);
            pass.set_bind_group(0, &state.bind_group, &[]);
            pass.dispatch_workgroups(active_balls.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        gpu.submit(encoder);

        if gpu.device_lost() {
            return Err(GaltonError::DeviceLost(
                "compute submission failed; device reported an unrecoverable error".into(),
            ));
        }
        Ok(())
    }
}

/// CPU reference of the compute kernel, kept in lockstep with
/// `ball_physics.wgsl`.
///
/// Returns the ball's position and velocity after one `dt`-second step:
/// gravity integration, position advance, positional correction plus
/// restitution impulse against every overlapping peg, and the floor clamp
/// (position held at `floor_height + ball_radius`, downward velocity
/// zeroed).
#[must_use]
pub fn step_ball(
    position: Vec3,
    velocity: Vec3,
    pegs: &[Vec3],
    params: &SimulationParams,
    dt: f32,
) -> (Vec3, Vec3) {
    let mut pos = position;
    let mut vel = velocity;

    vel.y -= params.gravity * dt;
    pos += vel * dt;

    let contact = params.peg_radius + params.ball_radius;
    for peg in pegs {
        let rel = pos - *peg;
        let dist_sq = rel.length_squared();
        if dist_sq < contact * contact && dist_sq > 1e-12 {
            let dist = dist_sq.sqrt();
            let normal = rel / dist;
            pos += normal * ((contact - dist) * params.correction);
            let along = vel.dot(normal);
            if along < 0.0 {
                vel -= normal * ((1.0 + params.restitution) * along);
            }
        }
    }

    let floor = params.floor_height + params.ball_radius;
    if pos.y < floor {
        pos.y = floor;
        if vel.y < 0.0 {
            vel.y = 0.0;
        }
    }

    (pos, vel)
}

/// Byte offset of instance `index`'s record inside pool `pool_index`,
/// given the aggregator's per-pool capacity. Shared by the kernel's index
/// arithmetic and the tests that validate it.
#[must_use]
pub fn record_offset(pool_index: u32, index: u32, pool_capacity: u32) -> u64 {
    let region = (HEADER_SIZE + pool_capacity as usize * RECORD_SIZE) as u64;
    u64::from(pool_index) * region + HEADER_SIZE as u64 + u64::from(index) * RECORD_SIZE as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{self, LatticeParams};

    fn params() -> SimulationParams {
        SimulationParams {
            gravity: 20.0,
            peg_radius: 0.5,
            ball_radius: 0.35,
            floor_height: -60.0,
            restitution: 0.4,
            correction: 1.0,
        }
    }

    #[test]
    fn test_free_fall_is_downward() {
        let (pos, vel) = step_ball(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, &[], &params(), 0.016);
        assert!(pos.y < 10.0);
        assert!(vel.y < 0.0);
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.z, 0.0);
    }

    #[test]
    fn test_floor_clamp() {
        let p = params();
        // One step would carry the ball well below the floor.
        let start = Vec3::new(1.0, p.floor_height + 0.5, 2.0);
        let (pos, vel) = step_ball(start, Vec3::new(0.0, -100.0, 0.0), &[], &p, 0.1);

        assert_eq!(pos.y, p.floor_height + p.ball_radius);
        assert!(vel.y >= 0.0, "downward velocity must be zeroed, got {}", vel.y);
    }

    #[test]
    fn test_peg_contact_separates_and_reflects() {
        let p = params();
        let peg = Vec3::ZERO;
        // Ball falling straight onto a peg, slightly off-axis so the
        // contact normal has a horizontal component.
        let start = Vec3::new(0.05, p.peg_radius + p.ball_radius + 0.01, 0.0);
        let (pos, vel) = step_ball(start, Vec3::new(0.0, -5.0, 0.0), &[peg], &p, 0.016);

        let contact = p.peg_radius + p.ball_radius;
        assert!(
            (pos - peg).length() >= contact - 1e-4,
            "overlap must be corrected, dist {}",
            (pos - peg).length()
        );
        // The bounce deflects sideways in the direction of the offset.
        assert!(vel.x > 0.0);
    }

    #[test]
    fn test_no_contact_outside_radius() {
        let p = params();
        let peg = Vec3::new(10.0, 0.0, 0.0);
        let (_, vel) = step_ball(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, &[peg], &p, 0.016);
        // Pure gravity: no horizontal response.
        assert_eq!(vel.x, 0.0);
        assert_eq!(vel.z, 0.0);
    }

    #[test]
    fn test_end_to_end_net_downward_motion() {
        let p = params();
        let pegs: Vec<Vec3> = lattice::generate(&LatticeParams {
            layers: 3,
            height: 50.0,
            side_length: 100.0,
            start: Vec3::ZERO,
        })
        .iter()
        .map(|peg| peg.position)
        .collect();
        assert_eq!(pegs.len(), 14);

        // Ten spawned balls, one 16 ms tick: all strictly below spawn height.
        for i in 0..10 {
            let spawn = Vec3::new(i as f32 * 0.1, 2.0, 0.0);
            let (pos, _) = step_ball(spawn, Vec3::ZERO, &pegs, &p, 16.0 / 1000.0);
            assert!(pos.y < spawn.y, "ball {i} did not fall: {} >= {}", pos.y, spawn.y);
        }
    }

    #[test]
    fn test_record_offset_layout() {
        // Pool 1, instance 2, capacity 100: one full region, a header, two
        // records.
        let region = 16 + 100 * 80;
        assert_eq!(record_offset(1, 2, 100), region + 16 + 160);
        assert_eq!(record_offset(0, 0, 100), 16);
    }
}
