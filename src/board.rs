//! The Galton board: lattice, pools, physics, and spawner wired together.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    error::GaltonError,
    gpu::RenderContext,
    lattice::{self, LatticeParams},
    physics::{BallPhysics, SimulationParams},
    scene::{Instance, ObjectPool, PoolId, SceneAggregator},
    spawner::Spawner,
};

const FLOOR_COLOR: Vec3 = Vec3::new(64.0, 64.0, 68.0);

/// Board construction parameters.
///
/// All fields have usable defaults; `Option` fields are derived from the
/// board geometry when unset (see [`BoardConfig::resolve`], the single
/// place dependent defaults are computed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    /// Number of pyramid layers (top layer has one peg).
    pub layers: u32,
    /// Vertical extent of the lattice.
    pub height: f32,
    /// Side length of the lattice footprint.
    pub side_length: f32,
    /// World position of the lattice top center.
    pub start: [f32; 3],
    /// Peg radius (collision and render).
    pub peg_radius: f32,
    /// Ball radius (collision and render).
    pub ball_radius: f32,
    /// Total balls to spawn over the simulation's ramp-up.
    pub max_balls: u32,
    /// Balls activated per spawner step.
    pub wave_size: u32,
    /// Spawn point; derived a few ball radii above the lattice when unset.
    pub spawn_origin: Option<[f32; 3]>,
    /// Radius of the horizontal spawn-jitter disk.
    pub spawn_jitter: f32,
    /// Gap between the lowest peg layer and the floor; derived from the
    /// peg radius when unset.
    pub floor_offset: Option<f32>,
    /// Thickness of the rendered floor slab.
    pub floor_thickness: f32,
    /// Half-extent of the floor slab; derived from the footprint when
    /// unset.
    pub floor_extent: Option<f32>,
    /// Gravitational acceleration, world units per second squared.
    pub gravity: f32,
    /// Peg bounce restitution in [0, 1].
    pub restitution: f32,
    /// Fraction of peg overlap corrected per step, in (0, 1].
    pub correction: f32,
    /// Ball color, 0–255 channels.
    pub ball_color: [f32; 3],
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            layers: 5,
            height: 50.0,
            side_length: 100.0,
            start: [0.0, 0.0, 0.0],
            peg_radius: 0.5,
            ball_radius: 0.35,
            max_balls: 10_000,
            wave_size: 25,
            spawn_origin: None,
            spawn_jitter: 1.5,
            floor_offset: None,
            floor_thickness: 1.0,
            floor_extent: None,
            gravity: 20.0,
            restitution: 0.4,
            correction: 1.0,
            ball_color: [235.0, 235.0, 235.0],
        }
    }
}

/// Fully-derived board parameters; every dependent default filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedConfig {
    /// Spawn point for new balls.
    pub spawn_origin: Vec3,
    /// World-space height of the floor plane (top of the slab).
    pub floor_height: f32,
    /// Half-extent of the floor slab.
    pub floor_extent: f32,
}

impl BoardConfig {
    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GaltonError::Io`] for file errors and
    /// [`GaltonError::Config`] for parse errors.
    pub fn load(path: &str) -> Result<Self, GaltonError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| GaltonError::Config(e.to_string()))
    }

    /// Check structural validity.
    ///
    /// # Errors
    ///
    /// Returns [`GaltonError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), GaltonError> {
        if self.layers == 0 {
            return Err(GaltonError::Config("layers must be at least 1".into()));
        }
        for (name, value) in [
            ("height", self.height),
            ("side_length", self.side_length),
            ("peg_radius", self.peg_radius),
            ("ball_radius", self.ball_radius),
            ("floor_thickness", self.floor_thickness),
        ] {
            if value <= 0.0 {
                return Err(GaltonError::Config(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    /// Compute every dependent default in one place.
    #[must_use]
    pub fn resolve(&self) -> ResolvedConfig {
        let start = Vec3::from(self.start);
        let spawn_origin = self.spawn_origin.map_or_else(
            || start + Vec3::new(0.0, 10.0 * self.ball_radius, 0.0),
            Vec3::from,
        );
        let floor_offset = self.floor_offset.unwrap_or(8.0 * self.peg_radius);

        ResolvedConfig {
            spawn_origin,
            floor_height: start.y - self.height - floor_offset,
            floor_extent: self.floor_extent.unwrap_or(self.side_length * 0.75),
        }
    }
}

/// A complete board: peg lattice, ball population, floor, physics, and
/// spawner, sharing one scene buffer.
pub struct GaltonBoard {
    config: BoardConfig,
    resolved: ResolvedConfig,
    scene: SceneAggregator,
    pegs: PoolId,
    balls: PoolId,
    floor: PoolId,
    physics: BallPhysics,
    spawner: Spawner,
    peg_count: u32,
}

impl GaltonBoard {
    /// Build the host-side board state: lattice generated, pools
    /// registered, floor slab placed. GPU resources come later via
    /// [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// Returns [`GaltonError::Config`] for an invalid configuration.
    pub fn new(config: BoardConfig) -> Result<Self, GaltonError> {
        config.validate()?;
        let resolved = config.resolve();

        let pegs = lattice::generate(&LatticeParams {
            layers: config.layers,
            height: config.height,
            side_length: config.side_length,
            start: Vec3::from(config.start),
        });
        let peg_count = pegs.len() as u32;

        // Three pools — pegs, balls, floor — sized to the largest one.
        let pool_capacity = (pegs.len()).max(config.max_balls as usize).max(1);
        let mut scene = SceneAggregator::new(3, pool_capacity);

        let mut peg_pool = ObjectPool::new(pegs.len());
        for peg in &pegs {
            if let Err(e) = peg_pool.add_instance(Instance::sphere(
                peg.position,
                config.peg_radius,
                peg.color,
            )) {
                log::warn!("peg dropped: {e}");
            }
        }

        let mut floor_pool = ObjectPool::new(1);
        let slab = Instance {
            position: Vec3::new(
                config.start[0],
                resolved.floor_height - config.floor_thickness / 2.0,
                config.start[2],
            ),
            rotation: glam::Quat::IDENTITY,
            scale: Vec3::new(
                resolved.floor_extent,
                config.floor_thickness / 2.0,
                resolved.floor_extent,
            ),
            color: FLOOR_COLOR,
        };
        if let Err(e) = floor_pool.add_instance(slab) {
            log::warn!("floor dropped: {e}");
        }

        let register = |scene: &mut SceneAggregator, pool| {
            scene
                .register(pool)
                .map_err(|e| GaltonError::Config(e.to_string()))
        };
        let pegs_id = register(&mut scene, peg_pool)?;
        let balls_id = register(&mut scene, ObjectPool::new(config.max_balls as usize))?;
        let floor_id = register(&mut scene, floor_pool)?;

        let physics = BallPhysics::new(
            SimulationParams {
                gravity: config.gravity,
                peg_radius: config.peg_radius,
                ball_radius: config.ball_radius,
                floor_height: resolved.floor_height,
                restitution: config.restitution,
                correction: config.correction,
            },
            peg_count,
            pool_capacity as u32,
        );

        let spawner = Spawner::new(
            resolved.spawn_origin,
            config.spawn_jitter,
            config.ball_radius,
            Vec3::from(config.ball_color),
            config.max_balls as usize,
            config.wave_size as usize,
        );

        Ok(Self {
            config,
            resolved,
            scene,
            pegs: pegs_id,
            balls: balls_id,
            floor: floor_id,
            physics,
            spawner,
            peg_count,
        })
    }

    /// Allocate and upload GPU state: scene buffer, initial full syncs,
    /// physics pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`GaltonError::DeviceLost`] when the device reports an
    /// unrecoverable error during setup; there is no degraded mode.
    pub fn initialize(&mut self, gpu: &RenderContext) -> Result<(), GaltonError> {
        self.scene.bind(gpu);
        if let Some(buffer) = self.scene.buffer() {
            self.physics
                .initialize(gpu, buffer, self.config.max_balls.max(1));
        }

        if gpu.device_lost() {
            return Err(GaltonError::DeviceLost(
                "device reported an unrecoverable error during board setup".into(),
            ));
        }

        log::info!(
            "board initialized: {} pegs, {} balls configured, floor at y = {}",
            self.peg_count,
            self.config.max_balls,
            self.resolved.floor_height
        );
        Ok(())
    }

    /// Advance one frame: spawn the next wave (tail-synced), then dispatch
    /// physics over every active ball.
    ///
    /// # Errors
    ///
    /// Returns [`GaltonError::DeviceLost`] from the physics dispatch; see
    /// [`BallPhysics::tick`].
    pub fn update(&mut self, gpu: &RenderContext, delta_time_ms: f32) -> Result<(), GaltonError> {
        let _ = self
            .spawner
            .step_and_sync(self.scene.pool_mut(self.balls), &gpu.queue);

        let active = self.scene.pool(self.balls).instance_count() as u32;
        self.physics.tick(gpu, delta_time_ms, active)
    }

    /// The configuration the board was built from.
    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Derived geometry (spawn origin, floor placement).
    #[must_use]
    pub fn resolved(&self) -> &ResolvedConfig {
        &self.resolved
    }

    /// The scene aggregator owning all pools and the shared buffer.
    #[must_use]
    pub fn scene(&self) -> &SceneAggregator {
        &self.scene
    }

    /// Number of pegs in the lattice.
    #[must_use]
    pub fn peg_count(&self) -> u32 {
        self.peg_count
    }

    /// Number of balls activated so far.
    #[must_use]
    pub fn ball_count(&self) -> usize {
        self.scene.pool(self.balls).instance_count()
    }

    /// Pool holding the peg lattice.
    #[must_use]
    pub fn pegs(&self) -> PoolId {
        self.pegs
    }

    /// Pool holding the ball population.
    #[must_use]
    pub fn balls(&self) -> PoolId {
        self.balls
    }

    /// Pool holding the floor slab.
    #[must_use]
    pub fn floor(&self) -> PoolId {
        self.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BoardConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_layers_rejected() {
        let config = BoardConfig {
            layers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_floor_offset_derived_from_peg_radius() {
        let config = BoardConfig {
            peg_radius: 1.0,
            floor_offset: None,
            ..Default::default()
        };
        let resolved = config.resolve();
        assert_eq!(resolved.floor_height, -config.height - 8.0);

        let explicit = BoardConfig {
            floor_offset: Some(2.0),
            ..Default::default()
        };
        assert_eq!(explicit.resolve().floor_height, -explicit.height - 2.0);
    }

    #[test]
    fn test_spawn_origin_derived_above_lattice() {
        let config = BoardConfig::default();
        let resolved = config.resolve();
        assert!(resolved.spawn_origin.y > config.start[1]);
        assert_eq!(resolved.spawn_origin.x, config.start[0]);
    }

    #[test]
    fn test_board_pools_populated() {
        let board = GaltonBoard::new(BoardConfig {
            layers: 3,
            max_balls: 10,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(board.peg_count(), 14);
        assert_eq!(board.scene().pool(board.pegs()).instance_count(), 14);
        assert_eq!(board.scene().pool(board.balls()).instance_count(), 0);
        assert_eq!(board.scene().pool(board.floor()).instance_count(), 1);
        assert_eq!(board.scene().pool_count(), 3);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = BoardConfig {
            layers: 7,
            floor_offset: Some(3.0),
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: BoardConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
