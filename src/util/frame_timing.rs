//! Frame pacing: per-frame delta, smoothed FPS, optional frame limiting.

use std::time::{Duration, Instant};

/// Frame timing: per-frame delta for the simulation, smoothed FPS for
/// logging, and optional frame limiting.
pub struct FrameTiming {
    /// Target FPS (0 = unlimited)
    target_fps: u32,
    /// Minimum frame duration based on target FPS
    min_frame_duration: Duration,
    /// Last frame timestamp
    last_frame: Instant,
    /// Duration of the most recent frame
    last_delta: Duration,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
}

impl FrameTiming {
    /// Create a new frame timer with the given FPS target (0 = unlimited).
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let min_frame_duration = if target_fps > 0 {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        } else {
            Duration::ZERO
        };

        Self {
            target_fps,
            min_frame_duration,
            last_frame: Instant::now(),
            last_delta: Duration::ZERO,
            smoothed_fps: 60.0,
            smoothing: 0.05,
        }
    }

    /// Call at the start of each frame. Returns true if enough time has
    /// passed to render.
    #[must_use]
    pub fn should_render(&self) -> bool {
        if self.target_fps == 0 {
            return true;
        }
        self.last_frame.elapsed() >= self.min_frame_duration
    }

    /// Call after rendering to update timing.
    pub fn end_frame(&mut self) {
        let now = Instant::now();
        self.last_delta = now.duration_since(self.last_frame);
        self.last_frame = now;

        let frame_time = self.last_delta.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            // Exponential moving average for smooth display
            self.smoothed_fps =
                self.smoothed_fps * (1.0 - self.smoothing) + instant_fps * self.smoothing;
        }
    }

    /// Duration of the most recent frame, in milliseconds. Zero until the
    /// first `end_frame`.
    #[must_use]
    pub fn delta_ms(&self) -> f32 {
        self.last_delta.as_secs_f32() * 1000.0
    }

    /// Get the current FPS (smoothed)
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_always_renders() {
        assert!(FrameTiming::new(0).should_render());
    }

    #[test]
    fn test_delta_zero_until_first_frame() {
        assert_eq!(FrameTiming::new(60).delta_ms(), 0.0);
    }

    #[test]
    fn test_limiter_holds_until_budget_elapses() {
        // 1 FPS target: the 1 s budget cannot have elapsed yet.
        let timing = FrameTiming::new(1);
        assert!(!timing.should_render());

        // 500 FPS target: a 2 ms budget elapses almost immediately.
        let timing = FrameTiming::new(500);
        std::thread::sleep(Duration::from_millis(4));
        assert!(timing.should_render());
    }

    #[test]
    fn test_end_frame_records_delta() {
        let mut timing = FrameTiming::new(0);
        std::thread::sleep(Duration::from_millis(2));
        timing.end_frame();
        assert!(timing.delta_ms() >= 2.0);
    }
}
