//! Movement domain: jump arc tuning math.
//!
//! Jumps are integrated per tick: the launch sets the vertical velocity to
//! `jump_speed` (units per second) and every tick removes `gravity` from it.
//! Displacement per tick is `velocity / fps`, so heights are discrete sums of
//! per-frame velocities rather than continuous integrals.

use crate::movement::TuningError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpArc {
    pub jump_speed: f32,
    pub gravity: f32,
    pub run_speed: f32,
    pub fps: f32,
}

impl JumpArc {
    pub fn new(jump_speed: f32, gravity: f32, run_speed: f32, fps: f32) -> Result<Self, TuningError> {
        if gravity <= 0.0 || !gravity.is_finite() {
            return Err(TuningError::NonPositiveGravity(gravity));
        }
        if fps <= 0.0 || !fps.is_finite() {
            return Err(TuningError::NonPositiveFps(fps));
        }
        Ok(Self {
            jump_speed,
            gravity,
            run_speed,
            fps,
        })
    }

    /// Solve for the launch speed and gravity that reach `height` after
    /// `apex_frames` ticks.
    pub fn from_apex(
        height: f32,
        apex_frames: u32,
        run_speed: f32,
        fps: f32,
    ) -> Result<Self, TuningError> {
        let t = apex_frames.max(1) as f32;
        let gravity = 2.0 * height * fps / (t * (t + 1.0));
        Self::new(gravity * t, gravity, run_speed, fps)
    }

    /// Ticks until vertical velocity reaches zero.
    ///
    /// Rounds down when `jump_speed` is not a multiple of `gravity`: the
    /// result is the last tick whose velocity `jump_speed - gravity * k` is
    /// still non-negative.
    pub fn apex_time_frames(&self) -> u32 {
        (self.jump_speed / self.gravity).floor().max(0.0) as u32
    }

    /// Height gained at the apex, closed form of [`JumpArc::apex_height_discrete`].
    pub fn apex_height(&self) -> f32 {
        let t = self.apex_time_frames() as f32;
        (self.jump_speed * (t + 1.0) - self.gravity * (t * (t + 1.0) / 2.0)) / self.fps
    }

    /// Height gained at the apex, summing each tick's velocity.
    pub fn apex_height_discrete(&self) -> f32 {
        let per_second: f32 = (0..=self.apex_time_frames())
            .map(|k| self.jump_speed - self.gravity * k as f32)
            .sum();
        per_second / self.fps
    }

    /// Horizontal distance covered at `run_speed` while rising and falling back
    /// to the launch height.
    pub fn max_jump_distance(&self) -> f32 {
        self.run_speed * 2.0 * self.apex_time_frames() as f32 / self.fps
    }
}
