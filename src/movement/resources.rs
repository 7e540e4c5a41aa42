//! Movement domain: tuning and input resources.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::movement::{DecayLaw, Hitbox, JumpArc};

/// Movement tunables. Speeds are in units per second; `gravity` and the
/// accelerations are the velocity change applied per tick.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementTuning {
    pub jump_speed: f32,
    pub gravity: f32,
    pub run_speed: f32,
    /// Fixed simulation rate in ticks per second.
    pub fps: f32,
    pub run_acceleration: f32,
    pub run_deceleration: f32,
    pub air_acceleration: f32,
    pub air_deceleration: f32,
    pub coyote_frames: u32,
    pub jump_buffer_frames: u32,
    /// Ticks after any jump before the next one may start.
    pub jump_cooldown_frames: u32,
    /// Maximum air jumps (0 = no double jump)
    pub max_air_jumps: u8,

    /// Height of the probe band at the top of the hitbox used to spot ledges.
    pub ledge_band_height: f32,
    /// Height of the probe band at the feet used to spot steps.
    pub step_band_height: f32,
    /// How far past the hitbox side the wall probes reach.
    pub wall_detection_distance: f32,
    pub ledge_confirm_frames: u32,
    /// Ticks input toward the ledge (or up) must be held during a grab
    /// before the climb-up starts. Zero counts as one.
    pub ledge_climb_hold_frames: u32,

    pub wall_slide_gravity_scale: f32,
    pub wall_slide_max_speed: f32,
    pub wall_climb_gravity_scale: f32,
    pub wall_climb_speed: f32,
    pub wall_climb_acceleration: f32,

    pub walljump_force: f32,
    pub walljump_duration_frames: u32,
    pub walljump_decay: DecayLaw,
    /// Ticks after a wall jump during which input toward that wall is ignored.
    pub wall_jump_input_lock_frames: u32,
    /// Ticks after letting go of a wall during which a jump is still a wall jump.
    pub wall_coyote_frames: u32,

    pub dash_speed: f32,
    pub dash_duration_frames: u32,
    pub dash_decay: DecayLaw,
    pub dash_cooldown_frames: u32,
    /// Whether one dash may be spent while airborne (refilled on ground or wall).
    pub air_dash: bool,

    /// Upper bound on how long the locked climb-up may hold control.
    pub climb_up_frames: u32,
    pub climb_up_speed: f32,

    pub corner_correction_max_offset: f32,
    pub corner_correction_inset: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            jump_speed: 75.0,
            gravity: 5.0,
            run_speed: 20.0,
            fps: 60.0,
            run_acceleration: 4.0,
            run_deceleration: 5.0,
            air_acceleration: 2.0,
            air_deceleration: 1.0,
            coyote_frames: 5,
            jump_buffer_frames: 4,
            jump_cooldown_frames: 10,
            max_air_jumps: 0, // No double jump by default
            ledge_band_height: 2.0,
            step_band_height: 1.0,
            wall_detection_distance: 0.5,
            ledge_confirm_frames: 2,
            ledge_climb_hold_frames: 6,
            wall_slide_gravity_scale: 0.3,
            wall_slide_max_speed: 12.0,
            wall_climb_gravity_scale: 0.5,
            wall_climb_speed: 10.0,
            wall_climb_acceleration: 4.0,
            walljump_force: 90.0,
            walljump_duration_frames: 18,
            walljump_decay: DecayLaw::Linear,
            wall_jump_input_lock_frames: 8,
            wall_coyote_frames: 5,
            dash_speed: 60.0,
            dash_duration_frames: 10,
            dash_decay: DecayLaw::ExponentialHalfLife(6.0),
            dash_cooldown_frames: 20,
            air_dash: true,
            climb_up_frames: 30,
            climb_up_speed: 24.0,
            corner_correction_max_offset: 1.25,
            corner_correction_inset: 1.0,
        }
    }
}

/// Setup-time configuration errors. These are checked once, never per tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    #[error("gravity must be positive, got {0}")]
    NonPositiveGravity(f32),

    #[error("fps must be positive, got {0}")]
    NonPositiveFps(f32),

    #[error("`{field}` must be finite and non-negative, got {value}")]
    InvalidValue { field: &'static str, value: f32 },

    #[error("`{field}` must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{law:?} for `{field}` needs a positive half-life")]
    InvalidDecayLaw { field: &'static str, law: DecayLaw },

    #[error(
        "step band ({step}) and ledge band ({ledge}) must leave room for a body band inside a hitbox {height} tall"
    )]
    BandsExceedHitbox { step: f32, ledge: f32, height: f32 },

    #[error("corner inset {inset} must be smaller than the hitbox half extents {half_extents}")]
    InsetExceedsHitbox { inset: f32, half_extents: Vec2 },
}

impl MovementTuning {
    /// Validate the tunables that do not depend on a particular body.
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.gravity <= 0.0 || !self.gravity.is_finite() {
            return Err(TuningError::NonPositiveGravity(self.gravity));
        }
        if self.fps <= 0.0 || !self.fps.is_finite() {
            return Err(TuningError::NonPositiveFps(self.fps));
        }

        // without a ledge band every wall would read as a ledge
        if self.ledge_band_height <= 0.0 || !self.ledge_band_height.is_finite() {
            return Err(TuningError::NonPositive {
                field: "ledge_band_height",
                value: self.ledge_band_height,
            });
        }

        let non_negative = [
            ("jump_speed", self.jump_speed),
            ("run_speed", self.run_speed),
            ("run_acceleration", self.run_acceleration),
            ("run_deceleration", self.run_deceleration),
            ("air_acceleration", self.air_acceleration),
            ("air_deceleration", self.air_deceleration),
            ("step_band_height", self.step_band_height),
            ("wall_detection_distance", self.wall_detection_distance),
            ("wall_slide_gravity_scale", self.wall_slide_gravity_scale),
            ("wall_slide_max_speed", self.wall_slide_max_speed),
            ("wall_climb_gravity_scale", self.wall_climb_gravity_scale),
            ("wall_climb_speed", self.wall_climb_speed),
            ("wall_climb_acceleration", self.wall_climb_acceleration),
            ("walljump_force", self.walljump_force),
            ("dash_speed", self.dash_speed),
            ("climb_up_speed", self.climb_up_speed),
            ("corner_correction_max_offset", self.corner_correction_max_offset),
            ("corner_correction_inset", self.corner_correction_inset),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TuningError::InvalidValue { field, value });
            }
        }

        for (field, law) in [
            ("walljump_decay", self.walljump_decay),
            ("dash_decay", self.dash_decay),
        ] {
            if !law.is_valid() {
                return Err(TuningError::InvalidDecayLaw { field, law });
            }
        }

        Ok(())
    }

    /// Validate the tunables that depend on the body's hitbox.
    pub fn validate_for(&self, hitbox: &Hitbox) -> Result<(), TuningError> {
        self.validate()?;

        let height = hitbox.height();
        if self.step_band_height + self.ledge_band_height >= height {
            return Err(TuningError::BandsExceedHitbox {
                step: self.step_band_height,
                ledge: self.ledge_band_height,
                height,
            });
        }
        if hitbox.corner_inset >= hitbox.half_extents.min_element() {
            return Err(TuningError::InsetExceedsHitbox {
                inset: hitbox.corner_inset,
                half_extents: hitbox.half_extents,
            });
        }

        Ok(())
    }

    /// Seconds per tick.
    pub fn dt(&self) -> f32 {
        1.0 / self.fps
    }

    pub fn jump_arc(&self) -> JumpArc {
        JumpArc {
            jump_speed: self.jump_speed,
            gravity: self.gravity,
            run_speed: self.run_speed,
            fps: self.fps,
        }
    }
}

/// Per-frame input. Presses are edge-triggered and latched until a fixed tick
/// consumes them, so a frame without a fixed tick does not drop a press.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct MovementInput {
    /// Held direction, each component in `[-1, 1]`.
    pub axis: Vec2,
    pub jump_just_pressed: bool,
    pub dash_just_pressed: bool,
}

impl MovementInput {
    pub fn held(axis: Vec2) -> Self {
        Self {
            axis,
            ..default()
        }
    }

    pub fn with_jump(mut self) -> Self {
        self.jump_just_pressed = true;
        self
    }

    pub fn with_dash(mut self) -> Self {
        self.dash_just_pressed = true;
        self
    }

    pub fn holds_up(&self) -> bool {
        self.axis.y > crate::movement::AXIS_DEADZONE
    }

    pub(crate) fn consume_presses(&mut self) {
        self.jump_just_pressed = false;
        self.dash_just_pressed = false;
    }
}
