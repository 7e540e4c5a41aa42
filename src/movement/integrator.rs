//! Movement domain: per-tick motion integration.
//!
//! Order within a tick: gravity (scaled per mode), decaying forces, input
//! acceleration, then an axis-separated collide-and-slide move. Horizontal
//! motion is resolved before vertical.

use bevy::prelude::*;

use crate::movement::{
    CharacterBody, CollisionWorld, CornerCorrection, CornerCorrectionResolver, DecayingForceSet,
    Hitbox, MovementMode, MovementTuning, ShapeCast, ShapeCastHit, Side, WallContactState, WallZone,
};

/// Gap left between the body and whatever stopped it.
pub const SKIN: f32 = 0.01;
/// How far below the feet ground still counts as underfoot.
pub const GROUND_PROBE: f32 = 0.05;

const UP: &[Vec2] = &[Vec2::Y];
const SIDEWAYS: &[Vec2] = &[Vec2::NEG_X, Vec2::X];

/// What the integrator needs from the rest of the tick.
#[derive(Debug, Clone, Copy)]
pub struct MotionContext<'a> {
    pub tuning: &'a MovementTuning,
    pub mode: MovementMode,
    pub wall_side: Option<Side>,
    /// Horizontal input after any wall-jump lock.
    pub control_x: f32,
    pub contact: &'a WallContactState,
}

/// Outcome of one tick of motion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveReport {
    pub displacement: Vec2,
    pub blocked_x: Option<ShapeCastHit>,
    pub blocked_y: Option<ShapeCastHit>,
    /// Offset applied by corner correction, if any.
    pub correction: Option<Vec2>,
    pub grounded: bool,
    /// Summed decaying forces applied this tick, in units per second.
    pub force_total: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// Moves one body with a fixed hitbox through a [`CollisionWorld`].
#[derive(Debug, Clone, Copy)]
pub struct MotionIntegrator {
    hitbox: Hitbox,
    resolver: CornerCorrectionResolver,
}

impl MotionIntegrator {
    pub fn new(tuning: &MovementTuning, hitbox: Hitbox) -> Self {
        Self {
            hitbox,
            resolver: CornerCorrectionResolver::new(tuning.corner_correction_max_offset),
        }
    }

    pub fn hitbox(&self) -> &Hitbox {
        &self.hitbox
    }

    /// Advance `body` by one tick.
    pub fn integrate(
        &self,
        ctx: &MotionContext,
        body: &mut CharacterBody,
        forces: &mut DecayingForceSet,
        world: &impl CollisionWorld,
    ) -> MoveReport {
        apply_gravity(ctx, body);
        let force_total = forces.tick();
        apply_control(ctx, body);

        let mut report = MoveReport {
            force_total,
            ..default()
        };
        let start = body.position;
        let motion = (body.velocity + force_total) * ctx.tuning.dt();

        self.move_axis(ctx, body, forces, world, Vec2::new(motion.x, 0.0), &mut report);
        self.move_axis(ctx, body, forces, world, Vec2::new(0.0, motion.y), &mut report);

        report.displacement = body.position - start;
        report.grounded =
            body.velocity.y + force_total.y <= 0.0 && probe_ground(world, &self.hitbox, body.position);
        body.grounded = report.grounded;
        report
    }

    /// Move along one axis; `delta` has a single non-zero component.
    fn move_axis(
        &self,
        ctx: &MotionContext,
        body: &mut CharacterBody,
        forces: &mut DecayingForceSet,
        world: &impl CollisionWorld,
        delta: Vec2,
        report: &mut MoveReport,
    ) {
        if delta.length_squared() <= f32::EPSILON * f32::EPSILON {
            return;
        }
        let axis = if delta.x != 0.0 { Axis::X } else { Axis::Y };
        let hitbox = &self.hitbox;

        let Some(hit) = world.shapecast(&ShapeCast::along(hitbox.full(), body.position, delta)) else {
            body.position += delta;
            return;
        };

        if let Some(directions) = correction_directions(ctx, axis, delta) {
            match self.resolver.resolve(world, hitbox, body.position, delta, directions) {
                CornerCorrection::Corrected(offset) => {
                    debug!("Corner correction {:?} during {:?}", offset, ctx.mode);
                    body.position += offset + delta;
                    report.correction = Some(offset);
                    return;
                }
                CornerCorrection::Clear => {
                    body.position += delta;
                    return;
                }
                CornerCorrection::Blocked => {}
            }
        }

        let travel = (hit.distance - SKIN).max(0.0);
        body.position += delta.normalize() * travel;

        let into = body.velocity.dot(hit.normal);
        if into < 0.0 {
            body.velocity -= hit.normal * into;
        }
        forces.block_against(hit.normal);

        match axis {
            Axis::X => report.blocked_x = Some(hit),
            Axis::Y => report.blocked_y = Some(hit),
        }
    }
}

/// Whether solid ground lies just below a box at `position`.
pub fn probe_ground(world: &impl CollisionWorld, hitbox: &Hitbox, position: Vec2) -> bool {
    world
        .shapecast(&ShapeCast::new(hitbox.full(), position, Vec2::NEG_Y, GROUND_PROBE))
        .is_some_and(|hit| hit.normal.y > 0.5)
}

fn apply_gravity(ctx: &MotionContext, body: &mut CharacterBody) {
    let tuning = ctx.tuning;
    let gravity = tuning.gravity;

    match ctx.mode {
        MovementMode::Idle | MovementMode::Run | MovementMode::Airborne => {
            body.velocity.y -= gravity;
        }
        MovementMode::WallSlide => {
            body.velocity.y -= gravity * tuning.wall_slide_gravity_scale;
            body.velocity.y = body.velocity.y.max(-tuning.wall_slide_max_speed);
        }
        MovementMode::WallClimb => {
            body.velocity.y = (body.velocity.y - gravity * tuning.wall_climb_gravity_scale
                + tuning.wall_climb_acceleration)
                .clamp(0.0, tuning.wall_climb_speed);
        }
        MovementMode::LedgeGrab | MovementMode::Dash => {
            body.velocity = Vec2::ZERO;
        }
        MovementMode::ClimbUp => {
            let side = ctx.wall_side.unwrap_or(body.facing);
            body.velocity.x = side.sign() * tuning.climb_up_speed;
            body.velocity.y = if ctx.contact.zone_on(side) != WallZone::None {
                tuning.climb_up_speed
            } else {
                // past the wall face: settle onto the platform
                body.velocity.y.min(0.0) - gravity
            };
        }
    }
}

fn apply_control(ctx: &MotionContext, body: &mut CharacterBody) {
    let tuning = ctx.tuning;
    let (accel, decel) = match ctx.mode {
        MovementMode::Idle | MovementMode::Run => (tuning.run_acceleration, tuning.run_deceleration),
        MovementMode::Airborne | MovementMode::WallSlide | MovementMode::WallClimb => {
            (tuning.air_acceleration, tuning.air_deceleration)
        }
        MovementMode::LedgeGrab | MovementMode::ClimbUp | MovementMode::Dash => return,
    };

    let target = ctx.control_x.clamp(-1.0, 1.0) * tuning.run_speed;
    body.velocity.x = next_horizontal_velocity(body.velocity.x, target, accel, decel);
}

/// Move `current` toward `target` by at most one tick of acceleration.
///
/// Speed above `target` in the same direction is bled off with `decel` rather
/// than clipped, so momentum from a dash or wall jump carries over.
pub fn next_horizontal_velocity(current: f32, target: f32, accel: f32, decel: f32) -> f32 {
    let same_direction = current * target > 0.0;
    let speeding_up = target.abs() > current.abs();

    let rate = if (same_direction && speeding_up) || current == 0.0 {
        accel
    } else {
        decel
    };

    if current < target {
        (current + rate).min(target)
    } else {
        (current - rate).max(target)
    }
}

/// Offsets the resolver may try for a blocked move, or `None` when the move
/// does not qualify for corner correction.
fn correction_directions(ctx: &MotionContext, axis: Axis, delta: Vec2) -> Option<&'static [Vec2]> {
    match axis {
        Axis::X => {
            let side = Side::from_axis(delta.x.signum())?;
            match ctx.mode {
                MovementMode::ClimbUp | MovementMode::Idle | MovementMode::Run => Some(UP),
                MovementMode::Airborne | MovementMode::WallSlide | MovementMode::WallClimb
                    if near_corner(ctx.contact, side) =>
                {
                    Some(UP)
                }
                _ => None,
            }
        }
        Axis::Y => (ctx.mode == MovementMode::Airborne && delta.y > 0.0).then_some(SIDEWAYS),
    }
}

/// The wall on `side` tops out within reach of the feet or the hands.
fn near_corner(contact: &WallContactState, side: Side) -> bool {
    matches!(contact.zone_on(side), WallZone::Ledge | WallZone::Step)
        || contact.raw().side == Some(side) && contact.raw().zone == WallZone::Ledge
}
